use std::collections::HashMap;

use copperline_core::board::{Board, ItemId};
use copperline_core::geometry::{BBox, Coord, Point};
use copperline_core::layer::{LayerRange, EDGE_CUTS};
use copperline_core::shape::Shape;
use copperline_core::spatial::SpatialIndex;

use crate::iface::RouterIface;
use crate::item::Item;
use crate::obstacle::{dump_obstacles, CollisionSearchContext, CollisionSearchOptions, Obstacle};
use crate::rules::RuleResolver;

/// The router's world: stored items, their spatial index, the clearance
/// rules and the castellated-edge exclusion regions.
#[derive(Debug, Default)]
pub struct Node {
    items: HashMap<ItemId, Item>,
    order: Vec<ItemId>,
    index: SpatialIndex,
    rules: Option<Box<dyn RuleResolver>>,
    edge_exclusions: Vec<Shape>,
    max_half_width: Coord,
}

fn index_box(item: &Item) -> Option<BBox> {
    item.shape()
        .map(|s| s.bbox().inflate(item.line_half_width()))
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: impl RuleResolver + 'static) -> Self {
        let mut node = Self::new();
        node.set_rules(rules);
        node
    }

    pub fn set_rules(&mut self, rules: impl RuleResolver + 'static) {
        self.rules = Some(Box::new(rules));
    }

    pub fn rules(&self) -> Option<&dyn RuleResolver> {
        self.rules.as_deref()
    }

    // ── Item management ──────────────────────────────────────────────

    /// Store an item. Holes of vias and drilled solids are stored as items
    /// of their own.
    pub fn add(&mut self, item: Item) -> ItemId {
        let id = item.id;
        if self.items.contains_key(&id) {
            self.remove(id);
        }
        if let Some(hole) = item.hole_item() {
            self.add(hole.clone());
        }
        if let Some(bbox) = index_box(&item) {
            for layer in item.layers.iter() {
                self.index.insert(id, bbox, layer);
            }
        }
        self.max_half_width = self.max_half_width.max(item.line_half_width());
        self.items.insert(id, item);
        self.order.push(id);
        id
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let item = self.items.remove(&id)?;
        self.order.retain(|i| *i != id);
        if let Some(bbox) = index_box(&item) {
            for layer in item.layers.iter() {
                self.index.remove(id, bbox, layer);
            }
        }
        if let Some(hole) = item.hole_item() {
            self.remove(hole.id);
        }
        Some(item)
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Stored items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the node contents with the board's tracks, pads, keepouts
    /// and outline.
    pub fn sync_board(&mut self, board: &Board) {
        self.items.clear();
        self.order.clear();
        self.index = SpatialIndex::new();
        self.max_half_width = 0;

        for track in board.tracks() {
            self.add(Item::from_track(track));
        }
        for pad in board.pads() {
            self.add(Item::from_pad(pad));
        }
        let copper = board.copper_layer_count();
        for zone in board
            .zones()
            .iter()
            .filter(|z| z.keepout || z.layer == EDGE_CUTS)
        {
            self.add(Item::from_zone(zone, copper));
        }
        log::info!("router node synced: {} items", self.items.len());
    }

    // ── Rule access ──────────────────────────────────────────────────

    /// Clearance from the rule resolver; `-1` (no restriction) without one.
    pub fn clearance(&self, a: &Item, b: &Item, use_epsilon: bool) -> Coord {
        self.rules
            .as_ref()
            .map_or(-1, |r| r.clearance(a, b, use_epsilon))
    }

    pub fn clearance_epsilon(&self) -> Coord {
        self.rules.as_ref().map_or(0, |r| r.clearance_epsilon())
    }

    pub fn is_keepout(&self, a: &Item, b: &Item) -> bool {
        self.rules.as_ref().is_some_and(|r| r.is_keepout(a, b))
    }

    pub fn is_in_net_tie(&self, item: &Item) -> bool {
        self.rules.as_ref().is_some_and(|r| r.is_in_net_tie(item))
    }

    pub fn is_net_tie_exclusion(&self, head: &Item, pos: &Point, item: &Item) -> bool {
        self.rules
            .as_ref()
            .is_some_and(|r| r.is_net_tie_exclusion(head, pos, item))
    }

    /// Register a region where board-edge clearance is waived (castellated pads).
    pub fn add_edge_exclusion(&mut self, region: Shape) {
        self.edge_exclusions.push(region);
    }

    pub fn query_edge_exclusions(&self, pos: &Point) -> bool {
        self.edge_exclusions.iter().any(|s| s.hit_test(pos, 0))
    }

    // ── Collision queries ────────────────────────────────────────────

    fn search_area(&self, head: &Item) -> Option<(BBox, LayerRange)> {
        let reach = self.rules.as_ref().map_or(0, |r| r.max_clearance().max(0))
            + head.line_half_width()
            + self.max_half_width;
        let mut bbox = index_box(head)?.inflate(reach);
        let mut layers = head.layers;
        if let Some(via) = head.line_via() {
            if let Some(via_box) = index_box(via) {
                bbox = bbox.union(&via_box.inflate(reach));
            }
            layers = LayerRange::new(
                layers.start.min(via.layers.start),
                layers.end.max(via.layers.end),
            );
        }
        Some((bbox, layers))
    }

    /// Collect every stored item colliding with `head` into `ctx`. Returns
    /// the number of obstacles added.
    pub fn query_colliding(
        &self,
        head: &Item,
        iface: Option<&dyn RouterIface>,
        ctx: &mut CollisionSearchContext,
    ) -> usize {
        let Some((bbox, layers)) = self.search_area(head) else {
            return 0;
        };
        let before = ctx.obstacles.len();
        if ctx.is_full() {
            return 0;
        }

        self.index.query_colliding(
            &bbox,
            layers.start,
            layers.end,
            |id| id != head.id,
            |id| {
                if let Some(item) = self.items.get(&id) {
                    item.collide(head, self, iface, Some(&mut *ctx));
                }
                !ctx.is_full()
            },
        );

        if let Some(limit) = ctx.options.limit_count {
            ctx.obstacles.truncate(limit.max(before));
        }
        dump_obstacles(&ctx.obstacles[before..]);
        ctx.obstacles.len() - before
    }

    /// First obstacle colliding with `head`, if any.
    pub fn check_colliding(
        &self,
        head: &Item,
        iface: Option<&dyn RouterIface>,
    ) -> Option<Obstacle> {
        let mut ctx = CollisionSearchContext::new(CollisionSearchOptions {
            limit_count: Some(1),
            ..CollisionSearchOptions::default()
        });
        self.query_colliding(head, iface, &mut ctx);
        ctx.obstacles.into_iter().next()
    }

    /// Existence test: does anything stored collide with `head`?
    pub fn collides(&self, head: &Item, iface: Option<&dyn RouterIface>) -> bool {
        let Some((bbox, layers)) = self.search_area(head) else {
            return false;
        };
        let mut hit = false;
        self.index.query_colliding(
            &bbox,
            layers.start,
            layers.end,
            |id| id != head.id,
            |id| {
                hit = self
                    .items
                    .get(&id)
                    .is_some_and(|item| item.collide(head, self, iface, None));
                !hit
            },
        );
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copperline_core::geometry::Seg;
    use crate::rules::ClearanceRules;

    #[test]
    fn test_add_stores_via_hole() {
        let mut node = Node::new();
        let via = Item::via(Point::new(0, 0), 600, 300, LayerRange::new(0, 1), 1);
        let hole_id = via.hole_item().unwrap().id;
        let id = node.add(via);
        assert_eq!(node.len(), 2);
        assert!(node.get(hole_id).is_some());

        node.remove(id);
        assert!(node.is_empty());
    }

    #[test]
    fn test_missing_rules_are_permissive() {
        let mut node = Node::new();
        node.add(Item::segment(
            Seg::new(Point::new(0, 0), Point::new(1000, 0)),
            200,
            0,
            1,
        ));
        let head = Item::segment(Seg::new(Point::new(0, 0), Point::new(0, 1000)), 200, 0, 2);
        assert!(!node.collides(&head, None));

        node.set_rules(ClearanceRules::new().with_clearance(100).with_epsilon(0));
        assert!(node.collides(&head, None));
    }
}
