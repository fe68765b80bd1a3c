//! Geometric connectivity between board items.
//!
//! Connectivity here is purely physical: two items are connected when one has
//! an anchor (track end, via centre, pad centre) that lies on the other's
//! copper on a shared layer. Net codes are ignored, which is what lets the
//! cleaner find tracks shorting two nets.

use std::collections::HashMap;

use crate::board::{Board, BoardItem, ItemId, ItemKind};
use crate::geometry::Point;
use crate::layer::LayerSet;
use crate::spatial::SpatialIndex;

/// A connection point of an item and the other items touching it.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub pos: Point,
    pub connected: Vec<ItemId>,
}

impl Anchor {
    pub fn connected_items_count(&self) -> usize {
        self.connected.len()
    }
}

/// Connectivity queries the cleanup engine depends on.
pub trait ConnectivityOracle {
    /// Recompute everything from the current board contents.
    fn rebuild(&mut self, board: &Board);

    /// Refresh after `item` changed.
    fn update(&mut self, board: &Board, _item: ItemId) {
        self.rebuild(board);
    }

    /// Items connected to `item` whose kind is in `kinds`, in board order.
    fn connected_items(&self, item: ItemId, kinds: &[ItemKind]) -> Vec<ItemId>;

    fn connected_pads(&self, item: ItemId) -> Vec<ItemId> {
        self.connected_items(item, &[ItemKind::Pad])
    }

    fn connected_tracks(&self, item: ItemId) -> Vec<ItemId> {
        self.connected_items(item, &ItemKind::TRACKS)
    }

    /// Anchors of `item`; empty for unknown items and zones.
    fn anchors(&self, item: ItemId) -> &[Anchor];

    /// True when a track end (or a via) is not connected to enough items.
    fn test_endpoint_dangling(&self, item: ItemId) -> bool;
}

#[derive(Debug, Clone)]
struct ItemNode {
    kind: ItemKind,
    order: usize,
    anchors: Vec<Anchor>,
    connected: Vec<ItemId>,
}

/// Default [`ConnectivityOracle`], rebuilt from scratch on every change.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityData {
    nodes: HashMap<ItemId, ItemNode>,
}

fn conducts(item: &BoardItem<'_>) -> bool {
    !matches!(item, BoardItem::Zone(z) if z.keepout)
}

impl ConnectivityData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build connectivity for a board.
    pub fn build(board: &Board) -> Self {
        let mut data = Self::new();
        data.rebuild(board);
        data
    }

    pub fn item_count(&self) -> usize {
        self.nodes.len()
    }

    fn link(&mut self, a: ItemId, b: ItemId) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(node) = self.nodes.get_mut(&from) {
                if !node.connected.contains(&to) {
                    node.connected.push(to);
                }
            }
        }
    }

    fn order_of(&self, id: &ItemId) -> usize {
        self.nodes.get(id).map_or(usize::MAX, |n| n.order)
    }
}

impl ConnectivityOracle for ConnectivityData {
    fn rebuild(&mut self, board: &Board) {
        self.nodes.clear();

        let copper = board.layer_stack.copper_layers();
        let items: Vec<BoardItem<'_>> = board.items().filter(conducts).collect();
        let mut index = SpatialIndex::new();
        let mut layers: HashMap<ItemId, LayerSet> = HashMap::new();

        for (order, item) in items.iter().enumerate() {
            let id = item.id();
            let on = item.layer_set().intersection(&copper);
            let bbox = item.shape().bbox();
            for layer in on.iter() {
                index.insert(id, bbox, layer);
            }
            layers.insert(id, on);
            self.nodes.insert(
                id,
                ItemNode {
                    kind: item.kind(),
                    order,
                    anchors: item
                        .anchors()
                        .into_iter()
                        .map(|pos| Anchor {
                            pos,
                            connected: Vec::new(),
                        })
                        .collect(),
                    connected: Vec::new(),
                },
            );
        }

        let by_id: HashMap<ItemId, &BoardItem<'_>> = items.iter().map(|i| (i.id(), i)).collect();
        let mut links = Vec::new();

        for item in &items {
            let id = item.id();
            let on = layers.get(&id).copied().unwrap_or_default();
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            for anchor in node.anchors.iter_mut() {
                for layer in on.iter() {
                    for entry in index.query_point(&anchor.pos, layer) {
                        if entry.id == id || anchor.connected.contains(&entry.id) {
                            continue;
                        }
                        let hit = by_id
                            .get(&entry.id)
                            .is_some_and(|other| other.hit_test(&anchor.pos, 0));
                        if hit {
                            anchor.connected.push(entry.id);
                            links.push((id, entry.id));
                        }
                    }
                }
            }
        }

        for (a, b) in links {
            self.link(a, b);
        }

        // Stable board order for every result list.
        let orders: HashMap<ItemId, usize> =
            self.nodes.iter().map(|(id, n)| (*id, n.order)).collect();
        let key = |id: &ItemId| orders.get(id).copied().unwrap_or(usize::MAX);
        for node in self.nodes.values_mut() {
            node.connected.sort_by_key(key);
            for anchor in node.anchors.iter_mut() {
                anchor.connected.sort_by_key(key);
            }
        }

        log::debug!(
            "connectivity rebuilt: {} items, {} links",
            self.nodes.len(),
            self.nodes.values().map(|n| n.connected.len()).sum::<usize>() / 2
        );
    }

    fn connected_items(&self, item: ItemId, kinds: &[ItemKind]) -> Vec<ItemId> {
        let Some(node) = self.nodes.get(&item) else {
            return Vec::new();
        };
        let mut out: Vec<ItemId> = node
            .connected
            .iter()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|other| kinds.contains(&other.kind))
            })
            .copied()
            .collect();
        out.sort_by_key(|id| self.order_of(id));
        out
    }

    fn anchors(&self, item: ItemId) -> &[Anchor] {
        match self.nodes.get(&item) {
            Some(node) => &node.anchors,
            None => &[],
        }
    }

    fn test_endpoint_dangling(&self, item: ItemId) -> bool {
        let Some(node) = self.nodes.get(&item) else {
            return false;
        };
        match node.kind {
            ItemKind::Trace | ItemKind::Arc => {
                node.anchors.iter().any(|a| a.connected_items_count() == 0)
            }
            ItemKind::Via => node.connected.len() < 2,
            ItemKind::Pad | ItemKind::Zone => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Pad, PadShape, TrackSegment, Via, Zone};
    use crate::layer::LayerRange;

    fn seg(board: &mut Board, a: (i64, i64), b: (i64, i64), layer: u32) -> ItemId {
        board
            .add_track(TrackSegment::new(
                Point::new(a.0, a.1),
                Point::new(b.0, b.1),
                100,
                layer,
                1,
            ))
            .unwrap()
    }

    #[test]
    fn test_segments_share_endpoint() {
        let mut board = Board::new("conn", 2);
        let s1 = seg(&mut board, (0, 0), (1000, 0), 0);
        let s2 = seg(&mut board, (1000, 0), (2000, 0), 0);
        let other_layer = seg(&mut board, (1000, 0), (1000, 1000), 1);

        let conn = ConnectivityData::build(&board);
        assert_eq!(conn.connected_tracks(s1), vec![s2]);
        assert_eq!(conn.connected_tracks(s2), vec![s1]);
        assert!(conn.connected_tracks(other_layer).is_empty());

        let anchors = conn.anchors(s1);
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].connected_items_count(), 0);
        assert_eq!(anchors[1].connected, vec![s2]);
        assert!(conn.test_endpoint_dangling(s1));
    }

    #[test]
    fn test_via_and_pad_connectivity() {
        let mut board = Board::new("conn", 2);
        let pad = board
            .add_pad(Pad::smd(
                "U1-1",
                Point::new(0, 0),
                PadShape::Rect {
                    width: 1000,
                    height: 1000,
                },
                0,
                1,
            ))
            .unwrap();
        let s = seg(&mut board, (0, 0), (5000, 0), 0);
        let via = board
            .add_track(Via::new(Point::new(5000, 0), 600, 300, LayerRange::new(0, 1), 1))
            .unwrap();

        let conn = ConnectivityData::build(&board);
        assert_eq!(conn.connected_pads(s), vec![pad]);
        assert_eq!(conn.connected_items(s, &ItemKind::ALL), vec![via, pad]);
        assert!(!conn.test_endpoint_dangling(s));
        // Only one neighbour on the via.
        assert!(conn.test_endpoint_dangling(via));
    }

    #[test]
    fn test_keepout_zone_is_not_copper() {
        let mut board = Board::new("conn", 2);
        let outline = vec![
            Point::new(-100, -100),
            Point::new(100, -100),
            Point::new(100, 100),
            Point::new(-100, 100),
        ];
        board.add_zone(Zone::keepout(outline.clone(), 0)).unwrap();
        let s = seg(&mut board, (0, 0), (500, 0), 0);
        let conn = ConnectivityData::build(&board);
        assert!(conn.connected_items(s, &ItemKind::ALL).is_empty());

        let fill = board.add_zone(Zone::new(outline, 0, 1)).unwrap();
        let conn = ConnectivityData::build(&board);
        assert_eq!(conn.connected_items(s, &[ItemKind::Zone]), vec![fill]);
    }
}
