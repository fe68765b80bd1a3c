//! The item-vs-item collision predicate.
//!
//! `stored.collide(head, node, iface, ctx)` decides whether a stored item
//! violates clearance against a query head. Without a context it answers on
//! the first hit; with one it records every obstacle it finds.

use copperline_core::board::NETCODE_UNCONNECTED;
use copperline_core::layer::EDGE_CUTS;

use crate::iface::RouterIface;
use crate::item::Item;
use crate::node::Node;
use crate::obstacle::{CollisionSearchContext, Obstacle};

/// False when one operand is the other's own hole, or both are holes of the
/// same via (a routing head often carries a copy of a via already placed).
pub fn should_consider_hole_collisions(item: &Item, head: &Item) -> bool {
    match (item.hole_parent(), head.hole_parent(), item.is_hole(), head.is_hole()) {
        (parent_i, parent_h, true, true) => {
            let (Some(pi), Some(ph)) = (parent_i, parent_h) else {
                return true;
            };
            if let (Some(vi), Some(vh)) = (pi.via, ph.via) {
                if vi == vh {
                    return false;
                }
            }
            pi.id != ph.id
        }
        (Some(pi), _, true, false) => pi.id != head.id,
        (_, Some(ph), false, true) => ph.id != item.id,
        _ => true,
    }
}

impl Item {
    /// Does this stored item collide with `head`?
    pub fn collide(
        &self,
        head: &Item,
        node: &Node,
        iface: Option<&dyn RouterIface>,
        ctx: Option<&mut CollisionSearchContext>,
    ) -> bool {
        self.collide_simple(head, node, iface, ctx)
    }

    fn collide_simple(
        &self,
        head: &Item,
        node: &Node,
        iface: Option<&dyn RouterIface>,
        mut ctx: Option<&mut CollisionSearchContext>,
    ) -> bool {
        if self.id == head.id {
            return false;
        }
        if !should_consider_hole_collisions(self, head) {
            return false;
        }

        let collecting = ctx.is_some();
        let mut found = false;

        // A line ending in a via stands in for that via.
        if let Some(via) = self.line_via() {
            found |= via.collide_simple(head, node, iface, ctx.as_deref_mut());
        }
        if let Some(via) = head.line_via() {
            found |= self.collide_simple(via, node, iface, ctx.as_deref_mut());
        }
        if let Some(hole) = head.hole_item() {
            if should_consider_hole_collisions(self, hole)
                && self.collide_simple(hole, node, iface, ctx.as_deref_mut())
            {
                found = true;
            }
        }
        if found && !collecting {
            return true;
        }

        // Obstacles the expansion pushed into `ctx` stay recorded.
        if !self.layers.overlaps(&head.layers) {
            return false;
        }

        let options = ctx.as_ref().map(|c| c.options.clone()).unwrap_or_default();
        let different_nets_only = if self.is_hole() && head.is_hole() {
            false
        } else if ctx.is_some() {
            options.different_nets_only
        } else {
            true
        };

        let clearance = if different_nets_only
            && self.net == head.net
            && head.net != NETCODE_UNCONNECTED
        {
            -1
        } else if different_nets_only && (self.is_free_pad() || head.is_free_pad()) {
            -1
        } else if node.is_keepout(self, head) {
            0
        } else if iface.is_some_and(|i| !i.is_flashed_on_layer(self, head.layers)) {
            -1
        } else if iface.is_some_and(|i| !i.is_flashed_on_layer(head, self.layers)) {
            -1
        } else if let Some(overridden) = ctx.as_ref().and_then(|c| c.options.override_clearance) {
            overridden
        } else {
            node.clearance(self, head, ctx.is_some() && options.use_clearance_epsilon)
        };

        log::trace!(
            "{} vs {}: clearance {}",
            head.kind_str(),
            self.kind_str(),
            clearance
        );

        if clearance < 0 {
            return found;
        }
        let (Some(shape_h), Some(shape_i)) = (head.shape(), self.shape()) else {
            return found;
        };
        let threshold = clearance + head.line_half_width() + self.line_half_width()
            - node.clearance_epsilon();

        let check_castellation = self.parent_layer == Some(EDGE_CUTS);
        let check_net_tie = self.parent_layer.is_some() && node.is_in_net_tie(self);

        let hit = if check_castellation || check_net_tie {
            let Some(collision) = shape_h.collide_at(&shape_i, threshold) else {
                return found;
            };
            let pos = collision.location;
            if check_castellation && node.query_edge_exclusions(&pos) {
                return false;
            }
            if check_net_tie && node.is_net_tie_exclusion(head, &pos, self) {
                return false;
            }
            true
        } else {
            shape_h.collide(&shape_i, threshold)
        };

        if !hit {
            return found;
        }
        match ctx {
            Some(ctx) => {
                ctx.add(Obstacle::new(head, self, clearance));
                true
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copperline_core::geometry::Point;
    use copperline_core::layer::LayerRange;

    #[test]
    fn test_hole_self_exclusion() {
        let via = Item::via(Point::new(0, 0), 600, 300, LayerRange::new(0, 1), 1);
        let hole = via.hole_item().unwrap();
        assert!(!should_consider_hole_collisions(hole, &via));
        assert!(!should_consider_hole_collisions(&via, hole));

        // A copy of the same via has a distinct hole id but the same signature.
        let copy = Item::via(Point::new(0, 0), 600, 300, LayerRange::new(0, 1), 1);
        assert!(!should_consider_hole_collisions(
            hole,
            copy.hole_item().unwrap()
        ));

        let other = Item::via(Point::new(1000, 0), 600, 300, LayerRange::new(0, 1), 1);
        assert!(should_consider_hole_collisions(hole, other.hole_item().unwrap()));
        assert!(should_consider_hole_collisions(hole, &other));
    }
}
