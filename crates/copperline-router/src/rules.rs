use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use copperline_core::board::{Board, ItemId, NetCode};
use copperline_core::geometry::{polygon_contains, Coord, Point};

use crate::item::Item;

/// Clearance rules consulted by the collision engine.
pub trait RuleResolver: std::fmt::Debug {
    /// Required copper-to-copper gap between two items.
    fn clearance(&self, a: &Item, b: &Item, use_epsilon: bool) -> Coord;

    /// The pair involves a keepout area (exact boundary, no margin).
    fn is_keepout(&self, _a: &Item, _b: &Item) -> bool {
        false
    }

    /// The item belongs to a net-tie footprint.
    fn is_in_net_tie(&self, _item: &Item) -> bool {
        false
    }

    /// A collision between `head` and `item` at `pos` is a permitted net-tie short.
    fn is_net_tie_exclusion(&self, _head: &Item, _pos: &Point, _item: &Item) -> bool {
        false
    }

    fn clearance_epsilon(&self) -> Coord {
        0
    }

    /// Largest clearance any pair can require; used to size spatial queries.
    fn max_clearance(&self) -> Coord;
}

/// Clearance override between two nets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetPairClearance {
    pub a: NetCode,
    pub b: NetCode,
    pub clearance: Coord,
}

/// A net-tie footprint: its copper may short the tied nets inside `region`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetTie {
    pub items: BTreeSet<ItemId>,
    pub nets: BTreeSet<NetCode>,
    pub region: Vec<Point>,
}

/// Table-driven [`RuleResolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearanceRules {
    pub default_clearance: Coord,
    pub hole_clearance: Coord,
    pub hole_to_hole_clearance: Coord,
    pub clearance_epsilon: Coord,
    #[serde(default)]
    pub net_clearances: Vec<NetPairClearance>,
    #[serde(default)]
    pub keepouts: BTreeSet<ItemId>,
    #[serde(default)]
    pub net_ties: Vec<NetTie>,
}

impl Default for ClearanceRules {
    fn default() -> Self {
        Self {
            default_clearance: 200_000,
            hole_clearance: 250_000,
            hole_to_hole_clearance: 250_000,
            clearance_epsilon: 5_000,
            net_clearances: Vec::new(),
            keepouts: BTreeSet::new(),
            net_ties: Vec::new(),
        }
    }
}

impl ClearanceRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clearance(mut self, clearance: Coord) -> Self {
        self.default_clearance = clearance;
        self
    }

    pub fn with_epsilon(mut self, epsilon: Coord) -> Self {
        self.clearance_epsilon = epsilon;
        self
    }

    pub fn set_net_clearance(&mut self, a: NetCode, b: NetCode, clearance: Coord) {
        self.net_clearances
            .retain(|c| !((c.a == a && c.b == b) || (c.a == b && c.b == a)));
        self.net_clearances.push(NetPairClearance { a, b, clearance });
    }

    pub fn add_keepout(&mut self, id: ItemId) {
        self.keepouts.insert(id);
    }

    /// Register every keepout zone of the board.
    pub fn add_board_keepouts(&mut self, board: &Board) {
        for zone in board.zones().iter().filter(|z| z.keepout) {
            self.keepouts.insert(zone.id);
        }
    }

    pub fn add_net_tie(&mut self, tie: NetTie) {
        self.net_ties.push(tie);
    }

    fn net_pair(&self, a: NetCode, b: NetCode) -> Option<Coord> {
        self.net_clearances
            .iter()
            .find(|c| (c.a == a && c.b == b) || (c.a == b && c.b == a))
            .map(|c| c.clearance)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl RuleResolver for ClearanceRules {
    fn clearance(&self, a: &Item, b: &Item, use_epsilon: bool) -> Coord {
        let base = match (a.is_hole(), b.is_hole()) {
            (true, true) => self.hole_to_hole_clearance,
            (true, false) | (false, true) => self.hole_clearance,
            (false, false) => self
                .net_pair(a.net, b.net)
                .unwrap_or(self.default_clearance),
        };
        let clearance = if use_epsilon && base > 0 {
            (base - self.clearance_epsilon).max(0)
        } else {
            base
        };
        log::trace!(
            "clearance {} / {}: {} (eps {})",
            a.kind_str(),
            b.kind_str(),
            clearance,
            use_epsilon
        );
        clearance
    }

    fn is_keepout(&self, a: &Item, b: &Item) -> bool {
        self.keepouts.contains(&a.id) || self.keepouts.contains(&b.id)
    }

    fn is_in_net_tie(&self, item: &Item) -> bool {
        self.net_ties.iter().any(|t| t.items.contains(&item.id))
    }

    fn is_net_tie_exclusion(&self, head: &Item, pos: &Point, item: &Item) -> bool {
        self.net_ties.iter().any(|t| {
            t.items.contains(&item.id)
                && t.nets.contains(&head.net)
                && polygon_contains(&t.region, pos)
        })
    }

    fn clearance_epsilon(&self) -> Coord {
        self.clearance_epsilon
    }

    fn max_clearance(&self) -> Coord {
        self.net_clearances
            .iter()
            .map(|c| c.clearance)
            .chain([
                self.default_clearance,
                self.hole_clearance,
                self.hole_to_hole_clearance,
            ])
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copperline_core::geometry::Seg;
    use copperline_core::layer::LayerRange;

    fn track(net: NetCode) -> Item {
        Item::segment(Seg::new(Point::new(0, 0), Point::new(100, 0)), 10, 0, net)
    }

    #[test]
    fn test_clearance_resolution() {
        let mut rules = ClearanceRules::new().with_clearance(100).with_epsilon(2);
        rules.hole_clearance = 150;
        rules.hole_to_hole_clearance = 300;
        rules.set_net_clearance(1, 2, 400);

        assert_eq!(rules.clearance(&track(1), &track(3), false), 100);
        assert_eq!(rules.clearance(&track(1), &track(3), true), 98);
        assert_eq!(rules.clearance(&track(2), &track(1), false), 400);

        let via = Item::via(Point::new(0, 0), 600, 300, LayerRange::new(0, 1), 5);
        let hole = via.hole_item().unwrap();
        assert_eq!(rules.clearance(hole, &track(1), false), 150);
        assert_eq!(rules.clearance(hole, hole, false), 300);
        assert_eq!(rules.max_clearance(), 400);
    }

    #[test]
    fn test_rules_json() {
        let mut rules = ClearanceRules::default();
        rules.set_net_clearance(1, 2, 400);
        rules.set_net_clearance(2, 1, 500);
        assert_eq!(rules.net_clearances.len(), 1);
        let back = ClearanceRules::from_json(&rules.to_json().unwrap()).unwrap();
        assert_eq!(back, rules);
    }
}
