use serde::{Deserialize, Serialize};

use copperline_core::board::ItemId;
use copperline_core::geometry::Coord;

use crate::item::{Item, ItemKind};

/// Which rule a collision violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintType {
    Clearance,
}

/// A stored item found to collide with the query head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstacle {
    pub head: ItemId,
    pub head_kind: ItemKind,
    pub item: ItemId,
    pub item_kind: ItemKind,
    pub clearance: Coord,
    pub violating_constraint: ConstraintType,
}

impl Obstacle {
    pub fn new(head: &Item, item: &Item, clearance: Coord) -> Self {
        Self {
            head: head.id,
            head_kind: head.kind(),
            item: item.id,
            item_kind: item.kind(),
            clearance,
            violating_constraint: ConstraintType::Clearance,
        }
    }
}

/// Caller options for a collision search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionSearchOptions {
    /// Skip clearance between items of the same net.
    pub different_nets_only: bool,
    /// Use this clearance instead of asking the rule resolver.
    pub override_clearance: Option<Coord>,
    pub use_clearance_epsilon: bool,
    /// Stop after this many obstacles.
    pub limit_count: Option<usize>,
}

impl Default for CollisionSearchOptions {
    fn default() -> Self {
        Self {
            different_nets_only: true,
            override_clearance: None,
            use_clearance_epsilon: true,
            limit_count: None,
        }
    }
}

/// Collecting-mode state of a collision search.
#[derive(Debug, Clone, Default)]
pub struct CollisionSearchContext {
    pub options: CollisionSearchOptions,
    pub obstacles: Vec<Obstacle>,
}

impl CollisionSearchContext {
    pub fn new(options: CollisionSearchOptions) -> Self {
        Self {
            options,
            obstacles: Vec::new(),
        }
    }

    /// Record an obstacle once per (head, item) pair.
    pub fn add(&mut self, obstacle: Obstacle) {
        let known = self
            .obstacles
            .iter()
            .any(|o| o.head == obstacle.head && o.item == obstacle.item);
        if !known {
            self.obstacles.push(obstacle);
        }
    }

    pub fn is_full(&self) -> bool {
        self.options
            .limit_count
            .is_some_and(|limit| self.obstacles.len() >= limit)
    }
}

/// Log collected obstacles at debug level.
pub fn dump_obstacles(obstacles: &[Obstacle]) {
    log::debug!("{} obstacles:", obstacles.len());
    for obs in obstacles {
        log::debug!(
            "{} [{}] - {} [{}], clearance {}",
            obs.head,
            obs.head_kind.as_str(),
            obs.item,
            obs.item_kind.as_str(),
            obs.clearance
        );
    }
}
