//! # Copperline Router
//!
//! Item collision model for the interactive router: the tagged item kinds,
//! the clearance rule resolver, the board capability interface, obstacle
//! collection and the [`Node`] that stores items and answers collision
//! queries.

pub mod collision;
pub mod iface;
pub mod item;
pub mod node;
pub mod obstacle;
pub mod rules;

pub use collision::should_consider_hole_collisions;
pub use iface::{BoardIface, RouterIface};
pub use item::{HoleParent, Item, ItemBody, ItemKind, ViaSignature};
pub use node::Node;
pub use obstacle::{
    dump_obstacles, CollisionSearchContext, CollisionSearchOptions, ConstraintType, Obstacle,
};
pub use rules::{ClearanceRules, NetPairClearance, NetTie, RuleResolver};
