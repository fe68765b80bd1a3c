//! # Copperline Core
//!
//! Board model shared by the router and the tracks cleaner: integer
//! nanometre geometry, copper shapes with clearance-aware collision tests,
//! the layer stack, a per-layer R-tree spatial index, the board item store,
//! the commit sink and geometric connectivity.

pub mod board;
pub mod commit;
pub mod connectivity;
pub mod geometry;
pub mod layer;
pub mod shape;
pub mod spatial;

pub use board::{
    Board, BoardError, BoardItem, ItemId, ItemKind, NetCode, Pad, PadShape, Track, TrackArc,
    TrackSegment, Via, ViaType, Zone, NETCODE_UNCONNECTED,
};
pub use commit::{BoardCommit, CommitSink, DiscardCommit};
pub use connectivity::{Anchor, ConnectivityData, ConnectivityOracle};
pub use geometry::{BBox, CircularArc, Coord, Point, Seg, ARC_HIGH_DEF};
pub use layer::{Layer, LayerId, LayerRange, LayerSet, LayerStack, EDGE_CUTS};
pub use shape::{Collision, Shape};
pub use spatial::SpatialIndex;
