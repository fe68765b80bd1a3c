use serde::{Deserialize, Serialize};

use copperline_core::board::ItemId;

/// Kind of action a cleanup pass took (or would take, in a dry run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupCode {
    RedundantVia,
    DuplicateTrack,
    ZeroLengthTrack,
    ShortingTrack,
    ShortingVia,
    TrackInPad,
    DanglingTrack,
    DanglingVia,
    MergeTracks,
}

impl CleanupCode {
    pub fn description(&self) -> &'static str {
        match self {
            CleanupCode::RedundantVia => "Redundant via",
            CleanupCode::DuplicateTrack => "Duplicate track",
            CleanupCode::ZeroLengthTrack => "Zero-length track",
            CleanupCode::ShortingTrack => "Track connecting different nets",
            CleanupCode::ShortingVia => "Via connecting different nets",
            CleanupCode::TrackInPad => "Track fully inside pad",
            CleanupCode::DanglingTrack => "Track has unconnected end",
            CleanupCode::DanglingVia => "Via is not connected or connected on only one layer",
            CleanupCode::MergeTracks => "Merge collinear tracks",
        }
    }
}

/// One report record of a cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupItem {
    pub code: CleanupCode,
    /// The one or two items involved; the acted-on item comes first.
    pub items: Vec<ItemId>,
}

impl CleanupItem {
    pub fn new(code: CleanupCode, item: ItemId) -> Self {
        Self {
            code,
            items: vec![item],
        }
    }

    pub fn pair(code: CleanupCode, first: ItemId, second: ItemId) -> Self {
        Self {
            code,
            items: vec![first, second],
        }
    }

    pub fn main_item(&self) -> Option<ItemId> {
        self.items.first().copied()
    }

    pub fn description(&self) -> &'static str {
        self.code.description()
    }
}
