use serde::{Deserialize, Serialize};

/// Phase switches for [`TracksCleaner::cleanup_board`](crate::TracksCleaner::cleanup_board).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupOptions {
    /// Report only; leave the board untouched.
    pub dry_run: bool,
    /// Remove tracks and vias shorting different nets.
    pub remove_misconnected: bool,
    /// Remove duplicate vias and vias on through-hole pads.
    pub clean_vias: bool,
    /// Merge collinear segments (also removes zero-length and duplicate segments).
    pub merge_segments: bool,
    /// Remove tracks with an unconnected end.
    pub delete_unconnected: bool,
    /// Remove tracks lying entirely inside a pad.
    pub delete_tracks_in_pad: bool,
    /// Remove vias connected to fewer than two items.
    pub delete_dangling_vias: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            remove_misconnected: false,
            clean_vias: false,
            merge_segments: false,
            delete_unconnected: false,
            delete_tracks_in_pad: false,
            delete_dangling_vias: false,
        }
    }
}

impl CleanupOptions {
    /// Every phase enabled, applied to the board.
    pub fn all() -> Self {
        Self {
            dry_run: false,
            remove_misconnected: true,
            clean_vias: true,
            merge_segments: true,
            delete_unconnected: true,
            delete_tracks_in_pad: true,
            delete_dangling_vias: true,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_dry_run() {
        let options = CleanupOptions::default();
        assert!(options.dry_run);
        assert!(!options.merge_segments);
    }

    #[test]
    fn test_partial_json() {
        let options = CleanupOptions::from_json(r#"{ "merge_segments": true }"#).unwrap();
        assert!(options.dry_run);
        assert!(options.merge_segments);
        assert!(!options.clean_vias);
    }
}
