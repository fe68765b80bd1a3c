use thiserror::Error;

use copperline_core::board::{BoardError, ItemId};

/// Precondition violations of a cleanup call. Refused merges and skipped
/// items are not errors.
#[derive(Error, Debug, PartialEq)]
pub enum CleanupError {
    #[error("Item {0} is not on the board")]
    UnknownItem(ItemId),

    #[error("Item {0} is not a track segment")]
    NotASegment(ItemId),

    #[error("Board update failed: {0}")]
    Board(#[from] BoardError),
}
