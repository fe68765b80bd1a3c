use serde::{Deserialize, Serialize};

use crate::board::{ItemId, Track};

/// Receiver of structural board changes.
///
/// Every edit a cleanup pass makes is reported here after it has been applied
/// to the board, so persistence and history layers see a consistent log.
pub trait CommitSink {
    fn added(&mut self, item: &Track);
    fn removed(&mut self, item: &Track);
    /// `before` is the pre-image of an item modified in place.
    fn modified(&mut self, before: &Track);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Add,
    Remove,
    Modify,
}

/// One journal entry of a [`BoardCommit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub change: ChangeType,
    pub item: ItemId,
    /// The item as it was before a remove or modify; the new item for an add.
    pub image: Track,
}

impl ChangeEntry {
    /// Human-readable description for logs and change history.
    pub fn description(&self) -> String {
        let verb = match self.change {
            ChangeType::Add => "Add",
            ChangeType::Remove => "Remove",
            ChangeType::Modify => "Modify",
        };
        let kind = match self.image {
            Track::Segment(_) => "track",
            Track::Arc(_) => "arc",
            Track::Via(_) => "via",
        };
        format!("{} {} {}", verb, kind, self.item)
    }
}

/// Ordered change journal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardCommit {
    pub message: String,
    entries: Vec<ChangeEntry>,
}

impl BoardCommit {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            entries: Vec::new(),
        }
    }

    fn push(&mut self, change: ChangeType, image: &Track) {
        let entry = ChangeEntry {
            change,
            item: image.id(),
            image: image.clone(),
        };
        log::trace!("commit: {}", entry.description());
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of every item removed in this commit, in journal order.
    pub fn removed_ids(&self) -> Vec<ItemId> {
        self.entries
            .iter()
            .filter(|e| e.change == ChangeType::Remove)
            .map(|e| e.item)
            .collect()
    }

    /// Ids of every item modified in this commit, in journal order.
    pub fn modified_ids(&self) -> Vec<ItemId> {
        self.entries
            .iter()
            .filter(|e| e.change == ChangeType::Modify)
            .map(|e| e.item)
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl CommitSink for BoardCommit {
    fn added(&mut self, item: &Track) {
        self.push(ChangeType::Add, item);
    }

    fn removed(&mut self, item: &Track) {
        self.push(ChangeType::Remove, item);
    }

    fn modified(&mut self, before: &Track) {
        self.push(ChangeType::Modify, before);
    }
}

/// Sink that drops every change. Used for previews on scratch boards.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardCommit;

impl CommitSink for DiscardCommit {
    fn added(&mut self, _item: &Track) {}
    fn removed(&mut self, _item: &Track) {}
    fn modified(&mut self, _before: &Track) {}
}
