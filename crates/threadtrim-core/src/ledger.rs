//! Ordered record of detached message blocks.
//!
//! Entries are kept oldest first, which is also top-to-bottom document order.
//! Incremental restore drains from the back (nearest the placeholder); full
//! restore drains everything.

use threadtrim_dom::{Fragment, NodeId};

/// How a detached block is held until it is restored.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockPayload {
    /// The node itself, detached but alive.
    Live(NodeId),
    /// A serialized copy; the original node has been dropped.
    Serialized(Fragment),
}

/// An attribute stripped from an embedded image before detaching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnloadedResource {
    /// Position among the block's `img` descendants in document order.
    pub image_index: usize,
    pub attribute: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub payload: BlockPayload,
    pub height: f64,
    pub unloaded: Vec<UnloadedResource>,
    /// Position among the content parent's blocks when first measured.
    pub order: usize,
}

#[derive(Debug, Default, Clone)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_extent(&self) -> f64 {
        self.entries.iter().map(|entry| entry.height).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    /// Removes every entry, oldest first.
    pub fn take_all(&mut self) -> Vec<LedgerEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Removes up to `count` of the most recently detached entries and
    /// returns them in their original top-to-bottom order.
    pub fn take_newest(&mut self, count: usize) -> Vec<LedgerEntry> {
        let split = self.entries.len().saturating_sub(count);
        self.entries.split_off(split)
    }

    /// Puts back entries a failed restore did not reinsert. They are newer
    /// than anything still held, so they go to the back.
    pub fn return_unrestored(&mut self, entries: impl IntoIterator<Item = LedgerEntry>) {
        self.entries.extend(entries);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
