//! # Undo/Redo History
//!
//! Bounded list of tree snapshots with a cursor.
//!
//! ## Design
//!
//! - Every successful mutation records exactly one snapshot
//! - Recording after an undo drops the snapshots ahead of the cursor
//! - Past capacity the oldest snapshot is evicted and the cursor shifts with it
//! - Undo/redo move the cursor and hand back a copy of that snapshot; the
//!   snapshots themselves are never edited
//!
//! ## Example
//!
//! ```rust
//! use article_editor::{Block, BlockType, History};
//!
//! let mut history = History::new(Vec::new());
//! history.record(&[Block::new_default("a", BlockType::Paragraph)]);
//!
//! let restored = history.undo().unwrap();
//! assert!(restored.is_empty());
//! assert!(history.can_redo());
//! ```

use crate::block::Block;
use std::collections::VecDeque;

/// Number of snapshots kept by default
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// One snapshot of the block tree
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Independent copy of the tree
    pub blocks: Vec<Block>,

    /// Optional description of the change that produced it
    pub description: Option<String>,
}

/// Snapshot-based undo/redo history
#[derive(Debug)]
pub struct History {
    /// Snapshots, oldest first; never empty
    entries: VecDeque<HistoryEntry>,

    /// Index of the live snapshot
    cursor: usize,

    /// Maximum number of snapshots kept
    capacity: usize,
}

impl History {
    /// Create a history seeded with `initial` and the default capacity (50)
    pub fn new(initial: Vec<Block>) -> Self {
        Self::with_capacity(initial, DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a history with a custom capacity (at least 1)
    pub fn with_capacity(initial: Vec<Block>, capacity: usize) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(HistoryEntry {
            blocks: initial,
            description: None,
        });
        Self {
            entries,
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record a new snapshot after a mutation
    pub fn record(&mut self, blocks: &[Block]) {
        self.push(HistoryEntry {
            blocks: blocks.to_vec(),
            description: None,
        });
    }

    /// Record a snapshot with a description of the change
    pub fn record_with_description(&mut self, blocks: &[Block], description: impl Into<String>) {
        self.push(HistoryEntry {
            blocks: blocks.to_vec(),
            description: Some(description.into()),
        });
    }

    fn push(&mut self, entry: HistoryEntry) {
        // Recording invalidates the redo branch
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(entry);

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back; returns a copy of the snapshot that becomes live
    pub fn undo(&mut self) -> Option<Vec<Block>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].blocks.clone())
    }

    /// Step forward; returns a copy of the snapshot that becomes live
    pub fn redo(&mut self) -> Option<Vec<Block>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].blocks.clone())
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of snapshots held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the seed snapshot is never evicted by undo/redo
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The live snapshot
    pub fn current(&self) -> &[Block] {
        &self.entries[self.cursor].blocks
    }

    /// Get the number of undo levels available
    pub fn undo_levels(&self) -> usize {
        self.cursor
    }

    /// Get the number of redo levels available
    pub fn redo_levels(&self) -> usize {
        self.entries.len() - 1 - self.cursor
    }

    /// Description of the change the next undo reverts
    pub fn undo_description(&self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.entries[self.cursor].description.as_deref()
    }

    /// Description of the change the next redo reapplies
    pub fn redo_description(&self) -> Option<&str> {
        self.entries
            .get(self.cursor + 1)
            .and_then(|entry| entry.description.as_deref())
    }

    /// Drop all history and start over from `initial`
    pub fn reset(&mut self, initial: Vec<Block>) {
        self.entries.clear();
        self.entries.push_back(HistoryEntry {
            blocks: initial,
            description: None,
        });
        self.cursor = 0;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
