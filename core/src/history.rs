//! Bounded undo stack.

use crate::grid::Grid;
use crate::progression::CompanionState;
use std::collections::VecDeque;

/// Number of moves that can be undone.
pub const HISTORY_CAPACITY: usize = 5;

/// State captured before a move is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub grid: Grid,
    pub gauge: u32,
    pub companion: CompanionState,
}

/// Stack of the most recent snapshots. Pushing past capacity drops the
/// oldest entry.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        if self.entries.len() >= HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// Most recent snapshot, or None when there is nothing left to undo.
    pub fn pop(&mut self) -> Option<Snapshot> {
        self.entries.pop_back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
