use std::collections::VecDeque;

use super::snapshot::GameSnapshot;

/// Fixed-capacity ring of timestamped snapshots, oldest dropped first.
///
/// Kept in memory for replay and debug logging only.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    capacity: usize,
    buf: VecDeque<GameSnapshot>,
}

impl SnapshotHistory {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            buf: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, snapshot: GameSnapshot) {
        if self.capacity == 0 {
            return;
        }
        if self.buf.len() >= self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(snapshot);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&GameSnapshot> {
        self.buf.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameSnapshot> + '_ {
        self.buf.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<GameSnapshot> {
        self.buf.iter().cloned().collect()
    }
}
