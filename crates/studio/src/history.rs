//! Undo/redo over whole-timeline snapshots.

use glide_project_model::timeline::Timeline;

/// Undo entries kept before the oldest is dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// One applied edit.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub label: String,
    pub before: Timeline,
    pub after: Timeline,
}

impl Transaction {
    pub fn new(label: impl Into<String>, before: Timeline, after: Timeline) -> Self {
        Self {
            label: label.into(),
            before,
            after,
        }
    }

    /// Whether applying the edit changed anything.
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<Transaction>,
    redo: Vec<Transaction>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record an applied edit. Clears the redo stack; no-op edits are
    /// dropped. Returns whether the transaction was kept.
    pub fn record(&mut self, transaction: Transaction) -> bool {
        if transaction.is_noop() {
            return false;
        }
        self.redo.clear();
        self.undo.push(transaction);
        if self.undo.len() > self.limit {
            let excess = self.undo.len() - self.limit;
            self.undo.drain(..excess);
        }
        true
    }

    /// Step back. Returns the label and the snapshot to restore.
    pub fn undo(&mut self) -> Option<(String, Timeline)> {
        let transaction = self.undo.pop()?;
        let restored = (transaction.label.clone(), transaction.before.clone());
        self.redo.push(transaction);
        Some(restored)
    }

    /// Step forward again. Returns the label and the snapshot to restore.
    pub fn redo(&mut self) -> Option<(String, Timeline)> {
        let transaction = self.redo.pop()?;
        let restored = (transaction.label.clone(), transaction.after.clone());
        self.undo.push(transaction);
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo.last().map(|t| t.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo.last().map(|t| t.label.as_str())
    }

    /// Labels of the undo stack, oldest first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.undo.iter().map(|t| t.label.as_str())
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
