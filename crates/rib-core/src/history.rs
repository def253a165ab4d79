//! Undo/redo bookkeeping for design edits.
//!
//! Provides:
//! - `UndoManager` trait, implemented by the [`Designer`](crate::designer::Designer)
//! - `History`, the undo and redo stacks of recorded [`TreeOp`]s
//!
//! An entry holds the inverse of every edit it covers, in the order the edits
//! were made. Replaying an entry applies those ops last-first and yields the
//! entry for the opposite stack.

use web_time::Instant;

use crate::error::EditError;
use crate::tree::TreeOp;

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo, not just track state.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if successful.
    fn undo(&mut self) -> bool;

    /// Perform redo. Returns true if successful.
    fn redo(&mut self) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// One undo step.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    ops: Vec<TreeOp>,
    recorded_at: Instant,
}

impl HistoryEntry {
    fn new() -> Self {
        Self {
            ops: Vec::new(),
            recorded_at: Instant::now(),
        }
    }

    pub fn ops(&self) -> &[TreeOp] {
        &self.ops
    }

    pub fn recorded_at(&self) -> Instant {
        self.recorded_at
    }

    /// Apply the ops last-first through `apply`, collecting the inverses.
    ///
    /// Ops that turn out to be no-ops produce no inverse. On the first
    /// failure the ops already applied are undone again through `apply`, so
    /// the tree is left as it was, and the error is returned.
    pub fn replay(
        self,
        mut apply: impl FnMut(TreeOp) -> Result<Option<TreeOp>, EditError>,
    ) -> Result<HistoryEntry, EditError> {
        let mut inverse = HistoryEntry::new();
        for op in self.ops.into_iter().rev() {
            match apply(op) {
                Ok(Some(undo)) => inverse.ops.push(undo),
                Ok(None) => {}
                Err(error) => {
                    for undo in inverse.ops.into_iter().rev() {
                        if let Err(rollback) = apply(undo) {
                            tracing::warn!(%rollback, "rolling back a failed replay");
                        }
                    }
                    return Err(error);
                }
            }
        }
        Ok(inverse)
    }
}

/// Undo and redo stacks with transaction grouping.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_steps: usize,
    open: Option<HistoryEntry>,
    depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
            open: None,
            depth: 0,
        }
    }

    /// Record the inverse of a committed edit.
    pub fn record(&mut self, inverse: TreeOp) {
        // Clear redo stack on new edit
        self.redo_stack.clear();

        match &mut self.open {
            Some(entry) => entry.ops.push(inverse),
            None => {
                let mut entry = HistoryEntry::new();
                entry.ops.push(inverse);
                self.push_undo(entry);
            }
        }
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        // Trim if over max
        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
    }

    /// Start grouping edits into one step. Transactions nest; only the
    /// outermost `end_transaction` closes the step.
    pub fn begin_transaction(&mut self) {
        self.depth += 1;
        if self.depth == 1 {
            self.open = Some(HistoryEntry::new());
        }
    }

    pub fn end_transaction(&mut self) {
        match self.depth {
            0 => tracing::debug!("end_transaction without begin"),
            1 => {
                self.depth = 0;
                if let Some(entry) = self.open.take().filter(|e| !e.ops.is_empty()) {
                    self.push_undo(entry);
                }
            }
            _ => self.depth -= 1,
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn take_undo(&mut self) -> Option<HistoryEntry> {
        self.undo_stack.pop()
    }

    pub fn take_redo(&mut self) -> Option<HistoryEntry> {
        self.redo_stack.pop()
    }

    /// Push the result of an undo replay.
    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo_stack.push(entry);
    }

    /// Push the result of a redo replay without touching the redo stack.
    pub fn push_undone(&mut self, entry: HistoryEntry) {
        self.push_undo(entry);
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open = None;
        self.depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Uid;

    fn op(n: u64) -> TreeOp {
        TreeOp::SetProperty {
            node: Uid::next(),
            name: smol_str::format_smolstr!("p{n}"),
            value: None,
        }
    }

    fn names(entry: &HistoryEntry) -> Vec<String> {
        entry
            .ops()
            .iter()
            .map(|op| match op {
                TreeOp::SetProperty { name, .. } => name.to_string(),
                other => format!("{other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_record_and_undo() {
        let mut history = History::new(10);
        assert!(!history.can_undo());
        history.record(op(1));
        history.record(op(2));
        assert_eq!(history.undo_len(), 2);
        let entry = history.take_undo().unwrap();
        assert_eq!(names(&entry), ["p2"]);
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut history = History::new(10);
        history.record(op(1));
        let entry = history.take_undo().unwrap();
        history.push_redo(entry);
        assert!(history.can_redo());
        history.record(op(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_max_steps() {
        let mut history = History::new(3);
        for n in 0..5 {
            history.record(op(n));
        }
        assert_eq!(history.undo_len(), 3);
        assert_eq!(names(&history.take_undo().unwrap()), ["p4"]);
        history.take_undo();
        assert_eq!(names(&history.take_undo().unwrap()), ["p2"]);
        assert!(history.take_undo().is_none());
    }

    #[test]
    fn test_nested_transactions_group() {
        let mut history = History::new(10);
        history.begin_transaction();
        history.record(op(1));
        history.begin_transaction();
        history.record(op(2));
        history.end_transaction();
        assert!(!history.can_undo());
        history.record(op(3));
        history.end_transaction();
        assert!(!history.in_transaction());
        assert_eq!(history.undo_len(), 1);
        assert_eq!(names(&history.take_undo().unwrap()), ["p1", "p2", "p3"]);

        // Empty transactions leave no step behind.
        history.begin_transaction();
        history.end_transaction();
        history.end_transaction();
        assert!(!history.can_undo());
    }

    #[test]
    fn test_replay_reverses_order() {
        let mut history = History::new(10);
        history.begin_transaction();
        history.record(op(1));
        history.record(op(2));
        history.end_transaction();

        let entry = history.take_undo().unwrap();
        let mut seen = Vec::new();
        let redo = entry
            .replay(|op| {
                let TreeOp::SetProperty { node, name, .. } = op else {
                    unreachable!()
                };
                seen.push(name.to_string());
                Ok(Some(TreeOp::SetProperty {
                    node,
                    name: smol_str::format_smolstr!("re-{name}"),
                    value: None,
                }))
            })
            .unwrap();
        assert_eq!(seen, ["p2", "p1"]);
        assert_eq!(names(&redo), ["re-p2", "re-p1"]);
    }

    #[test]
    fn test_replay_stops_on_error() {
        let mut history = History::new(10);
        history.record(op(1));
        let entry = history.take_undo().unwrap();
        let result = entry.replay(|op| {
            let TreeOp::SetProperty { node, .. } = op else {
                unreachable!()
            };
            Err(EditError::NodeNotFound(node))
        });
        assert!(matches!(result, Err(EditError::NodeNotFound(_))));
    }

    #[test]
    fn test_failed_replay_rolls_back() {
        let mut history = History::new(10);
        history.begin_transaction();
        history.record(op(1));
        history.record(op(2));
        history.record(op(3));
        history.end_transaction();

        let entry = history.take_undo().unwrap();
        let mut seen = Vec::new();
        let result = entry.replay(|op| {
            let TreeOp::SetProperty { node, name, .. } = op else {
                unreachable!()
            };
            seen.push(name.to_string());
            if name.as_str() == "p1" {
                return Err(EditError::NodeNotFound(node));
            }
            Ok(Some(TreeOp::SetProperty {
                node,
                name: smol_str::format_smolstr!("re-{name}"),
                value: None,
            }))
        });
        assert!(result.is_err());
        assert_eq!(seen, ["p3", "p2", "p1", "re-p2", "re-p3"]);
    }
}
