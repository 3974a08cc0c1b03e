//! Undo/redo command stack.
//!
//! Every externally-initiated mutation is recorded as an [`EditCommand`]:
//! a tagged value carrying everything needed to reverse it. Delete and
//! replace capture their pre-image text at execution time, so undo reinserts
//! logically identical content instead of reconstructing it.
//!
//! [`History`] owns the two stacks, the grouping state, and the listener
//! registry; applying a command to the document is the buffer's job (see
//! [`crate::TextBuffer::undo`]), which keeps commands pure data. While a
//! group is open, executed commands accumulate into a composite that lands
//! on the undo stack as a single entry when the outermost group closes.

/// Default maximum number of undo entries retained.
pub const DEFAULT_MAX_UNDO_LEVELS: usize = 100;

/// One recorded, reversible document mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    /// Text was inserted at `offset`. The stored text is the normalized
    /// form actually written to the document.
    Insert {
        /// Document offset of the insertion.
        offset: usize,
        /// The inserted text.
        text: String,
    },
    /// Text was deleted starting at `offset`; `text` is the removed
    /// content, captured before the deletion ran.
    Delete {
        /// Document offset of the deletion start.
        offset: usize,
        /// The removed text.
        text: String,
    },
    /// `removed` was replaced by `inserted` at `offset`. Undo writes
    /// `removed` back over `[offset, offset + inserted.len())`.
    Replace {
        /// Document offset of the replacement start.
        offset: usize,
        /// The replaced (original) text, captured before the edit ran.
        removed: String,
        /// The replacement text.
        inserted: String,
    },
    /// A group of commands undone and redone as one unit, in order.
    Composite {
        /// Description shown for the whole group.
        description: String,
        /// The grouped commands, in execution order.
        commands: Vec<EditCommand>,
    },
}

impl EditCommand {
    /// Human-readable description of the command.
    pub fn describe(&self) -> &str {
        match self {
            Self::Insert { .. } => "Insert Text",
            Self::Delete { .. } => "Delete Text",
            Self::Replace { .. } => "Replace Text",
            Self::Composite { description, .. } => description,
        }
    }
}

/// Snapshot of the history state passed to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryState {
    /// Whether an undo is currently possible.
    pub can_undo: bool,
    /// Whether a redo is currently possible.
    pub can_redo: bool,
    /// Description of the next undo entry, if any.
    pub undo_description: Option<String>,
    /// Description of the next redo entry, if any.
    pub redo_description: Option<String>,
}

/// Opaque token identifying a registered history listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type Listener = Box<dyn FnMut(&HistoryState)>;

/// The undo/redo stacks, grouping state, and listener registry.
pub struct History {
    undo_stack: Vec<EditCommand>,
    redo_stack: Vec<EditCommand>,
    max_undo_levels: usize,
    group_depth: usize,
    open_group: Option<(String, Vec<EditCommand>)>,
    listeners: Vec<(ListenerHandle, Listener)>,
    next_listener: u64,
}

impl History {
    pub(crate) fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo_levels: DEFAULT_MAX_UNDO_LEVELS,
            group_depth: 0,
            open_group: None,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Record a freshly executed command. Clears the redo stack; while a
    /// group is open the command joins the pending composite instead of the
    /// undo stack.
    pub(crate) fn record(&mut self, command: EditCommand) {
        self.redo_stack.clear();
        if let Some((_, commands)) = self.open_group.as_mut() {
            commands.push(command);
        } else {
            self.push_undo(command);
        }
        self.notify();
    }

    pub(crate) fn begin_group(&mut self, description: &str) {
        self.group_depth += 1;
        if self.group_depth == 1 {
            self.open_group = Some((description.to_string(), Vec::new()));
        }
    }

    /// Close one grouping level. On the outermost close, a non-empty
    /// composite is pushed as a single undo entry. Returns `false` when no
    /// group is open.
    pub(crate) fn end_group(&mut self) -> bool {
        if self.group_depth == 0 {
            return false;
        }
        self.group_depth -= 1;
        if self.group_depth == 0 {
            if let Some((description, commands)) = self.open_group.take() {
                if !commands.is_empty() {
                    self.push_undo(EditCommand::Composite {
                        description,
                        commands,
                    });
                }
            }
            self.notify();
        }
        true
    }

    /// Pop the next undo entry. `None` while a group is open or the stack
    /// is empty.
    pub(crate) fn pop_undo(&mut self) -> Option<EditCommand> {
        if self.group_depth > 0 {
            return None;
        }
        self.undo_stack.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<EditCommand> {
        if self.group_depth > 0 {
            return None;
        }
        self.redo_stack.pop()
    }

    pub(crate) fn push_redo(&mut self, command: EditCommand) {
        self.redo_stack.push(command);
    }

    /// Re-push an undone-then-redone command without touching redo.
    pub(crate) fn push_undo_restored(&mut self, command: EditCommand) {
        self.push_undo(command);
    }

    fn push_undo(&mut self, command: EditCommand) {
        self.undo_stack.push(command);
        while self.undo_stack.len() > self.max_undo_levels {
            self.undo_stack.remove(0);
        }
    }

    /// Whether an undo is currently possible.
    pub(crate) fn can_undo(&self) -> bool {
        self.group_depth == 0 && !self.undo_stack.is_empty()
    }

    /// Whether a redo is currently possible.
    pub(crate) fn can_redo(&self) -> bool {
        self.group_depth == 0 && !self.redo_stack.is_empty()
    }

    pub(crate) fn undo_size(&self) -> usize {
        self.undo_stack.len()
    }

    pub(crate) fn redo_size(&self) -> usize {
        self.redo_stack.len()
    }

    pub(crate) fn undo_description(&self) -> Option<String> {
        if !self.can_undo() {
            return None;
        }
        self.undo_stack.last().map(|c| c.describe().to_string())
    }

    pub(crate) fn redo_description(&self) -> Option<String> {
        if !self.can_redo() {
            return None;
        }
        self.redo_stack.last().map(|c| c.describe().to_string())
    }

    /// Drop all history, including any open group.
    pub(crate) fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.group_depth = 0;
        self.open_group = None;
        self.notify();
    }

    /// Set the maximum undo depth, trimming oldest entries immediately.
    ///
    /// # Panics
    ///
    /// Panics if `levels` is zero.
    pub(crate) fn set_max_undo_levels(&mut self, levels: usize) {
        assert!(levels > 0, "max undo levels must be positive");
        self.max_undo_levels = levels;
        while self.undo_stack.len() > self.max_undo_levels {
            self.undo_stack.remove(0);
        }
    }

    pub(crate) fn max_undo_levels(&self) -> usize {
        self.max_undo_levels
    }

    pub(crate) fn add_listener(&mut self, listener: Listener) -> ListenerHandle {
        let handle = ListenerHandle(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((handle, listener));
        handle
    }

    pub(crate) fn remove_listener(&mut self, handle: ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| *h != handle);
        self.listeners.len() != before
    }

    /// Invoke every listener with the current state. Called synchronously
    /// after each state transition.
    pub(crate) fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let state = HistoryState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            undo_description: self.undo_description(),
            redo_description: self.redo_description(),
        };
        for (_, listener) in &mut self.listeners {
            listener(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(offset: usize, text: &str) -> EditCommand {
        EditCommand::Insert {
            offset,
            text: text.to_string(),
        }
    }

    #[test]
    fn record_clears_redo() {
        let mut h = History::new();
        h.record(insert(0, "a"));
        let c = h.pop_undo().unwrap();
        h.push_redo(c);
        assert!(h.can_redo());
        h.record(insert(0, "b"));
        assert!(!h.can_redo());
        assert_eq!(h.undo_size(), 1);
    }

    #[test]
    fn grouping_collapses_to_one_entry() {
        let mut h = History::new();
        h.begin_group("Replace All");
        h.record(insert(0, "a"));
        h.record(insert(1, "b"));
        assert!(!h.can_undo()); // not undoable while the group is open
        assert!(h.end_group());
        assert_eq!(h.undo_size(), 1);
        assert_eq!(h.undo_description().as_deref(), Some("Replace All"));
        match h.pop_undo().unwrap() {
            EditCommand::Composite { commands, .. } => assert_eq!(commands.len(), 2),
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn nested_groups_close_on_outermost_end() {
        let mut h = History::new();
        h.begin_group("outer");
        h.begin_group("inner");
        h.record(insert(0, "a"));
        assert!(h.end_group());
        assert_eq!(h.undo_size(), 0);
        assert!(h.end_group());
        assert_eq!(h.undo_size(), 1);
        assert!(!h.end_group());
    }

    #[test]
    fn empty_group_pushes_nothing() {
        let mut h = History::new();
        h.begin_group("noop");
        assert!(h.end_group());
        assert_eq!(h.undo_size(), 0);
    }

    #[test]
    fn trim_drops_oldest() {
        let mut h = History::new();
        h.set_max_undo_levels(2);
        h.record(insert(0, "a"));
        h.record(insert(1, "b"));
        h.record(insert(2, "c"));
        assert_eq!(h.undo_size(), 2);
        match h.pop_undo().unwrap() {
            EditCommand::Insert { text, .. } => assert_eq!(text, "c"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn listeners_see_transitions_and_can_be_removed() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut h = History::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let handle = h.add_listener(Box::new(move |state: &HistoryState| {
            sink.borrow_mut().push((state.can_undo, state.can_redo));
        }));

        h.record(insert(0, "a"));
        assert_eq!(seen.borrow().last(), Some(&(true, false)));

        assert!(h.remove_listener(handle));
        assert!(!h.remove_listener(handle));
        let count = seen.borrow().len();
        h.record(insert(1, "b"));
        assert_eq!(seen.borrow().len(), count);
    }
}
