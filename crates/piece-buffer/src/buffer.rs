//! The text buffer facade.
//!
//! # Overview
//!
//! [`TextBuffer`] ties the storage, tree, history, and search layers into the
//! public editing surface. A document is the in-order concatenation of the
//! tree's pieces; every edit reduces to appending text to the added buffer,
//! splitting at most two pieces, and inserting or removing nodes; the
//! backing bytes are never moved.
//!
//! Coordinates: offsets are 0-based byte offsets, lines and columns are
//! 1-based (columns counted in bytes from the line start), and ranges are
//! half-open. Edit offsets must fall on UTF-8 character boundaries.
//!
//! # Example
//!
//! ```rust
//! use piece_buffer::{EolPolicy, TextBuffer};
//!
//! let mut buf = TextBuffer::from_text("Hello world", EolPolicy::None);
//! buf.replace(6..11, "piece tree").unwrap();
//! assert_eq!(buf.text(), "Hello piece tree");
//! assert!(buf.undo().is_some());
//! assert_eq!(buf.text(), "Hello world");
//! ```

use std::borrow::Cow;
use std::ops::Range;

use crate::error::{BufferError, Result};
use crate::history::{EditCommand, History, HistoryState, ListenerHandle};
use crate::line_ending::{convert_eol, EolPolicy, LineEnding};
use crate::search::{self, FindMatch, SearchOptions};
use crate::snapshot::Snapshot;
use crate::storage::{compute_line_starts, BufferStore};
use crate::tree::{InOrder, PieceTree, NIL};

/// A 1-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in bytes from the line start.
    pub column: usize,
}

impl Position {
    /// Create a new position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A mutable text document backed by a piece tree.
///
/// All mutations are serialized through `&mut self`; reads are plain `&self`
/// and must not be interleaved with writes without external synchronization.
pub struct TextBuffer {
    store: BufferStore,
    tree: PieceTree,
    history: History,
    eol: LineEnding,
    normalize_eol: bool,
}

impl TextBuffer {
    /// Create an empty buffer (LF line ending, normalization off).
    pub fn new() -> Self {
        Self {
            store: BufferStore::new(),
            tree: PieceTree::new(),
            history: History::new(),
            eol: LineEnding::Lf,
            normalize_eol: false,
        }
    }

    /// Create a buffer from initial text.
    ///
    /// With [`EolPolicy::None`] the content is stored as written and the
    /// dominant line ending is detected; any other policy selects that
    /// ending, rewrites the initial content, and enables normalization for
    /// subsequent inserts.
    pub fn from_text(text: &str, policy: EolPolicy) -> Self {
        let mut builder = crate::builder::TextBufferBuilder::new();
        builder.accept_chunk(text);
        builder.finish(policy)
    }

    /// Clear the document, history, and buffers. The configured line ending
    /// and normalization flag are kept.
    pub fn reset(&mut self) {
        self.tree.clear();
        self.store.reset();
        self.history.clear();
    }

    pub(crate) fn load_content(&mut self, text: &str) {
        let (first, count) = self.store.load_original(text);
        let mut at = self.tree.total_len();
        for i in 0..count {
            let id = first + i;
            let (len, line_starts) = {
                let chunk = self.store.buffer(id);
                (chunk.len(), compute_line_starts(chunk))
            };
            let piece = crate::storage::Piece {
                buffer: id,
                start: 0,
                len,
                line_starts,
            };
            self.tree.insert_piece(piece, at);
            at += len;
        }
    }

    // ---- inspection ----

    /// Total document length in bytes.
    pub fn len(&self) -> usize {
        self.tree.total_len()
    }

    /// Whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// The complete document content.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.len());
        for s in self.piece_slices() {
            out.push_str(s);
        }
        out
    }

    /// The document content with every terminator rewritten to `eol`.
    pub fn text_with_eol(&self, eol: LineEnding) -> String {
        let text = self.text();
        match convert_eol(&text, eol) {
            Some(converted) => converted,
            None => text,
        }
    }

    /// The text in `[range.start, range.end)`.
    ///
    /// The end is clamped to the document length; an empty or inverted range
    /// yields an empty string.
    ///
    /// # Panics
    ///
    /// Panics if a range edge falls inside a UTF-8 sequence.
    pub fn text_range(&self, range: Range<usize>) -> String {
        let start = range.start;
        let end = range.end.min(self.len());
        if start >= end {
            return String::new();
        }
        let mut out = String::with_capacity(end - start);
        let Some((first, first_start)) = self.tree.find_by_offset(start) else {
            return out;
        };
        let mut n = first;
        let mut ns = first_start;
        let mut cur = start;
        while n != NIL && cur < end {
            let piece = self.tree.piece(n);
            let text = self.store.piece_text(piece);
            let from = cur - ns;
            let to = (end - ns).min(piece.len);
            out.push_str(&text[from..to]);
            cur = ns + to;
            ns += piece.len;
            n = self.tree.successor(n);
        }
        out
    }

    /// Number of lines: the total line-break count, plus one if the document
    /// is non-empty and does not end in a terminator. An empty document has
    /// zero lines.
    pub fn line_count(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let breaks = self.tree.total_breaks();
        let last = self.tree.last();
        let piece = self.tree.piece(last);
        let text = self.store.piece_text(piece);
        match text.as_bytes()[piece.len - 1] {
            b'\n' | b'\r' => breaks,
            _ => breaks + 1,
        }
    }

    /// Content byte range of 1-based `line`, terminator excluded.
    ///
    /// Lines past the document yield the empty range at the document end.
    ///
    /// # Panics
    ///
    /// Panics if `line` is zero.
    pub fn line_range(&self, line: usize) -> Range<usize> {
        assert!(line >= 1, "line numbers are 1-based");
        let Some((first, off_in)) = self.tree.find_by_line(line) else {
            return self.len()..self.len();
        };
        let start = self.tree.doc_start(first) + off_in;
        let mut end = start;
        let mut n = first;
        let mut rel = off_in;
        'scan: while n != NIL {
            let piece = self.tree.piece(n);
            let bytes = self.store.piece_text(piece).as_bytes();
            while rel < piece.len {
                match bytes[rel] {
                    b'\n' | b'\r' => break 'scan,
                    _ => {
                        end += 1;
                        rel += 1;
                    }
                }
            }
            n = self.tree.successor(n);
            rel = 0;
        }
        start..end
    }

    /// Content of 1-based `line`, terminator excluded. Missing lines yield
    /// an empty string.
    ///
    /// # Panics
    ///
    /// Panics if `line` is zero.
    pub fn line_content(&self, line: usize) -> String {
        self.text_range(self.line_range(line))
    }

    /// Contents of lines `from..=to` (1-based, inclusive). Missing lines
    /// are returned as empty strings.
    ///
    /// # Panics
    ///
    /// Panics if `from` is zero.
    pub fn lines_content(&self, from: usize, to: usize) -> Vec<String> {
        assert!(from >= 1, "line numbers are 1-based");
        (from..=to).map(|line| self.line_content(line)).collect()
    }

    /// Byte length of 1-based `line`, terminator excluded.
    ///
    /// # Panics
    ///
    /// Panics if `line` is zero.
    pub fn line_length(&self, line: usize) -> usize {
        let range = self.line_range(line);
        range.end - range.start
    }

    /// The character starting at `offset`, if the offset is in bounds and on
    /// a character boundary.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        let (n, ns) = self.tree.find_by_offset(offset)?;
        let piece = self.tree.piece(n);
        let text = self.store.piece_text(piece);
        text.get(offset - ns..)?.chars().next()
    }

    /// The character at a 1-based line/column position.
    ///
    /// # Panics
    ///
    /// Panics if `line` or `column` is zero.
    pub fn char_at_position(&self, line: usize, column: usize) -> Option<char> {
        self.char_at(self.offset_at(line, column))
    }

    /// The character ending at `offset` (i.e. the one just before it).
    pub(crate) fn char_before(&self, offset: usize) -> Option<char> {
        if offset == 0 {
            return None;
        }
        let (n, ns) = self.tree.find_by_offset(offset - 1)?;
        let piece = self.tree.piece(n);
        let text = self.store.piece_text(piece);
        text.get(..offset - ns)?.chars().next_back()
    }

    /// Translate an offset to a 1-based position.
    ///
    /// `offset == len()` resolves to the end position; offsets past the end
    /// return the sentinel `(1, 1)`.
    pub fn position_at(&self, offset: usize) -> Position {
        if self.is_empty() || offset > self.len() {
            return Position::new(1, 1);
        }
        let (n, rel) = if offset == self.len() {
            let last = self.tree.last();
            (last, self.tree.piece(last).len)
        } else {
            let (n, ns) = self
                .tree
                .find_by_offset(offset)
                .expect("checked: offset < len");
            (n, offset - ns)
        };
        let piece = self.tree.piece(n);
        let local = piece.line_starts.partition_point(|&s| s <= rel);
        let line_start = if local > 0 {
            piece.line_starts[local - 1]
        } else {
            0
        };
        let line = self.tree.breaks_before(n) + local + 1;
        Position::new(line, rel - line_start + 1)
    }

    /// Translate a 1-based position to an offset.
    ///
    /// Columns past the line end clamp to the line end (never spilling onto
    /// the next line); lines past the document clamp to the document length.
    ///
    /// # Panics
    ///
    /// Panics if `line` or `column` is zero.
    pub fn offset_at(&self, line: usize, column: usize) -> usize {
        assert!(line >= 1 && column >= 1, "lines and columns are 1-based");
        let Some((first, off_in)) = self.tree.find_by_line(line) else {
            return self.len();
        };
        let line_start = self.tree.doc_start(first) + off_in;
        if column == 1 {
            return line_start;
        }
        let target = column - 1;
        let mut advanced = 0;
        let mut n = first;
        let mut rel = off_in;
        while n != NIL {
            let piece = self.tree.piece(n);
            let bytes = self.store.piece_text(piece).as_bytes();
            while rel < piece.len {
                match bytes[rel] {
                    b'\n' | b'\r' => return line_start + advanced,
                    _ => {
                        advanced += 1;
                        rel += 1;
                        if advanced == target {
                            return line_start + advanced;
                        }
                    }
                }
            }
            n = self.tree.successor(n);
            rel = 0;
        }
        line_start + advanced
    }

    /// Iterate the pieces of the document in order.
    pub fn pieces(&self) -> Pieces<'_> {
        Pieces {
            buf: self,
            inner: self.tree.in_order(),
        }
    }

    /// Iterate the lines of the document (terminators excluded).
    pub fn lines(&self) -> Lines<'_> {
        Lines {
            buf: self,
            next: 1,
            count: self.line_count(),
        }
    }

    pub(crate) fn piece_slices(&self) -> impl Iterator<Item = &str> + '_ {
        self.tree
            .in_order()
            .map(move |n| self.store.piece_text(self.tree.piece(n)))
    }

    /// Verify every internal invariant: tree balance and aggregates, cached
    /// document starts, per-piece line starts, and the document-level
    /// line-break count. Intended for tests and diagnostics.
    pub fn check_integrity(&self) -> bool {
        if !self.tree.check_integrity() {
            return false;
        }
        for n in self.tree.in_order() {
            let piece = self.tree.piece(n);
            let text = self.store.piece_text(piece);
            if compute_line_starts(text) != piece.line_starts {
                return false;
            }
        }
        self.tree.total_breaks() == compute_line_starts(&self.text()).len()
    }

    // ---- editing ----

    /// Insert `text` at `offset`, recording one undo entry.
    ///
    /// The text is normalized to the buffer's line ending first when
    /// normalization is enabled.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let text = self.normalize_ingress(text).into_owned();
        self.execute(EditCommand::Insert { offset, text })
    }

    /// Insert at a 1-based line/column position.
    ///
    /// # Panics
    ///
    /// Panics if `line` or `column` is zero.
    pub fn insert_at(&mut self, line: usize, column: usize, text: &str) -> Result<()> {
        let offset = self.offset_at(line, column);
        self.insert(offset, text)
    }

    /// Append `text` at the end of the document.
    pub fn append(&mut self, text: &str) -> Result<()> {
        self.insert(self.len(), text)
    }

    /// Delete `[range.start, range.end)`, recording one undo entry.
    /// An empty or inverted range is a no-op.
    pub fn delete(&mut self, range: Range<usize>) -> Result<()> {
        if range.start >= range.end {
            return Ok(());
        }
        self.validate_range(range.start, range.end)?;
        let removed = self.text_range(range.start..range.end);
        self.execute(EditCommand::Delete {
            offset: range.start,
            text: removed,
        })
    }

    /// Replace `[range.start, range.end)` with `text` as a single atomic,
    /// singly-undoable operation.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> Result<()> {
        self.validate_range(range.start, range.end)?;
        let removed = self.text_range(range.start..range.end);
        let inserted = self.normalize_ingress(text).into_owned();
        if removed.is_empty() && inserted.is_empty() {
            return Ok(());
        }
        self.execute(EditCommand::Replace {
            offset: range.start,
            removed,
            inserted,
        })
    }

    /// Replace the first match of `query` at or after the document start.
    /// Returns whether a replacement happened.
    pub fn replace_first(
        &mut self,
        query: &str,
        options: &SearchOptions,
        replacement: &str,
    ) -> Result<bool> {
        match self.find_next(query, 0, options)? {
            None => Ok(false),
            Some(m) => {
                self.replace(m.start..m.end, replacement)?;
                Ok(true)
            }
        }
    }

    /// Replace up to `max_count` matches of `query`, as one undo group.
    /// Returns the number of replacements.
    ///
    /// Matches are located against the pre-replacement document and applied
    /// back-to-front so earlier offsets stay valid; the replacement text is
    /// inserted literally.
    pub fn replace_all(
        &mut self,
        query: &str,
        options: &SearchOptions,
        replacement: &str,
        max_count: usize,
    ) -> Result<usize> {
        let matches = self.find_all(query, 0, options, max_count)?;
        if matches.is_empty() {
            return Ok(0);
        }
        self.history.begin_group("Replace All");
        let mut outcome = Ok(());
        for m in matches.iter().rev() {
            outcome = self.replace(m.start..m.end, replacement);
            if outcome.is_err() {
                break;
            }
        }
        self.history.end_group();
        outcome.map(|()| matches.len())
    }

    // ---- search ----

    /// Find matches at offsets `>= start_offset`, in ascending order, capped
    /// at `min(max_matches, FIND_MATCHES_CAP)`.
    pub fn find_all(
        &self,
        query: &str,
        start_offset: usize,
        options: &SearchOptions,
        max_matches: usize,
    ) -> Result<Vec<FindMatch>> {
        search::find_all(self, query, start_offset, options, max_matches)
    }

    /// First match whose start offset is `>= start_offset`.
    pub fn find_next(
        &self,
        query: &str,
        start_offset: usize,
        options: &SearchOptions,
    ) -> Result<Option<FindMatch>> {
        search::find_next(self, query, start_offset, options)
    }

    /// Last match whose end offset is `<= end_offset`.
    pub fn find_previous(
        &self,
        query: &str,
        end_offset: usize,
        options: &SearchOptions,
    ) -> Result<Option<FindMatch>> {
        search::find_previous(self, query, end_offset, options)
    }

    // ---- history ----

    /// Undo the most recent entry. Returns the resulting cursor offset, or
    /// `None` when there is nothing to undo or a group is open.
    pub fn undo(&mut self) -> Option<usize> {
        let command = self.history.pop_undo()?;
        match self.apply_inverse(&command) {
            Ok(cursor) => {
                self.history.push_redo(command);
                self.history.notify();
                Some(cursor)
            }
            Err(_) => {
                // The document may have been partially rewound; offsets in
                // the remaining entries can no longer be trusted.
                self.history.clear();
                None
            }
        }
    }

    /// Re-apply the most recently undone entry. Returns the resulting
    /// cursor offset, or `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<usize> {
        let command = self.history.pop_redo()?;
        match self.apply(&command) {
            Ok(cursor) => {
                self.history.push_undo_restored(command);
                self.history.notify();
                Some(cursor)
            }
            Err(_) => {
                self.history.clear();
                None
            }
        }
    }

    /// Open an undo group; commands executed until the matching
    /// [`Self::end_group`] form a single undo entry.
    pub fn begin_group(&mut self, description: &str) {
        self.history.begin_group(description);
    }

    /// Close the innermost undo group.
    pub fn end_group(&mut self) -> Result<()> {
        if self.history.end_group() {
            Ok(())
        } else {
            Err(BufferError::IllegalState(
                "end_group without matching begin_group".to_string(),
            ))
        }
    }

    /// Whether an undo is currently possible.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a redo is currently possible.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Description of the next undo entry.
    pub fn undo_description(&self) -> Option<String> {
        self.history.undo_description()
    }

    /// Description of the next redo entry.
    pub fn redo_description(&self) -> Option<String> {
        self.history.redo_description()
    }

    /// Number of undo entries.
    pub fn undo_size(&self) -> usize {
        self.history.undo_size()
    }

    /// Number of redo entries.
    pub fn redo_size(&self) -> usize {
        self.history.redo_size()
    }

    /// Drop all undo/redo history.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Cap the undo depth, trimming oldest entries immediately.
    ///
    /// # Panics
    ///
    /// Panics if `levels` is zero.
    pub fn set_max_undo_levels(&mut self, levels: usize) {
        self.history.set_max_undo_levels(levels);
    }

    /// The configured maximum undo depth.
    pub fn max_undo_levels(&self) -> usize {
        self.history.max_undo_levels()
    }

    /// Register a listener invoked synchronously after each history state
    /// transition. Listeners must not call back into the buffer.
    pub fn add_history_listener(
        &mut self,
        listener: impl FnMut(&HistoryState) + 'static,
    ) -> ListenerHandle {
        self.history.add_listener(Box::new(listener))
    }

    /// Remove a listener by handle. Returns whether it was registered.
    pub fn remove_history_listener(&mut self, handle: ListenerHandle) -> bool {
        self.history.remove_listener(handle)
    }

    // ---- snapshots ----

    /// Capture the current document state.
    pub fn create_snapshot(&self) -> Snapshot {
        Snapshot::new(self.text(), self.line_count(), self.eol)
    }

    /// Rebuild the document from `snapshot`, restoring its line ending.
    /// All undo/redo history is dropped: recorded offsets refer to the
    /// pre-restore document.
    pub fn restore_snapshot(&mut self, snapshot: &Snapshot) {
        self.tree.clear();
        self.store.reset();
        self.load_content(snapshot.content());
        self.eol = snapshot.eol();
        self.history.clear();
    }

    // ---- line ending policy ----

    /// The line ending in effect.
    pub fn eol(&self) -> LineEnding {
        self.eol
    }

    /// Select the line ending used for normalization and reported by
    /// [`Self::eol`]. Existing content is not rewritten.
    pub fn set_eol(&mut self, eol: LineEnding) {
        self.eol = eol;
    }

    /// Whether inserted text is normalized to the buffer's line ending.
    pub fn is_normalize_eol(&self) -> bool {
        self.normalize_eol
    }

    /// Enable or disable ingress normalization.
    pub fn set_normalize_eol(&mut self, normalize: bool) {
        self.normalize_eol = normalize;
    }

    fn normalize_ingress<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !self.normalize_eol {
            return Cow::Borrowed(text);
        }
        match convert_eol(text, self.eol) {
            Some(converted) => Cow::Owned(converted),
            None => Cow::Borrowed(text),
        }
    }

    // ---- command application ----

    fn execute(&mut self, command: EditCommand) -> Result<()> {
        match self.apply(&command) {
            Ok(_) => {
                self.history.record(command);
                Ok(())
            }
            Err(e) => {
                // Validation failures leave the document untouched; a
                // resource failure may not, and the stacks cannot be
                // trusted afterwards.
                if matches!(e, BufferError::Resource(_)) {
                    self.history.clear();
                }
                Err(e)
            }
        }
    }

    fn apply(&mut self, command: &EditCommand) -> Result<usize> {
        match command {
            EditCommand::Insert { offset, text } => {
                self.do_insert(*offset, text)?;
                Ok(offset + text.len())
            }
            EditCommand::Delete { offset, text } => {
                self.do_delete(*offset, offset + text.len())?;
                Ok(*offset)
            }
            EditCommand::Replace {
                offset,
                removed,
                inserted,
            } => {
                self.do_replace(*offset, offset + removed.len(), inserted)?;
                Ok(offset + inserted.len())
            }
            EditCommand::Composite { commands, .. } => {
                let mut cursor = 0;
                for c in commands {
                    cursor = self.apply(c)?;
                }
                Ok(cursor)
            }
        }
    }

    fn apply_inverse(&mut self, command: &EditCommand) -> Result<usize> {
        match command {
            EditCommand::Insert { offset, text } => {
                self.do_delete(*offset, offset + text.len())?;
                Ok(*offset)
            }
            EditCommand::Delete { offset, text } => {
                self.do_insert(*offset, text)?;
                Ok(offset + text.len())
            }
            EditCommand::Replace {
                offset,
                removed,
                inserted,
            } => {
                self.do_replace(*offset, offset + inserted.len(), removed)?;
                Ok(offset + removed.len())
            }
            EditCommand::Composite { commands, .. } => {
                let mut cursor = 0;
                for c in commands.iter().rev() {
                    cursor = self.apply_inverse(c)?;
                }
                Ok(cursor)
            }
        }
    }

    // ---- edit primitives ----

    fn validate_offset(&self, offset: usize) -> Result<()> {
        let len = self.len();
        if offset > len {
            return Err(BufferError::OutOfRange { offset, len });
        }
        if !self.char_boundary_at(offset) {
            return Err(BufferError::InvalidArgument(format!(
                "offset {offset} is not a character boundary"
            )));
        }
        Ok(())
    }

    fn validate_range(&self, start: usize, end: usize) -> Result<()> {
        let len = self.len();
        if start > end || end > len {
            return Err(BufferError::OutOfRange {
                offset: end.max(start),
                len,
            });
        }
        self.validate_offset(start)?;
        self.validate_offset(end)
    }

    fn char_boundary_at(&self, offset: usize) -> bool {
        if offset == 0 || offset == self.len() {
            return true;
        }
        match self.tree.find_by_offset(offset) {
            Some((n, ns)) => {
                let piece = self.tree.piece(n);
                self.store.piece_text(piece).is_char_boundary(offset - ns)
            }
            None => false,
        }
    }

    fn do_insert(&mut self, offset: usize, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.validate_offset(offset)?;
        let added_start = self.store.append_added(text)?;
        self.insert_appended(offset, added_start, text);
        self.fix_crlf_seam(offset)?;
        self.fix_crlf_seam(offset + text.len())?;
        Ok(())
    }

    fn do_delete(&mut self, start: usize, end: usize) -> Result<()> {
        if start >= end {
            return Ok(());
        }
        self.validate_range(start, end)?;
        if start == 0 && end == self.len() {
            self.tree.clear();
            self.store.reset();
            return Ok(());
        }
        self.tree.delete_range(start, end, &self.store);
        self.fix_crlf_seam(start)?;
        Ok(())
    }

    /// Delete `[start, end)` and insert `text` at `start` as one step.
    ///
    /// The replacement bytes are reserved in the added buffer before the
    /// deletion runs, so the pair cannot fail halfway through.
    fn do_replace(&mut self, start: usize, end: usize, text: &str) -> Result<()> {
        self.validate_range(start, end)?;
        let appended = if text.is_empty() {
            None
        } else {
            Some(self.store.append_added(text)?)
        };
        if start < end {
            if start == 0 && end == self.len() {
                // Keep the store: the replacement bytes already live in the
                // added buffer.
                self.tree.clear();
            } else {
                self.tree.delete_range(start, end, &self.store);
            }
        }
        if let Some(added_start) = appended {
            self.insert_appended(start, added_start, text);
        }
        self.fix_crlf_seam(start)?;
        self.fix_crlf_seam(start + text.len())?;
        Ok(())
    }

    /// Splice a piece covering already-appended text into the tree at
    /// `offset`, splitting the covering node when the offset is interior.
    fn insert_appended(&mut self, offset: usize, added_start: usize, text: &str) {
        let piece = self.store.added_piece(added_start, text);
        if offset == self.len() {
            self.tree.insert_piece(piece, offset);
            return;
        }
        let (n, ns) = self
            .tree
            .find_by_offset(offset)
            .expect("checked: offset < len");
        if ns < offset {
            let (left, right) = self.store.split_piece(self.tree.piece(n), offset - ns);
            self.tree.delete_node(n);
            self.tree.insert_piece(left, ns);
            self.tree.insert_piece(right, offset);
        }
        self.tree.insert_piece(piece, offset);
    }

    /// Re-join a CR piece ending and an LF piece beginning that an edit left
    /// adjacent at `seam`, so per-piece line starts keep matching the
    /// document-level counting rule (a CRLF pair is one break).
    ///
    /// Both neighbours shrink by one byte and a two-byte `"\r\n"` piece from
    /// the added buffer takes their place; total length is unchanged.
    fn fix_crlf_seam(&mut self, seam: usize) -> Result<()> {
        if seam == 0 || seam >= self.len() {
            return Ok(());
        }
        let Some((a, a_start)) = self.tree.find_by_offset(seam - 1) else {
            return Ok(());
        };
        let Some((b, b_start)) = self.tree.find_by_offset(seam) else {
            return Ok(());
        };
        if a == b {
            // The pair lives inside one piece and is already counted once.
            return Ok(());
        }
        debug_assert_eq!(b_start, seam);
        let before = {
            let piece = self.tree.piece(a);
            self.store.piece_text(piece).as_bytes()[seam - 1 - a_start]
        };
        let after = {
            let piece = self.tree.piece(b);
            self.store.piece_text(piece).as_bytes()[0]
        };
        if before != b'\r' || after != b'\n' {
            return Ok(());
        }

        let a_piece = self.store.shrink_piece(self.tree.piece(a), false);
        let b_piece = self.store.shrink_piece(self.tree.piece(b), true);
        let join_start = self.store.append_added("\r\n")?;
        let join = self.store.added_piece(join_start, "\r\n");
        self.tree.delete_node(b);
        self.tree.delete_node(a);
        if let Some(p) = a_piece {
            self.tree.insert_piece(p, a_start);
        }
        self.tree.insert_piece(join, seam - 1);
        if let Some(p) = b_piece {
            self.tree.insert_piece(p, seam + 1);
        }
        Ok(())
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// In-order iterator over the document's piece contents.
pub struct Pieces<'a> {
    buf: &'a TextBuffer,
    inner: InOrder<'a>,
}

impl<'a> Iterator for Pieces<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let n = self.inner.next()?;
        Some(self.buf.store.piece_text(self.buf.tree.piece(n)))
    }
}

/// Iterator over line contents (terminators excluded).
pub struct Lines<'a> {
    buf: &'a TextBuffer,
    next: usize,
    count: usize,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.next > self.count {
            return None;
        }
        let line = self.buf.line_content(self.next);
        self.next += 1;
        Some(line)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Insert { at: usize, text: String },
        Delete { at: usize, len: usize },
        Replace { at: usize, len: usize, text: String },
    }

    fn text_strategy() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            prop_oneof![
                4 => proptest::char::range('a', 'e'),
                1 => Just('\n'),
                1 => Just('\r'),
                1 => Just('é'),
            ],
            0..8,
        )
        .prop_map(|chars| chars.into_iter().collect())
    }

    fn op_strategy() -> impl Strategy<Value = Vec<Op>> {
        proptest::collection::vec(
            prop_oneof![
                3 => (any::<usize>(), text_strategy())
                    .prop_map(|(at, text)| Op::Insert { at, text }),
                2 => (any::<usize>(), 0usize..6)
                    .prop_map(|(at, len)| Op::Delete { at, len }),
                1 => (any::<usize>(), 0usize..6, text_strategy())
                    .prop_map(|(at, len, text)| Op::Replace { at, len, text }),
            ],
            1..40,
        )
    }

    /// Clamp `at` to a character boundary of `text`, at most `text.len()`.
    fn boundary(text: &str, at: usize) -> usize {
        let mut at = at % (text.len() + 1);
        while !text.is_char_boundary(at) {
            at -= 1;
        }
        at
    }

    fn boundary_after(text: &str, at: usize) -> usize {
        let mut at = at.min(text.len());
        while !text.is_char_boundary(at) {
            at += 1;
        }
        at
    }

    fn expected_line_count(text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let breaks = crate::storage::compute_line_starts(text).len();
        match text.as_bytes()[text.len() - 1] {
            b'\n' | b'\r' => breaks,
            _ => breaks + 1,
        }
    }

    proptest! {
        #[test]
        fn edits_match_reference_model(ops in op_strategy()) {
            let mut buf = TextBuffer::new();
            let mut reference = String::new();

            for op in ops {
                match op {
                    Op::Insert { at, text } => {
                        let at = boundary(&reference, at);
                        buf.insert(at, &text).unwrap();
                        reference.insert_str(at, &text);
                    }
                    Op::Delete { at, len } => {
                        let start = boundary(&reference, at);
                        let end = boundary_after(&reference, start + len);
                        buf.delete(start..end).unwrap();
                        reference.replace_range(start..end, "");
                    }
                    Op::Replace { at, len, text } => {
                        let start = boundary(&reference, at);
                        let end = boundary_after(&reference, start + len);
                        buf.replace(start..end, &text).unwrap();
                        reference.replace_range(start..end, text.as_str());
                    }
                }
                prop_assert!(buf.check_integrity());
                prop_assert_eq!(buf.len(), reference.len());
                prop_assert_eq!(buf.text(), reference.clone());
                prop_assert_eq!(buf.line_count(), expected_line_count(&reference));
            }
        }

        #[test]
        fn text_range_matches_reference_slices(ops in op_strategy(), a in any::<usize>(), b in any::<usize>()) {
            let mut buf = TextBuffer::new();
            let mut reference = String::new();
            for op in ops {
                if let Op::Insert { at, text } = op {
                    let at = boundary(&reference, at);
                    buf.insert(at, &text).unwrap();
                    reference.insert_str(at, &text);
                }
            }
            let mut a = boundary(&reference, a);
            let mut b = boundary(&reference, b);
            if a > b {
                std::mem::swap(&mut a, &mut b);
            }
            prop_assert_eq!(buf.text_range(a..b), reference[a..b].to_string());
        }

        #[test]
        fn positions_round_trip(ops in op_strategy()) {
            let mut buf = TextBuffer::new();
            let mut reference = String::new();
            for op in ops {
                if let Op::Insert { at, text } = op {
                    let at = boundary(&reference, at);
                    buf.insert(at, &text).unwrap();
                    reference.insert_str(at, &text);
                }
            }
            let bytes = reference.as_bytes();
            for offset in 0..=reference.len() {
                if !reference.is_char_boundary(offset) {
                    continue;
                }
                // Offsets splitting a CRLF pair collapse to the line end.
                if offset > 0
                    && bytes[offset - 1] == b'\r'
                    && bytes.get(offset).is_some_and(|&b| b == b'\n')
                {
                    continue;
                }
                let pos = buf.position_at(offset);
                prop_assert_eq!(buf.offset_at(pos.line, pos.column), offset);
            }
        }

        #[test]
        fn undo_redo_round_trip(ops in op_strategy()) {
            let mut buf = TextBuffer::new();
            let mut reference = String::new();
            let mut states = vec![String::new()];

            for op in ops {
                match op {
                    Op::Insert { at, text } => {
                        let at = boundary(&reference, at);
                        buf.insert(at, &text).unwrap();
                        reference.insert_str(at, &text);
                    }
                    Op::Delete { at, len } => {
                        let start = boundary(&reference, at);
                        let end = boundary_after(&reference, start + len);
                        buf.delete(start..end).unwrap();
                        reference.replace_range(start..end, "");
                    }
                    Op::Replace { at, len, text } => {
                        let start = boundary(&reference, at);
                        let end = boundary_after(&reference, start + len);
                        buf.replace(start..end, &text).unwrap();
                        reference.replace_range(start..end, text.as_str());
                    }
                }
                states.push(reference.clone());
            }

            // Some edits are no-ops (empty insert/delete) and record nothing,
            // so walk back only as far as the history goes. Undoing every
            // entry must land on the initial empty document.
            let undoable = buf.undo_size();
            for _ in 0..undoable {
                prop_assert!(buf.undo().is_some());
            }
            prop_assert_eq!(buf.text(), String::new());
            for _ in 0..undoable {
                prop_assert!(buf.redo().is_some());
            }
            prop_assert_eq!(buf.text(), states.last().unwrap().clone());
            prop_assert!(buf.check_integrity());
        }
    }
}
