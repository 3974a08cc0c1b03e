//! Frozen, restorable document state.

use crate::line_ending::LineEnding;

/// An immutable capture of the document: full content, line count, and the
/// end-of-line sequence in effect when the snapshot was taken.
///
/// Snapshots share no structure with the live buffers; restoring one rebuilds
/// the store and tree from the content (see
/// [`crate::TextBuffer::restore_snapshot`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    content: String,
    line_count: usize,
    eol: LineEnding,
}

impl Snapshot {
    pub(crate) fn new(content: String, line_count: usize, eol: LineEnding) -> Self {
        Self {
            content,
            line_count,
            eol,
        }
    }

    /// The captured document content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The captured line count.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// The end-of-line sequence in effect at capture time.
    pub fn eol(&self) -> LineEnding {
        self.eol
    }
}
