#![warn(missing_docs)]
//! Piece-tree text buffer: the storage core of a text editor.
//!
//! # Overview
//!
//! `piece-buffer` represents a mutable document as an ordered sequence of
//! immutable text fragments ("pieces") indexed by a red-black tree with
//! augmented subtree statistics, so insertions, deletions, offset/line
//! lookups, and searches run in time logarithmic in the number of pieces
//! rather than linear in document size. It sits above a file loader and
//! below any UI, selection model, or highlighter.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  TextBuffer (edits, coordinates, EOL)       │  ← Public API
//! ├──────────────────────┬──────────────────────┤
//! │  History (undo/redo) │  SearchEngine        │
//! ├──────────────────────┴──────────────────────┤
//! │  PieceTree (balanced, augmented)            │  ← Document order
//! ├─────────────────────────────────────────────┤
//! │  BufferStore (original chunks + add buffer) │  ← Text bytes
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use piece_buffer::{EolPolicy, SearchOptions, TextBuffer};
//!
//! let mut buf = TextBuffer::from_text("Initial text", EolPolicy::None);
//!
//! buf.insert_at(1, 1, "Hello, ").unwrap();
//! buf.append("World!").unwrap();
//! assert_eq!(buf.text(), "Hello, Initial textWorld!");
//!
//! let m = buf
//!     .find_next("Initial", 0, &SearchOptions::literal())
//!     .unwrap()
//!     .unwrap();
//! buf.replace(m.start..m.end, "stored").unwrap();
//! assert_eq!(buf.text(), "Hello, stored textWorld!");
//!
//! assert!(buf.undo().is_some());
//! assert_eq!(buf.text(), "Hello, Initial textWorld!");
//! ```
//!
//! # Coordinates
//!
//! Offsets are 0-based byte offsets into the UTF-8 document; lines and
//! columns are 1-based, with columns counted in bytes from the line start.
//! Ranges are half-open. A line terminator is LF, CR, or CRLF (counted
//! once); line contents exclude the terminator.
//!
//! # Concurrency
//!
//! A buffer is a self-contained, single-threaded value: mutations take
//! `&mut self` and callers serialize access. Nothing in the crate touches
//! process-wide state.
//!
//! # Module Description
//!
//! - [`storage`] - buffer chunks, pieces, and line-start scanning
//! - [`buffer`] - the [`TextBuffer`] facade
//! - [`builder`] - chunked initialization
//! - [`search`] - literal/regex search over the piecewise document
//! - [`history`] - the undo/redo command stack
//! - [`snapshot`] - frozen, restorable document states
//! - [`line_ending`] - EOL policy, detection, and conversion
//! - [`error`] - the error taxonomy

pub mod buffer;
pub mod builder;
pub mod error;
pub mod history;
pub mod line_ending;
pub mod search;
pub mod snapshot;
pub mod storage;
mod tree;

pub use buffer::{Lines, Pieces, Position, TextBuffer};
pub use builder::TextBufferBuilder;
pub use error::{BufferError, Result};
pub use history::{
    EditCommand, HistoryState, ListenerHandle, DEFAULT_MAX_UNDO_LEVELS,
};
pub use line_ending::{EolPolicy, LineEnding};
pub use search::{FindMatch, SearchOptions, FIND_MATCHES_CAP};
pub use snapshot::Snapshot;
pub use storage::{Piece, INITIAL_ADDED_CAPACITY, ORIGINAL_BUFFER_SIZE};
