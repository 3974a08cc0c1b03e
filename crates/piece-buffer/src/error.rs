//! Error taxonomy for buffer operations.
//!
//! Edit operations always surface errors; read operations prefer documented
//! sentinel values (empty string, position (1,1)) for trivially out-of-range
//! queries and reserve errors for genuinely invalid input such as a regex
//! that fails to compile.

use thiserror::Error;

/// Errors produced by [`crate::TextBuffer`] operations.
#[derive(Debug, Error)]
pub enum BufferError {
    /// An offset or range lies outside the current document bounds.
    #[error("offset {offset} out of range (document length {len})")]
    OutOfRange {
        /// The offending offset.
        offset: usize,
        /// The document length at the time of the call.
        len: usize,
    },

    /// An argument violated a documented requirement, e.g. an edit offset
    /// that does not fall on a UTF-8 character boundary.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A search pattern failed to compile.
    #[error("invalid search pattern `{pattern}`: {message}")]
    InvalidQuery {
        /// The compiler's diagnostic.
        message: String,
        /// The pattern that failed to compile.
        pattern: String,
    },

    /// A memory reservation failed or an implementation limit was exceeded.
    #[error("resource limit exceeded: {0}")]
    Resource(String),

    /// An operation was called in a state that forbids it, e.g.
    /// `end_group` without a matching `begin_group`.
    #[error("illegal state: {0}")]
    IllegalState(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BufferError>;
