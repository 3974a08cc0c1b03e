//! Chunked buffer construction.
//!
//! File loaders feed content in whatever chunk sizes their I/O produces;
//! the builder accepts those chunks and assembles a [`TextBuffer`] without
//! requiring the caller to concatenate them first. A chunk ending in CR is
//! held back by one byte until the next chunk arrives, so a CRLF pair split
//! across two reads is never treated as two separate terminators.

use crate::buffer::TextBuffer;
use crate::line_ending::{convert_eol, EolPolicy, LineEnding};

/// Incremental constructor for [`TextBuffer`].
///
/// ```rust
/// use piece_buffer::{EolPolicy, TextBufferBuilder};
///
/// let mut builder = TextBufferBuilder::new();
/// builder.accept_chunk("first line\nsec");
/// builder.accept_chunk("ond line\n");
/// let buf = builder.finish(EolPolicy::None);
/// assert_eq!(buf.line_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct TextBufferBuilder {
    chunks: Vec<String>,
    carry_cr: bool,
}

impl TextBufferBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the next chunk of content.
    pub fn accept_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        let mut text = String::with_capacity(chunk.len() + 1);
        if self.carry_cr {
            text.push('\r');
            self.carry_cr = false;
        }
        text.push_str(chunk);
        if text.ends_with('\r') {
            text.pop();
            self.carry_cr = true;
        }
        if !text.is_empty() {
            self.chunks.push(text);
        }
    }

    /// Build the buffer, applying the line-ending policy.
    ///
    /// [`EolPolicy::None`] keeps the content as written and detects the
    /// dominant ending (CRLF, then LF, then CR, defaulting to LF); any other
    /// policy rewrites the content to the selected ending and leaves
    /// normalization enabled for later inserts.
    pub fn finish(mut self, policy: EolPolicy) -> TextBuffer {
        if self.carry_cr {
            self.chunks.push("\r".to_string());
        }

        let mut buf = TextBuffer::new();
        match policy.line_ending() {
            None => {
                buf.set_eol(self.detect());
                buf.set_normalize_eol(false);
                for chunk in &self.chunks {
                    buf.load_content(chunk);
                }
            }
            Some(eol) => {
                buf.set_eol(eol);
                buf.set_normalize_eol(true);
                for chunk in &self.chunks {
                    match convert_eol(chunk, eol) {
                        Some(rewritten) => buf.load_content(&rewritten),
                        None => buf.load_content(chunk),
                    }
                }
            }
        }
        buf
    }

    fn detect(&self) -> LineEnding {
        // Chunk splits never separate a CRLF pair (the CR is carried), so a
        // per-chunk scan sees every pair intact.
        if self.chunks.iter().any(|c| c.contains("\r\n")) {
            LineEnding::Crlf
        } else if self.chunks.iter().any(|c| c.contains('\n')) {
            LineEnding::Lf
        } else if self.chunks.iter().any(|c| c.contains('\r')) {
            LineEnding::Cr
        } else {
            LineEnding::Lf
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_concatenate() {
        let mut b = TextBufferBuilder::new();
        b.accept_chunk("hello ");
        b.accept_chunk("world");
        let buf = b.finish(EolPolicy::None);
        assert_eq!(buf.text(), "hello world");
        assert!(buf.check_integrity());
    }

    #[test]
    fn crlf_split_across_chunks_is_one_break() {
        let mut b = TextBufferBuilder::new();
        b.accept_chunk("line one\r");
        b.accept_chunk("\nline two");
        let buf = b.finish(EolPolicy::None);
        assert_eq!(buf.text(), "line one\r\nline two");
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.eol(), LineEnding::Crlf);
        assert!(buf.check_integrity());
    }

    #[test]
    fn trailing_cr_is_flushed() {
        let mut b = TextBufferBuilder::new();
        b.accept_chunk("abc\r");
        let buf = b.finish(EolPolicy::None);
        assert_eq!(buf.text(), "abc\r");
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.eol(), LineEnding::Cr);
    }

    #[test]
    fn normalization_applies_across_chunks() {
        let mut b = TextBufferBuilder::new();
        b.accept_chunk("a\r");
        b.accept_chunk("\nb\rc");
        let buf = b.finish(EolPolicy::Lf);
        assert_eq!(buf.text(), "a\nb\nc");
        assert_eq!(buf.eol(), LineEnding::Lf);
        assert!(buf.is_normalize_eol());
    }

    #[test]
    fn empty_builder_yields_empty_buffer() {
        let buf = TextBufferBuilder::new().finish(EolPolicy::None);
        assert!(buf.is_empty());
        assert_eq!(buf.line_count(), 0);
        assert_eq!(buf.eol(), LineEnding::Lf);
    }
}
