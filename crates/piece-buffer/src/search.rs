//! Search over the piecewise document.
//!
//! Queries are compiled to a regex (`regex::escape` for literal queries) and
//! run over a sliding window that follows the pieces in document order, so a
//! search never materializes the whole document up front. A tail of
//! `2 * max(query_len, 128)` bytes is carried across piece hops to catch
//! matches spanning a piece boundary; matches longer than that tail are not
//! guaranteed to be found. Whole-word matching is enforced by checking the
//! characters adjacent to each candidate match (the regex crate has no
//! look-around): a neighbour qualifies as a boundary when it is a document
//! edge, a member of the provided separator set, or (by default)
//! whitespace or punctuation.
//!
//! The window is trimmed at line starts when possible, which keeps
//! `^`/`$` anchors in multi-line mode accurate except for lines longer than
//! the carried tail.

use std::borrow::Cow;

use regex::{Regex, RegexBuilder};

use crate::buffer::TextBuffer;
use crate::error::{BufferError, Result};

/// Hard cap on the number of matches returned by a single `find_all` call.
pub const FIND_MATCHES_CAP: usize = 1000;

/// Minimum window tail carried across piece boundaries, in bytes.
const WINDOW_MARGIN: usize = 128;

/// Options controlling query compilation and match filtering.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Treat the query as a regular expression instead of a literal.
    pub use_regex: bool,
    /// Case-sensitive matching. Defaults to `true`.
    pub case_sensitive: bool,
    /// Only report matches flanked by word boundaries.
    pub whole_word: bool,
    /// Characters that count as word separators for `whole_word`; `None`
    /// uses the default class (whitespace or punctuation).
    pub word_separators: Option<String>,
    /// Collect regex capture groups into [`FindMatch::groups`].
    pub capture_groups: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            use_regex: false,
            case_sensitive: true,
            whole_word: false,
            word_separators: None,
            capture_groups: false,
        }
    }
}

impl SearchOptions {
    /// Case-sensitive literal search, the common default.
    pub fn literal() -> Self {
        Self::default()
    }

    /// Case-sensitive regex search.
    pub fn regex() -> Self {
        Self {
            use_regex: true,
            ..Self::default()
        }
    }
}

/// One search hit, as absolute half-open byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindMatch {
    /// Start offset of the match.
    pub start: usize,
    /// End offset of the match (exclusive).
    pub end: usize,
    /// Matched text; `groups[0]` is the whole match, further entries are
    /// capture groups (empty string for groups that did not participate)
    /// when [`SearchOptions::capture_groups`] is set.
    pub groups: Vec<String>,
}

pub(crate) fn find_all(
    buf: &TextBuffer,
    query: &str,
    start_offset: usize,
    options: &SearchOptions,
    max_matches: usize,
) -> Result<Vec<FindMatch>> {
    let cap = max_matches.min(FIND_MATCHES_CAP);
    let mut out = Vec::new();
    if query.is_empty() || cap == 0 {
        return Ok(out);
    }
    let re = compile(query, options)?;
    scan(buf, &re, query.len(), options, start_offset, |m| {
        out.push(m);
        out.len() < cap
    });
    Ok(out)
}

pub(crate) fn find_next(
    buf: &TextBuffer,
    query: &str,
    start_offset: usize,
    options: &SearchOptions,
) -> Result<Option<FindMatch>> {
    if query.is_empty() {
        return Ok(None);
    }
    let re = compile(query, options)?;
    let mut first = None;
    scan(buf, &re, query.len(), options, start_offset, |m| {
        first = Some(m);
        false
    });
    Ok(first)
}

pub(crate) fn find_previous(
    buf: &TextBuffer,
    query: &str,
    end_offset: usize,
    options: &SearchOptions,
) -> Result<Option<FindMatch>> {
    if query.is_empty() {
        return Ok(None);
    }
    let re = compile(query, options)?;
    let bound = end_offset.min(buf.len());
    let mut last = None;
    scan(buf, &re, query.len(), options, 0, |m| {
        if m.start >= bound {
            return false;
        }
        if m.end <= bound {
            last = Some(m);
        }
        true
    });
    Ok(last)
}

fn compile(query: &str, options: &SearchOptions) -> Result<Regex> {
    let pattern: Cow<'_, str> = if options.use_regex {
        Cow::Borrowed(query)
    } else {
        Cow::Owned(regex::escape(query))
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .multi_line(true)
        .build()
        .map_err(|e| BufferError::InvalidQuery {
            message: e.to_string(),
            pattern: query.to_string(),
        })
}

fn is_boundary(ch: Option<char>, separators: &Option<String>) -> bool {
    match ch {
        None => true,
        Some(c) => match separators {
            Some(set) => set.contains(c),
            None => c.is_whitespace() || c.is_ascii_punctuation(),
        },
    }
}

/// Drive `emit` with matches at offsets `>= start_offset`, in ascending
/// order, until `emit` returns `false` or the document is exhausted.
fn scan(
    buf: &TextBuffer,
    re: &Regex,
    query_len: usize,
    options: &SearchOptions,
    start_offset: usize,
    mut emit: impl FnMut(FindMatch) -> bool,
) {
    let total = buf.len();
    if start_offset >= total {
        return;
    }
    let tail_keep = 2 * query_len.max(WINDOW_MARGIN);
    let mut window = String::new();
    let mut window_base = 0usize;
    let mut cursor = start_offset;

    let mut pieces = buf.piece_slices().peekable();
    // Pieces ending at or before the search start never contribute.
    while let Some(p) = pieces.peek() {
        if window_base + p.len() <= start_offset {
            window_base += p.len();
            pieces.next();
        } else {
            break;
        }
    }

    while let Some(p) = pieces.next() {
        window.push_str(p);
        let window_end = window_base + window.len();
        let last_piece = pieces.peek().is_none();

        while cursor < window_end {
            let local = cursor - window_base;
            let hit = if options.capture_groups {
                re.captures_at(&window, local).map(|caps| {
                    let whole = caps.get(0).expect("group 0 always participates");
                    let groups = caps
                        .iter()
                        .map(|g| g.map(|m| m.as_str().to_string()).unwrap_or_default())
                        .collect();
                    (whole.start(), whole.end(), groups)
                })
            } else {
                re.find_at(&window, local)
                    .map(|m| (m.start(), m.end(), vec![m.as_str().to_string()]))
            };

            let Some((ms, me, groups)) = hit else {
                // Nothing more in this window; a later match may still begin
                // inside the carried tail.
                cursor = cursor.max(window_end.saturating_sub(tail_keep));
                break;
            };

            if ms == me {
                // Zero-width match: step one character forward.
                if ms >= window.len() {
                    cursor = window_base + ms;
                    break;
                }
                let step = window[ms..].chars().next().map_or(1, char::len_utf8);
                cursor = window_base + ms + step;
                continue;
            }

            if me == window.len() && !last_piece {
                // The match touches the window edge and may continue into the
                // next piece; retry once more content has arrived.
                cursor = window_base + ms;
                break;
            }

            let abs_start = window_base + ms;
            let abs_end = window_base + me;
            if options.whole_word
                && !(is_boundary(buf.char_before(abs_start), &options.word_separators)
                    && is_boundary(buf.char_at(abs_end), &options.word_separators))
            {
                let step = window[ms..].chars().next().map_or(1, char::len_utf8);
                cursor = abs_start + step;
                continue;
            }

            if !emit(FindMatch {
                start: abs_start,
                end: abs_end,
                groups,
            }) {
                return;
            }
            cursor = abs_end;
        }

        let mut cut = window
            .len()
            .saturating_sub(tail_keep)
            .min(cursor - window_base);
        if cut > 0 {
            if let Some(nl) = window[..cut].rfind('\n') {
                cut = nl + 1;
            } else {
                while cut > 0 && !window.is_char_boundary(cut) {
                    cut -= 1;
                }
            }
            window.drain(..cut);
            window_base += cut;
        }
    }
}
