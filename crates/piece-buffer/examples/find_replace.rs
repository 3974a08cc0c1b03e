//! Search and grouped replacement with undo.
//!
//! Run with: `cargo run --example find_replace`

use piece_buffer::{EolPolicy, SearchOptions, TextBuffer};

fn main() {
    let mut buf = TextBuffer::from_text(
        "one fish two fish red fish blue fish\n",
        EolPolicy::None,
    );

    let matches = buf
        .find_all("fish", 0, &SearchOptions::literal(), 100)
        .unwrap();
    println!("found {} matches:", matches.len());
    for m in &matches {
        let pos = buf.position_at(m.start);
        println!("  [{}, {}) at line {}, column {}", m.start, m.end, pos.line, pos.column);
    }

    let count = buf
        .replace_all("fish", &SearchOptions::literal(), "crab", usize::MAX)
        .unwrap();
    println!("\nreplaced {count}: {}", buf.text().trim_end());

    let cursor = buf.undo();
    println!("after undo (cursor {cursor:?}): {}", buf.text().trim_end());
}
