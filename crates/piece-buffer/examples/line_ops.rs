//! Line-oriented access over an edited document.
//!
//! Run with: `cargo run --example line_ops`

use piece_buffer::{EolPolicy, TextBuffer};

fn main() {
    let mut buf = TextBuffer::from_text(
        "fn main() {\n    println!(\"hello\");\n}\n",
        EolPolicy::None,
    );

    println!("document: {} bytes, {} lines", buf.len(), buf.line_count());
    for (i, line) in buf.lines().enumerate() {
        println!("{:>3} | {line}", i + 1);
    }

    let offset = buf.offset_at(2, 5);
    buf.insert(offset, "// greeting\n    ").unwrap();

    println!("\nafter insert at line 2:");
    for (i, line) in buf.lines().enumerate() {
        println!("{:>3} | {line}", i + 1);
    }

    let pos = buf.position_at(buf.len() / 2);
    println!(
        "\nmidpoint offset {} is line {}, column {}",
        buf.len() / 2,
        pos.line,
        pos.column
    );
}
