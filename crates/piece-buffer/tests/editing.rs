use piece_buffer::{BufferError, EolPolicy, TextBuffer};

#[test]
fn hello_insertion() {
    let mut buf = TextBuffer::from_text("Initial text", EolPolicy::None);
    buf.insert_at(1, 1, "Hello, ").unwrap();
    buf.append("World!").unwrap();
    assert_eq!(buf.text(), "Hello, Initial textWorld!");
    assert_eq!(buf.len(), 25);
    assert_eq!(buf.line_count(), 1);
}

#[test]
fn delete_spanning_pieces() {
    let mut buf = TextBuffer::from_text("abcdef", EolPolicy::None);
    buf.insert(3, "XY").unwrap();
    assert_eq!(buf.text(), "abcXYdef");
    buf.delete(2..6).unwrap();
    assert_eq!(buf.text(), "abef");
    assert_eq!(buf.len(), 4);
    assert!(buf.check_integrity());
}

#[test]
fn inserts_at_every_position() {
    let mut buf = TextBuffer::from_text("ace", EolPolicy::None);
    buf.insert(1, "b").unwrap();
    buf.insert(3, "d").unwrap();
    buf.insert(0, ">").unwrap();
    buf.insert(6, "<").unwrap();
    assert_eq!(buf.text(), ">abcde<");
    assert!(buf.check_integrity());
}

#[test]
fn repeated_edits_build_many_pieces() {
    let mut buf = TextBuffer::new();
    let mut reference = String::new();
    for i in 0..300 {
        let at = (i * 13) % (reference.len() + 1);
        let chunk = match i % 3 {
            0 => "ab",
            1 => "c\n",
            _ => "def",
        };
        buf.insert(at, chunk).unwrap();
        reference.insert_str(at, chunk);
    }
    assert_eq!(buf.text(), reference);
    assert_eq!(buf.len(), reference.len());
    assert!(buf.check_integrity());
}

#[test]
fn delete_everything_then_reuse() {
    let mut buf = TextBuffer::from_text("some\ncontent\nhere", EolPolicy::None);
    buf.delete(0..buf.len()).unwrap();
    assert!(buf.is_empty());
    assert_eq!(buf.line_count(), 0);
    assert_eq!(buf.text(), "");
    buf.append("again").unwrap();
    assert_eq!(buf.text(), "again");
    assert!(buf.check_integrity());
}

#[test]
fn replace_shrinking_and_growing() {
    let mut buf = TextBuffer::from_text("one two three", EolPolicy::None);
    buf.replace(4..7, "2").unwrap();
    assert_eq!(buf.text(), "one 2 three");
    buf.replace(4..5, "twenty-two").unwrap();
    assert_eq!(buf.text(), "one twenty-two three");
    assert!(buf.check_integrity());
}

#[test]
fn replace_entire_document() {
    let mut buf = TextBuffer::from_text("old content", EolPolicy::None);
    buf.replace(0..buf.len(), "new").unwrap();
    assert_eq!(buf.text(), "new");
    assert_eq!(buf.undo(), Some(11));
    assert_eq!(buf.text(), "old content");
}

#[test]
fn empty_edits_are_noops() {
    let mut buf = TextBuffer::from_text("text", EolPolicy::None);
    buf.insert(2, "").unwrap();
    buf.delete(3..3).unwrap();
    buf.replace(1..1, "").unwrap();
    assert_eq!(buf.text(), "text");
    assert!(!buf.can_undo());
}

#[test]
fn out_of_range_edits_fail_cleanly() {
    let mut buf = TextBuffer::from_text("text", EolPolicy::None);
    assert!(matches!(
        buf.insert(5, "x"),
        Err(BufferError::OutOfRange { offset: 5, len: 4 })
    ));
    assert!(matches!(
        buf.delete(2..9),
        Err(BufferError::OutOfRange { .. })
    ));
    assert!(matches!(
        buf.replace(3..1, "x"),
        Err(BufferError::OutOfRange { .. })
    ));
    assert_eq!(buf.text(), "text");
    assert!(!buf.can_undo());
}

#[test]
fn multibyte_text_edits() {
    let mut buf = TextBuffer::from_text("héllo wörld", EolPolicy::None);
    let o = buf.text().find('ö').unwrap();
    buf.replace(o..o + 'ö'.len_utf8(), "o").unwrap();
    assert_eq!(buf.text(), "héllo world");
    assert!(matches!(
        buf.insert(2, "x"), // inside 'é'
        Err(BufferError::InvalidArgument(_))
    ));
    assert!(buf.check_integrity());
}

#[test]
fn char_and_piece_iterators() {
    let mut buf = TextBuffer::from_text("abc", EolPolicy::None);
    buf.insert(1, "12").unwrap();
    let pieces: Vec<&str> = buf.pieces().collect();
    assert_eq!(pieces, vec!["a", "12", "bc"]);
    assert_eq!(buf.char_at(0), Some('a'));
    assert_eq!(buf.char_at(1), Some('1'));
    assert_eq!(buf.char_at(4), Some('c'));
    assert_eq!(buf.char_at(5), None);
}

#[test]
fn large_document_loads_in_chunks() {
    let line = "the quick brown fox jumps over the lazy dog\n";
    let text: String = line.repeat(4000); // ~176 KiB, several original chunks
    let mut buf = TextBuffer::from_text(&text, EolPolicy::None);
    assert_eq!(buf.len(), text.len());
    assert_eq!(buf.line_count(), 4000);
    buf.insert(text.len() / 2, "MARK").unwrap();
    assert_eq!(buf.len(), text.len() + 4);
    assert!(buf.check_integrity());
}
