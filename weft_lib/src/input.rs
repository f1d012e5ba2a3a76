use std::borrow::Cow;

use weft_value::source_map::Position;

/// Source of text matched by a grammar.  Indices are byte offsets into
/// UTF-8 encoded text: a "char" is a single code unit and a "code
/// point" is the decoded `char` starting at an offset.
pub trait Input {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes within `start..end`, both clamped to the input length
    fn slice(&self, start: usize, end: usize) -> &[u8];

    /// Line and column of `index`
    fn position(&self, index: usize) -> Position;

    fn char_at(&self, index: usize) -> Option<u8> {
        self.slice(index, index + 1).first().copied()
    }

    fn code_point_at(&self, index: usize) -> Option<char> {
        let width = utf8_width(self.char_at(index)?)?;
        let bytes = self.slice(index, index + width);
        std::str::from_utf8(bytes).ok()?.chars().next()
    }

    fn text(&self, start: usize, end: usize) -> Cow<'_, str> {
        String::from_utf8_lossy(self.slice(start, end))
    }
}

/// Number of bytes of the UTF-8 sequence started by `first`, `None`
/// for continuation or invalid bytes
pub fn utf8_width(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

/// Input backed by a borrowed string
#[derive(Clone, Debug)]
pub struct StrInput<'a> {
    text: &'a str,
    // Offsets where each line starts, the first one is always zero
    line_starts: Vec<usize>,
}

impl<'a> StrInput<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &'a str {
        self.text
    }
}

impl<'a> From<&'a str> for StrInput<'a> {
    fn from(text: &'a str) -> Self {
        Self::new(text)
    }
}

impl Input for StrInput<'_> {
    fn len(&self) -> usize {
        self.text.len()
    }

    fn slice(&self, start: usize, end: usize) -> &[u8] {
        let bytes = self.text.as_bytes();
        let end = end.min(bytes.len());
        let start = start.min(end);
        &bytes[start..end]
    }

    fn position(&self, index: usize) -> Position {
        let index = index.min(self.text.len());
        let line = self.line_starts.partition_point(|start| *start <= index);
        let line_start = self.line_starts[line - 1];
        let column = match self.text.get(line_start..index) {
            Some(prefix) => prefix.chars().count(),
            // `index` falls within a multi-byte sequence
            None => index - line_start,
        };
        Position::new(index, line, column + 1)
    }
}
