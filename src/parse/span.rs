use std::ops::Range;

/// Byte range of a parsed node in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteSpan {
    /// Byte range in the original text (exclusive end)
    pub range: Range<usize>,
}

impl ByteSpan {
    pub fn new(start: usize, end: usize) -> Self {
        ByteSpan { range: start..end }
    }

    pub fn start(&self) -> usize {
        self.range.start
    }

    pub fn end(&self) -> usize {
        self.range.end
    }

    pub fn len(&self) -> usize {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// True if `offset` lies within the span, both ends included. A cursor
    /// sitting right after the last byte still counts as inside.
    pub fn touches(&self, offset: usize) -> bool {
        self.range.start <= offset && offset <= self.range.end
    }

    /// The spanned slice of `text`
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.range.clone()]
    }
}
