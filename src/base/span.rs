//! Source text positions used when reporting diagnostics.

use std::fmt;

pub use text_size::TextSize;

/// A 0-indexed line and byte column, displayed 1-indexed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

/// Where a diagnostic points inside a source unit.
///
/// Engines report byte offsets; listeners usually want lines, so both are kept.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct Position {
    pub offset: TextSize,
    pub line_col: LineCol,
}

impl Position {
    pub const fn new(offset: TextSize, line_col: LineCol) -> Self {
        Self { offset, line_col }
    }

    /// Position of `offset` inside `text`. Offsets past the end resolve to
    /// the end of the text.
    pub fn in_text(text: &str, offset: TextSize) -> Self {
        let end = usize::from(offset).min(text.len());
        let before = &text.as_bytes()[..end];
        let line = before.iter().filter(|&&b| b == b'\n').count();
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |newline| newline + 1);
        Self::new(offset, LineCol::new(line as u32, (end - line_start) as u32))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.line_col, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_display() {
        assert_eq!(LineCol::new(0, 0).to_string(), "1:1");
        assert_eq!(LineCol::new(5, 10).to_string(), "6:11");
    }

    #[test]
    fn test_position_in_text() {
        let pos = Position::in_text("a\nbc\nd", TextSize::from(4));
        assert_eq!(pos.line_col, LineCol::new(1, 2));
        assert_eq!(pos.to_string(), "2:3");

        let line_start = Position::in_text("package p;\nclass A;\n", TextSize::from(11));
        assert_eq!(line_start.line_col, LineCol::new(1, 0));
    }

    #[test]
    fn test_position_past_end() {
        let pos = Position::in_text("ab", TextSize::from(10));
        assert_eq!(pos.offset, TextSize::from(10));
        assert_eq!(pos.line_col, LineCol::new(0, 2));
    }
}
