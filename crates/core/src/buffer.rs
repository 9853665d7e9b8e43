//! A plain text buffer with a cursor and an optional selection.
//!
//! Positions are byte offsets into the text and always lie on a char boundary.

use std::ops::Range;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    cursor: usize,
    /// The fixed end of the selection; the cursor is the moving end.
    anchor: Option<usize>,
}

impl TextBuffer {
    /// A buffer with the cursor at the end of `text`.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.len();
        TextBuffer {
            text,
            cursor,
            anchor: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replaces the whole text and moves the cursor to its end.
    pub fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
        self.cursor = self.text.len();
        self.anchor = None;
    }

    fn clamp(&self, pos: usize) -> usize {
        let mut pos = pos.min(self.text.len());
        while !self.text.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    /// Moves the cursor and drops any selection.
    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor = self.clamp(pos);
        self.anchor = None;
    }

    pub fn select(&mut self, anchor: usize, head: usize) {
        let anchor = self.clamp(anchor);
        self.cursor = self.clamp(head);
        self.anchor = (anchor != self.cursor).then_some(anchor);
    }

    pub fn selection(&self) -> Option<Range<usize>> {
        self.anchor
            .map(|anchor| anchor.min(self.cursor)..anchor.max(self.cursor))
    }

    pub fn has_selection(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn selected_text(&self) -> &str {
        self.selection().map(|range| &self.text[range]).unwrap_or("")
    }

    pub fn text_before_cursor(&self) -> &str {
        &self.text[..self.cursor]
    }

    pub fn text_after_cursor(&self) -> &str {
        &self.text[self.cursor..]
    }

    pub fn char_before(&self) -> Option<char> {
        self.text_before_cursor().chars().next_back()
    }

    pub fn char_after(&self) -> Option<char> {
        self.text_after_cursor().chars().next()
    }

    /// Replaces the selection (or inserts at the cursor) and puts the cursor after the new text.
    pub fn replace_selection(&mut self, text: &str) {
        let range = self.selection().unwrap_or(self.cursor..self.cursor);
        let start = range.start;
        self.text.replace_range(range, text);
        self.cursor = start + text.len();
        self.anchor = None;
    }

    /// Inserts at the cursor without moving it.
    pub fn insert_after_cursor(&mut self, text: &str) {
        self.text.insert_str(self.cursor, text);
        if let Some(anchor) = self.anchor.as_mut() {
            if *anchor > self.cursor {
                *anchor += text.len();
            }
        }
    }

    /// Moves the cursor past the next character.
    pub fn step_over(&mut self) {
        if let Some(c) = self.char_after() {
            self.set_cursor(self.cursor + c.len_utf8());
        }
    }

    fn line_start(&self, pos: usize) -> usize {
        self.text[..pos].rfind('\n').map_or(0, |i| i + 1)
    }

    /// Prefixes every line touched by the selection with `unit`.
    ///
    /// A selection ending at the very start of a line does not touch that line.
    pub fn indent_selection(&mut self, unit: &str) {
        let Some(range) = self.selection() else {
            return;
        };
        let mut end = range.end;
        if end > range.start && self.line_start(end) == end {
            end -= 1;
        }
        let mut starts = vec![self.line_start(range.start)];
        starts.extend(
            self.text[range.start..end]
                .match_indices('\n')
                .map(|(i, _)| range.start + i + 1),
        );

        for &start in starts.iter().rev() {
            self.text.insert_str(start, unit);
        }
        let shift = |pos: usize| pos + unit.len() * starts.iter().filter(|&&s| s < pos).count();
        self.cursor = shift(self.cursor);
        self.anchor = self.anchor.map(shift);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_selection_moves_cursor() {
        let mut buffer = TextBuffer::new("hello world");
        buffer.select(6, 11);
        assert_eq!(buffer.selected_text(), "world");
        buffer.replace_selection("there");
        assert_eq!(buffer.text(), "hello there");
        assert_eq!(buffer.cursor(), 11);
        assert!(!buffer.has_selection());
    }

    #[test]
    fn test_insert_after_cursor_keeps_position() {
        let mut buffer = TextBuffer::new("ab");
        buffer.set_cursor(1);
        buffer.insert_after_cursor("XY");
        assert_eq!(buffer.text(), "aXYb");
        assert_eq!(buffer.cursor(), 1);
        assert_eq!(buffer.char_after(), Some('X'));
        buffer.step_over();
        assert_eq!(buffer.cursor(), 2);
    }

    #[test]
    fn test_positions_snap_to_char_boundaries() {
        let mut buffer = TextBuffer::new("aé");
        buffer.set_cursor(2);
        assert_eq!(buffer.cursor(), 1);
        buffer.set_cursor(99);
        assert_eq!(buffer.cursor(), 3);
        assert_eq!(buffer.char_before(), Some('é'));
    }

    #[test]
    fn test_indent_selection_touches_each_line() {
        let mut buffer = TextBuffer::new("a\nbc\nd\ne");
        // From inside "a" to the start of "d": lines "a" and "bc".
        buffer.select(1, 5);
        buffer.indent_selection("  ");
        assert_eq!(buffer.text(), "  a\n  bc\nd\ne");
        assert_eq!(buffer.selected_text(), "\n  bc\n");
    }
}
