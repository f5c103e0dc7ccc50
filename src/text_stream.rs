use crate::language::{EOC, EOLS};
use crate::location::Location;

/// Character-level reader over the text of one source unit.
///
/// The text always ends with the [`EOC`] sentinel; reading past it keeps
/// answering the sentinel.
#[derive(Debug, Clone)]
pub struct TextStream {
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl TextStream {
    pub fn new(text: &str) -> Self {
        let mut chars: Vec<char> = text.chars().collect();
        if chars.last() != Some(&EOC) {
            chars.push(EOC);
        }
        Self {
            chars,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Location of the next unread character.
    #[must_use]
    pub fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn peek(&self) -> char {
        self.char_at(self.position)
    }

    /// The character `n` places after the next one.
    #[must_use]
    pub fn peek_at(&self, n: usize) -> char {
        self.char_at(self.position + n)
    }

    #[must_use]
    pub fn peek_is(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.char_at(self.position + i) == c)
    }

    #[must_use]
    pub fn peek_any(&self, chars: &[char]) -> bool {
        chars.contains(&self.peek())
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.peek() == EOC
    }

    /// Consumes one character and answers it.
    pub fn advance(&mut self) -> char {
        let c = self.peek();
        if self.position < self.chars.len() {
            self.position += 1;
            // `\r\n` is one break, counted at its `\n`
            if c == '\n' || (c == '\r' && self.peek() != '\n') {
                self.line += 1;
                self.column = 1;
            } else if c != '\r' {
                self.column += 1;
            }
        }
        c
    }

    /// Consumes `text` if the stream continues with it.
    pub fn eat(&mut self, text: &str) -> bool {
        if self.peek_is(text) {
            for _ in text.chars() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    /// Consumes characters while `accept` holds, appending them to `into`.
    pub fn eat_while(&mut self, into: &mut String, mut accept: impl FnMut(char) -> bool) {
        while !self.at_end() && accept(self.peek()) {
            into.push(self.advance());
        }
    }

    /// The unread part of the current line, not including the line break.
    #[must_use]
    pub fn rest_of_line(&self) -> String {
        self.chars[self.position.min(self.chars.len())..]
            .iter()
            .take_while(|c| !EOLS.contains(c) && **c != EOC)
            .collect()
    }

    /// Text between two positions, the sentinel excluded.
    #[must_use]
    pub fn slice(&self, from: usize, to: usize) -> String {
        let to = to.min(self.chars.len());
        self.chars[from.min(to)..to]
            .iter()
            .filter(|c| **c != EOC)
            .collect()
    }

    fn char_at(&self, index: usize) -> char {
        self.chars.get(index).copied().unwrap_or(EOC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_lines_and_columns() {
        let mut stream = TextStream::new("ab\ncd");
        assert_eq!(stream.location(), Location::new(1, 1));
        stream.advance();
        stream.advance();
        assert_eq!(stream.location(), Location::new(1, 3));
        assert_eq!(stream.advance(), '\n');
        assert_eq!(stream.location(), Location::new(2, 1));
        assert_eq!(stream.rest_of_line(), "cd");
    }

    #[test]
    fn test_every_line_break_style() {
        let mut stream = TextStream::new("a\rb\r\nc\nd");
        let mut starts = Vec::new();
        while !stream.at_end() {
            let location = stream.location();
            if stream.advance().is_alphabetic() {
                starts.push(location);
            }
        }
        assert_eq!(
            starts,
            vec![
                Location::new(1, 1),
                Location::new(2, 1),
                Location::new(3, 1),
                Location::new(4, 1),
            ]
        );
    }

    #[test]
    fn test_sentinel_is_sticky() {
        let mut stream = TextStream::new("");
        assert!(stream.at_end());
        assert_eq!(stream.advance(), EOC);
        assert_eq!(stream.advance(), EOC);
    }

    #[test]
    fn test_eat_requires_full_match() {
        let mut stream = TextStream::new("###x");
        assert!(!stream.eat("####"));
        assert!(stream.eat("###"));
        assert_eq!(stream.peek(), 'x');
    }
}
