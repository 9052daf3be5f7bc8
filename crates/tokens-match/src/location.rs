//! Input positions and the scan cursor.

use serde::Serialize;
use std::fmt;

/// 1-based position in the scanned input. Front-matter matches carry the
/// zero location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileLocation {
    pub line: usize,
    pub column: usize,
    /// Incremented once for every run of blank lines.
    pub paragraph: usize,
}

impl FileLocation {
    pub fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            paragraph: 1,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} (paragraph {})",
            self.line, self.column, self.paragraph
        )
    }
}

pub(crate) fn chars_equal(a: char, b: char, case_sensitive: bool) -> bool {
    a == b || (!case_sensitive && a.to_lowercase().eq(b.to_lowercase()))
}

/// Forward-only cursor over newline-normalized input.
pub(crate) struct Cursor {
    chars: Vec<char>,
    pos: usize,
    location: FileLocation,
    after_newline: bool,
    in_blank_run: bool,
}

impl Cursor {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            location: FileLocation::start(),
            after_newline: false,
            in_blank_run: false,
        }
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub fn location(&self) -> FileLocation {
        self.location
    }

    pub fn paragraph(&self) -> usize {
        self.location.paragraph
    }

    pub fn advance(&mut self) {
        let Some(c) = self.peek() else {
            return;
        };
        self.pos += 1;
        if c == '\n' {
            if self.after_newline && !self.in_blank_run {
                self.location.paragraph += 1;
                self.in_blank_run = true;
            }
            self.after_newline = true;
            self.location.line += 1;
            self.location.column = 1;
        } else {
            self.after_newline = false;
            self.in_blank_run = false;
            self.location.column += 1;
        }
    }

    pub fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    /// Whether the remaining input starts with `pattern`.
    pub fn looking_at(&self, pattern: &[char], case_sensitive: bool) -> bool {
        let rest = &self.chars[self.pos..];
        rest.len() >= pattern.len()
            && rest
                .iter()
                .zip(pattern)
                .all(|(&a, &b)| chars_equal(a, b, case_sensitive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_and_columns() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.advance_by(4);
        assert_eq!(
            cursor.location(),
            FileLocation {
                line: 2,
                column: 2,
                paragraph: 1
            }
        );
    }

    #[test]
    fn test_paragraph_counts_runs_of_blank_lines() {
        let mut cursor = Cursor::new("a\n\n\n\nb\n\nc");
        cursor.advance_by(5);
        assert_eq!(cursor.paragraph(), 2);
        cursor.advance_by(3);
        assert_eq!(cursor.paragraph(), 3);
    }

    #[test]
    fn test_looking_at() {
        let mut cursor = Cursor::new("Name: Bob");
        let pattern: Vec<char> = "name:".chars().collect();
        assert!(!cursor.looking_at(&pattern, true));
        assert!(cursor.looking_at(&pattern, false));
        cursor.advance_by(6);
        assert!(!cursor.looking_at(&pattern, false));
        cursor.advance_by(10);
        assert_eq!(cursor.peek(), None);
    }
}
