//! Delimiter scanning using memchr
//!
//! Used by the fragment reader for markup delimiters and by filter
//! conditions for `$` placeholders and quoted literals. All delimiters are
//! ASCII, so every position returned falls on a UTF-8 character boundary
//! and can be used to slice the input `str`.

use memchr::{memchr, memchr2, memmem};

/// Cursor over a string with SIMD-accelerated byte search
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    #[inline]
    pub fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Slice between two positions returned by this scanner
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    #[inline]
    pub fn starts_with(&self, needle: &str) -> bool {
        self.remaining().starts_with(needle)
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    /// Next occurrence of a byte at or after the current position
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, &self.bytes()[self.pos..]).map(|i| self.pos + i)
    }

    /// Next occurrence of either of two bytes
    #[inline]
    pub fn find_byte2(&self, b1: u8, b2: u8) -> Option<usize> {
        memchr2(b1, b2, &self.bytes()[self.pos..]).map(|i| self.pos + i)
    }

    /// Start of the next occurrence of `needle`
    #[inline]
    pub fn find_str(&self, needle: &str) -> Option<usize> {
        memmem::find(&self.bytes()[self.pos..], needle.as_bytes()).map(|i| self.pos + i)
    }

    /// Position of the '>' closing a tag, ignoring '>' inside quoted values
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut quote: Option<u8> = None;
        for (i, &b) in self.bytes()[self.pos..].iter().enumerate() {
            match (quote, b) {
                (None, b'"' | b'\'') => quote = Some(b),
                (Some(q), _) if q == b => quote = None,
                (None, b'>') => return Some(self.pos + i),
                _ => {}
            }
        }
        None
    }

    /// Read an XML name (prefix included) and advance past it
    pub fn read_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        if !self.peek().map(is_name_start_char).unwrap_or(false) {
            return None;
        }
        self.pos += 1;
        while self.peek().map(is_name_char).unwrap_or(false) {
            self.pos += 1;
        }
        Some(&self.input[start..self.pos])
    }

    /// Read a SQL identifier (letters, digits, `_`, `.` for qualified names)
    pub fn read_identifier(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self
            .peek()
            .map(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b >= 0x80)
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        // Identifiers never start with a digit
        match self.input.as_bytes().get(start) {
            Some(b) if self.pos > start && !b.is_ascii_digit() => Some(&self.input[start..self.pos]),
            _ => None,
        }
    }
}

/// ASCII letters, underscore, colon, or any non-ASCII byte
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
pub fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_end_quoted() {
        let scanner = Scanner::new("<a attr=\">test\">content");
        assert_eq!(scanner.find_tag_end_quoted(), Some(15));
    }

    #[test]
    fn test_read_name() {
        let mut scanner = Scanner::new("po:Item-1>");
        assert_eq!(scanner.read_name(), Some("po:Item-1"));
        assert_eq!(scanner.position(), 9);
        assert_eq!(scanner.peek(), Some(b'>'));
    }

    #[test]
    fn test_read_identifier() {
        let mut scanner = Scanner::new("Orders.OrderID = $id");
        assert_eq!(scanner.read_identifier(), Some("Orders.OrderID"));
        scanner.skip_whitespace();
        assert_eq!(scanner.read_identifier(), None);

        let mut digits = Scanner::new("42abc");
        assert_eq!(digits.read_identifier(), None);
    }

    #[test]
    fn test_find_str() {
        let mut scanner = Scanner::new("<!-- a -- b -->tail");
        scanner.advance(4);
        assert_eq!(scanner.find_str("-->"), Some(12));
        assert_eq!(scanner.find_byte2(b'$', b'\''), None);
    }
}
