//! Cursor-anchored matching over the raw input buffer.
//!
//! Every pattern in this crate is anchored with `\A` and applied to the
//! unconsumed tail of the input, so a match can only ever start exactly at
//! the cursor. Matched bytes advance the cursor and bump the line counter
//! by the number of `\n` bytes consumed, which keeps multi-line patterns
//! (blank-line separators, three-line prologues) honest for free.
//!
//! Patterns use `[^\r\n]` where a printf `%s` sat in the original layout;
//! a bare `.` would swallow the `\r` of a CRLF ending into the capture.

use regex::bytes::{Captures, Regex, RegexBuilder};

/// Compiles one of the crate's hard-coded patterns. Unicode is switched
/// off so a negated class matches arbitrary non-newline bytes, the way
/// the linker treats symbol names.
pub(crate) fn pattern(re: &str) -> Regex {
    debug_assert!(re.starts_with(r"\A"));
    RegexBuilder::new(re)
        .unicode(false)
        .build()
        .expect("hard-coded pattern must compile")
}

/// An immutable byte slice with a scan position and a one-origin line
/// counter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
    line_number: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        Cursor {
            input,
            pos: 0,
            line_number: 1,
        }
    }

    /// The unconsumed tail of the input.
    pub(crate) fn rest(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// The line the cursor currently sits on (one-origin).
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    /// Attempts an anchored match at the cursor. On success the cursor
    /// advances past the match and the line counter grows by the number of
    /// newlines consumed; on failure nothing moves.
    pub(crate) fn try_match(&mut self, re: &Regex) -> Option<Captures<'a>> {
        let caps = re.captures(self.rest())?;
        let matched = caps.get(0).map_or(0, |m| m.end());
        self.line_number += self.rest()[..matched]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.pos += matched;
        Some(caps)
    }
}

/// A capture group as raw bytes; the empty slice if the group did not
/// participate in the match.
pub(crate) fn cap_bytes<'a>(caps: &Captures<'a>, index: usize) -> &'a [u8] {
    caps.get(index).map_or(&[], |m| m.as_bytes())
}

/// A capture group as an owned string. Attested maps are ASCII; anything
/// else is converted lossily.
pub(crate) fn cap_string(caps: &Captures<'_>, index: usize) -> String {
    String::from_utf8_lossy(cap_bytes(caps, index)).into_owned()
}

/// Parses a capture group the patterns constrain to `[0-9a-f]+`.
pub(crate) fn cap_hex(caps: &Captures<'_>, index: usize) -> u32 {
    ascii_to_u32(cap_bytes(caps, index), 16)
}

/// Parses a capture group the patterns constrain to `[0-9]+`.
pub(crate) fn cap_dec(caps: &Captures<'_>, index: usize) -> u32 {
    ascii_to_u32(cap_bytes(caps, index), 10)
}

fn ascii_to_u32(bytes: &[u8], radix: u32) -> u32 {
    let mut value = 0u32;
    for &b in bytes {
        match (b as char).to_digit(radix) {
            Some(digit) => value = value.wrapping_mul(radix).wrapping_add(digit),
            None => break,
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    static RE_LINE: Lazy<Regex> = Lazy::new(|| pattern(r"\Aline ([0-9]+)\r?\n"));

    #[test]
    fn matches_are_anchored() {
        let mut cursor = Cursor::new(b"junk line 1\r\nline 2\r\n");
        assert!(cursor.try_match(&RE_LINE).is_none());
        assert_eq!(cursor.line_number(), 1);
    }

    #[test]
    fn advance_counts_lines_for_both_endings() {
        let mut cursor = Cursor::new(b"line 1\r\nline 2\nrest");
        let caps = cursor.try_match(&RE_LINE).unwrap();
        assert_eq!(cap_dec(&caps, 1), 1);
        assert_eq!(cursor.line_number(), 2);
        let caps = cursor.try_match(&RE_LINE).unwrap();
        assert_eq!(cap_dec(&caps, 1), 2);
        assert_eq!(cursor.line_number(), 3);
        assert_eq!(cursor.rest(), b"rest");
    }

    #[test]
    fn multi_line_match_advances_by_newline_count() {
        static RE_GAP: Lazy<Regex> = Lazy::new(|| pattern(r"\A\r?\n\r?\nnext\r?\n"));
        let mut cursor = Cursor::new(b"\r\n\r\nnext\r\n");
        assert!(cursor.try_match(&RE_GAP).is_some());
        assert_eq!(cursor.line_number(), 4);
        assert!(cursor.rest().is_empty());
    }

    #[test]
    fn numeric_captures() {
        static RE_HEX: Lazy<Regex> =
            Lazy::new(|| pattern(r"\A([0-9a-f]{8}) ([0-9]+)\r?\n"));
        let mut cursor = Cursor::new(b"80003100 42\r\n");
        let caps = cursor.try_match(&RE_HEX).unwrap();
        assert_eq!(cap_hex(&caps, 1), 0x8000_3100);
        assert_eq!(cap_dec(&caps, 2), 42);
    }
}
