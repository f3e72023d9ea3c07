//! # Line ending normalization module
//!
//! Text signatures are computed over data with `\r\n` line endings, and cleartext
//! signatures additionally ignore trailing spaces and tabs on every line.

use std::iter::Peekable;

/// Target line ending for [`Normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreak {
    Crlf,
    Lf,
}

impl AsRef<[u8]> for LineBreak {
    fn as_ref(&self) -> &[u8] {
        match self {
            LineBreak::Crlf => b"\r\n",
            LineBreak::Lf => b"\n",
        }
    }
}

/// Wraps a byte iterator and rewrites `\r\n`, `\r` and `\n` into a single line ending.
///
/// ```
/// use pgp_message::normalize_lines::{LineBreak, Normalized};
///
/// let input = "one\rtwo\r\nthree\n";
/// let out: Vec<u8> = Normalized::new(input.bytes(), LineBreak::Crlf).collect();
/// assert_eq!(out, b"one\r\ntwo\r\nthree\r\n");
/// ```
pub struct Normalized<I>
where
    I: Iterator<Item = u8>,
{
    line_break: LineBreak,
    iter: Peekable<I>,
    pending_lf: bool,
}

impl<I: Iterator<Item = u8>> Normalized<I> {
    pub fn new(iter: I, line_break: LineBreak) -> Normalized<I> {
        Normalized {
            iter: iter.peekable(),
            pending_lf: false,
            line_break,
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for Normalized<I> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.pending_lf {
            self.pending_lf = false;
            return Some(b'\n');
        }

        match self.iter.next()? {
            b'\r' => {
                if self.iter.peek() == Some(&b'\n') {
                    let _ = self.iter.next();
                }
                Some(self.line_end())
            }
            b'\n' => Some(self.line_end()),
            b => Some(b),
        }
    }
}

impl<I: Iterator<Item = u8>> Normalized<I> {
    fn line_end(&mut self) -> u8 {
        match self.line_break {
            LineBreak::Crlf => {
                self.pending_lf = true;
                b'\r'
            }
            LineBreak::Lf => b'\n',
        }
    }
}

/// Normalizes all line endings in `data` to `\r\n`.
pub fn normalize_crlf(data: &[u8]) -> Vec<u8> {
    Normalized::new(data.iter().copied(), LineBreak::Crlf).collect()
}

/// Removes spaces and tabs directly in front of every `\r\n` and at the end of `data`.
///
/// Expects input that was already passed through [`normalize_crlf`].
pub fn strip_trailing_whitespace(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut lines = data.split(|b| *b == b'\n').peekable();

    while let Some(line) = lines.next() {
        let has_cr = line.last() == Some(&b'\r');
        let body = if has_cr {
            &line[..line.len() - 1]
        } else {
            line
        };
        let end = body
            .iter()
            .rposition(|b| *b != b' ' && *b != b'\t')
            .map(|p| p + 1)
            .unwrap_or(0);
        out.extend_from_slice(&body[..end]);
        if has_cr {
            out.push(b'\r');
        }
        if lines.peek().is_some() {
            out.push(b'\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn normalized_lf() {
        let input = "This is a string \n with \r some \n\r\n random newlines\r\r\n\n";
        assert_eq!(
            &String::from_utf8(Normalized::new(input.bytes(), LineBreak::Lf).collect()).unwrap(),
            "This is a string \n with \n some \n\n random newlines\n\n\n"
        );
    }

    #[test]
    fn normalized_crlf() {
        let input = "This is a string \n with \r some \n\r\n random newlines\r\r\n\n";
        assert_eq!(
            &String::from_utf8(normalize_crlf(input.as_bytes())).unwrap(),
            "This is a string \r\n with \r\n some \r\n\r\n random newlines\r\n\r\n\r\n"
        );
    }

    #[test]
    fn strip_keeps_blank_lines() {
        let input = normalize_crlf(b"a  \n\t\n\nb\t \nc ");
        assert_eq!(strip_trailing_whitespace(&input), b"a\r\n\r\n\r\nb\r\nc");
    }

    #[test]
    fn strip_no_line_end() {
        assert_eq!(strip_trailing_whitespace(b""), b"");
        assert_eq!(strip_trailing_whitespace(b"  "), b"");
        assert_eq!(strip_trailing_whitespace(b"x\r\n"), b"x\r\n");
    }
}
