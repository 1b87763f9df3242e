//! Scanner
//!
//! Splits raw source into logical lines: trimmed, comment-stripped, empty
//! lines dropped, line numbers preserved for diagnostics. `START` and `END`
//! pragmas are recognized here so the parser never sees them as statements.
//!
//! The scanner is lazy; lines after `END` are only classified if the
//! consumer keeps pulling.

use std::iter::Enumerate;
use std::str::Lines;

/// A non-empty, comment-free source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedLine<'a> {
    /// 1-based line number in the original text
    pub number: usize,
    pub kind: LineKind<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `START [address]`
    Start { operand: Option<&'a str> },
    /// `END`
    End,
    /// Anything else: label, instruction or data definition
    Statement(&'a str),
}

pub struct Scanner<'a> {
    lines: Enumerate<Lines<'a>>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().enumerate(),
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = ScannedLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, raw) in self.lines.by_ref() {
            let text = strip_comment(raw).trim();
            if text.is_empty() {
                continue;
            }
            return Some(ScannedLine {
                number: index + 1,
                kind: classify(text),
            });
        }
        None
    }
}

/// Drops everything from the first `;`
pub fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn classify(text: &str) -> LineKind<'_> {
    let (head, rest) = match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    };
    match head {
        "START" => LineKind::Start {
            operand: (!rest.is_empty()).then_some(rest),
        },
        "END" => LineKind::End,
        _ => LineKind::Statement(text),
    }
}

/// Scan a whole source eagerly
pub fn scan(source: &str) -> Vec<ScannedLine<'_>> {
    Scanner::new(source).collect()
}
