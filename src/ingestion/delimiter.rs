//! CSV field separator inference.
//!
//! The heuristic is intentionally simple: sample the first few non-blank lines and keep the
//! candidates whose per-line count is the same (and non-zero) on every sampled line. Candidates
//! are tried in a fixed priority order, so when several are consistent the earliest one wins.
//! Quoted sections of a line are not counted.

use std::fmt;

use serde::Serialize;

/// Supported CSV field separators, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
    Tab,
    Pipe,
}

impl Delimiter {
    /// All candidates in priority order.
    pub const CANDIDATES: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Tab,
        Delimiter::Pipe,
    ];

    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }

    pub fn as_char(&self) -> char {
        self.as_byte() as char
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Tab => f.write_str("\\t"),
            other => write!(f, "{}", other.as_char()),
        }
    }
}

/// Infer the delimiter of `text` from its first `sample_lines` non-blank lines.
///
/// Returns [`Delimiter::Comma`] when fewer than two non-blank lines exist or no candidate is
/// consistent across the sample.
pub fn detect_delimiter(text: &str, sample_lines: usize) -> Delimiter {
    // Split on every terminator the csv reader accepts, including a lone `\r`.
    let sample: Vec<&str> = text
        .split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .take(sample_lines)
        .collect();

    if sample.len() < 2 {
        return Delimiter::default();
    }

    Delimiter::CANDIDATES
        .into_iter()
        .find(|candidate| is_consistent(&sample, candidate.as_char()))
        .unwrap_or_default()
}

fn is_consistent(sample: &[&str], delimiter: char) -> bool {
    let mut counts = sample.iter().map(|line| count_unquoted(line, delimiter));
    let Some(first) = counts.next() else {
        return false;
    };
    first > 0 && counts.all(|n| n == first)
}

fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}
