//! Punctuation-driven sentence segmentation.

use super::normalize::normalize;

/// Lowercased tokens that end in a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "e.g", "i.e", "a.m", "p.m", "u.s",
    "u.k", "approx", "dept", "fig", "mt", "ft", "lt", "sgt", "capt", "gen", "rev",
];

/// Closing characters that stay attached to the sentence they terminate.
const CLOSERS: &[char] = &['"', '\'', ')', ']', '}', '\u{201d}', '\u{2019}'];

/// A sentence borrowed from its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    /// Position within the document, starting at zero.
    pub index: usize,
    /// Trimmed source text.
    pub text: &'a str,
}

impl Sentence<'_> {
    /// Form compared against exemplar phrases.
    pub fn normalized(&self) -> String {
        normalize(self.text)
    }
}

/// Lazy iterator over the sentences of a text.
///
/// Cloning yields an independent cursor, so a sequence can be restarted by
/// keeping a clone of the fresh iterator.
#[derive(Debug, Clone)]
pub struct Sentences<'a> {
    text: &'a str,
    pos: usize,
    index: usize,
}

/// Split `text` into trimmed, non-empty sentences in source order.
///
/// Boundaries are runs of `.`, `?` or `!` followed by whitespace or the end of
/// input, and line breaks (a post title is joined to its body with one).
/// A period after a known abbreviation, a single-letter initial or inside a
/// token (decimals, URLs) does not end a sentence.
pub fn split_sentences(text: &str) -> Sentences<'_> {
    Sentences {
        text,
        pos: 0,
        index: 0,
    }
}

impl<'a> Sentences<'a> {
    /// Byte offset just past the sentence starting at `start`.
    fn boundary_from(&self, start: usize) -> usize {
        let bytes = self.text.as_bytes();
        let mut iter = self.text[start..].char_indices().peekable();
        while let Some((offset, ch)) = iter.next() {
            let at = start + offset;
            if ch == '\n' {
                return at;
            }
            if !matches!(ch, '.' | '?' | '!') {
                continue;
            }
            let mut end = at + ch.len_utf8();
            let mut only_period = ch == '.';
            while let Some(&(next_offset, next)) = iter.peek() {
                if matches!(next, '.' | '?' | '!') || CLOSERS.contains(&next) {
                    only_period &= next != '?' && next != '!' && next != '.';
                    end = start + next_offset + next.len_utf8();
                    iter.next();
                } else {
                    break;
                }
            }
            let at_break = end >= bytes.len() || self.text[end..].starts_with(char::is_whitespace);
            if !at_break {
                continue;
            }
            if only_period && self.ends_with_abbreviation(start, at, end) {
                continue;
            }
            return end;
        }
        self.text.len()
    }

    /// Whether the token ending at byte `period` (exclusive) is an abbreviation.
    ///
    /// A lone capital only counts as an initial next to another initial
    /// ("J. K. Rowling"), so "I got an A. Then..." still splits.
    fn ends_with_abbreviation(&self, start: usize, period: usize, end: usize) -> bool {
        let mut before = self.text[start..period].rsplit(char::is_whitespace);
        let token = before
            .next()
            .unwrap_or_default()
            .trim_start_matches(|c: char| !c.is_alphanumeric());
        if token.is_empty() {
            return false;
        }
        if ABBREVIATIONS.contains(&token.to_lowercase().as_str()) {
            return true;
        }
        let previous = before.find(|t| !t.is_empty());
        let next = self.text[end..].split_whitespace().next();
        is_initial_letter(token)
            && (previous.is_some_and(is_initial) || next.is_some_and(is_initial))
    }
}

fn is_initial_letter(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
}

/// A token such as `J.`: one capital followed by a period.
fn is_initial(token: &str) -> bool {
    token
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .strip_suffix('.')
        .is_some_and(is_initial_letter)
}

impl<'a> Iterator for Sentences<'a> {
    type Item = Sentence<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            let start = self.pos;
            let end = self.boundary_from(start);
            self.pos = if end == start { start + 1 } else { end };
            let trimmed = self.text[start..end].trim();
            if trimmed.is_empty() {
                continue;
            }
            let sentence = Sentence {
                index: self.index,
                text: trimmed,
            };
            self.index += 1;
            return Some(sentence);
        }
        None
    }
}

impl std::iter::FusedIterator for Sentences<'_> {}
