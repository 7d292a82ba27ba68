//! Text normalisation applied before embedding comparison.
//!
//! Polarity scoring must not go through here: it relies on punctuation,
//! contractions and intensifiers that this pass removes.

/// Keep ASCII letters, digits and single spaces; lowercase everything.
///
/// Emoji, punctuation and non-Latin scripts are dropped. Runs of whitespace
/// collapse to one space and the result is trimmed, so the function is
/// idempotent.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
        } else if ch.is_ascii_alphanumeric() {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch.to_ascii_lowercase());
        }
    }
    out
}
