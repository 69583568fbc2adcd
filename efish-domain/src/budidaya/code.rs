//! Budidaya code generation
//!
//! Generated codes look like `KH-0003`: a prefix taken from the pond name and
//! a zero-padded sequence number. The prefix is the initials of the first
//! three words, or the first three characters of a one-word name.

const FALLBACK_PREFIX: &str = "BDY";

/// Prefix derived from the pond name
pub fn prefix(pond_name: &str) -> String {
    let words: Vec<&str> = pond_name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let prefix: String = match words.as_slice() {
        [] => return FALLBACK_PREFIX.to_string(),
        [word] => word.chars().take(3).collect(),
        many => many.iter().take(3).filter_map(|w| w.chars().next()).collect(),
    };
    prefix.to_uppercase()
}

fn format_code(prefix: &str, seq: u32) -> String {
    format!("{prefix}-{seq:04}")
}

fn split_code(code: &str) -> Option<(&str, u32)> {
    let (prefix, seq) = code.rsplit_once('-')?;
    let seq = seq.parse().ok()?;
    Some((prefix, seq))
}

/// Next code for a pond, continuing `latest` when it carries the pond's prefix
pub fn next_code(pond_name: &str, latest: Option<&str>) -> String {
    let prefix = prefix(pond_name);
    let seq = latest
        .and_then(split_code)
        .filter(|(p, _)| *p == prefix)
        .map_or(1, |(_, seq)| seq.saturating_add(1));
    format_code(&prefix, seq)
}

/// The code after `code` in its sequence
pub fn successor(code: &str) -> String {
    match split_code(code) {
        Some((prefix, seq)) => format_code(prefix, seq.saturating_add(1)),
        None => format_code(code, 1),
    }
}
