//! Reads the value list of an `IN ()` condition, like `'a', 'b, c', 4`.
use once_cell::sync::Lazy;
use regex::Regex;

static ITEM: Lazy<Regex> = Lazy::new(|| {
    // A quoted item has to be the whole item. Anything else runs up to the next comma, stray
    // quotes included.
    Regex::new(r#"\s*(?:'((?:[^']|'')*)'|"((?:[^"]|"")*)"|([^,]*?))\s*(?:,|$)"#)
        .expect("The IN list item pattern should be valid")
});

/// Splits on commas, except inside quotes. Quotes are removed and doubled quotes unescaped.
/// Bare items are trimmed and empty ones dropped. A quote that doesn't wrap a whole item is kept
/// as part of the value.
pub fn parse(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed);

    ITEM.captures_iter(inner)
        .filter_map(|captures| {
            if let Some(single) = captures.get(1) {
                return Some(single.as_str().replace("''", "'"));
            }

            if let Some(double) = captures.get(2) {
                return Some(double.as_str().replace("\"\"", "\""));
            }

            captures
                .get(3)
                .map(|bare| bare.as_str().trim())
                .filter(|bare| !bare.is_empty())
                .map(str::to_string)
        })
        .collect()
}
