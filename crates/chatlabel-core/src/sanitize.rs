//! Text cleanup applied to every extracted description
//!
//! Strips phone-number shaped substrings (the host prints the raw number of
//! unsaved contacts inside system and group messages), stray `~` glyphs that
//! prefix unsaved names, and spacing artifacts around `:`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// +55 (11) 99999-9999, 11 99999-9999, 9999-9999, 999999999 ...
    static ref PHONE_PATTERN: Regex = Regex::new(
        r"(?:\+\d{1,3}[\s-]?)?(?:\(?\d{2,3}\)?[\s-]?)?\d{4,5}[\s-]?\d{4}"
    )
    .unwrap();

    static ref SPACED_COLON_PATTERN: Regex = Regex::new(r"\s+:\s*").unwrap();

    static ref WHITESPACE_PATTERN: Regex = Regex::new(r"\s+").unwrap();

    /// Trailing message time: "10:42", "9:05 PM", "21:17"
    static ref TRAILING_TIME_PATTERN: Regex =
        Regex::new(r"\s*\d{1,2}:\d{2}(?:\s?[AaPp]\.?[Mm]\.?)?\s*$").unwrap();
}

/// Clean `text` for announcement
///
/// Runs the cleanup pipeline until it stops changing the string. No step ever
/// lengthens the string, so this terminates, and the result is a fixpoint:
/// `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(text: &str) -> String {
    let mut current = clean_once(text);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(text: &str) -> String {
    let without_phones = PHONE_PATTERN.replace_all(text, " ");
    let without_tildes = without_phones.replace('~', "");
    let colons = SPACED_COLON_PATTERN.replace_all(&without_tildes, ": ");
    WHITESPACE_PATTERN.replace_all(&colons, " ").trim().to_string()
}

/// Remove a trailing `HH:MM` message time
pub fn strip_trailing_timestamp(text: &str) -> String {
    TRAILING_TIME_PATTERN.replace(text, "").trim_end().to_string()
}

/// Does `text` still contain something shaped like a phone number?
pub fn contains_phone_number(text: &str) -> bool {
    PHONE_PATTERN.is_match(text)
}
