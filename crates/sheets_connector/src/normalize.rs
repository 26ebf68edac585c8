use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("static regex is valid"));

/// Normalize a column label into the field name the spreadsheet service uses
/// as a list-feed key.
///
/// Every run of non-word characters is removed and the remainder is
/// lowercased, so "First Name!" becomes "firstname". Applying this twice
/// yields the same result as applying it once.
pub fn normalize_header(name: &str) -> String {
    NON_WORD.replace_all(name, "").to_lowercase()
}
