use once_cell::sync::Lazy;
use regex::Regex;

pub const PASSWORD_MIN_LEN: usize = 8;

// Allowed alphabet for credentials. The "at least one of each class" rules
// are checked separately since the regex crate has no lookahead.
static PASSWORD_ALPHABET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9@$!%*?&]+$").expect("static regex"));
static HAS_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").expect("static regex"));
static HAS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").expect("static regex"));
static HAS_SPECIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[@$!%*?&]").expect("static regex"));

/// Password policy: at least eight characters from letters, digits and
/// `@$!%*?&`, with at least one of each class.
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_LEN
        && PASSWORD_ALPHABET.is_match(password)
        && HAS_LETTER.is_match(password)
        && HAS_DIGIT.is_match(password)
        && HAS_SPECIAL.is_match(password)
}

pub fn all_filled(fields: &[&str]) -> bool {
    fields.iter().all(|field| !field.is_empty())
}
