use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating category slugs
    /// Must be lowercase alphanumeric with hyphens
    /// - Valid: "electronics", "home-garden", "tv-audio-2"
    /// - Invalid: "Electronics", "home_garden", "a b", ""
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9-]+$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_regex_valid() {
        assert!(SLUG_REGEX.is_match("electronics"));
        assert!(SLUG_REGEX.is_match("home-garden"));
        assert!(SLUG_REGEX.is_match("tv-audio-2"));
        assert!(SLUG_REGEX.is_match("a"));
        assert!(SLUG_REGEX.is_match("123"));
    }

    #[test]
    fn test_slug_regex_invalid() {
        assert!(!SLUG_REGEX.is_match("Electronics")); // uppercase
        assert!(!SLUG_REGEX.is_match("home_garden")); // underscore
        assert!(!SLUG_REGEX.is_match("a b")); // space
        assert!(!SLUG_REGEX.is_match("café")); // non-ascii
        assert!(!SLUG_REGEX.is_match("")); // empty
    }
}
