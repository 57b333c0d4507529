use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref KEY_PATTERN: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,7}$").unwrap();
}

/// Syntactic email check used to gate collection keys. Surrounding
/// whitespace is ignored.
pub fn is_valid_key(input: &str) -> bool {
    let input = input.trim();
    !input.is_empty() && KEY_PATTERN.is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_key("a@b.com"));
        assert!(is_valid_key("first.last+tag@sub.example.co"));
        assert!(is_valid_key("  padded@example.org  "));
        assert!(is_valid_key("x_y%z-1@host-name.museum"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for input in [
            "",
            "   ",
            "bad-email",
            "@example.com",
            "user@",
            "user@example",
            "user@example.c",
            "user@example.abcdefgh",
            "user@exa mple.com",
            "us er@example.com",
            "user@example.c0m",
        ] {
            assert!(!is_valid_key(input), "{input:?} should be rejected");
        }
    }
}
