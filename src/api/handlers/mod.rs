//! Route handlers and shared input validation.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;

use regex::Regex;

/// Usernames are 6 to 64 characters from a conservative charset;
/// they feed store key names and log fields.
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9._-]{6,64}$").is_ok_and(|re| re.is_match(username))
}

/// Passwords only carry a length requirement; content is free-form.
pub fn valid_password(password: &str) -> bool {
    (6..=128).contains(&password.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(valid_username("alice.smith"));
        assert!(valid_username("user_01-x"));
        assert!(!valid_username("short"));
        assert!(!valid_username("has spaces here"));
        assert!(!valid_username("emoji😀name"));
        assert!(!valid_username(&"a".repeat(65)));
    }

    #[test]
    fn password_rules() {
        assert!(valid_password("hunter22"));
        assert!(valid_password("pässwörd with spaces"));
        assert!(!valid_password("five5"));
        assert!(!valid_password(&"p".repeat(129)));
    }
}
