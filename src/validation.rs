// Validation utilities module
// Provides custom validation functions for domain-specific rules

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

/// Digits with an optional leading '+', allowing spaces, dashes and parentheses
fn telephone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\+?[0-9()\- ]{7,20}$").expect("telephone pattern is a valid regex")
    })
}

/// Validates that a telephone number is plausibly dialable
pub fn validate_telephone(tel: &str) -> Result<(), ValidationError> {
    let digits = tel.chars().filter(|c| c.is_ascii_digit()).count();
    if telephone_pattern().is_match(tel) && digits >= 7 {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_telephone"))
    }
}
