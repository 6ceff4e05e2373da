use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern")
});

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("phone pattern"));

/// Every listed field must be non-blank. The error names the missing ones.
pub fn require_filled(fields: &[(&'static str, &str)]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// At least one of the given values must be non-blank.
pub fn require_any(values: &[&str], hint: &str) -> Result<()> {
    if values.iter().any(|v| !v.trim().is_empty()) {
        Ok(())
    } else {
        Err(Error::Validation(hint.to_string()))
    }
}

pub fn check_email(value: &str) -> Result<()> {
    if EMAIL.is_match(value.trim()) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "invalid email address: {value}"
        )))
    }
}

/// Like [`check_email`], but a blank value passes.
pub fn check_optional_email(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Ok(())
    } else {
        check_email(value)
    }
}

pub fn check_phone(value: &str) -> Result<()> {
    if PHONE.is_match(value.trim()) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "contact number must be 10 digits: {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_email_shapes() {
        assert!(check_email("hr@acme.com").is_ok());
        assert!(check_email("first.last+tag@dept.example.co.in").is_ok());
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(check_email("acme.com").is_err());
        assert!(check_email("hr@acme").is_err());
        assert!(check_email("hr @acme.com").is_err());
        assert!(check_email("").is_err());
    }

    #[test]
    fn optional_email_allows_blank() {
        assert!(check_optional_email("").is_ok());
        assert!(check_optional_email("   ").is_ok());
        assert!(check_optional_email("not-an-email").is_err());
    }

    #[test]
    fn phone_must_be_ten_digits() {
        assert!(check_phone("9876543210").is_ok());
        assert!(check_phone(" 9876543210 ").is_ok());
        assert!(check_phone("98765").is_err());
        assert!(check_phone("98765432101").is_err());
        assert!(check_phone("98765-4321").is_err());
    }

    #[test]
    fn require_filled_names_the_blanks() {
        let err = require_filled(&[
            ("name", "ACME"),
            ("email", ""),
            ("package", "  "),
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required fields: email, package"
        );
    }

    #[test]
    fn require_any_needs_one_value() {
        assert!(require_any(&["", "CSE"], "give something").is_ok());
        let err = require_any(&["", "  "], "give something").unwrap_err();
        assert_eq!(err.to_string(), "give something");
    }
}
