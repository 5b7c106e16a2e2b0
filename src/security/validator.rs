//! Fluent input validation.
//!
//! ```text
//! Validator::new(&request.form)
//!     .validate("email", rules::email, "Invalid e-mail")
//!     .validate("name", rules::min_len(3), "Name too short")
//!     .passes()
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

/// Status recorded for every failed field.
pub const INVALID: &str = "is_invalid";

/// Outcome for one field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub status: &'static str,
    pub message: String,
}

/// Collects per-field errors over a set of inputs.
#[derive(Debug, Clone)]
pub struct Validator<'a> {
    inputs: &'a [(String, String)],
    errors: BTreeMap<String, FieldError>,
}

impl<'a> Validator<'a> {
    pub fn new(inputs: &'a [(String, String)]) -> Self {
        Self {
            inputs,
            errors: BTreeMap::new(),
        }
    }

    /// Apply `rule` to the value of `field` (`None` when absent).
    ///
    /// A later failure on the same field replaces the earlier message.
    pub fn validate<R>(mut self, field: &str, rule: R, message: &str) -> Self
    where
        R: Fn(Option<&str>) -> bool,
    {
        let value = self
            .inputs
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str());
        if !rule(value) {
            self.errors.insert(
                field.to_string(),
                FieldError {
                    status: INVALID,
                    message: message.to_string(),
                },
            );
        }
        self
    }

    pub fn errors(&self) -> &BTreeMap<String, FieldError> {
        &self.errors
    }

    pub fn passes(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Stock rules for [`Validator::validate`].
pub mod rules {
    use std::sync::LazyLock;

    use regex::Regex;

    static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
    });

    pub fn required(value: Option<&str>) -> bool {
        value.is_some_and(|v| !v.trim().is_empty())
    }

    pub fn email(value: Option<&str>) -> bool {
        value.is_some_and(|v| EMAIL.is_match(v))
    }

    pub fn numeric(value: Option<&str>) -> bool {
        value.is_some_and(|v| v.trim().parse::<f64>().is_ok())
    }

    pub fn min_len(min: usize) -> impl Fn(Option<&str>) -> bool {
        move |value| value.is_some_and(|v| v.chars().count() >= min)
    }

    pub fn max_len(max: usize) -> impl Fn(Option<&str>) -> bool {
        move |value| value.map_or(true, |v| v.chars().count() <= max)
    }

    /// Value equals the given one (e.g. password confirmation).
    pub fn matches(expected: Option<&str>) -> impl Fn(Option<&str>) -> bool + '_ {
        move |value| value.is_some() && value == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_passes_when_all_rules_hold() {
        let data = inputs(&[("name", "Alice"), ("email", "alice@example.com"), ("age", "30")]);
        let validator = Validator::new(&data)
            .validate("name", rules::required, "Name is required")
            .validate("email", rules::email, "Invalid e-mail")
            .validate("age", rules::numeric, "Age must be a number");
        assert!(validator.passes());
    }

    #[test]
    fn test_collects_field_errors() {
        let data = inputs(&[("name", "Al"), ("email", "nope"), ("password", "a"), ("confirm", "b")]);
        let password = data[2].1.clone();
        let validator = Validator::new(&data)
            .validate("name", rules::min_len(3), "Name too short")
            .validate("email", rules::email, "Invalid e-mail")
            .validate("phone", rules::required, "Phone is required")
            .validate("confirm", rules::matches(Some(password.as_str())), "Passwords differ");

        assert!(!validator.passes());
        let errors = validator.errors();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors["email"].status, INVALID);
        assert_eq!(errors["phone"].message, "Phone is required");
    }

    #[test]
    fn test_max_len_allows_missing() {
        let data = inputs(&[]);
        assert!(Validator::new(&data).validate("bio", rules::max_len(10), "too long").passes());
    }
}
