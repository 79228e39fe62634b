//! # Validation Module
//!
//! Custom field validation against catalog-authored rule sets.
//!
//! ## Rule Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  value ──► required + empty? ───────────────► Required                  │
//! │              │ empty, optional → OK (nothing else runs)                 │
//! │              ▼                                                          │
//! │           min/max length ─────────────────► TooShort / TooLong          │
//! │              ▼                                                          │
//! │           whitespace disallowed? ─────────► ContainsWhitespace          │
//! │              ▼                                                          │
//! │           pattern (malformed regex passes) ► PatternMismatch            │
//! │              ▼                                                          │
//! │           allowed values ─────────────────► NotAllowed                  │
//! │              ▼                                                          │
//! │           number: parse, min, max, step ──► NotANumber / Below / ...    │
//! │              ▼                                                          │
//! │           url: absolute http(s) ──────────► InvalidUrl                  │
//! │              ▼                                                          │
//! │             OK                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first failing rule wins: exactly one error per invalid field.
//! Visibility is not this module's concern; callers skip hidden fields.

use std::collections::HashMap;

use regex::Regex;

use crate::error::FieldError;
use crate::types::{Catalog, CustomField, FieldType};
use crate::STEP_EPSILON;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, FieldError>;

/// Precompiled validation rules for one catalog snapshot.
///
/// Patterns are compiled once. A pattern that fails to compile is stored as
/// `None` and treated as always passing. Fields the validator was not built
/// with (e.g. a `Default` validator) have their pattern compiled per call.
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    patterns: HashMap<String, Option<Regex>>,
}

impl FieldValidator {
    pub fn new(catalog: &Catalog) -> Self {
        let patterns = catalog
            .custom_fields
            .iter()
            .filter(|f| f.validation.pattern.as_deref().is_some_and(|p| !p.is_empty()))
            .map(|f| (f.id.clone(), compile_pattern(f)))
            .collect();
        FieldValidator { patterns }
    }

    /// Validates one field value.
    ///
    /// ## Example
    /// ```rust
    /// use configurator_core::types::CustomField;
    /// use configurator_core::validation::FieldValidator;
    ///
    /// let field: CustomField = serde_json::from_str(
    ///     r#"{"id": "qty", "label": "Quantity", "type": "number",
    ///         "validation": {"numericStep": 5}}"#,
    /// ).unwrap();
    /// let validator = FieldValidator::default();
    ///
    /// assert!(validator.validate(&field, Some("15")).is_ok());
    /// let err = validator.validate(&field, Some("12")).unwrap_err();
    /// assert_eq!(err.to_string(), "Quantity must be in increments of 5");
    /// ```
    pub fn validate(&self, field: &CustomField, value: Option<&str>) -> ValidationResult<()> {
        let label = field.display_label();
        let rules = &field.validation;

        let value = match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => v,
            None if field.required => {
                return Err(FieldError::Required {
                    label: label.to_string(),
                })
            }
            None => return Ok(()),
        };

        let length = value.chars().count();
        if let Some(min) = rules.min_length {
            if length < min {
                return Err(FieldError::TooShort {
                    label: label.to_string(),
                    min,
                });
            }
        }
        if let Some(max) = rules.max_length {
            if length > max {
                return Err(FieldError::TooLong {
                    label: label.to_string(),
                    max,
                });
            }
        }

        if rules.disallow_whitespace && value.chars().any(char::is_whitespace) {
            return Err(FieldError::ContainsWhitespace {
                label: label.to_string(),
            });
        }

        let uncached;
        let pattern = match self.patterns.get(&field.id) {
            Some(compiled) => compiled.as_ref(),
            None => {
                uncached = compile_pattern(field);
                uncached.as_ref()
            }
        };
        if let Some(regex) = pattern {
            if !regex.is_match(value) {
                return Err(FieldError::PatternMismatch {
                    label: label.to_string(),
                    message: rules.pattern_message.clone(),
                });
            }
        }

        if !rules.allowed_values.is_empty() && !rules.allowed_values.iter().any(|a| a == value) {
            return Err(FieldError::NotAllowed {
                label: label.to_string(),
                allowed: rules.allowed_values.clone(),
            });
        }

        match field.field_type {
            FieldType::Number => validate_number(field, value),
            FieldType::Url => validate_url(label, value),
            FieldType::Text => Ok(()),
        }
    }
}

/// Compiles a field's pattern. Empty or malformed patterns give `None`.
fn compile_pattern(field: &CustomField) -> Option<Regex> {
    let source = field.validation.pattern.as_deref().filter(|p| !p.is_empty())?;
    match Regex::new(source) {
        Ok(regex) => Some(regex),
        Err(err) => {
            tracing::debug!(field = %field.id, pattern = %source, error = %err,
                "ignoring malformed field pattern");
            None
        }
    }
}

// =============================================================================
// Typed Validators
// =============================================================================

/// Numeric checks: parse, bounds, step alignment.
///
/// ## Step Alignment
/// ```text
/// step = 0.1, value = 0.3   →  0.3 % 0.1 = 0.09999999999999998
///                              ≈ step, so it passes
/// step = 5,   value = 12    →  12 % 5 = 2  → StepMismatch
/// ```
fn validate_number(field: &CustomField, value: &str) -> ValidationResult<()> {
    let label = field.display_label();
    let rules = &field.validation;

    let number: f64 = match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => {
            return Err(FieldError::NotANumber {
                label: label.to_string(),
            })
        }
    };

    if let Some(min) = rules.numeric_min {
        if number < min {
            return Err(FieldError::BelowMinimum {
                label: label.to_string(),
                min,
            });
        }
    }
    if let Some(max) = rules.numeric_max {
        if number > max {
            return Err(FieldError::AboveMaximum {
                label: label.to_string(),
                max,
            });
        }
    }

    if let Some(step) = rules.numeric_step.filter(|s| *s > 0.0) {
        if !is_step_aligned(number, step) {
            return Err(FieldError::StepMismatch {
                label: label.to_string(),
                step,
            });
        }
    }

    Ok(())
}

/// True when `value` is within [`STEP_EPSILON`] of a multiple of `step`.
pub fn is_step_aligned(value: f64, step: f64) -> bool {
    let remainder = (value % step).abs();
    remainder < STEP_EPSILON || (step - remainder).abs() < STEP_EPSILON
}

fn validate_url(label: &str, value: &str) -> ValidationResult<()> {
    match url::Url::parse(value.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(FieldError::InvalidUrl {
            label: label.to_string(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn field(json: &str) -> CustomField {
        serde_json::from_str(json).unwrap()
    }

    fn validator_for(field: &CustomField) -> FieldValidator {
        let catalog = Catalog {
            base_price: Default::default(),
            currency: "EUR".to_string(),
            option_groups: vec![],
            add_ons: vec![],
            custom_fields: vec![field.clone()],
            subscription_plans: vec![],
            configuration_presets: vec![],
        };
        FieldValidator::new(&catalog)
    }

    #[test]
    fn test_required_and_optional_empty() {
        let required = field(r#"{"id": "h", "label": "Handle", "required": true}"#);
        let v = validator_for(&required);
        assert_eq!(
            v.validate(&required, Some("  ")).unwrap_err().to_string(),
            "Handle is required"
        );
        assert!(v.validate(&required, None).is_err());

        let optional = field(r#"{"id": "h", "label": "Handle", "validation": {"minLength": 3}}"#);
        assert!(validator_for(&optional).validate(&optional, Some("")).is_ok());
    }

    #[test]
    fn test_length_bounds() {
        let f = field(r#"{"id": "h", "label": "Handle", "validation": {"minLength": 3, "maxLength": 5}}"#);
        let v = validator_for(&f);
        assert!(matches!(v.validate(&f, Some("ab")), Err(FieldError::TooShort { min: 3, .. })));
        assert!(matches!(v.validate(&f, Some("abcdef")), Err(FieldError::TooLong { max: 5, .. })));
        // counted in characters, not bytes
        assert!(v.validate(&f, Some("ééé")).is_ok());
    }

    #[test]
    fn test_whitespace_disallowed() {
        let f = field(r#"{"id": "h", "label": "Handle", "validation": {"disallowWhitespace": true}}"#);
        let v = validator_for(&f);
        assert!(matches!(
            v.validate(&f, Some("my handle")),
            Err(FieldError::ContainsWhitespace { .. })
        ));
    }

    #[test]
    fn test_pattern_and_malformed_pattern() {
        let f = field(
            r#"{"id": "h", "label": "Handle",
                "validation": {"pattern": "^@\\w+$", "patternMessage": "Start with @"}}"#,
        );
        let v = validator_for(&f);
        assert!(v.validate(&f, Some("@shop")).is_ok());
        assert_eq!(v.validate(&f, Some("shop")).unwrap_err().to_string(), "Start with @");

        let broken = field(r#"{"id": "h", "label": "Handle", "validation": {"pattern": "(["}}"#);
        assert!(validator_for(&broken).validate(&broken, Some("anything")).is_ok());
    }

    #[test]
    fn test_default_validator_still_checks_patterns() {
        let f = field(r#"{"id": "h", "label": "Handle", "validation": {"pattern": "^@"}}"#);
        let v = FieldValidator::default();
        assert!(v.validate(&f, Some("@shop")).is_ok());
        assert!(matches!(
            v.validate(&f, Some("shop")),
            Err(FieldError::PatternMismatch { .. })
        ));

        let broken = field(r#"{"id": "h", "label": "Handle", "validation": {"pattern": "(["}}"#);
        assert!(v.validate(&broken, Some("anything")).is_ok());
    }

    #[test]
    fn test_allowed_values_exact_match() {
        let f = field(r#"{"id": "s", "label": "Size", "validation": {"allowedValues": ["S", "M"]}}"#);
        let v = validator_for(&f);
        assert!(v.validate(&f, Some("M")).is_ok());
        assert!(matches!(v.validate(&f, Some("m")), Err(FieldError::NotAllowed { .. })));
    }

    #[test]
    fn test_number_rules() {
        let f = field(
            r#"{"id": "q", "label": "Quantity", "type": "number",
                "validation": {"numericMin": 10, "numericMax": 100, "numericStep": 5}}"#,
        );
        let v = validator_for(&f);
        assert!(matches!(v.validate(&f, Some("ten")), Err(FieldError::NotANumber { .. })));
        assert!(matches!(v.validate(&f, Some("5")), Err(FieldError::BelowMinimum { .. })));
        assert!(matches!(v.validate(&f, Some("105")), Err(FieldError::AboveMaximum { .. })));
        assert_eq!(
            v.validate(&f, Some("12")).unwrap_err().to_string(),
            "Quantity must be in increments of 5"
        );
        assert!(v.validate(&f, Some("15")).is_ok());
    }

    #[test]
    fn test_step_alignment_tolerates_float_error() {
        assert!(is_step_aligned(0.3, 0.1));
        assert!(is_step_aligned(1.2, 0.4));
        assert!(!is_step_aligned(0.35, 0.1));
        assert!(is_step_aligned(-10.0, 5.0));
    }

    #[test]
    fn test_url_fields() {
        let f = field(r#"{"id": "site", "label": "Website", "type": "url"}"#);
        let v = validator_for(&f);
        assert!(v.validate(&f, Some("https://example.com/shop")).is_ok());
        assert!(matches!(v.validate(&f, Some("example.com")), Err(FieldError::InvalidUrl { .. })));
        assert!(matches!(v.validate(&f, Some("ftp://example.com")), Err(FieldError::InvalidUrl { .. })));
    }
}
