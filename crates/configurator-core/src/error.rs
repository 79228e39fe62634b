//! # Error Types
//!
//! Domain-specific error types for configurator-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  configurator-core errors (this file)                                  │
//! │  ├── CoreError        - Catalog integrity failures (host-facing)       │
//! │  ├── FieldError       - One message per invalid custom field           │
//! │  └── ExpressionError  - Calculator expression parse/eval failures      │
//! │                                                                         │
//! │  configurator-cli errors (separate crate)                              │
//! │  └── CliError         - Config / file / JSON failures                  │
//! │                                                                         │
//! │  NOTE: no user action ever returns CoreError. Invalid selections are   │
//! │  data (FieldError per field, idle margins, advisories).                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, labels, limits)
//! 3. Errors are enum variants, never String
//! 4. `FieldError` Display text IS the user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Catalog integrity errors.
///
/// Reported by [`crate::types::Catalog::validate`] so a host can reject a
/// broken catalog at load time. The engine itself tolerates all of these.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Two entities of the same kind share an id.
    ///
    /// ## When This Occurs
    /// - Admin duplicated an option without regenerating its id
    /// - Two presets were imported with the same slug
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// Currency code is not a three-letter ISO 4217 code.
    #[error("Invalid currency code: '{0}'")]
    InvalidCurrency(String),

    /// Catalog JSON could not be decoded.
    #[error("Malformed catalog: {0}")]
    MalformedCatalog(#[from] serde_json::Error),

    /// Expression error (wraps ExpressionError).
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),
}

// =============================================================================
// Field Error
// =============================================================================

/// Custom field validation failures.
///
/// Exactly one `FieldError` is produced per invalid visible field. The
/// first failing rule wins; the order is fixed by
/// [`crate::validation::FieldValidator::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// A required field is missing or empty.
    #[error("{label} is required")]
    Required { label: String },

    /// Field value is too short.
    #[error("{label} must be at least {min} characters")]
    TooShort { label: String, min: usize },

    /// Field value is too long.
    #[error("{label} must be at most {max} characters")]
    TooLong { label: String, max: usize },

    /// Field disallows whitespace but the value contains some.
    #[error("{label} must not contain spaces")]
    ContainsWhitespace { label: String },

    /// Value does not match the authored pattern.
    #[error("{}", pattern_message(.label, .message))]
    PatternMismatch {
        label: String,
        message: Option<String>,
    },

    /// Value is not in the allowed set.
    #[error("{label} must be one of: {}", join_allowed(.allowed))]
    NotAllowed { label: String, allowed: Vec<String> },

    /// Numeric field holds something that is not a number.
    #[error("{label} must be a number")]
    NotANumber { label: String },

    /// Numeric value below the declared minimum.
    #[error("{label} must be at least {min}")]
    BelowMinimum { label: String, min: f64 },

    /// Numeric value above the declared maximum.
    #[error("{label} must be at most {max}")]
    AboveMaximum { label: String, max: f64 },

    /// Numeric value is not aligned to the declared step.
    #[error("{label} must be in increments of {step}")]
    StepMismatch { label: String, step: f64 },

    /// URL field does not hold an absolute http(s) URL.
    #[error("{label} must be a valid URL")]
    InvalidUrl { label: String },
}

fn pattern_message(label: &str, message: &Option<String>) -> String {
    match message {
        Some(text) => text.clone(),
        None => format!("{label} has an invalid format"),
    }
}

fn join_allowed(allowed: &[String]) -> String {
    allowed.join(", ")
}

// =============================================================================
// Expression Error
// =============================================================================

/// Calculator expression failures.
///
/// Catalog-authored expressions are untrusted text; every failure mode is a
/// typed variant so the preview can simply be omitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// Expression is empty or only whitespace.
    #[error("Expression is empty")]
    Empty,

    /// Expression exceeds the maximum accepted length.
    #[error("Expression is longer than {max} characters")]
    TooLong { max: usize },

    /// Parentheses nest deeper than allowed.
    #[error("Expression nests deeper than {max} levels")]
    TooDeep { max: usize },

    /// Identifier outside the whitelist.
    #[error("Unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// Character that is not part of the grammar.
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    /// Token in a position the grammar does not allow.
    #[error("Unexpected {found} at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    /// Input ended in the middle of an expression.
    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    /// Numeric literal could not be parsed.
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    /// Division by zero during evaluation.
    #[error("Division by zero")]
    DivisionByZero,

    /// Intermediate result left the representable decimal range.
    #[error("Arithmetic overflow")]
    Overflow,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
