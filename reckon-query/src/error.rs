//! Error types for filter chains and predicate compilation.
//!
//! Every failure carries:
//! - An error code for programmatic handling
//! - A human message
//! - Context about the filter, operator and values involved
//! - Suggestions for fixing the problem
//!
//! # Error Codes
//!
//! Error codes follow a pattern: R{category}{number}
//! - 1xxx: Filter type errors (unknown type, abstract type)
//! - 2xxx: Operator errors (unknown, unsupported, arity, value shape)
//! - 3xxx: Compilation errors (invalid filter state)
//! - 4xxx: Setup errors (configuration, catalog declarations)
//!
//! ```rust
//! use reckon_query::{ErrorCode, ReportError};
//!
//! let err = ReportError::unknown_filter_type("no_such_filter");
//! assert_eq!(err.code, ErrorCode::UnknownFilterType);
//! assert_eq!(err.code.code(), "R1001");
//! assert!(err.is_setup_error());
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Filter type errors (1xxx)
    /// No filter type registered under the name (R1001).
    UnknownFilterType = 1001,
    /// Attempt to instantiate an abstract filter type (R1002).
    AbstractConstruction = 1002,

    // Operator errors (2xxx)
    /// No operator registered under the token (R2001).
    UnknownOperator = 2001,
    /// Operator is not in the filter's resolved operator set (R2002).
    OperatorNotSupported = 2002,
    /// Value count does not satisfy the operator's arity (R2003).
    ArityMismatch = 2003,
    /// A value has the wrong shape for the operator (R2004).
    InvalidValue = 2004,

    // Compilation errors (3xxx)
    /// Compile attempted on a chain with an invalid filter (R3001).
    InvalidFilterState = 3001,

    // Setup errors (4xxx)
    /// Invalid engine configuration (R4001).
    InvalidConfiguration = 4001,
    /// Filter type declared twice (R4002).
    DuplicateFilterType = 4002,
    /// Filter type declared with an undeclared parent (R4003).
    UnknownParentType = 4003,
    /// Attribute set or read without a declaration (R4004).
    UnknownAttribute = 4004,
}

impl ErrorCode {
    /// Get the error code string (e.g., "R1001").
    pub fn code(&self) -> String {
        format!("R{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnknownFilterType => "Unknown filter type",
            Self::AbstractConstruction => "Abstract filter type cannot be instantiated",
            Self::UnknownOperator => "Unknown operator",
            Self::OperatorNotSupported => "Operator not supported by filter",
            Self::ArityMismatch => "Wrong number of values for operator",
            Self::InvalidValue => "Invalid value for operator",
            Self::InvalidFilterState => "Filter is not in a valid state",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::DuplicateFilterType => "Duplicate filter type",
            Self::UnknownParentType => "Unknown parent filter type",
            Self::UnknownAttribute => "Undeclared attribute",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The filter type involved.
    pub filter: Option<String>,
    /// The operator token involved.
    pub operator: Option<String>,
    /// Number of values supplied.
    pub value_count: Option<usize>,
    /// The SQL compiled so far (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors raised while declaring, building or compiling filter chains.
#[derive(Error, Debug)]
pub struct ReportError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl ReportError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Set the filter type.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.context.filter = Some(filter.into());
        self
    }

    /// Set the operator token.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.context.operator = Some(operator.into());
        self
    }

    /// Set the number of supplied values.
    pub fn with_value_count(mut self, count: usize) -> Self {
        self.context.value_count = Some(count);
        self
    }

    /// Set the SQL compiled so far.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create an unknown filter type error.
    pub fn unknown_filter_type(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::UnknownFilterType,
            format!("No filter type registered as `{}`", name),
        )
        .with_filter(&name)
        .with_suggestion("Register the filter type in the catalog before building chains")
    }

    /// Create an abstract construction error.
    pub fn abstract_construction(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::AbstractConstruction,
            format!("`{}` is an abstract filter type", name),
        )
        .with_filter(&name)
        .with_help("Only concrete filter types bound to a column can be placed in a chain")
    }

    /// Create an unknown operator error.
    pub fn unknown_operator(token: impl Into<String>) -> Self {
        let token = token.into();
        Self::new(
            ErrorCode::UnknownOperator,
            format!("No operator registered as `{}`", token),
        )
        .with_operator(&token)
        .with_suggestion("Register custom operators before declaring filter types that use them")
    }

    /// Create an operator-not-supported error.
    pub fn operator_not_supported(filter: impl Into<String>, token: impl Into<String>) -> Self {
        let filter = filter.into();
        let token = token.into();
        Self::new(
            ErrorCode::OperatorNotSupported,
            format!("Operator `{}` is not supported by filter `{}`", token, filter),
        )
        .with_filter(&filter)
        .with_operator(&token)
        .with_suggestion(format!(
            "Pick one of the operators listed by `{}`'s available_operators",
            filter
        ))
    }

    /// Create an arity mismatch error.
    pub fn arity_mismatch(token: impl Into<String>, expected: impl fmt::Display, got: usize) -> Self {
        let token = token.into();
        Self::new(
            ErrorCode::ArityMismatch,
            format!("Operator `{}` expects {} value(s), got {}", token, expected, got),
        )
        .with_operator(&token)
        .with_value_count(got)
    }

    /// Create an invalid value error.
    pub fn invalid_value(token: impl Into<String>, message: impl Into<String>) -> Self {
        let token = token.into();
        let message = message.into();
        Self::new(
            ErrorCode::InvalidValue,
            format!("Invalid value for operator `{}`: {}", token, message),
        )
        .with_operator(&token)
    }

    /// Create an invalid filter state error.
    pub fn invalid_filter_state(filter: impl Into<String>, messages: &[String]) -> Self {
        let filter = filter.into();
        let mut err = Self::new(
            ErrorCode::InvalidFilterState,
            format!("Filter `{}` is invalid: {}", filter, messages.join("; ")),
        )
        .with_filter(&filter);
        err.context.suggestions.extend(messages.iter().cloned());
        err
    }

    /// Create an invalid configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::InvalidConfiguration,
            format!("Invalid configuration: {}", message),
        )
    }

    /// Create a duplicate filter type error.
    pub fn duplicate_filter_type(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::DuplicateFilterType,
            format!("Filter type `{}` is declared twice", name),
        )
        .with_filter(&name)
    }

    /// Create an unknown parent type error.
    pub fn unknown_parent_type(name: impl Into<String>, parent: impl Into<String>) -> Self {
        let name = name.into();
        let parent = parent.into();
        Self::new(
            ErrorCode::UnknownParentType,
            format!("Filter type `{}` inherits from undeclared `{}`", name, parent),
        )
        .with_filter(&name)
        .with_suggestion("Declare parent types before their children")
    }

    /// Create an unknown attribute error.
    pub fn unknown_attribute(type_name: impl Into<String>, attribute: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let attribute = attribute.into();
        Self::new(
            ErrorCode::UnknownAttribute,
            format!(
                "Attribute `{}` is not declared on `{}` or any ancestor",
                attribute, type_name
            ),
        )
        .with_filter(&type_name)
    }

    // ============== Error Checks ==============

    /// Check if this error is a configuration bug that should never reach users.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UnknownFilterType
                | ErrorCode::AbstractConstruction
                | ErrorCode::UnknownOperator
                | ErrorCode::InvalidConfiguration
                | ErrorCode::DuplicateFilterType
                | ErrorCode::UnknownParentType
                | ErrorCode::UnknownAttribute
        )
    }

    /// Check if this error can be shown to a user as a validation message.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidFilterState
                | ErrorCode::ArityMismatch
                | ErrorCode::InvalidValue
                | ErrorCode::OperatorNotSupported
        )
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref filter) = self.context.filter {
            output.push_str(&format!("  → Filter: {}\n", filter));
        }
        if let Some(ref operator) = self.context.operator {
            output.push_str(&format!("  → Operator: {}\n", operator));
        }
        if let Some(count) = self.context.value_count {
            output.push_str(&format!("  → Values: {}\n", count));
        }
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.chars().count() > 200 {
                format!("{}...", sql.chars().take(200).collect::<String>())
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! report_error {
    ($code:expr, $msg:expr) => {
        $crate::error::ReportError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::ReportError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::UnknownFilterType.code(), "R1001");
        assert_eq!(ErrorCode::OperatorNotSupported.code(), "R2002");
        assert_eq!(ErrorCode::InvalidFilterState.code(), "R3001");
    }

    #[test]
    fn test_operator_not_supported() {
        let err = ReportError::operator_not_supported("assigned_to_id", "t+");
        assert_eq!(err.context.filter.as_deref(), Some("assigned_to_id"));
        assert_eq!(err.context.operator.as_deref(), Some("t+"));
        assert!(err.is_validation_error());
        assert!(!err.is_setup_error());
    }

    #[test]
    fn test_setup_errors() {
        assert!(ReportError::unknown_filter_type("x").is_setup_error());
        assert!(ReportError::abstract_construction("base").is_setup_error());
        assert!(ReportError::unknown_operator("??").is_setup_error());
    }

    #[test]
    fn test_invalid_filter_state_keeps_messages() {
        let messages = vec!["needs 1 value".to_string()];
        let err = ReportError::invalid_filter_state("created_on", &messages);
        assert!(err.message.contains("needs 1 value"));
        assert_eq!(err.context.suggestions, messages);
    }

    #[test]
    fn test_display_full() {
        let err = ReportError::arity_mismatch("<>d", 2, 1).with_filter("created_on");
        let output = err.display_full();
        assert!(output.contains("R2003"));
        assert!(output.contains("created_on"));
        assert!(output.contains("<>d"));
        assert!(output.contains("Values: 1"));
    }

    #[test]
    fn test_error_macro() {
        let err = report_error!(
            ErrorCode::InvalidConfiguration,
            "bad offset",
            with_help = "use +HH:MM"
        );
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
        assert_eq!(err.context.help.as_deref(), Some("use +HH:MM"));
    }
}
