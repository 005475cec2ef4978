//! Structured errors
//!
//! Errors never crash the engine. They are values that travel inside
//! outcomes and tell the caller what went wrong and what to try next.

use serde::{Deserialize, Serialize};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const UNDEFINED_FUNC: &str = "UNDEFINED_FUNC";
    pub const ARG_COUNT: &str = "ARG_COUNT";
    pub const DOMAIN_ERROR: &str = "DOMAIN_ERROR";
    pub const REMOTE_TIMEOUT: &str = "REMOTE_TIMEOUT";
    pub const REMOTE_FAILURE: &str = "REMOTE_FAILURE";
    pub const NUMERIC_INSTABILITY: &str = "NUMERIC_INSTABILITY";
    pub const INDETERMINATE: &str = "INDETERMINATE";
    pub const EXHAUSTED: &str = "EXHAUSTED";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A stage failed but a later stage may still answer
    Warning,
    /// The computation failed
    Error,
    /// The engine cannot continue
    Fatal,
}

/// Context about where an error occurred
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Expression being processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Capability that produced the error (limit, derivative, integral)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,

    /// Propagation notes
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Structured error value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TangentError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Where the error occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Severity level
    pub severity: Severity,
}

impl TangentError {
    /// Create a new error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            context: None,
            severity: Severity::Error,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set expression context
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.expression = Some(expression.into());
        self
    }

    /// Builder: set capability context
    pub fn in_capability(mut self, capability: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.capability = Some(capability.into());
        self
    }

    /// Builder: add propagation note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.notes.push(note.into());
        self
    }

    /// Builder: set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    // ========== Common Error Constructors ==========

    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", details.into()))
            .with_suggestion("Check expression syntax")
    }

    pub fn undefined_func(name: &str) -> Self {
        Self::new(codes::UNDEFINED_FUNC, format!("Unknown function: {}", name))
            .with_suggestion("Supported: sin, cos, tan, log, ln, sqrt, abs, exp, ...")
    }

    pub fn arg_count(func: &str, expected: usize, got: usize) -> Self {
        Self::new(
            codes::ARG_COUNT,
            format!("{}() expects {} arguments, got {}", func, expected, got),
        )
    }

    pub fn domain_error(details: impl Into<String>) -> Self {
        Self::new(codes::DOMAIN_ERROR, format!("Domain error: {}", details.into()))
    }

    pub fn remote_timeout(capability: &str, millis: u64) -> Self {
        Self::new(
            codes::REMOTE_TIMEOUT,
            format!("Symbolic engine did not answer the {} request within {} ms", capability, millis),
        )
        .with_severity(Severity::Warning)
    }

    pub fn remote_failure(details: impl Into<String>) -> Self {
        Self::new(codes::REMOTE_FAILURE, format!("Symbolic engine failure: {}", details.into()))
            .with_severity(Severity::Warning)
    }

    pub fn numeric_instability(spread: f64) -> Self {
        Self::new(
            codes::NUMERIC_INSTABILITY,
            format!("Difference quotients did not converge (spread {:e})", spread),
        )
    }

    pub fn indeterminate(details: impl Into<String>) -> Self {
        Self::new(codes::INDETERMINATE, format!("Indeterminate: {}", details.into()))
    }

    pub fn exhausted(details: impl Into<String>) -> Self {
        Self::new(codes::EXHAUSTED, format!("Could not compute: {}", details.into()))
            .with_suggestion("Check the expression or configure a symbolic engine")
    }

    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::new(codes::INVALID_INPUT, format!("Invalid input: {}", details.into()))
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, format!("Internal error: {}", details.into()))
            .with_suggestion("This is a bug, please report it")
            .with_severity(Severity::Fatal)
    }
}

impl std::fmt::Display for TangentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for TangentError {}
