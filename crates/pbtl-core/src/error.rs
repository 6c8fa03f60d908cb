//! Error types for formula parsing and trace monitoring

use thiserror::Error;

/// Main error type for PBTL operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PbtlError {
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unsupported formula: {formula} is outside the DLNF-reducible subset")]
    UnsupportedFormula { formula: String },

    #[error("Formula too large: {disjuncts} disjuncts > {max}")]
    FormulaTooLarge { disjuncts: usize, max: usize },

    #[error("Trace format error at line {line}: {message}")]
    TraceFormat { line: usize, message: String },

    #[error("Causality violation at event {eid}: {message}")]
    CausalityViolation { eid: String, message: String },

    #[error("Internal invariant violated: {message}")]
    InternalInvariant { message: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl PbtlError {
    /// Create a syntax error at a specific position
    pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a trace format error at a specific line
    pub fn trace_format(line: usize, message: impl Into<String>) -> Self {
        Self::TraceFormat {
            line,
            message: message.into(),
        }
    }

    /// Create a causality violation for a named event
    pub fn causality(eid: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CausalityViolation {
            eid: eid.into(),
            message: message.into(),
        }
    }

    /// Create an internal invariant error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalInvariant {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for PbtlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for PBTL operations
pub type PbtlResult<T> = Result<T, PbtlError>;

/// Warning that does not abort the run but should be surfaced
#[derive(Debug, Clone, PartialEq)]
pub struct TraceWarning {
    pub message: String,
    pub line: Option<usize>,
}

impl TraceWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl std::fmt::Display for TraceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {})", self.message, line),
            None => write!(f, "{}", self.message),
        }
    }
}
