//! Error types for the scripting crate

use crate::dsl::lexer::Token;
use blockcode_core::BlockError;
use serde::Serialize;
use std::fmt;

/// Machine-readable error code carried by every script error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    Unknown,
    NoStringEnding,
    ReadPastEnd,
    WrongToken,
    InvalidArgument,
    InvalidExpression,
    InvalidFunctionParams,
    InvalidToken,
    UnknownFunctionName,
    UnknownEventName,
    NotImplemented,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NoStringEnding => "no-string-ending",
            Self::ReadPastEnd => "read-past-end",
            Self::WrongToken => "wrong-token",
            Self::InvalidArgument => "invalid-argument",
            Self::InvalidExpression => "invalid-expression",
            Self::InvalidFunctionParams => "invalid-function-params",
            Self::InvalidToken => "invalid-token",
            Self::UnknownFunctionName => "unknown-function-name",
            Self::UnknownEventName => "unknown-event-name",
            Self::NotImplemented => "not-implemented",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Script-specific error types
///
/// One variant per pipeline stage: lexing, parsing, and the semantic
/// stages (validation and code generation).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScriptError {
    /// Lexical error
    #[error("Lexical error [{code}] at line {line}: {message}")]
    Lex {
        code: ErrorCode,
        position: usize,
        line: usize,
        message: String,
    },

    /// Parse error
    #[error("Parse error [{code}]{}: {message}", location(.token))]
    Parse {
        code: ErrorCode,
        token: Option<Token>,
        message: String,
    },

    /// Validation or code generation error
    #[error("Semantic error [{code}]{}: {message}", location(.token))]
    Semantic {
        code: ErrorCode,
        token: Option<Token>,
        message: String,
    },
}

fn location(token: &Option<Token>) -> String {
    match token {
        Some(token) if !token.is_synthetic() => {
            format!(" at line {} near '{}'", token.line, token.value)
        }
        _ => String::new(),
    }
}

impl ScriptError {
    pub fn parse(code: ErrorCode, token: Option<&Token>, message: impl Into<String>) -> Self {
        ScriptError::Parse {
            code,
            token: token.cloned(),
            message: message.into(),
        }
    }

    pub fn semantic(code: ErrorCode, token: Option<&Token>, message: impl Into<String>) -> Self {
        ScriptError::Semantic {
            code,
            token: token.cloned(),
            message: message.into(),
        }
    }

    /// Error code of this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ScriptError::Lex { code, .. }
            | ScriptError::Parse { code, .. }
            | ScriptError::Semantic { code, .. } => *code,
        }
    }

    /// Offending token, when one is known
    pub fn token(&self) -> Option<&Token> {
        match self {
            ScriptError::Lex { .. } => None,
            ScriptError::Parse { token, .. } | ScriptError::Semantic { token, .. } => {
                token.as_ref()
            }
        }
    }
}

impl From<ScriptError> for BlockError {
    fn from(err: ScriptError) -> Self {
        BlockError::Script(err.to_string())
    }
}

/// Result type for scripting operations
pub type Result<T> = std::result::Result<T, ScriptError>;
