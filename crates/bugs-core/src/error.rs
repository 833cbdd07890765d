use crate::config::ConfigError;
use thiserror::Error;

/// Errors raised while loading or running a Bugs program.
///
/// `Syntax` comes from the lexer/parser and aborts the whole load. The
/// remaining variants are semantic: `DuplicateAgentName` aborts world
/// initialization, everything else kills only the bug that raised it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BugsError {
    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("Variable '{0}' has not been declared")]
    UndeclaredVariable(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Function '{function}' expects {expected} argument(s), got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },
    #[error("Unknown bug: {0}")]
    UnknownAgent(String),
    #[error("Unknown color: {0}")]
    UnknownColor(String),
    #[error("Bugs must have distinct names; '{0}' is defined more than once")]
    DuplicateAgentName(String),
    #[error("'exit if' used outside of any loop")]
    NoEnclosingLoop,
    #[error("Call depth limit of {limit} exceeded in '{function}'")]
    RecursionLimit { function: String, limit: usize },
    #[error("Invalid world state: {0}")]
    InvalidState(String),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl BugsError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        BugsError::Syntax {
            line,
            message: message.into(),
        }
    }

    /// True for errors produced by the lexer or parser.
    pub fn is_syntax(&self) -> bool {
        matches!(self, BugsError::Syntax { .. })
    }

    /// True for errors that prevent a world from being started at all.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            BugsError::Syntax { .. } | BugsError::DuplicateAgentName(_) | BugsError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BugsError>;
