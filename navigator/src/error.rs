use cardmark::SourceLocation;
use thiserror::Error;

/// Conditions the core reports but never fails on. Each one still reaches
/// the user: a lookup miss as the "no section" placeholder, a parse fragment
/// as inline diagnostic text, a missing argument as the `noArg` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationIssue {
    #[error("no section labelled '{label}'")]
    LookupMiss { label: String },

    #[error("parse error at line {line}, column {column}: {message}")]
    ParseFragment {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("command '{command}' has no argument {index}")]
    MissingArgument { command: String, index: usize },
}

impl NavigationIssue {
    pub fn fragment(location: &SourceLocation, message: &str) -> Self {
        NavigationIssue::ParseFragment {
            line: location.line,
            column: location.column,
            message: message.to_string(),
        }
    }
}
