use std::fmt;

use tandem_scene::ParseError;

/// One load or instantiation problem: where it happened and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// `source:line:col`, or just the source name when no position applies.
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self { location: location.into(), message: message.into() }
    }

    pub fn at(source: &str, line: usize, col: usize, message: impl Into<String>) -> Self {
        Self::new(format!("{source}:{line}:{col}"), message)
    }

    pub(crate) fn from_parse(source: &str, err: &ParseError) -> Self {
        Self::at(source, err.line, err.col, err.message.clone())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl std::error::Error for Diagnostic {}
