use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing a subject category.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubjectError {
    #[error("unknown subject: {0}")]
    Unknown(String),
}

/// Enumerated study category a log or review item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    Math,
    Science,
    English,
    History,
    Language,
    Other,
}

impl Subject {
    /// All subjects in display order, for per-subject reporting.
    pub const ALL: [Subject; 6] = [
        Subject::Math,
        Subject::Science,
        Subject::English,
        Subject::History,
        Subject::Language,
        Subject::Other,
    ];

    /// Stable lowercase name used for persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Science => "science",
            Subject::English => "english",
            Subject::History => "history",
            Subject::Language => "language",
            Subject::Other => "other",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Subject {
    type Err = SubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "math" => Ok(Subject::Math),
            "science" => Ok(Subject::Science),
            "english" => Ok(Subject::English),
            "history" => Ok(Subject::History),
            "language" => Ok(Subject::Language),
            "other" => Ok(Subject::Other),
            _ => Err(SubjectError::Unknown(s.to_string())),
        }
    }
}
