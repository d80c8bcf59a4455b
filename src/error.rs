// src/error.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use treelens_lens::LensError;
use treelens_pathx::PathError;
use treelens_traits::FileError;
use treelens_tree::TreeError;

/// Stable numeric error codes, shared with binding layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
#[repr(i32)]
pub enum ErrorCode {
    #[default]
    NoError = 0,
    NoMem = 1,
    Internal = 2,
    PathX = 3,
    NoMatch = 4,
    MultipleMatches = 5,
    Syntax = 6,
    NoLens = 7,
    MultipleTransforms = 8,
    NoSpan = 9,
    MoveDescendant = 10,
    CmdRun = 11,
    BadArg = 12,
    Label = 13,
    FileAccess = 15,
    LensFailure = 16,
}

impl ErrorCode {
    const ALL: [ErrorCode; 16] = [
        ErrorCode::NoError,
        ErrorCode::NoMem,
        ErrorCode::Internal,
        ErrorCode::PathX,
        ErrorCode::NoMatch,
        ErrorCode::MultipleMatches,
        ErrorCode::Syntax,
        ErrorCode::NoLens,
        ErrorCode::MultipleTransforms,
        ErrorCode::NoSpan,
        ErrorCode::MoveDescendant,
        ErrorCode::CmdRun,
        ErrorCode::BadArg,
        ErrorCode::Label,
        ErrorCode::FileAccess,
        ErrorCode::LensFailure,
    ];

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// The fixed human-readable text for the code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::NoError => "No error",
            ErrorCode::NoMem => "Cannot allocate memory",
            ErrorCode::Internal => "Internal error (please file a bug)",
            ErrorCode::PathX => "Invalid path expression",
            ErrorCode::NoMatch => "No match for path expression",
            ErrorCode::MultipleMatches => "Too many matches for path expression",
            ErrorCode::Syntax => "Syntax error in lens definition",
            ErrorCode::NoLens => "Lens not found",
            ErrorCode::MultipleTransforms => "Multiple transforms",
            ErrorCode::NoSpan => "Node has no span info",
            ErrorCode::MoveDescendant => "Cannot move node into its descendant",
            ErrorCode::CmdRun => "Failed to execute command",
            ErrorCode::BadArg => "Invalid argument in function call",
            ErrorCode::Label => "Invalid label",
            ErrorCode::FileAccess => "Failed to read or write a file",
            ErrorCode::LensFailure => "Lens failed to process text",
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> i32 {
        code.as_i32()
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_i32() == value)
            .ok_or_else(|| format!("unknown error code {}", value))
    }
}

/// Every failure an engine operation can report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Failed to initialize: {0}")]
    Init(String),

    #[error("Invalid path expression: {0}")]
    PathExpression(#[from] PathError),

    #[error("Path expression '{expr}' matches {count} nodes")]
    MultipleMatches { expr: String, count: usize },

    #[error("No match for path expression '{0}'")]
    NoMatch(String),

    #[error("Cannot move '{src}' to '{dst}': one lies inside the other")]
    MoveIntoDescendant { src: String, dst: String },

    #[error("Invalid label '{0}'")]
    InvalidLabel(String),

    #[error("Invalid argument: {0}")]
    BadArgument(String),

    #[error("Lens '{0}' does not exist")]
    NoLens(String),

    #[error("Lens failure: {0}")]
    Lens(LensError),

    #[error("File '{0}' is selected by more than one transform")]
    MultipleTransforms(String),

    #[error("No span information for '{0}'")]
    NoSpan(String),

    #[error("Failed to save {} file(s): {}", .files.len(), .files.join(", "))]
    Save { files: Vec<String> },

    #[error("Failed to load {} file(s): {}", .files.len(), .files.join(", "))]
    Load { files: Vec<String> },

    #[error("File access failed: {0}")]
    FileAccess(#[from] FileError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Init(_) | EngineError::Internal(_) => ErrorCode::Internal,
            EngineError::PathExpression(_) => ErrorCode::PathX,
            EngineError::MultipleMatches { .. } => ErrorCode::MultipleMatches,
            EngineError::NoMatch(_) => ErrorCode::NoMatch,
            EngineError::MoveIntoDescendant { .. } => ErrorCode::MoveDescendant,
            EngineError::InvalidLabel(_) => ErrorCode::Label,
            EngineError::BadArgument(_) => ErrorCode::BadArg,
            EngineError::NoLens(_) => ErrorCode::NoLens,
            EngineError::Lens(_) => ErrorCode::LensFailure,
            EngineError::MultipleTransforms(_) => ErrorCode::MultipleTransforms,
            EngineError::NoSpan(_) => ErrorCode::NoSpan,
            EngineError::Save { .. } | EngineError::Load { .. } | EngineError::FileAccess(_) => {
                ErrorCode::FileAccess
            }
        }
    }

    /// A short description of what went wrong, beyond the code's message.
    pub fn minor(&self) -> Option<String> {
        match self {
            EngineError::PathExpression(e) => Some(e.minor()),
            EngineError::MultipleMatches { count, .. } => Some(format!("{} nodes match", count)),
            EngineError::Init(m) | EngineError::BadArgument(m) | EngineError::Internal(m) => {
                Some(m.clone())
            }
            EngineError::Lens(e) => Some(e.to_string()),
            EngineError::FileAccess(e) => Some(e.to_string()),
            EngineError::Save { files } | EngineError::Load { files } => {
                Some(format!("{} file(s) failed", files.len()))
            }
            EngineError::MoveIntoDescendant { .. } => {
                Some("destination lies inside the source or above it".to_string())
            }
            EngineError::NoMatch(_)
            | EngineError::InvalidLabel(_)
            | EngineError::NoLens(_)
            | EngineError::MultipleTransforms(_)
            | EngineError::NoSpan(_) => None,
        }
    }

    /// The offending input: the expression, label, lens or file names.
    pub fn details(&self) -> Option<String> {
        match self {
            EngineError::PathExpression(e) => e.details(),
            EngineError::MultipleMatches { expr, .. } => Some(expr.clone()),
            EngineError::NoMatch(s)
            | EngineError::InvalidLabel(s)
            | EngineError::NoLens(s)
            | EngineError::MultipleTransforms(s)
            | EngineError::NoSpan(s) => Some(s.clone()),
            EngineError::MoveIntoDescendant { src, dst } => Some(format!("{} -> {}", src, dst)),
            EngineError::Save { files } | EngineError::Load { files } => Some(files.join(", ")),
            EngineError::Init(_)
            | EngineError::BadArgument(_)
            | EngineError::Lens(_)
            | EngineError::FileAccess(_)
            | EngineError::Internal(_) => None,
        }
    }

    pub(crate) fn multiple(expr: &str, count: usize) -> Self {
        EngineError::MultipleMatches {
            expr: expr.to_string(),
            count,
        }
    }
}

impl From<LensError> for EngineError {
    fn from(e: LensError) -> Self {
        match e {
            LensError::Unknown(name) => EngineError::NoLens(name),
            other => EngineError::Lens(other),
        }
    }
}

impl From<TreeError> for EngineError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::InvalidLabel(label) => EngineError::InvalidLabel(label),
            TreeError::RootSibling | TreeError::RootOperation(_) => {
                EngineError::BadArgument(e.to_string())
            }
            TreeError::Cycle => EngineError::MoveIntoDescendant {
                src: String::new(),
                dst: String::new(),
            },
            TreeError::StaleNode(_) => EngineError::Internal(e.to_string()),
        }
    }
}
