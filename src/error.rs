use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("column '{column}' not in columns: {}", .available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    #[error("column '{column}' contains a malformed value '{value}' on line {line}")]
    MalformedValue {
        column: String,
        line: u64,
        value: String,
    },

    #[error("cannot write output to {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised when a file in a multi-file input has a different header than the first one.
    #[error("header of {} does not match the first input file", .0.display())]
    SchemaMismatch(PathBuf),

    #[error("{0}")]
    NoMatches(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    /// Process exit code for this failure. Clap exits with 2 on usage errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::FileNotFound(_) => 3,
            ToolError::ColumnNotFound { .. } => 4,
            ToolError::MalformedValue { .. } => 5,
            ToolError::OutputWrite { .. } => 6,
            _ => 1,
        }
    }
}
