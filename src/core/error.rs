use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop the gate, the helper or the hook installer.
///
/// The binary turns every variant into a failing exit status. `Cancelled`
/// and `NoDecision` are not defects, they only make git abandon the commit.
#[derive(Debug, Error)]
pub enum GateError {
    /// The style configuration was rejected by the formatter. The message is
    /// the formatter's own output, kept verbatim.
    #[error("{0}")]
    FormatConfig(String),

    #[error("formatting {path} failed ({status}): {stderr}")]
    FormatterFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("failed to run {program}: {source}")]
    FormatterSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("The hook is already installed at {}.", .0.display())]
    AlreadyInstalled(PathBuf),

    #[error(
        "There's already an existing pre-commit hook at {}, but for something else.",
        .0.display()
    )]
    ForeignHook(PathBuf),

    #[error("No pre-commit hook installed at {}.", .0.display())]
    NotInstalled(PathBuf),

    #[error("Commit aborted as requested.")]
    Cancelled,

    #[error("No valid choice was made, commit aborted.")]
    NoDecision,

    #[error("The staged content is not formatted correctly ({} file(s)).", .0.len())]
    NeedsFormatting(Vec<PathBuf>),

    #[error("{} is not in the index", .0.display())]
    NotStaged(PathBuf),

    #[error("invalid pattern on line {line} of the ignore file ({pattern}): {source}")]
    InvalidIgnorePattern {
        line: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Git(#[from] git2::Error),
}

pub type GateResult<T> = std::result::Result<T, GateError>;
