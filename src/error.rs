use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Every fatal condition the extractor can hit. None of them is recovered locally.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Malformed source file or malformed export-annotation argument
    #[error("failed to parse {}{}: {reason}", .path.display(), in_definition(.definition))]
    Parse {
        path: PathBuf,
        definition: Option<String>,
        reason: String,
    },

    /// Two plain source files resolve to the same destination module
    #[error(
        "duplicate module `{module}`: {} and {} both map to it",
        .first.display(),
        .second.display()
    )]
    DuplicateModule {
        module: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A destination file already exists on disk
    #[error("refusing to overwrite {}: destination already exists", .path.display())]
    EmissionConflict { path: PathBuf },

    /// An external postprocess tool exited non-zero
    #[error("postprocess tool {tool} exited with {status}")]
    PostprocessTool { tool: String, status: ExitStatus },

    #[error("failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid source path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn in_definition(definition: &Option<String>) -> String {
    definition
        .as_deref()
        .map(|name| format!(" (definition `{name}`)"))
        .unwrap_or_default()
}

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure. Tool failures forward the tool's own code.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Parse { .. } => 2,
            Self::DuplicateModule { .. } => 3,
            Self::EmissionConflict { .. } => 4,
            Self::PostprocessTool { status, .. } => status
                .code()
                .and_then(|code| u8::try_from(code).ok())
                .filter(|code| *code != 0)
                .unwrap_or(5),
            Self::ToolLaunch { .. } => 5,
            Self::Config(_) | Self::InvalidPath { .. } => 64,
            Self::Io { .. } => 74,
        }
    }
}
