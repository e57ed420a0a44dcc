//! Error taxonomy for a shaping batch.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration problems detected before any backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("either --prompt or --prompt-path must be provided")]
    MissingPrompt,

    #[error("--outpath cannot be combined with --rewrite")]
    OutpathWithRewrite,

    #[error("--outpath cannot be used with {0} input files; the target would be ambiguous")]
    OutpathWithMultipleInputs(usize),
}

#[derive(Error, Debug)]
pub enum ShapeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read API key from {}", path.display())]
    Credential {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine home directory for the API key file")]
    NoHomeDir,

    /// Non-2xx response from the backend.
    #[error("unexpected status code: {status} '{message}'")]
    Backend { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("no choices in chat completion")]
    NoChoices,

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ShapeError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ShapeError::Io {
            context: context.into(),
            source,
        }
    }
}
