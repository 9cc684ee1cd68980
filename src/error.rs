use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),
    #[error("OpenAI API key not found in environment variables.")]
    MissingCredential,
    #[error("{0:#}")]
    Remote(anyhow::Error),
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid image payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Input problems detected before the remote service is contacted.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::MissingCredential)
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        Self::Remote(err)
    }
}
