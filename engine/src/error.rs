use std::path::PathBuf;

use thiserror::Error;

use crate::image_model::GoogleApiError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse grouping of [`Error`]s, so callers can pick an exit code without matching every variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Config,
    Input,
    Upstream,
    Output,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("No API key found at {}", path.display())]
    MissingCredential { path: PathBuf },

    #[error("Credential file {} is empty", path.display())]
    EmptyCredential { path: PathBuf },

    #[error("No cloud project configured at {}", path.display())]
    MissingProject { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Image not found: {}", path.display())]
    ImageNotFound { path: PathBuf },

    #[error("{0}")]
    InvalidInput(String),

    #[error("Generation blocked{}", reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Blocked { reason: Option<String> },

    #[error(transparent)]
    Api(#[from] GoogleApiError),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Couldn't decode image data: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Couldn't encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

const BAD_KEY_HINT: &str =
    "Check that the saved API key is valid for this model, or run: nano-banana --set-key \"your-key\"";

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> Category {
        use Error::*;
        match self {
            MissingCredential { .. } | EmptyCredential { .. } | MissingProject { .. } | Config(_) => {
                Category::Config
            }
            ImageNotFound { .. } | InvalidInput(_) => Category::Input,
            Blocked { .. } | Api(_) | Http(_) | InvalidResponse(_) => Category::Upstream,
            Decode(_) | Encode(_) | Io { .. } => Category::Output,
        }
    }

    /// A one line suggestion on how to fix the problem, if there is an obvious one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::MissingCredential { .. } | Error::EmptyCredential { .. } => {
                Some("Run: nano-banana --set-key \"your-key\"")
            }
            Error::MissingProject { .. } => Some("Run: nano-banana --set-project \"your-project-id\""),
            Error::Api(GoogleApiError::Unauthenticated { .. })
            | Error::Api(GoogleApiError::PermissionDenied { .. }) => Some(BAD_KEY_HINT),
            // the Gemini API reports a wrong key as a plain 400
            Error::Api(GoogleApiError::InvalidArgument { message })
                if message.contains("API key") =>
            {
                Some(BAD_KEY_HINT)
            }
            _ => None,
        }
    }
}
