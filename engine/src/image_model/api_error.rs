use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the Google APIs (Generative Language and Vertex AI share the envelope)
#[derive(Debug, Error)]
pub enum GoogleApiError {
    #[error("Invalid request (400): {message}")]
    InvalidArgument { message: String },

    #[error("Precondition failed (400): {message}")]
    FailedPrecondition { message: String },

    #[error("Authentication error (401): {message}")]
    Unauthenticated { message: String },

    #[error("Permission denied (403): {message}")]
    PermissionDenied { message: String },

    #[error("Not found (404): {message}")]
    NotFound { message: String },

    #[error("Quota exhausted (429): {message}")]
    ResourceExhausted { message: String },

    #[error("Internal API error (500): {message}")]
    Internal { message: String },

    #[error("Service unavailable (503): {message}")]
    Unavailable { message: String },

    #[error("Deadline exceeded (504): {message}")]
    DeadlineExceeded { message: String },

    /// Catch-all for unexpected status codes
    #[error("Unexpected API error ({code}): {message}")]
    Unexpected { code: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    error: EnvelopeError,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GoogleApiError {
    pub fn from_status(status: &str, code: u16, message: impl Into<String>) -> Self {
        let message = message.into();

        match status {
            "INVALID_ARGUMENT" => Self::InvalidArgument { message },
            "FAILED_PRECONDITION" => Self::FailedPrecondition { message },
            "UNAUTHENTICATED" => Self::Unauthenticated { message },
            "PERMISSION_DENIED" => Self::PermissionDenied { message },
            "NOT_FOUND" => Self::NotFound { message },
            "RESOURCE_EXHAUSTED" => Self::ResourceExhausted { message },
            "INTERNAL" => Self::Internal { message },
            "UNAVAILABLE" => Self::Unavailable { message },
            "DEADLINE_EXCEEDED" => Self::DeadlineExceeded { message },
            _ => Self::Unexpected { code, message },
        }
    }

    /// Builds the error from a non-success response. Bodies that aren't the usual error envelope
    /// are passed through verbatim.
    pub fn from_response(code: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<Envelope>(body) {
            Ok(Envelope { error }) => Self::from_status(&error.status, code.as_u16(), error.message),
            Err(_) => Self::Unexpected {
                code: code.as_u16(),
                message: body.trim().to_string(),
            },
        }
    }
}
