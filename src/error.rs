//! Error types for the framing service

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// How many valid device ids an unknown-device message lists before eliding.
const KNOWN_DEVICES_SHOWN: usize = 6;

/// Where a failure originates, which decides what the caller gets to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input from the caller; the message is returned verbatim.
    Client,
    /// The target site or network failed; the cause is returned.
    Upstream,
    /// A fault inside the service; logged, never exposed.
    Internal,
}

/// Errors that can occur while producing a framed screenshot
#[derive(Error, Debug)]
pub enum Error {
    /// Query string missing or malformed
    #[error("{0}")]
    BadRequest(String),

    /// The url failed the shape check
    #[error("Invalid url \"{0}\" supplied.")]
    InvalidUrl(String),

    /// The device id is not in the catalog
    #[error("Invalid device ID \"{id}\", valid device IDs include: {}", known_preview(.known))]
    UnknownDevice { id: String, known: Vec<String> },

    /// Navigating to the target failed (DNS, refused, TLS, timeout)
    #[error("Failed to load URL: {0}")]
    Navigation(String),

    /// Failed to launch or configure the browser
    #[error("Browser initialization failed: {0}")]
    InitializationError(String),

    /// Failed to capture the page
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Frame asset missing or unreadable
    #[error("Failed to load frame asset {path}: {reason}")]
    AssetError { path: String, reason: String },

    /// Screenshot decode or PNG encode failed
    #[error("Image processing failed: {0}")]
    ImageError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn known_preview(known: &[String]) -> String {
    let shown: Vec<&str> = known
        .iter()
        .take(KNOWN_DEVICES_SHOWN)
        .map(String::as_str)
        .collect();
    format!("{}...", shown.join(","))
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadRequest(_) | Error::InvalidUrl(_) | Error::UnknownDevice { .. } => {
                ErrorKind::Client
            }
            Error::Navigation(_) => ErrorKind::Upstream,
            _ => ErrorKind::Internal,
        }
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::InvalidUrl(_) | Error::UnknownDevice { .. } => StatusCode::NOT_ACCEPTABLE,
            Error::Navigation(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text safe to hand back to the caller, if any.
    pub fn client_message(&self) -> Option<String> {
        match self.kind() {
            ErrorKind::Client | ErrorKind::Upstream => Some(self.to_string()),
            ErrorKind::Internal => None,
        }
    }
}
