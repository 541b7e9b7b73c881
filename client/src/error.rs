//! Client error type.

use thiserror::Error;

/// Errors surfaced by the client library.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received (connection, DNS, timeout).
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The server answered with a non-success status. `message` is already
    /// flattened from the response body.
    #[error("server rejected request ({status}): {message}")]
    ServerRejected {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// A stored draft could not be decoded; it is treated as absent.
    #[error("local draft `{key}` is malformed")]
    MalformedLocalDraft {
        /// Store key of the draft.
        key: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// A payload was readable but not in a usable shape.
    #[error("failed to parse {what}: {detail}")]
    ParseFailure {
        /// What was being parsed.
        what: String,
        /// Why it was rejected.
        detail: String,
    },

    /// Token refresh failed; the caller must send the user to `login_route`.
    #[error("session expired, sign in again at {login_route}")]
    SessionExpired {
        /// Route of the sign-in page.
        login_route: String,
    },

    /// Reading or writing the local store failed.
    #[error("local store error: {0}")]
    Store(#[from] std::io::Error),

    /// A response or stored value did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The operation is not available for this item.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Arguments were rejected before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Whether the request never reached the server.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkUnavailable(_))
    }

    /// One-line notice for a failed save. Network failures say the work is
    /// kept locally; rejections show the server's own message.
    pub fn save_notice(&self) -> String {
        match self {
            Self::NetworkUnavailable(_) => "Network error - saved locally".to_string(),
            Self::ServerRejected {
                message, ..
            } => message.clone(),
            Self::SessionExpired {
                ..
            } => "Session expired - saved locally, sign in again".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::ParseFailure {
                what: "response body".to_string(),
                detail: err.to_string(),
            };
        }
        match err.status() {
            Some(status) => Self::ServerRejected {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::NetworkUnavailable(err.to_string()),
        }
    }
}
