use thiserror::Error;

/// Local auth failure message shown when credentials are not configured.
pub const NO_CREDENTIALS_MESSAGE: &str = "No username and password supplied.";

/// Local auth failure message for the silent-header login failure case.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed.";

/// Error type for PS Vue client operations
#[derive(Debug, Error)]
pub enum VueError {
    /// Login or token exchange failed; carries a local or vendor message
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The vendor API returned an error envelope mid-session
    #[error("Vendor API error: {message}")]
    Vendor { message: String },

    /// Transport-level error from the HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not parse as the expected JSON shape
    #[error("Failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    /// On-disk state (cookies, credentials, configuration) could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HLS manifest could not be parsed
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// A field the flow cannot proceed without was absent from the response
    #[error("Missing expected field: {0}")]
    MissingField(&'static str),
}

impl VueError {
    /// Whether this error is fixed by re-running the login flow once.
    ///
    /// The vendor signals two session-level conditions through its generic
    /// error envelope rather than a status code: the account's geo-location
    /// changed since the session was issued, or the cached subscription
    /// info went stale. Both clear up after a fresh token exchange, so the
    /// caller retries the failed operation exactly once after
    /// re-authenticating. Every other vendor message is fatal for the
    /// current operation.
    pub fn is_recoverable(&self) -> bool {
        match self {
            VueError::Vendor { message } => {
                let message = message.to_ascii_lowercase();
                message.contains("geo-location") || message.contains("stale")
            }
            _ => false,
        }
    }

    /// Get detailed diagnostic information about the error
    pub fn diagnostics(&self) -> String {
        match self {
            VueError::Auth(reason) => {
                format!("Authentication Failed\nReason: {}\nSuggestion: Verify email and password", reason)
            }
            VueError::Vendor { message } => {
                format!("Vendor API Error\nMessage: {}\nSuggestion: {}", message, if self.is_recoverable() {
                    "Session state is stale; log in again"
                } else {
                    "Try again later"
                })
            }
            VueError::Http(source) => {
                format!("Transport Error\nError: {}\nSuggestion: Check internet connection", source)
            }
            VueError::Json(source) => {
                format!("Parse Error\nError: {}\nSuggestion: Vendor response is invalid", source)
            }
            VueError::Io(source) => {
                format!("IO Error\nError: {}\nSuggestion: Check the profile directory is writable", source)
            }
            VueError::Manifest(reason) => {
                format!("Manifest Error\nReason: {}\nSuggestion: Stream may be offline", reason)
            }
            VueError::MissingField(field) => {
                format!("Missing Field\nField: {}\nSuggestion: Vendor API contract may have changed", field)
            }
        }
    }
}
