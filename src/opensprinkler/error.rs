use thiserror::Error;

/// Failures while talking to the OpenSprinkler controller
#[derive(Debug, Error)]
pub enum ControllerApiError {
    /// Connection refused, DNS failure, timeout, broken body stream. The request
    /// URL is stripped since it carries the `pw` query parameter.
    #[error("HTTP transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Invalid controller URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-2xx answer. Only the path is kept so the password never ends up in logs.
    #[error("Controller returned HTTP {status} for {path}")]
    Status { status: u16, path: String },

    /// The status document is not the expected JSON shape
    #[error("Failed to decode station status: {message}")]
    Deserialization { message: String, body: String },
}

impl From<reqwest::Error> for ControllerApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.without_url())
    }
}
