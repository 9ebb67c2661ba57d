use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the server's `{error}` text.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// What kind of problem an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Input was rejected before any request was sent.
    Validation,
    /// The action needs a signed-in user.
    SignIn,
    /// The server refused the action and said why.
    Rejected,
    /// Network or server failure. The detail is logged, not shown.
    Failed,
}

/// A blocking, user-facing message. Every failed action ends in one; none are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

pub const SIGN_IN_MESSAGE: &str = "Please sign in to continue.";
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";

impl Alert {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Validation,
            message: message.into(),
        }
    }

    pub fn sign_in() -> Self {
        Self {
            kind: AlertKind::SignIn,
            message: SIGN_IN_MESSAGE.to_string(),
        }
    }

    pub fn failed() -> Self {
        Self {
            kind: AlertKind::Failed,
            message: GENERIC_FAILURE.to_string(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<ClientError> for Alert {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status: 401, .. } => Alert::sign_in(),
            ClientError::Api { status, message } if (400..500).contains(&status) => {
                tracing::debug!(status, %message, "request rejected");
                Alert {
                    kind: AlertKind::Rejected,
                    message,
                }
            }
            other => {
                tracing::warn!("request failed: {}", other);
                Alert::failed()
            }
        }
    }
}
