//! Error type shared by the catalog client, the sentiment model client and
//! the configuration layer.
//!
//! Nothing here reaches the user directly: the pipeline turns every error
//! into a banner (see [`crate::pipeline`]).  Messages never include client
//! secrets or tokens.

/// Errors raised by the external collaborators and the config file.
#[derive(Debug, thiserror::Error)]
pub enum MoodError {
    /// Client ID / secret (or another required credential) not supplied.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// The token endpoint rejected the credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The remote API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, DNS or TLS failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The external sentiment model could not be used.
    #[error("sentiment model unavailable: {0}")]
    ModelUnavailable(String),

    /// Reading or writing the defaults file or the terminal.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MoodError>;

impl From<ureq::Error> for MoodError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response
                    .into_string()
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                MoodError::Http {
                    status,
                    body: truncate_body(&body),
                }
            }
            ureq::Error::Transport(t) => MoodError::Transport(t.to_string()),
        }
    }
}

impl From<serde_json::Error> for MoodError {
    fn from(err: serde_json::Error) -> Self {
        MoodError::Decode(err.to_string())
    }
}

/// Keep error bodies to a readable length; Spotify error pages can be large.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 300;
    if body.chars().count() <= MAX {
        body.trim().to_string()
    } else {
        let cut: String = body.chars().take(MAX).collect();
        format!("{}…", cut.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_missing_credentials() {
        let err = MoodError::MissingCredentials("client ID".into());
        assert_eq!(err.to_string(), "missing credentials: client ID");
    }

    #[test]
    fn test_display_http() {
        let err = MoodError::Http {
            status: 404,
            body: "not found".into(),
        };
        assert_eq!(err.to_string(), "HTTP 404: not found");
    }

    #[test]
    fn test_json_error_becomes_decode() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: MoodError = json_err.into();
        assert!(matches!(err, MoodError::Decode(_)));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("  short  "), "short");
        let long = "x".repeat(500);
        let cut = truncate_body(&long);
        assert!(cut.ends_with('…'));
        assert_eq!(cut.chars().count(), 301);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MoodError>();
    }
}
