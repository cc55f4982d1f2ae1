use thiserror::Error;

/// Postgres SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Outcome of a failed backend call.
///
/// `Transport` covers calls that never produced a backend answer (network,
/// TLS, pool exhaustion, undecodable payloads). `Api` is an error object the
/// backend returned, with the Postgres error code when one is present.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend transport error: {0}")]
    Transport(String),

    #[error("backend returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("service role key is not configured")]
    MissingServiceCredential,
}

impl BackendError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, BackendError::Api { code: Some(code), .. } if code == UNIQUE_VIOLATION)
    }

    /// True when the backend answered with an error object.
    pub fn is_api(&self) -> bool {
        matches!(self, BackendError::Api { .. })
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => BackendError::Api {
                status: 400,
                code: db.code().map(|c| c.into_owned()),
                message: db.message().to_string(),
            },
            other => BackendError::Transport(other.to_string()),
        }
    }
}
