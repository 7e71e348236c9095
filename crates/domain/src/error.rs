/// Shared error type used across all Reso crates.
///
/// The upstream-facing variants carry the name of the service that failed
/// so a single terminal message can say which collaborator went wrong.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("{service}: unauthorized: {message}")]
    Unauthorized { service: String, message: String },

    #[error("{service}: rate limited")]
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },

    #[error("{service} unreachable: {message}")]
    Unreachable { service: String, message: String },

    #[error("{service} returned HTTP {status}: {body}")]
    BadStatus {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service}: malformed response: {message}")]
    Malformed { service: String, message: String },

    #[error("generation failed: {0}")]
    BackendRejected(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], used by retry policy and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    RateLimited,
    Unreachable,
    BadStatus,
    Malformed,
    BackendRejected,
    Timeout,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Unreachable { .. } | Self::Http(_) => ErrorKind::Unreachable,
            Self::BadStatus { .. } => ErrorKind::BadStatus,
            Self::Malformed { .. } | Self::Json(_) => ErrorKind::Malformed,
            Self::BackendRejected(_) => ErrorKind::BackendRejected,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Io(_) | Self::Config(_) | Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Transient faults are worth another attempt; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unreachable | ErrorKind::RateLimited)
    }

    pub fn unauthorized(service: &str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            service: service.to_owned(),
            message: message.into(),
        }
    }

    pub fn unreachable(service: &str, message: impl Into<String>) -> Self {
        Self::Unreachable {
            service: service.to_owned(),
            message: message.into(),
        }
    }

    pub fn malformed(service: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            service: service.to_owned(),
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status onto the adapter error taxonomy.
    ///
    /// | status    | error           |
    /// |-----------|-----------------|
    /// | 401, 403  | `Unauthorized`  |
    /// | 429       | `RateLimited`   |
    /// | 5xx       | `Unreachable`   |
    /// | other     | `BadStatus`     |
    pub fn from_status(
        service: &str,
        status: u16,
        body: impl Into<String>,
        retry_after_secs: Option<u64>,
    ) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::unauthorized(service, format!("HTTP {status}: {body}")),
            429 => Self::RateLimited {
                service: service.to_owned(),
                retry_after_secs,
            },
            500..=599 => Self::unreachable(service, format!("HTTP {status}: {body}")),
            _ => Self::BadStatus {
                service: service.to_owned(),
                status,
                body,
            },
        }
    }
}
