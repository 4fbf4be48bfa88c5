/// Common error type for `owner_sync_core`.
///
/// Every failure inside a reconciliation run surfaces as one of these variants
/// and propagates to the scheduler's run handler.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("transport error calling {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote API answered with a non-success status.
    #[error("api error calling {endpoint}: status={status} body={body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("invalid json from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// The remote kept returning cursors past the configured page cap.
    #[error("pagination for '{resource}' exceeded {pages} pages")]
    PaginationLimit { resource: String, pages: usize },

    #[error("scheduling error: {0}")]
    Scheduling(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Remote status code, when the failure came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
