pub mod types;
pub mod http;
pub mod mock;
pub mod demo;
pub mod orchestrator;
#[cfg(test)]
pub(crate) mod test_server;

pub use types::*;
pub use http::*;
pub use mock::*;
pub use demo::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Request timed out after {after_secs:.0}s")]
    Timeout { after_secs: f64 },

    #[error("Analysis backend is not reachable at {0}")]
    Connection(String),

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Backend returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Invalid upload request: {0}")]
    InvalidRequest(String),
}

impl BackendError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connection(_) | Self::Transport(_) => true,
            Self::Status { status, .. } => matches!(status, 502..=504),
            Self::ResponseParsing(_) | Self::InvalidRequest(_) => false,
        }
    }
}
