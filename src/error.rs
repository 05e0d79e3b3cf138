use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = ExecutorError> = std::result::Result<T, E>;

/// Failures of a single verb call.
///
/// HTTP error statuses are never represented here: any response with a
/// status below 600 comes back as an [`ExchangeRecord`](crate::executor::ExchangeRecord).
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// DNS, connect, timeout and other transport failures, kept as-is.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("invalid request URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid value for header {name}")]
    InvalidHeader { name: String },

    #[error("reading attachment {}: {}", .path.display(), .source)]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a request body and a file attachment cannot be sent together")]
    BodyWithFile,

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("serializing request body: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ExecutorError {
    /// True when the failure happened on the wire rather than while preparing the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, ExecutorError::Transport(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutorError::Transport(err) if err.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_with_file_message_is_readable() {
        let err = ExecutorError::BodyWithFile;
        assert!(err.to_string().contains("cannot be sent together"));
        assert!(!err.is_transport());
        assert!(!err.is_timeout());
    }

    #[test]
    fn attachment_error_names_the_path() {
        let err = ExecutorError::Attachment {
            path: PathBuf::from("/tmp/missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/missing.json"));
    }
}
