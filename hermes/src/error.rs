use crate::ErrorObject;
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between calling the store and getting a response back.
///
/// Errors are `Clone` because a single failed request can be shared by several callers.
#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum Error {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Transport { status: u16, message: String },
    /// The body couldn't be parsed as a JSON:API document.
    #[error("{name}: {message}")]
    MalformedResponse {
        name: String,
        message: String,
        kind: String
    },
    /// The document contained a non-empty `errors` array.
    #[error("server returned {} error(s): {}", .0.len(), format_errors(.0))]
    Document(Vec<ErrorObject>),
    /// Invalid usage of the library, such as plural data on a record that isn't in a store.
    #[error("{0}")]
    Programmer(String),
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError)
}

fn format_errors(errors: &[ErrorObject]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub(crate) fn status(status: u16) -> Self {
        Error::Transport {
            status,
            message: format!("Invalid HTTP status: {}", status)
        }
    }

    pub(crate) fn malformed<E: std::fmt::Display>(kind: &str, error: E) -> Self {
        Error::MalformedResponse {
            name: "MalformedResponseError".to_string(),
            message: error.to_string(),
            kind: kind.to_string()
        }
    }

    pub(crate) fn programmer<M: Into<String>>(message: M) -> Self {
        Error::Programmer(message.into())
    }

    /// The HTTP status of a transport error.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => Some(*status),
            _ => None
        }
    }

    /// The server's error objects, if this is a document error.
    pub fn errors(&self) -> Option<&[ErrorObject]> {
        match self {
            Error::Document(errors) => Some(errors),
            _ => None
        }
    }

    /// Whether a request that failed with this error has to be re-issued next time instead of
    /// being served from the request cache.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. } | Error::Document(_) | Error::Network(_)
        )
    }
}
