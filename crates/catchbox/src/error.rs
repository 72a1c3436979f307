use crate::decode::DecodeError;
use catchbox_api_client::MailboxApiError;
use thiserror::Error;

/// Failures surfaced by [`crate::MailQuery`].
///
/// `NotFound` is only ever seen by callers that talk to a
/// [`crate::MailboxSource`] directly; the query engine skips
/// messages that vanish between listing and fetching.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("message {id} not found")]
    NotFound { id: String },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("{count} messages owned by this run match /{pattern}/, expected at most one")]
    AmbiguousMatch { pattern: String, count: usize },
    #[error("no message owned by this run matches /{pattern}/")]
    NoMatch { pattern: String },
}

impl From<MailboxApiError> for Error {
    fn from(err: MailboxApiError) -> Self {
        match err {
            MailboxApiError::Transport(msg) => Self::Transport(msg),
            MailboxApiError::Protocol(msg) => Self::Protocol(msg),
            MailboxApiError::NotFound { id } => Self::NotFound { id },
        }
    }
}
