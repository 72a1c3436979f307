//! Retrieval of notification mail from a shared sandbox inbox, scoped
//! to the messages that the current test run caused to be sent.
//!
//! Each run generates an [`Identity`] which the system under test is
//! configured to use as its reply-to address (see [`SmtpSettings`]).
//! Since the inbox is shared with unrelated runs, [`MailQuery`] only
//! ever reports messages whose reply-to carries that identity.

pub mod config;
pub mod context;
pub mod decode;
pub mod error;
pub mod identity;
pub mod logging;
pub mod ownership;
pub mod query;
pub mod sut;

pub use catchbox_api_types::{InboxRef, MessageSummary};
pub use config::MailboxConfig;
pub use context::TestRun;
pub use decode::{DecodeError, DecodedMessage, decode};
pub use error::Error;
pub use identity::Identity;
pub use ownership::is_owned;
pub use query::{MailQuery, MailboxSource, MatchOutcome};
pub use sut::SmtpSettings;
