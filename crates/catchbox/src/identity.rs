use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fingerprint of a single test run.
///
/// It takes the form of a mail address, `<random>@<namespace>.com`,
/// so that it can be configured as the reply-to address of the
/// system under test. Messages whose reply-to contains it are
/// considered to have been produced by this run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Generate a fresh identity. `namespace` should name the shared
    /// mailbox so that identities from different mailboxes never collide.
    pub fn generate(namespace: &str) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{random}@{namespace}.com"))
    }

    /// Re-create an identity from a token produced by an earlier
    /// call to [`Identity::generate`].
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
