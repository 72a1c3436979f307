use crate::config::MailboxConfig;
use crate::identity::Identity;
use serde::{Deserialize, Serialize};

/// The mail settings to apply to the system under test so that its
/// outbound notifications land in the sandbox inbox, tagged with the
/// identity of the current run.
///
/// This is a plain value; applying it (filling in the SUT's
/// configuration UI) is the job of the caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SmtpSettings {
    pub smtp_host: String,
    pub use_auth: bool,
    pub auth_username: String,
    pub auth_password: String,
    pub smtp_port: u16,
    pub reply_to_address: String,
}

impl MailboxConfig {
    pub fn smtp_settings(&self, identity: &Identity) -> SmtpSettings {
        SmtpSettings {
            smtp_host: self.smtp_host.clone(),
            use_auth: true,
            auth_username: self.smtp_username.clone(),
            auth_password: self.smtp_password.clone(),
            smtp_port: self.smtp_port,
            reply_to_address: identity.to_string(),
        }
    }
}
