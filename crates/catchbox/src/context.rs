use crate::config::MailboxConfig;
use crate::identity::Identity;
use crate::query::MailQuery;
use crate::sut::SmtpSettings;
use catchbox_api_client::MailboxApiClient;

/// Everything that one test run needs in order to send mail into
/// the sandbox and query it back out.
///
/// Create one per run and hand it to whatever needs it; when the
/// run is over, drop it.
pub struct TestRun {
    config: MailboxConfig,
    identity: Identity,
}

impl TestRun {
    /// Start a run with a freshly generated identity
    pub fn new(config: MailboxConfig) -> Self {
        let identity = Identity::generate(&config.smtp_username);
        tracing::info!(identity = identity.as_str(), inbox = %config.inbox_id, "test run identity");
        Self { config, identity }
    }

    /// Resume a run whose identity is already known
    pub fn with_identity(config: MailboxConfig, identity: Identity) -> Self {
        Self { config, identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        self.config.smtp_settings(&self.identity)
    }

    pub fn query(&self) -> MailQuery<MailboxApiClient> {
        MailQuery::new(
            self.config.client(),
            self.config.inbox(),
            self.identity.clone(),
        )
        .with_fetch_concurrency(self.config.fetch_concurrency)
        .with_poll_interval(self.config.poll_interval)
    }
}
