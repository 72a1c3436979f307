use anyhow::Context;
use catchbox_api_client::MailboxApiClient;
use catchbox_api_types::InboxRef;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const ENV_PREFIX: &str = "CATCHBOX_";

/// Where the shared sandbox inbox lives and how to reach it.
///
/// Both the HTTP credential used to read the inbox and the SMTP
/// credential handed to the system under test live here. There are
/// no built-in credentials; they come from a config file or the
/// environment. To use a different account, build a different value.
#[derive(Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MailboxConfig {
    #[serde(default = "MailboxConfig::default_endpoint")]
    pub endpoint: Url,
    pub inbox_id: String,
    pub api_token: String,

    #[serde(default = "MailboxConfig::default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "MailboxConfig::default_smtp_port")]
    pub smtp_port: u16,
    /// Doubles as the namespace for generated identities
    pub smtp_username: String,
    pub smtp_password: String,

    #[serde(default = "MailboxConfig::default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "MailboxConfig::default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(
        default = "MailboxConfig::default_poll_interval",
        with = "humantime_serde"
    )]
    pub poll_interval: Duration,
}

impl std::fmt::Debug for MailboxConfig {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("MailboxConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("inbox_id", &self.inbox_id)
            .field("api_token", &"<redacted>")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl MailboxConfig {
    fn default_endpoint() -> Url {
        Url::parse("https://mailtrap.io/").expect("valid default endpoint")
    }

    fn default_smtp_host() -> String {
        "mailtrap.io".to_string()
    }

    fn default_smtp_port() -> u16 {
        2525
    }

    fn default_timeout() -> Duration {
        catchbox_api_client::DEFAULT_TIMEOUT
    }

    fn default_fetch_concurrency() -> usize {
        crate::query::DEFAULT_FETCH_CONCURRENCY
    }

    fn default_poll_interval() -> Duration {
        crate::query::DEFAULT_POLL_INTERVAL
    }

    /// Build a config with default connection settings around
    /// a set of credentials
    pub fn new(
        inbox_id: impl Into<String>,
        api_token: impl Into<String>,
        smtp_username: impl Into<String>,
        smtp_password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            inbox_id: inbox_id.into(),
            api_token: api_token.into(),
            smtp_host: Self::default_smtp_host(),
            smtp_port: Self::default_smtp_port(),
            smtp_username: smtp_username.into(),
            smtp_password: smtp_password.into(),
            timeout: Self::default_timeout(),
            fetch_concurrency: Self::default_fetch_concurrency(),
            poll_interval: Self::default_poll_interval(),
        }
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("parsing mailbox config")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings that serde cannot. Call this again after
    /// replacing the endpoint with [`MailboxConfig::with_endpoint`].
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            matches!(self.endpoint.scheme(), "http" | "https")
                && !self.endpoint.cannot_be_a_base(),
            "mailbox endpoint {} must be an http or https url",
            self.endpoint
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("loading {}", path.display()))
    }

    /// Build a config from `CATCHBOX_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let required = |name: &str| {
            var(name).ok_or_else(|| anyhow::anyhow!("{ENV_PREFIX}{name} must be set"))
        };

        let mut config = Self::new(
            required("INBOX_ID")?,
            required("API_TOKEN")?,
            required("SMTP_USERNAME")?,
            required("SMTP_PASSWORD")?,
        );
        if let Some(endpoint) = var("ENDPOINT") {
            config.endpoint = Url::parse(&endpoint)
                .with_context(|| format!("parsing {ENV_PREFIX}ENDPOINT={endpoint}"))?;
        }
        if let Some(host) = var("SMTP_HOST") {
            config.smtp_host = host;
        }
        if let Some(port) = var("SMTP_PORT") {
            config.smtp_port = port
                .parse()
                .with_context(|| format!("parsing {ENV_PREFIX}SMTP_PORT={port}"))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_endpoint(self, endpoint: Url) -> Self {
        Self { endpoint, ..self }
    }

    pub fn with_smtp_server(self, smtp_host: impl Into<String>, smtp_port: u16) -> Self {
        Self {
            smtp_host: smtp_host.into(),
            smtp_port,
            ..self
        }
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }

    pub fn inbox(&self) -> InboxRef {
        InboxRef::new(&self.inbox_id, &self.api_token)
    }

    pub fn client(&self) -> MailboxApiClient {
        MailboxApiClient::new(self.endpoint.clone()).with_timeout(self.timeout)
    }
}
