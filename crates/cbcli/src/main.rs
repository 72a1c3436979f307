use catchbox::MailboxConfig;
use catchbox::logging::{DiagnosticFormat, LoggingConfig};
use catchbox_api_client::Url;
use clap::Parser;
use std::path::PathBuf;

mod find;
mod identity;
mod list;

/// Sandbox inbox CLI.
///
/// Generates test run identities and inspects the mail that a run
/// has caused to be delivered into the shared sandbox inbox.
#[derive(Debug, Parser)]
#[command(about, version)]
struct Opt {
    /// Path to a TOML file describing the mailbox.
    /// If not specified, the CATCHBOX_INBOX_ID, CATCHBOX_API_TOKEN,
    /// CATCHBOX_SMTP_USERNAME and CATCHBOX_SMTP_PASSWORD environment
    /// variables (and optionally CATCHBOX_ENDPOINT, CATCHBOX_SMTP_HOST
    /// and CATCHBOX_SMTP_PORT) are used instead.
    #[arg(long)]
    config: Option<PathBuf>,

    /// URL of the mailbox provider HTTP API, overriding the configuration.
    #[arg(long)]
    endpoint: Option<Url>,

    /// How to format diagnostic output. The level is controlled
    /// by the CATCHBOX_LOG environment variable.
    #[arg(long, value_enum, default_value = "full")]
    diag_format: DiagnosticFormat,

    #[command(subcommand)]
    cmd: SubCommand,
}

#[derive(Debug, Parser)]
enum SubCommand {
    Identity(identity::IdentityCommand),
    List(list::ListCommand),
    Find(find::FindCommand),
}

impl SubCommand {
    async fn run(&self, config: MailboxConfig) -> anyhow::Result<()> {
        match self {
            Self::Identity(cmd) => cmd.run(config).await,
            Self::List(cmd) => cmd.run(config).await,
            Self::Find(cmd) => cmd.run(config).await,
        }
    }
}

impl Opt {
    fn mailbox_config(&self) -> anyhow::Result<MailboxConfig> {
        let config = match &self.config {
            Some(path) => MailboxConfig::load(path)?,
            None => MailboxConfig::from_env()?,
        };
        let config = match &self.endpoint {
            Some(endpoint) => config.with_endpoint(endpoint.clone()),
            None => config,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opt::parse();

    LoggingConfig {
        diag_format: opts.diag_format,
        ..LoggingConfig::default()
    }
    .init()?;

    let config = opts.mailbox_config()?;
    opts.cmd.run(config).await
}
