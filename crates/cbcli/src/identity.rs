use catchbox::{MailboxConfig, TestRun};
use clap::Parser;

#[derive(Debug, Parser)]
/// Generate a new test run identity.
///
/// Prints the identity along with the SMTP settings that the
/// system under test should be configured with so that its
/// mail is attributed to the new run.
pub struct IdentityCommand {
    /// Instead of showing the human readable output,
    /// return the settings as json.
    #[arg(long)]
    json: bool,
}

impl IdentityCommand {
    pub async fn run(&self, config: MailboxConfig) -> anyhow::Result<()> {
        let run = TestRun::new(config);
        let settings = run.smtp_settings();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        } else {
            println!("identity:  {}", run.identity());
            println!("smtp host: {}:{}", settings.smtp_host, settings.smtp_port);
            println!("smtp user: {}", settings.auth_username);
            println!("reply-to:  {}", settings.reply_to_address);
        }
        Ok(())
    }
}
