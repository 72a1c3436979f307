use catchbox::{Identity, MailboxConfig, TestRun};
use clap::Parser;
use regex::Regex;
use std::time::Duration;

#[derive(Debug, Parser)]
/// Show the single message of a test run whose subject matches a pattern.
///
/// Fails if no such message exists, or if more than one does.
pub struct FindCommand {
    /// The identity of the run, as printed by `cbcli identity`
    #[arg(long)]
    identity: String,

    /// A regex that must match somewhere in the subject
    #[arg(long)]
    pub subject: Regex,

    /// Keep polling the inbox for up to this long, eg: `30s`,
    /// before concluding that there is no matching message.
    #[arg(long, value_parser=humantime::parse_duration)]
    pub wait: Option<Duration>,

    /// Return the decoded message as json.
    #[arg(long)]
    json: bool,
}

impl FindCommand {
    pub async fn run(&self, config: MailboxConfig) -> anyhow::Result<()> {
        let run = TestRun::with_identity(config, Identity::from_token(&self.identity));
        let query = run.query();

        let found = match self.wait {
            Some(timeout) => query.wait_for_one(&self.subject, timeout).await?,
            None => query.find_one(&self.subject).await?,
        };
        let Some(msg) = found else {
            anyhow::bail!(
                "no message owned by {} has a subject matching /{}/",
                self.identity,
                self.subject
            );
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&msg)?);
        } else {
            println!("id:       {}", msg.id);
            println!("subject:  {}", msg.subject);
            println!("from:     {}", msg.from.join(", "));
            println!("to:       {}", msg.to.join(", "));
            println!("reply-to: {}", msg.reply_to.join(", "));
            println!();
            println!("{}", msg.body);
        }
        Ok(())
    }
}
