use catchbox::{Identity, MailboxConfig, TestRun};
use clap::Parser;
use tabout::{Alignment, Column};

#[derive(Debug, Parser)]
/// List the messages in the inbox that belong to a test run.
pub struct ListCommand {
    /// The identity of the run, as printed by `cbcli identity`
    #[arg(long)]
    identity: String,

    /// Instead of showing the human readable tabulated output,
    /// return the decoded messages as json.
    #[arg(long)]
    json: bool,
}

impl ListCommand {
    pub async fn run(&self, config: MailboxConfig) -> anyhow::Result<()> {
        let run = TestRun::with_identity(config, Identity::from_token(&self.identity));
        let messages = run.query().list_owned().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&messages)?);
            return Ok(());
        }

        let columns = [
            Column {
                name: "ID".to_string(),
                alignment: Alignment::Left,
            },
            Column {
                name: "FROM".to_string(),
                alignment: Alignment::Left,
            },
            Column {
                name: "SUBJECT".to_string(),
                alignment: Alignment::Left,
            },
        ];
        let rows: Vec<Vec<String>> = messages
            .into_iter()
            .map(|msg| vec![msg.id, msg.from.join(", "), msg.subject])
            .collect();
        tabout::tabulate_output(&columns, &rows, &mut std::io::stdout())?;

        Ok(())
    }
}
