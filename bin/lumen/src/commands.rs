use clap::Subcommand;

use crate::config::Settings;

mod crypt;
mod ingest;
mod progress;

#[derive(Subcommand, Debug, Clone)]
pub enum LumenCommand {
    Ingest(ingest::IngestCommand),
    Decrypt(crypt::CryptCommand),
    Encrypt(crypt::CryptCommand),
    Progress(progress::ProgressCommand),
}

impl LumenCommand {
    pub async fn run(self, settings: Settings) -> anyhow::Result<()> {
        match self {
            LumenCommand::Ingest(command) => command.run(&settings).await,
            LumenCommand::Decrypt(command) => command.decrypt(&settings),
            LumenCommand::Encrypt(command) => command.encrypt(&settings),
            LumenCommand::Progress(command) => command.run().await,
        }
    }
}
