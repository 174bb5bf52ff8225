use std::io::Write;

use clap::Args;

use crate::config::Settings;

#[derive(Args, Debug, Clone)]
/// Download a channel playlist and list its channels.
pub struct IngestCommand {
    /// Playlist URL
    pub url: String,

    /// User-Agent sent with the playlist request
    #[clap(long, env = "LUMEN_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Decrypt the playlist with `password|salt_hex|iv_hex|iterations`
    #[clap(long, env = "LUMEN_DECRYPT_RECIPE", hide_env_values = true)]
    pub recipe: Option<String>,

    /// Print channels as JSON
    #[clap(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn run(self, settings: &Settings) -> anyhow::Result<()> {
        let options = settings.ingest_options(self.user_agent, self.recipe);
        let entries = settings
            .ingestor()?
            .try_ingest(&self.url, &options)
            .await?;
        log::info!("Found {} channels in {}", entries.len(), self.url);

        let mut stdout = std::io::stdout().lock();
        if self.json {
            serde_json::to_writer_pretty(&mut stdout, &entries)?;
            writeln!(stdout)?;
        } else {
            for entry in entries {
                writeln!(stdout, "{}\t{}\t{}", entry.group, entry.name, entry.url)?;
            }
        }
        Ok(())
    }
}
