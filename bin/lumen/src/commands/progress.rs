use std::{io::Write, path::PathBuf};

use clap::Args;
use lumen::{LumenStore, PlayRecord, ProgressStore};

#[derive(Args, Debug, Clone)]
/// List the play records kept in a progress file.
pub struct ProgressCommand {
    /// Path of the JSON progress file
    pub store: PathBuf,

    /// Print records as JSON
    #[clap(long)]
    pub json: bool,
}

impl ProgressCommand {
    pub async fn run(self) -> anyhow::Result<()> {
        let records = LumenStore::file(&self.store).records().await?;
        log::debug!("{} records in {}", records.len(), self.store.display());

        let mut stdout = std::io::stdout().lock();
        if self.json {
            let records: serde_json::Map<_, _> = records
                .into_iter()
                .map(|(key, record)| serde_json::to_value(record).map(|value| (key, value)))
                .collect::<serde_json::Result<_>>()?;
            serde_json::to_writer_pretty(&mut stdout, &records)?;
            writeln!(stdout)?;
            return Ok(());
        }

        for (key, record) in records {
            writeln!(stdout, "{key}\t{}", describe(&record))?;
        }
        Ok(())
    }
}

fn describe(record: &PlayRecord) -> String {
    let mut line = format!(
        "{}\tE{}/{}\t{}/{}",
        record.title,
        record.episode_index,
        record.total_episodes,
        clock(record.play_time),
        clock(record.total_time)
    );
    if let Some(intro) = record.intro_end_millis {
        line.push_str(&format!("\tintro {}", clock(intro / 1000)));
    }
    if let Some(outro) = record.outro_start_offset_millis {
        line.push_str(&format!("\toutro -{}", clock(outro / 1000)));
    }
    line
}

fn clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
