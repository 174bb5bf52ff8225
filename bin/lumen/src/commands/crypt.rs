use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Args;
use lumen::m3u::Recipe;

use crate::config::Settings;

#[derive(Args, Debug, Clone)]
/// Decrypt or encrypt a playlist file with a recipe.
pub struct CryptCommand {
    /// `password|salt_hex|iv_hex|iterations`. Falls back to the configured recipe.
    #[clap(short, long, env = "LUMEN_DECRYPT_RECIPE", hide_env_values = true)]
    pub recipe: Option<String>,

    /// The input file. Read from stdin if not specified.
    pub input: Option<PathBuf>,

    /// The output file. Written to stdout if not specified.
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

impl CryptCommand {
    pub fn decrypt(self, settings: &Settings) -> anyhow::Result<()> {
        let recipe = self.recipe(settings)?;
        let data = self.read_input()?;
        let text = recipe.decrypt(&data)?;
        self.write_output(text.as_bytes())
    }

    pub fn encrypt(self, settings: &Settings) -> anyhow::Result<()> {
        let recipe = self.recipe(settings)?;
        let data = self.read_input()?;
        let encrypted = recipe.encrypt(&data)?;
        self.write_output(&encrypted)
    }

    fn recipe(&self, settings: &Settings) -> anyhow::Result<Recipe> {
        let recipe = self
            .recipe
            .as_deref()
            .or(settings.ingest.decrypt_recipe.as_deref())
            .context("No recipe given, pass --recipe or set ingest.decrypt_recipe")?;
        Ok(recipe.parse()?)
    }

    fn read_input(&self) -> anyhow::Result<Vec<u8>> {
        let mut input: Box<dyn Read> = match &self.input {
            Some(path) => Box::new(BufReader::new(
                File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
            )),
            None => Box::new(BufReader::new(std::io::stdin())),
        };

        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        Ok(data)
    }

    fn write_output(&self, data: &[u8]) -> anyhow::Result<()> {
        let mut output: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?,
            )),
            None => Box::new(BufWriter::new(std::io::stdout())),
        };

        output.write_all(data)?;
        output.flush()?;
        Ok(())
    }
}
