//! Reference command - normalized city to county table

use super::{InputArgs, REFERENCE_FILE};
use crate::reference::write_reference_csv;
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReferenceCommand {
    #[command(flatten)]
    inputs: InputArgs,

    /// File to write, "-" for stdout [default: formatted-city-to-county.csv]
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ReferenceCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let reference = self.inputs.load_reference()?;
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| self.inputs.dir.join(REFERENCE_FILE));

        if output.as_os_str() == "-" {
            return write_reference_csv(&reference, io::stdout().lock());
        }
        let file = File::create(&output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        write_reference_csv(&reference, BufWriter::new(file))?;
        log::info!("Wrote {} cities to {}", reference.len(), output.display());
        Ok(())
    }
}
