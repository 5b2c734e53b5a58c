//! The `index` subcommand: rebuild `tickers.json` from the output directory.

use anyhow::Result;
use tickerstore_lib::{manifest, rebuild_manifest, ConfigFile};

use super::{resolve_config, GlobalOpts};
use crate::output::{print_json, OutputFormat};

pub fn run(global: &GlobalOpts, format: &OutputFormat) -> Result<()> {
    let config = resolve_config(global, ConfigFile::default())?;
    let built = rebuild_manifest(&config.output_dir)?;

    match format {
        OutputFormat::Json => print_json(&built),
        _ => eprintln!(
            "Wrote {} symbols to {}",
            built.len(),
            manifest::manifest_path(&config.output_dir).display()
        ),
    }
    Ok(())
}
