//! Export command - write digest records to a CSV file

use anyhow::{Context, Result};
use epo_reputation_adapters::export::{default_file_name, export_csv};
use epo_reputation_domain::{Clock, SystemClock};
use std::path::PathBuf;

use crate::args::ExportArgs;
use crate::config::AppConfig;

pub async fn execute(args: ExportArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let reputation = super::resolve_reputation(args.scan.reputation.as_deref(), &config);
    let records = super::scan(&args.scan, &config, reputation).await?;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(default_file_name(SystemClock.now().date())));

    export_csv(&path, &records)
        .with_context(|| format!("Failed to write export: {}", path.display()))?;

    println!("Exported {} record(s) to {}", records.len(), path.display());

    Ok(())
}
