//! Hash command - print digest records for a directory

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::args::HashArgs;
use crate::config::AppConfig;

pub async fn execute(args: HashArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let reputation = super::resolve_reputation(args.scan.reputation.as_deref(), &config);
    let records = super::scan(&args.scan, &config, reputation).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&records).context("Failed to serialize records")?;
        println!("{}", json);
        return Ok(());
    }

    if records.is_empty() {
        println!("No matching files found.");
        return Ok(());
    }

    for record in &records {
        println!("{}", record.name());
        println!("  md5:        {}", record.md5());
        println!("  sha1:       {}", record.sha1());
        println!(
            "  reputation: {} ({})",
            record.reputation(),
            record.reputation().score()
        );
        println!("  comment:    {}", record.comment());
    }
    println!();
    println!("{} file(s) hashed", records.len());

    Ok(())
}
