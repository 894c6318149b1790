//! Subcommand implementations

pub mod config;
pub mod doctor;
pub mod export;
pub mod hash;
pub mod send;

use anyhow::{Context, Result};
use epo_reputation_adapters::scan::FsDigestSource;
use epo_reputation_domain::{
    Clock, DigestRecord, DigestSource, FileTypeFilter, Reputation, SystemClock,
    submission_comment,
};

use crate::args::ScanArgs;
use crate::config::AppConfig;

/// Local login name stamped into record comments
pub(crate) fn local_user() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

/// Reputation from the command line, or the configured default
pub(crate) fn resolve_reputation(choice: Option<&str>, config: &AppConfig) -> Reputation {
    let default = config.epo.default_reputation();
    choice
        .map(|choice| Reputation::resolve(choice, default))
        .unwrap_or(default)
}

/// Walk the requested directory and hash every matching file, stamping `reputation`
pub(crate) async fn scan(
    args: &ScanArgs,
    config: &AppConfig,
    reputation: Reputation,
) -> Result<Vec<DigestRecord>> {
    let file_types = args
        .file_types
        .as_deref()
        .unwrap_or(&config.scan.file_types);
    let filter: FileTypeFilter = file_types.parse().unwrap_or_else(|never| match never {});
    let comment = submission_comment(SystemClock.now(), &local_user());

    tracing::info!(
        dir = %args.dir.display(),
        file_types = %file_types,
        reputation = %reputation,
        "Hashing files"
    );

    let source = FsDigestSource::new(&args.dir, filter)
        .context("Failed to initialize directory scan")?;

    source
        .collect(reputation, &comment)
        .await
        .with_context(|| format!("Failed to hash files in {}", args.dir.display()))
}
