//! Send command - submit file reputations to ePO in chunks

use anyhow::{Context, Result};
use epo_reputation_adapters::epo::{EpoClient, StubEpoApi};
use epo_reputation_domain::usecases::{SubmitReputations, SubmitState};
use epo_reputation_domain::{DigestRecord, EpoApi};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::args::SendArgs;
use crate::config::AppConfig;

pub async fn execute(args: SendArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = AppConfig::load(config_path.as_deref())?;

    if let Some(url) = args.url.clone() {
        config.epo.url = url;
    }
    if let Some(username) = args.username.clone() {
        config.epo.username = username;
    }
    if args.verify_tls {
        config.epo.verify_tls = true;
    }
    let chunk_size = args.chunk_size.unwrap_or(config.epo.hashes_per_request);

    let reputation = super::resolve_reputation(args.scan.reputation.as_deref(), &config);
    let records = super::scan(&args.scan, &config, reputation).await?;
    if records.is_empty() {
        println!("No matching files found; nothing to send.");
        return Ok(());
    }

    tracing::info!(
        dry_run = args.dry_run,
        records = records.len(),
        reputation = %reputation,
        chunk_size,
        url = %config.epo.url,
        "Starting reputation submission"
    );

    if args.dry_run {
        let stub = StubEpoApi::accepting();
        submit(&stub, &records, chunk_size).await?;
        println!(
            "[DRY RUN] {} request(s) would have been sent",
            stub.calls().len()
        );
        return Ok(());
    }

    let client_config = config
        .epo
        .client_config()
        .context("Invalid ePO connection settings")?;
    let client = EpoClient::new(client_config).context("Failed to create ePO client")?;

    submit(&client, &records, chunk_size).await
}

async fn submit<A: EpoApi>(api: A, records: &[DigestRecord], chunk_size: usize) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current chunk");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let usecase = SubmitReputations::new(api, chunk_size);
    let result = usecase
        .submit_cancellable(records, &cancel, |state| match state {
            SubmitState::TokenPending => tracing::info!("Requesting security token"),
            SubmitState::Submitting { offset, total, .. } => {
                tracing::info!("Sending hashes {} of {}", offset, total)
            }
            SubmitState::Failed { message, .. } => tracing::error!(%message, "Submission failed"),
            _ => {}
        })
        .await;

    interrupt.abort();

    let report = result.context("Reputation submission failed")?;

    if !report.all_accepted() {
        tracing::warn!("Server reported that some reputations were not stored");
    }

    println!(
        "Submitted {} hash(es) in {} request(s)",
        report.records_sent, report.chunk_count
    );

    Ok(())
}
