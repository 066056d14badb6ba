use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use tracing::info;

use anchor_crypto::{canonical_string, fingerprint, SigningKey};
use anchor_ledger::{InMemoryLedger, LedgerClient, LedgerGateway};
use anchor_queue::InMemoryQueue;
use anchor_server::AnchorServer;
use anchor_service::AnchorNode;
use anchor_store::InMemoryDocumentStore;

use crate::cli::*;
use crate::config::{signing_key_from_env, NodeConfig};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Fingerprint(args) => cmd_fingerprint(args, &cli.format),
        Command::Keygen => cmd_keygen(&cli.format),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.server.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind}"))?;
    }
    let signer = signing_key_from_env()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config, signer))
}

async fn serve(config: NodeConfig, signer: SigningKey) -> anyhow::Result<()> {
    let ledger: Arc<dyn LedgerClient> = Arc::new(InMemoryLedger::new(config.ledger.chain_id));
    let gateway = LedgerGateway::connect(ledger, signer, config.ledger.gateway_config()).await?;
    let node = Arc::new(
        AnchorNode::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(InMemoryQueue::new(config.queue.queue_config())),
            Arc::new(gateway),
            config.queue.topic.clone(),
        )
        .with_worker_config(config.worker.clone())
        .with_observer_config(config.observer.clone())
        .with_reconcile_config(config.reconcile.clone()),
    );

    let tasks = node.spawn();
    println!(
        "{} anchor node on {} (submitter {})",
        "✓".green().bold(),
        config.server.bind_addr.to_string().bold(),
        node.gateway().submitter().to_string().cyan(),
    );

    let server = AnchorServer::new(config.server.clone(), node.clone());
    let served = server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await;
    tasks.shutdown().await;
    served?;
    Ok(())
}

fn cmd_fingerprint(args: FingerprintArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let canonical = canonical_string(&args.lot, &args.status, &args.updated_at);
    let digest = fingerprint(&args.lot, &args.status, &args.updated_at);
    match format {
        OutputFormat::Text => {
            println!("  Canonical: {}", canonical.dimmed());
            println!("Fingerprint: {}", digest.to_hex().yellow().bold());
        }
        OutputFormat::Json => println!(
            "{}",
            json!({ "canonical": canonical, "fingerprint": digest })
        ),
    }
    Ok(())
}

fn cmd_keygen(format: &OutputFormat) -> anyhow::Result<()> {
    let key = SigningKey::generate();
    let submitter = key.submitter_id();
    match format {
        OutputFormat::Text => {
            println!("{} Generated submitter key", "✓".green().bold());
            println!("  Submitter: {}", submitter.to_string().cyan());
            println!("  Key: {}", key.to_hex().yellow());
            println!("\nExport it as {} to reuse this identity.", crate::config::SIGNING_KEY_ENV.bold());
        }
        OutputFormat::Json => println!(
            "{}",
            json!({ "submitter": submitter, "signing_key": key.to_hex() })
        ),
    }
    Ok(())
}
