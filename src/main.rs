use anyhow::Result;
use config_manager::ConfigManager;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use tx_parser::{EciesDecryptor, MessageDecryptor, NoDecryption};
use wallet_orchestrator::{OrchestratorSettings, WalletOrchestrator};

mod snapshot;

use snapshot::Snapshot;

#[tokio::main]
async fn main() -> Result<()> {
    let manager = ConfigManager::new()?;
    let config = manager.config();

    let fallback_filter = if config.system.debug_mode {
        "debug".to_string()
    } else {
        config.logging.filter.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // xec_wallet_tracker [snapshot.json]
    let snapshot_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.indexer.snapshot_path.clone());
    info!("Reading indexer snapshot from {}", snapshot_path);

    let (wallet, indexer, address_book) = Snapshot::from_path(&snapshot_path)?.into_parts();
    let stats_token_ids = indexer.token_ids_with_stats();

    let settings = OrchestratorSettings::from_config(config)?;
    let decryptor: Arc<dyn MessageDecryptor> = if config.wallet.decrypt_messages {
        Arc::new(EciesDecryptor)
    } else {
        info!("Encrypted message decryption disabled");
        Arc::new(NoDecryption)
    };
    let orchestrator = WalletOrchestrator::new(
        Arc::new(indexer),
        Arc::new(address_book),
        decryptor,
        settings,
    );

    let balance = orchestrator.balance_view(&wallet).await?;
    let history = orchestrator.history_view(&wallet).await?;
    if history.skipped > 0 {
        warn!("{} transactions could not be interpreted", history.skipped);
    }

    let mut token_stats = Vec::with_capacity(stats_token_ids.len());
    for token_id in &stats_token_ids {
        match orchestrator.token_stats(token_id).await {
            Ok(stats) => token_stats.push(stats),
            Err(e) => warn!("Token stats unavailable for {}: {}", token_id, e),
        }
    }

    let report = json!({
        "wallet": wallet.name,
        "balance": balance,
        "history": history,
        "tokenStats": token_stats,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!(
        "Done: {} history entries, {} cached tokens",
        history.entries.len(),
        orchestrator.token_cache().await.len()
    );
    Ok(())
}
