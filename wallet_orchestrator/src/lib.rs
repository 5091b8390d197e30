use chrono::{DateTime, Utc};
use config_manager::SystemConfig;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tx_parser::{AddressConverter, MessageDecryptor, ParsedTx, TxInterpreter, WalletContext};
use wallet_core::{
    finalize_slp_utxos, finalize_tokens_array, get_preliminary_tokens_array, get_token_stats,
    merge_tx_history, organize_utxos_by_type, reconcile_token_info, scale_quantity,
    AddressHistory, FinalTokenBalance, FinalizedSlpUtxo, IndexerClient, IndexerError, RawAmount,
    TokenInfoCache, TokenStats, Tx, Utxo, WalletError,
};

#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    #[error("Wallet pipeline error: {0}")]
    Wallet(String),
    #[error("Indexer error: {0}")]
    Indexer(String),
    #[error("Transaction parser error: {0}")]
    TxParser(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid wallet: {0}")]
    InvalidWallet(String),
}

impl From<WalletError> for OrchestratorError {
    fn from(err: WalletError) -> Self {
        OrchestratorError::Wallet(err.to_string())
    }
}

impl From<IndexerError> for OrchestratorError {
    fn from(err: IndexerError) -> Self {
        OrchestratorError::Indexer(err.to_string())
    }
}

impl From<tx_parser::TxParseError> for OrchestratorError {
    fn from(err: tx_parser::TxParseError) -> Self {
        OrchestratorError::TxParser(err.to_string())
    }
}

impl From<config_manager::ConfigurationError> for OrchestratorError {
    fn from(err: config_manager::ConfigurationError) -> Self {
        OrchestratorError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Knobs the wallet flows read from the system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    pub tx_history_count: usize,
    pub history_page_size: u32,
    pub max_history_pages: u32,
    pub xec_decimals: u8,
}

impl OrchestratorSettings {
    pub fn from_config(config: &SystemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tx_history_count: config.wallet.tx_history_count,
            history_page_size: config.indexer.history_page_size,
            max_history_pages: config.indexer.max_history_pages,
            xec_decimals: config.wallet.xec_decimals,
        })
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            tx_history_count: 10,
            history_page_size: 25,
            max_history_pages: 4,
            xec_decimals: tx_parser::DEFAULT_XEC_DECIMALS,
        }
    }
}

/// Spendable XEC and token holdings of a wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalanceView {
    pub xec_balance: Decimal,
    pub xec_balance_sats: RawAmount,
    pub tokens: Vec<FinalTokenBalance>,
    pub slp_utxos: Vec<FinalizedSlpUtxo>,
    pub non_slp_utxos: Vec<Utxo>,
}

/// One interpreted transaction of the history view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub txid: String,
    /// Wallet address the record was fetched under
    pub address: String,
    pub block_height: Option<i32>,
    pub block_time: Option<DateTime<Utc>>,
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub parsed: ParsedTx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletHistoryView {
    pub entries: Vec<HistoryEntry>,
    /// Transactions dropped because they could not be interpreted
    pub skipped: usize,
}

/// Runs the balance and history flows for wallets against one indexer.
///
/// Holds the token info cache between runs. Every flow works on a snapshot
/// and commits successfully fetched genesis info back once it completes.
pub struct WalletOrchestrator {
    indexer: Arc<dyn IndexerClient>,
    converter: Arc<dyn AddressConverter>,
    decryptor: Arc<dyn MessageDecryptor>,
    settings: OrchestratorSettings,
    token_cache: Arc<Mutex<TokenInfoCache>>,
}

impl WalletOrchestrator {
    pub fn new(
        indexer: Arc<dyn IndexerClient>,
        converter: Arc<dyn AddressConverter>,
        decryptor: Arc<dyn MessageDecryptor>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            indexer,
            converter,
            decryptor,
            settings,
            token_cache: Arc::new(Mutex::new(TokenInfoCache::new())),
        }
    }

    /// Start from a previously persisted token info cache
    pub fn with_token_cache(self, cache: TokenInfoCache) -> Self {
        Self {
            token_cache: Arc::new(Mutex::new(cache)),
            ..self
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Copy of the current token info cache
    pub async fn token_cache(&self) -> TokenInfoCache {
        self.token_cache.lock().await.clone()
    }

    async fn commit_token_info(&self, token_info: &TokenInfoCache) {
        let mut cache = self.token_cache.lock().await;
        let before = cache.len();
        for (token_id, info) in token_info {
            // Failed lookups stay out so the next run retries them
            if info.success && !cache.contains_key(token_id) {
                cache.insert(token_id.clone(), info.clone());
            }
        }
        debug!("Token info cache grew from {} to {} entries", before, cache.len());
    }

    fn wallet_addresses(wallet: &WalletContext) -> Result<Vec<String>> {
        let addresses = wallet.addresses();
        if addresses.is_empty() {
            return Err(OrchestratorError::InvalidWallet(format!(
                "wallet '{}' has no paths",
                wallet.name
            )));
        }
        Ok(addresses)
    }

    /// UTXO set of every wallet address, classified and finalized
    pub async fn balance_view(&self, wallet: &WalletContext) -> Result<WalletBalanceView> {
        let addresses = Self::wallet_addresses(wallet)?;
        info!(
            "Building balance view for wallet '{}' ({} addresses)",
            wallet.name,
            addresses.len()
        );

        let fetches = addresses
            .iter()
            .map(|address| self.indexer.fetch_utxos(address));
        let mut utxos = Vec::new();
        for result in join_all(fetches).await {
            utxos.extend(result?);
        }

        let organized = organize_utxos_by_type(utxos);
        let preliminary = get_preliminary_tokens_array(&organized.token_utxos)?;

        let cached = self.token_cache().await;
        let finalized = finalize_tokens_array(self.indexer.as_ref(), preliminary, Some(&cached)).await?;
        if finalized.new_tokens_to_cache {
            self.commit_token_info(&finalized.updated_token_info_by_id).await;
        }

        let slp_utxos = finalize_slp_utxos(organized.token_utxos, &finalized.updated_token_info_by_id)?;

        // A token held only through mint batons has nothing to show as a balance
        let (tokens, baton_only): (Vec<FinalTokenBalance>, Vec<FinalTokenBalance>) = finalized
            .final_token_array
            .into_iter()
            .partition(|token| !token.raw_quantity.is_zero());
        for token in &baton_only {
            debug!("Token {} is held only through mint batons", token.token_id);
        }

        let xec_balance_sats: RawAmount = organized.plain_utxos.iter().map(|utxo| &utxo.value).sum();
        let xec_balance = scale_quantity(&xec_balance_sats, self.settings.xec_decimals)?.to_decimal()?;

        info!(
            "Wallet '{}': {} XEC, {} token balances, {} token utxos",
            wallet.name,
            xec_balance,
            tokens.len(),
            slp_utxos.len()
        );

        Ok(WalletBalanceView {
            xec_balance,
            xec_balance_sats,
            tokens,
            slp_utxos,
            non_slp_utxos: organized.plain_utxos,
        })
    }

    /// Follow an address's history pages until exhausted or capped
    async fn fetch_address_history(&self, address: &str) -> std::result::Result<AddressHistory, IndexerError> {
        let mut txs: Vec<Tx> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self
                .indexer
                .fetch_address_history_page(address, page_token.as_deref(), self.settings.history_page_size)
                .await?;
            pages += 1;
            debug!("Page {} for {}: {} txs", pages, address, page.txs.len());
            txs.extend(page.txs);

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
            if pages >= self.settings.max_history_pages {
                debug!("Stopping history fetch for {} after {} pages", address, pages);
                break;
            }
        }

        Ok(AddressHistory {
            address: address.to_string(),
            txs,
        })
    }

    /// Most recent transactions across all wallet addresses, interpreted
    pub async fn history_view(&self, wallet: &WalletContext) -> Result<WalletHistoryView> {
        let addresses = Self::wallet_addresses(wallet)?;

        let fetches = addresses.iter().map(|address| async move {
            (address, self.fetch_address_history(address).await)
        });
        let mut histories = Vec::with_capacity(addresses.len());
        for (address, result) in join_all(fetches).await {
            match result {
                Ok(history) => histories.push(history),
                Err(e) => warn!("Skipping history of {}: {}", address, e),
            }
        }

        let records = merge_tx_history(histories, self.settings.tx_history_count);

        let token_ids: Vec<String> = records
            .iter()
            .filter_map(|record| record.tx.token_id())
            .map(str::to_string)
            .collect();
        let cached = self.token_cache().await;
        let reconciled = reconcile_token_info(self.indexer.as_ref(), &token_ids, &cached).await?;
        if reconciled.has_new_tokens() {
            self.commit_token_info(&reconciled.token_info_by_id).await;
        }

        let interpreter = TxInterpreter::new(
            self.converter.as_ref(),
            self.decryptor.as_ref(),
            wallet,
            &reconciled.token_info_by_id,
        )
        .with_xec_decimals(self.settings.xec_decimals);

        let mut entries = Vec::with_capacity(records.len());
        let mut skipped = 0usize;
        for record in records {
            match interpreter.parse_tx(&record.tx) {
                Ok(parsed) => entries.push(HistoryEntry {
                    block_height: record.block_height(),
                    block_time: record
                        .tx
                        .block
                        .as_ref()
                        .and_then(|block| DateTime::<Utc>::from_timestamp(block.timestamp, 0)),
                    first_seen: DateTime::<Utc>::from_timestamp(record.first_seen_time(), 0),
                    txid: record.tx.txid,
                    address: record.address,
                    parsed,
                }),
                Err(e) => {
                    warn!("Failed to parse transaction {}: {}", record.tx.txid, e);
                    skipped += 1;
                }
            }
        }

        debug!(
            "History for wallet '{}': {} entries, {} skipped",
            wallet.name,
            entries.len(),
            skipped
        );

        Ok(WalletHistoryView { entries, skipped })
    }

    /// Supply overview of a single token
    pub async fn token_stats(&self, token_id: &str) -> Result<TokenStats> {
        Ok(get_token_stats(self.indexer.as_ref(), token_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let mut config = SystemConfig::default();
        config.wallet.tx_history_count = 30;
        config.indexer.max_history_pages = 2;

        let settings = OrchestratorSettings::from_config(&config).unwrap();
        assert_eq!(settings.tx_history_count, 30);
        assert_eq!(settings.max_history_pages, 2);
        assert_eq!(settings.xec_decimals, 2);
    }

    #[test]
    fn test_settings_reject_invalid_config() {
        let mut config = SystemConfig::default();
        config.wallet.tx_history_count = 0;
        assert!(matches!(
            OrchestratorSettings::from_config(&config),
            Err(OrchestratorError::Config(_))
        ));
    }
}
