use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::amount::de_i64_lenient;
use crate::tx::{BlockMetadata, SlpTxData, Tx};
use crate::types::{GenesisRecord, Utxo};
use crate::{IndexerError, RawAmount};

/// One page of an address's transaction history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub txs: Vec<Tx>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSupplyFigures {
    pub total_minted: RawAmount,
    pub total_burned: RawAmount,
}

/// Token metadata plus current supply figures, in raw units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatsRecord {
    pub slp_tx_data: SlpTxData,
    pub token_stats: TokenSupplyFigures,
    pub initial_token_quantity: RawAmount,
    #[serde(default)]
    pub contains_baton: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockMetadata>,
    #[serde(default, deserialize_with = "de_i64_lenient")]
    pub time_first_seen: i64,
}

/// Query interface of the blockchain indexer.
///
/// Calls are independent; callers may issue them concurrently. Retry
/// policy, if any, lives in the implementation.
#[async_trait]
pub trait IndexerClient: Send + Sync {
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, IndexerError>;

    async fn fetch_token_genesis(&self, token_id: &str) -> Result<GenesisRecord, IndexerError>;

    async fn fetch_token_stats(&self, token_id: &str) -> Result<TokenStatsRecord, IndexerError>;

    async fn fetch_address_history_page(
        &self,
        address: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<HistoryPage, IndexerError>;
}
