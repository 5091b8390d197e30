use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indexer::IndexerClient;
use crate::quantity::{scale_quantity, ScaledQuantity};
use crate::types::TokenGenesisInfo;
use crate::{Result, WalletError};

/// Supply overview for one token, all figures scaled by its decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub token_id: String,
    pub ticker: String,
    pub name: String,
    pub document_uri: String,
    pub document_hash: String,
    pub decimals: u8,
    pub initial_qty: ScaledQuantity,
    pub total_minted: ScaledQuantity,
    pub total_burned: ScaledQuantity,
    pub circulating_supply: ScaledQuantity,
    pub contains_baton: bool,
}

/// Fetch metadata and supply figures for a token in a single indexer call.
/// An unknown token id is propagated as an error.
pub async fn get_token_stats<I>(indexer: &I, token_id: &str) -> Result<TokenStats>
where
    I: IndexerClient + ?Sized,
{
    if token_id.is_empty() {
        return Err(WalletError::MissingIdentifier(
            "token stats requested for an empty token id".to_string(),
        ));
    }

    let record = indexer.fetch_token_stats(token_id).await?;
    let genesis_record = record.slp_tx_data.genesis_info.ok_or_else(|| {
        WalletError::InvalidQuantity(format!("token {} stats carry no genesis info", token_id))
    })?;
    let genesis = TokenGenesisInfo::from_record(token_id, genesis_record)?;
    let decimals = genesis.decimals;

    let supply = &record.token_stats;
    let circulating = supply
        .total_minted
        .checked_sub(&supply.total_burned)
        .ok_or_else(|| {
            WalletError::InvalidQuantity(format!(
                "token {} reports more burned ({}) than minted ({})",
                token_id, supply.total_burned, supply.total_minted
            ))
        })?;

    debug!(
        "Token {} ({}): minted {}, burned {}",
        token_id, genesis.token_ticker, supply.total_minted, supply.total_burned
    );

    Ok(TokenStats {
        token_id: token_id.to_string(),
        ticker: genesis.token_ticker,
        name: genesis.token_name,
        document_uri: genesis.token_document_url,
        document_hash: genesis.token_document_hash,
        decimals,
        initial_qty: scale_quantity(&record.initial_token_quantity, decimals)?,
        total_minted: scale_quantity(&supply.total_minted, decimals)?,
        total_burned: scale_quantity(&supply.total_burned, decimals)?,
        circulating_supply: scale_quantity(&circulating, decimals)?,
        contains_baton: record.contains_baton,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{HistoryPage, TokenStatsRecord};
    use crate::types::{GenesisRecord, Utxo};
    use crate::IndexerError;
    use async_trait::async_trait;
    use serde_json::json;

    struct StatsIndexer {
        record: TokenStatsRecord,
    }

    #[async_trait]
    impl IndexerClient for StatsIndexer {
        async fn fetch_utxos(&self, _address: &str) -> std::result::Result<Vec<Utxo>, IndexerError> {
            Ok(Vec::new())
        }

        async fn fetch_token_genesis(
            &self,
            token_id: &str,
        ) -> std::result::Result<GenesisRecord, IndexerError> {
            Err(IndexerError::UnknownToken(token_id.to_string()))
        }

        async fn fetch_token_stats(
            &self,
            token_id: &str,
        ) -> std::result::Result<TokenStatsRecord, IndexerError> {
            if token_id == self.record.slp_tx_data.slp_meta.token_id {
                Ok(self.record.clone())
            } else {
                Err(IndexerError::UnknownToken(token_id.to_string()))
            }
        }

        async fn fetch_address_history_page(
            &self,
            _address: &str,
            _page_token: Option<&str>,
            _page_size: u32,
        ) -> std::result::Result<HistoryPage, IndexerError> {
            Ok(HistoryPage::default())
        }
    }

    const TOKEN_ID: &str = "bb8e9f685a06a2071d82f757ce19201b4c8e5e96fbe186960a3d65aec83eab20";

    fn indexer() -> StatsIndexer {
        let record: TokenStatsRecord = serde_json::from_value(json!({
            "slpTxData": {
                "slpMeta": {
                    "tokenType": "FUNGIBLE",
                    "txType": "GENESIS",
                    "tokenId": TOKEN_ID
                },
                "genesisInfo": {
                    "tokenTicker": "XCT",
                    "tokenName": "Cashtab Prod Optimization",
                    "tokenDocumentUrl": "https://cashtab.com/",
                    "tokenDocumentHash": "",
                    "decimals": 9
                }
            },
            "tokenStats": {
                "totalMinted": "21000000000000000",
                "totalBurned": "1000000000"
            },
            "initialTokenQuantity": "21000000000000000",
            "containsBaton": false,
            "block": { "height": 758409, "hash": "00", "timestamp": "1662611972" },
            "timeFirstSeen": "1662611652"
        }))
        .unwrap();
        StatsIndexer { record }
    }

    #[tokio::test]
    async fn test_get_token_stats_scales_supply() {
        let stats = get_token_stats(&indexer(), TOKEN_ID).await.unwrap();

        assert_eq!(stats.ticker, "XCT");
        assert_eq!(stats.decimals, 9);
        assert_eq!(stats.initial_qty, "21000000");
        assert_eq!(stats.total_minted, "21000000");
        assert_eq!(stats.total_burned, "1");
        assert_eq!(stats.circulating_supply, "20999999");
        assert!(!stats.contains_baton);
    }

    #[tokio::test]
    async fn test_unknown_token_propagates() {
        let result = get_token_stats(&indexer(), "ff").await;
        assert!(matches!(
            result,
            Err(WalletError::Indexer(IndexerError::UnknownToken(_)))
        ));
    }

    #[tokio::test]
    async fn test_empty_token_id_is_rejected() {
        let result = get_token_stats(&indexer(), "").await;
        assert!(matches!(result, Err(WalletError::MissingIdentifier(_))));
    }
}
