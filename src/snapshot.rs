use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};
use tx_parser::{AddressConversionError, AddressConverter, WalletContext};
use wallet_core::{GenesisRecord, HistoryPage, IndexerClient, IndexerError, TokenStatsRecord, Tx, Utxo};

/// Indexer state captured to a JSON file, keyed the way the live indexer is queried
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub wallet: WalletContext,
    #[serde(default)]
    pub utxos: HashMap<String, Vec<Utxo>>,
    /// Newest first, as the indexer pages them
    #[serde(default)]
    pub history: HashMap<String, Vec<Tx>>,
    #[serde(default)]
    pub tokens: HashMap<String, GenesisRecord>,
    #[serde(default)]
    pub token_stats: BTreeMap<String, TokenStatsRecord>,
    /// hash160 -> cash address
    #[serde(default)]
    pub address_book: HashMap<String, String>,
}

impl Snapshot {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("parsing snapshot {}", path.display()))?;

        info!(
            "Loaded snapshot for wallet '{}': {} addresses with utxos, {} with history, {} tokens",
            snapshot.wallet.name,
            snapshot.utxos.len(),
            snapshot.history.len(),
            snapshot.tokens.len()
        );
        Ok(snapshot)
    }

    /// Split into the wallet and the two collaborators served from the file
    pub fn into_parts(self) -> (WalletContext, SnapshotIndexer, AddressBook) {
        let indexer = SnapshotIndexer {
            utxos: self.utxos,
            history: self.history,
            tokens: self.tokens,
            token_stats: self.token_stats,
        };
        let mut entries: HashMap<String, String> = self
            .address_book
            .into_iter()
            .map(|(hash160, address)| (hash160.to_lowercase(), address))
            .collect();
        // wallet paths always resolve, even when the book omits them
        for path in &self.wallet.paths {
            entries
                .entry(path.hash160.to_lowercase())
                .or_insert_with(|| path.cash_address.clone());
        }
        (self.wallet, indexer, AddressBook { entries })
    }
}

/// Offline indexer answering from a snapshot
#[derive(Debug, Clone, Default)]
pub struct SnapshotIndexer {
    utxos: HashMap<String, Vec<Utxo>>,
    history: HashMap<String, Vec<Tx>>,
    tokens: HashMap<String, GenesisRecord>,
    token_stats: BTreeMap<String, TokenStatsRecord>,
}

impl SnapshotIndexer {
    pub fn token_ids_with_stats(&self) -> Vec<String> {
        self.token_stats.keys().cloned().collect()
    }
}

#[async_trait]
impl IndexerClient for SnapshotIndexer {
    async fn fetch_utxos(&self, address: &str) -> std::result::Result<Vec<Utxo>, IndexerError> {
        Ok(self.utxos.get(address).cloned().unwrap_or_default())
    }

    async fn fetch_token_genesis(&self, token_id: &str) -> std::result::Result<GenesisRecord, IndexerError> {
        self.tokens
            .get(token_id)
            .cloned()
            .ok_or_else(|| IndexerError::UnknownToken(token_id.to_string()))
    }

    async fn fetch_token_stats(&self, token_id: &str) -> std::result::Result<TokenStatsRecord, IndexerError> {
        self.token_stats
            .get(token_id)
            .cloned()
            .ok_or_else(|| IndexerError::UnknownToken(token_id.to_string()))
    }

    async fn fetch_address_history_page(
        &self,
        address: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> std::result::Result<HistoryPage, IndexerError> {
        let txs = self.history.get(address).map(Vec::as_slice).unwrap_or_default();

        // page tokens are offsets into the stored list
        let start = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| IndexerError::Malformed(format!("bad page token '{}'", token)))?,
            None => 0,
        };
        let start = start.min(txs.len());
        let end = start.saturating_add(page_size as usize).min(txs.len());
        debug!("Serving history of {} [{}..{})", address, start, end);

        Ok(HistoryPage {
            txs: txs[start..end].to_vec(),
            next_page_token: (end < txs.len()).then(|| end.to_string()),
        })
    }
}

/// hash160 to cash address lookups backed by the snapshot's address book
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    entries: HashMap<String, String>,
}

impl AddressConverter for AddressBook {
    fn hash160_to_address(&self, hash160: &str) -> std::result::Result<String, AddressConversionError> {
        let key = hash160.to_lowercase();
        if key.len() != 40 || !key.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AddressConversionError {
                hash160: hash160.to_string(),
                reason: "expected 20 bytes of hex".to_string(),
            });
        }
        self.entries.get(&key).cloned().ok_or_else(|| AddressConversionError {
            hash160: hash160.to_string(),
            reason: "not present in the address book".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HASH: &str = "4e532257c01b310b3b5c1fd947c79a72addf8523";
    const OTHER: &str = "a5417349420ec53b27522fed1a63b1672c0f28ff";
    const ADDRESS: &str = "ecash:qp89xgjhcqdnzzemts0aj378nfe2mhu9yvxj9nhgg6";

    fn tx(txid: &str) -> serde_json::Value {
        json!({
            "txid": txid,
            "inputs": [],
            "outputs": [],
            "timeFirstSeen": 0
        })
    }

    fn snapshot() -> Snapshot {
        serde_json::from_value(json!({
            "wallet": {
                "name": "Alice",
                "paths": [{ "path": 1899, "hash160": HASH, "cashAddress": ADDRESS }]
            },
            "history": { ADDRESS: [tx("t1"), tx("t2"), tx("t3")] },
            "tokens": {
                "bdb3": { "tokenTicker": "BUX", "decimals": 4 }
            },
            "addressBook": { OTHER: "ecash:qzj5zu6fggf7wh5cxu82e4dkpm7vwhg28g0zmxl9d5" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_history_pages_by_offset() {
        let (_, indexer, _) = snapshot().into_parts();

        let first = indexer.fetch_address_history_page(ADDRESS, None, 2).await.unwrap();
        assert_eq!(first.txs.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("2"));

        let second = indexer
            .fetch_address_history_page(ADDRESS, Some("2"), 2)
            .await
            .unwrap();
        assert_eq!(second.txs[0].txid, "t3");
        assert!(second.next_page_token.is_none());

        assert!(matches!(
            indexer.fetch_address_history_page(ADDRESS, Some("x"), 2).await,
            Err(IndexerError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_genesis_lookup() {
        let (_, indexer, _) = snapshot().into_parts();
        assert_eq!(indexer.fetch_token_genesis("bdb3").await.unwrap().decimals, 4);
        assert!(matches!(
            indexer.fetch_token_genesis("nope").await,
            Err(IndexerError::UnknownToken(_))
        ));
        assert!(indexer.fetch_utxos(ADDRESS).await.unwrap().is_empty());
    }

    #[test]
    fn test_address_book_includes_wallet_paths() {
        let (_, _, book) = snapshot().into_parts();
        assert_eq!(book.hash160_to_address(&HASH.to_uppercase()).unwrap(), ADDRESS);
        assert!(book.hash160_to_address(OTHER).unwrap().starts_with("ecash:qzj5"));
        assert!(book.hash160_to_address("1234").is_err());
        assert!(book
            .hash160_to_address("0000000000000000000000000000000000000000")
            .is_err());
    }
}
