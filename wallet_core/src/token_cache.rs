use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::indexer::IndexerClient;
use crate::quantity::{scale_quantity, ScaledQuantity};
use crate::types::{TokenGenesisInfo, Utxo};
use crate::{RawAmount, Result, WalletError};

/// Genesis info keyed by token id. Owned by the caller and passed by value;
/// reconciliation returns a new map instead of mutating the caller's.
pub type TokenInfoCache = HashMap<String, TokenGenesisInfo>;

/// Summed raw quantity for one token id, not yet scaled by decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreliminaryTokenBalance {
    pub token_id: String,
    pub raw_quantity: RawAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalTokenBalance {
    pub token_id: String,
    pub raw_quantity: RawAmount,
    /// `raw_quantity / 10^decimals`
    pub quantity: ScaledQuantity,
    pub genesis_info: TokenGenesisInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedTokens {
    pub final_token_array: Vec<FinalTokenBalance>,
    pub updated_token_info_by_id: TokenInfoCache,
    pub new_tokens_to_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledTokenInfo {
    pub token_info_by_id: TokenInfoCache,
    /// Number of genesis fetches issued (one per distinct uncached token id)
    pub fetched: usize,
}

impl ReconciledTokenInfo {
    pub fn has_new_tokens(&self) -> bool {
        self.fetched > 0
    }
}

/// Sum token amounts per token id, in first-seen order
pub fn get_preliminary_tokens_array(token_utxos: &[Utxo]) -> Result<Vec<PreliminaryTokenBalance>> {
    let mut balances: Vec<PreliminaryTokenBalance> = Vec::new();
    let mut index_by_token: HashMap<&str, usize> = HashMap::new();

    for utxo in token_utxos {
        let (Some(meta), Some(token)) = (&utxo.slp_meta, &utxo.slp_token) else {
            continue;
        };
        if meta.token_id.is_empty() {
            return Err(WalletError::MissingIdentifier(format!(
                "token utxo {}:{} has an empty token id",
                utxo.outpoint.txid, utxo.outpoint.out_idx
            )));
        }

        match index_by_token.get(meta.token_id.as_str()) {
            Some(&idx) => balances[idx].raw_quantity += &token.amount,
            None => {
                index_by_token.insert(meta.token_id.as_str(), balances.len());
                balances.push(PreliminaryTokenBalance {
                    token_id: meta.token_id.clone(),
                    raw_quantity: token.amount.clone(),
                });
            }
        }
    }

    debug!(
        "Aggregated {} token utxos into {} token balances",
        token_utxos.len(),
        balances.len()
    );
    Ok(balances)
}

/// Make sure every token id has genesis info, fetching only cache misses.
///
/// One fetch per distinct uncached token id, all issued concurrently and
/// joined before returning. A failed fetch is recorded as
/// `success: false` and does not affect the other tokens.
pub async fn reconcile_token_info<I>(
    indexer: &I,
    token_ids: &[String],
    cached: &TokenInfoCache,
) -> Result<ReconciledTokenInfo>
where
    I: IndexerClient + ?Sized,
{
    let mut seen = HashSet::new();
    let mut uncached = Vec::new();
    for token_id in token_ids {
        if token_id.is_empty() {
            return Err(WalletError::MissingIdentifier(
                "empty token id passed to token info reconciliation".to_string(),
            ));
        }
        if !cached.contains_key(token_id) && seen.insert(token_id.as_str()) {
            uncached.push(token_id.as_str());
        }
    }

    debug!(
        "Token info: {} cached, {} need fetching",
        token_ids.len() - uncached.len(),
        uncached.len()
    );

    let mut token_info_by_id = cached.clone();
    if uncached.is_empty() {
        return Ok(ReconciledTokenInfo {
            token_info_by_id,
            fetched: 0,
        });
    }

    let fetches = uncached
        .iter()
        .map(|token_id| fetch_genesis_info(indexer, token_id));
    let fetched_infos = join_all(fetches).await;

    let failures = fetched_infos.iter().filter(|info| !info.success).count();
    for info in fetched_infos {
        token_info_by_id.insert(info.token_id.clone(), info);
    }

    info!(
        "Fetched genesis info for {} tokens ({} failed)",
        uncached.len(),
        failures
    );

    Ok(ReconciledTokenInfo {
        token_info_by_id,
        fetched: uncached.len(),
    })
}

async fn fetch_genesis_info<I>(indexer: &I, token_id: &str) -> TokenGenesisInfo
where
    I: IndexerClient + ?Sized,
{
    match indexer.fetch_token_genesis(token_id).await {
        Ok(record) => TokenGenesisInfo::from_record(token_id, record).unwrap_or_else(|e| {
            warn!("Rejecting genesis info for token {}: {}", token_id, e);
            TokenGenesisInfo::failed(token_id)
        }),
        Err(e) => {
            warn!("Failed to fetch genesis info for token {}: {}", token_id, e);
            TokenGenesisInfo::failed(token_id)
        }
    }
}

/// Join preliminary balances with genesis info, fetching whatever the
/// cache lacks, and scale each balance by the token's decimals
pub async fn finalize_tokens_array<I>(
    indexer: &I,
    preliminary_tokens: Vec<PreliminaryTokenBalance>,
    cached_token_info_by_id: Option<&TokenInfoCache>,
) -> Result<FinalizedTokens>
where
    I: IndexerClient + ?Sized,
{
    let empty = TokenInfoCache::new();
    let cached = cached_token_info_by_id.unwrap_or(&empty);

    let token_ids: Vec<String> = preliminary_tokens
        .iter()
        .map(|token| token.token_id.clone())
        .collect();
    let reconciled = reconcile_token_info(indexer, &token_ids, cached).await?;
    let new_tokens_to_cache = reconciled.has_new_tokens();
    let updated_token_info_by_id = reconciled.token_info_by_id;

    let mut final_token_array = Vec::with_capacity(preliminary_tokens.len());
    for token in preliminary_tokens {
        let genesis_info = updated_token_info_by_id
            .get(&token.token_id)
            .cloned()
            .ok_or_else(|| WalletError::UnknownTokenReference(token.token_id.clone()))?;
        let quantity = scale_quantity(&token.raw_quantity, genesis_info.decimals)?;

        final_token_array.push(FinalTokenBalance {
            token_id: token.token_id,
            raw_quantity: token.raw_quantity,
            quantity,
            genesis_info,
        });
    }

    Ok(FinalizedTokens {
        final_token_array,
        updated_token_info_by_id,
        new_tokens_to_cache,
    })
}
