use serde::{Deserialize, Serialize};

use crate::amount::de_i64_lenient;
use crate::types::{GenesisRecord, OutPoint, SlpMeta, SlpToken};
use crate::RawAmount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    pub prev_out: OutPoint,
    /// Hex scriptSig
    #[serde(default)]
    pub input_script: String,
    /// Hex script of the output being spent; absent for coinbase inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_script: Option<String>,
    pub value: RawAmount,
    #[serde(default)]
    pub sequence_no: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slp_token: Option<SlpToken>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    pub value: RawAmount,
    pub output_script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slp_token: Option<SlpToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent_by: Option<OutPoint>,
}

/// Token data the indexer validated for this transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlpTxData {
    pub slp_meta: SlpMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_info: Option<GenesisRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    pub height: i32,
    pub hash: String,
    #[serde(default, deserialize_with = "de_i64_lenient")]
    pub timestamp: i64,
}

/// Transaction record as returned by the indexer's history endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tx {
    pub txid: String,
    #[serde(default)]
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    #[serde(default)]
    pub lock_time: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slp_tx_data: Option<SlpTxData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockMetadata>,
    #[serde(default, deserialize_with = "de_i64_lenient")]
    pub time_first_seen: i64,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub is_coinbase: bool,
}

impl Tx {
    /// Height of the confirming block; `None` while unconfirmed.
    /// A zero or negative height is the indexer's unconfirmed sentinel.
    pub fn confirmed_height(&self) -> Option<i32> {
        self.block
            .as_ref()
            .map(|block| block.height)
            .filter(|height| *height > 0)
    }

    /// Token id referenced by the token envelope, if any
    pub fn token_id(&self) -> Option<&str> {
        self.slp_tx_data
            .as_ref()
            .map(|data| data.slp_meta.token_id.as_str())
    }
}
