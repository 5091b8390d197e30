use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::quantity::MAX_TOKEN_DECIMALS;
use crate::{RawAmount, Result, WalletError};

/// Reference to a transaction output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    pub txid: String,
    pub out_idx: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Fungible,
    Nft1Group,
    Nft1Child,
    Unknown,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Fungible => "FUNGIBLE",
            TokenType::Nft1Group => "NFT1_GROUP",
            TokenType::Nft1Child => "NFT1_CHILD",
            TokenType::Unknown => "UNKNOWN_TOKEN_TYPE",
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "FUNGIBLE" => TokenType::Fungible,
            "NFT1_GROUP" => TokenType::Nft1Group,
            "NFT1_CHILD" => TokenType::Nft1Child,
            _ => TokenType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxType {
    Genesis,
    Send,
    Mint,
    Unknown,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Genesis => "GENESIS",
            TxType::Send => "SEND",
            TxType::Mint => "MINT",
            TxType::Unknown => "UNKNOWN_TX_TYPE",
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "GENESIS" => TxType::Genesis,
            "SEND" => TxType::Send,
            "MINT" => TxType::Mint,
            _ => TxType::Unknown,
        }
    }
}

// Unrecognized wire values decode to `Unknown` instead of failing the record
macro_rules! wire_string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(<$ty>::from_wire(&raw))
            }
        }
    };
}

wire_string_serde!(TokenType);
wire_string_serde!(TxType);

/// Token operation declared by a transaction's token envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlpMeta {
    pub token_type: TokenType,
    pub tx_type: TxType,
    pub token_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_token_id: Option<String>,
}

/// Token quantity carried by a single input or output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlpToken {
    pub amount: RawAmount,
    #[serde(default)]
    pub is_mint_baton: bool,
}

/// Unspent output as reported by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub outpoint: OutPoint,
    #[serde(default = "unconfirmed_height")]
    pub block_height: i32,
    #[serde(default)]
    pub is_coinbase: bool,
    pub value: RawAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slp_meta: Option<SlpMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slp_token: Option<SlpToken>,
}

fn unconfirmed_height() -> i32 {
    -1
}

impl Utxo {
    /// Live token holding: both the token envelope and a token amount are present
    pub fn is_token_utxo(&self) -> bool {
        self.slp_meta.is_some() && self.slp_token.is_some()
    }
}

/// Genesis fields exactly as the indexer reports them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisRecord {
    #[serde(default)]
    pub token_ticker: String,
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub token_document_url: String,
    #[serde(default)]
    pub token_document_hash: String,
    pub decimals: u32,
}

/// Immutable per-token metadata established at token creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGenesisInfo {
    pub token_ticker: String,
    pub token_name: String,
    pub token_document_url: String,
    pub token_document_hash: String,
    pub decimals: u8,
    pub token_id: String,
    pub success: bool,
}

impl TokenGenesisInfo {
    /// Validate a raw genesis record; decimals must lie in `0..=9`
    pub fn from_record(token_id: &str, record: GenesisRecord) -> Result<Self> {
        let decimals = u8::try_from(record.decimals)
            .ok()
            .filter(|d| *d <= MAX_TOKEN_DECIMALS)
            .ok_or_else(|| WalletError::InvalidDecimals {
                token_id: token_id.to_string(),
                decimals: record.decimals,
            })?;

        Ok(Self {
            token_ticker: record.token_ticker,
            token_name: record.token_name,
            token_document_url: record.token_document_url,
            token_document_hash: record.token_document_hash,
            decimals,
            token_id: token_id.to_string(),
            success: true,
        })
    }

    /// Placeholder recorded when the genesis fetch failed
    pub fn failed(token_id: &str) -> Self {
        Self {
            token_ticker: String::new(),
            token_name: String::new(),
            token_document_url: String::new(),
            token_document_hash: String::new(),
            decimals: 0,
            token_id: token_id.to_string(),
            success: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_utxo_deserializes_indexer_shape() {
        let utxo: Utxo = serde_json::from_value(json!({
            "outpoint": { "txid": "aa", "outIdx": 1 },
            "blockHeight": 680782,
            "isCoinbase": false,
            "value": "546",
            "slpMeta": {
                "tokenType": "FUNGIBLE",
                "txType": "SEND",
                "tokenId": "bd1acc4c986de57af8d6d2a64aecad8c30ee80f37ae9d066d758923732ddc9ba"
            },
            "slpToken": { "amount": "24", "isMintBaton": false }
        }))
        .unwrap();

        assert!(utxo.is_token_utxo());
        assert_eq!(utxo.value.to_string(), "546");
        assert_eq!(utxo.slp_meta.as_ref().unwrap().tx_type, TxType::Send);
    }

    #[test]
    fn test_unrecognized_tx_type_maps_to_unknown() {
        let meta: SlpMeta = serde_json::from_value(json!({
            "tokenType": "SOMETHING_NEW",
            "txType": "BURN",
            "tokenId": "aa"
        }))
        .unwrap();
        assert_eq!(meta.token_type, TokenType::Unknown);
        assert_eq!(meta.tx_type, TxType::Unknown);
    }

    #[test]
    fn test_genesis_decimals_validated() {
        let record = GenesisRecord {
            token_ticker: "UDT".to_string(),
            decimals: 10,
            ..Default::default()
        };
        assert!(matches!(
            TokenGenesisInfo::from_record("aa", record),
            Err(WalletError::InvalidDecimals { decimals: 10, .. })
        ));

        let ok = TokenGenesisInfo::from_record(
            "aa",
            GenesisRecord {
                decimals: 9,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(ok.success);
        assert_eq!(ok.decimals, 9);
    }
}
