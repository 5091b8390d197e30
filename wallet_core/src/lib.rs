pub mod amount;
pub mod history;
pub mod indexer;
pub mod quantity;
pub mod slp_finalizer;
pub mod token_cache;
pub mod token_stats;
pub mod tx;
pub mod types;
pub mod utxo_classifier;

pub use amount::RawAmount;
pub use history::{
    flatten_tx_history, merge_tx_history, sort_and_trim_tx_history, AddressHistory, FlatTxRecord,
};
pub use indexer::{HistoryPage, IndexerClient, TokenStatsRecord, TokenSupplyFigures};
pub use quantity::{scale_quantity, unscale_quantity, ScaledQuantity, MAX_TOKEN_DECIMALS};
pub use slp_finalizer::{finalize_slp_utxos, FinalizedSlpUtxo};
pub use token_cache::{
    finalize_tokens_array, get_preliminary_tokens_array, reconcile_token_info, FinalTokenBalance,
    FinalizedTokens, PreliminaryTokenBalance, ReconciledTokenInfo, TokenInfoCache,
};
pub use token_stats::{get_token_stats, TokenStats};
pub use tx::{BlockMetadata, SlpTxData, Tx, TxInput, TxOutput};
pub use types::{
    GenesisRecord, OutPoint, SlpMeta, SlpToken, TokenGenesisInfo, TokenType, TxType, Utxo,
};
pub use utxo_classifier::{organize_utxos_by_type, OrganizedUtxos};

use thiserror::Error;

/// Failure reported by the indexer collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexerError {
    #[error("Unknown token id: {0}")]
    UnknownToken(String),
    #[error("Indexer transport error: {0}")]
    Transport(String),
    #[error("Malformed indexer response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Token {0} is not present in the supplied token info map")]
    UnknownTokenReference(String),
    #[error("Invalid token quantity: {0}")]
    InvalidQuantity(String),
    #[error("Invalid decimals {decimals} for token {token_id}")]
    InvalidDecimals { token_id: String, decimals: u32 },
    #[error("Missing required identifier: {0}")]
    MissingIdentifier(String),
    #[error("Indexer error: {0}")]
    Indexer(#[from] IndexerError),
}

pub type Result<T> = std::result::Result<T, WalletError>;
