// Interprets indexer transaction records from the point of view of one wallet:
// direction, net amount, token semantics and the legacy embedded-message protocol.

pub mod ecies;
pub mod interpreter;
pub mod payload;
pub mod script;
pub mod wallet;

pub use ecies::EciesDecryptor;
pub use interpreter::{
    BurnStatus, LegacyInfo, ParsedTx, TxInterpreter, DEFAULT_XEC_DECIMALS,
    SENT_ENCRYPTED_PLACEHOLDER,
};
pub use payload::EmbeddedPayload;
pub use wallet::{WalletContext, WalletPath};

use thiserror::Error;
use wallet_core::WalletError;

#[derive(Error, Debug)]
pub enum TxParseError {
    #[error("Address conversion failed: {0}")]
    AddressConversion(#[from] AddressConversionError),
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] WalletError),
}

pub type Result<T> = std::result::Result<T, TxParseError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot convert hash160 '{hash160}' to an address: {reason}")]
pub struct AddressConversionError {
    pub hash160: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("Message decryption is not available")]
    Unsupported,
    #[error("Message authentication failed")]
    Authentication,
    #[error("Malformed ciphertext: {0}")]
    Malformed(String),
    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

/// Converts a hash160 fingerprint into a displayable address
pub trait AddressConverter: Send + Sync {
    fn hash160_to_address(&self, hash160: &str) -> std::result::Result<String, AddressConversionError>;
}

/// Key material handed to a [`MessageDecryptor`] for one encrypted payload
#[derive(Debug, Clone, Copy)]
pub struct DecryptionRequest<'a> {
    pub ciphertext: &'a [u8],
    pub recipient_wif: &'a str,
    pub recipient_public_key: Option<&'a str>,
    /// Public key pushed by the sender's first input, hex encoded
    pub sender_public_key: Option<&'a str>,
}

/// Symmetric decryption of encrypted application messages
pub trait MessageDecryptor: Send + Sync {
    fn decrypt(&self, request: &DecryptionRequest<'_>) -> std::result::Result<String, DecryptionError>;
}

/// Opt-out decryptor; every attempt fails and messages stay hidden
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecryption;

impl MessageDecryptor for NoDecryption {
    fn decrypt(&self, _request: &DecryptionRequest<'_>) -> std::result::Result<String, DecryptionError> {
        Err(DecryptionError::Unsupported)
    }
}
