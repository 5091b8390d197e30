use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use wallet_core::{
    scale_quantity, RawAmount, ScaledQuantity, SlpMeta, SlpTxData, TokenGenesisInfo,
    TokenInfoCache, Tx, TxOutput, TxType,
};

use crate::payload::EmbeddedPayload;
use crate::script::{input_script_public_key, is_op_return, output_script_hash160};
use crate::wallet::{WalletContext, WalletPath};
use crate::{AddressConverter, DecryptionRequest, MessageDecryptor, Result};

/// Shown for encrypted messages this wallet sent; only the recipient holds the key
pub const SENT_ENCRYPTED_PLACEHOLDER: &str = "Only the message recipient can view this";

/// XEC base units are hundredths
pub const DEFAULT_XEC_DECIMALS: u8 = 2;

/// Outcome of comparing token inputs against token outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BurnStatus {
    Burned,
    NotBurned,
    /// The record carries no token input quantities to compare against
    Unknown,
}

impl BurnStatus {
    pub fn is_burn(&self) -> bool {
        matches!(self, BurnStatus::Burned)
    }
}

/// `isTokenBurn` on the wire: a plain flag, `null` when undetermined
mod burn_flag {
    use super::BurnStatus;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(status: &Option<BurnStatus>, serializer: S) -> Result<S::Ok, S::Error> {
        match status {
            Some(BurnStatus::Burned) => serializer.serialize_bool(true),
            Some(BurnStatus::NotBurned) => serializer.serialize_bool(false),
            Some(BurnStatus::Unknown) | None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<BurnStatus>, D::Error> {
        Ok(Some(match Option::<bool>::deserialize(deserializer)? {
            Some(true) => BurnStatus::Burned,
            Some(false) => BurnStatus::NotBurned,
            None => BurnStatus::Unknown,
        }))
    }
}

/// Fields of the legacy application message protocol
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyInfo {
    pub airdrop_flag: bool,
    pub airdrop_token_id: String,
    pub op_return_message: String,
    pub is_cashtab_message: bool,
    pub is_encrypted_message: bool,
    pub decryption_success: bool,
    pub reply_address: String,
}

/// A transaction as seen by one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTx {
    pub incoming: bool,
    pub xec_amount: ScaledQuantity,
    pub originating_hash160: String,
    pub is_etoken_tx: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "burn_flag")]
    pub is_token_burn: Option<BurnStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etoken_amount: Option<ScaledQuantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slp_meta: Option<SlpMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_info: Option<TokenGenesisInfo>,
    pub legacy: LegacyInfo,
}

struct TokenDetails {
    slp_meta: SlpMeta,
    genesis_info: TokenGenesisInfo,
    amount: ScaledQuantity,
    burn: Option<BurnStatus>,
}

/// Interprets raw indexer transactions for a single wallet
pub struct TxInterpreter<'a> {
    converter: &'a dyn AddressConverter,
    decryptor: &'a dyn MessageDecryptor,
    wallet: &'a WalletContext,
    token_info_by_id: &'a TokenInfoCache,
    xec_decimals: u8,
}

impl<'a> TxInterpreter<'a> {
    pub fn new(
        converter: &'a dyn AddressConverter,
        decryptor: &'a dyn MessageDecryptor,
        wallet: &'a WalletContext,
        token_info_by_id: &'a TokenInfoCache,
    ) -> Self {
        Self {
            converter,
            decryptor,
            wallet,
            token_info_by_id,
            xec_decimals: DEFAULT_XEC_DECIMALS,
        }
    }

    pub fn with_xec_decimals(mut self, xec_decimals: u8) -> Self {
        self.xec_decimals = xec_decimals;
        self
    }

    fn owns_script(&self, script_hex: &str) -> bool {
        output_script_hash160(script_hex).is_some_and(|hash| self.wallet.owns_hash160(hash))
    }

    fn owns_output(&self, output: &TxOutput) -> bool {
        self.owns_script(&output.output_script)
    }

    /// Parse one transaction. Fails only when the sender's hash160 cannot
    /// be turned into an address.
    pub fn parse_tx(&self, tx: &Tx) -> Result<ParsedTx> {
        // Coinbase and non-hash160 sender scripts leave the sender unknown
        let originating_hash160 = tx
            .inputs
            .first()
            .and_then(|input| input.output_script.as_deref())
            .and_then(output_script_hash160)
            .map(str::to_lowercase)
            .unwrap_or_default();
        if originating_hash160.is_empty() {
            debug!(
                "Tx {} has no hash160 sender (coinbase: {})",
                tx.txid, tx.is_coinbase
            );
        }

        let incoming = !tx.inputs.iter().any(|input| {
            input
                .output_script
                .as_deref()
                .is_some_and(|script| self.owns_script(script))
        });

        // Incoming: value received at owned outputs. Outgoing: value sent elsewhere.
        let mut wallet_relevant = !incoming;
        let mut xec_total = RawAmount::zero();
        for output in &tx.outputs {
            let owned = self.owns_output(output);
            wallet_relevant |= owned;
            if owned == incoming {
                xec_total += &output.value;
            }
        }
        if !wallet_relevant {
            debug!(
                "Tx {} touches no address of wallet '{}'; reporting as incoming with zero amount",
                tx.txid, self.wallet.name
            );
        }
        let xec_amount = scale_quantity(&xec_total, self.xec_decimals)?;

        let payload = tx
            .outputs
            .iter()
            .find(|output| is_op_return(&output.output_script))
            .map(|output| EmbeddedPayload::decode(&output.output_script))
            .unwrap_or(EmbeddedPayload::Unrecognized);

        let token = match &tx.slp_tx_data {
            Some(slp_tx_data) => Some(self.token_details(tx, slp_tx_data, incoming)?),
            None => {
                if let EmbeddedPayload::TokenEnvelope { tx_type } = &payload {
                    debug!(
                        "Tx {} carries a {} token envelope the indexer did not validate",
                        tx.txid, tx_type
                    );
                }
                None
            }
        };

        let mut legacy = self.decode_legacy(tx, payload, incoming);
        if !originating_hash160.is_empty() {
            legacy.reply_address = self.converter.hash160_to_address(&originating_hash160)?;
        }

        let parsed = match token {
            Some(token) => ParsedTx {
                incoming,
                xec_amount,
                originating_hash160,
                is_etoken_tx: true,
                is_token_burn: token.burn,
                etoken_amount: Some(token.amount),
                slp_meta: Some(token.slp_meta),
                genesis_info: Some(token.genesis_info),
                legacy,
            },
            None => ParsedTx {
                incoming,
                xec_amount,
                originating_hash160,
                is_etoken_tx: false,
                is_token_burn: None,
                etoken_amount: None,
                slp_meta: None,
                genesis_info: None,
                legacy,
            },
        };

        trace!("Parsed tx {}: {:?}", tx.txid, parsed);
        Ok(parsed)
    }

    fn genesis_info_for(&self, slp_tx_data: &SlpTxData) -> TokenGenesisInfo {
        let meta = &slp_tx_data.slp_meta;
        if let Some(info) = self.token_info_by_id.get(&meta.token_id) {
            return info.clone();
        }

        // A genesis tx describes its own token
        let embedded = match (meta.tx_type, &slp_tx_data.genesis_info) {
            (TxType::Genesis, Some(record)) => {
                match TokenGenesisInfo::from_record(&meta.token_id, record.clone()) {
                    Ok(info) => Some(info),
                    Err(e) => {
                        warn!("Ignoring genesis record of {}: {}", meta.token_id, e);
                        None
                    }
                }
            }
            _ => None,
        };

        embedded.unwrap_or_else(|| {
            debug!("No genesis info available for token {}", meta.token_id);
            TokenGenesisInfo::failed(&meta.token_id)
        })
    }

    fn token_details(&self, tx: &Tx, slp_tx_data: &SlpTxData, incoming: bool) -> Result<TokenDetails> {
        let genesis_info = self.genesis_info_for(slp_tx_data);
        let meta = slp_tx_data.slp_meta.clone();

        let token_inputs: Vec<&RawAmount> = tx
            .inputs
            .iter()
            .filter_map(|input| input.slp_token.as_ref())
            .map(|token| &token.amount)
            .collect();

        let mut owned_outputs = RawAmount::zero();
        let mut foreign_outputs = RawAmount::zero();
        for output in &tx.outputs {
            let Some(token) = &output.slp_token else {
                continue;
            };
            if self.owns_output(output) {
                owned_outputs += &token.amount;
            } else {
                foreign_outputs += &token.amount;
            }
        }
        let total_outputs = owned_outputs.clone() + foreign_outputs.clone();
        let directed = if incoming { owned_outputs.clone() } else { foreign_outputs };

        let (raw_amount, burn) = match meta.tx_type {
            TxType::Genesis => (total_outputs, None),
            TxType::Mint => (owned_outputs, Some(BurnStatus::NotBurned)),
            TxType::Send if token_inputs.is_empty() => (directed, Some(BurnStatus::Unknown)),
            TxType::Send => {
                let total_inputs: RawAmount = token_inputs.into_iter().sum();
                match total_inputs.checked_sub(&total_outputs) {
                    Some(burned) if !burned.is_zero() => {
                        debug!("Tx {} burns {} of token {}", tx.txid, burned, meta.token_id);
                        (burned, Some(BurnStatus::Burned))
                    }
                    _ => (directed, Some(BurnStatus::NotBurned)),
                }
            }
            TxType::Unknown => (RawAmount::zero(), Some(BurnStatus::Unknown)),
        };

        let amount = scale_quantity(&raw_amount, genesis_info.decimals)?;
        Ok(TokenDetails {
            slp_meta: meta,
            genesis_info,
            amount,
            burn,
        })
    }

    fn decode_legacy(&self, tx: &Tx, payload: EmbeddedPayload, incoming: bool) -> LegacyInfo {
        match payload {
            EmbeddedPayload::Airdrop { token_id, message } => LegacyInfo {
                airdrop_flag: true,
                airdrop_token_id: token_id,
                op_return_message: message.unwrap_or_default(),
                is_cashtab_message: true,
                ..Default::default()
            },
            EmbeddedPayload::AppMessage { text } => LegacyInfo {
                op_return_message: text,
                is_cashtab_message: true,
                ..Default::default()
            },
            EmbeddedPayload::EncryptedMessage { ciphertext } => {
                let (op_return_message, decryption_success) =
                    self.decrypt_message(tx, &ciphertext, incoming);
                LegacyInfo {
                    op_return_message,
                    is_cashtab_message: true,
                    is_encrypted_message: true,
                    decryption_success,
                    ..Default::default()
                }
            }
            EmbeddedPayload::TokenEnvelope { .. } | EmbeddedPayload::Unrecognized => {
                LegacyInfo::default()
            }
        }
    }

    fn recipient_path(&self, tx: &Tx) -> Option<&'a WalletPath> {
        let wallet: &'a WalletContext = self.wallet;
        tx.outputs
            .iter()
            .filter_map(|output| output_script_hash160(&output.output_script))
            .filter_map(|hash| wallet.path_for_hash160(hash))
            .find(|path| path.has_private_key())
            .or_else(|| wallet.first_keyed_path())
    }

    /// One decryption attempt at most; failures only clear the message
    fn decrypt_message(&self, tx: &Tx, ciphertext: &[u8], incoming: bool) -> (String, bool) {
        if !self.wallet.has_private_keys() {
            return (String::new(), false);
        }
        if !incoming {
            return (SENT_ENCRYPTED_PLACEHOLDER.to_string(), false);
        }

        let Some((path, wif)) = self
            .recipient_path(tx)
            .and_then(|path| path.wif.as_deref().map(|wif| (path, wif)))
        else {
            return (String::new(), false);
        };
        let sender_public_key = tx
            .inputs
            .first()
            .and_then(|input| input_script_public_key(&input.input_script));

        let request = DecryptionRequest {
            ciphertext,
            recipient_wif: wif,
            recipient_public_key: path.public_key.as_deref(),
            sender_public_key: sender_public_key.as_deref(),
        };

        match self.decryptor.decrypt(&request) {
            Ok(plaintext) => (plaintext, true),
            Err(e) => {
                warn!("Could not decrypt message in tx {}: {}", tx.txid, e);
                (String::new(), false)
            }
        }
    }
}
