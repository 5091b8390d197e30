use tracing::trace;

use crate::script::op_return_pushes;

/// Lokad prefix of the token protocol envelope ("SLP\0")
pub const TOKEN_ENVELOPE_PREFIX: [u8; 4] = *b"SLP\0";
/// Legacy airdrop announcement ("drop")
pub const AIRDROP_PREFIX: [u8; 4] = *b"drop";
/// Legacy plain application message ("\0tab")
pub const APP_MESSAGE_PREFIX: [u8; 4] = *b"\0tab";
/// Legacy encrypted application message ("etab")
pub const ENCRYPTED_MESSAGE_PREFIX: [u8; 4] = *b"etab";

/// Recognized shapes of an OP_RETURN payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedPayload {
    TokenEnvelope { tx_type: String },
    Airdrop {
        token_id: String,
        message: Option<String>,
    },
    AppMessage { text: String },
    EncryptedMessage { ciphertext: Vec<u8> },
    Unrecognized,
}

type ShapeDecoder = fn(&[u8], &[Vec<u8>]) -> Option<EmbeddedPayload>;

// Tried in order; the first shape that matches wins
const SHAPES: [ShapeDecoder; 4] = [
    decode_token_envelope,
    decode_airdrop,
    decode_app_message,
    decode_encrypted_message,
];

impl EmbeddedPayload {
    /// Decode an OP_RETURN output script (hex). Anything that is not a
    /// well-formed push-only OP_RETURN matching a known shape is `Unrecognized`.
    pub fn decode(script_hex: &str) -> Self {
        let pushes = match op_return_pushes(script_hex) {
            Ok(pushes) => pushes,
            Err(e) => {
                trace!("Not a decodable OP_RETURN script: {}", e);
                return EmbeddedPayload::Unrecognized;
            }
        };
        let Some((prefix, rest)) = pushes.split_first() else {
            return EmbeddedPayload::Unrecognized;
        };

        SHAPES
            .iter()
            .find_map(|decode| decode(prefix, rest))
            .unwrap_or(EmbeddedPayload::Unrecognized)
    }
}

fn concat_text(pushes: &[Vec<u8>]) -> String {
    String::from_utf8_lossy(&pushes.concat()).into_owned()
}

fn decode_token_envelope(prefix: &[u8], rest: &[Vec<u8>]) -> Option<EmbeddedPayload> {
    if prefix != TOKEN_ENVELOPE_PREFIX {
        return None;
    }
    // <token type> <tx type> ...
    let tx_type = rest.get(1).map(|t| String::from_utf8_lossy(t).into_owned())?;
    Some(EmbeddedPayload::TokenEnvelope { tx_type })
}

fn decode_airdrop(prefix: &[u8], rest: &[Vec<u8>]) -> Option<EmbeddedPayload> {
    if prefix != AIRDROP_PREFIX {
        return None;
    }
    // <32-byte token id> [<app message prefix>] [<message>...]
    let (token_id, tail) = rest.split_first()?;
    if token_id.len() != 32 {
        return None;
    }
    let message_pushes = match tail.split_first() {
        Some((next, after)) if next.as_slice() == APP_MESSAGE_PREFIX => after,
        _ => tail,
    };
    let message = Some(concat_text(message_pushes)).filter(|text| !text.is_empty());

    Some(EmbeddedPayload::Airdrop {
        token_id: hex::encode(token_id),
        message,
    })
}

fn decode_app_message(prefix: &[u8], rest: &[Vec<u8>]) -> Option<EmbeddedPayload> {
    (prefix == APP_MESSAGE_PREFIX).then(|| EmbeddedPayload::AppMessage {
        text: concat_text(rest),
    })
}

fn decode_encrypted_message(prefix: &[u8], rest: &[Vec<u8>]) -> Option<EmbeddedPayload> {
    (prefix == ENCRYPTED_MESSAGE_PREFIX).then(|| EmbeddedPayload::EncryptedMessage {
        ciphertext: rest.concat(),
    })
}
