//! Decryption of encrypted application messages.
//!
//! Payload layout is `iv (16) || ciphertext || tag (32)`. The key pair is
//! derived from ECDH between the recipient's WIF key and the sender's public
//! key: SHA-512 of the shared x coordinate gives the AES-256-CBC key (first
//! half) and the HMAC-SHA256 key (second half). The tag covers `iv || ciphertext`.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use secp256k1::{ecdh, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256, Sha512};
use tracing::debug;

use crate::{DecryptionError, DecryptionRequest, MessageDecryptor};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

const IV_LEN: usize = 16;
const TAG_LEN: usize = 32;
const AES_BLOCK_LEN: usize = 16;

const WIF_MAINNET: u8 = 0x80;
const WIF_TESTNET: u8 = 0xef;

/// Decode a WIF private key into its secret
pub fn wif_to_secret_key(wif: &str) -> Result<SecretKey, DecryptionError> {
    let payload = bs58::decode(wif)
        .with_check(None)
        .into_vec()
        .map_err(|e| DecryptionError::InvalidKey(format!("bad WIF encoding: {}", e)))?;

    let key_bytes = match payload.as_slice() {
        [WIF_MAINNET | WIF_TESTNET, key @ ..] if key.len() == 32 => key,
        [WIF_MAINNET | WIF_TESTNET, key @ .., 0x01] if key.len() == 32 => key,
        _ => return Err(DecryptionError::InvalidKey("unexpected WIF payload".to_string())),
    };

    SecretKey::from_slice(key_bytes).map_err(|e| DecryptionError::InvalidKey(e.to_string()))
}

fn parse_public_key(label: &str, key_hex: &str) -> Result<PublicKey, DecryptionError> {
    let bytes = hex::decode(key_hex)
        .map_err(|e| DecryptionError::InvalidKey(format!("{} public key: {}", label, e)))?;
    PublicKey::from_slice(&bytes)
        .map_err(|e| DecryptionError::InvalidKey(format!("{} public key: {}", label, e)))
}

/// ECDH plus SHA-512 KDF, returning (encryption key, mac key)
fn derive_keys(secret: &SecretKey, peer: &PublicKey) -> ([u8; 32], [u8; 32]) {
    let point = ecdh::shared_secret_point(peer, secret);
    let digest = Sha512::digest(&point[..32]);

    let mut enc_key = [0u8; 32];
    let mut mac_key = [0u8; 32];
    enc_key.copy_from_slice(&digest[..32]);
    mac_key.copy_from_slice(&digest[32..]);
    (enc_key, mac_key)
}

/// Decryptor backed by the recipient's WIF and the sender's public key
#[derive(Debug, Clone, Copy, Default)]
pub struct EciesDecryptor;

impl MessageDecryptor for EciesDecryptor {
    fn decrypt(&self, request: &DecryptionRequest<'_>) -> Result<String, DecryptionError> {
        let data = request.ciphertext;
        if data.len() < IV_LEN + AES_BLOCK_LEN + TAG_LEN
            || (data.len() - IV_LEN - TAG_LEN) % AES_BLOCK_LEN != 0
        {
            return Err(DecryptionError::Malformed(format!(
                "{} bytes is not a valid encrypted payload",
                data.len()
            )));
        }

        let secret = wif_to_secret_key(request.recipient_wif)?;
        if let Some(expected) = request.recipient_public_key {
            let derived = PublicKey::from_secret_key(&Secp256k1::new(), &secret);
            if parse_public_key("recipient", expected)? != derived {
                return Err(DecryptionError::InvalidKey(
                    "WIF does not match the recipient public key".to_string(),
                ));
            }
        }
        let sender = request
            .sender_public_key
            .ok_or_else(|| DecryptionError::InvalidKey("sender public key unavailable".to_string()))?;
        let sender = parse_public_key("sender", sender)?;

        let (enc_key, mac_key) = derive_keys(&secret, &sender);

        let (iv, rest) = data.split_at(IV_LEN);
        let (body, tag) = rest.split_at(rest.len() - TAG_LEN);

        let mut mac = <HmacSha256 as Mac>::new_from_slice(&mac_key)
            .map_err(|e| DecryptionError::InvalidKey(e.to_string()))?;
        mac.update(iv);
        mac.update(body);
        mac.verify_slice(tag).map_err(|_| DecryptionError::Authentication)?;

        let mut buf = body.to_vec();
        let plaintext = Aes256CbcDec::new_from_slices(&enc_key, iv)
            .map_err(|e| DecryptionError::InvalidKey(e.to_string()))?
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map_err(|_| DecryptionError::Malformed("bad padding".to_string()))?;

        debug!("Decrypted {} byte message", plaintext.len());
        String::from_utf8(plaintext.to_vec())
            .map_err(|_| DecryptionError::Malformed("plaintext is not UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Generated independently: recipient secret 0x11 * 32, sender secret 0x22 * 32, iv 0x33 * 16
    const RECIPIENT_WIF: &str = "KwntMbt59tTsj8xqpqYqRRWufyjGunvhSyeMo3NTYpFYzZbXJ5Hp";
    const RECIPIENT_WIF_UNCOMPRESSED: &str = "5HwoXVkHoRM8sL2KmNRS217n1g8mPPBomrY7yehCuXC1115WWsh";
    const RECIPIENT_PUBLIC_KEY: &str =
        "034f355bdcb7cc0af728ef3cceb9615d90684bb5b2ca5f859ab0f0b704075871aa";
    const SENDER_PUBLIC_KEY: &str =
        "02466d7fcae563e5cb09a0d1870bb580344804617879a14949cf22285f1bae3f27";
    const CIPHERTEXT: &str = "33333333333333333333333333333333\
        1b5e47ba005c0eb7dca2d4efcf79e9cf42b563a201d24589f235ba0ec8ea2ff2\
        026afc07518c3a3995e447b898520604cbfe10d0470a003e6b4b5caa76fb8641";

    fn request<'a>(ciphertext: &'a [u8], wif: &'a str, sender: Option<&'a str>) -> DecryptionRequest<'a> {
        DecryptionRequest {
            ciphertext,
            recipient_wif: wif,
            recipient_public_key: Some(RECIPIENT_PUBLIC_KEY),
            sender_public_key: sender,
        }
    }

    #[test]
    fn test_decrypts_known_ciphertext() {
        let data = hex::decode(CIPHERTEXT).unwrap();
        let message = EciesDecryptor
            .decrypt(&request(&data, RECIPIENT_WIF, Some(SENDER_PUBLIC_KEY)))
            .unwrap();
        assert_eq!(message, "Test encrypted message");
    }

    #[test]
    fn test_uncompressed_wif_decodes_same_secret() {
        assert_eq!(
            wif_to_secret_key(RECIPIENT_WIF).unwrap(),
            wif_to_secret_key(RECIPIENT_WIF_UNCOMPRESSED).unwrap()
        );
        assert!(matches!(
            wif_to_secret_key("KwntMbt59tTsj8xqpqYqRRWufyjGunvhSyeMo3NTYpFYzZbXJ5Hq"),
            Err(DecryptionError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_tampered_tag_fails_authentication() {
        let mut data = hex::decode(CIPHERTEXT).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0x01;
        assert_eq!(
            EciesDecryptor.decrypt(&request(&data, RECIPIENT_WIF, Some(SENDER_PUBLIC_KEY))),
            Err(DecryptionError::Authentication)
        );
    }

    #[test]
    fn test_wrong_sender_key_fails_authentication() {
        let data = hex::decode(CIPHERTEXT).unwrap();
        assert_eq!(
            EciesDecryptor.decrypt(&request(&data, RECIPIENT_WIF, Some(RECIPIENT_PUBLIC_KEY))),
            Err(DecryptionError::Authentication)
        );
    }

    #[test]
    fn test_rejects_short_payload_and_missing_sender() {
        assert!(matches!(
            EciesDecryptor.decrypt(&request(&[0u8; 40], RECIPIENT_WIF, Some(SENDER_PUBLIC_KEY))),
            Err(DecryptionError::Malformed(_))
        ));

        let data = hex::decode(CIPHERTEXT).unwrap();
        assert!(matches!(
            EciesDecryptor.decrypt(&request(&data, RECIPIENT_WIF, None)),
            Err(DecryptionError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_recipient_key_mismatch() {
        let data = hex::decode(CIPHERTEXT).unwrap();
        let mut req = request(&data, RECIPIENT_WIF, Some(SENDER_PUBLIC_KEY));
        req.recipient_public_key = Some(SENDER_PUBLIC_KEY);
        assert!(matches!(
            EciesDecryptor.decrypt(&req),
            Err(DecryptionError::InvalidKey(_))
        ));
    }
}
