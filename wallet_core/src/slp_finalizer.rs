use serde::{Deserialize, Serialize};

use crate::quantity::{scale_quantity, ScaledQuantity};
use crate::token_cache::TokenInfoCache;
use crate::types::Utxo;
use crate::{Result, WalletError};

/// Token UTXO with its amount scaled by the token's decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedSlpUtxo {
    #[serde(flatten)]
    pub utxo: Utxo,
    pub token_quantity: ScaledQuantity,
}

/// Attach a scaled `token_quantity` to every token UTXO.
///
/// `token_info_by_id` must already cover every token id present; run
/// token info reconciliation first. A missing id fails the whole call.
pub fn finalize_slp_utxos(
    token_utxos: Vec<Utxo>,
    token_info_by_id: &TokenInfoCache,
) -> Result<Vec<FinalizedSlpUtxo>> {
    token_utxos
        .into_iter()
        .map(|utxo| {
            let (Some(meta), Some(token)) = (&utxo.slp_meta, &utxo.slp_token) else {
                return Err(WalletError::InvalidQuantity(format!(
                    "utxo {}:{} carries no token amount",
                    utxo.outpoint.txid, utxo.outpoint.out_idx
                )));
            };
            let genesis_info = token_info_by_id
                .get(&meta.token_id)
                .ok_or_else(|| WalletError::UnknownTokenReference(meta.token_id.clone()))?;
            let token_quantity = scale_quantity(&token.amount, genesis_info.decimals)?;

            Ok(FinalizedSlpUtxo {
                utxo,
                token_quantity,
            })
        })
        .collect()
}
