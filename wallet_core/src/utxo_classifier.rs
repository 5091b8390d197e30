use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Utxo;

/// UTXO set partitioned by asset kind, each side in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizedUtxos {
    pub token_utxos: Vec<Utxo>,
    pub plain_utxos: Vec<Utxo>,
}

/// Split a flat UTXO set into token-bearing and plain entries.
///
/// A UTXO is token-bearing only if it carries both the token envelope and a
/// token amount. Envelope-only UTXOs (left over from a token burn) hold no
/// live tokens and are treated as plain value.
pub fn organize_utxos_by_type(utxos: Vec<Utxo>) -> OrganizedUtxos {
    let total = utxos.len();
    let (token_utxos, plain_utxos): (Vec<Utxo>, Vec<Utxo>) =
        utxos.into_iter().partition(Utxo::is_token_utxo);

    debug!(
        "Organized {} utxos into {} token utxos and {} plain utxos",
        total,
        token_utxos.len(),
        plain_utxos.len()
    );

    OrganizedUtxos {
        token_utxos,
        plain_utxos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutPoint, SlpMeta, SlpToken, TokenType, TxType};
    use crate::RawAmount;

    fn utxo(idx: u32, meta: bool, amount: Option<u64>) -> Utxo {
        Utxo {
            outpoint: OutPoint {
                txid: format!("{:064x}", idx),
                out_idx: idx,
            },
            block_height: 700000,
            is_coinbase: false,
            value: RawAmount::from(546),
            slp_meta: meta.then(|| SlpMeta {
                token_type: TokenType::Fungible,
                tx_type: TxType::Send,
                token_id: "aa".repeat(32),
                group_token_id: None,
            }),
            slp_token: amount.map(|a| SlpToken {
                amount: RawAmount::from(a),
                is_mint_baton: false,
            }),
        }
    }

    #[test]
    fn test_partition_preserves_order_and_length() {
        let input = vec![
            utxo(0, false, None),
            utxo(1, true, Some(5)),
            utxo(2, false, None),
            utxo(3, true, Some(7)),
            utxo(4, true, None),
        ];

        let organized = organize_utxos_by_type(input.clone());

        assert_eq!(
            organized.token_utxos.len() + organized.plain_utxos.len(),
            input.len()
        );
        let token_idx: Vec<u32> = organized
            .token_utxos
            .iter()
            .map(|u| u.outpoint.out_idx)
            .collect();
        let plain_idx: Vec<u32> = organized
            .plain_utxos
            .iter()
            .map(|u| u.outpoint.out_idx)
            .collect();
        assert_eq!(token_idx, vec![1, 3]);
        assert_eq!(plain_idx, vec![0, 2, 4]);
        assert!(organized
            .token_utxos
            .iter()
            .all(|u| u.slp_meta.is_some() && u.slp_token.is_some()));
    }

    #[test]
    fn test_burn_residue_is_plain() {
        let organized = organize_utxos_by_type(vec![utxo(9, true, None)]);
        assert!(organized.token_utxos.is_empty());
        assert_eq!(organized.plain_utxos.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let organized = organize_utxos_by_type(Vec::new());
        assert_eq!(organized, OrganizedUtxos::default());
    }
}
