use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

use crate::tx::Tx;

/// All fetched history of one wallet address
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressHistory {
    pub address: String,
    pub txs: Vec<Tx>,
}

/// A transaction plus the address it was retrieved under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTxRecord {
    pub address: String,
    #[serde(flatten)]
    pub tx: Tx,
}

impl FlatTxRecord {
    pub fn txid(&self) -> &str {
        &self.tx.txid
    }

    pub fn block_height(&self) -> Option<i32> {
        self.tx.confirmed_height()
    }

    pub fn first_seen_time(&self) -> i64 {
        self.tx.time_first_seen
    }
}

/// Flatten per-address histories into one list, keeping the first
/// occurrence of each txid
pub fn flatten_tx_history(histories: Vec<AddressHistory>) -> Vec<FlatTxRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut flat = Vec::new();
    let mut duplicates = 0usize;

    for history in histories {
        for tx in history.txs {
            if !seen.insert(tx.txid.clone()) {
                duplicates += 1;
                continue;
            }
            flat.push(FlatTxRecord {
                address: history.address.clone(),
                tx,
            });
        }
    }

    debug!(
        "Flattened tx history: {} unique txs, {} duplicates dropped",
        flat.len(),
        duplicates
    );
    flat
}

/// Most recent first: unconfirmed before confirmed, confirmed by descending
/// height, ties and unconfirmed entries by descending first-seen time
fn most_recent_first(a: &FlatTxRecord, b: &FlatTxRecord) -> Ordering {
    match (a.block_height(), b.block_height()) {
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => b.first_seen_time().cmp(&a.first_seen_time()),
        (Some(height_a), Some(height_b)) => height_b
            .cmp(&height_a)
            .then_with(|| b.first_seen_time().cmp(&a.first_seen_time())),
    }
}

/// Order the flattened history and keep at most `count` entries
pub fn sort_and_trim_tx_history(mut flat: Vec<FlatTxRecord>, count: usize) -> Vec<FlatTxRecord> {
    flat.sort_by(most_recent_first);
    flat.truncate(count);
    flat
}

/// Flatten, dedupe, sort and truncate in one step
pub fn merge_tx_history(histories: Vec<AddressHistory>, count: usize) -> Vec<FlatTxRecord> {
    sort_and_trim_tx_history(flatten_tx_history(histories), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::BlockMetadata;

    fn tx(txid: &str, height: Option<i32>, first_seen: i64) -> Tx {
        Tx {
            txid: txid.to_string(),
            version: 2,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            slp_tx_data: None,
            block: height.map(|height| BlockMetadata {
                height,
                hash: format!("{:064}", height),
                timestamp: first_seen + 60,
            }),
            time_first_seen: first_seen,
            size: 200,
            is_coinbase: false,
        }
    }

    fn history(address: &str, txs: Vec<Tx>) -> AddressHistory {
        AddressHistory {
            address: address.to_string(),
            txs,
        }
    }

    fn txids(records: &[FlatTxRecord]) -> Vec<&str> {
        records.iter().map(FlatTxRecord::txid).collect()
    }

    #[test]
    fn test_flatten_dedupes_keeping_first_address() {
        let flat = flatten_tx_history(vec![
            history("ecash:a", vec![tx("t1", Some(10), 100), tx("t2", Some(11), 110)]),
            history("ecash:b", vec![tx("t2", Some(11), 110), tx("t3", Some(12), 120)]),
        ]);

        assert_eq!(txids(&flat), vec!["t1", "t2", "t3"]);
        assert_eq!(flat[1].address, "ecash:a");
    }

    #[test]
    fn test_sort_all_confirmed() {
        let flat = flatten_tx_history(vec![history(
            "ecash:a",
            vec![
                tx("low", Some(100), 500),
                tx("high_early", Some(200), 300),
                tx("high_late", Some(200), 400),
                tx("mid", Some(150), 900),
            ],
        )]);

        let sorted = sort_and_trim_tx_history(flat, 10);
        assert_eq!(txids(&sorted), vec!["high_late", "high_early", "mid", "low"]);
    }

    #[test]
    fn test_unconfirmed_precede_confirmed() {
        let flat = flatten_tx_history(vec![
            history(
                "ecash:a",
                vec![tx("c_old", Some(100), 50), tx("u_early", None, 10)],
            ),
            history(
                "ecash:b",
                vec![tx("c_new", Some(300), 5000), tx("u_late", None, 20)],
            ),
        ]);

        let sorted = sort_and_trim_tx_history(flat, 10);
        assert_eq!(txids(&sorted), vec!["u_late", "u_early", "c_new", "c_old"]);
    }

    #[test]
    fn test_all_unconfirmed_sorted_by_first_seen() {
        let flat = flatten_tx_history(vec![history(
            "ecash:a",
            vec![tx("a", None, 3), tx("b", None, 9), tx("c", Some(0), 6)],
        )]);

        let sorted = sort_and_trim_tx_history(flat, 10);
        assert_eq!(txids(&sorted), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_trim_to_count_and_short_input() {
        let txs: Vec<Tx> = (0..15).map(|i| tx(&format!("t{}", i), Some(100 + i), i as i64)).collect();

        let merged = merge_tx_history(vec![history("ecash:a", txs.clone())], 10);
        assert_eq!(merged.len(), 10);
        assert_eq!(merged[0].txid(), "t14");

        let short = merge_tx_history(vec![history("ecash:a", txs[..3].to_vec())], 10);
        assert_eq!(short.len(), 3);

        let none = merge_tx_history(Vec::new(), 10);
        assert!(none.is_empty());
    }
}
