use serde::{Deserialize, Serialize};

/// One derivation path of a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletPath {
    pub path: u32,
    pub hash160: String,
    pub cash_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Private key in wallet import format; never written back out
    #[serde(default, skip_serializing)]
    pub wif: Option<String>,
}

impl WalletPath {
    pub fn has_private_key(&self) -> bool {
        self.wif.as_deref().is_some_and(|wif| !wif.is_empty())
    }
}

/// The wallet a transaction is interpreted for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletContext {
    #[serde(default)]
    pub name: String,
    pub paths: Vec<WalletPath>,
}

impl WalletContext {
    pub fn new(name: impl Into<String>, paths: Vec<WalletPath>) -> Self {
        Self {
            name: name.into(),
            paths,
        }
    }

    pub fn owns_hash160(&self, hash160: &str) -> bool {
        self.path_for_hash160(hash160).is_some()
    }

    pub fn path_for_hash160(&self, hash160: &str) -> Option<&WalletPath> {
        self.paths
            .iter()
            .find(|path| path.hash160.eq_ignore_ascii_case(hash160))
    }

    /// Private-key material is available on at least one path
    pub fn has_private_keys(&self) -> bool {
        self.paths.iter().any(WalletPath::has_private_key)
    }

    /// First path holding a private key
    pub fn first_keyed_path(&self) -> Option<&WalletPath> {
        self.paths.iter().find(|path| path.has_private_key())
    }

    pub fn addresses(&self) -> Vec<String> {
        self.paths.iter().map(|path| path.cash_address.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wallet() -> WalletContext {
        serde_json::from_value(json!({
            "name": "Test Wallet",
            "paths": [
                {
                    "path": 1899,
                    "hash160": "4e532257c01b310b3b5c1fd947c79a72addf8523",
                    "cashAddress": "ecash:qp89xgjhcqdnzzemts0aj378nfe2mhu9yvxj9nhgg6"
                },
                {
                    "path": 145,
                    "hash160": "d4fa9b3f5e2e4a4cda30c6b2c8f32b23ab1de2be",
                    "cashAddress": "ecash:qr2048ewc70t7dhr0hrfv8j3w7pw8x6f4jvp5uqdf8",
                    "wif": "KxbQDnzDeqWMzZHwRVTWGs9nH4PTbKLRWWeBsM8mnK7Ea9C4VWqZ"
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_ownership_is_case_insensitive() {
        let wallet = wallet();
        assert!(wallet.owns_hash160("4E532257C01B310B3B5C1FD947C79A72ADDF8523"));
        assert!(!wallet.owns_hash160("0000000000000000000000000000000000000000"));
        assert_eq!(
            wallet
                .path_for_hash160("d4fa9b3f5e2e4a4cda30c6b2c8f32b23ab1de2be")
                .map(|p| p.path),
            Some(145)
        );
    }

    #[test]
    fn test_private_key_availability() {
        let mut wallet = wallet();
        assert!(wallet.has_private_keys());
        assert_eq!(wallet.first_keyed_path().map(|p| p.path), Some(145));

        wallet.paths[1].wif = None;
        assert!(!wallet.has_private_keys());
        assert!(wallet.first_keyed_path().is_none());
    }

    #[test]
    fn test_wif_is_not_serialized() {
        let value = serde_json::to_value(wallet()).unwrap();
        assert!(value["paths"][1].get("wif").is_none());
        assert_eq!(value["paths"][1]["cashAddress"], "ecash:qr2048ewc70t7dhr0hrfv8j3w7pw8x6f4jvp5uqdf8");
    }
}
