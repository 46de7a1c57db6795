//! Unspent outputs as reported by an esplora-style chain API.

use btctx_primitives::chainhash::Hash;
use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

/// Confirmation status of a UTXO.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStatus {
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<Hash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u64>,
}

/// An unspent output owned by the caller.
///
/// `raw_tx` caches the full prior transaction; it is required to spend
/// legacy outputs and is filled in by
/// [`hydrate_utxos`](crate::provider::hydrate_utxos).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: Hash,
    pub vout: u32,
    pub value: u64,
    #[serde(default)]
    pub status: BlockStatus,
    #[serde(skip)]
    pub raw_tx: Option<Transaction>,
}

impl Utxo {
    pub fn new(txid: Hash, vout: u32, value: u64) -> Self {
        Utxo {
            txid,
            vout,
            value,
            status: BlockStatus::default(),
            raw_tx: None,
        }
    }

    /// Build a UTXO for output `vout` of `tx`, keeping `tx` as its prior
    /// transaction.
    ///
    /// # Returns
    /// `None` if `tx` has no output `vout`.
    pub fn from_transaction(tx: &Transaction, vout: u32) -> Option<Self> {
        let output = tx.outputs.get(vout as usize)?;
        Some(Utxo {
            txid: tx.tx_hash(),
            vout,
            value: output.satoshis,
            status: BlockStatus::default(),
            raw_tx: Some(tx.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esplora_json() {
        let json = r#"[
            {"txid":"0b2c23f5c2e6326c90cfa1d3925b0d83f4b08035ca6af8fd8f606385dfbc5822","vout":1,
             "status":{"confirmed":true,"block_height":2530001,
                       "block_hash":"000000000000001a6b8d1e5c0e5b3e0f8a4d2f6b9c0e1d2f3a4b5c6d7e8f9a0b",
                       "block_time":1700000000},
             "value":63000},
            {"txid":"1111111111111111111111111111111111111111111111111111111111111111","vout":0,
             "status":{"confirmed":false},"value":5}
        ]"#;
        let utxos: Vec<Utxo> = serde_json::from_str(json).unwrap();
        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[0].value, 63000);
        assert_eq!(utxos[0].vout, 1);
        assert_eq!(
            utxos[0].txid.to_string(),
            "0b2c23f5c2e6326c90cfa1d3925b0d83f4b08035ca6af8fd8f606385dfbc5822"
        );
        assert_eq!(utxos[0].status.block_height, Some(2530001));
        assert!(!utxos[1].status.confirmed);
        assert!(utxos[1].raw_tx.is_none());
    }

    #[test]
    fn test_from_transaction_checks_index() {
        let tx = Transaction::new();
        assert!(Utxo::from_transaction(&tx, 0).is_none());
    }
}
