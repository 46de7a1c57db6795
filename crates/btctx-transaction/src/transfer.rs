//! One-call transfers from a UTXO pool.

use std::collections::BTreeMap;

use btctx_primitives::ec::PublicKey;
use btctx_script::Network;

use crate::builder::TxBuilder;
use crate::envelope::Envelope;
use crate::signer::Signer;
use crate::utxo::Utxo;
use crate::TransactionError;

/// Build a transfer from `from` to every recipient.
///
/// Recipients become outputs in lexicographic address order. Inputs are
/// selected from `utxos`, the rest of the pool funds the fee, and change
/// goes to `change` or back to `from`.
///
/// # Arguments
/// * `network`    - Network the addresses belong to.
/// * `utxos`      - Spendable outputs of `from`.
/// * `from`       - Sender address.
/// * `recipients` - Destination address to amount in satoshis.
/// * `change`     - Change address; defaults to `from`.
/// * `signer`     - Signing capability and its public key. Without one the
///   envelope is returned unsigned.
/// * `fee_rate`   - Fee rate in sat/vbyte.
///
/// # Returns
/// The decorated envelope, finalized when a signer was given.
pub fn new_transfer_tx(
    network: Network,
    utxos: Vec<Utxo>,
    from: &str,
    recipients: &BTreeMap<String, u64>,
    change: Option<&str>,
    signer: Option<(&dyn Signer, &PublicKey)>,
    fee_rate: f64,
) -> Result<Envelope, TransactionError> {
    let mut recipients = recipients.iter();
    let (first, amount) = recipients
        .next()
        .ok_or_else(|| TransactionError::Configuration("no recipients".to_string()))?;

    let init = TxBuilder::new(network)
        .from(from)
        .change(change.unwrap_or(from))
        .fee_rate(fee_rate);
    let mut draft = init.to(first, *amount);
    for (address, amount) in recipients {
        draft = draft.to(address, *amount);
    }

    let built = draft.select_inputs(utxos).build()?;
    match signer {
        Some((signer, pubkey)) => Ok(built.sign_with(signer, pubkey)?.envelope().clone()),
        None => Ok(built.into_envelope()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btctx_primitives::chainhash::Hash;
    use btctx_primitives::ec::PrivateKey;
    use btctx_script::{Address, AddressType};

    use crate::signer::EcdsaKeySigner;
    use crate::verify::verify_envelope;

    const KEY: &str = "1790962db820729606cd7b255ace1ac5ebb129ac8e9b2d8534d022194ab25b37";

    fn sender() -> (PrivateKey, Address) {
        let key = PrivateKey::from_hex(KEY).unwrap();
        let address =
            Address::from_public_key(&key.pub_key(), AddressType::P2wpkh, Network::BitcoinTestnet3).unwrap();
        (key, address)
    }

    fn pool() -> Vec<Utxo> {
        vec![
            Utxo::new(Hash::new([0x11; 32]), 0, 30_000),
            Utxo::new(Hash::new([0x22; 32]), 3, 4_000),
        ]
    }

    #[test]
    fn test_transfer_orders_recipients() {
        let (_, from) = sender();
        let mut recipients = BTreeMap::new();
        recipients.insert("tb1qtsq9c4fje6qsmheql8gajwtrrdrs38kdzeersc".to_string(), 2_000);
        recipients.insert("mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE".to_string(), 1_000);

        let envelope = new_transfer_tx(
            Network::BitcoinTestnet3,
            pool(),
            &from.address_string,
            &recipients,
            None,
            None,
            1.0,
        )
        .unwrap();

        let tx = &envelope.unsigned_tx;
        assert!(!envelope.is_finalized());
        assert_eq!(tx.input_count(), 1);
        assert_eq!(tx.outputs[0].satoshis, 1_000);
        assert!(tx.outputs[0].locking_script.is_p2pkh());
        assert_eq!(tx.outputs[1].satoshis, 2_000);
        assert!(tx.outputs[1].locking_script.is_p2wpkh());
        assert_eq!(tx.outputs[2].locking_script, from.script);
    }

    #[test]
    fn test_transfer_signed() {
        let (key, from) = sender();
        let signer = EcdsaKeySigner::new(key.clone());
        let signer: &dyn Signer = &signer;
        let pubkey = key.pub_key();
        let mut recipients = BTreeMap::new();
        recipients.insert("mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE".to_string(), 29_900);

        let envelope = new_transfer_tx(
            Network::BitcoinTestnet3,
            pool(),
            &from.address_string,
            &recipients,
            Some("mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE"),
            Some((signer, &pubkey)),
            2.0,
        )
        .unwrap();

        // 30_000 alone cannot pay the fee, so the funding loop adds 4_000.
        assert_eq!(envelope.unsigned_tx.input_count(), 2);
        assert!(envelope.is_finalized());
        verify_envelope(&envelope, &pubkey).unwrap();
    }

    #[test]
    fn test_transfer_without_recipients() {
        let (_, from) = sender();
        let err = new_transfer_tx(
            Network::BitcoinTestnet3,
            pool(),
            &from.address_string,
            &BTreeMap::new(),
            None,
            None,
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, TransactionError::Configuration(_)));
    }
}
