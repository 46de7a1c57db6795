//! Chain data collaborators.
//!
//! The builder never talks to the network. A [`ChainDataProvider`] supplies
//! prior transactions, UTXOs, fee estimates and broadcasting, and the
//! helpers here wire one into a transfer.

use std::collections::BTreeMap;

use btctx_primitives::chainhash::Hash;
use btctx_primitives::ec::PublicKey;
use btctx_script::Network;
use tracing::{debug, info, warn};

use crate::builder::DEFAULT_FEE_RATE;
use crate::envelope::Envelope;
use crate::error::BoxError;
use crate::signer::Signer;
use crate::transaction::Transaction;
use crate::transfer::new_transfer_tx;
use crate::utxo::Utxo;
use crate::TransactionError;

/// Confirmation target, in blocks, to fee rate in sat/vbyte.
pub type FeeEstimates = BTreeMap<String, f64>;

/// Confirmation target used when none is given.
pub const DEFAULT_CONFIRMATION_TARGET: &str = "6";

/// Source of chain data, such as an esplora client or a local node.
pub trait ChainDataProvider {
    /// Fetch the serialized transaction with display-order id `txid`.
    fn get_raw_tx(&self, txid: &Hash) -> Result<Vec<u8>, BoxError>;

    /// List the unspent outputs of `address`.
    fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>, BoxError>;

    /// Current fee estimates keyed by confirmation target.
    fn fee_estimates(&self) -> Result<FeeEstimates, BoxError>;

    /// Broadcast a hex-encoded transaction.
    ///
    /// # Returns
    /// The txid reported by the provider.
    fn broadcast_tx(&self, raw_tx_hex: &str) -> Result<String, BoxError>;
}

/// Attach the prior transaction to every UTXO that lacks one.
///
/// # Returns
/// An error if the provider fails or returns a transaction whose id does
/// not match the UTXO.
pub fn hydrate_utxos(provider: &dyn ChainDataProvider, utxos: &mut [Utxo]) -> Result<(), TransactionError> {
    for utxo in utxos.iter_mut().filter(|u| u.raw_tx.is_none()) {
        let raw = provider.get_raw_tx(&utxo.txid).map_err(TransactionError::Provider)?;
        let tx = Transaction::from_bytes(&raw)?;
        if tx.tx_hash() != utxo.txid {
            return Err(TransactionError::Configuration(format!(
                "provider returned {} for {}",
                tx.tx_hash(),
                utxo.txid
            )));
        }
        debug!(txid = %utxo.txid, vout = utxo.vout, "hydrated utxo");
        utxo.raw_tx = Some(tx);
    }
    Ok(())
}

/// Read the fee rate for `target` blocks from `estimates`.
///
/// Falls back to [`DEFAULT_FEE_RATE`] when the target is absent.
pub fn fee_rate_for_target(estimates: &FeeEstimates, target: &str) -> f64 {
    match estimates.get(target) {
        Some(rate) => *rate,
        None => {
            warn!(target, fallback = DEFAULT_FEE_RATE, "fee estimate target missing");
            DEFAULT_FEE_RATE
        }
    }
}

/// Build and sign a transfer using chain data from `provider`.
///
/// The UTXOs of `from` are fetched and hydrated, and the fee rate is read
/// for [`DEFAULT_CONFIRMATION_TARGET`].
///
/// # Returns
/// The finalized envelope, ready for [`broadcast`].
pub fn transfer_with_provider(
    provider: &dyn ChainDataProvider,
    network: Network,
    from: &str,
    recipients: &BTreeMap<String, u64>,
    change: Option<&str>,
    signer: &dyn Signer,
    pubkey: &PublicKey,
) -> Result<Envelope, TransactionError> {
    let mut utxos = provider.get_utxos(from).map_err(TransactionError::Provider)?;
    hydrate_utxos(provider, &mut utxos)?;
    let estimates = provider.fee_estimates().map_err(TransactionError::Provider)?;
    let fee_rate = fee_rate_for_target(&estimates, DEFAULT_CONFIRMATION_TARGET);
    debug!(utxos = utxos.len(), fee_rate, "fetched chain data");
    new_transfer_tx(network, utxos, from, recipients, change, Some((signer, pubkey)), fee_rate)
}

/// Extract the final transaction from `envelope` and broadcast it.
pub fn broadcast(provider: &dyn ChainDataProvider, envelope: &Envelope) -> Result<String, TransactionError> {
    let tx = envelope.extract()?;
    let txid = provider.broadcast_tx(&tx.to_hex()).map_err(TransactionError::Provider)?;
    info!(txid = %txid, "broadcast transaction");
    Ok(txid)
}
