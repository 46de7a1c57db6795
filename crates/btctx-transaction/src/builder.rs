//! Typestate transaction builder.
//!
//! A builder moves through four phases, each its own type:
//!
//! - [`Init`]: sender, change address and fee rate.
//! - [`Draft`]: inputs, outputs and UTXO selection.
//! - [`Built`]: funded, wrapped in an [`Envelope`] and decorated.
//! - [`Signed`]: every input finalized.
//!
//! Calls that configure the transaction never fail on their own. Their
//! errors accumulate and are reported together by [`TxBuilder::build`] or
//! [`TxBuilder::sign_with`] as [`TransactionError::Accumulated`].
//!
//! ```ignore
//! let signed = TxBuilder::new(Network::BitcoinTestnet3)
//!     .from("mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE")
//!     .fee_rate(2.0)
//!     .to("tb1qtsq9c4fje6qsmheql8gajwtrrdrs38kdzeersc", 10_000)
//!     .select_inputs(utxos)
//!     .build()?
//!     .sign_with(&EcdsaKeySigner::new(key), &pubkey)?;
//! let raw = signed.raw_tx();
//! ```

use btctx_primitives::chainhash::Hash;
use btctx_primitives::ec::PublicKey;
use btctx_script::{Address, AddressType, Network, Script};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::decorate::decorate_inputs;
use crate::envelope::Envelope;
use crate::fee::{calculate_fee, estimate_vsize, fund_transaction, validate_fee_rate, Funding};
use crate::inout::{TxInput, TxInputs, TxOutputs};
use crate::selection::select_utxos;
use crate::sign::sign_envelope;
use crate::signer::Signer;
use crate::transaction::{Transaction, TX_VERSION};
use crate::utxo::Utxo;
use crate::TransactionError;

/// Default fee rate in sat/vbyte.
pub const DEFAULT_FEE_RATE: f64 = 1.0;

fn default_fee_rate() -> f64 {
    DEFAULT_FEE_RATE
}

/// Serializable settings that seed a builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    pub network: Network,
    /// Fee rate in sat/vbyte.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,
    /// Address receiving change. Without one the funding loop is skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_address: Option<String>,
}

impl BuilderConfig {
    pub fn new(network: Network) -> Self {
        BuilderConfig {
            network,
            fee_rate: DEFAULT_FEE_RATE,
            change_address: None,
        }
    }
}

// -----------------------------------------------------------------------
// Phases
// -----------------------------------------------------------------------

/// Configuration phase.
#[derive(Debug)]
pub struct Init;

/// Input and output accumulation phase.
#[derive(Debug)]
pub struct Draft;

/// Funded and decorated, not yet signed.
#[derive(Debug)]
pub struct Built {
    envelope: Envelope,
    funding: Option<Funding>,
}

/// Every input signed and finalized.
#[derive(Debug)]
pub struct Signed {
    envelope: Envelope,
    tx: Transaction,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Init {}
    impl Sealed for super::Draft {}
}

/// Phases that still accept inputs and outputs.
pub trait Editable: sealed::Sealed {}
impl Editable for Init {}
impl Editable for Draft {}

/// Mutable state shared by every phase.
#[derive(Debug)]
struct TxContext {
    network: Network,
    fee_rate: f64,
    from: Option<Address>,
    /// Key owning `from`, when the sender was given as a public key.
    owner_key: Option<PublicKey>,
    change: Option<Address>,
    pool: Vec<Utxo>,
    inputs: TxInputs,
    outputs: TxOutputs,
    errors: Vec<TransactionError>,
}

impl TxContext {
    fn record<T>(&mut self, result: Result<T, TransactionError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(error = %err, "recorded builder error");
                self.errors.push(err);
                None
            }
        }
    }

    fn decode(&mut self, address: &str) -> Option<Address> {
        let result = Address::decode(address, self.network).map_err(TransactionError::from);
        self.record(result)
    }

    /// Require the inputs to cover the outputs plus the estimated fee.
    fn check_balance(&self) -> Result<(), TransactionError> {
        let vsize = estimate_vsize(&self.inputs.address_types(), &self.outputs.script_lens());
        let fee = calculate_fee(vsize, self.fee_rate);
        let inputs = self.inputs.amount_total()?;
        let outputs = self.outputs.amount_total()?;
        match outputs.checked_add(fee) {
            Some(needed) if inputs >= needed => {
                debug!(inputs, outputs, fee, surplus = inputs - needed, "inputs cover outputs");
                Ok(())
            }
            _ => Err(TransactionError::InsufficientFunds { inputs, outputs, fee }),
        }
    }

    fn check(&mut self) -> Result<(), TransactionError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(TransactionError::Accumulated(std::mem::take(&mut self.errors)))
    }
}

/// A transaction under construction, in phase `S`.
#[derive(Debug)]
pub struct TxBuilder<S> {
    ctx: TxContext,
    state: S,
}

impl<S> TxBuilder<S> {
    /// Configuration errors recorded so far.
    pub fn errors(&self) -> &[TransactionError] {
        &self.ctx.errors
    }

    pub fn network(&self) -> Network {
        self.ctx.network
    }

    fn into_phase<T>(self, state: T) -> TxBuilder<T> {
        TxBuilder { ctx: self.ctx, state }
    }
}

impl TxBuilder<Init> {
    pub fn new(network: Network) -> Self {
        TxBuilder {
            ctx: TxContext {
                network,
                fee_rate: DEFAULT_FEE_RATE,
                from: None,
                owner_key: None,
                change: None,
                pool: Vec::new(),
                inputs: TxInputs::new(),
                outputs: TxOutputs::new(),
                errors: Vec::new(),
            },
            state: Init,
        }
    }

    pub fn from_config(config: &BuilderConfig) -> Self {
        let builder = Self::new(config.network).fee_rate(config.fee_rate);
        match &config.change_address {
            Some(change) => builder.change(change),
            None => builder,
        }
    }

    /// Set the sender. Selected UTXOs are spent from this address.
    pub fn from(mut self, address: &str) -> Self {
        self.ctx.from = self.ctx.decode(address);
        self
    }

    /// Set the sender from its public key and address type.
    ///
    /// Knowing the key lets the built envelope carry the redeem and
    /// witness scripts of nested and P2WSH inputs, so a signer that never
    /// derives them can still sign.
    pub fn from_public_key(mut self, pubkey: &PublicKey, address_type: AddressType) -> Self {
        let address = Address::from_public_key(pubkey, address_type, self.ctx.network).map_err(TransactionError::from);
        self.ctx.from = self.ctx.record(address);
        self.ctx.owner_key = Some(pubkey.clone());
        self
    }

    /// Set the change address. Enables the funding loop at build time.
    pub fn change(mut self, address: &str) -> Self {
        self.ctx.change = self.ctx.decode(address);
        self
    }

    /// Set the fee rate in sat/vbyte.
    pub fn fee_rate(mut self, fee_rate: f64) -> Self {
        if self.ctx.record(validate_fee_rate(fee_rate)).is_some() {
            self.ctx.fee_rate = fee_rate;
        }
        self
    }
}

impl<S: Editable> TxBuilder<S> {
    /// Spend output `vout` of `prev_tx`, owned by `address`.
    pub fn add_input(mut self, prev_tx: Transaction, vout: u32, amount: u64, address: &str) -> TxBuilder<Draft> {
        let network = self.ctx.network;
        let txid = prev_tx.tx_hash();
        let result = self.ctx.inputs.add_input(network, Some(prev_tx), txid, vout, amount, address);
        self.ctx.record(result);
        self.into_phase(Draft)
    }

    /// Spend `txid:vout` given as a display-order txid.
    ///
    /// `prev_tx` is required for legacy outputs and optional otherwise.
    /// Its own txid is not checked against `txid`.
    pub fn add_input_outpoint(
        mut self,
        txid: &str,
        vout: u32,
        amount: u64,
        address: &str,
        prev_tx: Option<Transaction>,
    ) -> TxBuilder<Draft> {
        let network = self.ctx.network;
        let result = Hash::from_hex(txid)
            .map_err(TransactionError::from)
            .and_then(|txid| self.ctx.inputs.add_input(network, prev_tx, txid, vout, amount, address));
        self.ctx.record(result);
        self.into_phase(Draft)
    }

    /// Pay `amount` satoshis to `address`.
    pub fn to(mut self, address: &str, amount: u64) -> TxBuilder<Draft> {
        let network = self.ctx.network;
        let result = self.ctx.outputs.add_output_transfer(network, address, amount);
        self.ctx.record(result);
        self.into_phase(Draft)
    }

    /// Add an output with a raw locking script.
    pub fn add_output_script(mut self, locking_script: Script, amount: u64) -> TxBuilder<Draft> {
        self.ctx.outputs.add_output_script(locking_script, amount);
        self.into_phase(Draft)
    }
}

impl TxBuilder<Draft> {
    /// Select UTXOs from `pool` covering the current output total.
    ///
    /// The selected UTXOs become inputs owned by the sender; the rest stay
    /// available to the funding loop. The change address defaults to the
    /// sender.
    pub fn select_inputs(mut self, pool: Vec<Utxo>) -> Self {
        let from = match self.ctx.from.clone() {
            Some(from) => from,
            None => {
                self.ctx.errors.push(TransactionError::Configuration(
                    "select_inputs needs a from address".to_string(),
                ));
                return self;
            }
        };
        let total = self.ctx.outputs.amount_total();
        let target = match self.ctx.record(total) {
            Some(target) => target,
            None => return self,
        };
        match select_utxos(pool, target) {
            Ok(selection) => {
                debug!(target, selected = selection.selected.len(), "selected inputs");
                for utxo in selection.selected {
                    let input = TxInput::from_utxo(utxo, &from);
                    if let Some(input) = self.ctx.record(input) {
                        self.ctx.inputs.push(input);
                    }
                }
                self.ctx.pool = selection.unselected;
            }
            Err(failure) => {
                self.ctx.errors.push(failure.into());
            }
        }
        if self.ctx.change.is_none() {
            self.ctx.change = Some(from);
        }
        self
    }

    /// Fund, assemble and decorate the transaction.
    ///
    /// Without a change address no inputs are added and no change is
    /// produced, but the inputs must still cover the outputs plus the
    /// estimated fee; any surplus goes to the miner.
    ///
    /// # Returns
    /// The built phase, `Accumulated` if any configuration call failed, or
    /// the first funding or assembly error.
    pub fn build(mut self) -> Result<TxBuilder<Built>, TransactionError> {
        self.ctx.check()?;

        let funding = match self.ctx.change.clone() {
            Some(change) => {
                let ctx = &mut self.ctx;
                Some(fund_transaction(
                    &mut ctx.inputs,
                    &mut ctx.outputs,
                    &change,
                    ctx.fee_rate,
                    &mut ctx.pool,
                    ctx.from.as_ref(),
                )?)
            }
            None => None,
        };

        if self.ctx.inputs.is_empty() {
            return Err(TransactionError::InvalidTransaction("no inputs".to_string()));
        }
        if self.ctx.outputs.is_empty() {
            return Err(TransactionError::InvalidTransaction("no outputs".to_string()));
        }
        if funding.is_none() {
            self.ctx.check_balance()?;
        }

        if let Some(pubkey) = &self.ctx.owner_key {
            for input in self.ctx.inputs.iter_mut() {
                input.attach_public_key(pubkey)?;
            }
        }

        let mut tx = Transaction::new();
        tx.version = TX_VERSION;
        for input in self.ctx.inputs.to_wire() {
            tx.add_input(input);
        }
        for output in self.ctx.outputs.to_wire() {
            tx.add_output(output);
        }

        let mut envelope = Envelope::from_unsigned_tx(tx)?;
        decorate_inputs(&mut envelope, &self.ctx.inputs)?;

        info!(
            txid = %envelope.unsigned_tx.tx_hash(),
            inputs = envelope.unsigned_tx.input_count(),
            outputs = envelope.unsigned_tx.output_count(),
            fee = funding.map(|f| f.fee),
            vsize = funding.map(|f| f.vsize),
            "built transaction"
        );
        Ok(self.into_phase(Built { envelope, funding }))
    }
}

impl TxBuilder<Built> {
    /// The decorated, unsigned envelope.
    pub fn envelope(&self) -> &Envelope {
        &self.state.envelope
    }

    /// The funding summary, when a change address was set.
    pub fn funding(&self) -> Option<&Funding> {
        self.state.funding.as_ref()
    }

    /// The unsigned transaction in wire form.
    pub fn unsigned_raw_tx(&self) -> Vec<u8> {
        self.state.envelope.unsigned_tx.to_bytes()
    }

    /// Hand the envelope off, e.g. to a remote signer.
    pub fn into_envelope(self) -> Envelope {
        self.state.envelope
    }

    /// Sign every input with `signer`, owned by `pubkey`.
    pub fn sign_with(mut self, signer: &dyn Signer, pubkey: &PublicKey) -> Result<TxBuilder<Signed>, TransactionError> {
        self.ctx.check()?;
        let mut envelope = self.state.envelope;
        sign_envelope(&mut envelope, signer, pubkey)?;
        let tx = envelope.extract()?;
        Ok(TxBuilder {
            ctx: self.ctx,
            state: Signed { envelope, tx },
        })
    }
}

impl TxBuilder<Signed> {
    /// The signed, finalized envelope.
    pub fn envelope(&self) -> &Envelope {
        &self.state.envelope
    }

    pub fn transaction(&self) -> &Transaction {
        &self.state.tx
    }

    /// The network-ready transaction bytes.
    pub fn raw_tx(&self) -> Vec<u8> {
        self.state.tx.to_bytes()
    }

    pub fn raw_tx_hex(&self) -> String {
        self.state.tx.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btctx_primitives::ec::PrivateKey;
    use btctx_script::AddressType;

    use crate::input::TransactionInput;
    use crate::output::TransactionOutput;
    use crate::signer::EcdsaKeySigner;

    const KEY: &str = "1790962db820729606cd7b255ace1ac5ebb129ac8e9b2d8534d022194ab25b37";

    fn address(address_type: AddressType) -> Address {
        let key = PrivateKey::from_hex(KEY).unwrap();
        Address::from_public_key(&key.pub_key(), address_type, Network::BitcoinTestnet3).unwrap()
    }

    fn funding_tx(address: &Address, values: &[u64]) -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::new());
        for value in values {
            tx.add_output(TransactionOutput::with_script(*value, address.script.clone()));
        }
        tx
    }

    #[test]
    fn test_config_from_json() {
        let config: BuilderConfig =
            serde_json::from_str(r#"{"network":"btc-testnet3","change_address":"mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE"}"#)
                .unwrap();
        assert_eq!(config.network, Network::BitcoinTestnet3);
        assert_eq!(config.fee_rate, DEFAULT_FEE_RATE);
        let builder = TxBuilder::from_config(&config);
        assert!(builder.errors().is_empty());
        assert!(builder.ctx.change.is_some());

        let json = serde_json::to_string(&BuilderConfig::new(Network::Litecoin)).unwrap();
        assert_eq!(json, r#"{"network":"ltc","fee_rate":1.0}"#);
    }

    #[test]
    fn test_errors_accumulate_until_build() {
        let draft = TxBuilder::new(Network::BitcoinTestnet3)
            .from("not-an-address")
            .fee_rate(-3.0)
            .to("mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE", 0)
            .to("19PTbi6XQQg41LcTZHkf4UnJamfcPQxraw", 100);
        assert_eq!(draft.errors().len(), 4);
        match draft.build() {
            Err(TransactionError::Accumulated(errors)) => {
                assert_eq!(errors.len(), 4);
                assert!(matches!(errors[1], TransactionError::Configuration(_)));
            }
            other => panic!("expected accumulated errors, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_select_inputs_requires_sender() {
        let draft = TxBuilder::new(Network::BitcoinTestnet3)
            .to("mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE", 1000)
            .select_inputs(vec![Utxo::new(Hash::new([1; 32]), 0, 5000)]);
        assert_eq!(draft.errors().len(), 1);
    }

    #[test]
    fn test_build_without_inputs() {
        let err = TxBuilder::new(Network::BitcoinTestnet3)
            .to("mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE", 1000)
            .build()
            .unwrap_err();
        assert!(matches!(err, TransactionError::InvalidTransaction(_)));
    }

    #[test]
    fn test_build_funds_and_adds_change() {
        let sender = address(AddressType::P2wpkh);
        let prev = funding_tx(&sender, &[20_000, 7_000]);
        let pool = vec![
            Utxo::from_transaction(&prev, 0).unwrap(),
            Utxo::from_transaction(&prev, 1).unwrap(),
        ];
        let built = TxBuilder::new(Network::BitcoinTestnet3)
            .from(&sender.address_string)
            .fee_rate(2.0)
            .to("mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE", 15_000)
            .select_inputs(pool)
            .build()
            .unwrap();

        let tx = &built.envelope().unsigned_tx;
        let funding = built.funding().unwrap();
        assert_eq!(tx.input_count(), 1);
        assert_eq!(tx.output_count(), 2);
        assert!(tx.outputs[1].change);
        assert_eq!(tx.outputs[1].satoshis, 20_000 - 15_000 - funding.fee);
        assert_eq!(funding.fee, funding.vsize * 2);
        assert_eq!(tx.version, TX_VERSION);
    }

    #[test]
    fn test_sign_with_finalizes_every_input() {
        let key = PrivateKey::from_hex(KEY).unwrap();
        let sender = address(AddressType::P2pkh);
        let prev = funding_tx(&sender, &[5_000]);
        let built = TxBuilder::new(Network::BitcoinTestnet3)
            .add_input(prev, 0, 5_000, &sender.address_string)
            .to(&sender.address_string, 4_000)
            .build()
            .unwrap();
        assert!(built.unsigned_raw_tx().len() > 10);
        let signed = built.sign_with(&EcdsaKeySigner::new(key.clone()), &key.pub_key()).unwrap();
        assert!(signed.envelope().is_finalized());
        assert_eq!(signed.raw_tx(), signed.transaction().to_bytes());
        assert_eq!(signed.raw_tx_hex(), hex::encode(signed.raw_tx()));
    }

    #[test]
    fn test_build_without_change_requires_fee() {
        let sender = address(AddressType::P2pkh);
        let prev = funding_tx(&sender, &[5_000]);
        // One P2PKH input and one P2PKH output estimate at 192 vbytes.
        let err = TxBuilder::new(Network::BitcoinTestnet3)
            .fee_rate(2.0)
            .add_input(prev.clone(), 0, 5_000, &sender.address_string)
            .to(&sender.address_string, 4_700)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionError::InsufficientFunds { inputs: 5_000, outputs: 4_700, fee: 384 }
        ));

        let built = TxBuilder::new(Network::BitcoinTestnet3)
            .fee_rate(2.0)
            .add_input(prev, 0, 5_000, &sender.address_string)
            .to(&sender.address_string, 4_616)
            .build()
            .unwrap();
        assert!(built.funding().is_none());
        assert_eq!(built.envelope().unsigned_tx.output_count(), 1);
    }
}
