//! Builder-side inputs and outputs.
//!
//! A [`TxInput`] remembers everything needed to decorate and sign the
//! spend later: the resolved address and its type, the amount, and either
//! the full prior transaction or just the prior output.

use btctx_primitives::chainhash::Hash;
use btctx_primitives::ec::PublicKey;
use btctx_primitives::hash::{hash160, sha256};
use btctx_script::{Address, AddressType, Network, Script};

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::utxo::Utxo;
use crate::TransactionError;

/// An input queued in a builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub txid: Hash,
    pub vout: u32,
    pub amount: u64,
    /// The address owning the prior output.
    pub address: Address,
    /// The full prior transaction, required for legacy spends.
    pub prev_tx: Option<Transaction>,
    /// The output being spent. Taken from `prev_tx` when present,
    /// otherwise rebuilt from `amount` and the address script.
    pub prev_output: TransactionOutput,
    /// P2SH redeem script, when the owning key is known.
    pub redeem_script: Option<Script>,
    /// P2WSH witness script, when the owning key is known.
    pub witness_script: Option<Script>,
}

impl TxInput {
    /// Create an input spending `txid:vout`.
    ///
    /// # Arguments
    /// * `txid`    - The prior transaction id.
    /// * `vout`    - The output index being spent.
    /// * `amount`  - The value of that output in satoshis.
    /// * `address` - The address the output pays to.
    /// * `prev_tx` - The full prior transaction, if known.
    ///
    /// # Returns
    /// The input, or a `Configuration` error when `prev_tx` has no output
    /// `vout`, or that output disagrees with `amount` or `address`.
    pub fn new(
        txid: Hash,
        vout: u32,
        amount: u64,
        address: Address,
        prev_tx: Option<Transaction>,
    ) -> Result<Self, TransactionError> {
        let prev_output = match &prev_tx {
            Some(tx) => {
                let output = tx.outputs.get(vout as usize).ok_or_else(|| {
                    TransactionError::Configuration(format!(
                        "prior transaction {} has no output {}",
                        txid, vout
                    ))
                })?;
                if output.satoshis != amount {
                    return Err(TransactionError::Configuration(format!(
                        "input {}:{} amount {} does not match prior output value {}",
                        txid, vout, amount, output.satoshis
                    )));
                }
                if output.locking_script != address.script {
                    return Err(TransactionError::Configuration(format!(
                        "input {}:{} does not pay to {}",
                        txid, vout, address
                    )));
                }
                TransactionOutput::with_script(output.satoshis, output.locking_script.clone())
            }
            None => TransactionOutput::with_script(amount, address.script.clone()),
        };
        Ok(TxInput {
            txid,
            vout,
            amount,
            address,
            prev_tx,
            prev_output,
            redeem_script: None,
            witness_script: None,
        })
    }

    /// Create an input spending `utxo`, owned by `address`.
    pub fn from_utxo(utxo: Utxo, address: &Address) -> Result<Self, TransactionError> {
        Self::new(utxo.txid, utxo.vout, utxo.value, address.clone(), utxo.raw_tx)
    }

    pub fn address_type(&self) -> AddressType {
        self.address.address_type
    }

    /// Record the redeem and witness scripts revealed when `pubkey` spends
    /// this input.
    ///
    /// Nested segwit outputs get the P2WPKH or P2WSH redeem script and
    /// P2WSH outputs get the single-key witness script `<pubkey> OP_CHECKSIG`.
    /// Inputs `pubkey` does not commit to are left unchanged.
    pub fn attach_public_key(&mut self, pubkey: &PublicKey) -> Result<(), TransactionError> {
        let single_key = Script::p2pk(&pubkey.serialize())?;
        let wsh = Script::p2wsh(&sha256(single_key.to_bytes()));
        let script = &self.address.script;

        if script.is_p2sh() {
            let script_hash = script.script_hash()?;
            let wpkh = Script::p2wpkh(&pubkey.hash160());
            if hash160(wpkh.to_bytes()) == script_hash {
                self.redeem_script = Some(wpkh);
            } else if hash160(wsh.to_bytes()) == script_hash {
                self.redeem_script = Some(wsh);
                self.witness_script = Some(single_key);
            }
        } else if *script == wsh {
            self.witness_script = Some(single_key);
        }
        Ok(())
    }

    /// The unsigned wire input.
    pub fn to_wire(&self) -> TransactionInput {
        TransactionInput::from_outpoint(&self.txid, self.vout)
    }
}

fn checked_total(mut amounts: impl Iterator<Item = u64>, side: &str) -> Result<u64, TransactionError> {
    amounts
        .try_fold(0u64, u64::checked_add)
        .ok_or_else(|| TransactionError::Configuration(format!("{} total overflows", side)))
}

/// Ordered inputs of a transaction under construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxInputs(Vec<TxInput>);

impl TxInputs {
    pub fn new() -> Self {
        TxInputs(Vec::new())
    }

    pub fn push(&mut self, input: TxInput) {
        self.0.push(input);
    }

    /// Decode `address` for `network` and queue an input spending `txid:vout`.
    pub fn add_input(
        &mut self,
        network: Network,
        prev_tx: Option<Transaction>,
        txid: Hash,
        vout: u32,
        amount: u64,
        address: &str,
    ) -> Result<(), TransactionError> {
        let address = Address::decode(address, network)?;
        self.0.push(TxInput::new(txid, vout, amount, address, prev_tx)?);
        Ok(())
    }

    /// Sum of the input amounts.
    ///
    /// # Returns
    /// The total, or a `Configuration` error if it overflows `u64`.
    pub fn amount_total(&self) -> Result<u64, TransactionError> {
        checked_total(self.0.iter().map(|i| i.amount), "input")
    }

    pub fn address_types(&self) -> Vec<AddressType> {
        self.0.iter().map(TxInput::address_type).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TxInput> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TxInput> {
        self.0.iter_mut()
    }

    pub fn as_slice(&self) -> &[TxInput] {
        &self.0
    }

    /// The unsigned wire inputs, in order.
    pub fn to_wire(&self) -> Vec<TransactionInput> {
        self.0.iter().map(TxInput::to_wire).collect()
    }
}

/// An output queued in a builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub amount: u64,
    pub locking_script: Script,
    /// Set on the output synthesized by the funding loop.
    pub change: bool,
}

impl TxOutput {
    pub fn to_wire(&self) -> TransactionOutput {
        TransactionOutput {
            satoshis: self.amount,
            locking_script: self.locking_script.clone(),
            change: self.change,
        }
    }
}

/// Ordered outputs of a transaction under construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxOutputs(Vec<TxOutput>);

impl TxOutputs {
    pub fn new() -> Self {
        TxOutputs(Vec::new())
    }

    /// Queue a payment of `amount` to `address`.
    ///
    /// # Returns
    /// `Ok(())`, or an error if the address does not decode for `network`
    /// or the amount is zero.
    pub fn add_output_transfer(
        &mut self,
        network: Network,
        address: &str,
        amount: u64,
    ) -> Result<(), TransactionError> {
        if amount == 0 {
            return Err(TransactionError::Configuration(format!(
                "zero amount to {}",
                address
            )));
        }
        let address = Address::decode(address, network)?;
        self.add_output_script(address.script, amount);
        Ok(())
    }

    /// Queue an output with a raw locking script.
    pub fn add_output_script(&mut self, locking_script: Script, amount: u64) {
        self.0.push(TxOutput {
            amount,
            locking_script,
            change: false,
        });
    }

    /// Queue the change output.
    pub fn add_change(&mut self, locking_script: Script, amount: u64) {
        self.0.push(TxOutput {
            amount,
            locking_script,
            change: true,
        });
    }

    /// Sum of the output amounts.
    pub fn amount_total(&self) -> Result<u64, TransactionError> {
        checked_total(self.0.iter().map(|o| o.amount), "output")
    }

    /// Locking-script length of each output, in order.
    pub fn script_lens(&self) -> Vec<usize> {
        self.0.iter().map(|o| o.locking_script.len()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TxOutput> {
        self.0.iter()
    }

    pub fn to_wire(&self) -> Vec<TransactionOutput> {
        self.0.iter().map(TxOutput::to_wire).collect()
    }
}
