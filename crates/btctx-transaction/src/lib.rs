//! Funding, signing and serialization of multi-type bitcoin transactions.
//!
//! - Wire transactions with BIP144 witness serialization
//! - Legacy, BIP143 and BIP341 signature digests
//! - UTXO selection and the fee-aware funding loop
//! - A BIP174-style signing envelope with input decoration, signing,
//!   finalization and verification
//! - The [`TxBuilder`] typestate assembler and chain data collaborators

pub mod builder;
pub mod decorate;
pub mod envelope;
pub mod fee;
pub mod inout;
pub mod input;
pub mod output;
pub mod provider;
pub mod selection;
pub mod sighash;
pub mod sign;
pub mod signer;
pub mod transaction;
pub mod transfer;
pub mod utxo;
pub mod verify;
pub mod witness;

mod error;
pub use builder::{BuilderConfig, Built, Draft, Init, Signed, TxBuilder};
pub use envelope::Envelope;
pub use error::{BoxError, TransactionError};
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use provider::ChainDataProvider;
pub use signer::{EcdsaKeySigner, SchnorrKeySigner, Signer, SignerError};
pub use transaction::Transaction;
pub use utxo::Utxo;
pub use witness::Witness;
