#![deny(missing_docs)]

//! Bitcoin transaction builder SDK.
//!
//! Re-exports the primitives, script and transaction crates for
//! single-crate usage, plus the types most callers need.

pub use btctx_primitives as primitives;
pub use btctx_script as script;
pub use btctx_transaction as transaction;

pub use btctx_script::{Address, AddressType, Network};
pub use btctx_transaction::{
    BuilderConfig, ChainDataProvider, EcdsaKeySigner, Envelope, SchnorrKeySigner, Signer, TransactionError,
    TxBuilder, Utxo,
};
