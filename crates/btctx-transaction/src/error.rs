use std::fmt;

/// Boxed error returned by signing capabilities and data providers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for building, funding, signing and serializing transactions.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// A builder call received a bad address, amount, network or fee rate.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The inputs cannot cover the outputs plus the fee.
    #[error("insufficient funds, input: {inputs}, output: {outputs}, fee: {fee}")]
    InsufficientFunds { inputs: u64, outputs: u64, fee: u64 },

    /// UTXO selection could not reach the target from the pool.
    #[error("insufficient balance | available: {available} | target: {target}")]
    InsufficientBalance { target: u64, available: u64 },

    /// The locking script has a layout this crate does not spend.
    #[error("unsupported script: {0}")]
    UnsupportedScript(String),

    /// A script could not be parsed.
    #[error("malformed script: {0}")]
    MalformedScript(String),

    /// Signing was attempted before an input carried the metadata it needs.
    #[error("input {index}: missing {what}")]
    MissingDecoration { index: usize, what: &'static str },

    /// The signing capability failed or returned an unusable signature.
    #[error("input {index}: signing failed: {reason}")]
    SignatureFailure { index: usize, reason: String },

    /// A signature is present but the final scriptSig or witness could not be assembled.
    #[error("input {index}: finalize failed: {reason}")]
    FinalizeFailure { index: usize, reason: String },

    /// `hash160(redeem_script)` does not match the P2SH locking script.
    #[error("input {index}: invalid redeem script")]
    InvalidRedeemScript { index: usize },

    /// `sha256(witness_script)` does not match the P2WSH program.
    #[error("input {index}: witness script hash mismatch")]
    InvalidWitnessScript { index: usize },

    /// The signing public key does not own the output being spent.
    #[error("input {index}: public key does not match locking script")]
    KeyMismatch { index: usize },

    /// A produced signature does not check out against the expected key.
    #[error("input {index}: verification failed: {reason}")]
    VerificationFailed { index: usize, reason: String },

    /// The transaction structure is invalid (e.g. missing inputs or outputs).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// A chain data provider call failed.
    #[error("data provider error: {0}")]
    Provider(#[source] BoxError),

    /// Every configuration error recorded by a builder, in call order.
    #[error("{}", JoinedErrors(.0))]
    Accumulated(Vec<TransactionError>),

    /// An underlying script error (forwarded from `btctx-script`).
    #[error("script error: {0}")]
    Script(#[from] btctx_script::ScriptError),

    /// An underlying primitives error (forwarded from `btctx-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] btctx_primitives::PrimitivesError),
}

impl TransactionError {
    /// Flatten nested `Accumulated` errors into a single list.
    pub fn into_errors(self) -> Vec<TransactionError> {
        match self {
            TransactionError::Accumulated(errs) => {
                errs.into_iter().flat_map(TransactionError::into_errors).collect()
            }
            other => vec![other],
        }
    }
}

struct JoinedErrors<'a>(&'a [TransactionError]);

impl fmt::Display for JoinedErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}
