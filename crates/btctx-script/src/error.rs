/// Error types for script and address operations.
///
/// Covers parsing errors, push-data limits, address encoding and decoding,
/// and network parameter problems.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Generic invalid script error.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// Attempted to use `append_opcodes` for a push data opcode.
    #[error("use append_push_data for push data funcs: {0}")]
    InvalidOpcodeType(String),

    /// Invalid push data in an ASM string.
    #[error("invalid opcode data")]
    InvalidOpcodeData,

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Script is empty when a non-empty script was expected.
    #[error("script is empty")]
    EmptyScript,

    /// Script does not have the layout the caller asked about.
    #[error("not a {0} script")]
    WrongScriptType(&'static str),

    /// Not enough data in script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds the maximum encodable size.
    #[error("data too big")]
    DataTooBig,

    /// A push data part exceeds protocol limits.
    #[error("part too big '{0}'")]
    PartTooBig(usize),

    /// Address string could not be decoded.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Address or script type that has no encoding here.
    #[error("unsupported address type: {0}")]
    UnsupportedAddressType(String),

    /// Address belongs to a different network than the one requested.
    #[error("address {address} is not valid on {network}")]
    NetworkMismatch { address: String, network: String },

    /// Unknown network, or a network lacking the parameters an encoding needs.
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// Error from primitives crate.
    #[error("primitives error: {0}")]
    Primitives(#[from] btctx_primitives::PrimitivesError),
}
