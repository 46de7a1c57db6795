//! Script construction, classification and address encoding.
//!
//! Provides the Script type, opcode definitions, script chunk parsing,
//! network parameters, and the address codec for every supported
//! locking-script layout.

pub mod address;
pub mod chunk;
pub mod network;
pub mod opcodes;
pub mod script;

mod error;
pub use address::{classify, decode, encode, Address, AddressType};
pub use chunk::ScriptChunk;
pub use error::ScriptError;
pub use network::{Network, NetworkParams};
pub use script::Script;
