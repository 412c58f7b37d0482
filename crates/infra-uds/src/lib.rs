// sockrpc Infrastructure - Unix socket adapters
// Implements: Wire Adapter (newline-delimited JSON-RPC), socket dial/bind

pub mod codec;
pub mod transport;

pub use codec::{Inbound, WireConnection, DEFAULT_MAX_FRAME_BYTES};
pub use transport::{bind, dial, remove_socket};
