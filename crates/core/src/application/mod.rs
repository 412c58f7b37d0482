// Application Layer - Registration and dispatch

pub mod chain;
mod panic_guard;
pub mod registry;
mod shutdown;

// Re-exports
pub use chain::Chain;
pub use panic_guard::{execute_guarded, execute_guarded_async, PanicGuardResult};
pub use registry::{HandlerEntry, Registry};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
