//! lua-dap - Debug Adapter Protocol bridge to a remote Lua script runtime
//!
//! The adapter speaks DAP over stdin/stdout to an IDE and a poll-based
//! tagged-message protocol to the script runtime's debug agent, making a
//! flat single-threaded scripting runtime look like a conformant DAP
//! debuggee.

pub mod adapter;
pub mod cli;
pub mod common;
pub mod dap;
pub mod remote;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use remote::{DebugRequest, RemoteTools, TargetMessage};
