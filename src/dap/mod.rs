//! Debug Adapter Protocol plumbing
//!
//! Framing, message types, the client reader task, and the single writer
//! the adapter emits responses and events through.

pub mod codec;
pub mod connection;
pub mod types;
pub mod wire_log;

pub use connection::{spawn_reader, DapWriter};
pub use wire_log::WireLog;
