//! Remote debugging side: wire protocol, discovery bridge, TCP transport

pub mod bridge;
pub mod protocol;
pub mod transport;

pub use bridge::{EndpointInfo, RemoteBridge, RemoteTools};
pub use protocol::{AckCode, DebugRequest, RequestKind, TargetMessage, LUA_TOOLS_CHANNEL};
