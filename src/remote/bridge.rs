//! Remote transport bridge
//!
//! Owns the notion of a "desired target": discovery, liveness checks, and
//! the once-per-tick drain of inbound messages. The discovery and message
//! transport services sit behind the [`RemoteTools`] trait so the adapter
//! core never touches a socket directly.

use async_trait::async_trait;

use crate::common::Result;

use super::protocol::{DebugRequest, TargetMessage};

/// Identity and liveness of a discovered target endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    /// Stable identifier across reconnects; zero means "nothing chosen"
    pub persistent_id: u32,
    /// Human-readable endpoint name
    pub display_name: String,
    /// Whether the endpoint is currently reachable
    pub online: bool,
    /// Whether the endpoint accepts debug commands
    pub debuggable: bool,
}

impl EndpointInfo {
    /// A chosen endpoint has a nonzero persistent id
    pub fn is_valid(&self) -> bool {
        self.persistent_id != 0
    }
}

/// Discovery and message transport collaborator
///
/// The production implementation lives in [`super::transport`]; tests
/// substitute a recording mock.
#[async_trait]
pub trait RemoteTools: Send {
    /// The endpoint the user has chosen on the given capability channel,
    /// if any. Non-blocking; reflects current liveness.
    fn desired_endpoint(&self, channel: &str) -> Option<EndpointInfo>;

    /// Forward one tagged message to the endpoint
    async fn send_request(&mut self, target: &EndpointInfo, request: DebugRequest) -> Result<()>;

    /// Drain every message received on the channel since the last drain
    fn drain_received(&mut self, channel: &str) -> Vec<TargetMessage>;
}

/// Bridge between the adapter core and the remote tools service
pub struct RemoteBridge {
    tools: Box<dyn RemoteTools>,
    channel: &'static str,
    /// Cached endpoint; set at most once per session, never cleared
    endpoint: Option<EndpointInfo>,
}

impl RemoteBridge {
    pub fn new(tools: Box<dyn RemoteTools>, channel: &'static str) -> Self {
        Self {
            tools,
            channel,
            endpoint: None,
        }
    }

    /// True once an endpoint has been resolved this session
    pub fn target_resolved(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Look up the desired target, if it is in a debuggable state
    ///
    /// Resolution is re-checked on every call so liveness is current at
    /// send time; the cache only records that the endpoint was seen once.
    /// The two failure modes are logged distinctly - they are different
    /// user-visible situations.
    pub fn resolve_target(&mut self) -> Option<EndpointInfo> {
        let Some(info) = self.tools.desired_endpoint(self.channel) else {
            tracing::debug!("The user has not chosen a target to connect to");
            return None;
        };

        if !info.is_valid() {
            tracing::debug!("The user has not chosen a target to connect to");
            return None;
        }

        if !info.online || !info.debuggable {
            tracing::debug!(
                "Target '{}' is not in a state that allows debugging (offline or not debuggable)",
                info.display_name
            );
            return None;
        }

        if self.endpoint.is_none() {
            tracing::info!(
                "Resolved debug target '{}' (id {})",
                info.display_name,
                info.persistent_id
            );
            self.endpoint = Some(info.clone());
        }

        Some(info)
    }

    /// Send one tagged message to the target
    ///
    /// A send with no resolvable target is dropped; the DAP side has
    /// already answered, so this is best-effort by contract.
    pub async fn send(&mut self, request: DebugRequest) {
        let Some(target) = self.resolve_target() else {
            tracing::debug!("Dropping {:?}: no debuggable target", request.kind());
            return;
        };

        if let Err(e) = self.tools.send_request(&target, request).await {
            tracing::warn!("Failed to send message to target: {e}");
        }
    }

    /// Drain the inbound queue, once per scheduler tick
    ///
    /// Until an endpoint has been resolved this returns empty and uses
    /// the tick to attempt acquisition. Never blocks.
    pub fn poll(&mut self) -> Vec<TargetMessage> {
        if self.endpoint.is_none() {
            self.resolve_target();
            return Vec::new();
        }

        self.tools.drain_received(self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct FakeTools {
        endpoint: Option<EndpointInfo>,
        sent: Arc<Mutex<Vec<DebugRequest>>>,
        inbound: VecDeque<TargetMessage>,
    }

    #[async_trait]
    impl RemoteTools for FakeTools {
        fn desired_endpoint(&self, _channel: &str) -> Option<EndpointInfo> {
            self.endpoint.clone()
        }

        async fn send_request(
            &mut self,
            _target: &EndpointInfo,
            request: DebugRequest,
        ) -> Result<()> {
            self.sent.lock().unwrap().push(request);
            Ok(())
        }

        fn drain_received(&mut self, _channel: &str) -> Vec<TargetMessage> {
            self.inbound.drain(..).collect()
        }
    }

    fn online_endpoint() -> EndpointInfo {
        EndpointInfo {
            persistent_id: 42,
            display_name: "game".to_string(),
            online: true,
            debuggable: true,
        }
    }

    #[tokio::test]
    async fn test_send_drops_without_target() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut bridge = RemoteBridge::new(
            Box::new(FakeTools {
                endpoint: None,
                sent: sent.clone(),
                inbound: VecDeque::new(),
            }),
            "lua-tools",
        );

        bridge.send(DebugRequest::Continue).await;
        assert!(sent.lock().unwrap().is_empty());
        assert!(!bridge.target_resolved());
    }

    #[tokio::test]
    async fn test_send_drops_when_not_debuggable() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut bridge = RemoteBridge::new(
            Box::new(FakeTools {
                endpoint: Some(EndpointInfo {
                    debuggable: false,
                    ..online_endpoint()
                }),
                sent: sent.clone(),
                inbound: VecDeque::new(),
            }),
            "lua-tools",
        );

        bridge.send(DebugRequest::Continue).await;
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_poll_acquires_then_drains() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut bridge = RemoteBridge::new(
            Box::new(FakeTools {
                endpoint: Some(online_endpoint()),
                sent,
                inbound: VecDeque::from([TargetMessage::Unknown]),
            }),
            "lua-tools",
        );

        // First tick only acquires the endpoint
        assert!(bridge.poll().is_empty());
        assert!(bridge.target_resolved());

        // Second tick drains
        assert_eq!(bridge.poll(), vec![TargetMessage::Unknown]);
        // Queue was cleared; nothing is replayed
        assert!(bridge.poll().is_empty());
    }
}
