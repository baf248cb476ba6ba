//! TCP transport to the script runtime's debug agent
//!
//! Frames are length-prefixed JSON. A connector task dials the configured
//! address until the agent answers, validates the hello greeting, then
//! pumps inbound frames into a queue the bridge drains once per tick.
//! When the connection drops the endpoint goes offline; it is never reset
//! to unresolved within a session.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::common::{Error, Result};

use super::bridge::{EndpointInfo, RemoteTools};
use super::protocol::{DebugRequest, TargetHello, TargetMessage, LUA_TOOLS_CHANNEL};

/// Maximum frame size (10 MB)
const MAX_FRAME_SIZE: u32 = 10 * 1024 * 1024;

/// Delay between connection attempts while the agent is unreachable
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Send a length-prefixed JSON frame
pub async fn send_frame<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let data = serde_json::to_vec(message)?;
    if data.len() > MAX_FRAME_SIZE as usize {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "Frame too large"));
    }

    let len = data.len() as u32;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

/// Receive a length-prefixed JSON frame
pub async fn recv_frame<R, T>(reader: &mut R) -> io::Result<T>
where
    R: AsyncReadExt + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf);

    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Frame too large: {} bytes", len),
        ));
    }

    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data).await?;
    serde_json::from_slice(&data).map_err(io::Error::from)
}

/// Connection state shared with the connector task
struct Shared {
    endpoint: Mutex<Option<EndpointInfo>>,
    online: AtomicBool,
}

/// Production [`RemoteTools`] over a TCP connection
pub struct TcpRemoteTools {
    shared: Arc<Shared>,
    inbound: mpsc::UnboundedReceiver<TargetMessage>,
    outbound: mpsc::UnboundedSender<DebugRequest>,
}

impl TcpRemoteTools {
    /// Start connecting to the agent at `addr` in the background
    ///
    /// Returns immediately; the endpoint stays undiscovered until the
    /// agent answers with a valid hello. Commands issued meanwhile are
    /// dropped by the bridge per the best-effort contract.
    pub fn connect(addr: String) -> Self {
        let shared = Arc::new(Shared {
            endpoint: Mutex::new(None),
            online: AtomicBool::new(false),
        });
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(connector(addr, shared.clone(), inbound_tx, outbound_rx));

        Self {
            shared,
            inbound: inbound_rx,
            outbound: outbound_tx,
        }
    }
}

#[async_trait]
impl RemoteTools for TcpRemoteTools {
    fn desired_endpoint(&self, channel: &str) -> Option<EndpointInfo> {
        if channel != LUA_TOOLS_CHANNEL {
            return None;
        }

        let guard = match self.shared.endpoint.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone().map(|mut info| {
            info.online = self.shared.online.load(Ordering::Acquire);
            info
        })
    }

    async fn send_request(&mut self, target: &EndpointInfo, request: DebugRequest) -> Result<()> {
        if !self.shared.online.load(Ordering::Acquire) {
            return Err(Error::TargetOffline);
        }

        tracing::trace!("-> {} {:?}", target.display_name, request.kind());
        self.outbound
            .send(request)
            .map_err(|_| Error::remote("connection writer has shut down"))
    }

    fn drain_received(&mut self, channel: &str) -> Vec<TargetMessage> {
        if channel != LUA_TOOLS_CHANNEL {
            return Vec::new();
        }

        let mut messages = Vec::new();
        while let Ok(msg) = self.inbound.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

/// Stand-in used when no target address is configured
///
/// Every lookup reports "nothing chosen", which keeps the adapter in
/// the documented commands-drop-silently state instead of failing.
pub struct UnconfiguredRemoteTools;

#[async_trait]
impl RemoteTools for UnconfiguredRemoteTools {
    fn desired_endpoint(&self, _channel: &str) -> Option<EndpointInfo> {
        None
    }

    async fn send_request(&mut self, _target: &EndpointInfo, _request: DebugRequest) -> Result<()> {
        Err(Error::TargetOffline)
    }

    fn drain_received(&mut self, _channel: &str) -> Vec<TargetMessage> {
        Vec::new()
    }
}

/// Dial the agent, greet, then pump frames until the connection drops
async fn connector(
    addr: String,
    shared: Arc<Shared>,
    inbound: mpsc::UnboundedSender<TargetMessage>,
    mut outbound: mpsc::UnboundedReceiver<DebugRequest>,
) {
    let stream = loop {
        match TcpStream::connect(&addr).await {
            Ok(stream) => break stream,
            Err(e) => {
                tracing::trace!("Target {addr} unreachable: {e}");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("set_nodelay failed: {e}");
    }

    let (mut reader, mut writer) = stream.into_split();

    let hello: TargetHello = match recv_frame(&mut reader).await {
        Ok(hello) => hello,
        Err(e) => {
            tracing::warn!("Target at {addr} closed before greeting: {e}");
            return;
        }
    };

    if hello.channel != LUA_TOOLS_CHANNEL {
        tracing::warn!(
            "Endpoint '{}' serves channel '{}', not '{}'; ignoring it",
            hello.display_name,
            hello.channel,
            LUA_TOOLS_CHANNEL
        );
        return;
    }

    tracing::info!(
        "Connected to '{}' (id {}, debuggable: {})",
        hello.display_name,
        hello.persistent_id,
        hello.debuggable
    );

    {
        let mut guard = match shared.endpoint.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(EndpointInfo {
            persistent_id: hello.persistent_id,
            display_name: hello.display_name.clone(),
            online: true,
            debuggable: hello.debuggable,
        });
    }
    shared.online.store(true, Ordering::Release);

    let writer_task = tokio::spawn(async move {
        while let Some(request) = outbound.recv().await {
            if let Err(e) = send_frame(&mut writer, &request).await {
                tracing::warn!("Write to target failed: {e}");
                break;
            }
        }
    });

    loop {
        match recv_frame::<_, TargetMessage>(&mut reader).await {
            Ok(msg) => {
                if inbound.send(msg).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::info!("Target '{}' went offline: {e}", hello.display_name);
                break;
            }
        }
    }

    shared.online.store(false, Ordering::Release);
    writer_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        send_frame(&mut a, &DebugRequest::EnumLocals).await.unwrap();
        let msg: DebugRequest = recv_frame(&mut b).await.unwrap();
        assert_eq!(msg, DebugRequest::EnumLocals);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);

        // Hand-write a frame header claiming an absurd length
        a.write_all(&(MAX_FRAME_SIZE + 1).to_le_bytes()).await.unwrap();
        let result: io::Result<TargetMessage> = recv_frame(&mut b).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_discovers_endpoint_after_hello() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut tools = TcpRemoteTools::connect(addr);
        assert!(tools.desired_endpoint(LUA_TOOLS_CHANNEL).is_none());

        let (mut agent, _) = listener.accept().await.unwrap();
        send_frame(
            &mut agent,
            &TargetHello {
                persistent_id: 7,
                display_name: "game".to_string(),
                debuggable: true,
                channel: LUA_TOOLS_CHANNEL.to_string(),
            },
        )
        .await
        .unwrap();

        // Give the connector task a moment to record the endpoint
        let mut endpoint = None;
        for _ in 0..50 {
            endpoint = tools.desired_endpoint(LUA_TOOLS_CHANNEL);
            if endpoint.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let endpoint = endpoint.expect("endpoint should be discovered");
        assert_eq!(endpoint.persistent_id, 7);
        assert!(endpoint.online && endpoint.debuggable);

        // Inbound frames land in the drain queue
        send_frame(
            &mut agent,
            &TargetMessage::BreakpointHit {
                module: "@scripts/ai.lua".to_string(),
                line: 3,
            },
        )
        .await
        .unwrap();

        let mut drained = Vec::new();
        for _ in 0..50 {
            drained = tools.drain_received(LUA_TOOLS_CHANNEL);
            if !drained.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            drained,
            vec![TargetMessage::BreakpointHit {
                module: "@scripts/ai.lua".to_string(),
                line: 3,
            }]
        );
    }
}
