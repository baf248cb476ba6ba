//! The debug adapter core
//!
//! Binds the DAP side to the remote bridge: one handler per DAP request,
//! a tick-based poll of the target's message queue, and the reaction
//! logic that turns asynchronous agent messages into DAP events.
//!
//! Concurrency model: the stdin reader task only posts parsed requests
//! into a channel; this module's select loop is the single owner of every
//! piece of mutable state (bridge, breakpoint set, cached target data).
//! Control-flow requests are answered before the target acknowledges -
//! the remote protocol has no synchronous acknowledgement tied to a DAP
//! request, so the adapter is deliberately fire-and-forget. The agent's
//! eventual ack is what produces the `continued` event.

pub mod breakpoints;
pub mod ids;
pub mod state;
pub mod translate;

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::common::Result;
use crate::dap::types::*;
use crate::dap::{self, DapWriter, WireLog};
use crate::remote::protocol::{AckCode, RequestKind, TargetMessage, LUA_TOOLS_CHANNEL};
use crate::remote::{RemoteBridge, RemoteTools};

use breakpoints::{to_target_key, AssetPaths, BreakpointKey};
use ids::SurrogateIds;
use state::{AttachState, SessionState, TargetData};

/// Adapter-level settings
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Script context the debugger attaches to once configuration is done
    pub script_context: String,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            script_context: "Default".to_string(),
        }
    }
}

/// The adapter: DAP session state machine plus remote reaction logic
pub struct DebugAdapter<W> {
    ids: SurrogateIds,
    writer: DapWriter<W>,
    wire_log: WireLog,
    bridge: RemoteBridge,
    paths: Box<dyn AssetPaths>,
    settings: AdapterSettings,
    session: SessionState,
    attach: AttachState,
    breakpoints: BTreeSet<BreakpointKey>,
    target: TargetData,
}

/// Run a full adapter session over the given byte streams
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    wire_log: WireLog,
    tools: Box<dyn RemoteTools>,
    paths: Box<dyn AssetPaths>,
    settings: AdapterSettings,
    tick_interval: Duration,
) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let requests = dap::spawn_reader(reader, wire_log.clone());
    let adapter = DebugAdapter::new(writer, wire_log, tools, paths, settings);
    adapter.run(requests, tick_interval).await
}

impl<W: AsyncWrite + Unpin> DebugAdapter<W> {
    pub fn new(
        writer: W,
        wire_log: WireLog,
        tools: Box<dyn RemoteTools>,
        paths: Box<dyn AssetPaths>,
        settings: AdapterSettings,
    ) -> Self {
        Self {
            ids: SurrogateIds::default(),
            writer: DapWriter::new(writer, wire_log.clone()),
            wire_log,
            bridge: RemoteBridge::new(tools, LUA_TOOLS_CHANNEL),
            paths,
            settings,
            session: SessionState::Unbound,
            attach: AttachState::Unresolved,
            breakpoints: BTreeSet::new(),
            target: TargetData::default(),
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.session
    }

    pub fn attach_state(&self) -> AttachState {
        self.attach
    }

    pub fn breakpoints(&self) -> &BTreeSet<BreakpointKey> {
        &self.breakpoints
    }

    /// Main loop: requests from the client and ticks of the bridge,
    /// serialized through one task. Neither arm blocks.
    pub async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<RequestMessage>,
        tick_interval: Duration,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe_request = requests.recv() => match maybe_request {
                    Some(request) => self.handle_request(request).await?,
                    None => {
                        tracing::info!("DAP transport closed; ending session");
                        self.session = SessionState::Closed;
                    }
                },
                _ = ticker.tick() => self.tick().await?,
            }

            if self.session == SessionState::Closed {
                break;
            }
        }

        self.wire_log.close();
        Ok(())
    }

    /// One scheduler tick: drain the target's queue and react
    pub async fn tick(&mut self) -> Result<()> {
        let messages = self.bridge.poll();

        if self.attach == AttachState::Unresolved && self.bridge.target_resolved() {
            self.attach = AttachState::Discovered;
        }

        for message in messages {
            self.react(message).await?;
        }
        Ok(())
    }

    // === DAP request handling ===

    pub async fn handle_request(&mut self, request: RequestMessage) -> Result<()> {
        match request.command.as_str() {
            "initialize" => self.on_initialize(request).await,
            "launch" | "attach" => {
                // The script runtime is already running inside the target
                // process; there is nothing to launch.
                self.writer.respond_success(&request, None).await
            }
            "setBreakpoints" => self.on_set_breakpoints(request).await,
            "setExceptionBreakpoints" => {
                // The script runtime has no exception model
                if self.session == SessionState::Initialized {
                    self.session = SessionState::Configuring;
                }
                self.writer.respond_success(&request, None).await
            }
            "configurationDone" => self.on_configuration_done(request).await,
            "threads" => self.on_threads(request).await,
            "stackTrace" => self.on_stack_trace(request).await,
            "scopes" => self.on_scopes(request).await,
            "variables" => self.on_variables(request).await,
            "source" => self.on_source(request).await,
            "pause" | "continue" | "next" | "stepIn" | "stepOut" => {
                self.on_control(request).await
            }
            "disconnect" => self.on_disconnect(request).await,
            other => {
                tracing::warn!("Unsupported DAP command: {other}");
                self.writer
                    .respond_error(&request, format!("Unsupported command '{other}'"))
                    .await
            }
        }
    }

    async fn on_initialize(&mut self, request: RequestMessage) -> Result<()> {
        let args: InitializeArguments = match request.parse_arguments() {
            Ok(args) => args,
            Err(e) => return self.writer.respond_error(&request, e.to_string()).await,
        };
        tracing::info!(
            "Initializing session for client '{}'",
            args.client_name.as_deref().unwrap_or("unknown")
        );

        self.session = SessionState::Initializing;

        let capabilities = Capabilities {
            supports_configuration_done_request: true,
            ..Default::default()
        };
        self.writer
            .respond_success(&request, Some(serde_json::to_value(&capabilities)?))
            .await?;

        // The initialized event must hit the wire after the initialize
        // response; both go through this task's writer, in this order.
        self.writer.send_event("initialized", None).await?;
        self.session = SessionState::Initialized;
        Ok(())
    }

    async fn on_set_breakpoints(&mut self, request: RequestMessage) -> Result<()> {
        let args: SetBreakpointsArguments = match request.parse_arguments() {
            Ok(args) => args,
            Err(e) => return self.writer.respond_error(&request, e.to_string()).await,
        };

        if self.session == SessionState::Initialized {
            self.session = SessionState::Configuring;
        }

        let matches_synthetic_source =
            args.source.source_reference == Some(self.ids.source_reference);

        if !matches_synthetic_source {
            // Not our document: report the entries unverified and send
            // nothing to the target.
            let breakpoints = args
                .breakpoints
                .iter()
                .map(|bp| Breakpoint {
                    id: None,
                    verified: false,
                    message: None,
                    source: None,
                    line: Some(bp.line),
                })
                .collect();
            let body = SetBreakpointsResponseBody { breakpoints };
            return self
                .writer
                .respond_success(&request, Some(serde_json::to_value(&body)?))
                .await;
        }

        let source_path = args
            .source
            .path
            .as_deref()
            .or(args.source.name.as_deref())
            .unwrap_or_default();

        let requested: Vec<BreakpointKey> = args
            .breakpoints
            .iter()
            .map(|bp| to_target_key(source_path, bp.line, self.paths.as_ref()))
            .collect();

        // DAP replaces the whole per-source set: clear what the client
        // dropped, then register every requested line.
        let document = requested
            .first()
            .map(|key| key.path.clone())
            .unwrap_or_else(|| {
                to_target_key(source_path, 0, self.paths.as_ref()).path
            });

        let stale: Vec<BreakpointKey> = self
            .breakpoints
            .iter()
            .filter(|key| key.path == document && !requested.contains(*key))
            .cloned()
            .collect();

        for key in stale {
            tracing::debug!("Removing breakpoint {}:{}", key.path, key.line);
            self.bridge.send(translate::remove_breakpoint(&key)).await;
            self.breakpoints.remove(&key);
        }

        for key in &requested {
            tracing::debug!("Adding breakpoint {}:{}", key.path, key.line);
            self.bridge.send(translate::add_breakpoint(key)).await;
            self.breakpoints.insert(key.clone());
        }

        let breakpoints = args
            .breakpoints
            .iter()
            .map(|bp| Breakpoint {
                id: None,
                verified: true,
                message: None,
                source: Some(args.source.clone()),
                line: Some(bp.line),
            })
            .collect();
        let body = SetBreakpointsResponseBody { breakpoints };
        self.writer
            .respond_success(&request, Some(serde_json::to_value(&body)?))
            .await
    }

    async fn on_configuration_done(&mut self, request: RequestMessage) -> Result<()> {
        self.writer.respond_success(&request, None).await?;

        let body = ThreadEventBody {
            reason: "started".to_string(),
            thread_id: self.ids.thread_id,
        };
        self.writer
            .send_event("thread", Some(serde_json::to_value(&body)?))
            .await?;

        self.session = SessionState::Running;
        tracing::info!("Session configured and running");

        // The runtime is already live; discover its contexts and attach
        // to the configured one.
        self.bridge.send(translate::enum_contexts()).await;
        self.bridge
            .send(translate::attach_debugger(&self.settings.script_context))
            .await;
        Ok(())
    }

    async fn on_threads(&mut self, request: RequestMessage) -> Result<()> {
        let body = ThreadsResponseBody {
            threads: vec![Thread {
                id: self.ids.thread_id,
                name: "MainThread".to_string(),
            }],
        };
        self.writer
            .respond_success(&request, Some(serde_json::to_value(&body)?))
            .await
    }

    async fn on_stack_trace(&mut self, request: RequestMessage) -> Result<()> {
        let args: StackTraceArguments = match request.parse_arguments() {
            Ok(args) => args,
            Err(e) => return self.writer.respond_error(&request, e.to_string()).await,
        };

        if !self.ids.validate_thread(args.thread_id) {
            return self
                .writer
                .respond_error(&request, format!("Unknown threadId '{}'", args.thread_id))
                .await;
        }

        let (module, line) = match &self.target.stop_location {
            Some((module, line)) => (Some(module.clone()), *line),
            None => (None, 0),
        };

        let frame = StackFrame {
            id: self.ids.frame_id,
            name: self
                .target
                .callstack
                .first()
                .cloned()
                .unwrap_or_else(|| "Lua".to_string()),
            source: Some(Source {
                name: Some(module.unwrap_or_else(|| "LuaScript".to_string())),
                path: None,
                source_reference: Some(self.ids.source_reference),
            }),
            line,
            column: 1,
        };

        let body = StackTraceResponseBody {
            total_frames: Some(1),
            stack_frames: vec![frame],
        };
        self.writer
            .respond_success(&request, Some(serde_json::to_value(&body)?))
            .await
    }

    async fn on_scopes(&mut self, request: RequestMessage) -> Result<()> {
        let args: ScopesArguments = match request.parse_arguments() {
            Ok(args) => args,
            Err(e) => return self.writer.respond_error(&request, e.to_string()).await,
        };

        if !self.ids.validate_frame(args.frame_id) {
            return self
                .writer
                .respond_error(&request, format!("Unknown frameId '{}'", args.frame_id))
                .await;
        }

        let body = ScopesResponseBody {
            scopes: vec![Scope {
                name: "Locals".to_string(),
                presentation_hint: Some("locals".to_string()),
                variables_reference: self.ids.variables_reference,
                expensive: false,
            }],
        };
        self.writer
            .respond_success(&request, Some(serde_json::to_value(&body)?))
            .await
    }

    async fn on_variables(&mut self, request: RequestMessage) -> Result<()> {
        let args: VariablesArguments = match request.parse_arguments() {
            Ok(args) => args,
            Err(e) => return self.writer.respond_error(&request, e.to_string()).await,
        };

        if !self.ids.validate_scope(args.variables_reference) {
            return self
                .writer
                .respond_error(
                    &request,
                    format!("Unknown variablesReference '{}'", args.variables_reference),
                )
                .await;
        }

        let variables = if self.target.locals.is_empty() {
            // Nothing polled from the target yet
            let line = self
                .target
                .stop_location
                .as_ref()
                .map(|(_, line)| *line)
                .unwrap_or(0);
            vec![Variable {
                name: "currentLine".to_string(),
                value: line.to_string(),
                type_name: Some("int".to_string()),
                variables_reference: 0,
            }]
        } else {
            self.target
                .locals
                .iter()
                .map(|name| Variable {
                    name: name.clone(),
                    value: self
                        .target
                        .values
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| "<unavailable>".to_string()),
                    type_name: None,
                    variables_reference: 0,
                })
                .collect()
        };

        let body = VariablesResponseBody { variables };
        self.writer
            .respond_success(&request, Some(serde_json::to_value(&body)?))
            .await
    }

    async fn on_source(&mut self, request: RequestMessage) -> Result<()> {
        let args: SourceArguments = match request.parse_arguments() {
            Ok(args) => args,
            Err(e) => return self.writer.respond_error(&request, e.to_string()).await,
        };

        let reference = args.effective_reference();
        if !self.ids.validate_source(reference) {
            return self
                .writer
                .respond_error(&request, format!("Unknown source reference '{reference}'"))
                .await;
        }

        let body = SourceResponseBody {
            content: "-- Lua sources are resident in the attached runtime.\n".to_string(),
            mime_type: None,
        };
        self.writer
            .respond_success(&request, Some(serde_json::to_value(&body)?))
            .await
    }

    /// pause / continue / next / stepIn / stepOut
    ///
    /// Responds immediately, then fires the wire message. The response
    /// never waits for the target; a missing target drops the message
    /// after the client has already been answered.
    async fn on_control(&mut self, request: RequestMessage) -> Result<()> {
        let body = if request.command == "continue" {
            Some(serde_json::to_value(&ContinueResponseBody {
                all_threads_continued: true,
            })?)
        } else {
            None
        };
        self.writer.respond_success(&request, body).await?;

        match translate::control_message(&request.command) {
            Some(message) => self.bridge.send(message).await,
            None => {
                tracing::debug!(
                    "'{}' has no remote counterpart; acknowledged only",
                    request.command
                );
            }
        }
        Ok(())
    }

    async fn on_disconnect(&mut self, request: RequestMessage) -> Result<()> {
        let args: DisconnectArguments = match request.parse_arguments() {
            Ok(args) => args,
            Err(e) => return self.writer.respond_error(&request, e.to_string()).await,
        };

        self.session = SessionState::Disconnecting;

        if args.terminate_debuggee == Some(true) {
            // The script context cannot be stopped; a terminate request
            // is honored as a plain detach.
            tracing::info!("terminateDebuggee requested; runtime keeps running after detach");
        }

        self.bridge.send(translate::detach_debugger()).await;
        self.writer.respond_success(&request, None).await?;

        tracing::info!("Session disconnecting");
        self.session = SessionState::Closed;
        Ok(())
    }

    // === Reactions to target messages ===

    async fn react(&mut self, message: TargetMessage) -> Result<()> {
        match message {
            TargetMessage::Ack { code, request } => self.react_ack(code, request).await,
            TargetMessage::BreakpointHit { module, line } => {
                self.react_breakpoint_hit(module, line).await
            }
            TargetMessage::BreakpointAdded { module, line } => {
                tracing::debug!("Debug agent registered breakpoint {module}:{line}");
                Ok(())
            }
            TargetMessage::BreakpointRemoved { module, line } => {
                tracing::debug!("Debug agent removed breakpoint {module}:{line}");
                Ok(())
            }
            TargetMessage::EnumContextsResult { names } => {
                tracing::info!("Target script contexts: {names:?}");
                self.target.contexts = names;
                Ok(())
            }
            TargetMessage::EnumLocalsResult { names } => {
                // Ask for each value; answers trickle in as GetValueResult
                for name in &names {
                    self.bridge.send(translate::get_value(name)).await;
                }
                self.target.values.retain(|name, _| names.contains(name));
                self.target.locals = names;
                Ok(())
            }
            TargetMessage::GetValueResult { name, value } => {
                self.target.values.insert(name, value);
                Ok(())
            }
            TargetMessage::SetValueResult { name, success } => {
                tracing::debug!("Set value '{name}': success={success}");
                Ok(())
            }
            TargetMessage::CallstackResult { callstack } => {
                self.target.callstack = callstack
                    .lines()
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                Ok(())
            }
            TargetMessage::RegisteredClassesResult { classes } => {
                self.target.classes = classes;
                Ok(())
            }
            TargetMessage::RegisteredEbusesResult { buses } => {
                self.target.ebuses = buses;
                Ok(())
            }
            TargetMessage::RegisteredGlobalsResult {
                methods,
                properties,
            } => {
                self.target.global_methods = methods;
                self.target.global_properties = properties;
                Ok(())
            }
            TargetMessage::Unknown => {
                // An unrecognized wire tag from the target is not fatal
                tracing::warn!("Ignoring unrecognized message from the debug agent");
                Ok(())
            }
        }
    }

    async fn react_ack(&mut self, code: AckCode, request: RequestKind) -> Result<()> {
        match code {
            AckCode::Ack => {
                if request.is_resume() {
                    tracing::debug!("Execution resumed ({request:?})");
                    self.target.clear_stop();
                    self.session = SessionState::Running;
                    let body = ContinuedEventBody {
                        thread_id: self.ids.thread_id,
                        all_threads_continued: true,
                    };
                    return self
                        .writer
                        .send_event("continued", Some(serde_json::to_value(&body)?))
                        .await;
                }

                match request {
                    RequestKind::AttachDebugger => {
                        tracing::info!("Debug agent accepted attach");
                        self.attach = AttachState::Attached;
                        self.notify_console("Debugger attached to script context\n")
                            .await?;

                        // Populate the reflection caches for the context
                        let context = self.settings.script_context.clone();
                        self.bridge
                            .send(translate::enum_registered_classes(&context))
                            .await;
                        self.bridge
                            .send(translate::enum_registered_ebuses(&context))
                            .await;
                        self.bridge
                            .send(translate::enum_registered_globals(&context))
                            .await;
                    }
                    RequestKind::DetachDebugger => {
                        tracing::info!("Debug agent confirmed detach");
                        self.attach = AttachState::Detached;
                        self.notify_console("Debugger detached\n").await?;
                    }
                    other => tracing::debug!("Debug agent: ack {other:?}"),
                }
                Ok(())
            }
            AckCode::IllegalOperation => {
                if request == RequestKind::AttachDebugger {
                    tracing::warn!("Debug agent refused the attach request");
                    self.notify_console("Debug agent refused the attach request\n")
                        .await?;
                } else {
                    tracing::warn!(
                        "Debug agent: illegal operation {request:?}. Script context is in the wrong state."
                    );
                }
                Ok(())
            }
            AckCode::AccessDenied => {
                tracing::warn!("Debug agent: access denied for {request:?}. Attach debugger first!");
                self.attach = AttachState::Detached;
                Ok(())
            }
            AckCode::InvalidCmd => {
                tracing::error!(
                    "The debug agent claims we sent it an invalid request ({request:?})"
                );
                Ok(())
            }
        }
    }

    async fn react_breakpoint_hit(&mut self, module: String, line: u32) -> Result<()> {
        tracing::info!("Breakpoint hit at {module}:{line}");

        self.session = SessionState::Paused;
        self.target.stop_location = Some((module, line));

        let body = StoppedEventBody {
            reason: "breakpoint".to_string(),
            description: None,
            thread_id: Some(self.ids.thread_id),
            all_threads_stopped: true,
            hit_breakpoint_ids: Vec::new(),
        };
        self.writer
            .send_event("stopped", Some(serde_json::to_value(&body)?))
            .await?;

        // Refresh the caches that back variables and stackTrace
        self.bridge.send(translate::enum_locals()).await;
        self.bridge.send(translate::get_callstack()).await;
        Ok(())
    }

    async fn notify_console(&mut self, text: &str) -> Result<()> {
        let body = OutputEventBody {
            category: Some("console".to_string()),
            output: text.to_string(),
        };
        self.writer
            .send_event("output", Some(serde_json::to_value(&body)?))
            .await
    }
}
