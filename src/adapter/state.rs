//! Session lifecycle and cached target state

use std::collections::HashMap;

/// DAP session lifecycle
///
/// Created when the adapter process starts, destroyed when the client
/// disconnects or the stream closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No client bound yet
    Unbound,
    /// Initialize request received, response in flight
    Initializing,
    /// Initialized event sent
    Initialized,
    /// Client is sending configuration (breakpoints)
    Configuring,
    /// Session is live; the script runtime may or may not be resolved
    Running,
    /// Stopped on a breakpoint
    Paused,
    /// Disconnect received, tearing down
    Disconnecting,
    /// Session over
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbound => write!(f, "unbound"),
            Self::Initializing => write!(f, "initializing"),
            Self::Initialized => write!(f, "initialized"),
            Self::Configuring => write!(f, "configuring"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Disconnecting => write!(f, "disconnecting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Attachment to the remote script runtime, tracked independently of the
/// session: a session can be running with the target still unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    /// No endpoint resolved yet
    Unresolved,
    /// Endpoint resolved, debugger not attached
    Discovered,
    /// Debugger attached to a script context
    Attached,
    /// Debugger detached (by us or by the agent)
    Detached,
}

impl std::fmt::Display for AttachState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved => write!(f, "unresolved"),
            Self::Discovered => write!(f, "discovered"),
            Self::Attached => write!(f, "attached"),
            Self::Detached => write!(f, "detached"),
        }
    }
}

/// State polled out of the target, cached for DAP data requests
#[derive(Debug, Default)]
pub struct TargetData {
    /// Local variable names from the last enum-locals result
    pub locals: Vec<String>,
    /// Variable values from get-value results
    pub values: HashMap<String, String>,
    /// Call stack lines from the last get-callstack result
    pub callstack: Vec<String>,
    /// Script context names known to the agent
    pub contexts: Vec<String>,
    /// Reflected class names
    pub classes: Vec<String>,
    /// Reflected event bus names
    pub ebuses: Vec<String>,
    /// Reflected global methods and properties
    pub global_methods: Vec<String>,
    pub global_properties: Vec<String>,
    /// Where execution stopped, when paused: (module, line)
    pub stop_location: Option<(String, u32)>,
}

impl TargetData {
    /// Forget break-position data when execution resumes
    pub fn clear_stop(&mut self) {
        self.locals.clear();
        self.values.clear();
        self.callstack.clear();
        self.stop_location = None;
    }
}
