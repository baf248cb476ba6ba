//! Remote debugging wire protocol message types
//!
//! Tagged messages exchanged with the script runtime's debug agent.
//! Outbound requests are fire-and-forget; the agent answers with
//! acknowledgements and result messages on its own schedule, correlated
//! only by the echoed request kind. Everything is serde-tagged JSON on
//! a length-prefixed frame.

use serde::{Deserialize, Serialize};

/// Capability key of the Lua tools channel
///
/// Discovery and message traffic for the script debugger ride this
/// channel; an endpoint advertising a different channel is not a valid
/// debug target.
pub const LUA_TOOLS_CHANNEL: &str = "lua-tools";

/// Outbound request to the debug agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebugRequest {
    /// Ask the agent which script contexts exist
    EnumContexts,

    /// Attach the debugger to a script context
    AttachDebugger { context: String },

    /// Detach the debugger
    DetachDebugger,

    /// Enumerate classes reflected into a script context
    EnumRegisteredClasses { context: String },

    /// Enumerate event buses reflected into a script context
    EnumRegisteredEbuses { context: String },

    /// Enumerate globals reflected into a script context
    EnumRegisteredGlobals { context: String },

    /// Set a breakpoint at a sentinel-prefixed relative path and line
    AddBreakpoint { path: String, line: u32 },

    /// Remove a previously set breakpoint
    RemoveBreakpoint { path: String, line: u32 },

    // === Execution control ===
    StepOver,
    StepIn,
    StepOut,
    Continue,

    /// Enumerate local variables at the current break position
    EnumLocals,

    /// Fetch the value of a variable
    GetValue { name: String },

    /// Overwrite the value of a variable
    SetValue { name: String, value: String },

    /// Fetch the current call stack
    GetCallstack,
}

impl DebugRequest {
    /// The correlation kind echoed back in acknowledgements
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::EnumContexts => RequestKind::EnumContexts,
            Self::AttachDebugger { .. } => RequestKind::AttachDebugger,
            Self::DetachDebugger => RequestKind::DetachDebugger,
            Self::EnumRegisteredClasses { .. } => RequestKind::EnumRegisteredClasses,
            Self::EnumRegisteredEbuses { .. } => RequestKind::EnumRegisteredEbuses,
            Self::EnumRegisteredGlobals { .. } => RequestKind::EnumRegisteredGlobals,
            Self::AddBreakpoint { .. } => RequestKind::AddBreakpoint,
            Self::RemoveBreakpoint { .. } => RequestKind::RemoveBreakpoint,
            Self::StepOver => RequestKind::StepOver,
            Self::StepIn => RequestKind::StepIn,
            Self::StepOut => RequestKind::StepOut,
            Self::Continue => RequestKind::Continue,
            Self::EnumLocals => RequestKind::EnumLocals,
            Self::GetValue { .. } => RequestKind::GetValue,
            Self::SetValue { .. } => RequestKind::SetValue,
            Self::GetCallstack => RequestKind::GetCallstack,
        }
    }
}

/// Request kind codes used for acknowledgement correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    EnumContexts,
    AttachDebugger,
    DetachDebugger,
    EnumRegisteredClasses,
    EnumRegisteredEbuses,
    EnumRegisteredGlobals,
    AddBreakpoint,
    RemoveBreakpoint,
    StepOver,
    StepIn,
    StepOut,
    Continue,
    EnumLocals,
    GetValue,
    SetValue,
    GetCallstack,
}

impl RequestKind {
    /// True for the four execution-resume requests
    pub fn is_resume(self) -> bool {
        matches!(
            self,
            Self::Continue | Self::StepOver | Self::StepIn | Self::StepOut
        )
    }
}

/// Acknowledgement codes carried on inbound acks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckCode {
    /// Request accepted
    Ack,
    /// Script context is in the wrong state for the request
    IllegalOperation,
    /// No debugger attached; attach first
    AccessDenied,
    /// The agent did not recognize the request
    InvalidCmd,
}

/// Inbound message from the debug agent
///
/// The `Unknown` arm absorbs wire tags this adapter does not know;
/// an unrecognized message is logged and ignored, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetMessage {
    /// Acknowledgement of an earlier request
    Ack { code: AckCode, request: RequestKind },

    /// Execution stopped on a breakpoint
    BreakpointHit { module: String, line: u32 },

    /// A breakpoint was registered on the agent side
    BreakpointAdded { module: String, line: u32 },

    /// A breakpoint was removed on the agent side
    BreakpointRemoved { module: String, line: u32 },

    /// Script context names known to the agent
    EnumContextsResult { names: Vec<String> },

    /// Local variable names at the current break position
    EnumLocalsResult { names: Vec<String> },

    /// Value of a single variable
    GetValueResult { name: String, value: String },

    /// Outcome of a set-value request
    SetValueResult { name: String, success: bool },

    /// Newline-separated call stack dump
    CallstackResult { callstack: String },

    /// Classes reflected into the attached context
    RegisteredClassesResult { classes: Vec<String> },

    /// Event buses reflected into the attached context
    RegisteredEbusesResult { buses: Vec<String> },

    /// Globals reflected into the attached context
    RegisteredGlobalsResult {
        methods: Vec<String>,
        properties: Vec<String>,
    },

    /// Anything this adapter does not recognize
    #[serde(other)]
    Unknown,
}

/// Greeting frame sent by the debug agent when a connection opens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetHello {
    /// Stable identifier of the endpoint across reconnects
    pub persistent_id: u32,
    /// Human-readable endpoint name
    pub display_name: String,
    /// Whether the endpoint accepts debug commands
    pub debuggable: bool,
    /// Capability channel the endpoint serves
    pub channel: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_tags() {
        let json = serde_json::to_string(&DebugRequest::AddBreakpoint {
            path: "@scripts/ai.lua".to_string(),
            line: 12,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"add_breakpoint","path":"@scripts/ai.lua","line":12}"#
        );

        let json = serde_json::to_string(&DebugRequest::Continue).unwrap();
        assert_eq!(json, r#"{"type":"continue"}"#);
    }

    #[test]
    fn test_ack_correlation_kinds() {
        assert_eq!(
            DebugRequest::AttachDebugger {
                context: "Default".to_string()
            }
            .kind(),
            RequestKind::AttachDebugger
        );
        assert!(RequestKind::StepOut.is_resume());
        assert!(!RequestKind::AddBreakpoint.is_resume());
    }

    #[test]
    fn test_parse_ack() {
        let msg: TargetMessage =
            serde_json::from_str(r#"{"type":"ack","code":"access_denied","request":"enum_locals"}"#)
                .unwrap();
        assert_eq!(
            msg,
            TargetMessage::Ack {
                code: AckCode::AccessDenied,
                request: RequestKind::EnumLocals,
            }
        );
    }

    #[test]
    fn test_unknown_wire_tag_is_not_an_error() {
        let msg: TargetMessage =
            serde_json::from_str(r#"{"type":"profiler_sample"}"#).unwrap();
        assert_eq!(msg, TargetMessage::Unknown);
    }
}
