//! Command-to-message translation
//!
//! Pure, stateless mapping from DAP actions onto remote wire messages.
//! Each action maps to exactly one tagged message; there is no batching
//! and no retry. Control-flow responses have already been sent by the
//! time these messages go out, so a drop on an unresolved endpoint is
//! the documented best-effort behavior, not a failure.

use crate::remote::protocol::DebugRequest;

use super::breakpoints::BreakpointKey;

/// The wire message for a DAP control-flow command, if the protocol has
/// one. `pause` has no remote primitive: the agent only yields control at
/// a breakpoint, so a pause request is acknowledged and nothing is sent.
pub fn control_message(command: &str) -> Option<DebugRequest> {
    match command {
        "continue" => Some(DebugRequest::Continue),
        "next" => Some(DebugRequest::StepOver),
        "stepIn" => Some(DebugRequest::StepIn),
        "stepOut" => Some(DebugRequest::StepOut),
        "pause" => None,
        _ => None,
    }
}

/// Breakpoint registration message
pub fn add_breakpoint(key: &BreakpointKey) -> DebugRequest {
    DebugRequest::AddBreakpoint {
        path: key.path.clone(),
        line: key.line,
    }
}

/// Breakpoint removal message
pub fn remove_breakpoint(key: &BreakpointKey) -> DebugRequest {
    DebugRequest::RemoveBreakpoint {
        path: key.path.clone(),
        line: key.line,
    }
}

/// Attach the debugger to a script context
pub fn attach_debugger(context: &str) -> DebugRequest {
    DebugRequest::AttachDebugger {
        context: context.to_string(),
    }
}

/// Detach the debugger
pub fn detach_debugger() -> DebugRequest {
    DebugRequest::DetachDebugger
}

/// Enumerate script contexts
pub fn enum_contexts() -> DebugRequest {
    DebugRequest::EnumContexts
}

/// Enumerate locals at the current break position
pub fn enum_locals() -> DebugRequest {
    DebugRequest::EnumLocals
}

/// Fetch a variable's value
pub fn get_value(name: &str) -> DebugRequest {
    DebugRequest::GetValue {
        name: name.to_string(),
    }
}

/// Overwrite a variable's value
pub fn set_value(name: &str, value: &str) -> DebugRequest {
    DebugRequest::SetValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Fetch the current call stack
pub fn get_callstack() -> DebugRequest {
    DebugRequest::GetCallstack
}

/// Enumerate classes reflected into a script context
pub fn enum_registered_classes(context: &str) -> DebugRequest {
    DebugRequest::EnumRegisteredClasses {
        context: context.to_string(),
    }
}

/// Enumerate event buses reflected into a script context
pub fn enum_registered_ebuses(context: &str) -> DebugRequest {
    DebugRequest::EnumRegisteredEbuses {
        context: context.to_string(),
    }
}

/// Enumerate globals reflected into a script context
pub fn enum_registered_globals(context: &str) -> DebugRequest {
    DebugRequest::EnumRegisteredGlobals {
        context: context.to_string(),
    }
}
