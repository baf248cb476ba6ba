//! Surrogate identity table
//!
//! The script runtime exposes exactly one thread, one stack frame, one
//! variable scope and one source document, so the adapter stands in with
//! four fixed identifiers. They are assigned at session creation and
//! never change; any request carrying a different id is a protocol error
//! answered with a DAP error response, not forwarded to the target.

/// The four fixed identifiers presented to the DAP client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurrogateIds {
    pub thread_id: i64,
    pub frame_id: i64,
    pub variables_reference: i64,
    pub source_reference: i64,
}

impl Default for SurrogateIds {
    fn default() -> Self {
        Self {
            thread_id: 100,
            frame_id: 200,
            variables_reference: 300,
            source_reference: 400,
        }
    }
}

impl SurrogateIds {
    pub fn validate_thread(&self, id: i64) -> bool {
        id == self.thread_id
    }

    pub fn validate_frame(&self, id: i64) -> bool {
        id == self.frame_id
    }

    pub fn validate_scope(&self, id: i64) -> bool {
        id == self.variables_reference
    }

    pub fn validate_source(&self, id: i64) -> bool {
        id == self.source_reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        let ids = SurrogateIds::default();
        assert_eq!(ids.thread_id, 100);
        assert_eq!(ids.frame_id, 200);
        assert_eq!(ids.variables_reference, 300);
        assert_eq!(ids.source_reference, 400);
    }

    #[test]
    fn test_validation_rejects_foreign_ids() {
        let ids = SurrogateIds::default();
        assert!(ids.validate_thread(100));
        assert!(!ids.validate_thread(200));
        assert!(ids.validate_frame(200));
        assert!(!ids.validate_frame(100));
        assert!(ids.validate_scope(300));
        assert!(!ids.validate_scope(0));
        assert!(ids.validate_source(400));
        assert!(!ids.validate_source(-400));
    }
}
