//! Optional mirror of the DAP wire traffic to a log sink
//!
//! Every framed message is appended to the sink with a direction marker,
//! which makes protocol disputes with an IDE diagnosable after the fact.
//! Close is idempotent; the session tears the sink down on disconnect and
//! again on drop.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared handle to the wire log sink
///
/// Cloned into the reader task; the writer side logs through the same
/// handle so both directions land in one file in arrival order.
#[derive(Clone)]
pub struct WireLog {
    sink: Arc<Mutex<Option<File>>>,
}

impl WireLog {
    /// Open a wire log at the given path, truncating any previous run
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            sink: Arc::new(Mutex::new(Some(file))),
        })
    }

    /// A handle that drops all traffic
    pub fn disabled() -> Self {
        Self {
            sink: Arc::new(Mutex::new(None)),
        }
    }

    /// Record a message received from the client
    pub fn log_recv(&self, json: &str) {
        self.write_line("<--", json);
    }

    /// Record a message sent to the client
    pub fn log_send(&self, json: &str) {
        self.write_line("-->", json);
    }

    /// Close the sink; safe to call more than once
    pub fn close(&self) {
        let mut guard = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(mut file) = guard.take() {
            let _ = file.flush();
        }
    }

    fn write_line(&self, direction: &str, json: &str) {
        let mut guard = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(file) = guard.as_mut() {
            if let Err(e) = writeln!(file, "{direction} {json}") {
                tracing::warn!("wire log write failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wire.log");

        let log = WireLog::open(&path).unwrap();
        log.log_recv(r#"{"command":"initialize"}"#);
        log.log_send(r#"{"event":"initialized"}"#);
        log.close();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(r#"<-- {"command":"initialize"}"#));
        assert!(content.contains(r#"--> {"event":"initialized"}"#));
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wire.log");

        let log = WireLog::open(&path).unwrap();
        log.close();
        log.close();

        // Writes after close are dropped, not errors
        log.log_send("late");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_disabled_sink_drops_traffic() {
        let log = WireLog::disabled();
        log.log_recv("ignored");
        log.close();
    }
}
