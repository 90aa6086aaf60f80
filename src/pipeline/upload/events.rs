//! Upload progress notifications.
//!
//! Each state change of a batch produces an `UploadEvent`. Sinks decide how
//! to surface them: log lines, terminal toasts, or an in-memory list.

use std::sync::Mutex;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum UploadEvent {
    Rejected {
        file_name: String,
        reason: String,
    },
    BatchProgress {
        current: usize,
        total: usize,
        file_name: String,
    },
    Started {
        task_id: Uuid,
        file_name: String,
        attempt: u32,
        max_attempts: u32,
        timeout_secs: u64,
    },
    Retrying {
        task_id: Uuid,
        file_name: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    Succeeded {
        task_id: Uuid,
        file_name: String,
        attempts: u32,
    },
    Failed {
        task_id: Uuid,
        file_name: String,
        attempts: u32,
        error: String,
    },
    DemoFallback {
        task_id: Uuid,
        file_name: String,
        error: String,
    },
}

impl UploadEvent {
    /// One-line notification text.
    pub fn message(&self) -> String {
        match self {
            Self::Rejected { file_name, reason } => format!("{file_name} rejected: {reason}"),
            Self::BatchProgress {
                current,
                total,
                file_name,
            } => format!("[{current}/{total}] {file_name}"),
            Self::Started {
                file_name,
                attempt,
                max_attempts,
                timeout_secs,
                ..
            } => format!(
                "Uploading {file_name} (attempt {attempt}/{max_attempts}, timeout {timeout_secs}s)"
            ),
            Self::Retrying {
                file_name,
                attempt,
                delay_ms,
                error,
                ..
            } => format!(
                "{file_name}: attempt {attempt} failed ({error}), retrying in {:.1}s",
                *delay_ms as f64 / 1000.0
            ),
            Self::Succeeded {
                file_name,
                attempts,
                ..
            } => format!("{file_name} analyzed after {attempts} attempt(s)"),
            Self::Failed {
                file_name,
                attempts,
                error,
                ..
            } => format!("{file_name} failed after {attempts} attempt(s): {error}"),
            Self::DemoFallback {
                file_name, error, ..
            } => format!("{file_name}: backend unavailable ({error}), showing demo analysis"),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Failed { .. })
    }
}

/// Receiver of upload notifications.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &UploadEvent);
}

/// Default sink: structured log lines.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &UploadEvent) {
        if event.is_failure() {
            tracing::warn!(event = ?event, "{}", event.message());
        } else {
            tracing::info!("{}", event.message());
        }
    }
}

/// Collects events in memory, in emission order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<UploadEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UploadEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &UploadEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        let id = Uuid::new_v4();
        sink.emit(&UploadEvent::Started {
            task_id: id,
            file_name: "a.pdf".into(),
            attempt: 1,
            max_attempts: 4,
            timeout_secs: 30,
        });
        sink.emit(&UploadEvent::Succeeded {
            task_id: id,
            file_name: "a.pdf".into(),
            attempts: 1,
        });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], UploadEvent::Started { .. }));
        assert!(matches!(events[1], UploadEvent::Succeeded { .. }));
    }

    #[test]
    fn messages_are_readable() {
        let event = UploadEvent::Retrying {
            task_id: Uuid::nil(),
            file_name: "pid.pdf".into(),
            attempt: 2,
            delay_ms: 2000,
            error: "timed out".into(),
        };
        assert_eq!(
            event.message(),
            "pid.pdf: attempt 2 failed (timed out), retrying in 2.0s"
        );
    }

    #[test]
    fn event_serializes_with_stage_tag() {
        let event = UploadEvent::Rejected {
            file_name: "setup.exe".into(),
            reason: "Unsupported file type".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"stage\":\"rejected\""));
        assert!(event.is_failure());
    }
}
