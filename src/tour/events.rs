//! Domain events published by the host pages and the bus that carries them.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default broadcast channel capacity.
const DEFAULT_BUS_CAPACITY: usize = 64;

/// Subject name used when the attendance payload cannot be read.
pub const DEFAULT_SUBJECT: &str = "Student";

/// Subject name used when attendance ran but matched nobody.
pub const UNRECOGNIZED_SUBJECT: &str = "Unknown Student";

/// The six event names the tour listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    ClassCreated,
    StudentAdded,
    SessionCreated,
    SessionSelected,
    CameraStarted,
    AttendanceTaken,
}

impl EventKind {
    /// Every kind, in tour order.
    pub const ALL: [EventKind; 6] = [
        EventKind::ClassCreated,
        EventKind::StudentAdded,
        EventKind::SessionCreated,
        EventKind::SessionSelected,
        EventKind::CameraStarted,
        EventKind::AttendanceTaken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassCreated => "classCreated",
            Self::StudentAdded => "studentAdded",
            Self::SessionCreated => "sessionCreated",
            Self::SessionSelected => "sessionSelected",
            Self::CameraStarted => "cameraStarted",
            Self::AttendanceTaken => "attendanceTaken",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an `attendanceTaken` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendancePayload {
    /// Recognized subject, when the producer sends it structured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Legacy free-text result, e.g. `"Attendance taken: Alice (On time - 10:30:15)"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AttendancePayload {
    /// Payload carrying only the legacy result message.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            subject: None,
            message: Some(message.into()),
        }
    }

    /// Name to show in the success step. Never fails; falls back to
    /// [`DEFAULT_SUBJECT`].
    pub fn recognized_subject(&self) -> String {
        if let Some(subject) = self.subject.as_deref().map(str::trim) {
            if !subject.is_empty() {
                return subject.to_string();
            }
        }
        self.message
            .as_deref()
            .and_then(parse_attendance_message)
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string())
    }
}

fn attendance_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Attendance taken:\s*(?P<name>[^(]*?)\s*(?:\(|$)")
            .expect("attendance pattern is valid")
    })
}

/// Pull the subject name out of the legacy attendance message.
///
/// Returns `None` when the message has no `Attendance taken:` prefix.
pub fn parse_attendance_message(message: &str) -> Option<String> {
    let captures = attendance_pattern().captures(message)?;
    let name = captures.name("name")?.as_str().trim();
    if name.is_empty() {
        return None;
    }
    if name == "No match" {
        return Some(UNRECOGNIZED_SUBJECT.to_string());
    }
    Some(name.to_string())
}

/// An event emitted by a host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    ClassCreated,
    StudentAdded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        student_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        student_id: Option<String>,
    },
    SessionCreated,
    SessionSelected,
    CameraStarted,
    AttendanceTaken(AttendancePayload),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ClassCreated => EventKind::ClassCreated,
            Self::StudentAdded { .. } => EventKind::StudentAdded,
            Self::SessionCreated => EventKind::SessionCreated,
            Self::SessionSelected => EventKind::SessionSelected,
            Self::CameraStarted => EventKind::CameraStarted,
            Self::AttendanceTaken(_) => EventKind::AttendanceTaken,
        }
    }

    /// The event the manual test hook dispatches.
    pub fn test_student_added() -> Self {
        Self::StudentAdded {
            student_name: Some("Test Student".to_string()),
            student_id: Some("TEST123".to_string()),
        }
    }
}

/// Page-local event bus shared by the host and the tour.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BUS_CAPACITY);
        Self { tx }
    }

    /// Dispatch an event. Returns how many listeners saw it.
    pub fn publish(&self, event: DomainEvent) -> usize {
        tracing::debug!(event = %event.kind(), "Domain event dispatched");
        // No listeners is fine: the tour may not be running on this page
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
