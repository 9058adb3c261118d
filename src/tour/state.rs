//! Tour session state — phase, cursor position and the status snapshot.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle phase of the tour for this browser profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourPhase {
    /// No live session; the engine is not running on this page.
    NotStarted,
    /// A session is walking the steps.
    Active,
    /// The completion flag has been committed.
    Completed,
}

impl std::fmt::Display for TourPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Active => "active",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Mutable state of one page load's tour session.
#[derive(Debug, Clone)]
pub struct TourSession {
    pub id: Uuid,
    pub phase: TourPhase,
    pub current_step: usize,
    /// Only grows until a full reset.
    pub completed_steps: BTreeSet<usize>,
    /// Cleared by teardown; every delayed callback checks it first.
    pub is_active: bool,
    /// Name taken from the last attendance event.
    pub recognized_subject: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TourSession {
    pub fn start(current_step: usize, completed_steps: BTreeSet<usize>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: TourPhase::Active,
            current_step,
            completed_steps,
            is_active: true,
            recognized_subject: None,
            completed_at: None,
        }
    }

    /// The session is live and accepting step transitions.
    pub fn is_running(&self) -> bool {
        self.is_active && self.phase == TourPhase::Active
    }

    /// The session is still on `step` and accepting transitions.
    pub fn is_on(&self, step: usize) -> bool {
        self.is_running() && self.current_step == step
    }
}

/// Serializable snapshot returned by the control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourStatus {
    pub session_id: Option<Uuid>,
    pub phase: TourPhase,
    pub active: bool,
    pub step: Option<usize>,
    pub title: Option<String>,
    pub total_steps: usize,
    pub completed_steps: Vec<usize>,
    pub overlay_visible: bool,
    pub recognized_subject: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TourStatus {
    /// Status when no session is live on the page.
    pub fn idle(completed: bool, total_steps: usize) -> Self {
        Self {
            session_id: None,
            phase: if completed {
                TourPhase::Completed
            } else {
                TourPhase::NotStarted
            },
            active: false,
            step: None,
            title: None,
            total_steps,
            completed_steps: Vec::new(),
            overlay_visible: false,
            recognized_subject: None,
            completed_at: None,
        }
    }
}
