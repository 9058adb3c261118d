//! TourHost — the page-level control surface around at most one controller.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;

use super::controller::{TourController, TourDeps};
use super::cursor::PersistedCursor;
use super::events::DomainEvent;
use super::navigation::Page;
use super::state::TourStatus;
use crate::config::PAGE_LOAD_DELAY;

/// Pause between tearing down an old session and launching a forced one.
const RESTART_DELAY: Duration = Duration::from_millis(100);

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "path", rename_all = "snake_case")]
pub enum StartOutcome {
    /// A session is running on this page.
    Started,
    /// The caller must load `path`; the tour resumes there.
    Redirect(String),
    /// The controller declined to run on this page.
    NotStarted,
}

/// Owns the live controller for the current page.
pub struct TourHost {
    deps: TourDeps,
    current: RwLock<Option<TourController>>,
}

impl TourHost {
    pub fn new(deps: TourDeps) -> Self {
        Self {
            deps,
            current: RwLock::new(None),
        }
    }

    pub fn deps(&self) -> &TourDeps {
        &self.deps
    }

    fn cursor(&self) -> PersistedCursor {
        PersistedCursor::new(self.deps.store.clone())
    }

    /// The live controller, if any. A controller that has torn itself down
    /// (closing screen dismissed, or timed out) is dropped here.
    pub async fn controller(&self) -> Option<TourController> {
        let mut current = self.current.write().await;
        if let Some(controller) = current.as_ref()
            && !controller.is_active().await
        {
            tracing::debug!("Dropping torn-down tour controller");
            *current = None;
        }
        current.clone()
    }

    /// A page finished loading. `server_requests_tour` is the start page's
    /// own verdict on whether this user still needs the tour.
    ///
    /// Returns true if a session was launched.
    pub async fn page_loaded(&self, server_requests_tour: bool) -> bool {
        if let Some(previous) = self.current.write().await.take() {
            previous.unload().await;
        }

        let cursor = self.cursor();
        let path = self.deps.surface.path();
        let launch = if cursor.take_resume_on_next_load() {
            tracing::info!(path = %path, "Resuming tour after redirect");
            true
        } else if Page::is_start_page(&path) {
            if !server_requests_tour {
                tracing::debug!("Start page did not request the tour");
            }
            server_requests_tour
        } else if cursor.load_completion_flag() {
            tracing::debug!(path = %path, "Tour already completed");
            false
        } else {
            true
        };
        if !launch {
            return false;
        }

        tokio::time::sleep(PAGE_LOAD_DELAY).await;
        self.launch().await
    }

    /// Start the tour, optionally forgetting all saved progress first.
    ///
    /// Off the start page this only arms the resume flag and asks the caller
    /// to navigate there.
    pub async fn start(&self, force_clear: bool) -> StartOutcome {
        let cursor = self.cursor();
        if force_clear {
            tracing::info!("Clearing saved tour state for a fresh start");
            cursor.reset();
        }
        if let Some(previous) = self.current.write().await.take() {
            previous.destroy().await;
        }

        let path = self.deps.surface.path();
        if !Page::is_start_page(&path) {
            let Some(target) = Page::START.path() else {
                return StartOutcome::NotStarted;
            };
            cursor.request_resume_on_next_load();
            tracing::info!(from = %path, to = target, "Redirecting to start page for the tour");
            return StartOutcome::Redirect(target.to_string());
        }

        tokio::time::sleep(RESTART_DELAY).await;
        if self.launch().await {
            StartOutcome::Started
        } else {
            StartOutcome::NotStarted
        }
    }

    /// Advance the live session, as its Next button would.
    pub async fn advance(&self) -> bool {
        match self.controller().await {
            Some(controller) => {
                controller.next().await;
                true
            }
            None => false,
        }
    }

    /// Tear the live session down and forget it.
    pub async fn teardown(&self) -> bool {
        match self.current.write().await.take() {
            Some(controller) => {
                controller.destroy().await;
                true
            }
            None => false,
        }
    }

    /// Dispatch a domain event on the page's bus.
    pub fn publish(&self, event: DomainEvent) -> usize {
        self.deps.bus.publish(event)
    }

    /// Manual test hook: pretend a student was just added.
    pub fn simulate_student_added(&self) -> usize {
        tracing::info!("Dispatching simulated studentAdded event");
        self.publish(DomainEvent::test_student_added())
    }

    pub async fn status(&self) -> TourStatus {
        match self.controller().await {
            Some(controller) => controller.status().await,
            None => TourStatus::idle(
                self.cursor().load_completion_flag(),
                self.deps.catalog.len(),
            ),
        }
    }

    async fn launch(&self) -> bool {
        let mut current = self.current.write().await;
        if let Some(previous) = current.take() {
            previous.destroy().await;
        }
        *current = TourController::launch(self.deps.clone()).await;
        current.is_some()
    }
}
