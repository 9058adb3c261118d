//! Tour controller — owns the session and drives step transitions.
//!
//! One controller exists per page load. It is a cheap `Clone` handle over
//! shared state so the event bridge and delayed callbacks can hold it; every
//! delayed callback re-checks the session before acting because the tour may
//! have been torn down while it slept.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use super::bridge::{BridgeHandle, EventBridge};
use super::catalog::{ModalLayout, StepCatalog};
use super::cursor::PersistedCursor;
use super::events::{EventBus, EventKind};
use super::navigation::Page;
use super::notify::CompletionNotifier;
use super::state::{TourPhase, TourSession, TourStatus};
use crate::config::{HIGHLIGHT_SCROLL_DELAY, SCROLL_SETTLE, TourConfig};
use crate::overlay::{ElementId, OverlayView, PageSurface, Progress};
use crate::store::KeyValueStore;

/// Title shown once the tour is complete.
pub const CLOSING_TITLE: &str = "🎉 All Done!";
/// Body shown once the tour is complete.
pub const CLOSING_BODY: &str = "You can always restart the tour from your settings. Happy teaching!";

/// Everything a controller needs from its environment.
#[derive(Clone)]
pub struct TourDeps {
    pub store: Arc<dyn KeyValueStore>,
    pub bus: EventBus,
    pub surface: Arc<dyn PageSurface>,
    pub notifier: Arc<dyn CompletionNotifier>,
    pub catalog: Arc<StepCatalog>,
    pub config: TourConfig,
}

/// Handle to the live tour session on this page.
#[derive(Clone)]
pub struct TourController {
    inner: Arc<Mutex<TourInner>>,
    catalog: Arc<StepCatalog>,
    config: Arc<TourConfig>,
}

struct TourInner {
    session: TourSession,
    cursor: PersistedCursor,
    overlay: OverlayView,
    notifier: Arc<dyn CompletionNotifier>,
    bridge: Option<BridgeHandle>,
    /// Bumped on every render; positioning callbacks from older renders bail.
    render_epoch: u64,
}

impl TourController {
    /// Start (or resume) the tour for the current page.
    ///
    /// Returns `None` when the tour was already completed and this load did
    /// not come from the start page.
    pub async fn launch(deps: TourDeps) -> Option<Self> {
        let TourDeps {
            store,
            bus,
            surface,
            notifier,
            catalog,
            config,
        } = deps;

        let path = surface.path();
        let cursor = PersistedCursor::new(store);
        let (start, completed_steps) = resume_point(&cursor, &catalog, &path)?;

        let session = TourSession::start(start, completed_steps);
        tracing::info!(session_id = %session.id, step = start, path = %path, "Tour started");

        let overlay = OverlayView::new(surface, config.narrow_viewport_px);
        let window = config.debounce_window();
        let controller = Self {
            inner: Arc::new(Mutex::new(TourInner {
                session,
                cursor,
                overlay,
                notifier,
                bridge: None,
                render_epoch: 0,
            })),
            catalog,
            config: Arc::new(config),
        };

        let bridge = EventBridge::attach(controller.clone(), &bus, window);
        {
            let mut inner = controller.inner.lock().await;
            inner.bridge = Some(bridge);
            inner.overlay.mount(controller.catalog.len());
            inner.render(&controller, start);
        }
        Some(controller)
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &TourConfig {
        &self.config
    }

    /// Next button. On the closing screen it acts as "Close".
    pub async fn next(&self) {
        let mut inner = self.inner.lock().await;
        if inner.session.phase == TourPhase::Completed {
            drop(inner);
            self.destroy().await;
            return;
        }
        if !inner.session.is_running() {
            return;
        }

        let index = inner.session.current_step;
        if let Ok(step) = self.catalog.get(index)
            && step.hide_overlay_on_next()
        {
            tracing::info!(step = index, event = ?step.wait_for_event(), "Overlay hidden until event");
            inner.overlay.hide();
            return;
        }
        inner.advance(self);
    }

    pub async fn previous(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.session.is_running() || inner.session.current_step == 0 {
            return;
        }
        let index = inner.session.current_step - 1;
        inner.render(self, index);
    }

    /// Skip (and the × button): finish the tour now.
    pub async fn skip(&self) {
        tracing::info!("Tour skipped");
        self.complete().await;
    }

    pub async fn complete(&self) {
        let mut inner = self.inner.lock().await;
        inner.complete(self);
    }

    /// Render step `index`. Out-of-range indices are a logged no-op.
    pub async fn show_step(&self, index: usize) -> bool {
        let mut inner = self.inner.lock().await;
        inner.render(self, index)
    }

    /// Feed a click on the element matching `selector`. Returns true if the
    /// click hid the overlay.
    pub async fn element_clicked(&self, selector: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.session.is_active {
            return false;
        }
        let Some(element) = inner.overlay.surface().query(selector) else {
            tracing::debug!(selector, "Click on unknown element");
            return false;
        };
        inner.overlay.handle_click(element)
    }

    pub async fn reveal(&self) {
        let mut inner = self.inner.lock().await;
        if inner.session.is_active {
            inner.overlay.show();
        }
    }

    pub async fn hide(&self) {
        let mut inner = self.inner.lock().await;
        if inner.session.is_active {
            inner.overlay.hide();
        }
    }

    /// Tear the tour down: listeners now, overlay node after the fade-out.
    pub async fn destroy(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.session.is_active {
            return;
        }
        inner.session.is_active = false;
        if let Some(bridge) = inner.bridge.take() {
            bridge.detach();
        }
        inner.overlay.begin_teardown();
        tracing::info!(session_id = %inner.session.id, "Tour torn down");

        let controller = self.clone();
        let fade_out = self.config.fade_out;
        tokio::spawn(async move {
            tokio::time::sleep(fade_out).await;
            controller.inner.lock().await.overlay.remove();
        });
    }

    /// The page is going away: stop listening but leave the overlay alone.
    pub async fn unload(&self) {
        let mut inner = self.inner.lock().await;
        inner.session.is_active = false;
        if let Some(bridge) = inner.bridge.take() {
            bridge.detach();
        }
        inner.overlay.forget();
        tracing::debug!(session_id = %inner.session.id, "Tour unloaded with page");
    }

    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.session.is_active
    }

    pub async fn status(&self) -> TourStatus {
        let inner = self.inner.lock().await;
        let session = &inner.session;
        let on_step = session.phase == TourPhase::Active;
        TourStatus {
            session_id: Some(session.id),
            phase: session.phase,
            active: session.is_active,
            step: on_step.then_some(session.current_step),
            title: on_step
                .then(|| self.catalog.get(session.current_step).ok())
                .flatten()
                .map(|step| step.title.clone()),
            total_steps: self.catalog.len(),
            completed_steps: session.completed_steps.iter().copied().collect(),
            overlay_visible: inner.overlay.is_visible(),
            recognized_subject: session.recognized_subject.clone(),
            completed_at: session.completed_at,
        }
    }

    // ── Event bridge hooks ──────────────────────────────────────────

    /// Index of the current step if it is waiting for `kind`.
    pub(crate) async fn awaiting(&self, kind: EventKind) -> Option<usize> {
        let inner = self.inner.lock().await;
        if !inner.session.is_running() {
            return None;
        }
        let index = inner.session.current_step;
        let step = self.catalog.get(index).ok()?;
        (step.wait_for_event() == Some(kind)).then_some(index)
    }

    /// Advance past `step` if the session has not moved on meanwhile.
    pub(crate) async fn advance_from(&self, step: usize) {
        let mut inner = self.inner.lock().await;
        if !inner.session.is_on(step) {
            tracing::debug!(step, "Session moved on, dropping delayed advance");
            return;
        }
        inner.advance(self);
    }

    /// Attendance result for `step`: store the subject and move the cursor
    /// onto the narrative step. Rendering follows after the transition delay.
    pub(crate) async fn record_attendance(&self, step: usize, subject: String) -> Option<usize> {
        let mut inner = self.inner.lock().await;
        if !inner.session.is_on(step) {
            return None;
        }
        tracing::info!(step, subject = %subject, "Attendance recognized");
        inner.session.recognized_subject = Some(subject);
        inner.mark_step_completed(step);
        let next = step + 1;
        if next > self.catalog.last_index() {
            inner.complete(self);
            return None;
        }
        inner.session.current_step = next;
        inner.overlay.show();
        Some(next)
    }

    /// Render `step` if it is still the current one.
    pub(crate) async fn show_step_if_current(&self, step: usize) {
        let mut inner = self.inner.lock().await;
        if inner.session.is_on(step) {
            inner.render(self, step);
        }
    }

    pub(crate) async fn is_narrow(&self) -> bool {
        self.inner.lock().await.overlay.is_narrow()
    }

    pub(crate) async fn scroll_to_top(&self) {
        let inner = self.inner.lock().await;
        if inner.session.is_active {
            inner.overlay.surface().scroll_to(0.0);
        }
    }

    // ── Positioning ─────────────────────────────────────────────────

    fn schedule_positioning(&self, epoch: u64, target: Option<ElementId>, layout: ModalLayout) {
        let controller = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(HIGHLIGHT_SCROLL_DELAY).await;
            let element = {
                let mut inner = controller.inner.lock().await;
                if !inner.is_current_render(epoch) {
                    return;
                }
                let Some(element) = target else {
                    inner.overlay.center();
                    return;
                };
                inner.overlay.scroll_into_view(element);
                if !inner.overlay.is_narrow() {
                    inner.overlay.center();
                    return;
                }
                element
            };

            // Measure only after the scroll has settled
            tokio::time::sleep(SCROLL_SETTLE).await;
            let mut inner = controller.inner.lock().await;
            if inner.is_current_render(epoch) {
                inner
                    .overlay
                    .place_opposite(element, layout == ModalLayout::Compact);
            }
        });
    }
}

impl TourInner {
    fn is_current_render(&self, epoch: u64) -> bool {
        self.session.is_active && self.render_epoch == epoch && self.overlay.is_mounted()
    }

    fn mark_step_completed(&mut self, index: usize) {
        let stored = self.cursor.mark_step_completed(index);
        self.session.completed_steps.insert(index);
        self.session.completed_steps.extend(stored);
    }

    /// Mark the current step done and move on, completing after the last.
    fn advance(&mut self, handle: &TourController) {
        let index = self.session.current_step;
        self.mark_step_completed(index);
        if index < handle.catalog.last_index() {
            tracing::info!(from = index, to = index + 1, "Advancing tour");
            self.render(handle, index + 1);
        } else {
            self.complete(handle);
        }
    }

    fn render(&mut self, handle: &TourController, index: usize) -> bool {
        if !self.session.is_running() {
            tracing::debug!(step = index, "Tour not running, ignoring render");
            return false;
        }
        let step = match handle.catalog.get(index) {
            Ok(step) => step,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring request for invalid step");
                return false;
            }
        };

        self.session.current_step = index;
        self.cursor.save_step_index(index);
        self.render_epoch += 1;
        tracing::info!(step = index, title = %step.title, "Showing step");

        if step.hide_overlay_on_show() {
            self.overlay.clear_highlights();
            self.overlay.hide();
            return true;
        }

        let total = handle.catalog.len();
        let body = step.render_content(self.session.recognized_subject.as_deref());
        let next_label = if step.target_drives_progress() {
            None
        } else if index == handle.catalog.last_index() {
            Some("Complete".to_string())
        } else {
            Some("Next".to_string())
        };
        self.overlay.update(|modal| {
            modal.title = step.title.clone();
            modal.body = body;
            modal.progress = Progress { index, total };
            modal.skip_visible = true;
            modal.previous_visible = index > 0;
            modal.next_label = next_label;
        });

        self.overlay.clear_highlights();
        let target = step
            .target
            .as_deref()
            .and_then(|selector| self.overlay.highlight(selector));
        if let Some(element) = target
            && step.hide_overlay_on_click()
        {
            self.overlay.arm_hide_on_click(element);
        }

        handle.schedule_positioning(self.render_epoch, target, step.layout);
        true
    }

    fn complete(&mut self, handle: &TourController) {
        if !self.session.is_running() {
            return;
        }
        self.cursor.mark_completed();
        self.session.phase = TourPhase::Completed;
        self.session.completed_at = Some(Utc::now());
        self.render_epoch += 1;
        tracing::info!(session_id = %self.session.id, "Tour completed");

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify_completed().await {
                tracing::warn!(error = %e, "Failed to record tour completion with host");
            }
        });

        self.overlay.clear_highlights();
        self.overlay.show();
        self.overlay.update(|modal| {
            modal.title = CLOSING_TITLE.to_string();
            modal.body = CLOSING_BODY.to_string();
            modal.skip_visible = false;
            modal.previous_visible = false;
            modal.next_label = Some("Close".to_string());
        });

        let controller = handle.clone();
        let delay = handle.config.teardown_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.destroy().await;
        });
    }
}

/// Decide where a new session starts from the persisted cursor and path.
fn resume_point(
    cursor: &PersistedCursor,
    catalog: &StepCatalog,
    path: &str,
) -> Option<(usize, BTreeSet<usize>)> {
    if cursor.load_completion_flag() {
        if !Page::is_start_page(path) {
            tracing::info!(path, "Tour already completed");
            return None;
        }
        tracing::info!("Restart requested from start page, clearing saved tour state");
        cursor.reset();
    }

    let mut completed = cursor.load_completed_steps();
    let Some(saved) = cursor.load_step_index() else {
        return Some((0, completed));
    };
    if saved >= catalog.len() {
        tracing::warn!(step = saved, "Saved step out of range, starting over");
        return Some((0, completed));
    }

    completed.extend(0..saved);
    let mut start = saved;
    if let Ok(step) = catalog.get(saved)
        && let Some(page) = step.navigates_to()
        && page.matches_path(path)
        && saved < catalog.last_index()
    {
        tracing::info!(step = saved, page = %page, "Navigation step already done, auto-advancing");
        completed.insert(saved);
        start = saved + 1;
        cursor.save_step_index(start);
    }
    cursor.save_completed_steps(&completed);
    tracing::info!(step = start, "Resuming tour");
    Some((start, completed))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::overlay::{HeadlessPage, Placement, Rect, Viewport};
    use crate::store::MemoryStore;
    use crate::tour::cursor::settings_keys;
    use crate::tour::notify::NoopNotifier;

    const DESKTOP: Viewport = Viewport {
        width: 1280.0,
        height: 800.0,
    };

    fn deps(store: Arc<MemoryStore>, page: Arc<HeadlessPage>) -> TourDeps {
        TourDeps {
            store,
            bus: EventBus::new(),
            surface: page,
            notifier: Arc::new(NoopNotifier),
            catalog: Arc::new(StepCatalog::attendance_tour()),
            config: TourConfig::default(),
        }
    }

    fn dashboard() -> Arc<HeadlessPage> {
        let page = Arc::new(HeadlessPage::new("/dashboard/", DESKTOP));
        let nav = page.add_element(&[".nav-links"], None, Rect::new(0.0, 0.0, 1280.0, 60.0));
        page.add_element(
            &[".nav-links a[href='/class_management/']"],
            Some(nav),
            Rect::new(10.0, 200.0, 120.0, 40.0),
        );
        page
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_start_begins_at_welcome() {
        let store = Arc::new(MemoryStore::new());
        let page = dashboard();
        let tour = TourController::launch(deps(store.clone(), page.clone())).await.unwrap();

        let status = tour.status().await;
        assert_eq!(status.step, Some(0));
        assert_eq!(status.phase, TourPhase::Active);
        let modal = page.overlay().unwrap();
        assert_eq!(modal.title, "Welcome to Smart Attendance! 🎉");
        assert!(!modal.previous_visible);
        assert_eq!(modal.next_label.as_deref(), Some("Next"));
        assert_eq!(store.get(settings_keys::STEP_INDEX).as_deref(), Some("0"));
    }

    #[tokio::test(start_paused = true)]
    async fn navigate_step_hides_next_and_highlights_target() {
        let store = Arc::new(MemoryStore::new());
        let page = dashboard();
        let tour = TourController::launch(deps(store, page.clone())).await.unwrap();

        tour.next().await;
        let modal = page.overlay().unwrap();
        assert_eq!(modal.progress.label(), "Step 2 of 13");
        assert!(modal.previous_visible);
        assert_eq!(modal.next_label, None);
        let link = page.query(".nav-links a[href='/class_management/']").unwrap();
        assert!(page.has_class(link, crate::overlay::styles::HIGHLIGHT_CLASS));
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_show_step_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let tour = TourController::launch(deps(store.clone(), dashboard())).await.unwrap();

        assert!(!tour.show_step(13).await);
        assert_eq!(tour.status().await.step, Some(0));
        assert_eq!(store.get(settings_keys::STEP_INDEX).as_deref(), Some("0"));
    }

    #[tokio::test(start_paused = true)]
    async fn previous_is_noop_at_first_step_and_keeps_completion() {
        let store = Arc::new(MemoryStore::new());
        let tour = TourController::launch(deps(store, dashboard())).await.unwrap();

        tour.previous().await;
        assert_eq!(tour.status().await.step, Some(0));

        tour.next().await;
        tour.previous().await;
        let status = tour.status().await;
        assert_eq!(status.step, Some(0));
        assert_eq!(status.completed_steps, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_tour_does_not_start_off_the_start_page() {
        let store = Arc::new(MemoryStore::new());
        store.set(settings_keys::COMPLETED, "true").unwrap();
        let page = Arc::new(HeadlessPage::new("/class_management/", DESKTOP));
        assert!(TourController::launch(deps(store, page.clone())).await.is_none());
        assert!(page.overlay().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn completed_tour_restarts_from_start_page() {
        let store = Arc::new(MemoryStore::new());
        store.set(settings_keys::COMPLETED, "true").unwrap();
        store.set(settings_keys::STEP_INDEX, "5").unwrap();
        let tour = TourController::launch(deps(store.clone(), dashboard())).await.unwrap();

        assert_eq!(tour.status().await.step, Some(0));
        assert_eq!(store.get(settings_keys::COMPLETED), None);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_marks_earlier_steps_completed() {
        let store = Arc::new(MemoryStore::new());
        store.set(settings_keys::STEP_INDEX, "4").unwrap();
        let page = Arc::new(HeadlessPage::new("/add_student/", DESKTOP));
        let tour = TourController::launch(deps(store.clone(), page)).await.unwrap();

        let status = tour.status().await;
        assert_eq!(status.step, Some(4));
        assert_eq!(status.completed_steps, vec![0, 1, 2, 3]);
        assert_eq!(
            store.get(settings_keys::COMPLETED_STEPS).as_deref(),
            Some("[0,1,2,3]")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn resume_on_navigation_destination_auto_advances() {
        let store = Arc::new(MemoryStore::new());
        store.set(settings_keys::STEP_INDEX, "1").unwrap();
        let page = Arc::new(HeadlessPage::new("/class_management/", DESKTOP));
        let tour = TourController::launch(deps(store.clone(), page)).await.unwrap();

        let status = tour.status().await;
        assert_eq!(status.step, Some(2));
        assert_eq!(status.completed_steps, vec![0, 1]);
        assert_eq!(store.get(settings_keys::STEP_INDEX).as_deref(), Some("2"));
    }

    #[tokio::test(start_paused = true)]
    async fn resume_elsewhere_does_not_auto_advance() {
        let store = Arc::new(MemoryStore::new());
        store.set(settings_keys::STEP_INDEX, "1").unwrap();
        let tour = TourController::launch(deps(store, dashboard())).await.unwrap();
        assert_eq!(tour.status().await.step, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn hide_on_next_step_stays_put() {
        let store = Arc::new(MemoryStore::new());
        store.set(settings_keys::STEP_INDEX, "10").unwrap();
        let page = Arc::new(HeadlessPage::new("/", DESKTOP));
        let tour = TourController::launch(deps(store, page.clone())).await.unwrap();

        tour.next().await;
        let status = tour.status().await;
        assert_eq!(status.step, Some(10));
        assert!(!status.overlay_visible);
        assert!(!status.completed_steps.contains(&10));
    }

    #[tokio::test(start_paused = true)]
    async fn last_next_completes_and_tears_down() {
        let store = Arc::new(MemoryStore::new());
        store.set(settings_keys::STEP_INDEX, "12").unwrap();
        let page = dashboard();
        let tour = TourController::launch(deps(store.clone(), page.clone())).await.unwrap();
        assert_eq!(page.overlay().unwrap().next_label.as_deref(), Some("Complete"));

        tour.next().await;
        let status = tour.status().await;
        assert_eq!(status.phase, TourPhase::Completed);
        assert!(status.completed_at.is_some());
        assert_eq!(store.get(settings_keys::COMPLETED).as_deref(), Some("true"));
        assert_eq!(store.get(settings_keys::STEP_INDEX), None);
        assert_eq!(store.get(settings_keys::COMPLETED_STEPS), None);

        let modal = page.overlay().unwrap();
        assert_eq!(modal.title, CLOSING_TITLE);
        assert!(!modal.skip_visible);
        assert_eq!(modal.next_label.as_deref(), Some("Close"));

        // Closing screen stays for the teardown delay, then fades out
        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(page.overlay().is_some());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(page.overlay().is_none());
        assert!(!tour.is_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn close_on_closing_screen_tears_down_immediately() {
        let store = Arc::new(MemoryStore::new());
        let page = dashboard();
        let tour = TourController::launch(deps(store, page.clone())).await.unwrap();

        tour.skip().await;
        assert_eq!(tour.status().await.phase, TourPhase::Completed);
        tour.next().await;
        assert!(!tour.is_active().await);
        assert!(page.overlay().unwrap().fading_out);

        tokio::time::sleep(Duration::from_millis(310)).await;
        assert!(page.overlay().is_none());
        assert!(!page.has_stylesheet(crate::overlay::styles::STYLESHEET_ID));
    }

    #[tokio::test(start_paused = true)]
    async fn calls_after_destroy_are_noops() {
        let store = Arc::new(MemoryStore::new());
        let tour = TourController::launch(deps(store.clone(), dashboard())).await.unwrap();
        tour.destroy().await;

        tour.next().await;
        tour.skip().await;
        assert!(!tour.show_step(3).await);
        assert_eq!(store.get(settings_keys::COMPLETED), None);
        assert_eq!(store.get(settings_keys::STEP_INDEX).as_deref(), Some("0"));
    }

    #[tokio::test(start_paused = true)]
    async fn narrow_viewport_places_modal_below_top_target() {
        let store = Arc::new(MemoryStore::new());
        store.set(settings_keys::STEP_INDEX, "1").unwrap();
        let page = Arc::new(HeadlessPage::new(
            "/dashboard/",
            Viewport {
                width: 390.0,
                height: 800.0,
            },
        ));
        page.add_element(
            &[".nav-links a[href='/class_management/']"],
            None,
            Rect::new(20.0, 0.0, 120.0, 40.0),
        );
        TourController::launch(deps(store, page.clone())).await.unwrap();

        tokio::time::sleep(HIGHLIGHT_SCROLL_DELAY + SCROLL_SETTLE + Duration::from_millis(10)).await;
        let modal = page.overlay().unwrap();
        assert_eq!(modal.placement, Placement::Bottom);
        assert!(modal.narrow);
    }
}
