//! Event bridge — turns page domain events into tour advancement.
//!
//! A single subscription to the [`EventBus`] serves all six event names. An
//! event only counts if its debounce guard is free and the current step is
//! waiting for it; anything else is dropped.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::controller::TourController;
use super::events::{DomainEvent, EventBus, EventKind};
use super::gate::DebounceGate;
use crate::config::SCROLL_SETTLE;

/// Listener state for one tour session.
#[derive(Clone)]
pub struct EventBridge {
    controller: TourController,
    gate: DebounceGate,
    transition_delay: Duration,
    /// How long the guard stays up once the advance has run.
    release_delay: Duration,
}

/// Owns the receive loop; dropping listeners means calling [`BridgeHandle::detach`].
#[derive(Debug)]
pub struct BridgeHandle {
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Stop listening. Advances already scheduled check the session themselves.
    pub fn detach(self) {
        self.task.abort();
        tracing::debug!("Tour event listeners detached");
    }
}

impl EventBridge {
    /// Subscribe to `bus` on behalf of `controller`.
    pub fn attach(controller: TourController, bus: &EventBus, window: Duration) -> BridgeHandle {
        let transition_delay = controller.config().transition_delay;
        let release_delay = controller.config().debounce_release;
        let bridge = Self {
            controller,
            gate: DebounceGate::new(window),
            transition_delay,
            release_delay,
        };
        for kind in EventKind::ALL {
            tracing::debug!(event = %kind, "Registered tour listener");
        }

        let mut rx = bus.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => bridge.dispatch(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Tour listener lagged behind the event bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        BridgeHandle { task }
    }

    async fn dispatch(&self, event: DomainEvent) {
        let kind = event.kind();
        if self.gate.is_held(kind) {
            tracing::debug!(event = %kind, "Duplicate event suppressed");
            return;
        }
        let Some(step) = self.controller.awaiting(kind).await else {
            tracing::debug!(event = %kind, "No step is waiting for this event");
            return;
        };
        if !self.gate.try_enter(kind) {
            return;
        }
        tracing::info!(event = %kind, step, "Gating event accepted");

        let bridge = self.clone();
        tokio::spawn(async move {
            let narrow = matches!(event, DomainEvent::StudentAdded { .. })
                && bridge.controller.is_narrow().await;
            match event {
                DomainEvent::AttendanceTaken(payload) => {
                    let subject = payload.recognized_subject();
                    if let Some(next) = bridge.controller.record_attendance(step, subject).await {
                        tokio::time::sleep(bridge.transition_delay).await;
                        bridge.controller.show_step_if_current(next).await;
                    }
                }
                DomainEvent::StudentAdded { .. } if narrow => {
                    // Bring the navigation back into view before the overlay returns
                    bridge.controller.scroll_to_top().await;
                    tokio::time::sleep(SCROLL_SETTLE).await;
                    bridge.reveal_then_advance(step).await;
                }
                _ => bridge.reveal_then_advance(step).await,
            }
            bridge.gate.release_after(kind, bridge.release_delay);
        });
    }

    async fn reveal_then_advance(&self, step: usize) {
        self.controller.reveal().await;
        tokio::time::sleep(self.transition_delay).await;
        self.controller.advance_from(step).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::TourConfig;
    use crate::overlay::{HeadlessPage, PageSurface, Viewport};
    use crate::store::{KeyValueStore, MemoryStore};
    use crate::tour::catalog::StepCatalog;
    use crate::tour::controller::TourDeps;
    use crate::tour::cursor::settings_keys;
    use crate::tour::events::AttendancePayload;
    use crate::tour::notify::NoopNotifier;

    async fn launch_at(step: usize, path: &str, width: f64) -> (TourController, EventBus, Arc<HeadlessPage>) {
        let store = Arc::new(MemoryStore::new());
        store.set(settings_keys::STEP_INDEX, &step.to_string()).unwrap();
        let page = Arc::new(HeadlessPage::new(
            path,
            Viewport {
                width,
                height: 800.0,
            },
        ));
        let bus = EventBus::new();
        let tour = TourController::launch(TourDeps {
            store,
            bus: bus.clone(),
            surface: page.clone(),
            notifier: Arc::new(NoopNotifier),
            catalog: Arc::new(StepCatalog::attendance_tour()),
            config: TourConfig::default(),
        })
        .await
        .unwrap();
        (tour, bus, page)
    }

    #[tokio::test(start_paused = true)]
    async fn registers_one_listener() {
        let (_tour, bus, _page) = launch_at(0, "/dashboard/", 1280.0).await;
        assert_eq!(bus.listener_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gated_event_reveals_then_advances_after_delay() {
        let (tour, bus, _page) = launch_at(2, "/class_management/", 1280.0).await;
        tour.hide().await;

        bus.publish(DomainEvent::ClassCreated);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let status = tour.status().await;
        assert!(status.overlay_visible);
        assert_eq!(status.step, Some(2));

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(tour.status().await.step, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_event_advances_once() {
        let (tour, bus, _page) = launch_at(2, "/class_management/", 1280.0).await;

        bus.publish(DomainEvent::ClassCreated);
        bus.publish(DomainEvent::ClassCreated);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        bus.publish(DomainEvent::ClassCreated);
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(tour.status().await.step, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_event_leaves_cursor_alone() {
        let (tour, bus, _page) = launch_at(2, "/class_management/", 1280.0).await;

        bus.publish(DomainEvent::CameraStarted);
        bus.publish(DomainEvent::SessionCreated);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(tour.status().await.step, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn attendance_substitutes_recognized_name() {
        let (tour, bus, page) = launch_at(10, "/", 1280.0).await;

        bus.publish(DomainEvent::AttendanceTaken(AttendancePayload::from_message(
            "Attendance taken: No match",
        )));
        tokio::time::sleep(Duration::from_millis(600)).await;

        let status = tour.status().await;
        assert_eq!(status.step, Some(11));
        assert_eq!(status.recognized_subject.as_deref(), Some("Unknown Student"));
        assert!(status.completed_steps.contains(&10));
        assert!(page.overlay().unwrap().body.contains("for Unknown Student."));
    }

    #[tokio::test(start_paused = true)]
    async fn narrow_student_added_scrolls_to_top_first() {
        let (tour, bus, page) = launch_at(4, "/add_student/", 390.0).await;
        page.scroll_to(900.0);
        assert!(!tour.status().await.overlay_visible);

        bus.publish(DomainEvent::test_student_added());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(page.scroll_y(), 0.0);
        assert!(!tour.status().await.overlay_visible);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(tour.status().await.overlay_visible);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(tour.status().await.step, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn detached_bridge_ignores_events() {
        let (tour, bus, _page) = launch_at(2, "/class_management/", 1280.0).await;
        tour.destroy().await;

        bus.publish(DomainEvent::ClassCreated);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(tour.status().await.step, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn guard_holds_for_release_delay_after_advance() {
        let (tour, _bus, _page) = launch_at(4, "/add_student/", 390.0).await;
        let config = TourConfig::default();
        let bridge = EventBridge {
            controller: tour.clone(),
            gate: DebounceGate::new(config.debounce_window()),
            transition_delay: config.transition_delay,
            release_delay: config.debounce_release,
        };

        bridge.dispatch(DomainEvent::test_student_added()).await;
        // Scroll settle plus transition delay
        tokio::time::sleep(Duration::from_millis(1150)).await;
        assert_eq!(tour.status().await.step, Some(5));

        // Past the initial window, still inside the release delay
        tokio::time::sleep(Duration::from_millis(1800)).await;
        assert!(bridge.gate.is_held(EventKind::StudentAdded));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!bridge.gate.is_held(EventKind::StudentAdded));
    }
}
