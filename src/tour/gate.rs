//! Debounce gate — suppresses duplicate dispatches of one logical event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::events::EventKind;

#[derive(Debug, Default)]
struct Held {
    /// Current hold generation per event name.
    guards: HashMap<EventKind, u64>,
    next_generation: u64,
}

/// Per-event-name guard that releases itself after a fixed window.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    held: Arc<Mutex<Held>>,
    window: Duration,
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        Self {
            held: Arc::new(Mutex::new(Held::default())),
            window,
        }
    }

    /// Take the guard for `kind`. Returns false if it is already held.
    ///
    /// Must be called from within a tokio runtime: the release is a
    /// scheduled task.
    pub fn try_enter(&self, kind: EventKind) -> bool {
        let generation = match self.held.lock() {
            Ok(mut held) => {
                if held.guards.contains_key(&kind) {
                    return false;
                }
                held.next_generation += 1;
                let generation = held.next_generation;
                held.guards.insert(kind, generation);
                generation
            }
            Err(_) => return false,
        };
        self.schedule_release(kind, generation, self.window);
        true
    }

    /// Restart the hold on `kind` so it ends `delay` from now, replacing the
    /// release scheduled by [`DebounceGate::try_enter`]. No-op if not held.
    pub fn release_after(&self, kind: EventKind, delay: Duration) {
        let generation = match self.held.lock() {
            Ok(mut held) => {
                if !held.guards.contains_key(&kind) {
                    return;
                }
                held.next_generation += 1;
                let generation = held.next_generation;
                held.guards.insert(kind, generation);
                generation
            }
            Err(_) => return,
        };
        self.schedule_release(kind, generation, delay);
    }

    fn schedule_release(&self, kind: EventKind, generation: u64, delay: Duration) {
        let held = Arc::clone(&self.held);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let released = match held.lock() {
                Ok(mut held) if held.guards.get(&kind) == Some(&generation) => {
                    held.guards.remove(&kind);
                    true
                }
                _ => false,
            };
            if released {
                tracing::debug!(event = %kind, "Debounce guard released");
            }
        });
    }

    pub fn is_held(&self, kind: EventKind) -> bool {
        self.held
            .lock()
            .map(|held| held.guards.contains_key(&kind))
            .unwrap_or(false)
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn second_entry_is_refused_until_window_passes() {
        let gate = DebounceGate::new(Duration::from_millis(2500));

        assert!(gate.try_enter(EventKind::ClassCreated));
        assert!(!gate.try_enter(EventKind::ClassCreated));
        // Other names are independent
        assert!(gate.try_enter(EventKind::CameraStarted));

        tokio::time::sleep(Duration::from_millis(2400)).await;
        assert!(gate.is_held(EventKind::ClassCreated));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!gate.is_held(EventKind::ClassCreated));
        assert!(gate.try_enter(EventKind::ClassCreated));
    }

    #[tokio::test(start_paused = true)]
    async fn release_after_replaces_the_window() {
        let gate = DebounceGate::new(Duration::from_millis(2500));
        assert!(gate.try_enter(EventKind::StudentAdded));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        gate.release_after(EventKind::StudentAdded, Duration::from_millis(2000));

        // The original window has passed but the restarted hold has not
        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(gate.is_held(EventKind::StudentAdded));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!gate.is_held(EventKind::StudentAdded));
    }

    #[tokio::test(start_paused = true)]
    async fn release_after_ignores_free_guards() {
        let gate = DebounceGate::new(Duration::from_millis(100));
        gate.release_after(EventKind::ClassCreated, Duration::from_secs(5));
        assert!(!gate.is_held(EventKind::ClassCreated));
        assert!(gate.try_enter(EventKind::ClassCreated));
    }
}
