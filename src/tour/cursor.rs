//! Persisted cursor — the tour position that survives page navigation.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::store::KeyValueStore;

/// Store keys used for tour persistence.
pub mod settings_keys {
    /// `"true"` once the tour has been finished or skipped.
    pub const COMPLETED: &str = "onboarding_completed";
    /// Index of the step to resume at.
    pub const STEP_INDEX: &str = "onboarding_step";
    /// JSON array of completed step indices.
    pub const COMPLETED_STEPS: &str = "onboarding_completed_steps";
    /// One-shot flag: start immediately on the next page load.
    pub const RESUME_ON_NEXT_LOAD: &str = "start_onboarding_on_load";
}

/// Typed view over the durable store.
///
/// Reads decode corrupt or missing values to "not started" defaults. Writes
/// go straight through; a failed write is logged and otherwise ignored.
#[derive(Clone)]
pub struct PersistedCursor {
    store: Arc<dyn KeyValueStore>,
}

impl PersistedCursor {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load_completion_flag(&self) -> bool {
        self.store.get(settings_keys::COMPLETED).as_deref() == Some("true")
    }

    pub fn load_step_index(&self) -> Option<usize> {
        let raw = self.store.get(settings_keys::STEP_INDEX)?;
        match raw.trim().parse() {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!(raw = %raw, error = %e, "Ignoring unreadable saved step index");
                None
            }
        }
    }

    pub fn load_completed_steps(&self) -> BTreeSet<usize> {
        let Some(raw) = self.store.get(settings_keys::COMPLETED_STEPS) else {
            return BTreeSet::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(raw = %raw, error = %e, "Ignoring unreadable completed steps");
            BTreeSet::new()
        })
    }

    pub fn save_step_index(&self, index: usize) {
        self.write(settings_keys::STEP_INDEX, &index.to_string());
    }

    /// Add `index` to the stored set and persist immediately.
    pub fn mark_step_completed(&self, index: usize) -> BTreeSet<usize> {
        let mut steps = self.load_completed_steps();
        steps.insert(index);
        self.save_completed_steps(&steps);
        steps
    }

    /// Replace the stored set.
    pub fn save_completed_steps(&self, steps: &BTreeSet<usize>) {
        match serde_json::to_string(steps) {
            Ok(json) => self.write(settings_keys::COMPLETED_STEPS, &json),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize completed steps"),
        }
    }

    /// Set the completion flag and drop the position.
    pub fn mark_completed(&self) {
        self.write(settings_keys::COMPLETED, "true");
        self.delete(settings_keys::STEP_INDEX);
        self.delete(settings_keys::COMPLETED_STEPS);
    }

    /// Forget everything, as for a fresh forced start.
    pub fn reset(&self) {
        self.delete(settings_keys::COMPLETED);
        self.delete(settings_keys::STEP_INDEX);
        self.delete(settings_keys::COMPLETED_STEPS);
    }

    pub fn request_resume_on_next_load(&self) {
        self.write(settings_keys::RESUME_ON_NEXT_LOAD, "true");
    }

    /// Read and clear the one-shot resume flag.
    pub fn take_resume_on_next_load(&self) -> bool {
        let requested = self.store.get(settings_keys::RESUME_ON_NEXT_LOAD).as_deref() == Some("true");
        if requested {
            self.delete(settings_keys::RESUME_ON_NEXT_LOAD);
        }
        requested
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(key, error = %e, "Failed to persist tour state");
        }
    }

    fn delete(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(key, error = %e, "Failed to clear tour state");
        }
    }
}

impl std::fmt::Debug for PersistedCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedCursor")
            .field("completed", &self.load_completion_flag())
            .field("step", &self.load_step_index())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cursor() -> (Arc<MemoryStore>, PersistedCursor) {
        let store = Arc::new(MemoryStore::new());
        let cursor = PersistedCursor::new(store.clone());
        (store, cursor)
    }

    #[test]
    fn fresh_store_is_not_started() {
        let (_, cursor) = cursor();
        assert!(!cursor.load_completion_flag());
        assert!(cursor.load_step_index().is_none());
        assert!(cursor.load_completed_steps().is_empty());
        assert!(!cursor.take_resume_on_next_load());
    }

    #[test]
    fn corrupt_values_decode_to_defaults() {
        let (store, cursor) = cursor();
        store.set(settings_keys::STEP_INDEX, "three").unwrap();
        store.set(settings_keys::COMPLETED_STEPS, "[1, 2").unwrap();
        store.set(settings_keys::COMPLETED, "yes").unwrap();

        assert!(cursor.load_step_index().is_none());
        assert!(cursor.load_completed_steps().is_empty());
        assert!(!cursor.load_completion_flag());
    }

    #[test]
    fn completed_step_survives_fresh_load() {
        let (store, cursor) = cursor();
        cursor.mark_step_completed(2);
        cursor.mark_step_completed(5);
        cursor.mark_step_completed(2);

        let fresh = PersistedCursor::new(store);
        assert_eq!(fresh.load_completed_steps(), BTreeSet::from([2, 5]));
    }

    #[test]
    fn mark_completed_clears_position() {
        let (store, cursor) = cursor();
        cursor.save_step_index(7);
        cursor.mark_step_completed(6);
        cursor.mark_completed();

        assert!(cursor.load_completion_flag());
        assert!(store.get(settings_keys::STEP_INDEX).is_none());
        assert!(store.get(settings_keys::COMPLETED_STEPS).is_none());
    }

    #[test]
    fn reset_clears_all_three_keys() {
        let (store, cursor) = cursor();
        cursor.save_step_index(3);
        cursor.mark_step_completed(1);
        cursor.mark_completed();
        cursor.save_step_index(1);
        cursor.reset();

        let snapshot = store.snapshot();
        assert!(!snapshot.contains_key(settings_keys::COMPLETED));
        assert!(!snapshot.contains_key(settings_keys::STEP_INDEX));
        assert!(!snapshot.contains_key(settings_keys::COMPLETED_STEPS));
    }

    #[test]
    fn resume_flag_is_one_shot() {
        let (_, cursor) = cursor();
        cursor.request_resume_on_next_load();
        assert!(cursor.take_resume_on_next_load());
        assert!(!cursor.take_resume_on_next_load());
    }

    #[test]
    fn completed_steps_serialize_as_sorted_array() {
        let (store, cursor) = cursor();
        cursor.save_completed_steps(&BTreeSet::from([4, 0, 2]));
        assert_eq!(
            store.get(settings_keys::COMPLETED_STEPS).as_deref(),
            Some("[0,2,4]")
        );
    }
}
