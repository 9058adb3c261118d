//! Guided tour — a fixed sequence of instructional steps laid over the
//! attendance app's pages.
//!
//! The cursor survives full page loads through the durable store. Steps
//! advance on the modal's buttons or on domain events the pages dispatch on
//! the [`EventBus`]; the [`TourHost`] keeps at most one live
//! [`TourController`] per page.

pub mod bridge;
pub mod catalog;
pub mod controller;
pub mod cursor;
pub mod events;
pub mod gate;
pub mod host;
pub mod navigation;
pub mod notify;
pub mod routes;
pub mod state;

pub use bridge::{BridgeHandle, EventBridge};
pub use catalog::{Advance, ModalLayout, StepCatalog, StepDescriptor};
pub use controller::{TourController, TourDeps};
pub use cursor::PersistedCursor;
pub use events::{AttendancePayload, DomainEvent, EventBus, EventKind};
pub use gate::DebounceGate;
pub use host::{StartOutcome, TourHost};
pub use navigation::Page;
pub use notify::{CompletionNotifier, HttpCompletionNotifier, NoopNotifier};
pub use routes::{TourRouteState, tour_routes};
pub use state::{TourPhase, TourSession, TourStatus};
