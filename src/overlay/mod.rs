//! Overlay — the modal layer drawn over the host page.

pub mod headless;
pub mod styles;
pub mod surface;
pub mod view;

pub use headless::HeadlessPage;
pub use surface::{
    ElementId, ModalView, PageSurface, Placement, PointerEvents, Progress, Rect, Viewport,
};
pub use view::OverlayView;
