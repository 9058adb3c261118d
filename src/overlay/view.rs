//! Overlay view — creates, updates, positions and removes the modal layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::styles::{BODY_ACTIVE_CLASS, HIGHLIGHT_CLASS, OVERLAY_CSS, STYLESHEET_ID};
use super::surface::{ElementId, ModalView, PageSurface, Placement, PointerEvents};
use crate::config::SCROLL_TOP_OFFSET;

static NEXT_NODE: AtomicU64 = AtomicU64::new(1);

/// The overlay as owned by one tour session.
///
/// Every method is a no-op once the node has been removed or replaced by
/// another session's mount, so late timer callbacks can call in freely.
pub struct OverlayView {
    surface: Arc<dyn PageSurface>,
    modal: Option<ModalView>,
    /// Element whose next click hides the overlay.
    hide_on_click: Option<ElementId>,
    narrow_viewport_px: f64,
}

impl OverlayView {
    pub fn new(surface: Arc<dyn PageSurface>, narrow_viewport_px: f64) -> Self {
        Self {
            surface,
            modal: None,
            hide_on_click: None,
            narrow_viewport_px,
        }
    }

    pub fn surface(&self) -> &Arc<dyn PageSurface> {
        &self.surface
    }

    /// Inject a fresh overlay node and stylesheet, replacing any existing one.
    pub fn mount(&mut self, total_steps: usize) {
        self.surface.render_overlay(None);
        self.surface.set_body_class(BODY_ACTIVE_CLASS, true);
        self.surface.set_stylesheet(STYLESHEET_ID, Some(OVERLAY_CSS));
        let node = NEXT_NODE.fetch_add(1, Ordering::Relaxed);
        let modal = ModalView::initial(node, total_steps);
        self.surface.render_overlay(Some(&modal));
        self.modal = Some(modal);
    }

    pub fn is_mounted(&self) -> bool {
        self.modal.is_some()
    }

    /// Drop the node handle if the document now holds someone else's node.
    /// Returns true while this view still owns the overlay.
    fn owns_node(&mut self) -> bool {
        let Some(ref modal) = self.modal else {
            return false;
        };
        if self.surface.overlay_node() == Some(modal.node) {
            return true;
        }
        tracing::debug!(node = modal.node, "Overlay node replaced, detaching view");
        self.forget();
        false
    }

    pub fn modal(&self) -> Option<&ModalView> {
        self.modal.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.modal.as_ref().is_some_and(|m| m.visible)
    }

    /// Viewport is at or below the narrow breakpoint.
    pub fn is_narrow(&self) -> bool {
        self.surface.viewport().width <= self.narrow_viewport_px
    }

    /// Mutate the modal and push it to the page.
    pub fn update(&mut self, apply: impl FnOnce(&mut ModalView)) {
        if !self.owns_node() {
            return;
        }
        if let Some(ref mut modal) = self.modal {
            apply(modal);
            self.surface.render_overlay(Some(modal));
        }
    }

    /// Hide the overlay so the underlying page can be used.
    pub fn hide(&mut self) {
        if !self.owns_node() {
            return;
        }
        self.update(|m| m.visible = false);
        self.surface.set_body_class(BODY_ACTIVE_CLASS, false);
        tracing::debug!("Overlay hidden");
    }

    pub fn show(&mut self) {
        if !self.owns_node() {
            return;
        }
        self.update(|m| m.visible = true);
        self.surface.set_body_class(BODY_ACTIVE_CLASS, true);
        tracing::debug!("Overlay shown");
    }

    /// Mark the element matching `selector` and let it receive clicks
    /// through the overlay. Returns `None` (and warns) if nothing matches.
    pub fn highlight(&mut self, selector: &str) -> Option<ElementId> {
        let Some(element) = self.surface.query(selector) else {
            tracing::warn!(selector, "Highlight target not found");
            return None;
        };
        self.surface.add_class(element, HIGHLIGHT_CLASS);
        let mut node = Some(element);
        while let Some(current) = node {
            self.surface.set_pointer_events(current, Some(PointerEvents::Auto));
            node = self.surface.parent(current);
        }
        Some(element)
    }

    /// Undo every highlight and drop any pending hide-on-click listener.
    pub fn clear_highlights(&mut self) {
        for element in self.surface.elements_with_class(HIGHLIGHT_CLASS) {
            self.surface.remove_class(element, HIGHLIGHT_CLASS);
            let mut node = Some(element);
            while let Some(current) = node {
                self.surface.set_pointer_events(current, None);
                node = self.surface.parent(current);
            }
        }
        self.hide_on_click = None;
    }

    /// Hide the overlay on the next click of `element` (one-shot).
    pub fn arm_hide_on_click(&mut self, element: ElementId) {
        self.hide_on_click = Some(element);
    }

    /// Feed a click on the host page. Returns true if it hid the overlay.
    pub fn handle_click(&mut self, element: ElementId) -> bool {
        if self.hide_on_click != Some(element) {
            return false;
        }
        self.hide_on_click = None;
        tracing::info!(element = element.0, "Target clicked, hiding overlay");
        self.hide();
        true
    }

    /// Scroll so `element` is in view: 80px from the top on narrow
    /// viewports, vertically centered otherwise.
    pub fn scroll_into_view(&self, element: ElementId) {
        let Some(rect) = self.surface.bounding_rect(element) else {
            return;
        };
        let scroll_y = self.surface.scroll_y();
        let top = if self.is_narrow() {
            scroll_y + rect.top - SCROLL_TOP_OFFSET
        } else {
            scroll_y + rect.middle() - self.surface.viewport().height / 2.0
        };
        self.surface.scroll_to(top.max(0.0));
    }

    /// Put the modal on the half of the viewport away from `element`.
    pub fn place_opposite(&mut self, element: ElementId, compact: bool) {
        let Some(rect) = self.surface.bounding_rect(element) else {
            return;
        };
        let viewport_height = self.surface.viewport().height;
        let placement = if rect.middle() < viewport_height / 2.0 {
            Placement::Bottom
        } else {
            Placement::Top
        };
        self.update(|m| {
            m.placement = placement;
            m.narrow = true;
            m.compact = compact;
        });
    }

    /// Center the modal, with narrow sizing when the viewport calls for it.
    pub fn center(&mut self) {
        let narrow = self.is_narrow();
        self.update(|m| {
            m.placement = Placement::Center;
            m.narrow = narrow;
            m.compact = false;
        });
    }

    /// Start tearing down: highlights, body class and listeners go now; the
    /// node fades and is removed by [`OverlayView::remove`].
    pub fn begin_teardown(&mut self) {
        if !self.owns_node() {
            return;
        }
        self.clear_highlights();
        self.surface.set_body_class(BODY_ACTIVE_CLASS, false);
        self.update(|m| m.fading_out = true);
    }

    /// The document went away with the page: drop the node handle without
    /// touching the surface, so late callbacks cannot reach the next page.
    pub fn forget(&mut self) {
        self.modal = None;
        self.hide_on_click = None;
    }

    /// Remove the node and stylesheet, unless another mount replaced them.
    pub fn remove(&mut self) {
        if self.owns_node() {
            self.modal = None;
            self.surface.render_overlay(None);
            self.surface.set_stylesheet(STYLESHEET_ID, None);
        }
    }
}
