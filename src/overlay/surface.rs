//! `PageSurface` — what the overlay needs from the host page.
//!
//! In a browser this is the DOM; the crate ships [`super::HeadlessPage`]
//! for tests and the terminal sandbox.

use serde::Serialize;

/// Opaque handle to an element of the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub usize);

/// Element box in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Vertical midpoint.
    pub fn middle(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Visible area of the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Inline `pointer-events` override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerEvents {
    Auto,
    None,
}

/// Where the modal sits inside the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    Center,
    Top,
    Bottom,
}

/// Step progress shown under the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Zero-based step index.
    pub index: usize,
    pub total: usize,
}

impl Progress {
    /// Fill of the progress bar, 0–100.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.index + 1) as f64 / self.total as f64 * 100.0
    }

    pub fn label(&self) -> String {
        format!("Step {} of {}", self.index + 1, self.total)
    }
}

/// Snapshot of the injected overlay node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalView {
    /// Identity of the injected node; every mount gets a fresh one.
    #[serde(skip)]
    pub node: u64,
    /// False while the overlay is hidden so the page can be used.
    pub visible: bool,
    pub title: String,
    pub body: String,
    pub progress: Progress,
    pub skip_visible: bool,
    pub previous_visible: bool,
    /// Label of the primary button, or `None` when it is hidden.
    pub next_label: Option<String>,
    pub placement: Placement,
    /// Narrow-viewport padding/width adjustments are active.
    pub narrow: bool,
    pub compact: bool,
    /// Fade-out has started; the node is about to be removed.
    pub fading_out: bool,
}

impl ModalView {
    /// The node as first injected, before any step is rendered.
    pub fn initial(node: u64, total: usize) -> Self {
        Self {
            node,
            visible: true,
            title: "Welcome!".to_string(),
            body: "Let's get started!".to_string(),
            progress: Progress { index: 0, total },
            skip_visible: true,
            previous_visible: false,
            next_label: Some("Next".to_string()),
            placement: Placement::Center,
            narrow: false,
            compact: false,
            fading_out: false,
        }
    }
}

/// The host page as seen by the overlay.
pub trait PageSurface: Send + Sync {
    /// Current location path, e.g. `/class_management/`.
    fn path(&self) -> String;

    fn viewport(&self) -> Viewport;

    /// First element matching `selector`. Comma-separated selector lists
    /// match the first alternative present.
    fn query(&self, selector: &str) -> Option<ElementId>;

    /// Parent element, or `None` when `element`'s parent is the body.
    fn parent(&self, element: ElementId) -> Option<ElementId>;

    fn add_class(&self, element: ElementId, class: &str);

    fn remove_class(&self, element: ElementId, class: &str);

    fn elements_with_class(&self, class: &str) -> Vec<ElementId>;

    /// Set (`Some`) or clear (`None`) the inline pointer-events style.
    fn set_pointer_events(&self, element: ElementId, value: Option<PointerEvents>);

    fn bounding_rect(&self, element: ElementId) -> Option<Rect>;

    /// Current vertical scroll offset.
    fn scroll_y(&self) -> f64;

    fn scroll_to(&self, top: f64);

    fn set_body_class(&self, class: &str, enabled: bool);

    /// Insert or replace the overlay node; `None` removes it.
    fn render_overlay(&self, modal: Option<&ModalView>);

    /// Identity of the overlay node currently in the document.
    fn overlay_node(&self) -> Option<u64>;

    /// Insert or replace a stylesheet by id; `None` removes it.
    fn set_stylesheet(&self, id: &str, css: Option<&str>);
}
