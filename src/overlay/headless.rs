//! In-memory `PageSurface` — a host page without a browser.
//!
//! Elements answer to exact selector strings registered when they are
//! added; there is no CSS selector engine.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::surface::{ElementId, ModalView, PageSurface, PointerEvents, Rect, Viewport};

#[derive(Debug, Clone)]
struct Element {
    selectors: Vec<String>,
    parent: Option<ElementId>,
    classes: BTreeSet<String>,
    pointer_events: Option<PointerEvents>,
    /// Document coordinates (not adjusted for scroll).
    rect: Rect,
}

#[derive(Debug)]
struct PageState {
    path: String,
    viewport: Viewport,
    scroll_y: f64,
    elements: Vec<Element>,
    body_classes: BTreeSet<String>,
    overlay: Option<ModalView>,
    stylesheets: BTreeMap<String, String>,
}

/// Headless host page.
#[derive(Debug)]
pub struct HeadlessPage {
    state: Mutex<PageState>,
}

impl HeadlessPage {
    pub fn new(path: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            state: Mutex::new(PageState {
                path: path.into(),
                viewport,
                scroll_y: 0.0,
                elements: Vec::new(),
                body_classes: BTreeSet::new(),
                overlay: None,
                stylesheets: BTreeMap::new(),
            }),
        }
    }

    /// Add an element answering to each of `selectors`.
    pub fn add_element(
        &self,
        selectors: &[&str],
        parent: Option<ElementId>,
        rect: Rect,
    ) -> ElementId {
        self.with_state(|state| {
            let id = ElementId(state.elements.len());
            state.elements.push(Element {
                selectors: selectors.iter().map(|s| s.to_string()).collect(),
                parent,
                classes: BTreeSet::new(),
                pointer_events: None,
                rect,
            });
            id
        })
    }

    /// Simulate a full page load: new path, empty document, scroll reset.
    pub fn navigate(&self, path: impl Into<String>) {
        self.with_state(|state| {
            state.path = path.into();
            state.scroll_y = 0.0;
            state.elements.clear();
            state.body_classes.clear();
            state.overlay = None;
            state.stylesheets.clear();
        });
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.with_state(|state| state.viewport = viewport);
    }

    pub fn overlay(&self) -> Option<ModalView> {
        self.with_state(|state| state.overlay.clone())
    }

    pub fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.with_state(|state| {
            state
                .elements
                .get(element.0)
                .is_some_and(|e| e.classes.contains(class))
        })
    }

    pub fn pointer_events(&self, element: ElementId) -> Option<PointerEvents> {
        self.with_state(|state| state.elements.get(element.0).and_then(|e| e.pointer_events))
    }

    pub fn body_has_class(&self, class: &str) -> bool {
        self.with_state(|state| state.body_classes.contains(class))
    }

    pub fn has_stylesheet(&self, id: &str) -> bool {
        self.with_state(|state| state.stylesheets.contains_key(id))
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        // A poisoned page is still a page; keep going with its contents
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state)
    }
}

impl PageSurface for HeadlessPage {
    fn path(&self) -> String {
        self.with_state(|state| state.path.clone())
    }

    fn viewport(&self) -> Viewport {
        self.with_state(|state| state.viewport)
    }

    fn query(&self, selector: &str) -> Option<ElementId> {
        self.with_state(|state| {
            selector.split(',').map(str::trim).find_map(|alternative| {
                state
                    .elements
                    .iter()
                    .position(|e| e.selectors.iter().any(|s| s == alternative))
                    .map(ElementId)
            })
        })
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.with_state(|state| state.elements.get(element.0).and_then(|e| e.parent))
    }

    fn add_class(&self, element: ElementId, class: &str) {
        self.with_state(|state| {
            if let Some(e) = state.elements.get_mut(element.0) {
                e.classes.insert(class.to_string());
            }
        });
    }

    fn remove_class(&self, element: ElementId, class: &str) {
        self.with_state(|state| {
            if let Some(e) = state.elements.get_mut(element.0) {
                e.classes.remove(class);
            }
        });
    }

    fn elements_with_class(&self, class: &str) -> Vec<ElementId> {
        self.with_state(|state| {
            state
                .elements
                .iter()
                .enumerate()
                .filter(|(_, e)| e.classes.contains(class))
                .map(|(i, _)| ElementId(i))
                .collect()
        })
    }

    fn set_pointer_events(&self, element: ElementId, value: Option<PointerEvents>) {
        self.with_state(|state| {
            if let Some(e) = state.elements.get_mut(element.0) {
                e.pointer_events = value;
            }
        });
    }

    fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        self.with_state(|state| {
            let scroll_y = state.scroll_y;
            state.elements.get(element.0).map(|e| Rect {
                top: e.rect.top - scroll_y,
                ..e.rect
            })
        })
    }

    fn scroll_y(&self) -> f64 {
        self.with_state(|state| state.scroll_y)
    }

    fn scroll_to(&self, top: f64) {
        self.with_state(|state| state.scroll_y = top.max(0.0));
    }

    fn set_body_class(&self, class: &str, enabled: bool) {
        self.with_state(|state| {
            if enabled {
                state.body_classes.insert(class.to_string());
            } else {
                state.body_classes.remove(class);
            }
        });
    }

    fn render_overlay(&self, modal: Option<&ModalView>) {
        self.with_state(|state| state.overlay = modal.cloned());
    }

    fn overlay_node(&self) -> Option<u64> {
        self.with_state(|state| state.overlay.as_ref().map(|modal| modal.node))
    }

    fn set_stylesheet(&self, id: &str, css: Option<&str>) {
        self.with_state(|state| match css {
            Some(css) => {
                state.stylesheets.insert(id.to_string(), css.to_string());
            }
            None => {
                state.stylesheets.remove(id);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> HeadlessPage {
        HeadlessPage::new(
            "/",
            Viewport {
                width: 1280.0,
                height: 800.0,
            },
        )
    }

    #[test]
    fn query_tries_alternatives_in_order() {
        let page = page();
        let cam = page.add_element(&[".cam"], None, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(page.query("#start, .cam"), Some(cam));

        let start = page.add_element(&["#start"], None, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(page.query("#start, .cam"), Some(start));
        assert_eq!(page.query("#missing"), None);
    }

    #[test]
    fn bounding_rect_follows_scroll() {
        let page = page();
        let el = page.add_element(&["#far"], None, Rect::new(1500.0, 0.0, 100.0, 40.0));
        page.scroll_to(1000.0);
        assert_eq!(page.bounding_rect(el).unwrap().top, 500.0);
        page.scroll_to(-50.0);
        assert_eq!(page.scroll_y(), 0.0);
    }

    #[test]
    fn navigate_resets_document() {
        let page = page();
        let el = page.add_element(&["#a"], None, Rect::new(0.0, 0.0, 1.0, 1.0));
        page.add_class(el, "x");
        page.set_body_class("onboarding-active", true);
        page.navigate("/add_student/");

        assert_eq!(page.path(), "/add_student/");
        assert!(page.query("#a").is_none());
        assert!(!page.body_has_class("onboarding-active"));
    }
}
