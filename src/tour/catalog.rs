//! Step catalog — the fixed, ordered list of tour steps.

use serde::Serialize;

use super::events::EventKind;
use super::navigation::Page;
use crate::error::CatalogError;

/// Placeholder replaced with the recognized subject's name.
pub const SUBJECT_PLACEHOLDER: &str = "{studentName}";

/// How a step hands control to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Advance {
    /// The Next button advances.
    Manual,
    /// The user is told to navigate to `to`; arriving there advances.
    Navigate { to: Page },
    /// Clicking the target hides the overlay; `event` advances.
    ClickGated { event: EventKind },
    /// The overlay is hidden as soon as the step shows; `event` advances.
    HiddenUntil { event: EventKind },
    /// Next hides the overlay instead of advancing; `event` advances.
    HideOnNext { event: EventKind },
}

impl Advance {
    fn name(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Navigate { .. } => "navigate",
            Self::ClickGated { .. } => "click_gated",
            Self::HiddenUntil { .. } => "hidden_until",
            Self::HideOnNext { .. } => "hide_on_next",
        }
    }
}

/// Modal density on narrow viewports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalLayout {
    #[default]
    Standard,
    /// Form-filling steps, where the modal must leave room for the form.
    Compact,
}

/// One step of the tour. The index in the catalog is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDescriptor {
    pub title: String,
    /// Body text; may contain [`SUBJECT_PLACEHOLDER`].
    pub content: String,
    /// Selector of the element to highlight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Page the step is meant to be shown on.
    pub page: Page,
    pub advance: Advance,
    pub layout: ModalLayout,
}

impl StepDescriptor {
    /// A manual step with no target.
    pub fn new(title: impl Into<String>, content: impl Into<String>, page: Page) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            target: None,
            page,
            advance: Advance::Manual,
            layout: ModalLayout::Standard,
        }
    }

    pub fn with_target(mut self, selector: impl Into<String>) -> Self {
        self.target = Some(selector.into());
        self
    }

    pub fn with_advance(mut self, advance: Advance) -> Self {
        self.advance = advance;
        self
    }

    pub fn compact(mut self) -> Self {
        self.layout = ModalLayout::Compact;
        self
    }

    pub fn navigates_to(&self) -> Option<Page> {
        match self.advance {
            Advance::Navigate { to } => Some(to),
            _ => None,
        }
    }

    /// The gating event, if any.
    pub fn wait_for_event(&self) -> Option<EventKind> {
        match self.advance {
            Advance::ClickGated { event }
            | Advance::HiddenUntil { event }
            | Advance::HideOnNext { event } => Some(event),
            Advance::Manual | Advance::Navigate { .. } => None,
        }
    }

    pub fn hide_overlay_on_click(&self) -> bool {
        matches!(self.advance, Advance::ClickGated { .. })
    }

    pub fn hide_overlay_on_show(&self) -> bool {
        matches!(self.advance, Advance::HiddenUntil { .. })
    }

    pub fn hide_overlay_on_next(&self) -> bool {
        matches!(self.advance, Advance::HideOnNext { .. })
    }

    /// Whether interacting with the target itself moves the tour on, so the
    /// Next button is hidden.
    pub fn target_drives_progress(&self) -> bool {
        self.target.is_some()
            && matches!(
                self.advance,
                Advance::ClickGated { .. } | Advance::Navigate { .. }
            )
    }

    /// Body text with the subject placeholder filled in.
    pub fn render_content(&self, subject: Option<&str>) -> String {
        if !self.content.contains(SUBJECT_PLACEHOLDER) {
            return self.content.clone();
        }
        let name = subject.unwrap_or(super::events::DEFAULT_SUBJECT);
        self.content.replacen(SUBJECT_PLACEHOLDER, name, 1)
    }
}

/// Read-only ordered list of steps.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<StepDescriptor>,
}

impl StepCatalog {
    /// Build a catalog, checking that every gated step can be driven.
    pub fn new(steps: Vec<StepDescriptor>) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (index, step) in steps.iter().enumerate() {
            let needs_target = matches!(
                step.advance,
                Advance::ClickGated { .. } | Advance::Navigate { .. }
            );
            if needs_target && step.target.is_none() {
                return Err(CatalogError::MissingTarget {
                    index,
                    mode: step.advance.name(),
                });
            }
        }
        Ok(Self { steps })
    }

    pub fn get(&self, index: usize) -> Result<&StepDescriptor, CatalogError> {
        self.steps.get(index).ok_or(CatalogError::OutOfRange {
            index,
            len: self.steps.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDescriptor> {
        self.steps.iter()
    }

    /// The built-in tour of the attendance application.
    pub fn attendance_tour() -> Self {
        let steps = vec![
            StepDescriptor::new(
                "Welcome to Smart Attendance! 🎉",
                "Let's get you started with your AI-powered attendance system. I'll guide you through each step!",
                Page::Any,
            ),
            StepDescriptor::new(
                "Step 1: Go to Class Management 📚",
                "First, let's create a class for your students. Click 'Class Management Button' in the navigation ",
                Page::Dashboard,
            )
            .with_target(".nav-links a[href='/class_management/']")
            .with_advance(Advance::Navigate { to: Page::ClassManagement }),
            StepDescriptor::new(
                "Create Your First Class 🏫",
                "Great! Now click the 'Create Class' tab to start creating your first class.Fill in the details and click 'Create Class'.",
                Page::ClassManagement,
            )
            .with_target(".nav-tab[data-tab='create']")
            .with_advance(Advance::ClickGated { event: EventKind::ClassCreated })
            .compact(),
            StepDescriptor::new(
                "Excellent Work! 🎉",
                "You've created your first class! Now let's add a student. Click 'Add Student' in the navigation, Fill in the details and Take a photo of the student with good lighting and click 'Add Student'.",
                Page::ClassManagement,
            )
            .with_target(".nav-links a[href='/add_student/']")
            .with_advance(Advance::Navigate { to: Page::AddStudent }),
            StepDescriptor::new(
                "Add Your First Student 👤",
                "Great! Now take a photo of a student and fill in their details to add them to your class.",
                Page::AddStudent,
            )
            .with_target("#start, .cam")
            .with_advance(Advance::HiddenUntil { event: EventKind::StudentAdded })
            .compact(),
            StepDescriptor::new(
                "Now Create a Session 📅",
                "Perfect! Now we need to create an attendance session. Click 'Class Management' to go back.",
                Page::AddStudent,
            )
            .with_target(".nav-links a[href='/class_management/']")
            .with_advance(Advance::Navigate { to: Page::ClassManagement }),
            StepDescriptor::new(
                "Click Create Session Tab 📋",
                "Now click the 'Create Session' tab and set up your first attendance session.",
                Page::ClassManagement,
            )
            .with_target(".nav-tab[data-tab='session']")
            .with_advance(Advance::ClickGated { event: EventKind::SessionCreated })
            .compact(),
            StepDescriptor::new(
                "Take Attendance 📷",
                "Almost done! Now go to 'Take Attendance' to use the AI camera system.",
                Page::ClassManagement,
            )
            .with_target(".nav-links a[href='/']")
            .with_advance(Advance::Navigate { to: Page::Home }),
            StepDescriptor::new(
                "Select a Session 📋",
                "First, select the session you just created from the dropdown to start taking attendance.",
                Page::Home,
            )
            .with_target("#sessionSelect")
            .with_advance(Advance::ClickGated { event: EventKind::SessionSelected }),
            StepDescriptor::new(
                "Start the Camera 📸",
                "Great! Now click 'Start Camera' to begin the face recognition system.",
                Page::Home,
            )
            .with_target("#start")
            .with_advance(Advance::ClickGated { event: EventKind::CameraStarted }),
            StepDescriptor::new(
                "Position Yourself & Take Attendance 👤",
                "Keep your face centered in the camera, ensure good lighting, and wait for a GREEN BOX to appear around your face. Click 'Next' to hide this overlay, then click 'Take Attendance' to complete the onboarding!",
                Page::Home,
            )
            .with_advance(Advance::HideOnNext { event: EventKind::AttendanceTaken }),
            StepDescriptor::new(
                "Success! Attendance Taken! 🎉",
                "Excellent! You've successfully taken attendance for {studentName}. The system recognized you and recorded your attendance. You've completed the core workflow!",
                Page::Home,
            ),
            StepDescriptor::new(
                "You're All Set! 🎊",
                "Congratulations! You now know the complete workflow. Create classes, add students, create sessions, and take attendance with AI face recognition. Don't forget to explore the 'View Records', 'Advanced Analytics', and 'AI Assistant' pages to get the most out of your system!",
                Page::Any,
            ),
        ];
        Self { steps }
    }
}
