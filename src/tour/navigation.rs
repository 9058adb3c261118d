//! Logical pages of the host application and path matching.

use serde::{Deserialize, Serialize};

/// A named page of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    /// Shown on whatever page the user is on.
    Any,
    Dashboard,
    ClassManagement,
    AddStudent,
    Home,
}

impl Page {
    /// The page a forced restart is honored from.
    pub const START: Page = Page::Dashboard;

    /// Absolute path of the page. `Any` has no path of its own.
    pub fn path(&self) -> Option<&'static str> {
        match self {
            Self::Any => None,
            Self::Dashboard => Some("/dashboard/"),
            Self::ClassManagement => Some("/class_management/"),
            Self::AddStudent => Some("/add_student/"),
            Self::Home => Some("/"),
        }
    }

    /// Whether `path` belongs to this page.
    ///
    /// Substring containment on the path segment; home also matches the
    /// bare root.
    pub fn matches_path(&self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Dashboard => path.contains("/dashboard/"),
            Self::ClassManagement => path.contains("/class_management/"),
            Self::AddStudent => path.contains("/add_student/"),
            Self::Home => path == "/" || path.contains("/home/"),
        }
    }

    /// Whether `path` is the designated start page.
    pub fn is_start_page(path: &str) -> bool {
        Self::START.matches_path(path)
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Any => "any",
            Self::Dashboard => "dashboard",
            Self::ClassManagement => "class_management",
            Self::AddStudent => "add_student",
            Self::Home => "home",
        };
        write!(f, "{s}")
    }
}
