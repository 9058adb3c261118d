//! Guided tour engine for the Smart Attendance web app.

pub mod config;
pub mod error;
pub mod overlay;
pub mod sandbox;
pub mod store;
pub mod tour;
