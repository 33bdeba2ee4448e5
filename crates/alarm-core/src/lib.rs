//! Shared types for the alarm-history pipeline.
//!
//! Record models, the error taxonomy, export timestamp parsing, CLI settings
//! and report formatting helpers used by the data and binary crates.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{AlarmError, Result};
