//! Data pipeline for equipment alarm-history exports.
//!
//! Reads an export from a file, stream or URL, decodes and splits it into
//! positional rows, normalizes those rows into typed records with an
//! extracted actor, and aggregates the records for reporting and CSV export.

pub mod aggregator;
pub mod analysis;
pub mod export;
pub mod normalizer;
pub mod reader;
pub mod source;

pub use alarm_core as core;
