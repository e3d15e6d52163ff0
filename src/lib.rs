//! Venturer - ventures, projects and STEP-prioritized work.
//!
//! This crate provides the core functionality for the `vt` CLI tool and its
//! HTTP analysis server.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Venture, Project, Milestone, Item, Team, ...)
//! - [`storage`] - SQLite database layer with audit events
//! - [`planning`] - STEP filtering and ordering, capacity, reports
//! - [`transfer`] - Template export/import, JSONL item import
//! - [`analysis`] - LLM task analysis
//! - [`server`] - axum server hosting `/analyzeTask`
//! - [`config`] - Paths, current user and settings
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod planning;
pub mod server;
pub mod storage;
pub mod transfer;
pub mod validate;

pub use error::{Error, Result};

/// Global silent mode flag for `--silent` output.
///
/// When set, create/mutate commands print only the ID instead of full
/// output. Avoids threading a `silent` bool through every handler signature.
pub static SILENT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Global CSV output flag (set when `--format csv`).
pub static CSV_OUTPUT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if silent mode is active.
#[inline]
pub fn is_silent() -> bool {
    SILENT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Check if CSV output is requested.
#[inline]
pub fn is_csv() -> bool {
    CSV_OUTPUT.load(std::sync::atomic::Ordering::Relaxed)
}
