//! Core library for the cohort-analytics command line application.
//!
//! The library exposes two independent pipelines that power the command-line
//! interface as well as the tests. The file-based pipeline loads four flat
//! educational tables, joins and aggregates them ([`loader`], [`join`],
//! [`aggregate`]), and emits a styled spreadsheet report ([`report`]) plus
//! static and interactive chart artifacts ([`charts`], [`interactive`]). The
//! database pipeline ([`db`]) runs a fixed catalog of analytical queries and
//! persists each result set. The pipelines share only the tabular
//! representations in [`model`].

pub mod aggregate;
pub mod charts;
pub mod config;
pub mod db;
pub mod error;
pub mod interactive;
pub mod join;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod report;

pub use error::{Result, ToolError};
