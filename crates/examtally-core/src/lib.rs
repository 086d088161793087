//! examtally-core — export parsing, consolidation, difficulty and projection.
//!
//! This crate turns per-exam quiz exports into one consolidated view: a
//! student × exam attendance matrix, per-question difficulty indices, and
//! projected correct answers for exams a student has not rendered.

pub mod classifier;
pub mod config;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod matrix;
pub mod model;
pub mod parser;
pub mod projection;
pub mod report;
pub mod source;
pub mod traits;
