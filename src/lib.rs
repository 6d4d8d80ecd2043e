//! unnest - recursive nested-archive extractor
//!
//! Walks a directory tree, extracts every archive it finds next to itself,
//! and keeps going into the extracted output until no archives remain.

pub mod archive;
pub mod config;
pub mod progress;
pub mod report;
pub mod settings;
pub mod traverse;
