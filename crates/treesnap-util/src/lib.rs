//! Shared utilities for treesnap.
//!
//! This crate provides common utilities used across the treesnap workspace:
//! - Logging setup with tracing
//! - Path utilities (data directories, slash-normalized relative paths)

pub mod log;
pub mod path;

pub use log::{LogConfig, LogLevel};
