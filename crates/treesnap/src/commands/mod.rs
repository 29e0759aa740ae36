//! Command handlers for the treesnap CLI.

pub mod config;
pub mod diff;
pub mod snapshot;

pub use config::*;
pub use diff::*;
pub use snapshot::*;
