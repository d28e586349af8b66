//! Command-line tooling for synchronized settings.

pub mod commands;
pub mod logging;
pub mod summary;
