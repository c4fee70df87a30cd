//! Shared utilities for Kairo.
//!
//! Logging setup and time helpers used by every Kairo binary.

pub mod logger;
pub mod time;
