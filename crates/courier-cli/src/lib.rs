//! courierd library surface
//!
//! Kept as a thin library so the configuration and CLI definitions are unit
//! testable; the binary entry point lives in `main.rs`.

pub mod cli;
pub mod config;
pub mod error;
