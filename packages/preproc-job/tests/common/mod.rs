//! Common test utilities for preproc-job
//!
//! Dataset trees and job files laid out in a temporary directory.

#![allow(dead_code)]

mod assertions;
mod fixtures;

// Re-export all utilities
pub use assertions::*;
pub use fixtures::*;
