//! Shared test utilities for docflow integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring stores, broker and runtime inside a temp directory
//! - Builders for PDF and image fixtures
//! - Test doubles for the renderer and the stores

pub mod builders;
pub mod doubles;
pub mod harness;

pub use builders::*;
pub use doubles::*;
pub use harness::TestHarness;
