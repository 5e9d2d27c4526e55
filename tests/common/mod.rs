//! Shared test utilities for dtrain integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Every helper works inside a [`tempfile::TempDir`] so
//! harnesses never touch the real working directory.

pub mod assertions;
pub mod builders;
pub mod fake_trainer;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fake_trainer::*;
pub use fixtures::*;
