//! Test utilities for the nomcar crate.
//!
//! Shared by unit tests in `src/` and integration tests in `tests/`. Compiled
//! for tests and when the `test-support` feature is enabled.

pub mod notification;
