//! Request middleware.
//!
//! Currently limited to per-request trace correlation.

pub mod trace;

pub use trace::Trace;
