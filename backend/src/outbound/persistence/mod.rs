//! Car repository adapters.
//!
//! - [`InMemoryCarRepository`]: process-local map, used in tests and when no
//!   data file is configured.
//! - [`JsonFileCarRepository`]: the same map persisted as a JSON snapshot
//!   after every write through a capability-scoped directory handle.
//!
//! Both adapters replace a record in one step, so readers see either the old
//! or the new binding and never a mix.

mod in_memory_car_repository;
mod json_file_car_repository;

pub use in_memory_car_repository::InMemoryCarRepository;
pub use json_file_car_repository::JsonFileCarRepository;
