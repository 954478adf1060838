//! Core domain entities.
//!
//! The service has a single entity, [`Mapping`], binding a short code to a long URL
//! for a bounded lifetime.

pub mod mapping;

pub use mapping::Mapping;
