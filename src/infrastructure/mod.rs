//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for persistence, caching and rate limit state.
//!
//! # Modules
//!
//! - [`cache`] - Caching abstractions (Redis, in-memory and no-op implementations)
//! - [`persistence`] - PostgreSQL and in-memory mapping stores
//! - [`rate_limit`] - Token bucket state shared between instances

pub mod cache;
pub mod persistence;
pub mod rate_limit;
