//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository and cache
//! calls, validation, and business rules. Services consume the domain traits and
//! provide a clean API for HTTP handlers.
//!
//! # Available Services
//!
//! - [`services::mapping_service::MappingService`] - Mapping creation and cache-aside lookup
//! - [`services::rate_limiter::RateLimiter`] - Distributed admission control for writes

pub mod services;
