//! Business logic services for the application layer.

pub mod mapping_service;
pub mod rate_limiter;

pub use mapping_service::{MappingService, MappingSettings};
pub use rate_limiter::{Admission, FailurePolicy, RateLimiter};
