//! Helpers shared by the service and HTTP layers.
//!
//! - [`code_generator`] - Short code generation and alias validation
//! - [`url_validator`] - Long URL validation
//! - [`client_ip`] - Client identity for rate limiting

pub mod client_ip;
pub mod code_generator;
pub mod url_validator;

pub use client_ip::client_ip;
pub use code_generator::{CodeGenerator, validate_custom_alias};
pub use url_validator::{UrlValidationError, validate_long_url};
