//! Short code generation and custom alias validation.
//!
//! Codes are derived from the long URL: the first [`CODE_HASH_BYTES`] bytes of a
//! seeded SHA-256 digest, encoded as URL-safe base64 without padding (8 characters).
//! On collision the hash input is extended with a character picked from the long
//! URL by the previous digest, so every retry hashes a longer, different string.

use crate::error::AppError;
use base64::Engine as _;
use serde_json::json;
use sha2::{Digest, Sha256};

/// Digest bytes kept for a code.
const CODE_HASH_BYTES: usize = 6;

/// Longest accepted custom alias.
const MAX_ALIAS_LENGTH: usize = 64;

/// Reserved codes that cannot be used as aliases.
///
/// These collide with the service's own routes.
const RESERVED_CODES: &[&str] = &["shorten", "health"];

/// Deterministic, collision-resolving short code generator.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    seed: u64,
    max_attempts: usize,
}

impl CodeGenerator {
    /// Creates a generator.
    ///
    /// `seed` is mixed into every hash; instances sharing a store must share it.
    /// `max_attempts` is how many candidates a caller should try before giving up.
    pub fn new(seed: u64, max_attempts: usize) -> Self {
        Self {
            seed,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns the sequence of candidate codes for `long_url`, first choice first.
    pub fn candidates<'a>(&'a self, long_url: &'a str) -> Candidates<'a> {
        Candidates {
            generator: self,
            source: long_url.chars().collect(),
            input: long_url.to_string(),
        }
    }

    fn digest(&self, input: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(input.as_bytes());
        hasher.finalize().into()
    }
}

/// Candidate codes for one long URL, see [`CodeGenerator::candidates`].
pub struct Candidates<'a> {
    generator: &'a CodeGenerator,
    source: Vec<char>,
    input: String,
}

impl Iterator for Candidates<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let digest = self.generator.digest(&self.input);
        let code = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(&digest[..CODE_HASH_BYTES]);

        // Pick the next suffix character from the tail of the digest.
        if !self.source.is_empty() {
            let pick = u32::from_le_bytes([digest[28], digest[29], digest[30], digest[31]]);
            self.input
                .push(self.source[pick as usize % self.source.len()]);
        } else {
            self.input.push('~');
        }

        Some(code)
    }
}

/// Validates a caller-supplied alias.
///
/// # Rules
///
/// - Length: 1-64 characters
/// - Allowed characters: ASCII letters, digits, `-` and `_`
/// - Cannot be a reserved route name
///
/// # Errors
///
/// Returns [`AppError::InvalidInput`] if any rule is violated.
pub fn validate_custom_alias(alias: &str) -> Result<(), AppError> {
    if alias.is_empty() || alias.len() > MAX_ALIAS_LENGTH {
        return Err(AppError::invalid_input(
            "Custom alias must be 1-64 characters",
            json!({ "provided_length": alias.len() }),
        ));
    }

    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::invalid_input(
            "Custom alias can only contain letters, digits, hyphens and underscores",
            json!({ "alias": alias }),
        ));
    }

    if RESERVED_CODES.contains(&alias) {
        return Err(AppError::invalid_input(
            "This alias is reserved",
            json!({ "alias": alias }),
        ));
    }

    Ok(())
}
