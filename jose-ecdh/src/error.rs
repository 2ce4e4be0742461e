//! Error handling for ECDH-ES key agreement
//!
//! This module provides the error type shared by every operation in the crate.

use thiserror::Error;

/// Type alias for Results with ECDH-ES errors
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ECDH-ES key agreement
#[derive(Error, Debug)]
pub enum Error {
    /// Key has the wrong shape, type or usage restrictions for the operation
    #[error("Invalid key input: {0}")]
    InvalidKeyInput(String),

    /// Key belongs to an algorithm family that cannot be used for ECDH-ES
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// Named curve is missing from the key metadata or not recognized
    #[error("Unknown curve: {0}")]
    UnknownCurve(String),

    /// The primitive provider failed to compute the shared secret
    #[error("Key agreement failed: {0}")]
    KeyAgreementFailed(String),

    /// The primitive provider failed to generate a key pair
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Requested derived key length is not accepted
    #[error("Invalid key length: {0} bits")]
    InvalidKeyLength(u32),

    /// JOSE algorithm identifier is not an ECDH-ES algorithm or content encryption
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Configuration validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}
