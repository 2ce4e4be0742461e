//! ECDH-ES key agreement for JOSE
//!
//! This crate provides the key agreement step of JWE's ECDH-ES algorithms
//! (RFC 7518 Section 4.6): curve resolution and the ECDH-ES curve
//! allow-list, ephemeral key generation matching a recipient's static key,
//! and key derivation with the Concat KDF of NIST SP 800-56A. Elliptic-curve
//! arithmetic is delegated to a [`KeyAgreementProvider`].

/// JWE algorithm identifiers
pub mod algorithm;

/// Key agreement configuration
pub mod config;

/// Curve resolution and allow-list
pub mod curve;

/// Key agreement orchestration
pub mod ecdh_es;

/// Error types
pub mod error;

/// Concat KDF
pub mod kdf;

/// Key handles
pub mod key;

/// Primitive provider
pub mod provider;

// Re-export key types for convenience
pub use algorithm::{agreement_params, AgreementParams, ContentEncryption, KeyManagementAlgorithm};
pub use config::EcdhEsConfig;
pub use curve::{ecdh_allowed, is_agreement_allowed, resolve_curve, CurveFamily, NamedCurve};
pub use ecdh_es::{derive_key, generate_epk, EcdhEs};
pub use error::{Error, Result};
pub use kdf::{concat_kdf, other_info};
pub use key::{CryptoKey, KeyAlgorithm, KeyHandle, KeyObject, KeyObjectType, KeyUsage};
pub use provider::{EphemeralKeyPair, KeyAgreementProvider, NativeProvider, SharedSecret};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
