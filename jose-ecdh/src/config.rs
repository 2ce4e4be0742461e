//! Configuration for ECDH-ES key agreement

use crate::curve::{NamedCurve, AGREEMENT_CURVES};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Derived key lengths of the registered JWE algorithms, in bits
pub const DEFAULT_KEY_LENGTHS: [u32; 5] = [128, 192, 256, 384, 512];

/// Configuration options for an [`EcdhEs`](crate::EcdhEs) instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EcdhEsConfig {
    /// Curves accepted by the allow-list check
    pub allowed_curves: Vec<NamedCurve>,

    /// Derived key lengths accepted, in bits
    pub key_lengths: Vec<u32>,
}

impl EcdhEsConfig {
    /// Creates a configuration permitting every ECDH-ES curve and every
    /// registered key length
    pub fn new() -> Self {
        Self {
            allowed_curves: AGREEMENT_CURVES.to_vec(),
            key_lengths: DEFAULT_KEY_LENGTHS.to_vec(),
        }
    }

    /// Restricts the allowed curves
    pub fn with_allowed_curves(mut self, curves: &[NamedCurve]) -> Self {
        self.allowed_curves = curves.to_vec();
        self
    }

    /// Restricts the accepted key lengths
    pub fn with_key_lengths(mut self, lengths: &[u32]) -> Self {
        self.key_lengths = lengths.to_vec();
        self
    }

    /// Returns true if the curve is accepted
    pub fn allows_curve(&self, curve: NamedCurve) -> bool {
        self.allowed_curves.contains(&curve)
    }

    /// Returns true if a derived key of this length is accepted
    pub fn allows_key_length(&self, key_length_bits: u32) -> bool {
        self.key_lengths.contains(&key_length_bits)
    }
}

impl Default for EcdhEsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates a configuration.
///
/// Allowed curves must be a non-empty subset of the ECDH-ES curves and key
/// lengths must be positive multiples of 8.
pub fn validate(config: &EcdhEsConfig) -> Result<()> {
    if config.allowed_curves.is_empty() {
        return Err(Error::Validation(
            "at least one curve must be allowed".to_string(),
        ));
    }
    if let Some(curve) = config
        .allowed_curves
        .iter()
        .find(|curve| !curve.is_agreement_allowed())
    {
        return Err(Error::Validation(format!(
            "{} is not permitted for ECDH-ES",
            curve
        )));
    }
    if config.key_lengths.is_empty() {
        return Err(Error::Validation(
            "at least one key length must be accepted".to_string(),
        ));
    }
    if let Some(bits) = config
        .key_lengths
        .iter()
        .find(|bits| **bits == 0 || **bits % 8 != 0)
    {
        return Err(Error::Validation(format!(
            "key length {} is not a positive multiple of 8",
            bits
        )));
    }
    Ok(())
}
