//! JOSE algorithm identifiers used with ECDH-ES
//!
//! Maps the JWE "alg" and "enc" header values to the AlgorithmID and key
//! length fed into the Concat KDF (RFC 7518 Section 4.6.2): direct ECDH-ES
//! derives the content encryption key and uses the "enc" value, the key
//! wrapping variants derive the key encryption key and use the "alg" value.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// JWE key management algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyManagementAlgorithm {
    /// ECDH-ES direct key agreement
    EcdhEs,
    /// ECDH-ES + AES key wrap with 128-bit key
    EcdhEsA128kw,
    /// ECDH-ES + AES key wrap with 192-bit key
    EcdhEsA192kw,
    /// ECDH-ES + AES key wrap with 256-bit key
    EcdhEsA256kw,
}

impl KeyManagementAlgorithm {
    /// Returns the algorithm identifier as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyManagementAlgorithm::EcdhEs => "ECDH-ES",
            KeyManagementAlgorithm::EcdhEsA128kw => "ECDH-ES+A128KW",
            KeyManagementAlgorithm::EcdhEsA192kw => "ECDH-ES+A192KW",
            KeyManagementAlgorithm::EcdhEsA256kw => "ECDH-ES+A256KW",
        }
    }

    /// Returns true for direct key agreement
    pub fn is_direct(&self) -> bool {
        matches!(self, KeyManagementAlgorithm::EcdhEs)
    }

    /// Key encryption key length in bits, `None` for direct agreement
    pub fn wrap_key_length_bits(&self) -> Option<u32> {
        match self {
            KeyManagementAlgorithm::EcdhEs => None,
            KeyManagementAlgorithm::EcdhEsA128kw => Some(128),
            KeyManagementAlgorithm::EcdhEsA192kw => Some(192),
            KeyManagementAlgorithm::EcdhEsA256kw => Some(256),
        }
    }
}

impl fmt::Display for KeyManagementAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyManagementAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ECDH-ES" => Ok(KeyManagementAlgorithm::EcdhEs),
            "ECDH-ES+A128KW" => Ok(KeyManagementAlgorithm::EcdhEsA128kw),
            "ECDH-ES+A192KW" => Ok(KeyManagementAlgorithm::EcdhEsA192kw),
            "ECDH-ES+A256KW" => Ok(KeyManagementAlgorithm::EcdhEsA256kw),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// JWE content encryption algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncryption {
    /// AES-GCM with 128-bit key
    A128GCM,
    /// AES-GCM with 192-bit key
    A192GCM,
    /// AES-GCM with 256-bit key
    A256GCM,
    /// AES-CBC with HMAC-SHA-256
    A128CbcHs256,
    /// AES-CBC with HMAC-SHA-384
    A192CbcHs384,
    /// AES-CBC with HMAC-SHA-512
    A256CbcHs512,
}

impl ContentEncryption {
    /// Returns the algorithm identifier as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncryption::A128GCM => "A128GCM",
            ContentEncryption::A192GCM => "A192GCM",
            ContentEncryption::A256GCM => "A256GCM",
            ContentEncryption::A128CbcHs256 => "A128CBC-HS256",
            ContentEncryption::A192CbcHs384 => "A192CBC-HS384",
            ContentEncryption::A256CbcHs512 => "A256CBC-HS512",
        }
    }

    /// Content encryption key length in bits.
    ///
    /// The CBC-HMAC variants use a double-length key (MAC key || ENC key).
    pub fn cek_length_bits(&self) -> u32 {
        match self {
            ContentEncryption::A128GCM => 128,
            ContentEncryption::A192GCM => 192,
            ContentEncryption::A256GCM => 256,
            ContentEncryption::A128CbcHs256 => 256,
            ContentEncryption::A192CbcHs384 => 384,
            ContentEncryption::A256CbcHs512 => 512,
        }
    }
}

impl fmt::Display for ContentEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentEncryption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A128GCM" => Ok(ContentEncryption::A128GCM),
            "A192GCM" => Ok(ContentEncryption::A192GCM),
            "A256GCM" => Ok(ContentEncryption::A256GCM),
            "A128CBC-HS256" => Ok(ContentEncryption::A128CbcHs256),
            "A192CBC-HS384" => Ok(ContentEncryption::A192CbcHs384),
            "A256CBC-HS512" => Ok(ContentEncryption::A256CbcHs512),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Concat KDF inputs implied by a JWE "alg"/"enc" pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementParams {
    /// AlgorithmID placed in OtherInfo
    pub algorithm_id: &'static str,
    /// Length of the derived key in bits
    pub key_length_bits: u32,
}

impl AgreementParams {
    /// Computes the parameters for typed identifiers
    pub fn new(alg: KeyManagementAlgorithm, enc: ContentEncryption) -> Self {
        match alg.wrap_key_length_bits() {
            Some(key_length_bits) => Self {
                algorithm_id: alg.as_str(),
                key_length_bits,
            },
            None => Self {
                algorithm_id: enc.as_str(),
                key_length_bits: enc.cek_length_bits(),
            },
        }
    }
}

/// Computes the Concat KDF parameters from JWE header values
///
/// # Errors
/// `UnsupportedAlgorithm` if `alg` is not an ECDH-ES algorithm or `enc` is
/// not a registered content encryption algorithm.
pub fn agreement_params(alg: &str, enc: &str) -> Result<AgreementParams> {
    Ok(AgreementParams::new(alg.parse()?, enc.parse()?))
}
