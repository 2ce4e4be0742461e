//! Curve identity resolution and the ECDH-ES curve allow-list
//!
//! JOSE names curves by their registry names ("P-256", "X25519", ...). This
//! module maps key handles to those names and decides which of them may be
//! used for ECDH-ES key agreement (RFC 7518 Section 4.6 and RFC 8037).

use crate::error::{Error, Result};
use crate::key::{AsymmetricKeyType, KeyHandle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named curves recognized by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedCurve {
    /// NIST P-256 (secp256r1)
    #[serde(rename = "P-256")]
    P256,
    /// NIST P-384 (secp384r1)
    #[serde(rename = "P-384")]
    P384,
    /// NIST P-521 (secp521r1)
    #[serde(rename = "P-521")]
    P521,
    /// secp256k1, registered for JOSE by RFC 8812
    #[serde(rename = "secp256k1")]
    Secp256k1,
    /// Curve25519 in Montgomery form
    X25519,
    /// Curve448 in Montgomery form
    X448,
    /// Edwards25519, signatures only
    Ed25519,
}

/// Curves permitted for ECDH-ES, direct or with key wrapping
pub const AGREEMENT_CURVES: [NamedCurve; 5] = [
    NamedCurve::P256,
    NamedCurve::P384,
    NamedCurve::P521,
    NamedCurve::X25519,
    NamedCurve::X448,
];

impl NamedCurve {
    /// Returns the JOSE registry name of the curve
    pub fn as_str(&self) -> &'static str {
        match self {
            NamedCurve::P256 => "P-256",
            NamedCurve::P384 => "P-384",
            NamedCurve::P521 => "P-521",
            NamedCurve::Secp256k1 => "secp256k1",
            NamedCurve::X25519 => "X25519",
            NamedCurve::X448 => "X448",
            NamedCurve::Ed25519 => "Ed25519",
        }
    }

    /// Returns true if ECDH-ES may be performed on this curve
    pub fn is_agreement_allowed(&self) -> bool {
        AGREEMENT_CURVES.contains(self)
    }

    /// Returns true for short Weierstrass curves (the JWK "EC" key type)
    pub fn is_weierstrass(&self) -> bool {
        matches!(
            self,
            NamedCurve::P256 | NamedCurve::P384 | NamedCurve::P521 | NamedCurve::Secp256k1
        )
    }
}

impl fmt::Display for NamedCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamedCurve {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "P-256" => Ok(NamedCurve::P256),
            "P-384" => Ok(NamedCurve::P384),
            "P-521" => Ok(NamedCurve::P521),
            "secp256k1" => Ok(NamedCurve::Secp256k1),
            "X25519" => Ok(NamedCurve::X25519),
            "X448" => Ok(NamedCurve::X448),
            "Ed25519" => Ok(NamedCurve::Ed25519),
            other => Err(Error::UnknownCurve(other.to_string())),
        }
    }
}

/// Curve family used to pick an ephemeral key generator.
///
/// Resolved once per key and handed to the primitive provider, so the
/// provider never has to inspect the peer key again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveFamily {
    /// Short Weierstrass curve, constrained to the given named curve
    EllipticCurve(NamedCurve),
    /// X25519 (RFC 7748)
    X25519,
    /// X448 (RFC 7748)
    X448,
}

impl CurveFamily {
    /// Resolves the family of a peer key for ephemeral key generation.
    ///
    /// A `CryptoKey` is normalized to its key object first; only the
    /// asymmetric key type of the material is consulted.
    pub fn of<'a>(key: impl Into<KeyHandle<'a>>) -> Result<Self> {
        let object = key.into().key_object();
        match object.asymmetric_key_type() {
            Some(AsymmetricKeyType::X25519) => Ok(CurveFamily::X25519),
            Some(AsymmetricKeyType::X448) => Ok(CurveFamily::X448),
            Some(AsymmetricKeyType::Ec) => Ok(CurveFamily::EllipticCurve(resolve_curve(object)?)),
            _ => Err(Error::UnsupportedKeyType(
                "Invalid or unsupported EPK".to_string(),
            )),
        }
    }

    /// Returns the named curve keys of this family are generated on
    pub fn curve(&self) -> NamedCurve {
        match self {
            CurveFamily::EllipticCurve(curve) => *curve,
            CurveFamily::X25519 => NamedCurve::X25519,
            CurveFamily::X448 => NamedCurve::X448,
        }
    }
}

/// Determines the named curve of a key.
///
/// For a key object the curve comes from the key material. For a
/// `CryptoKey` it comes from the algorithm metadata (see
/// [`KeyAlgorithm::curve`](crate::key::KeyAlgorithm::curve)), which
/// `CryptoKey::new` has already checked against the wrapped key.
///
/// # Errors
/// * `UnsupportedKeyType` if the key is not an elliptic, Montgomery or
///   Edwards curve key
/// * `UnknownCurve` if the named curve is absent or not recognized
pub fn resolve_curve<'a>(key: impl Into<KeyHandle<'a>>) -> Result<NamedCurve> {
    match key.into() {
        KeyHandle::Object(object) => {
            if object.asymmetric_key_type().is_none() {
                return Err(Error::UnsupportedKeyType(format!(
                    "{} keys have no named curve",
                    object.key_type().as_str()
                )));
            }
            object
                .named_curve()
                .ok_or_else(|| Error::UnknownCurve("key material has no named curve".to_string()))
        }
        KeyHandle::Crypto(crypto_key) => {
            let algorithm = crypto_key.algorithm();
            algorithm.curve()?.ok_or_else(|| {
                Error::UnsupportedKeyType(format!("{} keys have no named curve", algorithm.name))
            })
        }
    }
}

/// Returns true iff the curve name is permitted for ECDH-ES.
///
/// Unrecognized names (e.g. "P-256K") are simply not allowed.
pub fn is_agreement_allowed(curve: &str) -> bool {
    curve
        .parse::<NamedCurve>()
        .map(|curve| curve.is_agreement_allowed())
        .unwrap_or(false)
}

/// Resolves the curve of `key` and checks it against the allow-list
pub fn ecdh_allowed<'a>(key: impl Into<KeyHandle<'a>>) -> Result<bool> {
    Ok(resolve_curve(key)?.is_agreement_allowed())
}
