//! Key handles for ECDH-ES operations
//!
//! Keys reach the agreement code in one of two shapes:
//! - [`KeyObject`], the provider-native form holding the key material
//! - [`CryptoKey`], a capability form that wraps a key object together with
//!   its algorithm metadata and usage restrictions
//!
//! Both are accepted through [`KeyHandle`], which normalizes to a key object
//! once at the boundary and enforces the usage rules of each agreement role.

use crate::curve::NamedCurve;
use crate::error::{Error, Result};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Length in bytes of X448 keys
pub(crate) const X448_KEY_LEN: usize = 56;

/// Kind of key material held by a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyObjectType {
    /// Symmetric secret
    Secret,
    /// Public half of an asymmetric key pair
    Public,
    /// Private half of an asymmetric key pair
    Private,
}

impl KeyObjectType {
    /// Returns the key type as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyObjectType::Secret => "secret",
            KeyObjectType::Public => "public",
            KeyObjectType::Private => "private",
        }
    }
}

/// Asymmetric algorithm family of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsymmetricKeyType {
    /// Short Weierstrass elliptic curve key
    Ec,
    /// X25519 key
    X25519,
    /// X448 key
    X448,
    /// Ed25519 key
    Ed25519,
}

#[derive(Clone)]
pub(crate) enum KeyMaterial {
    Symmetric(Zeroizing<Vec<u8>>),
    P256Public(p256::PublicKey),
    P256Private(p256::SecretKey),
    P384Public(p384::PublicKey),
    P384Private(p384::SecretKey),
    P521Public(p521::PublicKey),
    P521Private(p521::SecretKey),
    Secp256k1Public(k256::PublicKey),
    Secp256k1Private(k256::SecretKey),
    X25519Public(x25519_dalek::PublicKey),
    X25519Private(x25519_dalek::StaticSecret),
    X448Public([u8; X448_KEY_LEN]),
    X448Private(Zeroizing<[u8; X448_KEY_LEN]>),
    Ed25519Public(ed25519_dalek::VerifyingKey),
    Ed25519Private(ed25519_dalek::SigningKey),
}

/// Provider-native key representation
#[derive(Clone)]
pub struct KeyObject {
    material: KeyMaterial,
}

impl KeyObject {
    pub(crate) fn from_material(material: KeyMaterial) -> Self {
        Self { material }
    }

    pub(crate) fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Create a symmetric secret key
    pub fn secret(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_material(KeyMaterial::Symmetric(Zeroizing::new(bytes.into())))
    }

    /// Import a public key from its encoded form.
    ///
    /// Weierstrass curves take a SEC1 point (compressed or uncompressed),
    /// X25519, X448 and Ed25519 take the raw public key bytes.
    pub fn from_public_bytes(curve: NamedCurve, bytes: &[u8]) -> Result<Self> {
        let invalid = |e: &dyn fmt::Display| {
            Error::InvalidKeyInput(format!("Invalid {} public key: {}", curve, e))
        };
        let material = match curve {
            NamedCurve::P256 => KeyMaterial::P256Public(
                p256::PublicKey::from_sec1_bytes(bytes).map_err(|e| invalid(&e))?,
            ),
            NamedCurve::P384 => KeyMaterial::P384Public(
                p384::PublicKey::from_sec1_bytes(bytes).map_err(|e| invalid(&e))?,
            ),
            NamedCurve::P521 => KeyMaterial::P521Public(
                p521::PublicKey::from_sec1_bytes(bytes).map_err(|e| invalid(&e))?,
            ),
            NamedCurve::Secp256k1 => KeyMaterial::Secp256k1Public(
                k256::PublicKey::from_sec1_bytes(bytes).map_err(|e| invalid(&e))?,
            ),
            NamedCurve::X25519 => {
                let raw: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| invalid(&"expected 32 bytes"))?;
                KeyMaterial::X25519Public(x25519_dalek::PublicKey::from(raw))
            }
            NamedCurve::X448 => {
                let raw: [u8; X448_KEY_LEN] = bytes
                    .try_into()
                    .map_err(|_| invalid(&"expected 56 bytes"))?;
                KeyMaterial::X448Public(raw)
            }
            NamedCurve::Ed25519 => {
                let raw: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| invalid(&"expected 32 bytes"))?;
                KeyMaterial::Ed25519Public(
                    ed25519_dalek::VerifyingKey::from_bytes(&raw).map_err(|e| invalid(&e))?,
                )
            }
        };
        Ok(Self::from_material(material))
    }

    /// Import a private key from its raw scalar or seed bytes
    pub fn from_private_bytes(curve: NamedCurve, bytes: &[u8]) -> Result<Self> {
        let invalid = |e: &dyn fmt::Display| {
            Error::InvalidKeyInput(format!("Invalid {} private key: {}", curve, e))
        };
        let material = match curve {
            NamedCurve::P256 => KeyMaterial::P256Private(
                p256::SecretKey::from_slice(bytes).map_err(|e| invalid(&e))?,
            ),
            NamedCurve::P384 => KeyMaterial::P384Private(
                p384::SecretKey::from_slice(bytes).map_err(|e| invalid(&e))?,
            ),
            NamedCurve::P521 => KeyMaterial::P521Private(
                p521::SecretKey::from_slice(bytes).map_err(|e| invalid(&e))?,
            ),
            NamedCurve::Secp256k1 => KeyMaterial::Secp256k1Private(
                k256::SecretKey::from_slice(bytes).map_err(|e| invalid(&e))?,
            ),
            NamedCurve::X25519 => {
                let raw: Zeroizing<[u8; 32]> = Zeroizing::new(
                    bytes
                        .try_into()
                        .map_err(|_| invalid(&"expected 32 bytes"))?,
                );
                KeyMaterial::X25519Private(x25519_dalek::StaticSecret::from(*raw))
            }
            NamedCurve::X448 => KeyMaterial::X448Private(Zeroizing::new(
                bytes
                    .try_into()
                    .map_err(|_| invalid(&"expected 56 bytes"))?,
            )),
            NamedCurve::Ed25519 => {
                let raw: Zeroizing<[u8; 32]> = Zeroizing::new(
                    bytes
                        .try_into()
                        .map_err(|_| invalid(&"expected 32 bytes"))?,
                );
                KeyMaterial::Ed25519Private(ed25519_dalek::SigningKey::from_bytes(&raw))
            }
        };
        Ok(Self::from_material(material))
    }

    /// Returns whether this is a secret, public or private key
    pub fn key_type(&self) -> KeyObjectType {
        match &self.material {
            KeyMaterial::Symmetric(_) => KeyObjectType::Secret,
            KeyMaterial::P256Public(_)
            | KeyMaterial::P384Public(_)
            | KeyMaterial::P521Public(_)
            | KeyMaterial::Secp256k1Public(_)
            | KeyMaterial::X25519Public(_)
            | KeyMaterial::X448Public(_)
            | KeyMaterial::Ed25519Public(_) => KeyObjectType::Public,
            _ => KeyObjectType::Private,
        }
    }

    /// Returns the asymmetric algorithm family, `None` for secret keys
    pub fn asymmetric_key_type(&self) -> Option<AsymmetricKeyType> {
        match self.named_curve()? {
            curve if curve.is_weierstrass() => Some(AsymmetricKeyType::Ec),
            NamedCurve::X25519 => Some(AsymmetricKeyType::X25519),
            NamedCurve::X448 => Some(AsymmetricKeyType::X448),
            _ => Some(AsymmetricKeyType::Ed25519),
        }
    }

    /// Returns the curve of the key material, `None` for secret keys
    pub fn named_curve(&self) -> Option<NamedCurve> {
        let curve = match &self.material {
            KeyMaterial::Symmetric(_) => return None,
            KeyMaterial::P256Public(_) | KeyMaterial::P256Private(_) => NamedCurve::P256,
            KeyMaterial::P384Public(_) | KeyMaterial::P384Private(_) => NamedCurve::P384,
            KeyMaterial::P521Public(_) | KeyMaterial::P521Private(_) => NamedCurve::P521,
            KeyMaterial::Secp256k1Public(_) | KeyMaterial::Secp256k1Private(_) => {
                NamedCurve::Secp256k1
            }
            KeyMaterial::X25519Public(_) | KeyMaterial::X25519Private(_) => NamedCurve::X25519,
            KeyMaterial::X448Public(_) | KeyMaterial::X448Private(_) => NamedCurve::X448,
            KeyMaterial::Ed25519Public(_) | KeyMaterial::Ed25519Private(_) => NamedCurve::Ed25519,
        };
        Some(curve)
    }

    /// Returns the public half of this key.
    ///
    /// Public keys are returned as a copy; private keys have their public key
    /// computed. Secret keys have no public half.
    pub fn to_public(&self) -> Result<KeyObject> {
        let material = match &self.material {
            KeyMaterial::Symmetric(_) => {
                return Err(Error::InvalidKeyInput(
                    "secret keys have no public key".to_string(),
                ))
            }
            KeyMaterial::P256Private(sk) => KeyMaterial::P256Public(sk.public_key()),
            KeyMaterial::P384Private(sk) => KeyMaterial::P384Public(sk.public_key()),
            KeyMaterial::P521Private(sk) => KeyMaterial::P521Public(sk.public_key()),
            KeyMaterial::Secp256k1Private(sk) => KeyMaterial::Secp256k1Public(sk.public_key()),
            KeyMaterial::X25519Private(sk) => {
                KeyMaterial::X25519Public(x25519_dalek::PublicKey::from(sk))
            }
            KeyMaterial::X448Private(sk) => {
                let secret = x448::Secret::from_bytes(&sk[..]).ok_or_else(|| {
                    Error::InvalidKeyInput("Invalid X448 private key".to_string())
                })?;
                KeyMaterial::X448Public(*x448::PublicKey::from(&secret).as_bytes())
            }
            KeyMaterial::Ed25519Private(sk) => KeyMaterial::Ed25519Public(sk.verifying_key()),
            public => public.clone(),
        };
        Ok(Self::from_material(material))
    }

    /// Export the public key bytes.
    ///
    /// Weierstrass curves export an uncompressed SEC1 point, the other curves
    /// their raw public key.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        let public = self.to_public()?;
        let bytes = match &public.material {
            KeyMaterial::P256Public(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            KeyMaterial::P384Public(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            KeyMaterial::P521Public(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            KeyMaterial::Secp256k1Public(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            KeyMaterial::X25519Public(pk) => pk.as_bytes().to_vec(),
            KeyMaterial::X448Public(pk) => pk.to_vec(),
            KeyMaterial::Ed25519Public(pk) => pk.as_bytes().to_vec(),
            _ => {
                return Err(Error::InvalidKeyInput(
                    "key has no public key bytes".to_string(),
                ))
            }
        };
        Ok(bytes)
    }
}

impl fmt::Debug for KeyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of debug output
        f.debug_struct("KeyObject")
            .field("type", &self.key_type().as_str())
            .field("curve", &self.named_curve().map(|c| c.as_str()))
            .finish_non_exhaustive()
    }
}

impl From<p256::SecretKey> for KeyObject {
    fn from(key: p256::SecretKey) -> Self {
        Self::from_material(KeyMaterial::P256Private(key))
    }
}

impl From<p256::PublicKey> for KeyObject {
    fn from(key: p256::PublicKey) -> Self {
        Self::from_material(KeyMaterial::P256Public(key))
    }
}

impl From<p384::SecretKey> for KeyObject {
    fn from(key: p384::SecretKey) -> Self {
        Self::from_material(KeyMaterial::P384Private(key))
    }
}

impl From<p384::PublicKey> for KeyObject {
    fn from(key: p384::PublicKey) -> Self {
        Self::from_material(KeyMaterial::P384Public(key))
    }
}

impl From<p521::SecretKey> for KeyObject {
    fn from(key: p521::SecretKey) -> Self {
        Self::from_material(KeyMaterial::P521Private(key))
    }
}

impl From<p521::PublicKey> for KeyObject {
    fn from(key: p521::PublicKey) -> Self {
        Self::from_material(KeyMaterial::P521Public(key))
    }
}

impl From<k256::SecretKey> for KeyObject {
    fn from(key: k256::SecretKey) -> Self {
        Self::from_material(KeyMaterial::Secp256k1Private(key))
    }
}

impl From<k256::PublicKey> for KeyObject {
    fn from(key: k256::PublicKey) -> Self {
        Self::from_material(KeyMaterial::Secp256k1Public(key))
    }
}

impl From<x25519_dalek::StaticSecret> for KeyObject {
    fn from(key: x25519_dalek::StaticSecret) -> Self {
        Self::from_material(KeyMaterial::X25519Private(key))
    }
}

impl From<x25519_dalek::PublicKey> for KeyObject {
    fn from(key: x25519_dalek::PublicKey) -> Self {
        Self::from_material(KeyMaterial::X25519Public(key))
    }
}

impl From<ed25519_dalek::SigningKey> for KeyObject {
    fn from(key: ed25519_dalek::SigningKey) -> Self {
        Self::from_material(KeyMaterial::Ed25519Private(key))
    }
}

impl From<ed25519_dalek::VerifyingKey> for KeyObject {
    fn from(key: ed25519_dalek::VerifyingKey) -> Self {
        Self::from_material(KeyMaterial::Ed25519Public(key))
    }
}

/// Permitted operations of a [`CryptoKey`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyUsage {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    DeriveKey,
    DeriveBits,
    WrapKey,
    UnwrapKey,
}

impl KeyUsage {
    /// Returns the usage as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyUsage::Encrypt => "encrypt",
            KeyUsage::Decrypt => "decrypt",
            KeyUsage::Sign => "sign",
            KeyUsage::Verify => "verify",
            KeyUsage::DeriveKey => "deriveKey",
            KeyUsage::DeriveBits => "deriveBits",
            KeyUsage::WrapKey => "wrapKey",
            KeyUsage::UnwrapKey => "unwrapKey",
        }
    }
}

/// Algorithm metadata attached to a [`CryptoKey`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAlgorithm {
    /// Algorithm name, e.g. "ECDH" or "X25519"
    pub name: String,
    /// Named curve attribute of EC algorithms
    pub named_curve: Option<String>,
}

impl KeyAlgorithm {
    /// Creates algorithm metadata without a named curve
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            named_curve: None,
        }
    }

    /// Sets the named curve attribute
    pub fn with_named_curve(mut self, curve: &str) -> Self {
        self.named_curve = Some(curve.to_string());
        self
    }

    /// Metadata of an ECDH-capable key on `curve`.
    ///
    /// Weierstrass curves use the "ECDH" algorithm with a named curve; the
    /// Montgomery curves use their own algorithm names.
    pub fn ecdh(curve: NamedCurve) -> Self {
        if curve.is_weierstrass() {
            Self::new("ECDH").with_named_curve(curve.as_str())
        } else {
            Self::new(curve.as_str())
        }
    }

    fn is_ecdh(&self) -> bool {
        matches!(self.name.as_str(), "ECDH" | "X25519" | "X448")
    }

    /// Returns the curve this metadata describes.
    ///
    /// ECDH and ECDSA keys name their curve in the `namedCurve` attribute,
    /// the X25519, X448 and Ed25519 algorithms are named after their curve.
    /// Other algorithms describe no curve.
    ///
    /// # Errors
    /// `UnknownCurve` if an ECDH or ECDSA key has a missing or unrecognized
    /// `namedCurve`
    pub fn curve(&self) -> Result<Option<NamedCurve>> {
        match self.name.as_str() {
            "ECDH" | "ECDSA" => self
                .named_curve
                .as_deref()
                .ok_or_else(|| Error::UnknownCurve("namedCurve is missing".to_string()))?
                .parse()
                .map(Some),
            "X25519" | "X448" | "Ed25519" => self.name.parse().map(Some),
            _ => Ok(None),
        }
    }
}

/// Capability form of a key: a key object restricted to an algorithm and a
/// set of usages.
///
/// The algorithm metadata always describes the wrapped key.
#[derive(Debug, Clone)]
pub struct CryptoKey {
    algorithm: KeyAlgorithm,
    usages: Vec<KeyUsage>,
    key: KeyObject,
}

impl CryptoKey {
    /// Wrap a key object with algorithm metadata and usages.
    ///
    /// # Errors
    /// * `UnknownCurve` if EC metadata has a missing or unrecognized curve
    /// * `InvalidKeyInput` if the curve described by `algorithm` is not the
    ///   curve of `key`
    pub fn new(
        key: KeyObject,
        algorithm: KeyAlgorithm,
        usages: impl IntoIterator<Item = KeyUsage>,
    ) -> Result<Self> {
        let declared = algorithm.curve()?;
        let actual = key.named_curve();
        if declared != actual {
            return Err(Error::InvalidKeyInput(format!(
                "CryptoKey algorithm {} does not match a {} key on {}",
                algorithm.name,
                key.key_type().as_str(),
                actual.map(|c| c.as_str()).unwrap_or("no curve")
            )));
        }
        Ok(Self {
            algorithm,
            usages: usages.into_iter().collect(),
            key,
        })
    }

    /// Wrap a key object as an ECDH key with metadata taken from its material
    pub fn for_agreement(
        key: KeyObject,
        usages: impl IntoIterator<Item = KeyUsage>,
    ) -> Result<Self> {
        let curve = key.named_curve().ok_or_else(|| {
            Error::UnsupportedKeyType("secret keys cannot be used for ECDH".to_string())
        })?;
        if curve == NamedCurve::Ed25519 {
            return Err(Error::UnsupportedKeyType(
                "Ed25519 keys cannot be used for ECDH".to_string(),
            ));
        }
        Self::new(key, KeyAlgorithm::ecdh(curve), usages)
    }

    /// Returns the algorithm metadata
    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }

    /// Returns the permitted usages
    pub fn usages(&self) -> &[KeyUsage] {
        &self.usages
    }

    /// Returns the key type of the wrapped key object
    pub fn key_type(&self) -> KeyObjectType {
        self.key.key_type()
    }

    /// Returns the wrapped key object
    pub fn key_object(&self) -> &KeyObject {
        &self.key
    }

    /// Checks the key is an ECDH-ES key permitting one of `usages`.
    ///
    /// An empty `usages` list skips the usage check.
    fn check_agreement(&self, usages: &[KeyUsage]) -> Result<()> {
        if !self.algorithm.is_ecdh() {
            return Err(Error::InvalidKeyInput(format!(
                "CryptoKey does not support this operation, its algorithm.name must be ECDH, X25519 or X448, got {}",
                self.algorithm.name
            )));
        }
        if !usages.is_empty() && !usages.iter().any(|usage| self.usages.contains(usage)) {
            let expected: Vec<&str> = usages.iter().map(KeyUsage::as_str).collect();
            return Err(Error::InvalidKeyInput(format!(
                "CryptoKey does not support this operation, its usages must include one of {}",
                expected.join(", ")
            )));
        }
        Ok(())
    }
}

/// Borrowed key in either accepted representation
#[derive(Debug, Clone, Copy)]
pub enum KeyHandle<'a> {
    /// Provider-native key object
    Object(&'a KeyObject),
    /// Capability-restricted key
    Crypto(&'a CryptoKey),
}

impl<'a> From<&'a KeyObject> for KeyHandle<'a> {
    fn from(key: &'a KeyObject) -> Self {
        KeyHandle::Object(key)
    }
}

impl<'a> From<&'a CryptoKey> for KeyHandle<'a> {
    fn from(key: &'a CryptoKey) -> Self {
        KeyHandle::Crypto(key)
    }
}

impl<'a> KeyHandle<'a> {
    /// Normalizes to the key object without any usage checks
    pub fn key_object(self) -> &'a KeyObject {
        match self {
            KeyHandle::Object(key) => key,
            KeyHandle::Crypto(key) => key.key_object(),
        }
    }

    /// Returns the key type of the underlying key
    pub fn key_type(self) -> KeyObjectType {
        self.key_object().key_type()
    }

    /// Normalizes a key passed as the public side of an agreement.
    ///
    /// A `CryptoKey` must be an ECDH, X25519 or X448 key. The key must not be
    /// a symmetric secret.
    pub fn for_public_agreement(self) -> Result<&'a KeyObject> {
        if let KeyHandle::Crypto(key) = self {
            key.check_agreement(&[])?;
        }
        if self.key_type() == KeyObjectType::Secret {
            return Err(Error::InvalidKeyInput(
                "public key must not be a secret key".to_string(),
            ));
        }
        Ok(self.key_object())
    }

    /// Normalizes a key passed as the private side of an agreement.
    ///
    /// A `CryptoKey` must be an ECDH, X25519 or X448 key with the
    /// `deriveBits` or `deriveKey` usage. The key must carry private key
    /// material.
    pub fn for_private_agreement(self) -> Result<&'a KeyObject> {
        if let KeyHandle::Crypto(key) = self {
            key.check_agreement(&[KeyUsage::DeriveBits, KeyUsage::DeriveKey])?;
        }
        let key_type = self.key_type();
        if key_type != KeyObjectType::Private {
            return Err(Error::InvalidKeyInput(format!(
                "private key must carry private key material, got a {} key",
                key_type.as_str()
            )));
        }
        Ok(self.key_object())
    }
}
