//! Primitive provider for elliptic-curve operations
//!
//! The agreement code never performs curve arithmetic itself. It asks a
//! [`KeyAgreementProvider`] for the raw shared secret and for fresh key
//! pairs. [`NativeProvider`] implements the trait with the RustCrypto and
//! dalek curve crates; tests can substitute a provider returning fixed
//! secrets.

use crate::curve::{CurveFamily, NamedCurve};
use crate::error::{Error, Result};
use crate::key::{KeyMaterial, KeyObject, X448_KEY_LEN};
use async_trait::async_trait;
use rand::{rngs::OsRng, RngCore};
use std::fmt::{self, Debug};
use zeroize::Zeroizing;

/// Raw Diffie-Hellman output (the "Z" value), wiped on drop
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    /// Takes ownership of raw shared secret bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Returns the secret bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the secret length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED; {}])", self.0.len())
    }
}

/// Single-use key pair generated for one message
#[derive(Debug, Clone)]
pub struct EphemeralKeyPair {
    /// Public half, embedded in the message header as the EPK
    pub public_key: KeyObject,
    /// Private half, used once for agreement and then dropped
    pub private_key: KeyObject,
}

impl EphemeralKeyPair {
    /// Returns the named curve of the pair
    pub fn curve(&self) -> Option<NamedCurve> {
        self.public_key.named_curve()
    }
}

/// Provider of elliptic-curve Diffie-Hellman and key generation.
///
/// Implementations are assumed correct and constant-time for the curves
/// they support.
#[async_trait]
pub trait KeyAgreementProvider: Send + Sync + Debug {
    /// Computes the raw shared secret of `private_key` and `public_key`.
    ///
    /// `public_key` may also be a private key, in which case its public half
    /// is used.
    fn diffie_hellman(&self, private_key: &KeyObject, public_key: &KeyObject)
        -> Result<SharedSecret>;

    /// Generates a fresh key pair in the given curve family
    async fn generate_key_pair(&self, family: CurveFamily) -> Result<EphemeralKeyPair>;
}

/// Provider backed by the `p256`, `p384`, `p521`, `k256`, `x25519-dalek`
/// and `x448` crates
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeProvider;

impl NativeProvider {
    /// Creates a new NativeProvider
    pub fn new() -> Self {
        Self
    }
}

fn curve_name(key: &KeyObject) -> &'static str {
    key.named_curve().map(|c| c.as_str()).unwrap_or("none")
}

#[async_trait]
impl KeyAgreementProvider for NativeProvider {
    fn diffie_hellman(
        &self,
        private_key: &KeyObject,
        public_key: &KeyObject,
    ) -> Result<SharedSecret> {
        let public = public_key
            .to_public()
            .map_err(|e| Error::KeyAgreementFailed(e.to_string()))?;

        let secret = match (private_key.material(), public.material()) {
            (KeyMaterial::P256Private(sk), KeyMaterial::P256Public(pk)) => {
                p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            (KeyMaterial::P384Private(sk), KeyMaterial::P384Public(pk)) => {
                p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            (KeyMaterial::P521Private(sk), KeyMaterial::P521Public(pk)) => {
                p521::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            (KeyMaterial::Secp256k1Private(sk), KeyMaterial::Secp256k1Public(pk)) => {
                k256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            (KeyMaterial::X25519Private(sk), KeyMaterial::X25519Public(pk)) => {
                let shared = sk.diffie_hellman(pk);
                if !shared.was_contributory() {
                    return Err(Error::KeyAgreementFailed(
                        "X25519 public key is a low order point".to_string(),
                    ));
                }
                shared.as_bytes().to_vec()
            }
            (KeyMaterial::X448Private(sk), KeyMaterial::X448Public(pk)) => {
                let secret = x448::Secret::from_bytes(&sk[..]).ok_or_else(|| {
                    Error::KeyAgreementFailed("Invalid X448 private key".to_string())
                })?;
                let peer = x448::PublicKey::from_bytes(&pk[..]).ok_or_else(|| {
                    Error::KeyAgreementFailed("X448 public key is a low order point".to_string())
                })?;
                let shared = secret.as_diffie_hellman(&peer).ok_or_else(|| {
                    Error::KeyAgreementFailed("X448 shared secret is a low order point".to_string())
                })?;
                shared.as_bytes().to_vec()
            }
            (KeyMaterial::Ed25519Private(_), _) | (_, KeyMaterial::Ed25519Public(_)) => {
                return Err(Error::KeyAgreementFailed(
                    "Ed25519 keys cannot be used for key agreement".to_string(),
                ))
            }
            _ => {
                return Err(Error::KeyAgreementFailed(format!(
                    "Incompatible keys: private key on {}, public key on {}",
                    curve_name(private_key),
                    curve_name(&public)
                )))
            }
        };

        Ok(SharedSecret::new(secret))
    }

    async fn generate_key_pair(&self, family: CurveFamily) -> Result<EphemeralKeyPair> {
        let private_key = match family {
            CurveFamily::X25519 => {
                KeyObject::from(x25519_dalek::StaticSecret::random_from_rng(OsRng))
            }
            CurveFamily::X448 => {
                let mut bytes = Zeroizing::new([0u8; X448_KEY_LEN]);
                OsRng
                    .try_fill_bytes(&mut bytes[..])
                    .map_err(|e| Error::KeyGeneration(e.to_string()))?;
                KeyObject::from_material(KeyMaterial::X448Private(bytes))
            }
            CurveFamily::EllipticCurve(NamedCurve::P256) => {
                KeyObject::from(p256::SecretKey::random(&mut OsRng))
            }
            CurveFamily::EllipticCurve(NamedCurve::P384) => {
                KeyObject::from(p384::SecretKey::random(&mut OsRng))
            }
            CurveFamily::EllipticCurve(NamedCurve::P521) => {
                KeyObject::from(p521::SecretKey::random(&mut OsRng))
            }
            CurveFamily::EllipticCurve(NamedCurve::Secp256k1) => {
                KeyObject::from(k256::SecretKey::random(&mut OsRng))
            }
            CurveFamily::EllipticCurve(other) => {
                return Err(Error::UnsupportedKeyType(format!(
                    "{} is not an elliptic curve",
                    other
                )))
            }
        };

        let public_key = private_key
            .to_public()
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;

        Ok(EphemeralKeyPair {
            public_key,
            private_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_agreement_is_symmetric_on_all_curves() {
        let provider = NativeProvider::new();
        let families = [
            CurveFamily::EllipticCurve(NamedCurve::P256),
            CurveFamily::EllipticCurve(NamedCurve::P384),
            CurveFamily::EllipticCurve(NamedCurve::P521),
            CurveFamily::EllipticCurve(NamedCurve::Secp256k1),
            CurveFamily::X25519,
            CurveFamily::X448,
        ];

        for family in families {
            let alice = provider.generate_key_pair(family).await.unwrap();
            let bob = provider.generate_key_pair(family).await.unwrap();
            assert_eq!(alice.curve(), Some(family.curve()));

            let z1 = provider
                .diffie_hellman(&alice.private_key, &bob.public_key)
                .unwrap();
            let z2 = provider
                .diffie_hellman(&bob.private_key, &alice.public_key)
                .unwrap();
            assert_eq!(z1.as_bytes(), z2.as_bytes(), "{:?}", family);
            assert!(!z1.is_empty());
        }
    }

    #[tokio::test]
    async fn test_shared_secret_lengths() {
        let provider = NativeProvider::new();
        for (family, expected) in [
            (CurveFamily::EllipticCurve(NamedCurve::P256), 32),
            (CurveFamily::EllipticCurve(NamedCurve::P384), 48),
            (CurveFamily::EllipticCurve(NamedCurve::P521), 66),
            (CurveFamily::X25519, 32),
            (CurveFamily::X448, 56),
        ] {
            let pair = provider.generate_key_pair(family).await.unwrap();
            let z = provider
                .diffie_hellman(&pair.private_key, &pair.public_key)
                .unwrap();
            assert_eq!(z.len(), expected, "{:?}", family);
        }
    }

    #[tokio::test]
    async fn test_mismatched_curves_fail() {
        let provider = NativeProvider::new();
        let p256 = provider
            .generate_key_pair(CurveFamily::EllipticCurve(NamedCurve::P256))
            .await
            .unwrap();
        let x25519 = provider.generate_key_pair(CurveFamily::X25519).await.unwrap();

        let result = provider.diffie_hellman(&p256.private_key, &x25519.public_key);
        assert!(matches!(result, Err(Error::KeyAgreementFailed(msg)) if msg.contains("X25519")));
    }

    #[tokio::test]
    async fn test_generate_rejects_non_weierstrass_named_curve() {
        let provider = NativeProvider::new();
        let result = provider
            .generate_key_pair(CurveFamily::EllipticCurve(NamedCurve::Ed25519))
            .await;
        assert!(matches!(result, Err(Error::UnsupportedKeyType(_))));
    }

    #[test]
    fn test_low_order_x25519_point_is_rejected() {
        let provider = NativeProvider::new();
        let private = KeyObject::from_private_bytes(NamedCurve::X25519, &[0x77u8; 32]).unwrap();
        let zero_point = KeyObject::from_public_bytes(NamedCurve::X25519, &[0u8; 32]).unwrap();
        assert!(matches!(
            provider.diffie_hellman(&private, &zero_point),
            Err(Error::KeyAgreementFailed(_))
        ));
    }

    #[test]
    fn test_shared_secret_debug_is_redacted() {
        let secret = SharedSecret::new(vec![0x42; 32]);
        assert_eq!(format!("{:?}", secret), "SharedSecret([REDACTED; 32])");
    }
}
