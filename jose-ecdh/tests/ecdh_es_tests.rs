//! Tests for ECDH-ES key agreement and ephemeral key generation

use assert_matches::assert_matches;
use async_trait::async_trait;
use jose_ecdh::curve::CurveFamily;
use jose_ecdh::kdf::{concat_kdf, other_info};
use jose_ecdh::key::AsymmetricKeyType;
use jose_ecdh::{
    derive_key, ecdh_allowed, generate_epk, is_agreement_allowed, resolve_curve, CryptoKey,
    EcdhEs, EphemeralKeyPair, Error, KeyAgreementProvider, KeyAlgorithm, KeyObject, KeyUsage,
    NamedCurve, NativeProvider, Result, SharedSecret,
};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Provider returning a fixed shared secret, for testing the KDF stage
/// without curve arithmetic
#[derive(Debug)]
struct FixedSecretProvider {
    secret: Vec<u8>,
}

#[async_trait]
impl KeyAgreementProvider for FixedSecretProvider {
    fn diffie_hellman(
        &self,
        _private_key: &KeyObject,
        _public_key: &KeyObject,
    ) -> Result<SharedSecret> {
        Ok(SharedSecret::new(self.secret.clone()))
    }

    async fn generate_key_pair(&self, family: CurveFamily) -> Result<EphemeralKeyPair> {
        NativeProvider.generate_key_pair(family).await
    }
}

/// Provider whose operations always fail
#[derive(Debug)]
struct FailingProvider;

#[async_trait]
impl KeyAgreementProvider for FailingProvider {
    fn diffie_hellman(
        &self,
        _private_key: &KeyObject,
        _public_key: &KeyObject,
    ) -> Result<SharedSecret> {
        Err(Error::InvalidKeyInput("hardware key unavailable".to_string()))
    }

    async fn generate_key_pair(&self, _family: CurveFamily) -> Result<EphemeralKeyPair> {
        Err(Error::KeyGeneration("entropy source unavailable".to_string()))
    }
}

fn static_key(curve: NamedCurve) -> KeyObject {
    let bytes: Vec<u8> = match curve {
        NamedCurve::P256 => vec![0x21; 32],
        NamedCurve::P384 => vec![0x22; 48],
        NamedCurve::P521 => {
            let mut bytes = vec![0x23; 66];
            bytes[0] = 0x00;
            bytes
        }
        NamedCurve::X25519 => vec![0x24; 32],
        NamedCurve::X448 => vec![0x25; 56],
        other => panic!("no test key for {}", other),
    };
    KeyObject::from_private_bytes(curve, &bytes).unwrap()
}

#[test]
fn test_derive_key_with_fake_provider_matches_kdf() {
    let secret = vec![0x5au8; 32];
    let ecdh = EcdhEs::with_provider(FixedSecretProvider {
        secret: secret.clone(),
    });
    let private = static_key(NamedCurve::P256);
    let public = private.to_public().unwrap();

    let derived = ecdh
        .derive_key(&public, &private, "A128GCM", 128, b"Alice", b"Bob")
        .unwrap();
    let expected = concat_kdf(&secret, 128, &other_info("A128GCM", b"Alice", b"Bob", 128));
    assert_eq!(derived, expected);

    // Same inputs, same output
    let again = ecdh
        .derive_key(&public, &private, "A128GCM", 128, b"Alice", b"Bob")
        .unwrap();
    assert_eq!(derived, again);
}

#[test]
fn test_derive_key_lengths() {
    let private = static_key(NamedCurve::P384);
    let public = private.to_public().unwrap();
    for bits in [128u32, 192, 256, 384, 512] {
        let key = derive_key(&public, &private, "ECDH-ES", bits, &[], &[]).unwrap();
        assert_eq!(key.len(), (bits / 8) as usize);
    }
}

#[tokio::test]
async fn test_agreement_symmetry_on_allowed_curves() {
    for curve in [
        NamedCurve::P256,
        NamedCurve::P384,
        NamedCurve::P521,
        NamedCurve::X25519,
        NamedCurve::X448,
    ] {
        let bob = static_key(curve);
        let alice = generate_epk(&bob).await.unwrap();
        let bob_public = bob.to_public().unwrap();

        let sender = derive_key(
            &bob_public,
            &alice.private_key,
            "ECDH-ES+A256KW",
            256,
            b"Alice",
            b"Bob",
        )
        .unwrap();
        let recipient = derive_key(
            &alice.public_key,
            &bob,
            "ECDH-ES+A256KW",
            256,
            b"Alice",
            b"Bob",
        )
        .unwrap();
        assert_eq!(sender, recipient, "agreement on {} must be symmetric", curve);
    }
}

#[tokio::test]
async fn test_ephemeral_key_matches_peer_curve() {
    let p384 = static_key(NamedCurve::P384).to_public().unwrap();
    let epk = generate_epk(&p384).await.unwrap();
    assert_eq!(epk.curve(), Some(NamedCurve::P384));
    assert_eq!(resolve_curve(&epk.public_key).unwrap(), NamedCurve::P384);
    assert_eq!(
        epk.private_key.asymmetric_key_type(),
        Some(AsymmetricKeyType::Ec)
    );

    let x448 = static_key(NamedCurve::X448).to_public().unwrap();
    let epk = generate_epk(&x448).await.unwrap();
    assert_eq!(epk.curve(), Some(NamedCurve::X448));
    assert_eq!(
        epk.public_key.asymmetric_key_type(),
        Some(AsymmetricKeyType::X448)
    );
}

#[tokio::test]
async fn test_ephemeral_keys_are_fresh() {
    let peer = static_key(NamedCurve::X25519);
    let first = generate_epk(&peer).await.unwrap();
    let second = generate_epk(&peer).await.unwrap();
    assert_ne!(
        first.public_key.public_key_bytes().unwrap(),
        second.public_key.public_key_bytes().unwrap()
    );
}

#[test]
fn test_ephemeral_generation_from_crypto_key() {
    let peer = CryptoKey::for_agreement(static_key(NamedCurve::P521), [KeyUsage::DeriveBits])
        .unwrap();
    let epk = tokio_test::block_on(generate_epk(&peer)).unwrap();
    assert_eq!(epk.curve(), Some(NamedCurve::P521));
}

#[tokio::test]
async fn test_ephemeral_generation_rejects_unsupported_keys() {
    let secret = KeyObject::secret(vec![0u8; 16]);
    assert_matches!(
        generate_epk(&secret).await,
        Err(Error::UnsupportedKeyType(msg)) if msg == "Invalid or unsupported EPK"
    );

    let signing = KeyObject::from_private_bytes(NamedCurve::Ed25519, &[1u8; 32]).unwrap();
    assert_matches!(
        generate_epk(&signing).await,
        Err(Error::UnsupportedKeyType(_))
    );
}

#[tokio::test]
async fn test_provider_generation_failure_propagates() {
    let ecdh = EcdhEs::with_provider(FailingProvider);
    let peer = static_key(NamedCurve::P256);
    assert_matches!(
        ecdh.generate_epk(&peer).await,
        Err(Error::KeyGeneration(msg)) if msg == "entropy source unavailable"
    );
}

#[test]
fn test_provider_agreement_failure_is_key_agreement_failed() {
    let ecdh = EcdhEs::with_provider(FailingProvider);
    let private = static_key(NamedCurve::P256);
    let public = private.to_public().unwrap();
    assert_matches!(
        ecdh.derive_key(&public, &private, "A256GCM", 256, &[], &[]),
        Err(Error::KeyAgreementFailed(msg)) if msg.contains("hardware key unavailable")
    );
}

#[test]
fn test_mismatched_curves_fail_agreement() {
    let private = static_key(NamedCurve::P256);
    let other = static_key(NamedCurve::P384).to_public().unwrap();
    assert_matches!(
        derive_key(&other, &private, "A128GCM", 128, &[], &[]),
        Err(Error::KeyAgreementFailed(_))
    );
}

#[test]
fn test_public_key_as_private_argument_is_rejected() {
    let public = static_key(NamedCurve::X25519).to_public().unwrap();
    assert_matches!(
        derive_key(&public, &public, "A128GCM", 128, &[], &[]),
        Err(Error::InvalidKeyInput(_))
    );
}

#[test]
fn test_secret_key_as_public_argument_is_rejected() {
    let private = static_key(NamedCurve::P256);
    let secret = KeyObject::secret(vec![0u8; 32]);
    assert_matches!(
        derive_key(&secret, &private, "A128GCM", 128, &[], &[]),
        Err(Error::InvalidKeyInput(_))
    );
}

#[test]
fn test_crypto_key_usages_are_enforced() {
    let recipient = static_key(NamedCurve::P256);
    let sender = static_key(NamedCurve::X25519);
    let recipient_public = recipient.to_public().unwrap();

    // Private CryptoKey without derive usages
    let no_derive = CryptoKey::for_agreement(recipient.clone(), [KeyUsage::Decrypt]).unwrap();
    assert_matches!(
        derive_key(&recipient_public, &no_derive, "A128GCM", 128, &[], &[]),
        Err(Error::InvalidKeyInput(msg)) if msg.contains("deriveKey")
    );

    // Public CryptoKey needs no usages
    let public_crypto = CryptoKey::for_agreement(recipient_public.clone(), []).unwrap();
    let derive = CryptoKey::for_agreement(recipient.clone(), [KeyUsage::DeriveBits]).unwrap();
    let from_crypto =
        derive_key(&public_crypto, &derive, "A128GCM", 128, &[], &[]).unwrap();
    let from_objects =
        derive_key(&recipient_public, &recipient, "A128GCM", 128, &[], &[]).unwrap();
    assert_eq!(from_crypto, from_objects);

    // Curve mismatch between CryptoKeys still surfaces from the provider
    let sender_crypto = CryptoKey::for_agreement(sender, [KeyUsage::DeriveKey]).unwrap();
    assert_matches!(
        derive_key(&public_crypto, &sender_crypto, "A128GCM", 128, &[], &[]),
        Err(Error::KeyAgreementFailed(_))
    );
}

#[test]
fn test_derive_key_for_jwe_algorithms() {
    let ecdh = EcdhEs::new();
    let recipient = static_key(NamedCurve::X448);
    let sender = static_key(NamedCurve::X448);
    let recipient_public = recipient.to_public().unwrap();

    let direct = ecdh
        .derive_key_for(&recipient_public, &sender, "ECDH-ES", "A256CBC-HS512", &[], &[])
        .unwrap();
    assert_eq!(direct.len(), 64);
    let explicit = ecdh
        .derive_key(&recipient_public, &sender, "A256CBC-HS512", 512, &[], &[])
        .unwrap();
    assert_eq!(direct, explicit);

    let wrapped = ecdh
        .derive_key_for(&recipient_public, &sender, "ECDH-ES+A128KW", "A256GCM", &[], &[])
        .unwrap();
    assert_eq!(wrapped.len(), 16);

    assert_matches!(
        ecdh.derive_key_for(&recipient_public, &sender, "dir", "A256GCM", &[], &[]),
        Err(Error::UnsupportedAlgorithm(_))
    );
}

#[test]
fn test_curve_allow_list() {
    for name in ["P-256", "P-384", "P-521", "X25519", "X448"] {
        assert!(is_agreement_allowed(name));
    }
    assert!(!is_agreement_allowed("P-256K"));
    assert!(!is_agreement_allowed("secp256k1"));
}

#[test]
fn test_secp256k1_key_cannot_be_labelled_as_allowed_curve() {
    let k1 = KeyObject::from_private_bytes(NamedCurve::Secp256k1, &[0x26u8; 32]).unwrap();
    assert!(!ecdh_allowed(&k1).unwrap());
    assert!(!EcdhEs::new().ecdh_allowed(&k1).unwrap());

    assert_matches!(
        CryptoKey::new(
            k1.clone(),
            KeyAlgorithm::ecdh(NamedCurve::P256),
            [KeyUsage::DeriveBits],
        ),
        Err(Error::InvalidKeyInput(_))
    );

    // Honest metadata keeps the key outside the allow-list
    let labelled = CryptoKey::for_agreement(k1, [KeyUsage::DeriveBits]).unwrap();
    assert_eq!(resolve_curve(&labelled).unwrap(), NamedCurve::Secp256k1);
    assert!(!ecdh_allowed(&labelled).unwrap());
}

#[tokio::test]
async fn test_crypto_key_curve_matches_ephemeral_curve() {
    let peer = CryptoKey::new(
        static_key(NamedCurve::X448).to_public().unwrap(),
        KeyAlgorithm::new("X448"),
        [],
    )
    .unwrap();
    let epk = generate_epk(&peer).await.unwrap();
    assert_eq!(epk.curve(), Some(resolve_curve(&peer).unwrap()));
    assert_eq!(
        resolve_curve(&peer).unwrap(),
        resolve_curve(peer.key_object()).unwrap()
    );
}

#[test]
fn test_oversized_key_length_is_rejected() {
    let private = static_key(NamedCurve::X25519);
    let public = private.to_public().unwrap();
    assert_matches!(
        derive_key(&public, &private, "A128GCM", 1 << 27, &[], &[]),
        Err(Error::InvalidKeyLength(bits)) if bits == 1 << 27
    );
}

#[test]
fn test_resolve_curve_rejects_symmetric_key() {
    let secret = KeyObject::secret(vec![0u8; 32]);
    assert_matches!(resolve_curve(&secret), Err(Error::UnsupportedKeyType(_)));
}

#[test]
fn test_derive_key_across_threads() {
    let private = static_key(NamedCurve::P256);
    let public = private.to_public().unwrap();
    let expected = derive_key(&public, &private, "A256GCM", 256, &[], &[]).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| derive_key(&public, &private, "A256GCM", 256, &[], &[]).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

/// Log sink collecting formatted events in memory
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_agreement_logs_omit_secrets() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();

    let ecdh = EcdhEs::with_provider(FixedSecretProvider {
        secret: vec![0x5a; 32],
    });
    let private = static_key(NamedCurve::P256);
    let public = private.to_public().unwrap();

    let derived = tracing::subscriber::with_default(subscriber, || {
        ecdh.derive_key(&public, &private, "A128GCM", 128, b"Alice", b"Bob")
            .unwrap()
    });

    let output = logs.contents();
    assert!(output.contains("deriving ECDH-ES key"));
    assert!(output.contains("A128GCM"));
    assert!(output.contains("running concat kdf"));
    assert!(!output.contains("90, 90, 90"));
    assert!(!output.contains(&hex::encode(&derived)));
}
