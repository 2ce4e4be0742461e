//! ECDH-ES key agreement
//!
//! Combines key validation, the provider's Diffie-Hellman and the Concat KDF
//! into the key derivation used by JWE (RFC 7518 Section 4.6). The
//! agreement itself is curve-oblivious: curve handling lives in the
//! provider, the OtherInfo encoding and KDF are the same for every curve.

use crate::algorithm::agreement_params;
use crate::config::{self, EcdhEsConfig};
use crate::curve::{self, CurveFamily};
use crate::error::{Error, Result};
use crate::kdf::{concat_kdf, other_info};
use crate::key::KeyHandle;
use crate::provider::{EphemeralKeyPair, KeyAgreementProvider, NativeProvider};
use tracing::debug;

/// ECDH-ES key agreement with an injected primitive provider
#[derive(Debug, Clone, Default)]
pub struct EcdhEs<P = NativeProvider> {
    provider: P,
    config: EcdhEsConfig,
}

impl EcdhEs<NativeProvider> {
    /// Creates an instance using the native provider and default configuration
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: KeyAgreementProvider> EcdhEs<P> {
    /// Creates an instance with a custom provider and default configuration
    pub fn with_provider(provider: P) -> Self {
        Self {
            provider,
            config: EcdhEsConfig::default(),
        }
    }

    /// Replaces the configuration after validating it
    pub fn with_config(mut self, config: EcdhEsConfig) -> Result<Self> {
        config::validate(&config)?;
        self.config = config;
        Ok(self)
    }

    /// Returns the configuration
    pub fn config(&self) -> &EcdhEsConfig {
        &self.config
    }

    /// Returns the primitive provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Derives a key from a public and a private key.
    ///
    /// # Arguments
    /// * `public_key` - The peer's key (static key when decrypting is done by
    ///   the recipient, ephemeral key otherwise); must not be a secret key
    /// * `private_key` - Our private key; a `CryptoKey` must permit
    ///   `deriveBits` or `deriveKey`
    /// * `algorithm_id` - The "enc" value for direct agreement, otherwise "alg"
    /// * `key_length_bits` - Length of the derived key; must be a configured length
    /// * `apu` / `apv` - PartyUInfo / PartyVInfo, empty when absent
    ///
    /// # Errors
    /// * `InvalidKeyLength` if the length is not configured
    /// * `InvalidKeyInput` if either key fails validation
    /// * `KeyAgreementFailed` if the provider cannot compute the shared secret
    pub fn derive_key<'a, 'b>(
        &self,
        public_key: impl Into<KeyHandle<'a>>,
        private_key: impl Into<KeyHandle<'b>>,
        algorithm_id: &str,
        key_length_bits: u32,
        apu: &[u8],
        apv: &[u8],
    ) -> Result<Vec<u8>> {
        if !self.config.allows_key_length(key_length_bits) {
            return Err(Error::InvalidKeyLength(key_length_bits));
        }
        agree(
            &self.provider,
            public_key.into(),
            private_key.into(),
            algorithm_id,
            key_length_bits,
            apu,
            apv,
        )
    }

    /// Derives a key for a JWE "alg"/"enc" pair.
    ///
    /// The AlgorithmID and key length are resolved from the identifiers: the
    /// "enc" value and CEK length for direct agreement, the "alg" value and
    /// key wrapping key length otherwise.
    pub fn derive_key_for<'a, 'b>(
        &self,
        public_key: impl Into<KeyHandle<'a>>,
        private_key: impl Into<KeyHandle<'b>>,
        alg: &str,
        enc: &str,
        apu: &[u8],
        apv: &[u8],
    ) -> Result<Vec<u8>> {
        let params = agreement_params(alg, enc)?;
        self.derive_key(
            public_key,
            private_key,
            params.algorithm_id,
            params.key_length_bits,
            apu,
            apv,
        )
    }

    /// Generates an ephemeral key pair on the curve of the peer's static key
    pub async fn generate_epk<'a>(
        &self,
        peer_static_key: impl Into<KeyHandle<'a>>,
    ) -> Result<EphemeralKeyPair> {
        generate_with(&self.provider, peer_static_key.into()).await
    }

    /// Checks the key's curve against the configured allow-list
    pub fn ecdh_allowed<'a>(&self, key: impl Into<KeyHandle<'a>>) -> Result<bool> {
        let curve = curve::resolve_curve(key)?;
        Ok(curve.is_agreement_allowed() && self.config.allows_curve(curve))
    }
}

fn agree<P: KeyAgreementProvider + ?Sized>(
    provider: &P,
    public_key: KeyHandle<'_>,
    private_key: KeyHandle<'_>,
    algorithm_id: &str,
    key_length_bits: u32,
    apu: &[u8],
    apv: &[u8],
) -> Result<Vec<u8>> {
    let public_key = public_key.for_public_agreement()?;
    let private_key = private_key.for_private_agreement()?;

    debug!(
        algorithm_id,
        key_length_bits,
        curve = ?private_key.named_curve(),
        "deriving ECDH-ES key"
    );

    let info = other_info(algorithm_id, apu, apv, key_length_bits);
    let shared_secret = provider
        .diffie_hellman(private_key, public_key)
        .map_err(|e| match e {
            Error::KeyAgreementFailed(_) => e,
            other => Error::KeyAgreementFailed(other.to_string()),
        })?;

    Ok(concat_kdf(shared_secret.as_bytes(), key_length_bits, &info))
}

async fn generate_with<P: KeyAgreementProvider + ?Sized>(
    provider: &P,
    peer_static_key: KeyHandle<'_>,
) -> Result<EphemeralKeyPair> {
    let family = CurveFamily::of(peer_static_key)?;
    debug!(curve = %family.curve(), "generating ephemeral key pair");
    provider.generate_key_pair(family).await
}

/// Derives a key with the native provider and default configuration.
///
/// Only the key lengths of the registered JWE algorithms (128, 192, 256, 384
/// and 512 bits) are accepted; see [`EcdhEs::derive_key`].
pub fn derive_key<'a, 'b>(
    public_key: impl Into<KeyHandle<'a>>,
    private_key: impl Into<KeyHandle<'b>>,
    algorithm_id: &str,
    key_length_bits: u32,
    apu: &[u8],
    apv: &[u8],
) -> Result<Vec<u8>> {
    EcdhEs::new().derive_key(
        public_key,
        private_key,
        algorithm_id,
        key_length_bits,
        apu,
        apv,
    )
}

/// Generates an ephemeral key pair matching the peer's static key with the
/// native provider
pub async fn generate_epk<'a>(
    peer_static_key: impl Into<KeyHandle<'a>>,
) -> Result<EphemeralKeyPair> {
    generate_with(&NativeProvider, peer_static_key.into()).await
}
