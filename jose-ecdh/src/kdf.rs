//! ECDH-ES Key Derivation Function (Concat KDF)
//!
//! Implements the Concat KDF per NIST SP 800-56A and RFC 7518 Section 4.6.
//! This is used to derive either the content encryption key (direct
//! ECDH-ES) or the key encryption key (ECDH-ES+AxxxKW) from the raw ECDH
//! shared secret.

use sha2::{Digest, Sha256};

/// SHA-256 output size in bytes
const HASH_LEN: usize = 32;

/// Encode a value as a 4-byte big-endian integer
pub fn uint32_be(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Prefix `input` with its length as a 4-byte big-endian integer
pub fn length_and_input(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + input.len());
    out.extend_from_slice(&uint32_be(input.len() as u32));
    out.extend_from_slice(input);
    out
}

/// Build the OtherInfo structure per RFC 7518 Section 4.6.2
///
/// # Arguments
/// * `algorithm_id` - The "enc" value for direct agreement, otherwise the "alg" value
/// * `apu` - Agreement PartyUInfo (empty when the header has no "apu")
/// * `apv` - Agreement PartyVInfo (empty when the header has no "apv")
/// * `key_length_bits` - Length of the derived key in bits
///
/// # Layout
/// - AlgorithmID: length (4 bytes) || algorithm_id
/// - PartyUInfo: length (4 bytes) || apu
/// - PartyVInfo: length (4 bytes) || apv
/// - SuppPubInfo: keydatalen in bits (4 bytes, big-endian)
pub fn other_info(algorithm_id: &str, apu: &[u8], apv: &[u8], key_length_bits: u32) -> Vec<u8> {
    let algorithm_id = algorithm_id.as_bytes();
    let mut other_info = Vec::with_capacity(16 + algorithm_id.len() + apu.len() + apv.len());

    other_info.extend_from_slice(&length_and_input(algorithm_id));
    other_info.extend_from_slice(&length_and_input(apu));
    other_info.extend_from_slice(&length_and_input(apv));
    other_info.extend_from_slice(&uint32_be(key_length_bits));

    other_info
}

/// Derive a key using Concat KDF (NIST SP 800-56A)
///
/// This implements the single-step key derivation function specified in
/// NIST SP 800-56A Section 5.8.1 using SHA-256 as the hash function.
///
/// # Arguments
/// * `shared_secret` - The raw ECDH shared secret (Z value)
/// * `key_length_bits` - Desired output length in bits
/// * `other_info` - The encoded OtherInfo, see [`other_info`]
///
/// # Returns
/// The derived key material of `ceil(key_length_bits / 8)` bytes. The length
/// is not validated here; callers pass a real cipher key size.
///
/// DerivedKey = Hash(counter || Z || OtherInfo) for each round
pub fn concat_kdf(shared_secret: &[u8], key_length_bits: u32, other_info: &[u8]) -> Vec<u8> {
    let output_len = key_length_bits.div_ceil(8) as usize;
    let reps = output_len.div_ceil(HASH_LEN);

    tracing::trace!(key_length_bits, reps, "running concat kdf");

    let mut derived = Vec::with_capacity(reps * HASH_LEN);

    for counter in 1..=reps {
        let mut hasher = Sha256::new();
        // counter as 4-byte big-endian
        hasher.update(uint32_be(counter as u32));
        // Z (shared secret)
        hasher.update(shared_secret);
        // OtherInfo
        hasher.update(other_info);

        derived.extend_from_slice(&hasher.finalize());
    }

    // Truncate to exact requested length
    derived.truncate(output_len);
    derived
}
