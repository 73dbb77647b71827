//! HMAC-SHA256 signed token codec.
//!
//! Turns structured payloads into tamper-proof, self-describing, expiring
//! tokens and back. Every credential the service mints (faucet tokens,
//! authorization codes, access tokens) is an envelope produced here.
//!
//! Wire format: URL-safe unpadded base64 of the envelope JSON
//! `{payload, issued_at, expires_at, nonce, signature}`. The signature is
//! an HMAC-SHA256 over the canonical bytes of all other fields and is
//! always the last-computed field. Canonical byte ordering falls out of
//! serde_json's default BTreeMap-backed maps: object keys serialize sorted.
//!
//! The codec holds a current signing key and optionally the immediately
//! previous one. Verification accepts either key; signing only ever uses
//! the current key. Rotation is a deploy-time event: set
//! `SIGNING_SECRET_PREVIOUS` to the old secret, deploy with the new
//! `SIGNING_SECRET`, and unset the previous secret once all in-flight
//! tokens have expired.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::hashing::hex_encode;
use crate::types::Timestamp;

type HmacSha256 = Hmac<Sha256>;

/// Nonce length in bytes (128 bits).
pub const NONCE_BYTES: usize = 16;

/// Errors produced when decoding a signed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The signature does not verify under any accepted key.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// The token is past its `expires_at` timestamp.
    #[error("token has expired")]
    Expired,

    /// The token cannot be parsed into a well-formed envelope.
    #[error("token is malformed")]
    Malformed,
}

/// Versioned signing secrets.
///
/// `previous` is only populated during a rotation grace window.
#[derive(Debug, Clone)]
pub struct SigningKeys {
    pub current: String,
    pub previous: Option<String>,
}

/// A successfully verified token, returned by [`TokenCodec::decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub payload: serde_json::Value,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// On-the-wire envelope. Field order here is irrelevant; the canonical
/// signing bytes are produced separately with sorted keys.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    payload: serde_json::Value,
    issued_at: i64,
    expires_at: i64,
    nonce: String,
    signature: String,
}

/// Signs and verifies token envelopes. Pure: no I/O, no storage.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    keys: SigningKeys,
}

impl TokenCodec {
    pub fn new(keys: SigningKeys) -> Self {
        Self { keys }
    }

    /// Encode a payload into a signed, expiring token string.
    ///
    /// `expires_at = now + ttl`. The nonce is a random 128-bit value so two
    /// tokens with identical payloads and timestamps never collide.
    pub fn encode(&self, payload: &serde_json::Value, ttl: Duration) -> String {
        let issued_at = Utc::now().timestamp();
        let expires_at = issued_at + ttl.num_seconds();

        let nonce_bytes: [u8; NONCE_BYTES] = rand::rng().random();
        let nonce = hex_encode(nonce_bytes);

        let signature = self.sign(&self.keys.current, payload, issued_at, expires_at, &nonce);

        let envelope = Envelope {
            payload: payload.clone(),
            issued_at,
            expires_at,
            nonce,
            signature,
        };

        let json = serde_json::to_vec(&envelope).expect("envelope serialization cannot fail");
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode and verify a token string.
    ///
    /// Fails with [`CodecError::Malformed`] if the structure cannot be
    /// parsed, [`CodecError::InvalidSignature`] if the HMAC does not verify
    /// under the current or previous key, and [`CodecError::Expired`] if
    /// `now >= expires_at`. Signature verification happens before the
    /// expiry check.
    pub fn decode(&self, token: &str) -> Result<DecodedToken, CodecError> {
        let json = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|_| CodecError::Malformed)?;
        let envelope: Envelope =
            serde_json::from_slice(&json).map_err(|_| CodecError::Malformed)?;

        let sig_bytes = hex_decode(&envelope.signature).ok_or(CodecError::Malformed)?;

        let mut verified = self.verify(
            &self.keys.current,
            &envelope,
            &sig_bytes,
        );
        if !verified {
            if let Some(previous) = &self.keys.previous {
                verified = self.verify(previous, &envelope, &sig_bytes);
            }
        }
        if !verified {
            return Err(CodecError::InvalidSignature);
        }

        if Utc::now().timestamp() >= envelope.expires_at {
            return Err(CodecError::Expired);
        }

        Ok(DecodedToken {
            payload: envelope.payload,
            issued_at: timestamp_from_secs(envelope.issued_at),
            expires_at: timestamp_from_secs(envelope.expires_at),
        })
    }

    /// Compute the hex HMAC-SHA256 signature over the canonical bytes.
    fn sign(
        &self,
        secret: &str,
        payload: &serde_json::Value,
        issued_at: i64,
        expires_at: i64,
        nonce: &str,
    ) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(&canonical_bytes(payload, issued_at, expires_at, nonce));
        hex_encode(mac.finalize().into_bytes())
    }

    /// Verify the claimed signature in constant time via `Mac::verify_slice`.
    fn verify(&self, secret: &str, envelope: &Envelope, sig_bytes: &[u8]) -> bool {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(&canonical_bytes(
            &envelope.payload,
            envelope.issued_at,
            envelope.expires_at,
            &envelope.nonce,
        ));
        mac.verify_slice(sig_bytes).is_ok()
    }
}

/// Canonical signing bytes: a JSON object with sorted keys containing every
/// envelope field except the signature. Must not change once tokens are in
/// the wild.
fn canonical_bytes(
    payload: &serde_json::Value,
    issued_at: i64,
    expires_at: i64,
    nonce: &str,
) -> Vec<u8> {
    let value = serde_json::json!({
        "payload": payload,
        "issued_at": issued_at,
        "expires_at": expires_at,
        "nonce": nonce,
    });
    serde_json::to_vec(&value).expect("canonical serialization cannot fail")
}

/// Decode a lowercase hex string. Returns `None` on odd length or anything
/// that is not an ASCII hex digit, including multi-byte characters in
/// attacker-supplied signatures.
fn hex_decode(s: &str) -> Option<Vec<u8>> {
    let bytes = s.as_bytes();
    if bytes.len() % 2 != 0 || !bytes.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    bytes
        .chunks(2)
        .map(|pair| {
            let hi = char::from(pair[0]).to_digit(16)?;
            let lo = char::from(pair[1]).to_digit(16)?;
            Some((hi as u8) << 4 | lo as u8)
        })
        .collect()
}

fn timestamp_from_secs(secs: i64) -> Timestamp {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
