//! Stripe webhook signature verification.
//!
//! Stripe signs every webhook delivery with the endpoint's signing secret (`whsec_...`) and sends the result in the
//! `Stripe-Signature` header:
//!
//! ```text
//! Stripe-Signature: t=1492774577,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! `v1` is the hex-encoded HMAC-SHA256 of `"{t}.{raw_body}"`. There may be more than one `v1` entry while a secret
//! is being rolled, and a match against any of them is accepted. Other schemes (e.g. `v0`) are ignored.
//!
//! The timestamp is part of the signed payload, so rejecting stale timestamps defeats replay of captured deliveries.
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::StripeEvent;

pub const DEFAULT_SIGNATURE_HEADER: &str = "Stripe-Signature";
pub const DEFAULT_SIGNATURE_TOLERANCE: Duration = Duration::from_secs(300);

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No webhook signing secret has been configured")]
    MissingSecret,
    #[error("The signature header is malformed. {0}")]
    MalformedHeader(String),
    #[error("The signature header contains no v1 signatures")]
    NoSignatures,
    #[error("The signature timestamp {timestamp} is outside the tolerance window (now: {now})")]
    TimestampOutOfTolerance { timestamp: i64, now: i64 },
    #[error("No signature in the header matches the payload")]
    SignatureMismatch,
    #[error("The payload is not a valid Stripe event. {0}")]
    InvalidPayload(String),
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for item in header.split(',') {
            let (key, value) = item
                .trim()
                .split_once('=')
                .ok_or_else(|| SignatureError::MalformedHeader(format!("'{item}' is not a key=value pair")))?;
            match key {
                "t" => {
                    let t = value
                        .parse::<i64>()
                        .map_err(|e| SignatureError::MalformedHeader(format!("Invalid timestamp {value}. {e}")))?;
                    timestamp = Some(t);
                },
                "v1" => match hex::decode(value) {
                    Ok(sig) => signatures.push(sig),
                    // A garbled entry can't match, but another v1 entry still might.
                    Err(e) => debug!("🔐️ Ignoring v1 signature that is not valid hex. {e}"),
                },
                _ => trace!("🔐️ Ignoring signature scheme {key}"),
            }
        }
        let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader("No timestamp".to_string()))?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }
        Ok(Self { timestamp, signatures })
    }
}

fn signed_payload_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::MissingSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// The hex-encoded `v1` signature Stripe would send for `payload` at `timestamp`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let mac = signed_payload_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds a complete `Stripe-Signature` header value. Useful for tests and local tooling that replays webhooks.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let sig = compute_signature(secret, timestamp, payload)?;
    Ok(format!("t={timestamp},v1={sig}"))
}

/// Verifies the signature header against the raw request body and, if it is valid, parses the body as a
/// [`StripeEvent`].
///
/// The body must be passed exactly as received. Re-serialized JSON will not verify.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
) -> Result<StripeEvent, SignatureError> {
    verify_signature_at(payload, header, secret, tolerance, Utc::now().timestamp())
}

/// As [`verify_signature`], with an explicit value for the current unix time.
pub fn verify_signature_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<StripeEvent, SignatureError> {
    let header = SignatureHeader::parse(header)?;
    let expected = signed_payload_mac(secret, header.timestamp, payload)?.finalize().into_bytes();
    let matched = header.signatures.iter().any(|sig| bool::from(expected.as_slice().ct_eq(sig.as_slice())));
    if !matched {
        return Err(SignatureError::SignatureMismatch);
    }
    let tolerance = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
    if (now - header.timestamp).abs() > tolerance {
        return Err(SignatureError::TimestampOutOfTolerance { timestamp: header.timestamp, now });
    }
    serde_json::from_slice::<StripeEvent>(payload).map_err(|e| SignatureError::InvalidPayload(e.to_string()))
}
