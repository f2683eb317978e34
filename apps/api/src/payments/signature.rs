//! Stripe-style webhook signatures.
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`.
//! The MAC is HMAC-SHA256 over `"{t}.{raw body}"` keyed with the endpoint secret.
//! Several `v1` entries appear while a secret is being rolled; any match is accepted.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    MalformedHeader,

    #[error("signature does not match payload")]
    Mismatch,

    #[error("signature timestamp is outside the tolerance window ({age_secs}s)")]
    OutsideTolerance { age_secs: i64 },

    #[error("webhook secret is unusable")]
    InvalidSecret,
}

struct SignatureHeader<'a> {
    timestamp: i64,
    raw_timestamp: &'a str,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader<'_>, SignatureError> {
    let mut raw_timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',').map(str::trim) {
        if let Some(t) = part.strip_prefix("t=") {
            raw_timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            // Undecodable entries can never match.
            if let Ok(bytes) = hex::decode(v) {
                signatures.push(bytes);
            }
        }
    }

    let raw_timestamp = raw_timestamp.ok_or(SignatureError::MalformedHeader)?;
    let timestamp = raw_timestamp
        .parse::<i64>()
        .map_err(|_| SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    Ok(SignatureHeader {
        timestamp,
        raw_timestamp,
        signatures,
    })
}

fn mac_for(payload: &[u8], timestamp: &str, secret: &str) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verifies `header` against `payload` at the current wall-clock time.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    verify_webhook_signature_at(payload, header, secret, tolerance, chrono::Utc::now().timestamp())
}

pub fn verify_webhook_signature_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::InvalidSecret);
    }
    let parsed = parse_header(header)?;
    let mac = mac_for(payload, parsed.raw_timestamp, secret)?;

    // Constant-time comparison via hmac::verify_slice
    let matched = parsed
        .signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok());
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    // Replay window
    let age_secs = now - parsed.timestamp;
    let tolerance_secs = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
    if age_secs.abs() > tolerance_secs {
        return Err(SignatureError::OutsideTolerance { age_secs });
    }

    Ok(())
}

/// Produces a header value the way the payment provider signs deliveries.
#[cfg(test)]
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let t = timestamp.to_string();
    let mac = mac_for(payload, &t, secret).expect("test secret");
    format!("t={t},v1={}", hex::encode(mac.finalize().into_bytes()))
}
