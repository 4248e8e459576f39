//! Core OTP derivation: RFC 4226 (HOTP) and RFC 6238 (TOTP).
//!
//! Pure functions only: HMAC over a big-endian counter, dynamic truncation,
//! Base32 secret decoding and time-step arithmetic. Credential state and
//! counter bookkeeping live in `credential.rs`.

use crate::oath::types::*;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw HMAC-OTP (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute an HOTP code for the given raw key bytes and counter.
pub fn hotp_raw(key: &[u8], counter: u64, digits: u8, algo: Algorithm) -> Result<String, OathError> {
    let hmac_result = compute_hmac(key, &counter.to_be_bytes(), algo)?;
    Ok(truncate(&hmac_result, digits))
}

fn mac_over<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, OathError> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|e| {
        OathError::new(OathErrorKind::InvalidSecret, "Secret rejected as HMAC key")
            .with_detail(e.to_string())
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Compute HMAC(key, message) using the specified algorithm.
fn compute_hmac(key: &[u8], data: &[u8], algo: Algorithm) -> Result<Vec<u8>, OathError> {
    match algo {
        Algorithm::Sha1 => mac_over::<Hmac<Sha1>>(key, data),
        Algorithm::Sha256 => mac_over::<Hmac<Sha256>>(key, data),
        Algorithm::Sha512 => mac_over::<Hmac<Sha512>>(key, data),
    }
}

/// Dynamic truncation per RFC 4226 §5.3, zero-padded to `digits`.
///
/// The truncated value is below 2^31, so from 10 digits on the modulo leaves it
/// unchanged; from 20 digits `10^digits` overflows `u64` and the modulo is
/// skipped. Either way the value is only padded.
fn truncate(hmac_result: &[u8], digits: u8) -> String {
    let offset = (hmac_result[hmac_result.len() - 1] & 0x0f) as usize;
    let binary = ((hmac_result[offset] as u64 & 0x7f) << 24)
        | ((hmac_result[offset + 1] as u64) << 16)
        | ((hmac_result[offset + 2] as u64) << 8)
        | (hmac_result[offset + 3] as u64);
    let code = match 10u64.checked_pow(digits as u32) {
        Some(modulus) => binary % modulus,
        None => binary,
    };
    format!("{:0>width$}", code, width = digits as usize)
}

/// Resolve an algorithm name into a supported HMAC function.
pub fn resolve_algorithm(name: &str) -> Result<Algorithm, OathError> {
    Algorithm::from_str_loose(name).ok_or_else(|| {
        OathError::new(
            OathErrorKind::UnsupportedAlgorithm,
            format!("Unsupported HMAC algorithm: '{}'", name),
        )
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP time steps (RFC 6238)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Time-step counter for an instant. Instants before the epoch map to step 0.
pub fn time_step_at(now: DateTime<Utc>, period: u32) -> u64 {
    let secs = now.timestamp().max(0) as u64;
    secs / period.max(1) as u64
}

/// Start (inclusive) and end (exclusive) of a time step.
pub fn step_window(step: u64, period: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let period = period.max(1) as i64;
    let start_secs = (step as i64).saturating_mul(period);
    let start = Utc.timestamp_opt(start_secs, 0).single().unwrap_or_default();
    let until = Utc
        .timestamp_opt(start_secs.saturating_add(period), 0)
        .single()
        .unwrap_or_default();
    (start, until)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Secret helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a base-32 secret (with or without spaces/dashes, case-insensitive).
///
/// Strict RFC 4648: `=` only as a trailing run that completes an 8-character
/// block, no impossible lengths, and unused trailing bits must be zero.
pub fn decode_secret(b32: &str) -> Result<Vec<u8>, OathError> {
    let cleaned = normalise_secret(b32);
    if cleaned.is_empty() {
        return Err(OathError::new(OathErrorKind::InvalidSecret, "Secret is empty"));
    }
    let data = cleaned.trim_end_matches('=');
    let pad_len = cleaned.len() - data.len();
    if data.is_empty() {
        return Err(invalid_secret("secret is only padding"));
    }
    if !data.chars().all(|c| matches!(c, 'A'..='Z' | '2'..='7')) {
        return Err(invalid_secret("unexpected character"));
    }
    let remainder = data.len() % 8;
    if matches!(remainder, 1 | 3 | 6) {
        return Err(invalid_secret("impossible length"));
    }
    if pad_len > 0 && (remainder == 0 || remainder + pad_len != 8) {
        return Err(invalid_secret("wrong amount of padding"));
    }
    let key = base32::decode(base32::Alphabet::Rfc4648 { padding: true }, &pad_base32(data))
        .ok_or_else(|| invalid_secret("undecodable"))?;
    // Re-encoding catches non-zero trailing bits (e.g. "AB").
    if key.is_empty() || encode_secret(&key) != data {
        return Err(invalid_secret("non-canonical encoding"));
    }
    Ok(key)
}

fn invalid_secret(detail: &str) -> OathError {
    OathError::new(OathErrorKind::InvalidSecret, "Invalid base-32 secret").with_detail(detail)
}

/// Encode raw bytes to base-32 (no padding, uppercase).
pub fn encode_secret(bytes: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, bytes)
}

/// Uppercase, with spaces and dashes removed.
pub fn normalise_secret(b32: &str) -> String {
    b32.replace(' ', "").replace('-', "").to_uppercase()
}

/// Check if a string decodes as a non-empty base-32 secret.
pub fn is_valid_base32(s: &str) -> bool {
    decode_secret(s).is_ok()
}

/// Pad a base-32 string to a multiple of 8 with '='.
fn pad_base32(s: &str) -> String {
    let remainder = s.len() % 8;
    if remainder == 0 {
        s.to_string()
    } else {
        format!("{}{}", s, "=".repeat(8 - remainder))
    }
}
