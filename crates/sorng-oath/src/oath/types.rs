//! Core types for the OATH credential core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// HMAC hash function the generator knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Sha1
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Algorithm {
    /// Parse from a case-insensitive string.
    ///
    /// Accepts the plain (`SHA1`), dashed (`SHA-256`) and JCA-style
    /// (`HmacSHA512`) spellings that issuers put in credentials.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SHA1" | "SHA-1" | "HMACSHA1" | "HMAC-SHA1" => Some(Self::Sha1),
            "SHA256" | "SHA-256" | "HMACSHA256" | "HMAC-SHA256" => Some(Self::Sha256),
            "SHA512" | "SHA-512" | "HMACSHA512" | "HMAC-SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Canonical name, as written into serialised records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OATH type (discriminator)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which OATH variant a credential (or a stored record) is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OathType {
    Hotp,
    Totp,
}

impl fmt::Display for OathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hotp => write!(f, "HOTP"),
            Self::Totp => write!(f, "TOTP"),
        }
    }
}

impl OathType {
    /// Parse a discriminator value, ignoring case and surrounding whitespace.
    pub fn from_discriminator(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "HOTP" => Some(Self::Hotp),
            "TOTP" => Some(Self::Totp),
            _ => None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generated code
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A generated OTP code with its validity window.
///
/// TOTP codes carry the boundaries of the time step they belong to. HOTP
/// codes have no window: they stay valid until the server sees a later one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OathTokenCode {
    /// The zero-padded OTP code (e.g. "012345").
    pub code: String,
    /// Variant that produced the code.
    pub oath_type: OathType,
    /// The HOTP counter or TOTP time step fed into the HMAC.
    pub counter: u64,
    /// Start of the time step (TOTP only).
    pub start: Option<DateTime<Utc>>,
    /// End of the time step, exclusive (TOTP only).
    pub until: Option<DateTime<Utc>>,
}

impl OathTokenCode {
    /// Whether the code can still be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.until {
            Some(until) => now < until,
            None => true,
        }
    }

    /// Fraction of the time step already elapsed (0.0 = fresh, 1.0 = expired).
    pub fn progress_at(&self, now: DateTime<Utc>) -> f64 {
        let (Some(start), Some(until)) = (self.start, self.until) else {
            return 0.0;
        };
        let total = (until - start).num_milliseconds();
        if total <= 0 {
            return 1.0;
        }
        let elapsed = (now - start).num_milliseconds().clamp(0, total);
        elapsed as f64 / total as f64
    }

    /// Whole seconds until the code expires, rounded up (0 for HOTP).
    pub fn seconds_remaining_at(&self, now: DateTime<Utc>) -> u32 {
        match self.until {
            Some(until) => {
                let ms = (until - now).num_milliseconds().max(0);
                ((ms + 999) / 1000) as u32
            }
            None => 0,
        }
    }

    /// The code with a space in the middle (e.g. "123 456").
    pub fn formatted(&self) -> String {
        format_code_display(&self.code)
    }
}

/// Format an OTP code with a space in the middle (e.g. "123 456").
pub fn format_code_display(code: &str) -> String {
    if code.len() <= 4 {
        return code.to_string();
    }
    let mid = code.len() / 2;
    format!("{} {}", &code[..mid], &code[mid..])
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OathErrorKind {
    /// Builder had no issuer, or an empty one.
    MissingIssuer,
    /// Builder had no account name, or an empty one.
    MissingAccountName,
    /// Algorithm name does not resolve to a supported HMAC function.
    UnsupportedAlgorithm,
    /// Secret is empty or not valid Base32.
    InvalidSecret,
    /// HOTP counter cannot advance past `u64::MAX`.
    CounterExhausted,
    /// A shared-borrow code was requested from an HOTP credential.
    RequiresCounter,
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OathError {
    pub kind: OathErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for OathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for OathError {}

impl OathError {
    pub fn new(kind: OathErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Raised by `build()`: required builder fields were missing.
    pub fn is_construction(&self) -> bool {
        matches!(
            self.kind,
            OathErrorKind::MissingIssuer | OathErrorKind::MissingAccountName
        )
    }

    /// Raised while generating a code.
    pub fn is_generation(&self) -> bool {
        matches!(
            self.kind,
            OathErrorKind::UnsupportedAlgorithm
                | OathErrorKind::InvalidSecret
                | OathErrorKind::CounterExhausted
                | OathErrorKind::RequiresCounter
        )
    }
}

impl From<OathError> for String {
    fn from(e: OathError) -> String {
        e.to_string()
    }
}
