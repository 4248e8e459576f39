//! The OATH credential: shared attributes plus a closed HOTP/TOTP payload.
//!
//! Credentials are only materialised by the builders in `builder.rs` (or by
//! `codec::deserialize`, which goes through the same builders), so the
//! issuer / account name invariants hold for every value of this type.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::oath::clock::{Clock, SystemClock};
use crate::oath::core;
use crate::oath::types::*;

/// Variant-specific state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OathVariant {
    /// Counter-based. The counter is the value used for the *next* code.
    Hotp { counter: u64 },
    /// Time-based with a step length in seconds.
    Totp { period: u32 },
}

impl OathVariant {
    pub fn oath_type(&self) -> OathType {
        match self {
            Self::Hotp { .. } => OathType::Hotp,
            Self::Totp { .. } => OathType::Totp,
        }
    }
}

/// A single OATH credential.
#[derive(Clone, PartialEq)]
pub struct OathCredential {
    mechanism_uid: String,
    issuer: String,
    account_name: String,
    algorithm: String,
    secret: String,
    digits: u8,
    time_created: DateTime<Utc>,
    variant: OathVariant,
}

impl fmt::Debug for OathCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OathCredential")
            .field("mechanism_uid", &self.mechanism_uid)
            .field("issuer", &self.issuer)
            .field("account_name", &self.account_name)
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .field("digits", &self.digits)
            .field("time_created", &self.time_created)
            .field("variant", &self.variant)
            .finish()
    }
}

impl OathCredential {
    /// Assemble a credential from fields the builder has already validated.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        mechanism_uid: String,
        issuer: String,
        account_name: String,
        algorithm: String,
        secret: String,
        digits: u8,
        time_created: DateTime<Utc>,
        variant: OathVariant,
    ) -> Self {
        Self {
            mechanism_uid,
            issuer,
            account_name,
            algorithm,
            secret,
            digits,
            time_created,
            variant,
        }
    }

    pub fn mechanism_uid(&self) -> &str {
        &self.mechanism_uid
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Algorithm name as supplied; resolved only when a code is generated.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The Base32 secret as supplied.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn digits(&self) -> u8 {
        self.digits
    }

    pub fn time_created(&self) -> DateTime<Utc> {
        self.time_created
    }

    pub fn variant(&self) -> &OathVariant {
        &self.variant
    }

    pub fn oath_type(&self) -> OathType {
        self.variant.oath_type()
    }

    /// Current HOTP counter; `None` for TOTP.
    pub fn counter(&self) -> Option<u64> {
        match self.variant {
            OathVariant::Hotp { counter } => Some(counter),
            OathVariant::Totp { .. } => None,
        }
    }

    /// TOTP step length in seconds; `None` for HOTP.
    pub fn period(&self) -> Option<u32> {
        match self.variant {
            OathVariant::Totp { period } => Some(period),
            OathVariant::Hotp { .. } => None,
        }
    }

    /// Stable external key: "issuer-account-otpauth".
    pub fn opaque_id(&self) -> String {
        format!("{}-{}-otpauth", self.issuer, self.account_name)
    }

    /// "Issuer (account)".
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.issuer, self.account_name)
    }

    /// Whether the stored secret decodes as Base32.
    pub fn is_secret_valid(&self) -> bool {
        core::is_valid_base32(&self.secret)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Code generation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Generate the current code against the wall clock.
    pub fn generate_code(&mut self) -> Result<OathTokenCode, OathError> {
        self.generate_code_with(&SystemClock)
    }

    /// Generate the current code.
    ///
    /// HOTP: uses the stored counter and advances it by one. The counter only
    /// moves once the code exists, so on error it is left untouched. The clock
    /// is not consulted.
    ///
    /// TOTP: same as [`time_based_code_with`](Self::time_based_code_with).
    pub fn generate_code_with<C: Clock + ?Sized>(
        &mut self,
        clock: &C,
    ) -> Result<OathTokenCode, OathError> {
        let current = match self.variant {
            OathVariant::Hotp { counter } => counter,
            OathVariant::Totp { .. } => return self.time_based_code_with(clock),
        };
        let (key, algo) = self.key_material()?;
        let next = current.checked_add(1).ok_or_else(|| {
            OathError::new(OathErrorKind::CounterExhausted, "HOTP counter exhausted")
        })?;
        let code = core::hotp_raw(&key, current, self.digits, algo)?;
        self.variant = OathVariant::Hotp { counter: next };
        log::debug!(
            "HOTP code generated for mechanism {} (counter {} -> {})",
            self.mechanism_uid,
            current,
            next
        );
        Ok(OathTokenCode {
            code,
            oath_type: OathType::Hotp,
            counter: current,
            start: None,
            until: None,
        })
    }

    /// TOTP code for `floor(clock.now() / period)` through a shared borrow, so
    /// one credential can serve several readers. HOTP credentials return
    /// `RequiresCounter`: their codes must go through `generate_code_with`.
    pub fn time_based_code_with<C: Clock + ?Sized>(
        &self,
        clock: &C,
    ) -> Result<OathTokenCode, OathError> {
        let period = match self.variant {
            OathVariant::Totp { period } => period,
            OathVariant::Hotp { .. } => {
                return Err(OathError::new(
                    OathErrorKind::RequiresCounter,
                    "HOTP codes advance the counter and need exclusive access",
                ))
            }
        };
        let (key, algo) = self.key_material()?;
        let step = core::time_step_at(clock.now(), period);
        let code = core::hotp_raw(&key, step, self.digits, algo)?;
        let (start, until) = core::step_window(step, period);
        log::debug!(
            "TOTP code generated for mechanism {} (step {})",
            self.mechanism_uid,
            step
        );
        Ok(OathTokenCode {
            code,
            oath_type: OathType::Totp,
            counter: step,
            start: Some(start),
            until: Some(until),
        })
    }

    fn key_material(&self) -> Result<(Vec<u8>, Algorithm), OathError> {
        let algo = core::resolve_algorithm(&self.algorithm)?;
        let key = core::decode_secret(&self.secret)?;
        Ok((key, algo))
    }
}
