//! Builders: the only way to materialise an [`OathCredential`].
//!
//! Shared fields live on [`OathBuilder`]; the variant-specific field lives in
//! its `params` (`HotpParams` / `TotpParams`). `build()` runs one validation
//! function for issuer and account name, then lets the params assemble the
//! variant payload with defaults applied.

use chrono::{DateTime, TimeZone, Utc};

use crate::oath::config::OathDefaults;
use crate::oath::credential::{OathCredential, OathVariant};
use crate::oath::types::*;

mod sealed {
    pub trait Sealed {}
}

/// Variant-specific builder state. Sealed: HOTP and TOTP are the only variants.
pub trait VariantParams: sealed::Sealed {
    /// Produce the variant payload, applying `defaults` to unset fields.
    fn assemble(self, defaults: &OathDefaults) -> OathVariant;
}

/// HOTP builder state.
#[derive(Debug, Clone, Default)]
pub struct HotpParams {
    counter: u64,
}

impl sealed::Sealed for HotpParams {}

impl VariantParams for HotpParams {
    fn assemble(self, _defaults: &OathDefaults) -> OathVariant {
        OathVariant::Hotp {
            counter: self.counter,
        }
    }
}

/// TOTP builder state.
#[derive(Debug, Clone, Default)]
pub struct TotpParams {
    period: Option<u32>,
}

impl sealed::Sealed for TotpParams {}

impl VariantParams for TotpParams {
    fn assemble(self, defaults: &OathDefaults) -> OathVariant {
        let period = match self.period {
            Some(p) if p > 0 => p,
            _ => defaults.period,
        };
        OathVariant::Totp { period }
    }
}

/// Fluent builder for OATH credentials.
#[derive(Clone, Default)]
pub struct OathBuilder<V> {
    mechanism_uid: Option<String>,
    issuer: Option<String>,
    account_name: Option<String>,
    algorithm: Option<String>,
    secret: Option<String>,
    digits: Option<u8>,
    time_created: Option<DateTime<Utc>>,
    defaults: OathDefaults,
    params: V,
}

pub type HotpBuilder = OathBuilder<HotpParams>;
pub type TotpBuilder = OathBuilder<TotpParams>;

impl HotpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter value for the next code.
    pub fn with_counter(mut self, counter: u64) -> Self {
        self.params.counter = counter;
        self
    }
}

impl TotpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time step in seconds; 0 means "use the default".
    pub fn with_period(mut self, period: u32) -> Self {
        self.params.period = Some(period);
        self
    }
}

impl<V: VariantParams> OathBuilder<V> {
    pub fn with_mechanism_uid(mut self, uid: impl Into<String>) -> Self {
        self.mechanism_uid = Some(uid.into());
        self
    }

    /// Name of the identity provider that issued the account.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_account_name(mut self, account_name: impl Into<String>) -> Self {
        self.account_name = Some(account_name.into());
        self
    }

    /// HMAC algorithm name. Not checked here: an unknown name surfaces as
    /// `UnsupportedAlgorithm` when a code is generated.
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Base32 encoded secret key (RFC 4648).
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Code length; 0 means "use the default".
    pub fn with_digits(mut self, digits: u8) -> Self {
        self.digits = Some(digits);
        self
    }

    pub fn with_time_created(mut self, time_created: DateTime<Utc>) -> Self {
        self.time_created = Some(time_created);
        self
    }

    /// Replace the defaults applied to unset fields. Zero or blank entries
    /// fall back to the stock defaults.
    pub fn with_defaults(mut self, defaults: OathDefaults) -> Self {
        self.defaults = defaults.normalised();
        self
    }

    /// Validate and produce the credential.
    pub fn build(self) -> Result<OathCredential, OathError> {
        let (issuer, account_name) = validate_identity(self.issuer, self.account_name)?;

        let algorithm = match self.algorithm {
            Some(a) if !a.trim().is_empty() => a,
            _ => self.defaults.algorithm.clone(),
        };
        let digits = match self.digits {
            Some(d) if d > 0 => d,
            _ => self.defaults.digits,
        };
        let mechanism_uid = match self.mechanism_uid {
            Some(uid) if !uid.is_empty() => uid,
            _ => uuid::Uuid::new_v4().to_string(),
        };
        // Records store milliseconds; keep the in-memory value identical.
        let created = self.time_created.unwrap_or_else(Utc::now);
        let created = Utc
            .timestamp_millis_opt(created.timestamp_millis())
            .single()
            .unwrap_or(created);
        let variant = self.params.assemble(&self.defaults);

        log::debug!(
            "Built {} credential {} for issuer '{}'",
            variant.oath_type(),
            mechanism_uid,
            issuer
        );

        Ok(OathCredential::from_parts(
            mechanism_uid,
            issuer,
            account_name,
            algorithm,
            self.secret.unwrap_or_default(),
            digits,
            created,
            variant,
        ))
    }
}

/// The single cross-field check every credential passes through.
fn validate_identity(
    issuer: Option<String>,
    account_name: Option<String>,
) -> Result<(String, String), OathError> {
    let issuer = match issuer {
        Some(i) if !i.is_empty() => i,
        _ => {
            return Err(OathError::new(
                OathErrorKind::MissingIssuer,
                "issuer cannot be empty or null",
            ))
        }
    };
    let account_name = match account_name {
        Some(a) if !a.is_empty() => a,
        _ => {
            return Err(OathError::new(
                OathErrorKind::MissingAccountName,
                "accountName cannot be empty or null",
            ))
        }
    };
    Ok((issuer, account_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fails_without_issuer() {
        let err = TotpBuilder::new()
            .with_account_name("alice")
            .build()
            .unwrap_err();
        assert_eq!(err.kind, OathErrorKind::MissingIssuer);
        assert!(err.is_construction());
    }

    #[test]
    fn build_fails_with_empty_issuer() {
        let err = HotpBuilder::new()
            .with_issuer("")
            .with_account_name("alice")
            .build()
            .unwrap_err();
        assert_eq!(err.kind, OathErrorKind::MissingIssuer);
    }

    #[test]
    fn build_fails_without_account_name() {
        let err = HotpBuilder::new().with_issuer("Acme").build().unwrap_err();
        assert_eq!(err.kind, OathErrorKind::MissingAccountName);
        let err = TotpBuilder::new()
            .with_issuer("Acme")
            .with_account_name("")
            .build()
            .unwrap_err();
        assert_eq!(err.kind, OathErrorKind::MissingAccountName);
    }

    #[test]
    fn build_applies_defaults() {
        let cred = TotpBuilder::new()
            .with_issuer("Acme")
            .with_account_name("alice")
            .with_secret("JBSWY3DPEHPK3PXP")
            .build()
            .unwrap();
        assert_eq!(cred.digits(), 6);
        assert_eq!(cred.algorithm(), "SHA1");
        assert_eq!(cred.period(), Some(30));
        assert!(!cred.mechanism_uid().is_empty());
    }

    #[test]
    fn zero_values_take_defaults() {
        let cred = TotpBuilder::new()
            .with_issuer("Acme")
            .with_account_name("alice")
            .with_digits(0)
            .with_period(0)
            .with_algorithm("")
            .build()
            .unwrap();
        assert_eq!(cred.digits(), 6);
        assert_eq!(cred.period(), Some(30));
        assert_eq!(cred.algorithm(), "SHA1");
    }

    #[test]
    fn build_keeps_explicit_fields() {
        let created = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let cred = HotpBuilder::new()
            .with_mechanism_uid("mech-1")
            .with_issuer("Acme")
            .with_account_name("alice")
            .with_algorithm("SHA256")
            .with_secret("JBSWY3DPEHPK3PXP")
            .with_digits(8)
            .with_time_created(created)
            .with_counter(12)
            .build()
            .unwrap();
        assert_eq!(cred.mechanism_uid(), "mech-1");
        assert_eq!(cred.algorithm(), "SHA256");
        assert_eq!(cred.digits(), 8);
        assert_eq!(cred.time_created(), created);
        assert_eq!(cred.counter(), Some(12));
        assert_eq!(cred.oath_type(), OathType::Hotp);
    }

    #[test]
    fn time_created_is_millisecond_precision() {
        let precise = Utc.timestamp_opt(1_600_000_000, 123_456_789).unwrap();
        let cred = HotpBuilder::new()
            .with_issuer("Acme")
            .with_account_name("alice")
            .with_time_created(precise)
            .build()
            .unwrap();
        assert_eq!(cred.time_created().timestamp_millis(), 1_600_000_000_123);
        assert_eq!(cred.time_created().timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn custom_defaults() {
        let defaults = OathDefaults {
            digits: 8,
            algorithm: "SHA512".into(),
            period: 60,
        };
        let cred = TotpBuilder::new()
            .with_defaults(defaults)
            .with_issuer("Acme")
            .with_account_name("alice")
            .build()
            .unwrap();
        assert_eq!(cred.digits(), 8);
        assert_eq!(cred.algorithm(), "SHA512");
        assert_eq!(cred.period(), Some(60));
    }

    #[test]
    fn zeroed_custom_defaults_fall_back_to_stock() {
        let defaults = OathDefaults {
            digits: 0,
            algorithm: String::new(),
            period: 0,
        };
        let mut cred = TotpBuilder::new()
            .with_defaults(defaults)
            .with_issuer("Acme")
            .with_account_name("alice")
            .with_secret("JBSWY3DPEHPK3PXP")
            .build()
            .unwrap();
        assert_eq!(cred.digits(), 6);
        assert_eq!(cred.algorithm(), "SHA1");
        assert_eq!(cred.period(), Some(30));
        let code = cred
            .generate_code_with(&crate::oath::clock::FixedClock::at_unix(0))
            .unwrap();
        assert_eq!(code.code, "282760");
    }

    #[test]
    fn unknown_algorithm_is_accepted_at_build_time() {
        let cred = HotpBuilder::new()
            .with_issuer("Acme")
            .with_account_name("alice")
            .with_algorithm("MD5")
            .build();
        assert!(cred.is_ok());
    }

    #[test]
    fn generated_uids_are_unique() {
        let a = HotpBuilder::new().with_issuer("i").with_account_name("a").build().unwrap();
        let b = HotpBuilder::new().with_issuer("i").with_account_name("a").build().unwrap();
        assert_ne!(a.mechanism_uid(), b.mechanism_uid());
    }
}
