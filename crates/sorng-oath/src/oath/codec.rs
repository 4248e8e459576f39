//! JSON serialisation with variant dispatch.
//!
//! Record shape (camelCase keys):
//!
//! ```json
//! {"id":"Acme-alice-otpauth","mechanismUID":"…","issuer":"Acme","accountName":"alice",
//!  "type":"otpauth","oathType":"HOTP","algorithm":"SHA1","secret":"JBSWY3DPEHPK3PXP",
//!  "digits":6,"timeCreated":1600000000000,"counter":3}
//! ```
//!
//! TOTP records carry `period` instead of `counter`. `deserialize` reads
//! `oathType` first and picks the decoder from it alone.

use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::oath::builder::{HotpBuilder, OathBuilder, TotpBuilder, VariantParams};
use crate::oath::credential::{OathCredential, OathVariant};
use crate::oath::types::OathType;

/// Value of the `type` key on every record.
pub const MECHANISM_TYPE: &str = "otpauth";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Serialise
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Render a credential as a JSON record.
pub fn serialize(credential: &OathCredential) -> String {
    let mut record = json!({
        "id": credential.opaque_id(),
        "mechanismUID": credential.mechanism_uid(),
        "issuer": credential.issuer(),
        "accountName": credential.account_name(),
        "type": MECHANISM_TYPE,
        "oathType": credential.oath_type(),
        "algorithm": credential.algorithm(),
        "secret": credential.secret(),
        "digits": credential.digits(),
        "timeCreated": credential.time_created().timestamp_millis(),
    });
    match credential.variant() {
        OathVariant::Hotp { counter } => record["counter"] = json!(counter),
        OathVariant::Totp { period } => record["period"] = json!(period),
    }
    record.to_string()
}

impl OathCredential {
    /// Shorthand for [`serialize`].
    pub fn to_json(&self) -> String {
        serialize(self)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Deserialise
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommonRecord {
    #[serde(rename = "mechanismUID", default)]
    mechanism_uid: Option<String>,
    issuer: String,
    account_name: String,
    #[serde(default)]
    algorithm: Option<String>,
    secret: String,
    #[serde(default)]
    digits: Option<u8>,
    #[serde(default, alias = "timeAdded")]
    time_created: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct HotpRecord {
    #[serde(flatten)]
    common: CommonRecord,
    counter: u64,
}

#[derive(Debug, Deserialize)]
struct TotpRecord {
    #[serde(flatten)]
    common: CommonRecord,
    period: u32,
}

/// Rebuild a credential from a JSON record.
///
/// Returns `None` for absent or empty input, a missing or unknown `oathType`,
/// a malformed payload, or a record the builder rejects. Never panics.
pub fn deserialize<'a>(json: impl Into<Option<&'a str>>) -> Option<OathCredential> {
    let json = json.into()?;
    if json.trim().is_empty() {
        return None;
    }
    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Rejected OATH record: not JSON ({})", e);
            return None;
        }
    };
    let Some(discriminator) = value.get("oathType").and_then(Value::as_str) else {
        log::warn!("Rejected OATH record: missing oathType");
        return None;
    };
    let Some(oath_type) = OathType::from_discriminator(discriminator) else {
        log::warn!("Rejected OATH record: unknown oathType '{}'", discriminator);
        return None;
    };

    match oath_type {
        OathType::Hotp => decode_hotp(value),
        OathType::Totp => decode_totp(value),
    }
}

fn decode_hotp(value: Value) -> Option<OathCredential> {
    let record: HotpRecord = decode_record(value, OathType::Hotp)?;
    let builder = HotpBuilder::new().with_counter(record.counter);
    finish(apply_common(builder, record.common)?, OathType::Hotp)
}

fn decode_totp(value: Value) -> Option<OathCredential> {
    let record: TotpRecord = decode_record(value, OathType::Totp)?;
    let builder = TotpBuilder::new().with_period(record.period);
    finish(apply_common(builder, record.common)?, OathType::Totp)
}

fn decode_record<T: for<'de> Deserialize<'de>>(value: Value, oath_type: OathType) -> Option<T> {
    serde_json::from_value(value)
        .map_err(|e| log::warn!("Rejected {} record: malformed payload ({})", oath_type, e))
        .ok()
}

fn apply_common<V: VariantParams>(
    mut builder: OathBuilder<V>,
    common: CommonRecord,
) -> Option<OathBuilder<V>> {
    builder = builder
        .with_issuer(common.issuer)
        .with_account_name(common.account_name)
        .with_secret(common.secret);
    if let Some(uid) = common.mechanism_uid {
        builder = builder.with_mechanism_uid(uid);
    }
    if let Some(algorithm) = common.algorithm {
        builder = builder.with_algorithm(algorithm);
    }
    if let Some(digits) = common.digits {
        builder = builder.with_digits(digits);
    }
    if let Some(ms) = common.time_created {
        let Some(created) = Utc.timestamp_millis_opt(ms).single() else {
            log::warn!("Rejected OATH record: timeCreated out of range");
            return None;
        };
        builder = builder.with_time_created(created);
    }
    Some(builder)
}

fn finish<V: VariantParams>(builder: OathBuilder<V>, oath_type: OathType) -> Option<OathCredential> {
    builder
        .build()
        .map_err(|e| log::warn!("Rejected {} record: {}", oath_type, e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oath::clock::FixedClock;

    fn hotp() -> OathCredential {
        HotpBuilder::new()
            .with_mechanism_uid("m-1")
            .with_issuer("Acme")
            .with_account_name("alice")
            .with_secret("JBSWY3DPEHPK3PXP")
            .with_time_created(Utc.timestamp_millis_opt(1_600_000_000_123).unwrap())
            .with_counter(3)
            .build()
            .unwrap()
    }

    fn totp() -> OathCredential {
        TotpBuilder::new()
            .with_mechanism_uid("m-2")
            .with_issuer("Acme")
            .with_account_name("bob")
            .with_secret("JBSWY3DPEHPK3PXP")
            .with_algorithm("SHA256")
            .with_digits(8)
            .with_period(60)
            .with_time_created(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn serialize_emits_all_fields() {
        let v: Value = serde_json::from_str(&serialize(&hotp())).unwrap();
        assert_eq!(v["id"], "Acme-alice-otpauth");
        assert_eq!(v["mechanismUID"], "m-1");
        assert_eq!(v["issuer"], "Acme");
        assert_eq!(v["accountName"], "alice");
        assert_eq!(v["type"], "otpauth");
        assert_eq!(v["oathType"], "HOTP");
        assert_eq!(v["algorithm"], "SHA1");
        assert_eq!(v["secret"], "JBSWY3DPEHPK3PXP");
        assert_eq!(v["digits"], 6);
        assert_eq!(v["timeCreated"], 1_600_000_000_123i64);
        assert_eq!(v["counter"], 3);
        assert!(v.get("period").is_none());
    }

    #[test]
    fn serialize_totp_carries_period() {
        let v: Value = serde_json::from_str(&totp().to_json()).unwrap();
        assert_eq!(v["oathType"], "TOTP");
        assert_eq!(v["period"], 60);
        assert!(v.get("counter").is_none());
    }

    #[test]
    fn roundtrip_is_equal() {
        for cred in [hotp(), totp()] {
            let back = deserialize(serialize(&cred).as_str()).unwrap();
            assert_eq!(back, cred);
        }
    }

    #[test]
    fn roundtrip_keeps_live_counter() {
        let mut cred = hotp();
        cred.generate_code().unwrap();
        cred.generate_code().unwrap();
        let mut back = deserialize(cred.to_json().as_str()).unwrap();
        assert_eq!(back.counter(), Some(5));
        assert_eq!(
            back.generate_code().unwrap().code,
            cred.generate_code().unwrap().code
        );
    }

    #[test]
    fn roundtrip_totp_same_code() {
        let mut cred = totp();
        let mut back = deserialize(cred.to_json().as_str()).unwrap();
        let clock = FixedClock::at_unix(1_234_567);
        assert_eq!(
            back.generate_code_with(&clock).unwrap(),
            cred.generate_code_with(&clock).unwrap()
        );
    }

    #[test]
    fn empty_and_absent_input() {
        assert!(deserialize("").is_none());
        assert!(deserialize("   ").is_none());
        assert!(deserialize(None::<&str>).is_none());
        assert!(deserialize("null").is_none());
    }

    #[test]
    fn garbage_input() {
        assert!(deserialize("{garbage}").is_none());
        assert!(deserialize("[1,2,3]").is_none());
        assert!(deserialize("{\"oathType\": 7}").is_none());
    }

    #[test]
    fn discriminator_is_case_insensitive() {
        let json = hotp().to_json().replace("\"HOTP\"", "\"hotp\"");
        let cred = deserialize(json.as_str()).unwrap();
        assert_eq!(cred.oath_type(), OathType::Hotp);
    }

    #[test]
    fn unknown_or_missing_discriminator() {
        let json = hotp().to_json().replace("\"HOTP\"", "\"PUSH\"");
        assert!(deserialize(json.as_str()).is_none());
        let mut v: Value = serde_json::from_str(&hotp().to_json()).unwrap();
        v.as_object_mut().unwrap().remove("oathType");
        assert!(deserialize(v.to_string().as_str()).is_none());
    }

    #[test]
    fn dispatch_follows_discriminator_not_fields() {
        // A TOTP discriminator with only a counter is malformed, not an HOTP record.
        let mut v: Value = serde_json::from_str(&hotp().to_json()).unwrap();
        v["oathType"] = json!("TOTP");
        assert!(deserialize(v.to_string().as_str()).is_none());
    }

    #[test]
    fn malformed_payload() {
        let mut v: Value = serde_json::from_str(&hotp().to_json()).unwrap();
        v["counter"] = json!(-1);
        assert!(deserialize(v.to_string().as_str()).is_none());

        let mut v: Value = serde_json::from_str(&totp().to_json()).unwrap();
        v["digits"] = json!("eight");
        assert!(deserialize(v.to_string().as_str()).is_none());
    }

    #[test]
    fn empty_issuer_is_rejected() {
        let mut v: Value = serde_json::from_str(&totp().to_json()).unwrap();
        v["issuer"] = json!("");
        assert!(deserialize(v.to_string().as_str()).is_none());
    }

    #[test]
    fn time_added_alias_and_unknown_keys() {
        let json = r#"{
            "oathType": "totp",
            "issuer": "Acme",
            "accountName": "carol",
            "secret": "JBSWY3DPEHPK3PXP",
            "period": 30,
            "timeAdded": 1000,
            "somethingElse": true
        }"#;
        let cred = deserialize(json).unwrap();
        assert_eq!(cred.time_created().timestamp_millis(), 1000);
        assert_eq!(cred.digits(), 6);
        assert_eq!(cred.algorithm(), "SHA1");
    }
}
