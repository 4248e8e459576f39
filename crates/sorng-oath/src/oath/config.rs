//! Defaults applied by the builders when a field is left unset.

use serde::{Deserialize, Serialize};

use crate::oath::types::Algorithm;

/// Default OTP length.
pub const DEFAULT_DIGITS: u8 = 6;
/// Default TOTP time step, in seconds.
pub const DEFAULT_PERIOD: u32 = 30;

/// Builder defaults. Every field is optional in JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OathDefaults {
    pub digits: u8,
    /// Stored as a name so it can be handed to credentials unchanged.
    pub algorithm: String,
    pub period: u32,
}

impl Default for OathDefaults {
    fn default() -> Self {
        Self {
            digits: DEFAULT_DIGITS,
            algorithm: Algorithm::default().name().to_string(),
            period: DEFAULT_PERIOD,
        }
    }
}

impl OathDefaults {
    /// Load from a JSON object; missing keys keep their stock values.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let defaults: Self = serde_json::from_str(json)?;
        Ok(defaults.normalised())
    }

    /// Replace zero digits/period and a blank algorithm with the stock values.
    pub fn normalised(mut self) -> Self {
        if self.digits == 0 {
            self.digits = DEFAULT_DIGITS;
        }
        if self.period == 0 {
            self.period = DEFAULT_PERIOD;
        }
        if self.algorithm.trim().is_empty() {
            self.algorithm = Algorithm::default().name().to_string();
        }
        self
    }
}
