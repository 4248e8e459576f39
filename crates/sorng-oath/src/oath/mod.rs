//! OATH crate: sub-modules.

pub mod types;
pub mod clock;
pub mod config;
pub mod core;
pub mod credential;
pub mod builder;
pub mod codec;

// Re-export top-level items for convenience.
pub use builder::{HotpBuilder, OathBuilder, TotpBuilder};
pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use codec::{deserialize, serialize};
pub use config::OathDefaults;
pub use credential::{OathCredential, OathVariant};
pub use types::*;
