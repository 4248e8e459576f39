//! # SortOfRemote NG – OATH Credential Core
//!
//! Counter-based and time-based one-time password credentials:
//!
//! - **RFC 4226 / 6238** – HOTP & TOTP code derivation with SHA-1, SHA-256, SHA-512
//! - **Builders** – single validation point for issuer / account name, with
//!   configurable defaults for digits, algorithm and period
//! - **Injectable clock** – wall clock in production, fixed or manual clocks in tests
//! - **Serialisation** – JSON records with an `oathType` discriminator that
//!   re-hydrate the exact credential variant, live HOTP counter included

pub mod oath;
