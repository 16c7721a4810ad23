//! Admin credential check for the wedding invitation site.
//! The crate holds the one piece of the site with a real algorithmic contract:
//! a self-contained SHA-256 engine and a verifier for the single admin account,
//! plus the input hygiene helpers the site applies to guest-supplied values.

pub mod config;
pub mod crypto;
pub mod sanitize;
pub mod verifier;

pub use config::{load_config, AccountConfig, ConfigError, TimingPolicy};
pub use crypto::{Digest, DigestError, TextEncoding};
pub use verifier::CredentialVerifier;
