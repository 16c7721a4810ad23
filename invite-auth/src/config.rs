//! Account configuration for the admin login. The loader reads a small JSON
//! file (or two environment variables) and produces an immutable
//! `AccountConfig` that is handed to the verifier at construction time.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{Digest, TextEncoding};

/// Account name accepted when no configuration is supplied.
pub const DEFAULT_ACCOUNT_NAME: &str = "admin";
/// SHA-256 of the default admin password.
pub const DEFAULT_REFERENCE: Digest = Digest::from_bytes([
    0x54, 0x78, 0xf0, 0x5d, 0xfd, 0x94, 0x1e, 0x62, 0x64, 0x07, 0x2f, 0x3c, 0x34, 0x35, 0x7a, 0x20,
    0x7b, 0xbf, 0x86, 0x85, 0xae, 0x57, 0x1b, 0x53, 0xc5, 0xa7, 0x32, 0xcf, 0x8c, 0x76, 0x2e, 0xc9,
]);

pub const ACCOUNT_NAME_ENV: &str = "INVITE_ADMIN_USER";
pub const FINGERPRINT_ENV: &str = "INVITE_ADMIN_FINGERPRINT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("invalid account name: {0}")]
    InvalidAccountName(String),
    #[error("invalid reference fingerprint: {0}")]
    InvalidFingerprint(String),
    #[error("environment variable {0} is required but missing")]
    MissingEnvVar(String),
}

/// Whether the verifier may skip the digest when the account name is wrong.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingPolicy {
    /// Reject on account-name mismatch before hashing. Leaks which check failed
    /// through timing.
    #[default]
    ShortCircuit,
    /// Always hash and compare both values in constant time.
    Hardened,
}

#[derive(Debug, Deserialize)]
pub struct RawAccountConfig {
    #[serde(rename = "accountName")]
    pub account_name: String,
    #[serde(rename = "referenceFingerprint")]
    pub reference_fingerprint: String,
    #[serde(default)]
    pub encoding: Option<TextEncoding>,
    #[serde(default, rename = "timingPolicy")]
    pub timing_policy: Option<TimingPolicy>,
}

/// The single account the admin page accepts. Holds only the reference
/// fingerprint, never a password, so `Debug` output is safe to log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountConfig {
    #[serde(rename = "accountName")]
    account_name: String,
    #[serde(rename = "referenceFingerprint")]
    reference: Digest,
    encoding: TextEncoding,
    #[serde(rename = "timingPolicy")]
    timing_policy: TimingPolicy,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            account_name: DEFAULT_ACCOUNT_NAME.to_string(),
            reference: DEFAULT_REFERENCE,
            encoding: TextEncoding::default(),
            timing_policy: TimingPolicy::default(),
        }
    }
}

impl AccountConfig {
    /// Validates the account name and parses the hex reference fingerprint.
    pub fn new(account_name: &str, reference_hex: &str) -> Result<Self, ConfigError> {
        if account_name.is_empty() {
            return Err(ConfigError::InvalidAccountName("must not be empty".to_string()));
        }
        if trim_account_name(account_name) != account_name {
            // Submitted names are trimmed, so a padded name could never match.
            return Err(ConfigError::InvalidAccountName(
                "must not have surrounding whitespace".to_string(),
            ));
        }
        let reference = Digest::from_hex(reference_hex)
            .map_err(|e| ConfigError::InvalidFingerprint(format!("{e}")))?;
        Ok(Self {
            account_name: account_name.to_string(),
            reference,
            encoding: TextEncoding::default(),
            timing_policy: TimingPolicy::default(),
        })
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_timing_policy(mut self, timing_policy: TimingPolicy) -> Self {
        self.timing_policy = timing_policy;
        self
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn reference(&self) -> &Digest {
        &self.reference
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn timing_policy(&self) -> TimingPolicy {
        self.timing_policy
    }

    /// Reads `INVITE_ADMIN_USER` and `INVITE_ADMIN_FINGERPRINT`. Returns
    /// `Ok(None)` when neither is set.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_env_vars(ACCOUNT_NAME_ENV, FINGERPRINT_ENV)
    }

    fn from_env_vars(name_var: &str, fingerprint_var: &str) -> Result<Option<Self>, ConfigError> {
        let name = std::env::var(name_var).ok();
        let fingerprint = std::env::var(fingerprint_var).ok();
        match (name, fingerprint) {
            (None, None) => Ok(None),
            (Some(name), Some(fingerprint)) => Self::new(&name, &fingerprint).map(Some),
            (Some(_), None) => Err(ConfigError::MissingEnvVar(fingerprint_var.to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar(name_var.to_string())),
        }
    }

    /// Configuration file if given, otherwise the environment, otherwise the
    /// built-in default account.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::resolve_with(path, ACCOUNT_NAME_ENV, FINGERPRINT_ENV)
    }

    fn resolve_with(
        path: Option<&Path>,
        name_var: &str,
        fingerprint_var: &str,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return load_config(path);
        }
        if let Some(config) = Self::from_env_vars(name_var, fingerprint_var)? {
            return Ok(config);
        }
        tracing::debug!("no account configuration supplied; using built-in default");
        Ok(Self::default())
    }
}

/// Strips whitespace from both ends of a submitted account name, including
/// U+FEFF, which `str::trim` keeps but the browser login's `trim()` removed.
pub fn trim_account_name(name: &str) -> &str {
    name.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Loads the JSON account configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<AccountConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    let raw: RawAccountConfig =
        serde_json::from_str(&raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))?;

    let mut config = AccountConfig::new(&raw.account_name, &raw.reference_fingerprint)?;
    if let Some(encoding) = raw.encoding {
        config = config.with_encoding(encoding);
    }
    if let Some(timing_policy) = raw.timing_policy {
        config = config.with_timing_policy(timing_policy);
    }
    tracing::debug!(
        path = %path.as_ref().display(),
        account = %config.account_name,
        "loaded account configuration"
    );
    Ok(config)
}
