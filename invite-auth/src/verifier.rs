//! Credential check for the single admin account.
//!
//! The submitted account name is trimmed (whitespace and U+FEFF) and compared
//! case-sensitively; the password is digested with the configured text
//! encoding and compared to the reference fingerprint. The password is never
//! logged. On a fingerprint mismatch the computed digest is logged at `warn`,
//! which is not reversible but can be removed by filtering the
//! `invite_auth::verifier` target.

use subtle::{Choice, ConstantTimeEq};

use crate::config::{trim_account_name, AccountConfig, TimingPolicy};
use crate::crypto::compare::constant_time_eq;
use crate::crypto::{digest_text, DigestError};

/// Checks username/password pairs against one immutable `AccountConfig`.
///
/// Holds no mutable state, so a single verifier can be shared across threads.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    config: AccountConfig,
}

impl CredentialVerifier {
    pub fn new(config: AccountConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Returns `Ok(true)` only when both the account name and the password
    /// fingerprint match. Errors mean the password could not be digested and
    /// are terminal for this attempt.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool, DigestError> {
        match self.config.timing_policy() {
            TimingPolicy::ShortCircuit => self.verify_short_circuit(username, password),
            TimingPolicy::Hardened => self.verify_hardened(username, password),
        }
    }

    /// Collapses errors into "not verified" for callers that must show a
    /// single generic failure.
    pub fn is_verified(&self, username: &str, password: &str) -> bool {
        match self.verify(username, password) {
            Ok(verified) => verified,
            Err(err) => {
                tracing::debug!(error = %err, "credential could not be digested");
                false
            }
        }
    }

    fn verify_short_circuit(&self, username: &str, password: &str) -> Result<bool, DigestError> {
        if trim_account_name(username) != self.config.account_name() {
            tracing::debug!("account name mismatch");
            return Ok(false);
        }

        let computed = digest_text(password, self.config.encoding())?;
        if !computed.matches(self.config.reference()) {
            tracing::warn!(computed = %computed, "fingerprint mismatch");
            return Ok(false);
        }
        Ok(true)
    }

    fn verify_hardened(&self, username: &str, password: &str) -> Result<bool, DigestError> {
        let name_ok = Choice::from(u8::from(constant_time_eq(
            trim_account_name(username).as_bytes(),
            self.config.account_name().as_bytes(),
        )));
        let computed = digest_text(password, self.config.encoding())?;
        let fingerprint_ok = computed.as_bytes()[..].ct_eq(&self.config.reference().as_bytes()[..]);

        let verified: bool = (name_ok & fingerprint_ok).into();
        if !verified {
            tracing::debug!("credential rejected");
        }
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::TextEncoding;

    fn verifier(policy: TimingPolicy) -> CredentialVerifier {
        CredentialVerifier::new(AccountConfig::default().with_timing_policy(policy))
    }

    #[test]
    fn accepts_configured_account() {
        for policy in [TimingPolicy::ShortCircuit, TimingPolicy::Hardened] {
            let verifier = verifier(policy);
            assert!(verifier.verify("admin", "abhi").unwrap(), "{policy:?}");
            assert!(verifier.verify("  admin  ", "abhi").unwrap(), "{policy:?}");
            assert!(verifier.verify("admin\n", "abhi").unwrap(), "{policy:?}");
            assert!(verifier.verify("\u{feff}admin", "abhi").unwrap(), "{policy:?}");
        }
    }

    #[test]
    fn rejects_wrong_credentials() {
        for policy in [TimingPolicy::ShortCircuit, TimingPolicy::Hardened] {
            let verifier = verifier(policy);
            assert!(!verifier.verify("Admin", "abhi").unwrap(), "{policy:?}");
            assert!(!verifier.verify("admin", "wrong").unwrap(), "{policy:?}");
            assert!(!verifier.verify("admin", "Abhi").unwrap(), "{policy:?}");
            assert!(!verifier.verify("admin", " abhi").unwrap(), "{policy:?}");
            assert!(!verifier.verify("", "").unwrap(), "{policy:?}");
        }
    }

    #[test]
    fn short_circuit_skips_digest_on_name_mismatch() {
        let config = AccountConfig::default().with_encoding(TextEncoding::Latin1);
        let verifier = CredentialVerifier::new(config);
        // An undecodable password only surfaces once the account name matches.
        assert_eq!(verifier.verify("someone", "\u{20ac}"), Ok(false));
        assert!(matches!(
            verifier.verify("admin", "\u{20ac}"),
            Err(DigestError::Decoding(_))
        ));
    }

    #[test]
    fn hardened_always_digests() {
        let config = AccountConfig::default()
            .with_encoding(TextEncoding::Latin1)
            .with_timing_policy(TimingPolicy::Hardened);
        let verifier = CredentialVerifier::new(config);
        assert!(matches!(
            verifier.verify("someone", "\u{20ac}"),
            Err(DigestError::Decoding(_))
        ));
    }

    #[test]
    fn is_verified_hides_errors() {
        let config = AccountConfig::default().with_encoding(TextEncoding::Latin1);
        let verifier = CredentialVerifier::new(config);
        assert!(!verifier.is_verified("admin", "\u{20ac}"));
        assert!(verifier.is_verified("admin", "abhi"));
    }

    #[test]
    fn verifier_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CredentialVerifier>();
    }
}
