//! Operator CLI for the admin login. Commands stay small so an operator can
//! produce a reference fingerprint, inspect the active account, and check a
//! credential from a shell.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use invite_auth::config::AccountConfig;
use invite_auth::crypto::{digest_text, TextEncoding};
use invite_auth::sanitize::{escape_html, is_valid_audio_url};
use invite_auth::verifier::CredentialVerifier;

/// Admin credential tooling for the wedding invitation site.
#[derive(Parser, Debug)]
#[command(name = "invite-auth", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the JSON account configuration. Falls back to
    /// INVITE_ADMIN_USER / INVITE_ADMIN_FINGERPRINT, then the built-in account.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the SHA-256 digest of a string.
    Digest {
        text: String,
        #[arg(long, value_enum, default_value_t = EncodingArg::Utf8)]
        encoding: EncodingArg,
    },
    /// Print the reference fingerprint to store for a password.
    Fingerprint {
        password: String,
        #[arg(long, value_enum, default_value_t = EncodingArg::Utf8)]
        encoding: EncodingArg,
    },
    /// Check a username/password pair against the configured account.
    Verify { username: String, password: String },
    /// Print the active account configuration.
    ShowConfig,
    /// Escape text for inclusion in the invitation page.
    Sanitize { text: String },
    /// Check that an audio link uses http or https.
    CheckAudioUrl { url: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EncodingArg {
    Utf8,
    Latin1,
}

impl From<EncodingArg> for TextEncoding {
    fn from(value: EncodingArg) -> Self {
        match value {
            EncodingArg::Utf8 => TextEncoding::Utf8,
            EncodingArg::Latin1 => TextEncoding::Latin1,
        }
    }
}

const EXIT_OK: u8 = 0;
const EXIT_REJECTED: u8 = 1;
const EXIT_FAILED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let stdout = io::stdout();
    let stderr = io::stderr();
    match run(cli, &mut stdout.lock(), &mut stderr.lock()) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("output failed: {err}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

/// Dispatches one command. Returns the process exit code: 0 on success,
/// 1 for a rejected credential or URL, 2 when the command could not run.
fn run(cli: Cli, out: &mut dyn Write, err: &mut dyn Write) -> io::Result<u8> {
    match cli.command {
        Commands::Digest { text, encoding } | Commands::Fingerprint { password: text, encoding } => {
            match digest_text(&text, encoding.into()) {
                Ok(digest) => {
                    writeln!(out, "{digest}")?;
                    Ok(EXIT_OK)
                }
                Err(e) => {
                    writeln!(err, "hashing failed: {e}")?;
                    Ok(EXIT_FAILED)
                }
            }
        }
        Commands::Verify { username, password } => {
            // Every failure path prints the same line; which check failed is
            // only visible in debug logs.
            let config = match AccountConfig::resolve(cli.config.as_deref()) {
                Ok(config) => config,
                Err(e) => {
                    tracing::debug!(error = %e, "account configuration unavailable");
                    writeln!(err, "verification failed")?;
                    return Ok(EXIT_FAILED);
                }
            };
            let verifier = CredentialVerifier::new(config);
            match verifier.verify(&username, &password) {
                Ok(true) => {
                    writeln!(out, "verified")?;
                    Ok(EXIT_OK)
                }
                Ok(false) => {
                    writeln!(out, "not verified")?;
                    Ok(EXIT_REJECTED)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "verification aborted");
                    writeln!(err, "verification failed")?;
                    Ok(EXIT_FAILED)
                }
            }
        }
        Commands::ShowConfig => match AccountConfig::resolve(cli.config.as_deref()) {
            Ok(config) => match serde_json::to_string_pretty(&config) {
                Ok(json) => {
                    writeln!(out, "{json}")?;
                    Ok(EXIT_OK)
                }
                Err(e) => {
                    writeln!(err, "config render failed: {e}")?;
                    Ok(EXIT_FAILED)
                }
            },
            Err(e) => {
                writeln!(err, "config load failed: {e}")?;
                Ok(EXIT_FAILED)
            }
        },
        Commands::Sanitize { text } => {
            writeln!(out, "{}", escape_html(&text))?;
            Ok(EXIT_OK)
        }
        Commands::CheckAudioUrl { url } => {
            if is_valid_audio_url(&url) {
                writeln!(out, "valid")?;
                Ok(EXIT_OK)
            } else {
                writeln!(out, "invalid")?;
                Ok(EXIT_REJECTED)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::NamedTempFile;

    const ABHI_HEX: &str = "5478f05dfd941e6264072f3c34357a207bbf8685ae571b53c5a732cf8c762ec9";

    fn config_file(encoding: &str) -> NamedTempFile {
        let payload = json!({
            "accountName": "admin",
            "referenceFingerprint": ABHI_HEX,
            "encoding": encoding
        });
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), serde_json::to_vec(&payload).unwrap()).unwrap();
        file
    }

    fn run_args(args: &[&str]) -> (u8, String, String) {
        let cli = Cli::try_parse_from(args.iter().copied()).expect("arguments should parse");
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(cli, &mut out, &mut err).expect("in-memory output");
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn verify_accepts_configured_account() {
        let file = config_file("utf8");
        let path = file.path().to_str().unwrap();
        let (code, out, err) =
            run_args(&["invite-auth", "--config", path, "verify", "  admin ", "abhi"]);
        assert_eq!(code, EXIT_OK);
        assert_eq!(out, "verified\n");
        assert!(err.is_empty());
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let file = config_file("utf8");
        let path = file.path().to_str().unwrap();
        let (code, out, _) = run_args(&["invite-auth", "--config", path, "verify", "admin", "wrong"]);
        assert_eq!(code, EXIT_REJECTED);
        assert_eq!(out, "not verified\n");
    }

    #[test]
    fn verify_hides_unreadable_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.json");
        let (code, out, err) = run_args(&[
            "invite-auth",
            "verify",
            "admin",
            "abhi",
            "--config",
            missing.to_str().unwrap(),
        ]);
        assert_eq!(code, EXIT_FAILED);
        assert!(out.is_empty());
        assert_eq!(err, "verification failed\n");
    }

    #[test]
    fn verify_hides_decoding_failure() {
        let file = config_file("latin1");
        let path = file.path().to_str().unwrap();
        let (code, out, err) =
            run_args(&["invite-auth", "--config", path, "verify", "admin", "\u{20ac}uro"]);
        assert_eq!(code, EXIT_FAILED);
        assert!(out.is_empty());
        assert_eq!(err, "verification failed\n");
    }

    #[test]
    fn fingerprint_prints_hex_digest() {
        let (code, out, _) = run_args(&["invite-auth", "fingerprint", "abhi"]);
        assert_eq!(code, EXIT_OK);
        assert_eq!(out.trim_end(), ABHI_HEX);

        let (code, _, err) = run_args(&["invite-auth", "digest", "\u{20ac}", "--encoding", "latin1"]);
        assert_eq!(code, EXIT_FAILED);
        assert!(err.starts_with("hashing failed"));
    }

    #[test]
    fn audio_url_check_sets_exit_code() {
        let (code, out, _) = run_args(&["invite-auth", "check-audio-url", "https://example.com/a.mp3"]);
        assert_eq!((code, out.as_str()), (EXIT_OK, "valid\n"));
        let (code, _, _) = run_args(&["invite-auth", "check-audio-url", "javascript:alert(1)"]);
        assert_eq!(code, EXIT_REJECTED);
    }
}
