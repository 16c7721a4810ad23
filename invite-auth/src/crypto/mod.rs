//! Cryptography used by the admin login: the SHA-256 engine and constant-time
//! comparison. Both are small enough to audit in-repo.

pub mod compare;
pub mod digest;

pub use digest::{digest_text, sha256, sha256_hex, Digest, DigestError, Sha256, TextEncoding};
