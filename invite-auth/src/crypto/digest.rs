//! Self-contained SHA-256 (FIPS 180-4) used for the admin credential check.
//! The compression function lives in this file so the hashing that guards the
//! admin page can be audited without leaving the repository. Every addition is
//! modulo 2^32 (`wrapping_add`); digests silently diverge from the standard
//! otherwise.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::compare::constant_time_eq;

/// Size of a SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = 32;
/// Size of the lowercase hex rendering of a digest.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;
/// Largest message whose bit length still fits the 64-bit length field.
pub const MAX_MESSAGE_BYTES: u64 = (1 << 61) - 1;

const BLOCK_LEN: usize = 64;
const LENGTH_FIELD_LEN: usize = 8;

const INITIAL_STATE: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

const K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4,
    0xab1c5ed5, 0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe,
    0x9bdc06a7, 0xc19bf174, 0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f,
    0x4a7484aa, 0x5cb0a9dc, 0x76f988da, 0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7,
    0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967, 0x27b70a85, 0x2e1b2138, 0x4d2c6dfc,
    0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85, 0xa2bfe8a1, 0xa81a664b,
    0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070, 0x19a4c116,
    0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7,
    0xc67178f2,
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DigestError {
    #[error("decoding failed: {0}")]
    Decoding(String),
    #[error("input exceeds 2^61 - 1 bytes and cannot be represented in the length field")]
    InputTooLarge,
}

/// A 256-bit SHA-256 digest.
///
/// Rendered as 64 lowercase hex characters by `Display`, `to_hex`, and serde.
/// `PartialEq` is an ordinary comparison; use [`Digest::matches`] when one side
/// is a stored credential.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex fingerprint. Surrounding whitespace is trimmed and either
    /// case is accepted; anything other than exactly 64 hex digits is rejected.
    pub fn from_hex(text: &str) -> Result<Self, DigestError> {
        let normalized = text.trim().to_ascii_lowercase();
        if normalized.len() != DIGEST_HEX_LEN {
            return Err(DigestError::Decoding(format!(
                "expected {DIGEST_HEX_LEN} hex digits, found {}",
                normalized.len()
            )));
        }
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(&normalized, &mut bytes)
            .map_err(|e| DigestError::Decoding(format!("{e}")))?;
        Ok(Self(bytes))
    }

    /// Constant-time equality against a reference digest.
    pub fn matches(&self, reference: &Digest) -> bool {
        constant_time_eq(&self.0, &reference.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Digest::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// How password text becomes the bytes that are digested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// UTF-8 bytes of the string. Accepts every password.
    #[default]
    Utf8,
    /// One byte per character code. Characters above U+00FF are rejected.
    /// Matches fingerprints produced by the browser login page.
    Latin1,
}

impl TextEncoding {
    /// Encodes `text` into a buffer that is wiped when dropped.
    pub fn encode(&self, text: &str) -> Result<Zeroizing<Vec<u8>>, DigestError> {
        match self {
            TextEncoding::Utf8 => Ok(Zeroizing::new(text.as_bytes().to_vec())),
            TextEncoding::Latin1 => {
                let mut bytes = Zeroizing::new(Vec::with_capacity(text.len()));
                for (position, ch) in text.chars().enumerate() {
                    let code = u32::from(ch);
                    if code > 0xff {
                        // The character itself is never echoed; it may be part of a password.
                        return Err(DigestError::Decoding(format!(
                            "character {position} is outside the single-byte range"
                        )));
                    }
                    bytes.push(code as u8);
                }
                Ok(bytes)
            }
        }
    }
}

/// Incremental SHA-256 hasher.
///
/// Buffered message bytes and chaining state are zeroized on drop.
pub struct Sha256 {
    state: [u32; 8],
    buffer: [u8; BLOCK_LEN],
    buffer_len: usize,
    total_len: u64,
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha256 {
    pub fn new() -> Self {
        Self {
            state: INITIAL_STATE,
            buffer: [0u8; BLOCK_LEN],
            buffer_len: 0,
            total_len: 0,
        }
    }

    /// Absorbs `data`. Fails without consuming anything if the running length
    /// would no longer fit the padding's 64-bit bit-length field.
    pub fn update(&mut self, data: &[u8]) -> Result<(), DigestError> {
        let total_len = u64::try_from(data.len())
            .ok()
            .and_then(|len| self.total_len.checked_add(len))
            .filter(|len| *len <= MAX_MESSAGE_BYTES)
            .ok_or(DigestError::InputTooLarge)?;
        self.total_len = total_len;

        let mut input = data;
        if self.buffer_len > 0 {
            let take = (BLOCK_LEN - self.buffer_len).min(input.len());
            self.buffer[self.buffer_len..self.buffer_len + take].copy_from_slice(&input[..take]);
            self.buffer_len += take;
            input = &input[take..];
            if self.buffer_len < BLOCK_LEN {
                return Ok(());
            }
            compress(&mut self.state, &self.buffer);
            self.buffer_len = 0;
        }

        let mut blocks = input.chunks_exact(BLOCK_LEN);
        for block in &mut blocks {
            compress(&mut self.state, block);
        }
        let rest = blocks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffer_len = rest.len();
        Ok(())
    }

    pub fn finalize(mut self) -> Digest {
        // total_len <= MAX_MESSAGE_BYTES, so the shift cannot overflow.
        let bit_len = self.total_len << 3;

        // Append the "1" bit, then zeros until 8 bytes remain in the block.
        self.buffer[self.buffer_len] = 0x80;
        self.buffer_len += 1;
        if self.buffer_len > BLOCK_LEN - LENGTH_FIELD_LEN {
            self.buffer[self.buffer_len..].fill(0);
            compress(&mut self.state, &self.buffer);
            self.buffer_len = 0;
        }
        self.buffer[self.buffer_len..BLOCK_LEN - LENGTH_FIELD_LEN].fill(0);
        self.buffer[BLOCK_LEN - LENGTH_FIELD_LEN..].copy_from_slice(&bit_len.to_be_bytes());
        compress(&mut self.state, &self.buffer);

        let mut out = [0u8; DIGEST_LEN];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.state.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Digest(out)
    }
}

impl Drop for Sha256 {
    fn drop(&mut self) {
        self.buffer.zeroize();
        self.state.zeroize();
    }
}

/// Digests a complete message.
pub fn sha256(data: &[u8]) -> Result<Digest, DigestError> {
    let mut hasher = Sha256::new();
    hasher.update(data)?;
    Ok(hasher.finalize())
}

/// Returns the lowercase hexadecimal representation of a SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> Result<String, DigestError> {
    sha256(data).map(|digest| digest.to_hex())
}

/// Encodes `text` with `encoding` and digests the resulting bytes.
pub fn digest_text(text: &str, encoding: TextEncoding) -> Result<Digest, DigestError> {
    let bytes = encoding.encode(text)?;
    sha256(&bytes)
}

/// One 512-bit block of the FIPS 180-4 compression function. `block` must be
/// exactly 64 bytes.
fn compress(state: &mut [u32; 8], block: &[u8]) {
    debug_assert_eq!(block.len(), BLOCK_LEN);

    let mut w = [0u32; 64];
    for t in 0..16 {
        let i = t * 4;
        w[t] = ((block[i] as u32) << 24)
            | ((block[i + 1] as u32) << 16)
            | ((block[i + 2] as u32) << 8)
            | (block[i + 3] as u32);
    }
    for t in 16..64 {
        w[t] = w[t - 16]
            .wrapping_add(small_sigma0(w[t - 15]))
            .wrapping_add(w[t - 7])
            .wrapping_add(small_sigma1(w[t - 2]));
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for t in 0..64 {
        let temp1 = h
            .wrapping_add(big_sigma1(e))
            .wrapping_add(ch(e, f, g))
            .wrapping_add(K[t])
            .wrapping_add(w[t]);
        let temp2 = big_sigma0(a).wrapping_add(maj(a, b, c));
        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(temp1);
        d = c;
        c = b;
        b = a;
        a = temp1.wrapping_add(temp2);
    }

    for (word, value) in state.iter_mut().zip([a, b, c, d, e, f, g, h]) {
        *word = word.wrapping_add(value);
    }
    w.zeroize();
}

#[inline(always)]
fn ch(x: u32, y: u32, z: u32) -> u32 {
    (x & y) ^ (!x & z)
}

#[inline(always)]
fn maj(x: u32, y: u32, z: u32) -> u32 {
    (x & y) ^ (x & z) ^ (y & z)
}

#[inline(always)]
fn big_sigma0(x: u32) -> u32 {
    x.rotate_right(2) ^ x.rotate_right(13) ^ x.rotate_right(22)
}

#[inline(always)]
fn big_sigma1(x: u32) -> u32 {
    x.rotate_right(6) ^ x.rotate_right(11) ^ x.rotate_right(25)
}

#[inline(always)]
fn small_sigma0(x: u32) -> u32 {
    x.rotate_right(7) ^ x.rotate_right(18) ^ (x >> 3)
}

#[inline(always)]
fn small_sigma1(x: u32) -> u32 {
    x.rotate_right(17) ^ x.rotate_right(19) ^ (x >> 10)
}
