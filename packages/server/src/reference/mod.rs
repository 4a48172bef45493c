//! Short public references for uploaded items and short codes for URLs.
//!
//! Nothing here checks uniqueness; callers rely on the catalog's unique
//! constraints and retry on collision.

mod words;

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::utils::filename::split_extension;

pub use words::{ADJECTIVES, ANIMALS, COLORS};

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const RANDOM_LEN: usize = 8;

const VANITY_MIN_LEN: usize = 4;
const VANITY_MAX_LEN: usize = 30;

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("unknown reference style '{0}'")]
    InvalidStyle(String),
    #[error("system entropy unavailable: {0}")]
    Entropy(String),
    #[error("no unique reference after {0} attempts")]
    CollisionExhausted(usize),
}

/// How the public reference for an upload is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStyle {
    /// Sanitized original filename plus a random suffix.
    OriginalName,
    /// Nanoseconds since the Unix epoch.
    Timestamp,
    /// Eight random alphanumerics.
    #[default]
    Random,
    /// `YYYY-MM-DD-` plus a random suffix.
    Date,
    /// RFC 4122 version 4 UUID.
    Uuid,
    /// `adjective-color-animal`.
    Gfycat,
}

impl ReferenceStyle {
    pub const ALL: [ReferenceStyle; 6] = [
        ReferenceStyle::OriginalName,
        ReferenceStyle::Timestamp,
        ReferenceStyle::Random,
        ReferenceStyle::Date,
        ReferenceStyle::Uuid,
        ReferenceStyle::Gfycat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceStyle::OriginalName => "original_name",
            ReferenceStyle::Timestamp => "timestamp",
            ReferenceStyle::Random => "random",
            ReferenceStyle::Date => "date",
            ReferenceStyle::Uuid => "uuid",
            ReferenceStyle::Gfycat => "gfycat",
        }
    }
}

impl fmt::Display for ReferenceStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceStyle {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| ReferenceError::InvalidStyle(s.to_string()))
    }
}

pub(crate) fn random_bytes<const N: usize>() -> Result<[u8; N], ReferenceError> {
    let mut buf = [0u8; N];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| ReferenceError::Entropy(e.to_string()))?;
    Ok(buf)
}

fn random_hex8() -> Result<String, ReferenceError> {
    Ok(hex::encode(random_bytes::<4>()?))
}

/// `len` characters drawn uniformly from `alphabet` using the OS CSPRNG.
pub fn random_string(alphabet: &[u8], len: usize) -> Result<String, ReferenceError> {
    // Reject bytes above the largest multiple of the alphabet size to avoid modulo bias.
    let limit = 256 - (256 % alphabet.len());
    let mut out = String::with_capacity(len);
    while out.len() < len {
        for byte in random_bytes::<32>()? {
            if usize::from(byte) < limit {
                out.push(char::from(alphabet[usize::from(byte) % alphabet.len()]));
                if out.len() == len {
                    break;
                }
            }
        }
    }
    Ok(out)
}

/// Eight characters from `[A-Za-z0-9]`, also used for generated short codes.
pub fn random_code() -> Result<String, ReferenceError> {
    random_string(ALPHANUMERIC, RANDOM_LEN)
}

/// Map a 16-bit sample onto `0..bound`, or `None` if it falls in the biased tail.
fn index_from_sample(sample: u16, bound: usize) -> Option<usize> {
    const SPACE: usize = 1 << 16;
    let limit = SPACE - (SPACE % bound);
    let sample = usize::from(sample);
    (sample < limit).then(|| sample % bound)
}

fn pick<'a>(words: &[&'a str]) -> Result<&'a str, ReferenceError> {
    loop {
        let [a, b] = random_bytes::<2>()?;
        if let Some(index) = index_from_sample(u16::from_le_bytes([a, b]), words.len()) {
            return Ok(words[index]);
        }
    }
}

/// Lowercased stem with spaces turned into hyphens and anything outside
/// `[alphanumeric . _ -]` replaced by a hyphen.
fn sanitize_stem(stem: &str) -> String {
    let sanitized: String = stem
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

/// Generate a reference in `style`, without any extension.
pub fn generate(style: ReferenceStyle, original_name: &str) -> Result<String, ReferenceError> {
    match style {
        ReferenceStyle::OriginalName => {
            let (stem, _) = split_extension(original_name);
            Ok(format!("{}-{}", sanitize_stem(stem), random_hex8()?))
        }
        ReferenceStyle::Timestamp => {
            let nanos = Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
            Ok(nanos.to_string())
        }
        ReferenceStyle::Random => random_code(),
        ReferenceStyle::Date => Ok(format!(
            "{}-{}",
            Utc::now().format("%Y-%m-%d"),
            random_hex8()?
        )),
        ReferenceStyle::Uuid => Ok(uuid::Builder::from_random_bytes(random_bytes::<16>()?)
            .into_uuid()
            .to_string()),
        ReferenceStyle::Gfycat => Ok(format!(
            "{}-{}-{}",
            pick(ADJECTIVES)?,
            pick(COLORS)?,
            pick(ANIMALS)?
        )),
    }
}

/// Generate a reference for an upload and append the file's extension when the
/// reference does not already end with it.
pub fn generate_for_upload(
    style: ReferenceStyle,
    original_name: &str,
) -> Result<String, ReferenceError> {
    let reference = generate(style, original_name)?;
    Ok(match split_extension(original_name).1 {
        Some(ext) if !reference.ends_with(&ext) => reference + &ext,
        _ => reference,
    })
}

/// Check a user-chosen short code: 4 to 30 characters from `[A-Za-z0-9_-]`.
pub fn validate_vanity(code: &str) -> Result<(), String> {
    if code.len() < VANITY_MIN_LEN || code.len() > VANITY_MAX_LEN {
        return Err(format!(
            "custom code must be between {VANITY_MIN_LEN} and {VANITY_MAX_LEN} characters, got {}",
            code.chars().count()
        ));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(
            "custom code must contain only letters, digits, hyphens, or underscores".to_string(),
        );
    }
    Ok(())
}
