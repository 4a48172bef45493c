//! Human-readable byte sizes (`100MB`) and durations (`1h30m`) used in configuration.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UnitError {
    #[error("empty value")]
    Empty,
    #[error("invalid number in '{0}'")]
    InvalidNumber(String),
    #[error("unknown unit '{unit}' in '{input}'")]
    UnknownUnit { input: String, unit: String },
    #[error("value '{0}' overflows")]
    Overflow(String),
}

/// Parse `nn`, `nnKB`, `nnMB` or `nnGB` (binary multiples, case-insensitive) into bytes.
pub fn parse_byte_size(input: &str) -> Result<u64, UnitError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UnitError::Empty);
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| UnitError::InvalidNumber(input.to_string()))?;

    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1 << 10,
        "MB" | "M" => 1 << 20,
        "GB" | "G" => 1 << 30,
        _ => {
            return Err(UnitError::UnknownUnit {
                input: input.to_string(),
                unit: unit.to_string(),
            });
        }
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| UnitError::Overflow(input.to_string()))
}

/// Parse a sequence of `<number><unit>` pairs such as `90s`, `24h`, `7d` or `1h30m`.
///
/// Supported units: `ms`, `s`, `m`, `h`, `d`. A bare number is taken as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, UnitError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UnitError::Empty);
    }
    if let Ok(secs) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| UnitError::UnknownUnit {
                input: input.to_string(),
                unit: String::new(),
            })?;
        if digits_end == 0 {
            return Err(UnitError::InvalidNumber(input.to_string()));
        }
        let value: u64 = rest[..digits_end]
            .parse()
            .map_err(|_| UnitError::InvalidNumber(input.to_string()))?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let secs_per_unit: u64 = match unit {
            "ms" => {
                total += Duration::from_millis(value);
                continue;
            }
            "s" => 1,
            "m" => 60,
            "h" => 3600,
            "d" => 86_400,
            other => {
                return Err(UnitError::UnknownUnit {
                    input: input.to_string(),
                    unit: other.to_string(),
                });
            }
        };
        let secs = value
            .checked_mul(secs_per_unit)
            .ok_or_else(|| UnitError::Overflow(input.to_string()))?;
        total = total
            .checked_add(Duration::from_secs(secs))
            .ok_or_else(|| UnitError::Overflow(input.to_string()))?;
    }

    Ok(total)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUnit {
    Number(u64),
    Text(String),
}

/// Serde adapter: a byte size given as an integer or as `"100MB"`.
pub fn deserialize_byte_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawUnit::deserialize(deserializer)? {
        RawUnit::Number(n) => Ok(n),
        RawUnit::Text(s) => parse_byte_size(&s).map_err(serde::de::Error::custom),
    }
}

/// Serde adapter: a duration given in seconds or as `"24h"`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawUnit::deserialize(deserializer)? {
        RawUnit::Number(n) => Ok(Duration::from_secs(n)),
        RawUnit::Text(s) => parse_duration(&s).map_err(serde::de::Error::custom),
    }
}
