//! Custom serde deserializers for provider payloads
//!
//! Provider endpoints are treated as opaque, versionless JSON. The same field may arrive as a
//! number on one provider and as a string on another, so wire types use these lenient helpers.

use serde::{Deserialize, Deserializer, de};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Deserialize a flexible boolean value that can be:
/// - JSON boolean: `true`, `false`
/// - Integer: `0` (false), positive integers (true)
/// - String: `"0"`, `"1"`, `"false"`, `"true"` (case-insensitive)
pub fn deserialize_flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;

    match value {
        None => Ok(None),
        Some(Scalar::Bool(b)) => Ok(Some(b)),
        Some(Scalar::Int(i)) => Ok(Some(i > 0)),
        Some(Scalar::Float(f)) => Ok(Some(f > 0.0)),
        Some(Scalar::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(de::Error::custom(format!("invalid boolean string: {}", s))),
        },
    }
}

/// Deserialize an episode number sent as `13`, `13.0` or `"13"`.
pub fn deserialize_flexible_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Int(i) => u32::try_from(i).map_err(de::Error::custom),
        Scalar::Float(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        Scalar::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u32)
            .ok_or_else(|| de::Error::custom(format!("invalid episode number: {}", s))),
        _ => Err(de::Error::custom("expected an episode number")),
    }
}

/// Deserialize an identifier that some providers send as a number.
pub fn deserialize_flexible_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::String(s) => Ok(s),
        Scalar::Int(i) => Ok(i.to_string()),
        Scalar::Float(f) => Ok(f.to_string()),
        Scalar::Bool(_) => Err(de::Error::custom("expected a string or number identifier")),
    }
}
