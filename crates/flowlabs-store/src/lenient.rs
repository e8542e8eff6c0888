//! Tolerant deserializers for numeric columns.
//!
//! Rows written by older clients store deal values as text and scores as
//! floats. Both are coerced here instead of failing the whole row.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};

use crate::types::{sanitize_deal_value, MAX_SCORE};

/// Deserialize a deal value from a number, numeric string or null.
///
/// Anything unparseable, negative or non-finite becomes `0.0`.
///
/// # Errors
///
/// Only fails when the underlying deserializer fails.
pub fn deal_value<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(DealValueVisitor::unsigned())
}

/// Deserialize a score, clamping it into `0..=100`.
///
/// # Errors
///
/// Only fails when the underlying deserializer fails.
pub fn score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = deserializer.deserialize_any(DealValueVisitor::signed())?;
    Ok(clamp_score(raw))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_score(raw: f64) -> u8 {
    if raw.is_finite() {
        raw.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
    } else {
        0
    }
}

struct DealValueVisitor {
    allow_negative: bool,
}

impl DealValueVisitor {
    const fn unsigned() -> Self {
        Self {
            allow_negative: false,
        }
    }

    const fn signed() -> Self {
        Self {
            allow_negative: true,
        }
    }

    fn finish(&self, raw: f64) -> f64 {
        if self.allow_negative {
            raw
        } else {
            sanitize_deal_value(raw)
        }
    }
}

impl<'de> Visitor<'de> for DealValueVisitor {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a numeric string or null")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<f64, E> {
        Ok(0.0)
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(self.finish(v as f64))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(self.finish(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(self.finish(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        Ok(v.trim().parse::<f64>().map_or(0.0, |raw| self.finish(raw)))
    }

    fn visit_none<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}
