//! Signed duration literals.
//!
//! Pathway files express every time offset as a literal made of one or more `<number><unit>`
//! groups, optionally preceded by a sign: `"90m"`, `"-3h"`, `"1h30m"`, `"1.5s"`. The units are
//! `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. The bare literal `"0"` is also accepted.
//!
//! The submodules are meant for `#[serde(with = "...")]` on `chrono::Duration` fields.

use crate::{TypesError, TypesResult};
use chrono::Duration;

const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_MINUTE: i128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i128 = 60 * NANOS_PER_MINUTE;

fn unit_nanos(unit: &str) -> Option<i128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

fn invalid(input: &str, reason: impl Into<String>) -> TypesError {
    TypesError::InvalidDuration {
        input: input.to_owned(),
        reason: reason.into(),
    }
}

/// Parses a duration literal.
///
/// # Errors
///
/// Returns [`TypesError::InvalidDuration`] when the literal is empty, has a group without a
/// number or unit, uses an unknown unit, or overflows the representable range.
pub fn parse(input: &str) -> TypesResult<Duration> {
    let trimmed = input.trim();
    let (negative, mut rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(invalid(input, "empty duration"));
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            frac_part = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid(input, "expected a number"));
        }

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];
        if unit.is_empty() {
            return Err(invalid(input, "missing unit"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| invalid(input, format!("unknown unit {unit:?}")))?;

        let whole: i128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| invalid(input, "number out of range"))?
        };
        let mut group = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid(input, "number out of range"))?;

        // Digits past nanosecond precision can't contribute.
        let frac_digits = &frac_part[..frac_part.len().min(18)];
        if !frac_digits.is_empty() {
            let numerator: i128 = frac_digits
                .parse()
                .map_err(|_| invalid(input, "number out of range"))?;
            let denominator = 10_i128.pow(frac_digits.len() as u32);
            group += numerator * scale / denominator;
        }

        total = total
            .checked_add(group)
            .ok_or_else(|| invalid(input, "number out of range"))?;
    }

    if negative {
        total = -total;
    }
    let nanos = i64::try_from(total).map_err(|_| invalid(input, "number out of range"))?;
    Ok(Duration::nanoseconds(nanos))
}

/// Formats a duration as the shortest literal [`parse`] reads back to the same value.
pub fn format(duration: &Duration) -> String {
    let Some(nanos) = duration.num_nanoseconds() else {
        // Beyond ±292 years; fall back to whole seconds.
        return format!("{}s", duration.num_seconds());
    };
    if nanos == 0 {
        return "0s".to_owned();
    }

    let mut out = String::new();
    if nanos < 0 {
        out.push('-');
    }
    let mut rest = (nanos as i128).abs();
    for (unit, scale) in [
        ("h", NANOS_PER_HOUR),
        ("m", NANOS_PER_MINUTE),
        ("s", NANOS_PER_SECOND),
        ("ms", NANOS_PER_MILLI),
        ("us", NANOS_PER_MICRO),
        ("ns", 1),
    ] {
        let amount = rest / scale;
        if amount > 0 {
            out.push_str(&amount.to_string());
            out.push_str(unit);
            rest -= amount * scale;
        }
    }
    out
}

/// Serde adapter for `chrono::Duration` fields.
pub mod required {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<chrono::Duration>` fields; pair it with `#[serde(default)]`.
pub mod option {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&super::format(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| super::parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
