//! Reference ranges and random result values.

use crate::constants::{
    ABNORMAL_FLAG_HIGH, ABNORMAL_FLAG_LOW, ABNORMAL_HIGH, ABNORMAL_LOW, NORMAL_VALUE,
    VALUE_DECIMALS, VALUE_GENERATION_ATTEMPTS,
};
use crate::{PathwayError, PathwayResult};
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

// Patterns are literals; compiling them can't fail.
static VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([>|<]?=?) *(-?[0-9|/.]+)$").expect("literal regex"));

/// `from-to`, `from - to`, `[ from - to ]` and `from-to^from^to`.
static FROM_TO_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"^\[? ?(-?[0-9|/.]+) ?- ?(-?[0-9|/.]+) ?\]?$").expect("literal regex"),
        Regex::new(r"^(-?[0-9|/.]+)-(-?[0-9|/.]+)(\^-?[0-9|/.]+)+$").expect("literal regex"),
    ]
});

/// `<to^^<to`, `<=to^<=to`, `[ < to ]`, `[<=to]`.
static LESS_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"^<=?(-?[0-9|/.]+)\^+<=?-?[0-9|/.]+$").expect("literal regex"),
        Regex::new(r"^\[? ?<=? ?(-?[0-9|/.]+) ?\]?$").expect("literal regex"),
    ]
});

/// `>from^^>from`, `>=from^>=from`, `[ > from ]`, `[>=from]`.
static GREATER_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"^>=?(-?[0-9|/.]+)\^+>=?-?[0-9|/.]+$").expect("literal regex"),
        Regex::new(r"^\[? ?>=? ?(-?[0-9|/.]+) ?\]?$").expect("literal regex"),
    ]
});

/// Parses `value`, `>value`, `>=value`, `<value` or `<=value` into its prefix and number.
pub fn parse_value(s: &str) -> Option<(String, f64)> {
    let caps = VALUE_RE.captures(s)?;
    let number = caps[2].trim().parse::<f64>().ok()?;
    Some((caps[1].to_owned(), number))
}

fn parse_bound(s: &str, what: &str) -> PathwayResult<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| PathwayError::InvalidRange(format!("failed to parse {what} value: {s}")))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RandomType {
    Normal,
    AbnormalHigh,
    AbnormalLow,
}

impl RandomType {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            NORMAL_VALUE => Some(Self::Normal),
            ABNORMAL_HIGH => Some(Self::AbnormalHigh),
            ABNORMAL_LOW => Some(Self::AbnormalLow),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Normal => NORMAL_VALUE,
            Self::AbnormalHigh => ABNORMAL_HIGH,
            Self::AbnormalLow => ABNORMAL_LOW,
        }
    }
}

/// The flag reported on a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbnormalFlag {
    Empty,
    Low,
    High,
}

impl AbnormalFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::Low => ABNORMAL_FLAG_LOW,
            Self::High => ABNORMAL_FLAG_HIGH,
        }
    }
}

impl From<RandomType> for AbnormalFlag {
    fn from(value: RandomType) -> Self {
        match value {
            RandomType::Normal => Self::Empty,
            RandomType::AbnormalHigh => Self::High,
            RandomType::AbnormalLow => Self::Low,
        }
    }
}

/// A normal range with optional open ends.
///
/// Both ends are treated as exclusive when generating values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange {
    from: Option<f64>,
    to: Option<f64>,
}

impl ValueRange {
    /// Parses a reference range string.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::InvalidRange`] if the string matches no known form, a bound is
    /// not a number, or `from >= to`.
    pub fn parse(s: &str) -> PathwayResult<Self> {
        if let Some(caps) = FROM_TO_RES.iter().find_map(|re| re.captures(s)) {
            let from = parse_bound(&caps[1], "from")?;
            let to = parse_bound(&caps[2], "to")?;
            if from >= to {
                return Err(PathwayError::InvalidRange(format!(
                    "start of the range [{from}] is greater than end of the range [{to}]"
                )));
            }
            return Ok(Self {
                from: Some(from),
                to: Some(to),
            });
        }
        if let Some(caps) = LESS_RES.iter().find_map(|re| re.captures(s)) {
            return Ok(Self {
                from: None,
                to: Some(parse_bound(&caps[1], "to")?),
            });
        }
        if let Some(caps) = GREATER_RES.iter().find_map(|re| re.captures(s)) {
            return Ok(Self {
                from: Some(parse_bound(&caps[1], "from")?),
                to: None,
            });
        }
        Err(PathwayError::InvalidRange(format!(
            "failed to parse the range: {s}"
        )))
    }

    pub fn is_high(&self, v: f64) -> bool {
        self.to.is_some_and(|to| v > to)
    }

    pub fn is_low(&self, v: f64) -> bool {
        self.from.is_some_and(|from| v < from)
    }

    pub fn is_normal(&self, v: f64) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => v >= from && v <= to,
            (Some(from), None) => v >= from,
            (None, Some(to)) => v <= to,
            (None, None) => false,
        }
    }

    pub fn classify(&self, v: f64) -> AbnormalFlag {
        if self.is_low(v) {
            AbnormalFlag::Low
        } else if self.is_high(v) {
            AbnormalFlag::High
        } else {
            AbnormalFlag::Empty
        }
    }

    pub fn random<R: Rng + ?Sized>(&self, kind: RandomType, rng: &mut R) -> PathwayResult<String> {
        match kind {
            RandomType::Normal => self.normal(rng),
            RandomType::AbnormalHigh => self.abnormal_high(rng),
            RandomType::AbnormalLow => self.abnormal_low(rng),
        }
    }

    /// A value strictly inside the range.
    ///
    /// Open ends are closed with an arbitrary order of magnitude: `(from, 10 * from)` for a
    /// positive start, `(from, 0)` for a negative one and `(0, 10)` for zero; mirrored for
    /// an open start.
    pub fn normal<R: Rng + ?Sized>(&self, rng: &mut R) -> PathwayResult<String> {
        let (from, to) = match (self.from, self.to) {
            (None, None) => {
                return Err(PathwayError::ValueGeneration(
                    "cannot generate normal value if both start and end of the range are open"
                        .into(),
                ))
            }
            (Some(from), Some(to)) => (from, to),
            (None, Some(to)) => {
                let from = if to == 0.0 {
                    -10.0
                } else if to > 0.0 {
                    0.0
                } else {
                    to * 10.0
                };
                (from, to)
            }
            (Some(from), None) => {
                let to = if from == 0.0 {
                    10.0
                } else if from > 0.0 {
                    from * 10.0
                } else {
                    0.0
                };
                (from, to)
            }
        };
        random_from_range(from, to, rng)
    }

    /// A value below the range; needs a non-zero start.
    pub fn abnormal_low<R: Rng + ?Sized>(&self, rng: &mut R) -> PathwayResult<String> {
        let from = match self.from {
            Some(from) if from != 0.0 => from,
            _ => {
                return Err(PathwayError::ValueGeneration(
                    "cannot generate abnormal low value for open or zero start range".into(),
                ))
            }
        };
        if from > 0.0 {
            random_from_range(0.0, from, rng)
        } else {
            random_from_range(10.0 * from, from, rng)
        }
    }

    /// A value above the range; needs a non-zero end.
    pub fn abnormal_high<R: Rng + ?Sized>(&self, rng: &mut R) -> PathwayResult<String> {
        let to = match self.to {
            Some(to) if to != 0.0 => to,
            _ => {
                return Err(PathwayError::ValueGeneration(
                    "cannot generate abnormal high value for open or zero end range".into(),
                ))
            }
        };
        if to > 0.0 {
            random_from_range(to, 10.0 * to, rng)
        } else {
            random_from_range(to, 0.0, rng)
        }
    }
}

/// Draws a value in `(from, to)` that stays strictly inside the bounds once formatted.
fn random_from_range<R: Rng + ?Sized>(from: f64, to: f64, rng: &mut R) -> PathwayResult<String> {
    for _ in 0..VALUE_GENERATION_ATTEMPTS {
        let f = rng.gen::<f64>() * (to - from) + from;
        let formatted = format!("{f:.prec$}", prec = VALUE_DECIMALS);
        if let Ok(after) = formatted.parse::<f64>() {
            if after > from && after < to {
                return Ok(formatted);
            }
        }
    }
    tracing::error!(from, to, "failed to generate a value from range");
    Err(PathwayError::ValueGeneration(format!(
        "failed to generate a value in ({from}, {to}) after {VALUE_GENERATION_ATTEMPTS} attempts"
    )))
}
