use crate::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of decimal digits a percentage may carry.
pub const MAX_SIGNIFICANT_DIGITS: usize = 3;

/// Relative selection weight of a pathway, in percent.
///
/// Construction through [`Percentage::new`] rejects negative and non-finite values, but
/// deserialization keeps the raw number so that validation can report it with the pathway
/// it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(f64);

impl Percentage {
    pub const ONE: Self = Self(1.0);

    pub fn new(value: f64) -> TypesResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(TypesError::InvalidPercentage(value.to_string()));
        }
        Ok(Self(value))
    }

    /// The raw value as written.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// The value rounded to [`MAX_SIGNIFICANT_DIGITS`] decimals.
    pub fn rounded(&self) -> f64 {
        let scale = 10_f64.powi(MAX_SIGNIFICANT_DIGITS as i32);
        (self.0 * scale).round() / scale
    }

    /// Number of decimal digits in the shortest representation of the value.
    pub fn significant_digits(&self) -> usize {
        let repr = self.0.to_string();
        match repr.split_once('.') {
            Some((_, decimals)) => decimals.len(),
            None => 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_decimal_digits() {
        assert_eq!(Percentage(50.0).significant_digits(), 0);
        assert_eq!(Percentage(0.125).significant_digits(), 3);
        assert_eq!(Percentage(0.0001).significant_digits(), 4);
    }

    #[test]
    fn rounds_to_three_decimals() {
        assert_eq!(Percentage(33.33333).rounded(), 33.333);
        assert_eq!(Percentage(80.0).rounded(), 80.0);
    }

    #[test]
    fn new_rejects_negative() {
        let err = Percentage::new(-1.0).expect_err("negative percentage");
        assert!(matches!(err, TypesError::InvalidPercentage(_)));
    }
}
