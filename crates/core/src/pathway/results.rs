//! Orders and their results.

use crate::constants::{
    ABNORMAL_FLAG_DEFAULT, ABNORMAL_FLAG_HIGH, ABNORMAL_FLAG_LOW, ABNORMAL_FLAG_NORMAL, EMPTY,
    NUMERICAL_VALUE_TYPE, RANDOM, TEXTUAL_VALUE_TYPE,
};
use crate::order_profile::value::{parse_value, AbnormalFlag, RandomType, ValueRange};
use crate::{PathwayError, PathwayResult};
use chrono::Duration;
use pathsim_types::duration;
use serde::{Deserialize, Serialize};

/// Places an order. Produces the order message and, unless disabled, its acknowledgement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Order {
    /// Links the order with later results.
    pub order_id: String,
    /// `RANDOM` picks any known profile.
    pub order_profile: String,
    pub order_status: String,
    pub no_acknowledgement_message: bool,
}

/// A set of results for an order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Results {
    pub order_id: String,
    pub order_profile: String,
    /// Must be set together with `results_status`.
    pub order_status: String,
    pub results_status: String,
    /// Empty, `MIDNIGHT` or `EMPTY`.
    pub collected_datetime: String,
    pub received_in_lab_datetime: String,
    pub results: Vec<TestResult>,
    /// `R01` (default), `R03` or `R32`, case insensitive.
    pub trigger_event: String,
    pub expect_correction: bool,
}

impl Results {
    /// Results for a random order profile with random values.
    pub fn random_profile() -> Self {
        Self {
            order_profile: RANDOM.to_owned(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Numerical,
    Textual,
}

impl ValueType {
    /// The value type code reported with the result.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Numerical => NUMERICAL_VALUE_TYPE,
            Self::Textual => TEXTUAL_VALUE_TYPE,
        }
    }
}

/// A single test result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestResult {
    pub test_name: String,
    pub id: String,
    pub result_status: String,
    /// A number with an optional comparison prefix (`<0.5`, `>= 5.1`), free text, `EMPTY`,
    /// or one of the random keywords `NORMAL`, `ABNORMAL_HIGH`, `ABNORMAL_LOW`.
    pub value: String,
    pub unit: String,
    #[serde(default = "Duration::zero", with = "duration::required")]
    pub observation_datetime_offset: Duration,
    pub reference_range: String,
    /// `LOW`, `HIGH`, `NORMAL`, `DEFAULT` or empty.
    pub abnormal_flag: String,
    pub notes: Vec<String>,
}

fn empty_keyword_to_blank(s: &str) -> &str {
    if s == EMPTY {
        ""
    } else {
        s
    }
}

impl TestResult {
    /// The value, with `EMPTY` mapped to the empty string.
    pub fn value(&self) -> &str {
        empty_keyword_to_blank(&self.value)
    }

    /// The unit, with `EMPTY` mapped to the empty string.
    pub fn unit(&self) -> &str {
        empty_keyword_to_blank(&self.unit)
    }

    /// `None` for the `EMPTY` keyword.
    pub fn value_type(&self) -> Option<ValueType> {
        if self.value == EMPTY {
            return None;
        }
        if parse_value(&self.value).is_some() {
            Some(ValueType::Numerical)
        } else {
            Some(ValueType::Textual)
        }
    }

    pub fn is_value_random(&self) -> bool {
        RandomType::from_keyword(&self.value).is_some()
    }

    pub fn random_type(&self) -> PathwayResult<RandomType> {
        RandomType::from_keyword(&self.value)
            .ok_or_else(|| PathwayError::InvalidInput(format!("invalid random type: {}", self.value)))
    }

    /// Resolves the flag to report for this result.
    ///
    /// `NORMAL` becomes empty. `DEFAULT` is derived from the value against the custom reference
    /// range, or against `secondary` when the result has none.
    pub fn abnormal_flag(&self, secondary: Option<&ValueRange>) -> PathwayResult<AbnormalFlag> {
        match self.abnormal_flag.as_str() {
            "" | ABNORMAL_FLAG_NORMAL => Ok(AbnormalFlag::Empty),
            ABNORMAL_FLAG_LOW => Ok(AbnormalFlag::Low),
            ABNORMAL_FLAG_HIGH => Ok(AbnormalFlag::High),
            ABNORMAL_FLAG_DEFAULT => {
                let (_, value) = parse_value(self.value()).ok_or_else(|| {
                    PathwayError::InvalidInput(format!(
                        "cannot derive value from string {:?}",
                        self.value
                    ))
                })?;
                let custom;
                let range = if self.reference_range.is_empty() {
                    secondary
                } else {
                    custom = ValueRange::parse(&self.reference_range)?;
                    Some(&custom)
                };
                Ok(range.map_or(AbnormalFlag::Empty, |r| r.classify(value)))
            }
            other => Err(PathwayError::InvalidInput(format!(
                "invalid abnormal flag {other}"
            ))),
        }
    }
}
