//! Order profiles: the lab orders the hospital knows about and the tests each one contains.
//!
//! Profiles are loaded from a YAML map of profile name to definition:
//!
//! ```yaml
//! UREA AND ELECTROLYTES:
//!   universal_service_id: lpdc-3969
//!   test_types:
//!     Creatinine:
//!       id: lpdc-2163
//!       value_type: NM
//!       unit: UMOLL
//!       ref_range: 49 - 92
//! ```

pub mod value;

use crate::constants::{NUMERICAL_VALUE_TYPE, RANDOM};
use crate::{PathwayError, PathwayResult};
use rand::Rng;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use value::{parse_value, AbnormalFlag, RandomType, ValueRange};

/// Lookup of order profiles by name.
pub trait OrderProfileRegistry: Send + Sync {
    fn get(&self, name: &str) -> Option<&OrderProfile>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderProfile {
    pub name: String,
    pub universal_service_id: String,
    pub coding_system: String,
    pub test_types: BTreeMap<String, TestType>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TestType {
    pub name: String,
    pub id: String,
    pub coding_system: String,
    pub value_type: String,
    pub unit: String,
    pub ref_range: String,
    /// Fixed value used instead of a generated one.
    default_value: Option<String>,
    is_numerical: bool,
    value_prefix: String,
    value_range: Option<ValueRange>,
}

impl TestType {
    fn from_wire(name: &str, wire: TestTypeWire, profile_coding_system: &str) -> Self {
        let coding_system = if wire.coding_system.is_empty() {
            profile_coding_system.to_owned()
        } else {
            wire.coding_system
        };
        let mut test_type = Self {
            name: name.to_owned(),
            id: wire.id,
            coding_system,
            value_type: wire.value_type,
            unit: wire.unit,
            ref_range: wire.ref_range,
            default_value: Some(wire.value.clone()),
            is_numerical: false,
            value_prefix: String::new(),
            value_range: None,
        };

        if test_type.value_type != NUMERICAL_VALUE_TYPE {
            return test_type;
        }
        // A numerical test whose sample value isn't a number is reported as is.
        let Some((prefix, _)) = parse_value(&wire.value) else {
            return test_type;
        };
        test_type.is_numerical = true;
        if let Ok(range) = ValueRange::parse(&test_type.ref_range) {
            test_type.default_value = None;
            test_type.value_prefix = prefix;
            test_type.value_range = Some(range);
        }
        test_type
    }

    /// The parsed reference range, when it could be parsed.
    pub fn value_range(&self) -> Option<&ValueRange> {
        self.value_range.as_ref()
    }

    /// A value of the requested kind, together with the flag it should be reported with.
    pub fn randomised_value_with_flag<R: Rng + ?Sized>(
        &self,
        kind: RandomType,
        rng: &mut R,
    ) -> PathwayResult<(String, AbnormalFlag)> {
        let flag = AbnormalFlag::from(kind);
        if let Some(default) = &self.default_value {
            if flag == AbnormalFlag::Empty || !self.is_numerical {
                return Ok((default.clone(), flag));
            }
        }
        let range = self.value_range.ok_or_else(|| {
            PathwayError::ValueGeneration(format!(
                "test type {} has no usable reference range",
                self.name
            ))
        })?;
        let value = range.random(kind, rng)?;
        Ok((format!("{}{value}", self.value_prefix), flag))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TestTypeWire {
    id: String,
    coding_system: String,
    value_type: String,
    value: String,
    unit: String,
    ref_range: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OrderProfileWire {
    universal_service_id: String,
    coding_system: String,
    test_types: BTreeMap<String, TestTypeWire>,
}

/// The order profiles known to the hospital.
#[derive(Clone, Debug, Default)]
pub struct OrderProfiles {
    profiles: BTreeMap<String, OrderProfile>,
}

impl OrderProfiles {
    pub fn new(profiles: BTreeMap<String, OrderProfile>) -> Self {
        Self { profiles }
    }

    /// Loads the profiles from a YAML file.
    ///
    /// `coding_system` is used for profiles and test types that don't specify their own.
    pub fn load(path: &Path, coding_system: &str) -> PathwayResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PathwayError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let profiles = Self::from_yaml(&text, coding_system)?;
        tracing::info!(file = %path.display(), count = profiles.len(), "Loaded order profiles");
        Ok(profiles)
    }

    pub fn from_yaml(yaml_text: &str, coding_system: &str) -> PathwayResult<Self> {
        let wire: BTreeMap<String, OrderProfileWire> = crate::parser::decode_yaml(yaml_text, "Order profiles")?;
        let profiles = wire
            .into_iter()
            .map(|(name, op)| {
                let profile_cs = if op.coding_system.is_empty() {
                    coding_system.to_owned()
                } else {
                    op.coding_system
                };
                let test_types = op
                    .test_types
                    .into_iter()
                    .map(|(tt_name, tt)| {
                        let test_type = TestType::from_wire(&tt_name, tt, &profile_cs);
                        (tt_name, test_type)
                    })
                    .collect();
                let profile = OrderProfile {
                    name: name.clone(),
                    universal_service_id: op.universal_service_id,
                    coding_system: profile_cs,
                    test_types,
                };
                (name, profile)
            })
            .collect();
        Ok(Self { profiles })
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Resolves a profile name, picking any profile for `RANDOM`.
    pub fn pick<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> Option<&OrderProfile> {
        if name == RANDOM {
            if self.profiles.is_empty() {
                return None;
            }
            let i = rng.gen_range(0..self.profiles.len());
            return self.profiles.values().nth(i);
        }
        self.profiles.get(name)
    }
}

impl OrderProfileRegistry for OrderProfiles {
    fn get(&self, name: &str) -> Option<&OrderProfile> {
        self.profiles.get(name)
    }
}
