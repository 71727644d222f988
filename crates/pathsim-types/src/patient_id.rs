use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a patient within a pathway.
///
/// This is either a key of the pathway's persons map or an MRN of a patient that already
/// exists in the simulated hospital.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for PatientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
