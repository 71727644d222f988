//! Payloads of the administrative and document steps.

use super::person::Allergy;
use super::results::Results;
use super::time::{DateTimeSpec, Interval};
use chrono::{DateTime, Duration, Utc};
use pathsim_types::{duration, PatientId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Admission, discharge and transfer
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Admission {
    /// Point of care; must be a known location.
    pub loc: String,
    pub bed: String,
    pub allergies: Vec<Allergy>,
    pub admit_reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Transfer {
    pub loc: String,
    pub bed: String,
}

/// A transfer that will be cancelled later; the previous bed stays occupied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferInError {
    pub loc: String,
    pub bed: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Discharge {
    pub note: String,
    pub allergies: Vec<Allergy>,
    pub discharge_time: Option<DateTime<Utc>>,
}

/// A discharge that will be cancelled later; the bed stays occupied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DischargeInError {
    pub note: String,
    pub allergies: Vec<Allergy>,
    pub discharge_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Registration {
    pub patient_class: String,
    pub allergies: Vec<Allergy>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreAdmission {
    pub loc: String,
    pub bed: String,
    #[serde(with = "duration::option")]
    pub expected_admission_time_from_now: Option<Duration>,
    pub allergies: Vec<Allergy>,
}

/// Only allowed as the first step of a pathway.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AddPerson {
    pub allergies: Vec<Allergy>,
}

// ============================================================================
// Pending events
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PendingAdmission {
    pub loc: String,
    pub bed: String,
    #[serde(with = "duration::option")]
    pub expected_admission_time_from_now: Option<Duration>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PendingDischarge {
    #[serde(with = "duration::option")]
    pub expected_discharge_time_from_now: Option<Duration>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PendingTransfer {
    pub loc: String,
    pub bed: String,
    #[serde(with = "duration::option")]
    pub expected_transfer_time_from_now: Option<Duration>,
}

// ============================================================================
// Payload-free events
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelVisit {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelTransfer {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelDischarge {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelPendingAdmission {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelPendingDischarge {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelPendingTransfer {}

/// Deletes the most recently discharged or cancelled visit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteVisit {}

/// Triggers generation of resources from the patient's record at that point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateResources {}

// ============================================================================
// Tracking
// ============================================================================

/// Patient leaves for another location without a formal transfer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackDeparture {
    /// `track`, `transit` or `temporary`.
    pub mode: String,
    pub destination_loc: String,
    /// Not allowed in `temporary` mode.
    pub destination_bed: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackArrival {
    pub mode: String,
    pub loc: String,
    /// Not allowed in `transit` mode.
    pub bed: String,
    /// Only allowed in `temporary` mode; the location is then not looked up.
    pub is_temporary: bool,
}

// ============================================================================
// Patients
// ============================================================================

/// Switches the patient the following steps apply to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsePatient {
    pub patient: PatientId,
}

/// Merges the children into the parent patient.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Merge {
    pub force_a40: bool,
    pub children: Vec<PatientId>,
    pub parent: PatientId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BedSwap {
    pub patient_1: PatientId,
    pub patient_2: PatientId,
}

// ============================================================================
// Generated results
// ============================================================================

/// Expands into `Results` steps at `from`, `from + every`, ... up to and including `to`.
///
/// Offsets are relative to the start of the pathway; negative ones land in the history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoGenerate {
    /// Template of the generated results; a random order profile when unset.
    pub result: Option<Results>,
    #[serde(with = "duration::option")]
    pub from: Option<Duration>,
    #[serde(with = "duration::option")]
    pub to: Option<Duration>,
    #[serde(with = "duration::option")]
    pub every: Option<Duration>,
}

impl AutoGenerate {
    /// The results each generated step carries.
    pub fn effective_result(&self) -> Results {
        self.result.clone().unwrap_or_else(Results::random_profile)
    }
}

// ============================================================================
// Documents and free-form messages
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClinicalNote {
    pub datetime: Option<DateTimeSpec>,
    pub document_type: String,
    /// Required; must be `txt` when `document_content` is given.
    pub content_type: String,
    pub document_id: String,
    pub document_content: String,
    pub document_title: String,
}

/// Sends a predefined message whose name matches `regex`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HardcodedMessage {
    pub regex: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Document {
    pub document_type: String,
    pub completion_status: String,
    /// `None` lets the generator pick a value; an empty string is kept as is.
    pub observation_identifier_id: Option<String>,
    pub observation_identifier_text: Option<String>,
    pub observation_identifier_coding_system: Option<String>,
    /// Required to update an existing document.
    pub id: String,
    /// `append`, `overwrite` or empty.
    pub update_type: String,
    pub ending_content_lines: Vec<String>,
    pub header_content_lines: Vec<String>,
    pub num_random_content_lines: Option<Interval>,
}

/// A step with no default behaviour, handled by custom processing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Generic {
    pub name: String,
}
