//! A pathway step: exactly one event kind plus optional parameters.
//!
//! On the wire a step is a map with a single event key (`admission`, `delay`, ...) and an
//! optional `parameters` sibling. Decoding rejects maps with zero or several event keys, so a
//! [`Step`] always has a well-defined [`StepType`].

use super::events::*;
use super::person::UpdatePerson;
use super::results::{Order, Results};
use super::time::Delay;
use chrono::{DateTime, Duration, Utc};
use pathsim_types::duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Extra settings that may accompany any step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// Delay between the event and the sending of its message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_message: Option<Delay>,
    /// Offset from now at which a historical event happened. Must be negative, and is only
    /// allowed in historical steps.
    #[serde(with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub time_from_now: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeathStatus>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sending_application: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub receiving_application: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sending_facility: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub receiving_facility: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeathStatus {
    pub death_indicator: String,
    /// At most one of `time_of_death` and `time_since_death` may be set.
    pub time_of_death: Option<DateTime<Utc>>,
    #[serde(with = "duration::option")]
    pub time_since_death: Option<Duration>,
}

/// A step map with no or several event keys.
#[derive(Debug, thiserror::Error)]
#[error("cannot detect step type, exactly one event must be set; found {keys:?}")]
pub struct StepShapeError {
    pub keys: Vec<&'static str>,
}

macro_rules! step_kinds {
    ($( $variant:ident($payload:ty) => $key:ident ),+ $(,)?) => {
        /// The event a step performs.
        #[derive(Clone, Debug, PartialEq)]
        pub enum StepKind {
            $( $variant($payload), )+
        }

        /// Discriminant of [`StepKind`].
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum StepType {
            $( $variant, )+
        }

        impl StepType {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($variant), )+
                }
            }

            /// The key naming this event in pathway files.
            pub fn key(&self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($key), )+
                }
            }
        }

        impl StepKind {
            pub fn step_type(&self) -> StepType {
                match self {
                    $( Self::$variant(_) => StepType::$variant, )+
                }
            }
        }

        #[derive(Default, Serialize, Deserialize)]
        #[serde(default, deny_unknown_fields)]
        struct StepWire {
            $(
                #[serde(skip_serializing_if = "Option::is_none")]
                $key: Option<$payload>,
            )+
            #[serde(skip_serializing_if = "Option::is_none")]
            parameters: Option<Parameters>,
        }

        impl TryFrom<StepWire> for Step {
            type Error = StepShapeError;

            fn try_from(wire: StepWire) -> Result<Self, Self::Error> {
                let mut found: Vec<(&'static str, StepKind)> = Vec::new();
                $(
                    if let Some(payload) = wire.$key {
                        found.push((stringify!($key), StepKind::$variant(payload)));
                    }
                )+
                if found.len() != 1 {
                    return Err(StepShapeError {
                        keys: found.iter().map(|(key, _)| *key).collect(),
                    });
                }
                let (_, kind) = found.remove(0);
                Ok(Step {
                    kind,
                    parameters: wire.parameters,
                })
            }
        }

        impl From<Step> for StepWire {
            fn from(step: Step) -> Self {
                let mut wire = StepWire {
                    parameters: step.parameters,
                    ..Default::default()
                };
                match step.kind {
                    $( StepKind::$variant(payload) => wire.$key = Some(payload), )+
                }
                wire
            }
        }
    };
}

step_kinds! {
    Delay(Delay) => delay,
    Admission(Admission) => admission,
    Order(Order) => order,
    Results(Results) => result,
    Discharge(Discharge) => discharge,
    Registration(Registration) => registration,
    PreAdmission(PreAdmission) => pre_admission,
    Transfer(Transfer) => transfer,
    Merge(Merge) => merge,
    BedSwap(BedSwap) => bed_swap,
    TransferInError(TransferInError) => transfer_in_error,
    DischargeInError(DischargeInError) => discharge_in_error,
    CancelVisit(CancelVisit) => cancel_visit,
    CancelTransfer(CancelTransfer) => cancel_transfer,
    CancelDischarge(CancelDischarge) => cancel_discharge,
    AddPerson(AddPerson) => add_person,
    UpdatePerson(UpdatePerson) => update_person,
    PendingAdmission(PendingAdmission) => pending_admission,
    PendingDischarge(PendingDischarge) => pending_discharge,
    PendingTransfer(PendingTransfer) => pending_transfer,
    CancelPendingAdmission(CancelPendingAdmission) => cancel_pending_admission,
    CancelPendingDischarge(CancelPendingDischarge) => cancel_pending_discharge,
    CancelPendingTransfer(CancelPendingTransfer) => cancel_pending_transfer,
    DeleteVisit(DeleteVisit) => delete_visit,
    TrackDeparture(TrackDeparture) => track_departure,
    TrackArrival(TrackArrival) => track_arrival,
    UsePatient(UsePatient) => use_patient,
    AutoGenerate(AutoGenerate) => autogenerate,
    ClinicalNote(ClinicalNote) => clinical_note,
    HardcodedMessage(HardcodedMessage) => hardcoded_message,
    Document(Document) => document,
    Generic(Generic) => generic,
    GenerateResources(GenerateResources) => generate_resources,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event of a pathway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StepWire", into = "StepWire")]
pub struct Step {
    pub kind: StepKind,
    pub parameters: Option<Parameters>,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn delay(delay: Delay) -> Self {
        Self::new(StepKind::Delay(delay))
    }

    pub fn step_type(&self) -> StepType {
        self.kind.step_type()
    }

    pub fn as_delay(&self) -> Option<&Delay> {
        match &self.kind {
            StepKind::Delay(d) => Some(d),
            _ => None,
        }
    }

    /// The step's `time_from_now` parameter, if any.
    pub fn time_from_now(&self) -> Option<Duration> {
        self.parameters.as_ref().and_then(|p| p.time_from_now)
    }

    /// Messages this step produces: none for delays and patient switches, two for an
    /// acknowledged order, one otherwise.
    pub fn message_count(&self) -> usize {
        match &self.kind {
            StepKind::UsePatient(_) | StepKind::Delay(_) => 0,
            StepKind::Order(order) if order.no_acknowledgement_message => 1,
            StepKind::Order(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_event_with_parameters() {
        let yaml = r#"
admission:
  loc: Renal
parameters:
  time_from_now: -2h
"#;
        let step: Step = serde_yaml::from_str(yaml).expect("valid step");
        assert_eq!(step.step_type(), StepType::Admission);
        assert_eq!(step.time_from_now(), Some(Duration::hours(-2)));
        assert_eq!(step.step_type().key(), "admission");
    }

    #[test]
    fn rejects_step_without_event() {
        let err = serde_yaml::from_str::<Step>("parameters:\n  sending_facility: X\n")
            .expect_err("no event");
        assert!(err.to_string().contains("exactly one event"));
    }

    #[test]
    fn rejects_step_with_two_events() {
        let err = serde_yaml::from_str::<Step>("cancel_visit: {}\ndelete_visit: {}\n")
            .expect_err("two events");
        let msg = err.to_string();
        assert!(msg.contains("cancel_visit") && msg.contains("delete_visit"), "{msg}");
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = serde_yaml::from_str::<Step>("admit:\n  loc: Renal\n").expect_err("typo");
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn counts_messages() {
        let order = |no_ack| {
            Step::new(StepKind::Order(Order {
                order_profile: "UREA AND ELECTROLYTES".into(),
                no_acknowledgement_message: no_ack,
                ..Default::default()
            }))
        };
        assert_eq!(order(false).message_count(), 2);
        assert_eq!(order(true).message_count(), 1);
        assert_eq!(Step::delay(Delay::fixed(Duration::zero())).message_count(), 0);
        assert_eq!(
            Step::new(StepKind::UsePatient(UsePatient::default())).message_count(),
            0
        );
        assert_eq!(
            Step::new(StepKind::Discharge(Discharge::default())).message_count(),
            1
        );
    }

    #[test]
    fn encodes_back_to_single_key_map() {
        let step = Step::new(StepKind::Transfer(Transfer {
            loc: "Renal".into(),
            bed: String::new(),
        }));
        let yaml = serde_yaml::to_string(&step).expect("serializes");
        let back: Step = serde_yaml::from_str(&yaml).expect("decodes");
        assert_eq!(back, step);
        assert!(!yaml.contains("parameters"));
    }
}
