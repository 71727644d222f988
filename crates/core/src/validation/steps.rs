//! Per-step rules, plus the constraints specific to history and pathway sections.

use super::persons::validate_person;
use super::results::{validate_order, validate_results, OrderLinkage};
use super::{FailureKind, ValidationReport};
use crate::constants::{
    CURRENT_PATIENT, DOCUMENT_APPEND, DOCUMENT_OVERWRITE, RANDOM, TEMPORARY_MODE, TRACK_MODE,
    TRANSIT_MODE,
};
use crate::locations::LocationRegistry;
use crate::pathway::events::{AutoGenerate, Document, TrackArrival, TrackDeparture};
use crate::pathway::person::{Allergy, DiagnosisOrProcedure, UpdatePerson};
use crate::pathway::step::{Parameters, Step, StepKind};
use crate::pathway::time::{Delay, Interval};
use chrono::{DateTime, Duration, Utc};
use pathsim_types::duration;
use rand::RngCore;

const HISTORY_SECTION: &str = "historical_data";
const PATHWAY_SECTION: &str = "pathway";

pub(super) struct StepContext<'a> {
    /// Reference for "must be in the past" checks.
    pub(super) now: DateTime<Utc>,
    pub(super) locations: &'a dyn LocationRegistry,
}

pub(super) fn validate_history(
    steps: &[Step],
    ctx: &StepContext<'_>,
    linkage: &mut OrderLinkage<'_>,
    rng: &mut dyn RngCore,
    report: &mut ValidationReport,
) {
    validate_section(HISTORY_SECTION, steps, ctx, linkage, rng, report);
    for (i, step) in steps.iter().enumerate() {
        let path = format!("{HISTORY_SECTION}[{i}]");
        match step.kind {
            StepKind::Delay(_) => report.push(
                FailureKind::Structure,
                &path,
                "delays in historical steps are not supported",
            ),
            StepKind::AutoGenerate(_) => report.push(
                FailureKind::Structure,
                &path,
                "autogenerate in historical steps is not supported",
            ),
            _ => {}
        }
        let negative_offset = step.time_from_now().is_some_and(|t| t < Duration::zero());
        if !matches!(step.kind, StepKind::UsePatient(_)) && !negative_offset {
            report.push(
                FailureKind::Timing,
                format!("{path}.parameters.time_from_now"),
                "time_from_now must be set and negative for a historical step",
            );
        }
    }
}

pub(super) fn validate_pathway(
    steps: &[Step],
    ctx: &StepContext<'_>,
    linkage: &mut OrderLinkage<'_>,
    rng: &mut dyn RngCore,
    report: &mut ValidationReport,
) {
    validate_section(PATHWAY_SECTION, steps, ctx, linkage, rng, report);
    for (i, step) in steps.iter().enumerate() {
        if step.time_from_now().is_some() {
            report.push(
                FailureKind::Timing,
                format!("{PATHWAY_SECTION}[{i}].parameters.time_from_now"),
                "time_from_now is not supported in pathway steps",
            );
        }
    }
}

fn validate_section(
    section: &str,
    steps: &[Step],
    ctx: &StepContext<'_>,
    linkage: &mut OrderLinkage<'_>,
    rng: &mut dyn RngCore,
    report: &mut ValidationReport,
) {
    for (i, step) in steps.iter().enumerate() {
        let path = format!("{section}[{i}]");
        let step_path = format!("{path}.{}", step.step_type().key());
        validate_step(step, &step_path, ctx, report);
        if let Some(parameters) = &step.parameters {
            validate_parameters(step, parameters, &format!("{path}.parameters"), report);
        }
        if matches!(step.kind, StepKind::AddPerson(_)) && i != 0 {
            report.push(
                FailureKind::Structure,
                &step_path,
                "add_person should be the first step",
            );
        }
        linkage.check_step(step, &step_path, rng, report);
    }
}

fn validate_step(step: &Step, path: &str, ctx: &StepContext<'_>, report: &mut ValidationReport) {
    let loc_path = format!("{path}.loc");
    match &step.kind {
        StepKind::Delay(delay) => validate_delay(delay, path, report),
        StepKind::Admission(a) => {
            validate_location(&a.loc, &loc_path, ctx, report);
            validate_allergies(&a.allergies, path, report);
        }
        StepKind::Order(order) => validate_order(order, path, report),
        StepKind::Results(results) => validate_results(results, path, report),
        StepKind::Discharge(d) => validate_allergies(&d.allergies, path, report),
        StepKind::DischargeInError(d) => validate_allergies(&d.allergies, path, report),
        StepKind::Registration(r) => validate_allergies(&r.allergies, path, report),
        StepKind::AddPerson(a) => validate_allergies(&a.allergies, path, report),
        StepKind::PreAdmission(p) => {
            validate_location(&p.loc, &loc_path, ctx, report);
            validate_expected_time(
                p.expected_admission_time_from_now,
                path,
                "expected_admission_time_from_now",
                report,
            );
            validate_allergies(&p.allergies, path, report);
        }
        StepKind::Transfer(t) => validate_location(&t.loc, &loc_path, ctx, report),
        StepKind::TransferInError(t) => validate_location(&t.loc, &loc_path, ctx, report),
        StepKind::PendingAdmission(p) => {
            validate_location(&p.loc, &loc_path, ctx, report);
            validate_expected_time(
                p.expected_admission_time_from_now,
                path,
                "expected_admission_time_from_now",
                report,
            );
        }
        StepKind::PendingTransfer(p) => {
            validate_location(&p.loc, &loc_path, ctx, report);
            validate_expected_time(
                p.expected_transfer_time_from_now,
                path,
                "expected_transfer_time_from_now",
                report,
            );
        }
        StepKind::PendingDischarge(p) => validate_expected_time(
            p.expected_discharge_time_from_now,
            path,
            "expected_discharge_time_from_now",
            report,
        ),
        StepKind::Merge(m) => {
            if m.children.is_empty() {
                report.push(
                    FailureKind::Step,
                    format!("{path}.children"),
                    "merge steps require at least 1 child patient",
                );
            } else if m.force_a40 && m.children.len() != 1 {
                report.push(
                    FailureKind::Step,
                    format!("{path}.force_a40"),
                    format!(
                        "force_a40 requires only one child patient, got {}",
                        m.children.len()
                    ),
                );
            }
            if m.parent.is_empty() {
                report.push(
                    FailureKind::Step,
                    format!("{path}.parent"),
                    "merge steps require one parent patient",
                );
            }
        }
        StepKind::BedSwap(b) => {
            if b.patient_1.is_empty() || b.patient_2.is_empty() {
                report.push(
                    FailureKind::Step,
                    path,
                    "a bed swap requires patient_1 and patient_2 to be set",
                );
            } else if b.patient_1 == b.patient_2 {
                report.push(
                    FailureKind::Step,
                    path,
                    format!("a bed swap requires two different patients, got {} twice", b.patient_1),
                );
            }
        }
        StepKind::UsePatient(u) => {
            if u.patient.is_empty() || u.patient.as_str() == CURRENT_PATIENT {
                report.push(
                    FailureKind::Step,
                    format!("{path}.patient"),
                    format!("use_patient requires a set patient different from {CURRENT_PATIENT}"),
                );
            }
        }
        StepKind::UpdatePerson(u) => validate_update_person(u, path, ctx.now, report),
        StepKind::TrackDeparture(t) => validate_track_departure(t, path, ctx, report),
        StepKind::TrackArrival(t) => validate_track_arrival(t, path, ctx, report),
        StepKind::AutoGenerate(a) => validate_auto_generate(a, path, report),
        StepKind::ClinicalNote(n) => {
            if n.content_type.is_empty() {
                report.push(
                    FailureKind::Step,
                    format!("{path}.content_type"),
                    "clinical_note requires content_type to be set",
                );
            } else if !n.document_content.is_empty() && n.content_type != "txt" {
                report.push(
                    FailureKind::Step,
                    format!("{path}.content_type"),
                    format!(
                        "clinical_note requires content_type txt when document_content is given; got {}",
                        n.content_type
                    ),
                );
            }
        }
        StepKind::HardcodedMessage(h) => {
            if h.regex.is_empty() {
                report.push(
                    FailureKind::Step,
                    format!("{path}.regex"),
                    "a hardcoded message requires a regex",
                );
            }
        }
        StepKind::Document(d) => validate_document(d, path, report),
        StepKind::CancelVisit(_)
        | StepKind::CancelTransfer(_)
        | StepKind::CancelDischarge(_)
        | StepKind::CancelPendingAdmission(_)
        | StepKind::CancelPendingDischarge(_)
        | StepKind::CancelPendingTransfer(_)
        | StepKind::DeleteVisit(_)
        | StepKind::Generic(_)
        | StepKind::GenerateResources(_) => {}
    }
}

fn validate_parameters(
    step: &Step,
    parameters: &Parameters,
    path: &str,
    report: &mut ValidationReport,
) {
    if let Some(delay) = &parameters.delay_message {
        let delay_path = format!("{path}.delay_message");
        match step.kind {
            StepKind::Delay(_) | StepKind::UsePatient(_) => report.push(
                FailureKind::Timing,
                delay_path,
                format!("delay_message is not allowed on {} steps", step.step_type().key()),
            ),
            _ => validate_delay(delay, &delay_path, report),
        }
    }
    if let Some(status) = &parameters.status {
        if status.time_of_death.is_some() && status.time_since_death.is_some() {
            report.push(
                FailureKind::Timing,
                format!("{path}.status"),
                "only one of time_of_death and time_since_death may be set in the same step",
            );
        }
    }
}

// ============================================================================
// Shared field rules
// ============================================================================

fn validate_delay(delay: &Delay, path: &str, report: &mut ValidationReport) {
    if delay.from > delay.to {
        report.push(
            FailureKind::Timing,
            path,
            format!(
                "to ({}) needs to be greater or equal than from ({})",
                duration::format(&delay.to),
                duration::format(&delay.from)
            ),
        );
    }
    if delay.from < Duration::zero() {
        report.push(FailureKind::Timing, path, "both endpoints need to be positive");
    }
}

fn validate_location(loc: &str, path: &str, ctx: &StepContext<'_>, report: &mut ValidationReport) {
    if loc.is_empty() {
        report.push(FailureKind::Location, path, "location not provided");
    } else if !ctx.locations.contains(loc) {
        report.push(
            FailureKind::Location,
            path,
            format!(
                "unknown location {loc:?}, supported locations are [{}]",
                ctx.locations.names().join(",")
            ),
        );
    }
}

fn validate_expected_time(
    expected: Option<Duration>,
    path: &str,
    field: &str,
    report: &mut ValidationReport,
) {
    if !expected.is_some_and(|t| t >= Duration::zero()) {
        report.push(
            FailureKind::Timing,
            format!("{path}.{field}"),
            format!("a positive {field} is required"),
        );
    }
}

fn validate_allergies(allergies: &[Allergy], path: &str, report: &mut ValidationReport) {
    for (i, allergy) in allergies.iter().enumerate() {
        let allergy_path = format!("{path}.allergies[{i}]");
        if allergy.code.is_empty() && allergy.description.is_empty() {
            report.push(
                FailureKind::Step,
                &allergy_path,
                "invalid allergy: neither code nor description specified",
            );
        }
        if allergy
            .identification_datetime
            .as_ref()
            .is_some_and(|dt| !dt.is_valid())
        {
            report.push(
                FailureKind::Timing,
                format!("{allergy_path}.identification_datetime"),
                "exactly one of time, time_from_now and no_datetime_recorded must be set",
            );
        }
    }
}

// ============================================================================
// Step-specific rules
// ============================================================================

fn validate_update_person(
    update: &UpdatePerson,
    path: &str,
    now: DateTime<Utc>,
    report: &mut ValidationReport,
) {
    if let Some(person) = &update.person {
        validate_person(person, &format!("{path}.person"), report);
    }
    for (i, diagnosis) in update.diagnoses.iter().enumerate() {
        validate_diagnosis_or_procedure(diagnosis, &format!("{path}.diagnoses[{i}]"), now, report);
    }
    for (i, procedure) in update.procedures.iter().enumerate() {
        validate_diagnosis_or_procedure(procedure, &format!("{path}.procedures[{i}]"), now, report);
    }
    validate_allergies(&update.allergies, path, report);
}

fn validate_diagnosis_or_procedure(
    item: &DiagnosisOrProcedure,
    path: &str,
    now: DateTime<Utc>,
    report: &mut ValidationReport,
) {
    let random_or_empty = |s: &str| s.is_empty() || s == RANDOM;
    if item.code == RANDOM || item.description == RANDOM {
        if !random_or_empty(&item.code) || !random_or_empty(&item.description) {
            report.push(
                FailureKind::Step,
                path,
                format!(
                    "code={} but description={}; either both need to be {RANDOM}, or one of them needs to be omitted",
                    item.code, item.description
                ),
            );
        }
        if !item.item_type.is_empty() {
            report.push(
                FailureKind::Step,
                format!("{path}.type"),
                format!("type cannot be set for a random item, but was set to: {}", item.item_type),
            );
        }
    } else if item.code.is_empty() && item.description.is_empty() {
        report.push(FailureKind::Step, path, "neither code nor description specified");
    }
    if let Some(datetime) = &item.datetime {
        if !datetime.is_valid() || !datetime.is_before(now) {
            report.push(
                FailureKind::Timing,
                format!("{path}.datetime"),
                "invalid or future datetime provided",
            );
        }
    }
}

fn validate_track_mode(mode: &str, path: &str, what: &str, report: &mut ValidationReport) -> bool {
    if matches!(mode, TRACK_MODE | TRANSIT_MODE | TEMPORARY_MODE) {
        return true;
    }
    report.push(
        FailureKind::Step,
        format!("{path}.mode"),
        format!("{what} tracking mode is {mode:?}; must be one of [{TRACK_MODE}, {TRANSIT_MODE}, {TEMPORARY_MODE}]"),
    );
    false
}

fn validate_track_departure(
    t: &TrackDeparture,
    path: &str,
    ctx: &StepContext<'_>,
    report: &mut ValidationReport,
) {
    let loc_path = format!("{path}.destination_loc");
    if t.destination_loc.is_empty() {
        report.push(
            FailureKind::Location,
            &loc_path,
            "departure tracking requires a destination_loc",
        );
        return;
    }
    if !validate_track_mode(&t.mode, path, "departure", report) {
        return;
    }
    if !t.destination_bed.is_empty() && t.mode != TRACK_MODE && t.mode != TRANSIT_MODE {
        report.push(
            FailureKind::Step,
            format!("{path}.destination_bed"),
            format!("destination_bed is only supported for modes [{TRACK_MODE}, {TRANSIT_MODE}], got mode {:?}", t.mode),
        );
    }
    if t.mode != TEMPORARY_MODE {
        validate_location(&t.destination_loc, &loc_path, ctx, report);
    }
}

fn validate_track_arrival(
    t: &TrackArrival,
    path: &str,
    ctx: &StepContext<'_>,
    report: &mut ValidationReport,
) {
    let loc_path = format!("{path}.loc");
    if t.loc.is_empty() {
        report.push(FailureKind::Location, &loc_path, "arrival tracking requires a loc");
        return;
    }
    if !validate_track_mode(&t.mode, path, "arrival", report) {
        return;
    }
    if t.is_temporary && t.mode != TEMPORARY_MODE {
        report.push(
            FailureKind::Step,
            format!("{path}.is_temporary"),
            format!("is_temporary can only be set for mode {TEMPORARY_MODE:?}"),
        );
    }
    if !t.bed.is_empty() && t.mode != TRACK_MODE && t.mode != TEMPORARY_MODE {
        report.push(
            FailureKind::Step,
            format!("{path}.bed"),
            format!("bed is only supported for modes [{TRACK_MODE}, {TEMPORARY_MODE}], got mode {:?}", t.mode),
        );
    }
    if !t.is_temporary {
        validate_location(&t.loc, &loc_path, ctx, report);
    }
}

fn validate_auto_generate(generator: &AutoGenerate, path: &str, report: &mut ValidationReport) {
    let (Some(from), Some(to)) = (generator.from, generator.to) else {
        report.push(
            FailureKind::Timing,
            path,
            "autogenerate requires from and to to be set",
        );
        return;
    };
    if from > to {
        report.push(
            FailureKind::Timing,
            path,
            "autogenerate requires from to be before or equal to to",
        );
    } else if from == to && generator.every.is_some() {
        report.push(
            FailureKind::Timing,
            format!("{path}.every"),
            "autogenerate cannot have every set if from is equal to to",
        );
    } else if from != to && generator.every.is_none() {
        report.push(
            FailureKind::Timing,
            format!("{path}.every"),
            "autogenerate with different from and to requires every to be set",
        );
    }
    if generator.every.is_some_and(|every| every <= Duration::zero()) {
        report.push(
            FailureKind::Timing,
            format!("{path}.every"),
            "autogenerate requires a positive every",
        );
    }
    validate_results(&generator.effective_result(), &format!("{path}.result"), report);
}

fn validate_interval(interval: &Interval) -> bool {
    interval.from <= interval.to && interval.from >= 0 && interval.to >= 0
}

fn validate_document(document: &Document, path: &str, report: &mut ValidationReport) {
    if let Some(lines) = &document.num_random_content_lines {
        if !validate_interval(lines) {
            report.push(
                FailureKind::Step,
                format!("{path}.num_random_content_lines"),
                "invalid num_random_content_lines: from and to must be non-negative and from <= to",
            );
        }
    }
    if document.update_type.is_empty() {
        return;
    }
    if document.update_type != DOCUMENT_APPEND && document.update_type != DOCUMENT_OVERWRITE {
        report.push(
            FailureKind::Step,
            format!("{path}.update_type"),
            format!(
                "update_type must be set to {DOCUMENT_APPEND} or {DOCUMENT_OVERWRITE}, but was set to: {}",
                document.update_type
            ),
        );
    }
    if document.id.is_empty() {
        report.push(
            FailureKind::Step,
            format!("{path}.id"),
            "id is required to update a document",
        );
    }
    let adds_nothing = document.header_content_lines.is_empty()
        && document.ending_content_lines.is_empty()
        && document.num_random_content_lines.is_some_and(|l| l.is_empty());
    if document.update_type == DOCUMENT_APPEND && adds_nothing {
        report.push(
            FailureKind::Step,
            path,
            "cannot append 0 lines to document",
        );
    }
}
