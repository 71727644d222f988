//! Rules for the persons section and person payloads.

use super::{FailureKind, ValidationReport};
use crate::constants::{GENDER_FEMALE, GENDER_MALE, RANDOM};
use crate::pathway::person::{Address, Age, Person};
use crate::pathway::step::StepKind;
use crate::pathway::Pathway;
use std::collections::BTreeSet;

/// Checks every person and, for pathways with several persons, that each of them is switched
/// to by a `use_patient` step and that the first step says who to start with.
pub(super) fn validate_persons(pathway: &Pathway, report: &mut ValidationReport) {
    let Some(persons) = &pathway.persons else {
        return;
    };
    if persons.is_empty() {
        report.push(
            FailureKind::Person,
            "persons",
            "persons cannot be empty; omit the section to use a single default person",
        );
        return;
    }
    for (id, person) in persons.iter() {
        validate_person(person, &format!("persons.{id}"), report);
    }
    if persons.len() <= 1 {
        return;
    }

    let mut steps = pathway.all_steps().peekable();
    match steps.peek().map(|s| &s.kind) {
        Some(StepKind::UsePatient(_)) => {}
        Some(_) => report.push(
            FailureKind::Person,
            "persons",
            "use_patient needs to be the first step of the pathway",
        ),
        // An empty pathway is reported on its own.
        None => return,
    }

    let mut unused: BTreeSet<_> = persons.ids().collect();
    for step in steps {
        if let StepKind::UsePatient(u) = &step.kind {
            unused.remove(&u.patient);
        }
    }
    if !unused.is_empty() {
        let names: Vec<&str> = unused.iter().map(|id| id.as_str()).collect();
        report.push(
            FailureKind::Person,
            "persons",
            format!("there are unused persons in persons: [{}]", names.join(", ")),
        );
    }
}

pub(super) fn validate_person(person: &Person, path: &str, report: &mut ValidationReport) {
    if let Some(address) = &person.address {
        validate_address(address, &format!("{path}.address"), report);
    }
    if person.age.is_some() && person.date_of_birth.is_some() {
        report.push(
            FailureKind::Person,
            path,
            "only one of age or date_of_birth may be set for the same person",
        );
    }
    if let Some(age) = &person.age {
        validate_age(age, &format!("{path}.age"), report);
    }
    let gender = person.gender.as_str();
    if !matches!(gender, "" | RANDOM | GENDER_MALE | GENDER_FEMALE) {
        report.push(
            FailureKind::Person,
            format!("{path}.gender"),
            format!("unknown gender: {gender}"),
        );
    }
}

fn validate_address(address: &Address, path: &str, report: &mut ValidationReport) {
    if address.all_random {
        for field in address.fields_set() {
            report.push(
                FailureKind::Person,
                format!("{path}.{field}"),
                format!("{field} was set. If all_random is enabled, no other field can be set"),
            );
        }
        return;
    }
    if !address.second_line.is_empty() && address.first_line.is_empty() {
        report.push(
            FailureKind::Person,
            format!("{path}.second_line"),
            "second_line was set but first_line was not; both lines must be set together",
        );
    }
}

fn validate_age(age: &Age, path: &str, report: &mut ValidationReport) {
    if !(0..=365).contains(&age.day_of_year) {
        report.push(
            FailureKind::Person,
            format!("{path}.day_of_year"),
            format!(
                "day of year must be in range [0, 365] if set (0 indicates random), got: {}",
                age.day_of_year
            ),
        );
    }
    if age.from > age.to {
        report.push(
            FailureKind::Person,
            path,
            "parameter to needs to be greater than or equal to from",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{assert_failure, Fixture};
    use super::*;

    #[test]
    fn checks_person_fields() {
        let yaml = r#"
persons:
  main-patient:
    gender: X
    age:
      from: 50
      to: 40
      day_of_year: 400
    date_of_birth: 1970-01-01
    address:
      second_line: Flat 2
pathway:
  - discharge: {}
"#;
        let report = Fixture::new().validate(yaml).expect_err("invalid person");
        assert_failure(&report, FailureKind::Person, "unknown gender: X");
        assert_failure(&report, FailureKind::Person, "only one of age or date_of_birth");
        assert_failure(&report, FailureKind::Person, "persons.main-patient.age.day_of_year");
        assert_failure(&report, FailureKind::Person, "greater than or equal to from");
        assert_failure(&report, FailureKind::Person, "both lines must be set together");
    }

    #[test]
    fn all_random_address_excludes_other_fields() {
        let yaml = r#"
persons:
  p:
    gender: RANDOM
    address:
      all_random: true
      city: Leeds
pathway:
  - discharge: {}
"#;
        let report = Fixture::new().validate(yaml).expect_err("city with all_random");
        assert_failure(&report, FailureKind::Person, "persons.p.address.city");
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn explicit_empty_persons_is_rejected() {
        let yaml = "persons: {}\npathway:\n  - discharge: {}\n";
        let report = Fixture::new().validate(yaml).expect_err("no persons");
        assert_failure(&report, FailureKind::Person, "persons cannot be empty");
    }

    #[test]
    fn several_persons_need_use_patient_first() {
        let yaml = r#"
persons:
  a: {}
  b: {}
pathway:
  - admission:
      loc: Renal
  - use_patient:
      patient: a
  - use_patient:
      patient: b
"#;
        let report = Fixture::new().validate(yaml).expect_err("admission first");
        assert_failure(&report, FailureKind::Person, "needs to be the first step");
        assert!(!report.to_string().contains("unused"));
    }

    #[test]
    fn use_patient_in_history_counts() {
        let yaml = r#"
persons:
  a: {}
  b: {}
historical_data:
  - use_patient:
      patient: a
  - admission:
      loc: Renal
    parameters:
      time_from_now: -48h
pathway:
  - use_patient:
      patient: b
  - discharge: {}
"#;
        Fixture::new().validate(yaml).expect("both persons used");
    }
}
