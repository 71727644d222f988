//! Pathway validation.
//!
//! Every rule runs on every pathway; violations are collected into a [`ValidationReport`]
//! instead of stopping at the first one, so authors see all problems of a file at once.
//!
//! Validation may fill in the consultant from the doctors registry, which is why it takes the
//! pathway mutably.

mod consultant;
mod persons;
mod results;
mod steps;

use crate::clock::Clock;
use crate::doctors::DoctorRegistry;
use crate::locations::LocationRegistry;
use crate::order_profile::OrderProfileRegistry;
use crate::pathway::Pathway;
use crate::{PathwayError, PathwayResult};
use pathsim_types::MAX_SIGNIFICANT_DIGITS;
use rand::RngCore;
use std::fmt;

// ============================================================================
// Report
// ============================================================================

/// What a validation failure is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Shape of the pathway: empty sections, steps not allowed where they are.
    Structure,
    Consultant,
    Percentage,
    /// Raised by the caller-supplied hook.
    Custom,
    Person,
    Step,
    Location,
    Timing,
    OrderProfile,
    Result,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    pub kind: FailureKind,
    /// Dotted path of the offending field, e.g. `pathway[3].admission.loc`. Empty for
    /// failures about the pathway as a whole.
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every failure found while validating one pathway.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn has_kind(&self, kind: FailureKind) -> bool {
        self.failures.iter().any(|f| f.kind == kind)
    }

    pub(crate) fn push(
        &mut self,
        kind: FailureKind,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.failures.push(ValidationFailure {
            kind,
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

// ============================================================================
// Validator
// ============================================================================

/// Extra, caller-defined rule run on every pathway.
pub type CustomValidator = dyn Fn(&Pathway) -> Result<(), String> + Send + Sync;

/// Validates pathways against the hospital's registries.
#[derive(Clone, Copy)]
pub struct Validator<'a> {
    clock: &'a dyn Clock,
    order_profiles: &'a dyn OrderProfileRegistry,
    doctors: &'a dyn DoctorRegistry,
    locations: &'a dyn LocationRegistry,
    custom: Option<&'a CustomValidator>,
}

impl<'a> Validator<'a> {
    pub fn new(
        clock: &'a dyn Clock,
        order_profiles: &'a dyn OrderProfileRegistry,
        doctors: &'a dyn DoctorRegistry,
        locations: &'a dyn LocationRegistry,
    ) -> Self {
        Self {
            clock,
            order_profiles,
            doctors,
            locations,
            custom: None,
        }
    }

    pub fn with_custom(mut self, custom: &'a CustomValidator) -> Self {
        self.custom = Some(custom);
        self
    }

    /// Runs every rule against an initialised pathway.
    ///
    /// The random generator is used to mint consultant IDs and to check that random result
    /// values can actually be generated.
    pub fn validate(
        &self,
        pathway: &mut Pathway,
        rng: &mut dyn RngCore,
    ) -> Result<(), ValidationReport> {
        let mut report = ValidationReport::new();

        if pathway.history.is_empty() && pathway.pathway.is_empty() {
            report.push(
                FailureKind::Structure,
                "",
                "pathway and historical_data cannot be empty at the same time",
            );
        }

        if let Some(consultant) = pathway.consultant.as_mut() {
            if let Err(message) = consultant::resolve(consultant, self.doctors, rng) {
                report.push(
                    FailureKind::Consultant,
                    "consultant",
                    format!("invalid consultant: {message}"),
                );
                // A consultant that didn't resolve never reaches the generated messages.
                pathway.consultant = None;
            }
        }

        if let Some(percentage) = pathway.percentage {
            if percentage.value() < 0.0 || !percentage.value().is_finite() {
                report.push(
                    FailureKind::Percentage,
                    "percentage_of_patients",
                    format!("expected >=0, got {percentage}%"),
                );
            } else if !percentage.is_zero()
                && percentage.significant_digits() > MAX_SIGNIFICANT_DIGITS
            {
                report.push(
                    FailureKind::Percentage,
                    "percentage_of_patients",
                    format!(
                        "expected {MAX_SIGNIFICANT_DIGITS} decimal points at most, got {} ({percentage})",
                        percentage.significant_digits()
                    ),
                );
            }
        }

        if let Some(custom) = self.custom {
            if let Err(message) = custom(pathway) {
                report.push(
                    FailureKind::Custom,
                    "",
                    format!("invalid based on custom validation: {message}"),
                );
            }
        }

        persons::validate_persons(pathway, &mut report);

        let ctx = steps::StepContext {
            now: self.clock.now(),
            locations: self.locations,
        };
        let mut linkage = results::OrderLinkage::new(self.order_profiles);
        steps::validate_history(&pathway.history, &ctx, &mut linkage, rng, &mut report);
        steps::validate_pathway(&pathway.pathway, &ctx, &mut linkage, rng, &mut report);

        if !report.is_empty() {
            tracing::error!(
                pathway_name = pathway.name(),
                failures = report.len(),
                "Invalid pathway:\n{report}"
            );
        }
        report.into_result()
    }

    /// [`Validator::validate`], with the report wrapped into a [`PathwayError`].
    pub fn check(&self, pathway: &mut Pathway, rng: &mut dyn RngCore) -> PathwayResult<()> {
        self.validate(pathway, rng)
            .map_err(|report| PathwayError::InvalidPathway {
                name: pathway.name().to_owned(),
                report,
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::doctors::tests::doctors;
    use crate::doctors::Doctors;
    use crate::locations::tests::locations;
    use crate::locations::LocationManager;
    use crate::order_profile::tests::profiles;
    use crate::order_profile::OrderProfiles;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Registries shared by the validation tests.
    pub(crate) struct Fixture {
        pub clock: FixedClock,
        pub profiles: OrderProfiles,
        pub doctors: Doctors,
        pub locations: LocationManager,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self {
                clock: FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
                profiles: profiles(),
                doctors: doctors(),
                locations: locations(),
            }
        }

        pub fn validator(&self) -> Validator<'_> {
            Validator::new(&self.clock, &self.profiles, &self.doctors, &self.locations)
        }

        /// Decodes, initialises and validates a pathway.
        pub fn validate(&self, yaml: &str) -> Result<Pathway, ValidationReport> {
            let mut pathway: Pathway = serde_yaml::from_str(yaml).expect("valid pathway yaml");
            pathway.init("test_pathway");
            let mut rng = StdRng::seed_from_u64(42);
            self.validator().validate(&mut pathway, &mut rng)?;
            Ok(pathway)
        }
    }

    pub(crate) fn assert_failure(report: &ValidationReport, kind: FailureKind, needle: &str) {
        assert!(
            report
                .failures()
                .iter()
                .any(|f| f.kind == kind && f.to_string().contains(needle)),
            "expected {kind:?} failure containing {needle:?}, got:\n{report}"
        );
    }

    #[test]
    fn accepts_minimal_pathway() {
        let fixture = Fixture::new();
        fixture
            .validate("pathway:\n  - admission:\n      loc: Renal\n  - discharge: {}\n")
            .expect("valid pathway");
    }

    #[test]
    fn rejects_empty_pathway() {
        let report = Fixture::new().validate("pathway: []\n").expect_err("empty");
        assert_failure(&report, FailureKind::Structure, "cannot be empty");
    }

    #[test]
    fn collects_every_failure() {
        let yaml = r#"
percentage_of_patients: 1.2345
pathway:
  - admission:
      loc: Nowhere
  - delay:
      from: 2h
      to: 1h
  - use_patient:
      patient: CURRENT
"#;
        let report = Fixture::new().validate(yaml).expect_err("invalid");
        assert_failure(&report, FailureKind::Percentage, "decimal points");
        assert_failure(&report, FailureKind::Location, "pathway[0].admission.loc");
        assert_failure(&report, FailureKind::Timing, "pathway[1].delay");
        assert_failure(&report, FailureKind::Step, "pathway[2].use_patient");
        assert_eq!(report.to_string().lines().count(), report.len());
    }

    #[test]
    fn rejects_negative_percentage() {
        let yaml = "percentage_of_patients: -1\npathway:\n  - discharge: {}\n";
        let report = Fixture::new().validate(yaml).expect_err("negative");
        assert_failure(&report, FailureKind::Percentage, ">=0");
    }

    #[test]
    fn unresolved_consultant_is_cleared() {
        let fixture = Fixture::new();
        let mut pathway: Pathway = serde_yaml::from_str(
            "consultant:\n  id: C0000000\npathway:\n  - discharge: {}\n",
        )
        .unwrap();
        pathway.init("test_pathway");
        let mut rng = StdRng::seed_from_u64(42);

        let report = fixture
            .validator()
            .validate(&mut pathway, &mut rng)
            .expect_err("unknown consultant id");

        assert_failure(&report, FailureKind::Consultant, "C0000000 not found");
        assert!(pathway.consultant.is_none());
    }

    #[test]
    fn runs_custom_hook() {
        let fixture = Fixture::new();
        let hook: &CustomValidator = &|p: &Pathway| -> Result<(), String> {
            if p.pathway.len() > 1 {
                Err("too many steps".into())
            } else {
                Ok(())
            }
        };
        let mut pathway: Pathway =
            serde_yaml::from_str("pathway:\n  - discharge: {}\n  - discharge: {}\n").unwrap();
        pathway.init("custom");
        let mut rng = StdRng::seed_from_u64(1);

        let err = fixture
            .validator()
            .with_custom(hook)
            .check(&mut pathway, &mut rng)
            .expect_err("hook rejects");

        assert!(matches!(
            err,
            PathwayError::InvalidPathway { ref name, ref report }
                if name == "custom" && report.has_kind(FailureKind::Custom)
        ));
    }

    #[test]
    fn detects_unused_person() {
        let fixture = Fixture::new();
        let unused = r#"
persons:
  a: {}
  b: {}
pathway:
  - use_patient:
      patient: a
  - discharge: {}
"#;
        let report = fixture.validate(unused).expect_err("b never used");
        assert_failure(&report, FailureKind::Person, "unused persons");

        let used = r#"
persons:
  a: {}
  b: {}
pathway:
  - use_patient:
      patient: a
  - discharge: {}
  - use_patient:
      patient: b
  - discharge: {}
"#;
        fixture.validate(used).expect("both persons used");
    }

    #[test]
    fn order_ids_keep_their_profile() {
        let fixture = Fixture::new();
        let mismatch = r#"
pathway:
  - order:
      order_id: o1
      order_profile: UREA AND ELECTROLYTES
  - result:
      order_id: o1
      order_profile: FULL BLOOD COUNT
"#;
        let report = fixture.validate(mismatch).expect_err("profile changed");
        assert_failure(&report, FailureKind::OrderProfile, "does not match previous");

        let omitted = r#"
pathway:
  - order:
      order_id: o1
      order_profile: UREA AND ELECTROLYTES
  - result:
      order_id: o1
"#;
        fixture.validate(omitted).expect("profile inherited");
    }

    #[test]
    fn order_links_span_history_and_pathway() {
        let yaml = r#"
historical_data:
  - order:
      order_id: o1
      order_profile: UREA AND ELECTROLYTES
    parameters:
      time_from_now: -2h
pathway:
  - result:
      order_id: o1
      results:
        - test_name: Potassium
          value: "4.1"
          unit: MMOLL
"#;
        Fixture::new().validate(yaml).expect("linked across sections");
    }
}
