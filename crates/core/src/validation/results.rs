//! Rules for orders, results and their link through order IDs.

use super::{FailureKind, ValidationReport};
use crate::constants::{
    ABNORMAL_FLAG_DEFAULT, ABNORMAL_FLAG_HIGH, ABNORMAL_FLAG_LOW, ABNORMAL_FLAG_NORMAL,
    ABNORMAL_FLAG_VALUES, EMPTY, MIDNIGHT, RANDOM, TRIGGER_EVENTS,
};
use crate::order_profile::value::{parse_value, RandomType, ValueRange};
use crate::order_profile::{OrderProfile, OrderProfileRegistry};
use crate::pathway::results::{Order, Results, TestResult, ValueType};
use crate::pathway::step::{Step, StepKind};
use rand::RngCore;
use std::collections::HashMap;

pub(super) fn validate_order(order: &Order, path: &str, report: &mut ValidationReport) {
    if order.order_id.is_empty() && order.order_profile.is_empty() {
        report.push(
            FailureKind::Step,
            path,
            "neither order_id nor order_profile specified; an order must either relate to another order or result, or have order_profile specified",
        );
    }
}

/// Checks the fields of a results step that don't depend on the order profile.
pub(super) fn validate_results(results: &Results, path: &str, report: &mut ValidationReport) {
    if results.order_id.is_empty() && results.order_profile.is_empty() {
        report.push(
            FailureKind::Result,
            path,
            "neither order_id nor order_profile specified; results must either relate to an order or other results, or have order_profile specified",
        );
    }
    if results.order_profile == RANDOM && !results.results.is_empty() {
        report.push(
            FailureKind::Result,
            format!("{path}.results"),
            format!("order_profile is set to {RANDOM}, but results are specified; results can only be specified for a non-random order_profile"),
        );
    }
    if results.order_status.is_empty() != results.results_status.is_empty() {
        report.push(
            FailureKind::Result,
            path,
            "when overriding status, both order_status and results_status need to be set",
        );
    }
    for (field, value) in [
        ("collected_datetime", &results.collected_datetime),
        ("received_in_lab_datetime", &results.received_in_lab_datetime),
    ] {
        if !matches!(value.as_str(), "" | MIDNIGHT | EMPTY) {
            report.push(
                FailureKind::Result,
                format!("{path}.{field}"),
                format!("invalid {field}: {value}; want {MIDNIGHT}, {EMPTY} or empty"),
            );
        }
    }
    let trigger = results.trigger_event.to_uppercase();
    if !trigger.is_empty() && !TRIGGER_EVENTS.contains(&trigger.as_str()) {
        report.push(
            FailureKind::Result,
            format!("{path}.trigger_event"),
            format!(
                "invalid trigger_event: {}; want {} or empty",
                results.trigger_event,
                TRIGGER_EVENTS.join(", ")
            ),
        );
    }
}

// ============================================================================
// Order IDs
// ============================================================================

/// Tracks the profile each order ID was declared with, across history and pathway.
pub(super) struct OrderLinkage<'a> {
    order_profiles: &'a dyn OrderProfileRegistry,
    profile_by_order_id: HashMap<String, String>,
}

impl<'a> OrderLinkage<'a> {
    pub(super) fn new(order_profiles: &'a dyn OrderProfileRegistry) -> Self {
        Self {
            order_profiles,
            profile_by_order_id: HashMap::new(),
        }
    }

    /// Records the step's order ID and checks its results against the linked profile.
    pub(super) fn check_step(
        &mut self,
        step: &Step,
        path: &str,
        rng: &mut dyn RngCore,
        report: &mut ValidationReport,
    ) {
        match &step.kind {
            StepKind::Order(order) if !order.order_id.is_empty() => {
                self.link(&order.order_id, &order.order_profile, path, report);
            }
            StepKind::Results(results) => {
                if !results.order_id.is_empty() {
                    self.link(&results.order_id, &results.order_profile, path, report);
                }
                self.check_against_profile(results, path, rng, report);
            }
            _ => {}
        }
    }

    fn link(&mut self, order_id: &str, profile: &str, path: &str, report: &mut ValidationReport) {
        match self.profile_by_order_id.get(order_id) {
            None => {
                if profile.is_empty() {
                    report.push(
                        FailureKind::OrderProfile,
                        path,
                        format!("order id {order_id:?} declared first time, but no order profile specified"),
                    );
                }
                self.profile_by_order_id
                    .insert(order_id.to_owned(), profile.to_owned());
            }
            // The profile may be repeated on every step of an order for readability.
            Some(previous) if !profile.is_empty() && profile != previous.as_str() => {
                report.push(
                    FailureKind::OrderProfile,
                    path,
                    format!("order id {order_id:?} is re-used, but order profile {profile} does not match previous order profile {previous}"),
                );
            }
            Some(_) => {}
        }
    }

    fn check_against_profile(
        &self,
        results: &Results,
        path: &str,
        rng: &mut dyn RngCore,
        report: &mut ValidationReport,
    ) {
        let profile_name = if results.order_profile.is_empty() {
            self.profile_by_order_id
                .get(&results.order_id)
                .map(String::as_str)
                .unwrap_or_default()
        } else {
            results.order_profile.as_str()
        };
        let profile = self.order_profiles.get(profile_name);
        for (i, result) in results.results.iter().enumerate() {
            validate_test_result(result, profile, &format!("{path}.results[{i}]"), rng, report);
        }
    }
}

// ============================================================================
// Test results
// ============================================================================

fn is_normal_flag(flag: &str) -> bool {
    flag.is_empty() || flag == ABNORMAL_FLAG_NORMAL
}

fn validate_test_result(
    result: &TestResult,
    profile: Option<&OrderProfile>,
    path: &str,
    rng: &mut dyn RngCore,
    report: &mut ValidationReport,
) {
    if result.test_name.is_empty() {
        report.push(
            FailureKind::Result,
            format!("{path}.test_name"),
            "test_name is missing",
        );
    }
    if result.abnormal_flag == ABNORMAL_FLAG_DEFAULT
        && result.value_type() != Some(ValueType::Numerical)
    {
        report.push(
            FailureKind::Result,
            format!("{path}.abnormal_flag"),
            format!(
                "cannot derive abnormal flag from textual or empty value {:?}",
                result.value
            ),
        );
    }
    if !ABNORMAL_FLAG_VALUES.contains(&result.abnormal_flag.as_str()) {
        report.push(
            FailureKind::Result,
            format!("{path}.abnormal_flag"),
            format!(
                "invalid abnormal flag {}; should be one of: {:?}",
                result.abnormal_flag, ABNORMAL_FLAG_VALUES
            ),
        );
    }
    validate_value(result, path, report);
    validate_against_profile(result, profile, path, rng, report);
}

fn validate_value(result: &TestResult, path: &str, report: &mut ValidationReport) {
    let value_path = format!("{path}.value");
    if result.value.is_empty() {
        report.push(
            FailureKind::Result,
            value_path,
            "value is missing; to randomise it, set it to NORMAL, ABNORMAL_HIGH or ABNORMAL_LOW",
        );
        return;
    }

    if result.is_value_random() {
        let unit_is_random = RandomType::from_keyword(&result.unit).is_some();
        if !result.reference_range.is_empty() && (result.unit.is_empty() || unit_is_random) {
            report.push(
                FailureKind::Result,
                format!("{path}.unit"),
                format!(
                    "value set to {} with a custom reference range, but unit is {:?}; a non-random unit must be specified",
                    result.value, result.unit
                ),
            );
        } else if result.reference_range.is_empty()
            && !result.unit.is_empty()
            && result.unit != result.value
        {
            report.push(
                FailureKind::Result,
                format!("{path}.unit"),
                format!(
                    "value set to {} with no custom reference range, but unit is {}; the unit must be omitted or set to the same string as the value",
                    result.value, result.unit
                ),
            );
        }
        if !result.abnormal_flag.is_empty() {
            report.push(
                FailureKind::Result,
                format!("{path}.abnormal_flag"),
                format!(
                    "value set to {}, but abnormal_flag is specified; it can only be overridden when the value is not random",
                    result.value
                ),
            );
        }
        return;
    }

    match result.value_type() {
        Some(ValueType::Numerical) if result.unit.is_empty() => report.push(
            FailureKind::Result,
            format!("{path}.unit"),
            "unit missing for numerical value",
        ),
        Some(ValueType::Textual) if !result.unit.is_empty() && result.unit != EMPTY => {
            report.push(
                FailureKind::Result,
                format!("{path}.unit"),
                "textual value has a unit; a unit can only be specified for numerical values",
            )
        }
        _ => {}
    }
}

fn validate_against_profile(
    result: &TestResult,
    profile: Option<&OrderProfile>,
    path: &str,
    rng: &mut dyn RngCore,
    report: &mut ValidationReport,
) {
    let range = match profile {
        None => {
            if result.is_value_random() && result.reference_range.is_empty() {
                report.push(
                    FailureKind::Result,
                    format!("{path}.value"),
                    format!(
                        "value set to {}, but no order profile found and no custom reference range set",
                        result.value
                    ),
                );
            }
            (!result.reference_range.is_empty()).then_some(result.reference_range.as_str())
        }
        Some(profile) => {
            let Some(test_type) = profile.test_types.get(&result.test_name) else {
                report.push(
                    FailureKind::OrderProfile,
                    format!("{path}.test_name"),
                    format!(
                        "test type {:?} doesn't exist in the order profile {}",
                        result.test_name, profile.name
                    ),
                );
                return;
            };
            if !result.reference_range.is_empty() {
                Some(result.reference_range.as_str())
            } else if !test_type.ref_range.is_empty() {
                Some(test_type.ref_range.as_str())
            } else {
                None
            }
        }
    };

    match range {
        Some(range) => validate_value_in_range(result, range, path, rng, report),
        None if result.abnormal_flag == ABNORMAL_FLAG_DEFAULT => report.push(
            FailureKind::Result,
            format!("{path}.abnormal_flag"),
            "cannot derive abnormal flag if the reference range is not specified",
        ),
        None => {}
    }
}

/// Checks the value and its flag against a reference range.
fn validate_value_in_range(
    result: &TestResult,
    range: &str,
    path: &str,
    rng: &mut dyn RngCore,
    report: &mut ValidationReport,
) {
    let numerical = result.value_type() == Some(ValueType::Numerical);
    let parsed = match ValueRange::parse(range) {
        Ok(parsed) => parsed,
        Err(err) => {
            // Unparseable ranges such as "-" are fine as long as nothing has to be derived
            // from them.
            if numerical && !is_normal_flag(&result.abnormal_flag) {
                report.push(
                    FailureKind::Result,
                    format!("{path}.abnormal_flag"),
                    format!(
                        "cannot validate abnormal flag {} against the reference range for numerical value: {err}",
                        result.abnormal_flag
                    ),
                );
            }
            if result.is_value_random() {
                report.push(
                    FailureKind::Result,
                    format!("{path}.value"),
                    format!("cannot generate random value from invalid reference range {range:?}: {err}"),
                );
            }
            return;
        }
    };

    if let Some(kind) = RandomType::from_keyword(&result.value) {
        if let Err(err) = parsed.random(kind, rng) {
            report.push(
                FailureKind::Result,
                format!("{path}.value"),
                format!("cannot generate random value: {err}"),
            );
        }
        return;
    }
    if !numerical || result.abnormal_flag == ABNORMAL_FLAG_DEFAULT {
        return;
    }
    let Some((_, value)) = parse_value(&result.value) else {
        return;
    };
    let expected = if parsed.is_normal(value) && !is_normal_flag(&result.abnormal_flag) {
        Some(ABNORMAL_FLAG_NORMAL)
    } else if parsed.is_high(value) && result.abnormal_flag != ABNORMAL_FLAG_HIGH {
        Some(ABNORMAL_FLAG_HIGH)
    } else if parsed.is_low(value) && result.abnormal_flag != ABNORMAL_FLAG_LOW {
        Some(ABNORMAL_FLAG_LOW)
    } else {
        None
    };
    if let Some(expected) = expected {
        report.push(
            FailureKind::Result,
            format!("{path}.abnormal_flag"),
            format!(
                "abnormal flag {:?} doesn't match expected value of: {expected}",
                result.abnormal_flag
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{assert_failure, Fixture};
    use super::*;

    fn pathway_with_result(result: &str) -> String {
        format!(
            "pathway:\n  - result:\n      order_profile: UREA AND ELECTROLYTES\n      results:\n{result}"
        )
    }

    #[test]
    fn accepts_values_matching_their_flag() {
        let fixture = Fixture::new();
        let yaml = pathway_with_result(
            r#"        - test_name: Creatinine
          value: "120"
          unit: UMOLL
          abnormal_flag: HIGH
        - test_name: Potassium
          value: NORMAL
        - test_name: Comment
          value: Haemolysed sample
        - test_name: Creatinine
          value: "30"
          unit: UMOLL
          abnormal_flag: DEFAULT
"#,
        );
        fixture.validate(&yaml).expect("valid results");
    }

    #[test]
    fn rejects_flag_contradicting_range() {
        let yaml = pathway_with_result(
            r#"        - test_name: Creatinine
          value: "60"
          unit: UMOLL
          abnormal_flag: LOW
        - test_name: Potassium
          value: "9.1"
          unit: MMOLL
"#,
        );
        let report = Fixture::new().validate(&yaml).expect_err("flags mismatch");
        assert_failure(&report, FailureKind::Result, "results[0].abnormal_flag");
        assert_failure(&report, FailureKind::Result, "expected value of: NORMAL");
        assert_failure(&report, FailureKind::Result, "expected value of: HIGH");
    }

    #[test]
    fn checks_value_and_unit_rules() {
        let yaml = pathway_with_result(
            r#"        - test_name: Creatinine
          value: "60"
        - test_name: Comment
          value: Haemolysed
          unit: UMOLL
        - test_name: Potassium
          value: ABNORMAL_HIGH
          abnormal_flag: HIGH
        - test_name: Potassium
          value: ""
        - value: "4"
          unit: MMOLL
"#,
        );
        let report = Fixture::new().validate(&yaml).expect_err("bad values");
        assert_failure(&report, FailureKind::Result, "unit missing for numerical value");
        assert_failure(&report, FailureKind::Result, "textual value has a unit");
        assert_failure(&report, FailureKind::Result, "it can only be overridden");
        assert_failure(&report, FailureKind::Result, "results[3].value: value is missing");
        assert_failure(&report, FailureKind::Result, "results[4].test_name");
    }

    #[test]
    fn test_name_must_belong_to_profile() {
        let yaml = pathway_with_result(
            "        - test_name: Haemoglobin\n          value: \"130\"\n          unit: g/L\n",
        );
        let report = Fixture::new().validate(&yaml).expect_err("wrong profile");
        assert_failure(&report, FailureKind::OrderProfile, "doesn't exist in the order profile");
    }

    #[test]
    fn free_form_results_need_their_own_range() {
        let fixture = Fixture::new();
        let free_form = r#"
pathway:
  - result:
      order_profile: LOCAL PANEL
      results:
        - test_name: Lactate
          value: NORMAL
          unit: MMOLL
          reference_range: 0.5 - 2.2
        - test_name: Glucose
          value: "5.5"
          unit: MMOLL
"#;
        fixture.validate(free_form).expect("custom ranges");

        let no_range = r#"
pathway:
  - result:
      order_profile: LOCAL PANEL
      results:
        - test_name: Lactate
          value: ABNORMAL_LOW
        - test_name: Glucose
          value: "5.5"
          unit: MMOLL
          abnormal_flag: DEFAULT
"#;
        let report = fixture.validate(no_range).expect_err("nothing to derive from");
        assert_failure(&report, FailureKind::Result, "no custom reference range set");
        assert_failure(&report, FailureKind::Result, "reference range is not specified");
    }

    #[test]
    fn random_value_needs_generatable_range() {
        let yaml = r#"
pathway:
  - result:
      order_profile: LOCAL PANEL
      results:
        - test_name: Troponin
          value: ABNORMAL_LOW
          unit: NGL
          reference_range: "<14"
"#;
        let report = Fixture::new().validate(yaml).expect_err("open start");
        assert_failure(&report, FailureKind::Result, "cannot generate random value");
    }

    #[test]
    fn checks_results_fields() {
        let yaml = r#"
pathway:
  - result:
      order_profile: RANDOM
      order_status: A
      collected_datetime: yesterday
      trigger_event: r99
      results:
        - test_name: Creatinine
          value: NORMAL
  - result: {}
  - order: {}
"#;
        let report = Fixture::new().validate(yaml).expect_err("bad results");
        assert_failure(&report, FailureKind::Result, "results can only be specified");
        assert_failure(&report, FailureKind::Result, "both order_status and results_status");
        assert_failure(&report, FailureKind::Result, "invalid collected_datetime: yesterday");
        assert_failure(&report, FailureKind::Result, "invalid trigger_event: r99");
        assert_failure(&report, FailureKind::Result, "pathway[1].result");
        assert_failure(&report, FailureKind::Step, "pathway[2].order");
    }

    #[test]
    fn trigger_event_is_case_insensitive() {
        let yaml = "pathway:\n  - result:\n      order_profile: RANDOM\n      trigger_event: r03\n";
        Fixture::new().validate(yaml).expect("r03 is R03");
    }

    #[test]
    fn first_order_id_needs_profile() {
        let yaml = "pathway:\n  - order:\n      order_id: o1\n";
        let report = Fixture::new().validate(yaml).expect_err("no profile");
        assert_failure(&report, FailureKind::OrderProfile, "declared first time");
    }
}
