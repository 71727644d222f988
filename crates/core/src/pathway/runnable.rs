//! Expansion of a pathway template into the schedule that actually runs.

use super::events::AutoGenerate;
use super::step::{Parameters, Step, StepKind};
use super::time::Delay;
use super::Pathway;
use crate::{PathwayError, PathwayResult};
use chrono::Duration;
use rand::Rng;

impl Pathway {
    /// Returns a copy of the pathway that is ready to run. The template is never modified.
    ///
    /// Every `autogenerate` step is replaced by the `result` steps it describes. Negative
    /// offsets land in the history, ordered by `time_from_now`; the rest are placed in the
    /// pathway at the matching point in time, which fixes the values of the delays that lead
    /// up to them.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::Resolution`] if an `autogenerate` window is malformed.
    pub fn runnable<R: Rng + ?Sized>(&self, rng: &mut R) -> PathwayResult<Pathway> {
        let mut runnable = self.clone();
        if !runnable.has_auto_generate() {
            return Ok(runnable);
        }

        let mut generators = Vec::new();
        let mut i = 0;
        while i < runnable.pathway.len() {
            if matches!(runnable.pathway[i].kind, StepKind::AutoGenerate(_)) {
                generators.push(runnable.pathway.remove(i));
            } else {
                i += 1;
            }
        }

        for step in generators {
            let StepKind::AutoGenerate(generator) = &step.kind else {
                continue;
            };
            let (from, to, every) = window(generator)?;
            let mut at = from;
            while at <= to {
                let result = Step {
                    kind: StepKind::Results(generator.effective_result()),
                    parameters: step.parameters.clone(),
                };
                runnable.insert_at_time(result, at, rng);
                match every {
                    Some(every) => at += every,
                    None => break,
                }
            }
        }
        Ok(runnable)
    }

    fn insert_at_time<R: Rng + ?Sized>(&mut self, step: Step, at: Duration, rng: &mut R) {
        if at < Duration::zero() {
            self.insert_in_history(step, at);
        } else {
            self.insert_in_pathway(step, at, rng);
        }
    }

    fn insert_in_history(&mut self, mut step: Step, at: Duration) {
        step.parameters
            .get_or_insert_with(Parameters::default)
            .time_from_now = Some(at);
        let index = self
            .history
            .iter()
            .position(|s| s.time_from_now().is_some_and(|t| t >= at))
            .unwrap_or(self.history.len());
        self.history.insert(index, step);
    }

    fn insert_in_pathway<R: Rng + ?Sized>(&mut self, step: Step, at: Duration, rng: &mut R) {
        let (mut index, elapsed) = self.index_at_time(at, rng);
        let diff = at - elapsed;

        if diff > Duration::zero() {
            self.pathway.insert(index, Step::delay(Delay::fixed(diff)));
            index += 1;
        } else if diff < Duration::zero() {
            // `at` falls inside the delay at `index`; split it around the new step.
            let delay = self.pathway[index].as_delay().map_or(Duration::zero(), |d| d.from);
            if diff != -delay {
                self.pathway[index] = Step::delay(Delay::fixed(delay + diff));
                index += 1;
                self.pathway.insert(index, Step::delay(Delay::fixed(-diff)));
            }
        }
        self.pathway.insert(index, step);
    }

    /// Walks the delays, fixing each to a drawn value, until the elapsed time reaches `at`.
    ///
    /// Returns the index to insert at and the elapsed time there: after a delay ending exactly
    /// at `at`, on a delay spanning past `at`, or past the end of the pathway.
    fn index_at_time<R: Rng + ?Sized>(&mut self, at: Duration, rng: &mut R) -> (usize, Duration) {
        let mut elapsed = Duration::zero();
        for (i, step) in self.pathway.iter_mut().enumerate() {
            let Some(delay) = step.as_delay() else {
                continue;
            };
            let drawn = delay.random(rng);
            step.kind = StepKind::Delay(Delay::fixed(drawn));
            elapsed += drawn;
            if elapsed == at {
                return (i + 1, elapsed);
            }
            if elapsed > at {
                return (i, elapsed);
            }
        }
        (self.pathway.len(), elapsed)
    }
}

fn window(generator: &AutoGenerate) -> PathwayResult<(Duration, Duration, Option<Duration>)> {
    let (Some(from), Some(to)) = (generator.from, generator.to) else {
        return Err(PathwayError::Resolution(
            "autogenerate requires both from and to".into(),
        ));
    };
    if from > to {
        return Err(PathwayError::Resolution(format!(
            "autogenerate from ({}) is after to ({})",
            pathsim_types::duration::format(&from),
            pathsim_types::duration::format(&to)
        )));
    }
    if let Some(every) = generator.every {
        if every <= Duration::zero() {
            return Err(PathwayError::Resolution(format!(
                "autogenerate every must be positive, got {}",
                pathsim_types::duration::format(&every)
            )));
        }
    }
    Ok((from, to, generator.every))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathway::events::{Admission, Discharge};
    use crate::pathway::results::Results;
    use crate::pathway::step::StepType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hours(h: i64) -> Duration {
        Duration::hours(h)
    }

    fn admission() -> Step {
        Step::new(StepKind::Admission(Admission {
            loc: "Renal".into(),
            ..Default::default()
        }))
    }

    fn discharge() -> Step {
        Step::new(StepKind::Discharge(Discharge::default()))
    }

    fn generator(from: Duration, to: Duration, every: Option<Duration>) -> Step {
        Step::new(StepKind::AutoGenerate(AutoGenerate {
            result: Some(Results {
                order_profile: "UREA AND ELECTROLYTES".into(),
                ..Default::default()
            }),
            from: Some(from),
            to: Some(to),
            every,
        }))
    }

    fn types(steps: &[Step]) -> Vec<StepType> {
        steps.iter().map(Step::step_type).collect()
    }

    fn fixed_delays(steps: &[Step]) -> Vec<Duration> {
        steps.iter().filter_map(|s| s.as_delay()).map(|d| d.from).collect()
    }

    #[test]
    fn runnable_leaves_template_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pathway = Pathway {
            pathway: vec![
                admission(),
                Step::delay(Delay::new(hours(1), hours(3))),
                generator(hours(0), hours(2), Some(hours(1))),
                discharge(),
            ],
            ..Default::default()
        };
        pathway.init("template");
        let before = pathway.clone();

        let runnable = pathway.runnable(&mut rng).unwrap();

        assert_eq!(pathway, before);
        assert_ne!(runnable, before);
        assert!(!runnable.has_auto_generate());
    }

    #[test]
    fn pathway_without_generators_is_copied() {
        let mut rng = StdRng::seed_from_u64(1);
        let pathway = Pathway {
            pathway: vec![admission(), Step::delay(Delay::new(hours(1), hours(3)))],
            ..Default::default()
        };
        assert_eq!(pathway.runnable(&mut rng).unwrap(), pathway);
    }

    #[test]
    fn splits_delay_around_generated_result() {
        let mut rng = StdRng::seed_from_u64(1);
        let pathway = Pathway {
            pathway: vec![
                admission(),
                Step::delay(Delay::fixed(hours(5))),
                generator(hours(2), hours(2), None),
                discharge(),
            ],
            ..Default::default()
        };

        let runnable = pathway.runnable(&mut rng).unwrap();

        assert_eq!(
            types(&runnable.pathway),
            vec![
                StepType::Admission,
                StepType::Delay,
                StepType::Results,
                StepType::Delay,
                StepType::Discharge
            ]
        );
        assert_eq!(fixed_delays(&runnable.pathway), vec![hours(2), hours(3)]);
    }

    #[test]
    fn result_lands_after_or_inside_random_delay() {
        let second = Duration::seconds(1);
        let template = Pathway {
            pathway: vec![
                admission(),
                Step::delay(Delay::new(Duration::zero(), Duration::seconds(2))),
                discharge(),
                generator(second, second, None),
            ],
            ..Default::default()
        };

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let runnable = template.runnable(&mut rng).unwrap();
            let drawn = fixed_delays(&runnable.pathway);
            let total: Duration = drawn.iter().fold(Duration::zero(), |acc, d| acc + *d);
            if drawn.len() == 2 && types(&runnable.pathway)[2] == StepType::Discharge {
                assert!(drawn[0] < second);
                assert_eq!(total, second);
                assert_eq!(
                    types(&runnable.pathway),
                    vec![
                        StepType::Admission,
                        StepType::Delay,
                        StepType::Discharge,
                        StepType::Delay,
                        StepType::Results
                    ]
                );
            } else if drawn.len() == 2 {
                assert_eq!(drawn[0], second);
                assert!(total < Duration::seconds(2));
                assert_eq!(
                    types(&runnable.pathway),
                    vec![
                        StepType::Admission,
                        StepType::Delay,
                        StepType::Results,
                        StepType::Delay,
                        StepType::Discharge
                    ]
                );
            } else {
                // Drawn exactly one second.
                assert_eq!(drawn, vec![second]);
                assert_eq!(types(&runnable.pathway)[2], StepType::Results);
            }
        }
    }

    #[test]
    fn generates_every_point_of_the_window() {
        let mut rng = StdRng::seed_from_u64(1);
        let pathway = Pathway {
            pathway: vec![admission(), generator(hours(0), hours(3), Some(hours(1)))],
            ..Default::default()
        };

        let runnable = pathway.runnable(&mut rng).unwrap();

        assert_eq!(
            types(&runnable.pathway),
            vec![
                StepType::Admission,
                StepType::Results,
                StepType::Delay,
                StepType::Results,
                StepType::Delay,
                StepType::Results,
                StepType::Delay,
                StepType::Results,
            ]
        );
        assert_eq!(fixed_delays(&runnable.pathway), vec![hours(1); 3]);
    }

    #[test]
    fn result_at_delay_boundary_is_placed_after_it() {
        let mut rng = StdRng::seed_from_u64(1);
        let pathway = Pathway {
            pathway: vec![
                Step::delay(Delay::fixed(hours(2))),
                discharge(),
                generator(hours(2), hours(2), None),
            ],
            ..Default::default()
        };

        let runnable = pathway.runnable(&mut rng).unwrap();

        assert_eq!(
            types(&runnable.pathway),
            vec![StepType::Delay, StepType::Results, StepType::Discharge]
        );
    }

    #[test]
    fn negative_offsets_go_to_history_in_time_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut existing = admission();
        existing.parameters = Some(Parameters {
            time_from_now: Some(hours(-3)),
            ..Default::default()
        });
        let pathway = Pathway {
            history: vec![existing],
            pathway: vec![generator(hours(-4), hours(-2), Some(hours(2))), discharge()],
            ..Default::default()
        };

        let runnable = pathway.runnable(&mut rng).unwrap();

        let offsets: Vec<_> = runnable.history.iter().map(Step::time_from_now).collect();
        assert_eq!(offsets, vec![Some(hours(-4)), Some(hours(-3)), Some(hours(-2))]);
        assert_eq!(
            types(&runnable.history),
            vec![StepType::Results, StepType::Admission, StepType::Results]
        );
        assert_eq!(types(&runnable.pathway), vec![StepType::Discharge]);
    }

    #[test]
    fn random_delays_are_fixed_up_to_generated_results() {
        let mut rng = StdRng::seed_from_u64(9);
        let pathway = Pathway {
            pathway: vec![
                Step::delay(Delay::new(hours(1), hours(2))),
                admission(),
                generator(hours(3), hours(3), None),
            ],
            ..Default::default()
        };

        let runnable = pathway.runnable(&mut rng).unwrap();

        let delays = fixed_delays(&runnable.pathway);
        assert_eq!(delays.len(), 2);
        assert!(delays[0] >= hours(1) && delays[0] < hours(2));
        assert_eq!(delays[0] + delays[1], hours(3));
        assert!(runnable.pathway.iter().all(|s| s.as_delay().map_or(true, Delay::is_fixed)));
    }

    #[test]
    fn rejects_malformed_window() {
        let mut rng = StdRng::seed_from_u64(1);
        let pathway = Pathway {
            pathway: vec![generator(hours(2), hours(1), None)],
            ..Default::default()
        };
        let err = pathway.runnable(&mut rng).expect_err("from after to");
        assert!(matches!(err, PathwayError::Resolution(msg) if msg.contains("from (2h) is after to (1h)")));

        let pathway = Pathway {
            pathway: vec![generator(hours(1), hours(2), Some(Duration::zero()))],
            ..Default::default()
        };
        let err = pathway.runnable(&mut rng).expect_err("zero step");
        assert!(matches!(err, PathwayError::Resolution(msg) if msg.contains("positive, got 0s")));
    }
}
