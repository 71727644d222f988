use super::PathwayManager;
use crate::collection::Collection;
use crate::constants::{DEFAULT_PERCENTAGE, TOTAL_PERCENTAGE};
use crate::pathway::Pathway;
use crate::sample::DiscreteDistribution;
use crate::{PathwayError, PathwayResult};
use pathsim_types::{Percentage, MAX_SIGNIFICANT_DIGITS};
use rand::RngCore;
use regex::Regex;
use std::collections::HashMap;

/// How pathways without an explicit `percentage_of_patients` are weighted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistributionPolicy {
    /// Used for each such pathway when the explicit percentages already reach 100.
    pub default_percentage: Percentage,
}

impl Default for DistributionPolicy {
    fn default() -> Self {
        Self {
            default_percentage: DEFAULT_PERCENTAGE,
        }
    }
}

/// Picks pathways at random, weighted by their `percentage_of_patients`.
///
/// Pathways without a percentage share what is left of 100% evenly. Pathways with a zero
/// percentage, or filtered out by the include and exclude patterns, are never picked but can
/// still be looked up in the collection.
#[derive(Debug)]
pub struct DistributionManager {
    collection: Collection,
    distribution: DiscreteDistribution<String>,
    percentages: HashMap<String, f64>,
}

impl DistributionManager {
    /// # Errors
    ///
    /// Returns [`PathwayError::InvalidRegex`] if an include or exclude pattern doesn't compile.
    pub fn new(
        pathways: HashMap<String, Pathway>,
        include: &[String],
        exclude: &[String],
        policy: &DistributionPolicy,
    ) -> PathwayResult<Self> {
        let include = to_regexes(include)?;
        let exclude = to_regexes(exclude)?;
        let collection = Collection::new(pathways);

        let mut percentages = HashMap::new();
        let mut weighted = Vec::new();
        let mut accumulated = 0.0;
        // Pathways without an explicit percentage share the budget left at the end.
        let mut without_percentage = Vec::new();

        for (name, pathway) in collection.pathways() {
            let disabled = (!include.is_empty() && !matches_any(name, &include))
                || matches_any(name, &exclude);
            if disabled {
                tracing::debug!(pathway_name = name, "Pathway disabled");
                percentages.insert(name.to_owned(), 0.0);
                continue;
            }
            match pathway.percentage {
                None => without_percentage.push(name.to_owned()),
                Some(p) if p.value() > 0.0 => {
                    accumulated += p.value();
                    weighted.push((name.to_owned(), weight(p.value())));
                    percentages.insert(name.to_owned(), p.value());
                }
                Some(_) => {
                    percentages.insert(name.to_owned(), 0.0);
                }
            }
        }

        if !without_percentage.is_empty() {
            let remaining = TOTAL_PERCENTAGE - accumulated;
            let per_pathway = budget_per_pathway(remaining, without_percentage.len(), policy);
            tracing::info!(
                "Setting pathway frequency {per_pathway}% for {} pathways without explicit percentage_of_patients: {without_percentage:?}",
                without_percentage.len()
            );
            for name in without_percentage {
                accumulated += per_pathway;
                weighted.push((name.clone(), weight(per_pathway)));
                percentages.insert(name, per_pathway);
            }
        }
        tracing::info!(
            "Accumulated percentage_of_patients is {accumulated:.3}. The closer to 100, the closer the actual distribution will be to the pathways' percentage_of_patients"
        );

        let manager = Self {
            collection,
            distribution: DiscreteDistribution::new(weighted),
            percentages,
        };
        manager.log_summary();
        Ok(manager)
    }

    /// The effective percentage of every pathway; zero for pathways that never run.
    pub fn percentage(&self, name: &str) -> Option<f64> {
        self.percentages.get(name).copied()
    }

    fn log_summary(&self) {
        let suffixes = self
            .collection
            .pathway_names()
            .map(|name| {
                let suffix = match self.percentage(name) {
                    Some(p) if p != 0.0 => format!(" (percentage={p})"),
                    _ => " (percentage=0; this pathway will not be run)".to_owned(),
                };
                (name.to_owned(), suffix)
            })
            .collect();
        self.collection.log_summary(&suffixes);
    }
}

impl PathwayManager for DistributionManager {
    fn next_pathway(&mut self, rng: &mut dyn RngCore) -> PathwayResult<Pathway> {
        if self.distribution.is_empty() {
            return Err(PathwayError::AllPathwaysDisabled);
        }
        let name = self
            .distribution
            .sample(rng)
            .ok_or(PathwayError::AllPathwaysDisabled)?;
        self.collection.get_pathway(name, rng)
    }

    fn collection(&self) -> &Collection {
        &self.collection
    }
}

/// Integer weight for the sampler, keeping every significant decimal.
fn weight(percentage: f64) -> u64 {
    let scale = 10_f64.powi(MAX_SIGNIFICANT_DIGITS as i32);
    (percentage * scale).round() as u64
}

fn round_percentage(p: f64) -> f64 {
    let scale = 10_f64.powi(MAX_SIGNIFICANT_DIGITS as i32);
    (p * scale).round() / scale
}

/// Splits what is left of the budget evenly, falling back to the policy's default when
/// nothing is left.
fn budget_per_pathway(remaining: f64, n: usize, policy: &DistributionPolicy) -> f64 {
    let per_pathway = remaining / n as f64;
    if per_pathway <= 0.0 {
        let default = policy.default_percentage.value();
        tracing::warn!(
            "Cannot split remaining percentage budget {remaining:.3} among {n} pathways, invalid percentage per pathway: {per_pathway}. Setting default percentage: {default}%"
        );
        return round_percentage(default);
    }
    round_percentage(per_pathway)
}

/// Compiles the patterns anchored at both ends, so that they match whole names.
fn to_regexes(patterns: &[String]) -> PathwayResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            let mut anchored = pattern.clone();
            if !anchored.starts_with('^') {
                anchored.insert(0, '^');
            }
            if !anchored.ends_with('$') {
                anchored.push('$');
            }
            Regex::new(&anchored).map_err(|source| PathwayError::InvalidRegex {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

fn matches_any(name: &str, regexes: &[Regex]) -> bool {
    regexes.iter().any(|re| re.is_match(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::pathways;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn counts(manager: &mut DistributionManager, draws: usize) -> HashMap<String, usize> {
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts = HashMap::new();
        for _ in 0..draws {
            let pathway = manager.next_pathway(&mut rng).expect("a pathway");
            *counts.entry(pathway.name().to_owned()).or_default() += 1;
        }
        counts
    }

    #[test]
    fn follows_explicit_percentages() {
        let mut manager = DistributionManager::new(
            pathways(&[("p1", Some(80.0)), ("p2", Some(20.0)), ("off", Some(0.0))]),
            &[],
            &[],
            &DistributionPolicy::default(),
        )
        .unwrap();

        let counts = counts(&mut manager, 10_000);

        let p1 = counts.get("p1").copied().unwrap_or_default() as f64;
        let p2 = counts.get("p2").copied().unwrap_or_default() as f64;
        assert!((p1 - 8000.0).abs() <= 100.0, "p1 picked {p1} times");
        assert!((p2 - 2000.0).abs() <= 100.0, "p2 picked {p2} times");
        assert!(!counts.contains_key("off"));
        assert_eq!(manager.percentage("off"), Some(0.0));
    }

    #[test]
    fn shares_remaining_budget() {
        let manager = DistributionManager::new(
            pathways(&[("a", Some(40.0)), ("b", None), ("c", None), ("d", None)]),
            &[],
            &[],
            &DistributionPolicy::default(),
        )
        .unwrap();
        assert_eq!(manager.percentage("b"), Some(20.0));
        assert_eq!(manager.percentage("d"), Some(20.0));

        let thirds = DistributionManager::new(
            pathways(&[("a", None), ("b", None), ("c", None)]),
            &[],
            &[],
            &DistributionPolicy::default(),
        )
        .unwrap();
        assert_eq!(thirds.percentage("a"), Some(33.333));
    }

    #[test]
    fn over_subscription_falls_back_to_policy() {
        let policy = DistributionPolicy {
            default_percentage: Percentage::new(2.5).unwrap(),
        };
        let manager = DistributionManager::new(
            pathways(&[("a", Some(70.0)), ("b", Some(30.0)), ("c", None)]),
            &[],
            &[],
            &policy,
        )
        .unwrap();
        assert_eq!(manager.percentage("c"), Some(2.5));
    }

    #[test]
    fn filters_by_anchored_patterns() {
        let mut manager = DistributionManager::new(
            pathways(&[("renal_admission", None), ("renal", None), ("ed_visit", None)]),
            &["renal.*".to_owned()],
            &["^renal$".to_owned()],
            &DistributionPolicy::default(),
        )
        .unwrap();

        let counts = counts(&mut manager, 200);

        assert_eq!(counts.get("renal_admission"), Some(&200));
        assert_eq!(manager.percentage("ed_visit"), Some(0.0));
        assert_eq!(manager.percentage("renal"), Some(0.0));
        assert!(manager.collection().resolve("ed_visit").is_ok());
    }

    #[test]
    fn all_disabled_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut manager = DistributionManager::new(
            pathways(&[("a", Some(0.0))]),
            &[],
            &[],
            &DistributionPolicy::default(),
        )
        .unwrap();
        let err = manager.next_pathway(&mut rng).expect_err("nothing to run");
        assert!(matches!(err, PathwayError::AllPathwaysDisabled));
    }

    #[test]
    fn rejects_invalid_pattern() {
        let err = DistributionManager::new(
            pathways(&[("a", None)]),
            &["(".to_owned()],
            &[],
            &DistributionPolicy::default(),
        )
        .expect_err("bad regex");
        assert!(matches!(err, PathwayError::InvalidRegex { pattern, .. } if pattern == "("));
    }
}
