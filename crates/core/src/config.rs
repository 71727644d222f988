//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the engine. Library
//! code never reads environment variables; the `*_from_env_value` helpers only parse values the
//! binaries have already read.

use crate::constants::{DEFAULT_CODING_SYSTEM, DEFAULT_PERCENTAGE};
use crate::manager::DistributionPolicy;
use crate::{PathwayError, PathwayResult};
use pathsim_types::Percentage;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    pathways_dir: PathBuf,
    doctors_file: PathBuf,
    locations_file: PathBuf,
    order_profiles_file: PathBuf,
    coding_system: String,
    include: Vec<String>,
    exclude: Vec<String>,
    order: Option<Vec<String>>,
    default_percentage: Percentage,
    seed: Option<u64>,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with no selection filters, the default coding system and
    /// percentage, and an entropy-seeded generator.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::InvalidInput`] if `pathways_dir` is not a directory or one of the
    /// registry files doesn't exist.
    pub fn new(
        pathways_dir: PathBuf,
        doctors_file: PathBuf,
        locations_file: PathBuf,
        order_profiles_file: PathBuf,
    ) -> PathwayResult<Self> {
        if !pathways_dir.is_dir() {
            return Err(PathwayError::InvalidInput(format!(
                "pathways directory {} is not a directory",
                pathways_dir.display()
            )));
        }
        for (what, file) in [
            ("doctors", &doctors_file),
            ("locations", &locations_file),
            ("order profiles", &order_profiles_file),
        ] {
            if !file.is_file() {
                return Err(PathwayError::InvalidInput(format!(
                    "{what} file {} does not exist",
                    file.display()
                )));
            }
        }

        Ok(Self {
            pathways_dir,
            doctors_file,
            locations_file,
            order_profiles_file,
            coding_system: DEFAULT_CODING_SYSTEM.to_owned(),
            include: Vec::new(),
            exclude: Vec::new(),
            order: None,
            default_percentage: DEFAULT_PERCENTAGE,
            seed: None,
        })
    }

    /// Restrict the distribution to pathways matching `include` and not matching `exclude`.
    pub fn with_filters(mut self, include: Vec<String>, exclude: Vec<String>) -> Self {
        self.include = include;
        self.exclude = exclude;
        self
    }

    /// Run the named pathways in this order, cycling, instead of drawing them at random.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::EmptyOrder`] if `order` has no elements.
    pub fn with_order(mut self, order: Vec<String>) -> PathwayResult<Self> {
        if order.is_empty() {
            return Err(PathwayError::EmptyOrder);
        }
        self.order = Some(order);
        Ok(self)
    }

    pub fn with_default_percentage(mut self, default_percentage: Percentage) -> Self {
        self.default_percentage = default_percentage;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_coding_system(mut self, coding_system: String) -> PathwayResult<Self> {
        if coding_system.trim().is_empty() {
            return Err(PathwayError::InvalidInput(
                "coding_system cannot be empty".into(),
            ));
        }
        self.coding_system = coding_system;
        Ok(self)
    }

    pub fn pathways_dir(&self) -> &Path {
        &self.pathways_dir
    }

    pub fn doctors_file(&self) -> &Path {
        &self.doctors_file
    }

    pub fn locations_file(&self) -> &Path {
        &self.locations_file
    }

    pub fn order_profiles_file(&self) -> &Path {
        &self.order_profiles_file
    }

    pub fn coding_system(&self) -> &str {
        &self.coding_system
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn order(&self) -> Option<&[String]> {
        self.order.as_deref()
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn distribution_policy(&self) -> DistributionPolicy {
        DistributionPolicy {
            default_percentage: self.default_percentage,
        }
    }
}

/// Split a comma separated list, dropping blank entries.
pub fn list_from_env_value(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse the default percentage, falling back to 1% when unset or blank.
pub fn default_percentage_from_env_value(value: Option<String>) -> PathwayResult<Percentage> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let Some(value) = value else {
        return Ok(DEFAULT_PERCENTAGE);
    };
    let parsed = value.parse::<f64>().map_err(|e| {
        PathwayError::InvalidInput(format!("invalid default percentage {value:?}: {e}"))
    })?;
    Ok(Percentage::new(parsed)?)
}

/// Parse an optional RNG seed; unset or blank means "seed from entropy".
pub fn seed_from_env_value(value: Option<String>) -> PathwayResult<Option<u64>> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<u64>()
                .map_err(|e| PathwayError::InvalidInput(format!("invalid seed {v:?}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> PathwayResult<CoreConfig> {
        let root = dir.path();
        std::fs::create_dir(root.join("pathways")).unwrap();
        for file in ["doctors.yml", "locations.yml", "order_profiles.yml"] {
            std::fs::write(root.join(file), "").unwrap();
        }
        CoreConfig::new(
            root.join("pathways"),
            root.join("doctors.yml"),
            root.join("locations.yml"),
            root.join("order_profiles.yml"),
        )
    }

    #[test]
    fn new_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir).expect("valid config");
        assert_eq!(config.coding_system(), DEFAULT_CODING_SYSTEM);
        assert!(config.include().is_empty());
        assert!(config.order().is_none());
        assert_eq!(config.seed(), None);
        assert_eq!(config.distribution_policy(), DistributionPolicy::default());
    }

    #[test]
    fn new_rejects_missing_paths() {
        let dir = TempDir::new().unwrap();
        let err = CoreConfig::new(
            dir.path().join("nope"),
            dir.path().join("d"),
            dir.path().join("l"),
            dir.path().join("o"),
        )
        .expect_err("missing directory");
        assert!(matches!(err, PathwayError::InvalidInput(msg) if msg.contains("not a directory")));

        std::fs::create_dir(dir.path().join("p")).unwrap();
        let err = CoreConfig::new(
            dir.path().join("p"),
            dir.path().join("d"),
            dir.path().join("l"),
            dir.path().join("o"),
        )
        .expect_err("missing doctors file");
        assert!(matches!(err, PathwayError::InvalidInput(msg) if msg.contains("doctors file")));
    }

    #[test]
    fn empty_order_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = config_in(&dir).unwrap().with_order(vec![]).expect_err("empty order");
        assert!(matches!(err, PathwayError::EmptyOrder));
    }

    #[test]
    fn parses_env_values() {
        assert_eq!(
            list_from_env_value(Some(" a, b ,,c ".into())),
            vec!["a", "b", "c"]
        );
        assert!(list_from_env_value(None).is_empty());

        assert_eq!(default_percentage_from_env_value(None).unwrap().value(), 1.0);
        assert_eq!(
            default_percentage_from_env_value(Some("2.5".into())).unwrap().value(),
            2.5
        );
        assert!(default_percentage_from_env_value(Some("-1".into())).is_err());
        assert!(default_percentage_from_env_value(Some("lots".into())).is_err());

        assert_eq!(seed_from_env_value(Some(" 42 ".into())).unwrap(), Some(42));
        assert_eq!(seed_from_env_value(Some("".into())).unwrap(), None);
        assert!(seed_from_env_value(Some("x".into())).is_err());
    }
}
