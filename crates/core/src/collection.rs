//! Name-keyed registry of initialised pathway templates.

use crate::pathway::Pathway;
use crate::{PathwayError, PathwayResult};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};

/// Pathways by name, iterated in name order.
#[derive(Clone, Debug, Default)]
pub struct Collection {
    pathways: BTreeMap<String, Pathway>,
}

impl Collection {
    /// Initialises every pathway under its map key.
    pub fn new(pathways: HashMap<String, Pathway>) -> Self {
        let pathways = pathways
            .into_iter()
            .map(|(name, mut pathway)| {
                pathway.init(&name);
                (name, pathway)
            })
            .collect();
        Self { pathways }
    }

    pub fn len(&self) -> usize {
        self.pathways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pathways.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pathways.contains_key(name)
    }

    /// Pathway names in alphabetical order.
    pub fn pathway_names(&self) -> impl Iterator<Item = &str> {
        self.pathways.keys().map(String::as_str)
    }

    pub fn pathways(&self) -> impl Iterator<Item = (&str, &Pathway)> {
        self.pathways.iter().map(|(name, p)| (name.as_str(), p))
    }

    /// The template registered under `name`.
    pub fn resolve(&self, name: &str) -> PathwayResult<&Pathway> {
        self.pathways
            .get(name)
            .ok_or_else(|| PathwayError::UnknownPathway(name.to_owned()))
    }

    /// The runnable form of the pathway registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::UnknownPathway`] for unknown names and
    /// [`PathwayError::Resolution`] if the pathway cannot be expanded.
    pub fn get_pathway<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> PathwayResult<Pathway> {
        self.resolve(name)?.runnable(rng).map_err(|err| match err {
            PathwayError::Resolution(msg) => {
                PathwayError::Resolution(format!("pathway {name} is not runnable: {msg}"))
            }
            other => other,
        })
    }

    /// Logs the pathway names, each followed by its suffix if any.
    pub fn log_summary(&self, suffixes: &HashMap<String, String>) {
        tracing::info!("Loaded {} pathways:", self.pathways.len());
        for name in self.pathways.keys() {
            let suffix = suffixes.get(name).map(String::as_str).unwrap_or_default();
            tracing::info!(" - {name}{suffix}");
        }
    }
}
