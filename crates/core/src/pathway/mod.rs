//! The pathway data model.
//!
//! A [`Pathway`] is a template of a simulated patient's events. It is decoded from a file,
//! initialised with [`Pathway::init`], validated once, and then turned into a concrete
//! schedule with [`Pathway::runnable`] every time it runs.

pub mod events;
pub mod person;
pub mod results;
mod runnable;
pub mod step;
pub mod time;

use crate::{PathwayError, PathwayResult};
use pathsim_types::Percentage;
use person::Persons;
use serde::{Deserialize, Serialize};
use step::{Step, StepKind};

/// The consultant used whenever the pathway needs one.
///
/// Either `id`, or `first_name` and `surname`, must be given. Validation fills in the rest
/// from the doctors registry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Consultant {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub prefix: Option<String>,
}

/// Derived on initialisation, never written by authors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Metadata {
    name: String,
    message_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pathway {
    #[serde(
        rename = "percentage_of_patients",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub percentage: Option<Percentage>,
    /// Always present once the pathway has been initialised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persons: Option<Persons>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultant: Option<Consultant>,
    #[serde(default)]
    pub pathway: Vec<Step>,
    #[serde(
        rename = "historical_data",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub history: Vec<Step>,
    #[serde(skip)]
    metadata: Option<Metadata>,
}

impl Pathway {
    /// Sets the name, adds the default person when none is declared and recounts messages.
    ///
    /// Calling it again recomputes everything from scratch.
    pub fn init(&mut self, name: &str) {
        if self.persons.is_none() {
            self.persons = Some(Persons::default_single());
        }
        let message_count = self
            .history
            .iter()
            .chain(self.pathway.iter())
            .map(Step::message_count)
            .sum();
        self.metadata = Some(Metadata {
            name: name.to_owned(),
            message_count,
        });
    }

    pub fn is_initialised(&self) -> bool {
        self.metadata.is_some()
    }

    /// The name given at initialisation; empty before that.
    pub fn name(&self) -> &str {
        self.metadata.as_ref().map_or("", |m| m.name.as_str())
    }

    pub fn set_name(&mut self, name: &str) {
        self.metadata.get_or_insert_with(Metadata::default).name = name.to_owned();
    }

    /// Number of messages the pathway generates.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::NotInitialised`] before [`Pathway::init`].
    pub fn message_count(&self) -> PathwayResult<usize> {
        match &self.metadata {
            Some(m) => Ok(m.message_count),
            None => {
                tracing::error!("Pathway hasn't been initialised");
                Err(PathwayError::NotInitialised(format!(
                    "with {} steps",
                    self.history.len() + self.pathway.len()
                )))
            }
        }
    }

    /// Whether the persons section was written by the author rather than defaulted.
    pub fn has_persons_defined(&self) -> bool {
        self.persons
            .as_ref()
            .is_some_and(|p| !p.is_empty() && !p.is_default())
    }

    pub fn has_auto_generate(&self) -> bool {
        self.pathway
            .iter()
            .any(|s| matches!(s.kind, StepKind::AutoGenerate(_)))
    }

    /// History followed by the pathway.
    pub fn all_steps(&self) -> impl Iterator<Item = &Step> {
        self.history.iter().chain(self.pathway.iter())
    }
}
