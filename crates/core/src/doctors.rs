//! Registry of the doctors that can act as consultants.

use crate::{PathwayError, PathwayResult};
use pathsim_types::NonEmptyText;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Doctor {
    pub id: String,
    pub surname: String,
    pub first_name: String,
    pub prefix: String,
    pub specialty: String,
}

/// Every field of a doctor entry is required and non-empty.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DoctorWire {
    id: NonEmptyText,
    surname: NonEmptyText,
    first_name: NonEmptyText,
    prefix: NonEmptyText,
    specialty: NonEmptyText,
}

impl From<DoctorWire> for Doctor {
    fn from(wire: DoctorWire) -> Self {
        Self {
            id: wire.id.to_string(),
            surname: wire.surname.to_string(),
            first_name: wire.first_name.to_string(),
            prefix: wire.prefix.to_string(),
            specialty: wire.specialty.to_string(),
        }
    }
}

/// Lookup used to resolve pathway consultants.
pub trait DoctorRegistry: Send + Sync {
    fn get_by_id(&self, id: &str) -> Option<&Doctor>;
    fn get_by_name(&self, first_name: &str, surname: &str) -> Option<&Doctor>;
}

#[derive(Clone, Debug, Default)]
pub struct Doctors {
    by_id: HashMap<String, Doctor>,
    /// Insertion order, so random picks are reproducible under a seeded generator.
    ids: Vec<String>,
}

impl Doctors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> PathwayResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PathwayError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let doctors = Self::from_yaml(&text)?;
        tracing::info!(file = %path.display(), count = doctors.len(), "Loaded doctors");
        Ok(doctors)
    }

    /// Parses a YAML list of doctors.
    pub fn from_yaml(yaml_text: &str) -> PathwayResult<Self> {
        let wire: Vec<DoctorWire> = crate::parser::decode_yaml(yaml_text, "Doctors")
            .map_err(|e| PathwayError::InvalidDoctor(e.to_string()))?;
        let mut doctors = Self::new();
        for doctor in wire {
            doctors.add(doctor.into())?;
        }
        Ok(doctors)
    }

    /// Adds a doctor.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::DuplicateDoctor`] if a doctor with the same ID exists.
    pub fn add(&mut self, doctor: Doctor) -> PathwayResult<()> {
        if self.by_id.contains_key(&doctor.id) {
            return Err(PathwayError::DuplicateDoctor(doctor.id));
        }
        self.ids.push(doctor.id.clone());
        self.by_id.insert(doctor.id.clone(), doctor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn random_doctor<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Doctor> {
        if self.ids.is_empty() {
            return None;
        }
        let id = &self.ids[rng.gen_range(0..self.ids.len())];
        self.by_id.get(id)
    }
}

impl DoctorRegistry for Doctors {
    fn get_by_id(&self, id: &str) -> Option<&Doctor> {
        self.by_id.get(id)
    }

    fn get_by_name(&self, first_name: &str, surname: &str) -> Option<&Doctor> {
        self.ids
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .find(|d| d.first_name == first_name && d.surname == surname)
    }
}
