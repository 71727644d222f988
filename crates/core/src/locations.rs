//! Points of care known to the hospital.

use crate::constants::A_AND_E_LOCATION;
use crate::{PathwayError, PathwayResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Where a patient is, as reported by the message feed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientLocation {
    pub poc: String,
    pub room: String,
    pub bed: String,
    pub facility: String,
    pub location_type: String,
    pub building: String,
    pub floor: String,
}

/// One point of care and its beds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoomManager {
    pub poc: String,
    pub facility: String,
    pub building: String,
    pub floor: String,
    pub room: String,
    #[serde(rename = "type")]
    pub location_type: String,
    pub beds: Vec<String>,
}

impl RoomManager {
    fn is_at(&self, location: &PatientLocation) -> bool {
        self.poc == location.poc
            && self.facility == location.facility
            && self.building == location.building
            && self.floor == location.floor
            && self.room == location.room
    }
}

pub trait LocationRegistry: Send + Sync {
    fn contains(&self, name: &str) -> bool;

    /// Known location names, sorted.
    fn names(&self) -> Vec<&str>;
}

#[derive(Clone, Debug, Default)]
pub struct LocationManager {
    room_managers: BTreeMap<String, RoomManager>,
}

impl LocationManager {
    pub fn new(room_managers: BTreeMap<String, RoomManager>) -> Self {
        Self { room_managers }
    }

    pub fn load(path: &Path) -> PathwayResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PathwayError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let manager = Self::from_yaml(&text)?;
        tracing::info!(file = %path.display(), count = manager.room_managers.len(), "Loaded locations");
        Ok(manager)
    }

    /// Parses a YAML map of location name to room manager. The `ED` location is required.
    pub fn from_yaml(yaml_text: &str) -> PathwayResult<Self> {
        let mut room_managers: BTreeMap<String, RoomManager> =
            crate::parser::decode_yaml(yaml_text, "Locations")?;
        if !room_managers.contains_key(A_AND_E_LOCATION) {
            return Err(PathwayError::InvalidLocations(format!(
                "no {A_AND_E_LOCATION} location found; it is required"
            )));
        }
        for rm in room_managers.values_mut() {
            if rm.location_type.is_empty() {
                rm.location_type = "BED".into();
            }
        }
        Ok(Self { room_managers })
    }

    pub fn room_managers(&self) -> &BTreeMap<String, RoomManager> {
        &self.room_managers
    }

    /// Whether `location` is the point of care registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::UnknownLocation`] if `name` isn't registered.
    pub fn matches(&self, name: &str, location: &PatientLocation) -> PathwayResult<bool> {
        self.room_managers
            .get(name)
            .map(|rm| rm.is_at(location))
            .ok_or_else(|| PathwayError::UnknownLocation(name.to_owned()))
    }
}

impl LocationRegistry for LocationManager {
    fn contains(&self, name: &str) -> bool {
        self.room_managers.contains_key(name)
    }

    fn names(&self) -> Vec<&str> {
        self.room_managers.keys().map(String::as_str).collect()
    }
}
