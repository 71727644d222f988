//! Wiring of the engine from a [`CoreConfig`].

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::doctors::Doctors;
use crate::locations::LocationManager;
use crate::manager::{DeterministicManager, DistributionManager, PathwayManager};
use crate::order_profile::OrderProfiles;
use crate::parser::Parser;
use crate::pathway::Pathway;
use crate::validation::Validator;
use crate::PathwayResult;
use rand::RngCore;
use std::collections::HashMap;

/// The hospital's registries that pathways are validated against.
#[derive(Clone, Debug)]
pub struct Resources {
    pub doctors: Doctors,
    pub locations: LocationManager,
    pub order_profiles: OrderProfiles,
}

impl Resources {
    /// Loads every registry file named in the configuration.
    pub fn load(config: &CoreConfig) -> PathwayResult<Self> {
        Ok(Self {
            doctors: Doctors::load(config.doctors_file())?,
            locations: LocationManager::load(config.locations_file())?,
            order_profiles: OrderProfiles::load(
                config.order_profiles_file(),
                config.coding_system(),
            )?,
        })
    }

    pub fn validator<'a>(&'a self, clock: &'a dyn Clock) -> Validator<'a> {
        Validator::new(clock, &self.order_profiles, &self.doctors, &self.locations)
    }

    /// Parses and validates every pathway in the configured directory.
    pub fn load_pathways(
        &self,
        config: &CoreConfig,
        clock: &dyn Clock,
        rng: &mut dyn RngCore,
    ) -> PathwayResult<HashMap<String, Pathway>> {
        Parser::new(self.validator(clock)).parse_dir(config.pathways_dir(), rng)
    }
}

/// The deterministic manager when an order is configured, the distribution otherwise.
pub fn build_manager(
    config: &CoreConfig,
    pathways: HashMap<String, Pathway>,
) -> PathwayResult<Box<dyn PathwayManager>> {
    match config.order() {
        Some(order) => Ok(Box::new(DeterministicManager::new(
            pathways,
            order.to_vec(),
        )?)),
        None => Ok(Box::new(DistributionManager::new(
            pathways,
            config.include(),
            config.exclude(),
            &config.distribution_policy(),
        )?)),
    }
}
