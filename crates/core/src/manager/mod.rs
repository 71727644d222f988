//! Strategies that pick the next pathway to run.

mod deterministic;
mod distribution;

pub use deterministic::DeterministicManager;
pub use distribution::{DistributionManager, DistributionPolicy};

use crate::collection::Collection;
use crate::pathway::Pathway;
use crate::PathwayResult;
use rand::RngCore;

pub trait PathwayManager: Send {
    /// The runnable form of the next pathway.
    fn next_pathway(&mut self, rng: &mut dyn RngCore) -> PathwayResult<Pathway>;

    /// Every pathway the manager may pick from.
    fn collection(&self) -> &Collection;
}
