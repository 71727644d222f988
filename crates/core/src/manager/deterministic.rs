use super::PathwayManager;
use crate::collection::Collection;
use crate::pathway::Pathway;
use crate::{PathwayError, PathwayResult};
use rand::RngCore;
use std::collections::HashMap;

/// Runs pathways in a fixed order, starting over after the last one.
#[derive(Debug)]
pub struct DeterministicManager {
    collection: Collection,
    order: Vec<String>,
    next: usize,
}

impl DeterministicManager {
    /// # Errors
    ///
    /// Returns [`PathwayError::EmptyOrder`] if `order` is empty and
    /// [`PathwayError::UnknownPathway`] if it names a pathway that isn't in `pathways`.
    pub fn new(pathways: HashMap<String, Pathway>, order: Vec<String>) -> PathwayResult<Self> {
        let collection = Collection::new(pathways);
        if order.is_empty() {
            return Err(PathwayError::EmptyOrder);
        }
        if let Some(unknown) = order.iter().find(|name| !collection.contains(name)) {
            return Err(PathwayError::UnknownPathway(unknown.clone()));
        }
        collection.log_summary(&HashMap::new());
        tracing::info!("Pathways will be run in the following order: {order:?}");
        Ok(Self {
            collection,
            order,
            next: 0,
        })
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }
}

impl PathwayManager for DeterministicManager {
    fn next_pathway(&mut self, rng: &mut dyn RngCore) -> PathwayResult<Pathway> {
        let name = &self.order[self.next];
        self.next = (self.next + 1) % self.order.len();
        self.collection.get_pathway(name, rng)
    }

    fn collection(&self) -> &Collection {
        &self.collection
    }
}
