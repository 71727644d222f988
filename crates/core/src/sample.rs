//! Weighted sampling over a fixed set of values.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Picks values with probability proportional to their integer weight.
///
/// Values with zero weight are never picked. A distribution without any positive weight
/// yields nothing.
#[derive(Clone, Debug)]
pub struct DiscreteDistribution<T> {
    values: Vec<T>,
    index: Option<WeightedIndex<u64>>,
}

impl<T> DiscreteDistribution<T> {
    pub fn new(weighted: impl IntoIterator<Item = (T, u64)>) -> Self {
        let (values, weights): (Vec<T>, Vec<u64>) = weighted
            .into_iter()
            .filter(|(_, weight)| *weight > 0)
            .unzip();
        let index = WeightedIndex::new(&weights).ok();
        Self { values, index }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_none()
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        let index = self.index.as_ref()?;
        self.values.get(index.sample(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn empty_or_zero_weights_yield_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        let empty = DiscreteDistribution::<&str>::new(Vec::new());
        assert!(empty.is_empty());
        assert!(empty.sample(&mut rng).is_none());

        let zero = DiscreteDistribution::new(vec![("a", 0), ("b", 0)]);
        assert!(zero.is_empty());
        assert!(zero.sample(&mut rng).is_none());
    }

    #[test]
    fn samples_proportionally() {
        let mut rng = StdRng::seed_from_u64(3);
        let dist = DiscreteDistribution::new(vec![("a", 3000), ("b", 1000), ("c", 0)]);
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..10_000 {
            *counts.entry(*dist.sample(&mut rng).unwrap()).or_default() += 1;
        }
        assert!(!counts.contains_key("c"));
        let a = counts["a"] as f64;
        assert!((a - 7500.0).abs() < 300.0, "a picked {a} times");
    }
}
