use rand::rngs::SmallRng;
use rand::Rng;

/// unordered multiset of sampled environment states approximating the
/// posterior over the true state. samples are owned; dropping the
/// belief drops them.
#[derive(Debug, Clone, Default)]
pub struct Belief<S> {
    samples: Vec<S>,
}

impl<S: Clone> Belief<S> {
    pub fn new() -> Self {
        Self { samples: vec![] }
    }

    /// take ownership of a sample
    pub fn add(&mut self, sample: S) {
        self.samples.push(sample);
    }

    pub fn get(&self, index: usize) -> &S {
        &self.samples[index]
    }

    /// fresh owned copy of a uniformly random sample
    pub fn sample(&self, rng: &mut SmallRng) -> S {
        assert!(!self.samples.is_empty(), "sampling an empty belief");
        self.samples[rng.random_range(0..self.samples.len())].clone()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// replace our samples with deep copies of another belief's
    pub fn copy_from(&mut self, other: &Self) {
        self.samples = other.samples.clone();
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn owns_and_samples() {
        let mut belief = Belief::new();
        belief.add(7u32);
        belief.add(9u32);
        let mut rng = SmallRng::seed_from_u64(0);
        let drawn = belief.sample(&mut rng);
        assert!(drawn == 7 || drawn == 9);
        assert_eq!(belief.len(), 2);
    }

    #[test]
    fn copy_from_is_deep() {
        let mut a = Belief::new();
        a.add(vec![1, 2, 3]);
        let mut b = Belief::new();
        b.copy_from(&a);
        a.clear();
        assert_eq!(b.len(), 1);
        assert_eq!(b.get(0), &vec![1, 2, 3]);
    }

    #[test]
    #[should_panic]
    fn empty_sample_panics() {
        let belief: Belief<u8> = Belief::new();
        let mut rng = SmallRng::seed_from_u64(0);
        belief.sample(&mut rng);
    }
}
