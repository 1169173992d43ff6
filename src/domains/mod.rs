pub mod grid;
pub mod mlu;
pub mod mwa;
pub mod rocksample;
pub mod twostate;

pub use mlu::Mlu;
pub use mwa::Mwa;
pub use rocksample::RockSample;
pub use twostate::TwoState;

use rand::rngs::SmallRng;
use rand::Rng;

/// sample an index from a discrete distribution. tolerates unnormalized
/// rows; a row with no mass is a modelling bug.
pub(crate) fn sample_index(probabilities: &[f64], rng: &mut SmallRng) -> usize {
    let total: f64 = probabilities.iter().sum();
    assert!(total > 0.0, "distribution has no mass");
    let mut draw = rng.random::<f64>() * total;
    for (index, p) in probabilities.iter().enumerate() {
        draw -= p;
        if draw <= 0.0 {
            return index;
        }
    }
    probabilities.len() - 1
}
