use crate::Utility;

/// coefficient of variation, a reporting metric for how unevenly the
/// objectives ended up. population standard deviation over the mean,
/// defined as 0 when the mean is 0. never used as an objective.
pub fn cv(values: &[Utility]) -> Utility {
    assert!(!values.is_empty());
    let mean = values.iter().sum::<Utility>() / values.len() as Utility;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|v| (v - mean) * (v - mean))
        .sum::<Utility>()
        / values.len() as Utility;
    variance.sqrt() / mean
}
