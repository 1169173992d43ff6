use crate::Probability;
use crate::Utility;

/// generalized choquet-style welfare against a reference distribution.
///
/// the utility vector is sorted ascending with a stable permutation,
/// and each sorted entry is weighted by how much of the reference
/// mass sitting at-or-above it falls under the concave cumulative
/// weight curve phi. phi interpolates the anchor points
/// (k/n, W_{n-k}) built from the suffix sums of the gini weights
/// 1/2^i, normalized so that phi(1) = 1; a constant vector therefore
/// scores as itself. used for scoring episode returns against an
/// importance distribution, never inside the tree.
pub fn g3f(utility: &[Utility], reference: &[Probability]) -> Utility {
    let n = utility.len();
    assert!(n > 0);
    assert!(reference.len() == n);

    // stable ascending permutation, first occurrence first on ties
    let mut sigma: Vec<usize> = (0..n).collect();
    sigma.sort_by(|&i, &j| utility[i].partial_cmp(&utility[j]).expect("utilities are not NaN"));
    let sorted: Vec<Utility> = sigma.iter().map(|&i| utility[i]).collect();

    // anchor heights y_k = (w_{n-1} + .. + w_{n-k}) / (w_0 + .. + w_{n-1})
    let weights: Vec<f64> = (0..n).map(|i| 0.5f64.powi(i as i32)).collect();
    let total: f64 = weights.iter().sum();
    let mut anchors = vec![0.0; n + 1];
    for k in 1..=n {
        anchors[k] = anchors[k - 1] + weights[n - k] / total;
    }

    // piecewise-linear through the anchors, nearest segment outside
    let phi = |v: f64| -> f64 {
        let segment = ((v * n as f64).floor() as i64).clamp(0, n as i64 - 1) as usize;
        let x0 = segment as f64 / n as f64;
        let slope = (anchors[segment + 1] - anchors[segment]) * n as f64;
        anchors[segment] + slope * (v - x0)
    };

    // suffix mass of the reference distribution in sorted order
    let mut suffix = vec![0.0; n + 1];
    for i in (0..n).rev() {
        suffix[i] = suffix[i + 1] + reference[sigma[i]];
    }

    (0..n)
        .map(|i| {
            let hi = phi(suffix[i].min(1.0));
            let lo = phi(suffix[i + 1].min(1.0));
            (hi - lo) * sorted[i]
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIFORM: [f64; 2] = [0.5, 0.5];

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(g3f(&[0., 0.], &UNIFORM), 0.0);
    }

    #[test]
    fn constant_vector_scores_itself() {
        assert!((g3f(&[1., 1.], &UNIFORM) - 1.0).abs() < 1e-12);
        assert!((g3f(&[3., 3., 3.], &[0.2, 0.3, 0.5]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn leans_toward_the_minimum() {
        let score = g3f(&[1., 3.], &UNIFORM);
        assert!(score > 1.0);
        assert!(score < ws_mid(&[1., 3.]));
    }

    #[test]
    fn deterministic_on_ties() {
        let a = g3f(&[2., 2., 1.], &[0.1, 0.4, 0.5]);
        let b = g3f(&[2., 2., 1.], &[0.1, 0.4, 0.5]);
        assert_eq!(a, b);
    }

    fn ws_mid(u: &[f64]) -> f64 {
        u.iter().sum::<f64>() / u.len() as f64
    }
}
