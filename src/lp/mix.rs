use super::simplex::Constraint;
use super::simplex::Program;
use super::simplex::Relation;
use super::simplex::Solution;
use crate::Probability;
use crate::Utility;
use anyhow::ensure;
use anyhow::Result;

/// randomized action selection as an ordered-weighted linear program.
///
/// given the per-action vector Q-values `q[a][i]` and a reference
/// distribution `p` over objectives, find the action distribution pi
/// maximizing
///
///   sum_k ((k+1) w'_k / n) x_k  -  sum_{i,k} w'_k p_i d_ik
///
/// subject to x_k - d_ik - sum_a pi_a q[a][i] <= 0 for every (i, k),
/// d_ik >= 0 and pi on the probability simplex, where
/// w'_k = n (w_k - w_{k+1}) and w_k = 1/2^k. the x_k are free and get
/// split into positive and negative parts before the simplex runs.
pub fn mix(q: &[Vec<Utility>], p: &[Probability]) -> Result<Vec<Probability>> {
    let actions = q.len();
    ensure!(actions > 0, "no actions to mix over");
    let n = p.len();
    ensure!(n > 0, "empty reference distribution");
    ensure!(
        q.iter().all(|row| row.len() == n),
        "q rows must match the reference distribution length"
    );
    let total: f64 = p.iter().sum();
    ensure!(total > 0.0, "reference distribution has no mass");
    let p: Vec<f64> = p.iter().map(|v| v / total).collect();

    let weights: Vec<f64> = (0..n).map(|k| 0.5f64.powi(k as i32)).collect();
    let ordered: Vec<f64> = (0..n)
        .map(|k| {
            let next = if k + 1 < n { weights[k + 1] } else { 0.0 };
            n as f64 * (weights[k] - next)
        })
        .collect();

    // columns: x+ (n), x- (n), d (n * n), pi (actions)
    let x_pos = |k: usize| k;
    let x_neg = |k: usize| n + k;
    let d = |i: usize, k: usize| 2 * n + i * n + k;
    let pi = |a: usize| 2 * n + n * n + a;
    let columns = 2 * n + n * n + actions;

    let mut objective = vec![0.0; columns];
    for k in 0..n {
        objective[x_pos(k)] = (k + 1) as f64 * ordered[k] / n as f64;
        objective[x_neg(k)] = -((k + 1) as f64) * ordered[k] / n as f64;
        for i in 0..n {
            objective[d(i, k)] = -ordered[k] * p[i];
        }
    }

    let mut constraints = vec![];
    for i in 0..n {
        for k in 0..n {
            let mut coefficients = vec![0.0; columns];
            coefficients[x_pos(k)] = 1.0;
            coefficients[x_neg(k)] = -1.0;
            coefficients[d(i, k)] = -1.0;
            for a in 0..actions {
                coefficients[pi(a)] = -q[a][i];
            }
            constraints.push(Constraint {
                coefficients,
                relation: Relation::Le,
                rhs: 0.0,
            });
        }
    }
    let mut simplex_row = vec![0.0; columns];
    for a in 0..actions {
        simplex_row[pi(a)] = 1.0;
    }
    constraints.push(Constraint {
        coefficients: simplex_row,
        relation: Relation::Eq,
        rhs: 1.0,
    });

    let Solution { variables, .. } = Program {
        objective,
        constraints,
    }
    .maximize()?;

    let mut distribution: Vec<f64> = (0..actions)
        .map(|a| variables[pi(a)].max(0.0))
        .collect();
    let mass: f64 = distribution.iter().sum();
    ensure!(mass > 0.0, "degenerate action distribution");
    distribution.iter_mut().for_each(|v| *v /= mass);
    Ok(distribution)
}
