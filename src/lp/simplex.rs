use anyhow::bail;
use anyhow::Result;

const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Eq,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub coefficients: Vec<f64>,
    pub relation: Relation,
    pub rhs: f64,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub variables: Vec<f64>,
    pub objective: f64,
}

/// maximize `objective . x` subject to the constraints, `x >= 0`.
/// dense two-phase tableau simplex with Bland's rule, small enough
/// for the action-mix programs this crate builds (tens of variables).
/// free variables are the caller's problem: split them before calling.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub objective: Vec<f64>,
    pub constraints: Vec<Constraint>,
}

/// normalized constraint row: structural coefficients, slack sign
/// (+1 slack, -1 surplus, 0 none) and a non-negative right-hand side
struct Row {
    coefficients: Vec<f64>,
    slack: f64,
    rhs: f64,
}

impl Program {
    pub fn maximize(self) -> Result<Solution> {
        let n = self.objective.len();
        let rows: Vec<Row> = self
            .constraints
            .into_iter()
            .map(|row| {
                assert!(row.coefficients.len() == n, "ragged constraint row");
                let flip = row.rhs < 0.0;
                let sign = if flip { -1.0 } else { 1.0 };
                Row {
                    coefficients: row.coefficients.iter().map(|c| c * sign).collect(),
                    slack: match row.relation {
                        Relation::Eq => 0.0,
                        Relation::Le => sign,
                    },
                    rhs: row.rhs * sign,
                }
            })
            .collect();
        let m = rows.len();

        // layout: structural columns, one slack/surplus column per
        // inequality, one artificial column per row without a natural
        // starting basic variable
        let inequalities: Vec<usize> = (0..m).filter(|&i| rows[i].slack != 0.0).collect();
        let needy: Vec<usize> = (0..m).filter(|&i| rows[i].slack <= 0.0).collect();
        let artificial_start = n + inequalities.len();
        let columns = artificial_start + needy.len();

        let mut tableau = vec![vec![0.0; columns + 1]; m];
        let mut basis = vec![usize::MAX; m];
        for (i, row) in rows.iter().enumerate() {
            tableau[i][..n].copy_from_slice(&row.coefficients);
            tableau[i][columns] = row.rhs;
        }
        for (offset, &i) in inequalities.iter().enumerate() {
            tableau[i][n + offset] = rows[i].slack;
            if rows[i].slack > 0.0 {
                basis[i] = n + offset;
            }
        }
        for (offset, &i) in needy.iter().enumerate() {
            tableau[i][artificial_start + offset] = 1.0;
            basis[i] = artificial_start + offset;
        }

        // phase one: drive the artificial variables to zero
        if !needy.is_empty() {
            let mut cost = vec![0.0; columns];
            for c in artificial_start..columns {
                cost[c] = -1.0;
            }
            let value = run(&mut tableau, &mut basis, &cost, columns)?;
            if value < -TOLERANCE {
                bail!("infeasible program: artificial residue {}", -value);
            }
            // residual artificials sit in the basis at zero; pivot
            // them out where possible, redundant rows stay harmless
            for i in 0..m {
                if basis[i] >= artificial_start {
                    if let Some(j) =
                        (0..artificial_start).find(|&j| tableau[i][j].abs() > TOLERANCE)
                    {
                        pivot(&mut tableau, &mut basis, i, j);
                    }
                }
            }
        }

        // phase two: original objective, artificial columns retired
        let mut cost = vec![0.0; columns];
        cost[..n].copy_from_slice(&self.objective);
        let objective = run(&mut tableau, &mut basis, &cost, artificial_start)?;

        let mut variables = vec![0.0; n];
        for (i, &b) in basis.iter().enumerate() {
            if b < n {
                variables[b] = tableau[i][columns];
            }
        }
        Ok(Solution {
            variables,
            objective,
        })
    }
}

/// primal simplex iterations restricted to the first `eligible`
/// columns, Bland's rule on both ends. returns the objective value at
/// optimality.
fn run(
    tableau: &mut [Vec<f64>],
    basis: &mut [usize],
    cost: &[f64],
    eligible: usize,
) -> Result<f64> {
    let m = tableau.len();
    let rhs = tableau.first().map_or(0, |row| row.len() - 1);
    loop {
        let entering = (0..eligible).find(|&j| reduced(tableau, basis, cost, j) > TOLERANCE);
        let Some(entering) = entering else {
            let objective = (0..m)
                .map(|i| cost.get(basis[i]).copied().unwrap_or(0.0) * tableau[i][rhs])
                .sum::<f64>();
            return Ok(objective);
        };
        let mut leaving: Option<usize> = None;
        let mut best = f64::INFINITY;
        for i in 0..m {
            if tableau[i][entering] > TOLERANCE {
                let ratio = tableau[i][rhs] / tableau[i][entering];
                let better = match leaving {
                    None => true,
                    Some(l) => {
                        ratio < best - TOLERANCE
                            || (ratio < best + TOLERANCE && basis[i] < basis[l])
                    }
                };
                if better {
                    best = ratio;
                    leaving = Some(i);
                }
            }
        }
        let Some(leaving) = leaving else {
            bail!("unbounded program: column {} never blocks", entering);
        };
        pivot(tableau, basis, leaving, entering);
    }
}

fn reduced(tableau: &[Vec<f64>], basis: &[usize], cost: &[f64], column: usize) -> f64 {
    cost[column]
        - basis
            .iter()
            .enumerate()
            .map(|(i, &b)| cost.get(b).copied().unwrap_or(0.0) * tableau[i][column])
            .sum::<f64>()
}

fn pivot(tableau: &mut [Vec<f64>], basis: &mut [usize], leaving: usize, entering: usize) {
    let width = tableau[leaving].len();
    let scale = tableau[leaving][entering];
    tableau[leaving].iter_mut().for_each(|v| *v /= scale);
    for i in 0..tableau.len() {
        if i != leaving {
            let factor = tableau[i][entering];
            if factor != 0.0 {
                for j in 0..width {
                    tableau[i][j] -= factor * tableau[leaving][j];
                }
            }
        }
    }
    basis[leaving] = entering;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le(coefficients: Vec<f64>, rhs: f64) -> Constraint {
        Constraint {
            coefficients,
            relation: Relation::Le,
            rhs,
        }
    }

    fn eq(coefficients: Vec<f64>, rhs: f64) -> Constraint {
        Constraint {
            coefficients,
            relation: Relation::Eq,
            rhs,
        }
    }

    #[test]
    fn bounded_corner() {
        // max x + y, x + y <= 1, x <= 0.5
        let solution = Program {
            objective: vec![1.0, 1.0],
            constraints: vec![le(vec![1.0, 1.0], 1.0), le(vec![1.0, 0.0], 0.5)],
        }
        .maximize()
        .unwrap();
        assert!((solution.objective - 1.0).abs() < 1e-6);
    }

    #[test]
    fn equality_constraints_hold() {
        // max x, x + y = 1, x <= 0.25
        let solution = Program {
            objective: vec![1.0, 0.0],
            constraints: vec![eq(vec![1.0, 1.0], 1.0), le(vec![1.0, 0.0], 0.25)],
        }
        .maximize()
        .unwrap();
        assert!((solution.variables[0] - 0.25).abs() < 1e-6);
        assert!((solution.variables[1] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn infeasible_is_an_error() {
        let result = Program {
            objective: vec![1.0],
            constraints: vec![le(vec![1.0], 1.0), eq(vec![1.0], 2.0)],
        }
        .maximize();
        assert!(result.is_err());
    }

    #[test]
    fn unbounded_is_an_error() {
        let result = Program {
            objective: vec![1.0],
            constraints: vec![le(vec![-1.0], 1.0)],
        }
        .maximize();
        assert!(result.is_err());
    }

    #[test]
    fn negative_rhs_is_normalized() {
        // max -x subject to -x <= -2, i.e. x >= 2
        let solution = Program {
            objective: vec![-1.0],
            constraints: vec![le(vec![-1.0], -2.0)],
        }
        .maximize()
        .unwrap();
        assert!((solution.variables[0] - 2.0).abs() < 1e-6);
        assert!((solution.objective + 2.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_equalities_do_not_cycle() {
        // max x + y, x = 0.5, y = 0.5, x + y = 1 (redundant)
        let solution = Program {
            objective: vec![1.0, 1.0],
            constraints: vec![
                eq(vec![1.0, 0.0], 0.5),
                eq(vec![0.0, 1.0], 0.5),
                eq(vec![1.0, 1.0], 1.0),
            ],
        }
        .maximize()
        .unwrap();
        assert!((solution.objective - 1.0).abs() < 1e-6);
    }
}
