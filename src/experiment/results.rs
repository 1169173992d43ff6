use crate::stats::Statistic;
use crate::stats::VectorStatistic;

/// per-sweep accumulators, cleared between simulation budgets
#[derive(Debug, Clone)]
pub struct Results {
    pub reward: VectorStatistic,
    pub time: Statistic,
    pub timestep: Statistic,
    pub undiscounted_return: VectorStatistic,
    pub discounted_return: VectorStatistic,
    pub undiscounted_cv: Statistic,
    pub discounted_cv: Statistic,
    pub welfare: Statistic,
}

impl Results {
    pub fn new(objectives: usize) -> Self {
        Self {
            reward: VectorStatistic::new(objectives),
            time: Statistic::new(),
            timestep: Statistic::new(),
            undiscounted_return: VectorStatistic::new(objectives),
            discounted_return: VectorStatistic::new(objectives),
            undiscounted_cv: Statistic::new(),
            discounted_cv: Statistic::new(),
            welfare: Statistic::new(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.reward.dim());
    }
}

/// vector cells in the report render as space-separated numbers inside
/// square brackets
pub fn bracketed(values: &[f64]) -> String {
    format!(
        "[{}]",
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_rendering() {
        assert_eq!(bracketed(&[1.0, 2.5]), "[1 2.5]");
        assert_eq!(bracketed(&[]), "[]");
    }

    #[test]
    fn clear_keeps_dimension() {
        let mut results = Results::new(3);
        results.undiscounted_return.add(&[1.0, 2.0, 3.0]);
        results.clear();
        assert_eq!(results.undiscounted_return.count(), 0);
        assert_eq!(results.undiscounted_return.dim(), 3);
    }
}
