use supplyopt_solver::{ConstraintViolation, SolutionStatus, Solver};
use tracing::{info, instrument, warn};

use crate::model::{LpModel, ModelError};

/// Solver outcome for an allocation model
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Optimization {
    pub status: SolutionStatus,
    /// Minimum cost, present only when `status` is optimal
    pub objective: Option<f64>,
    /// Plant labels for `allocation`, in model column order
    pub plants: Vec<String>,
    /// Optimal value per plant, present only when `status` is optimal
    pub allocation: Option<Vec<f64>>,
    /// Unsatisfied order rows when infeasible, worst first
    pub violations: Vec<ConstraintViolation>,
    pub iterations: usize,
}

impl Optimization {
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    /// `(plant, value)` pairs of an optimal allocation
    pub fn allocation_by_plant(&self) -> Option<impl Iterator<Item = (&str, f64)> + '_> {
        let values = self.allocation.as_ref()?;
        Some(self.plants.iter().map(String::as_str).zip(values.iter().copied()))
    }
}

/// Solve a validated allocation model.
///
/// Infeasible, unbounded, and iteration-limited outcomes are returned in
/// [`Optimization::status`], not as errors.
#[instrument(skip_all, fields(orders = model.shape().orders, plants = model.shape().plants))]
pub fn optimize(model: &LpModel, solver: &Solver) -> Result<Optimization, ModelError> {
    let problem = model.to_problem();
    let solution = solver.solve(&problem)?;

    if let Some(values) = &solution.values {
        if values.len() != model.plants().len() {
            return Err(ModelError::ShapeMismatch {
                dimension: "solution length vs plants",
                expected: model.plants().len(),
                actual: values.len(),
            });
        }
    }

    match solution.objective_value {
        Some(objective) => info!(objective, iterations = solution.iterations, "allocation LP solved"),
        None => warn!(
            status = %solution.status,
            violations = solution.violations.len(),
            "allocation LP has no optimum"
        ),
    }

    Ok(Optimization {
        status: solution.status,
        objective: solution.objective_value,
        plants: model.plants().to_vec(),
        allocation: solution.values,
        violations: solution.violations,
        iterations: solution.iterations,
    })
}
