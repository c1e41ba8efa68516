/// The result of solving an LP problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each variable (only when optimal)
    pub values: Option<Vec<f64>>,
    /// Optimal objective value (only when optimal)
    pub objective_value: Option<f64>,
    /// Number of simplex pivots performed across both phases
    pub iterations: usize,
    /// Constraint violations (populated when infeasible)
    pub violations: Vec<ConstraintViolation>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The pivot limit was reached before optimality was proven
    IterationLimit,
}

impl SolutionStatus {
    pub fn is_optimal(self) -> bool {
        self == SolutionStatus::Optimal
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolutionStatus::Optimal => "OPTIMAL",
            SolutionStatus::Infeasible => "INFEASIBLE",
            SolutionStatus::Unbounded => "UNBOUNDED",
            SolutionStatus::IterationLimit => "ITERATION LIMIT",
        };
        f.write_str(s)
    }
}

/// Information about a violated constraint
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// Constraint name
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Value reached by the closest phase-one point
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl Solution {
    pub fn optimal(values: Vec<f64>, objective_value: f64, iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values: Some(values),
            objective_value: Some(objective_value),
            iterations,
            violations: Vec::new(),
        }
    }

    pub fn infeasible(violations: Vec<ConstraintViolation>, iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            values: None,
            objective_value: None,
            iterations,
            violations,
        }
    }

    pub fn unbounded(iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Unbounded,
            values: None,
            objective_value: None,
            iterations,
            violations: Vec::new(),
        }
    }

    pub fn iteration_limit(iterations: usize) -> Self {
        Self {
            status: SolutionStatus::IterationLimit,
            values: None,
            objective_value: None,
            iterations,
            violations: Vec::new(),
        }
    }
}
