use thiserror::Error;

/// Represents a linear programming problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Variable names
    pub variables: Vec<String>,
    /// Objective function coefficients (costs)
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

/// A problem whose vectors do not line up with its variable list
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Objective has {actual} coefficients but the problem has {expected} variables")]
    ObjectiveLength { expected: usize, actual: usize },
    #[error("Constraint '{name}' has {actual} coefficients but the problem has {expected} variables")]
    ConstraintLength {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("Non-finite value in {0}")]
    NonFinite(String),
}

impl LpProblem {
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Check that every coefficient vector has one entry per variable and
    /// that all numbers are finite.
    pub fn validate(&self) -> Result<(), ProblemError> {
        let n = self.num_variables();
        if self.objective.coefficients.len() != n {
            return Err(ProblemError::ObjectiveLength {
                expected: n,
                actual: self.objective.coefficients.len(),
            });
        }
        if self.objective.coefficients.iter().any(|v| !v.is_finite()) {
            return Err(ProblemError::NonFinite("objective".to_string()));
        }

        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(ProblemError::ConstraintLength {
                    name: c.name.clone(),
                    expected: n,
                    actual: c.coefficients.len(),
                });
            }
            if !c.rhs.is_finite() || c.coefficients.iter().any(|v| !v.is_finite()) {
                return Err(ProblemError::NonFinite(c.name.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_short_constraint() {
        let mut problem = LpProblem::new(vec!["a".to_string(), "b".to_string()]);
        problem.set_objective(vec![1.0, 2.0], true);
        problem.add_constraint("row", vec![1.0], ConstraintOp::Eq, 3.0);

        assert_eq!(
            problem.validate(),
            Err(ProblemError::ConstraintLength {
                name: "row".to_string(),
                expected: 2,
                actual: 1,
            })
        );
    }

    #[test]
    fn test_validate_rejects_nan_rhs() {
        let mut problem = LpProblem::new(vec!["a".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("row", vec![1.0], ConstraintOp::Eq, f64::NAN);

        assert!(matches!(problem.validate(), Err(ProblemError::NonFinite(_))));
    }
}
