//! Row reductions applied before the tableau is built.
//!
//! Empty rows are checked and dropped. Equality rows with a single
//! structural entry fix that variable, and the fixed value is substituted
//! into every other row. This repeats until nothing changes. Allocation
//! models are dominated by such singleton rows, so most of the problem
//! never reaches the dense tableau.

use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{ConstraintViolation, Solution, SolutionStatus};

pub(crate) enum Presolved {
    Reduced(Reduced),
    Infeasible(Vec<ConstraintViolation>),
}

/// The problem left after fixing variables
pub(crate) struct Reduced {
    pub problem: LpProblem,
    /// Fixed value for each original variable, `None` if still free
    fixed: Vec<Option<f64>>,
    /// Original index of each variable in `problem`
    free: Vec<usize>,
}

pub(crate) fn reduce(problem: &LpProblem, tolerance: f64) -> Presolved {
    let n = problem.num_variables();
    let mut fixed: Vec<Option<f64>> = vec![None; n];
    let mut active = vec![true; problem.num_constraints()];
    let mut violations = Vec::new();

    loop {
        let mut changed = false;

        for (k, c) in problem.constraints.iter().enumerate() {
            if !active[k] {
                continue;
            }

            let mut rhs = c.rhs;
            let mut lhs_fixed = 0.0;
            let mut free_entries = Vec::new();
            for (j, &a) in c.coefficients.iter().enumerate() {
                if a.abs() <= tolerance {
                    continue;
                }
                match fixed[j] {
                    Some(x) => {
                        rhs -= a * x;
                        lhs_fixed += a * x;
                    }
                    None => free_entries.push(j),
                }
            }

            let slack = tolerance * (1.0 + c.rhs.abs());
            match free_entries.as_slice() {
                [] => {
                    active[k] = false;
                    changed = true;
                    let violated = match c.op {
                        ConstraintOp::Eq => rhs.abs() > slack,
                        ConstraintOp::Le => rhs < -slack,
                        ConstraintOp::Ge => rhs > slack,
                    };
                    if violated {
                        violations.push(violation(&c.name, c.op, c.rhs, lhs_fixed));
                    }
                }
                [j] if c.op == ConstraintOp::Eq => {
                    let value = rhs / c.coefficients[*j];
                    active[k] = false;
                    changed = true;
                    if value < -slack {
                        violations.push(ConstraintViolation {
                            constraint: c.name.clone(),
                            required: c.rhs,
                            actual: lhs_fixed,
                            violation_amount: value.abs() * c.coefficients[*j].abs(),
                            description: format!(
                                "{} needs {} = {:.4}, below zero",
                                c.name, problem.variables[*j], value
                            ),
                        });
                    } else {
                        fixed[*j] = Some(value.max(0.0));
                    }
                }
                _ => {}
            }
        }

        if !violations.is_empty() {
            violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));
            return Presolved::Infeasible(violations);
        }
        if !changed {
            break;
        }
    }

    let free: Vec<usize> = (0..n).filter(|&j| fixed[j].is_none()).collect();
    let mut reduced = LpProblem::new(free.iter().map(|&j| problem.variables[j].clone()).collect());
    reduced.set_objective(
        free.iter().map(|&j| problem.objective.coefficients[j]).collect(),
        problem.objective.minimize,
    );

    for (k, c) in problem.constraints.iter().enumerate() {
        if !active[k] {
            continue;
        }
        let shift: f64 = fixed
            .iter()
            .enumerate()
            .filter_map(|(j, x)| x.map(|x| c.coefficients[j] * x))
            .sum();
        reduced.add_constraint(
            c.name.clone(),
            free.iter().map(|&j| c.coefficients[j]).collect(),
            c.op,
            c.rhs - shift,
        );
    }

    Presolved::Reduced(Reduced {
        problem: reduced,
        fixed,
        free,
    })
}

fn violation(name: &str, op: ConstraintOp, required: f64, actual: f64) -> ConstraintViolation {
    let (amount, description) = match op {
        ConstraintOp::Le => (
            actual - required,
            format!("{} exceeds maximum of {:.2} (reached {:.2})", name, required, actual),
        ),
        ConstraintOp::Ge => (
            required - actual,
            format!("{} is below minimum of {:.2} (reached {:.2})", name, required, actual),
        ),
        ConstraintOp::Eq => (
            (actual - required).abs(),
            format!("{} requires exactly {:.2} but got {:.2}", name, required, actual),
        ),
    };
    ConstraintViolation {
        constraint: name.to_string(),
        required,
        actual,
        violation_amount: amount,
        description,
    }
}

impl Reduced {
    pub fn fixed_count(&self) -> usize {
        self.fixed.iter().filter(|x| x.is_some()).count()
    }

    /// Map a solution of the reduced problem back onto the original variables
    pub fn expand(self, inner: Solution, original: &LpProblem) -> Solution {
        if inner.status != SolutionStatus::Optimal {
            return inner;
        }
        let Some(inner_values) = inner.values else {
            return inner;
        };

        let mut values: Vec<f64> = self.fixed.iter().map(|x| x.unwrap_or(0.0)).collect();
        for (reduced_idx, &orig_idx) in self.free.iter().enumerate() {
            values[orig_idx] = inner_values[reduced_idx];
        }

        let objective_value = original
            .objective
            .coefficients
            .iter()
            .zip(&values)
            .map(|(c, x)| c * x)
            .sum();

        Solution::optimal(values, objective_value, inner.iterations)
    }
}
