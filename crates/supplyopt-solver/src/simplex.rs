use tracing::debug;

use crate::presolve::{self, Presolved};
use crate::problem::{ConstraintOp, LpProblem, ProblemError};
use crate::solution::{ConstraintViolation, Solution};

/// Simplex solver for linear programming problems
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots per phase before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Whether to remove empty rows and fix singleton equality rows first
    presolve: bool,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            presolve: true,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_presolve(mut self, presolve: bool) -> Self {
        self.presolve = presolve;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn presolve(&self) -> bool {
        self.presolve
    }

    /// Solve the LP problem using the two-phase simplex method.
    ///
    /// Only malformed input is an error. Infeasible and unbounded problems
    /// come back as a [`Solution`] with the matching status.
    pub fn solve(&self, problem: &LpProblem) -> Result<Solution, ProblemError> {
        problem.validate()?;
        debug!(
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            presolve = self.presolve,
            "solving LP"
        );

        if !self.presolve {
            return Ok(self.solve_standard(problem));
        }

        match presolve::reduce(problem, self.tolerance) {
            Presolved::Infeasible(violations) => {
                debug!(violations = violations.len(), "presolve proved infeasibility");
                Ok(Solution::infeasible(violations, 0))
            }
            Presolved::Reduced(reduced) => {
                debug!(
                    fixed = reduced.fixed_count(),
                    remaining_variables = reduced.problem.num_variables(),
                    remaining_constraints = reduced.problem.num_constraints(),
                    "presolve finished"
                );
                let inner = self.solve_standard(&reduced.problem);
                Ok(reduced.expand(inner, problem))
            }
        }
    }

    fn solve_standard(&self, problem: &LpProblem) -> Solution {
        let mut iterations = 0;
        let mut tableau = self.build_tableau(problem);

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau, &mut iterations) {
                SimplexResult::Optimal => {}
                SimplexResult::IterationLimit => return Solution::iteration_limit(iterations),
                // Phase 1 is bounded below by zero; an unbounded ray here
                // only shows up through numerical trouble.
                SimplexResult::Unbounded => {
                    return Solution::infeasible(Vec::new(), iterations);
                }
            }

            let violations = self.find_violations(&tableau, problem);
            if !violations.is_empty() {
                return Solution::infeasible(violations, iterations);
            }

            self.drive_out_artificials(&mut tableau, &mut iterations);
            self.restore_objective(&mut tableau, problem);
        }

        // Phase 2: Optimize
        let exclude_from = tableau.n_vars + tableau.n_slack;
        match self.run_simplex(&mut tableau, exclude_from, &mut iterations) {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => return Solution::unbounded(iterations),
            SimplexResult::IterationLimit => return Solution::iteration_limit(iterations),
        }

        let values = self.basic_values(&tableau);
        let objective_value = problem
            .objective
            .coefficients
            .iter()
            .zip(&values)
            .map(|(c, x)| c * x)
            .sum();

        Solution::optimal(values, objective_value, iterations)
    }

    fn build_tableau(&self, problem: &LpProblem) -> Tableau {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Negative right-hand sides are flipped, which swaps <= and >=
        let rows: Vec<(f64, ConstraintOp, f64)> = problem
            .constraints
            .iter()
            .map(|c| {
                if c.rhs < 0.0 {
                    let op = match c.op {
                        ConstraintOp::Le => ConstraintOp::Ge,
                        ConstraintOp::Ge => ConstraintOp::Le,
                        ConstraintOp::Eq => ConstraintOp::Eq,
                    };
                    (-1.0, op, -c.rhs)
                } else {
                    (1.0, c.op, c.rhs)
                }
            })
            .collect();

        // Count slack and artificial variables needed
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (_, op, _) in &rows {
            match op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            artificial_of: vec![None; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, (c, &(sign, op, rhs))) in problem.constraints.iter().zip(&rows).enumerate() {
            for (j, &coef) in c.coefficients.iter().enumerate() {
                tableau.data[i][j] = sign * coef;
            }
            tableau.data[i][total_cols - 1] = rhs;

            match op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    tableau.artificial_of[i] = Some(artificial_idx);
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    tableau.artificial_of[i] = Some(artificial_idx);
                    artificial_idx += 1;
                }
            }
        }

        // Objective row (last row). The simplex maximizes, so a
        // minimization stores -c.
        let obj_row = n_constraints;
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            tableau.data[obj_row][j] = if problem.objective.minimize { -coef } else { coef };
        }

        tableau
    }

    fn phase1(&self, tableau: &mut Tableau, iterations: &mut usize) -> SimplexResult {
        let n_constraints = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();
        let art_start = tableau.n_vars + tableau.n_slack;

        // Maximize -sum(artificials)
        for j in 0..n_cols {
            tableau.data[n_constraints][j] = 0.0;
        }
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }

        // Price out the basic artificials
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        self.run_simplex(tableau, n_cols - 1, iterations)
    }

    /// Artificials still basic at zero level are pivoted out on any
    /// structural column. A row with no such column is redundant and keeps
    /// its artificial, which phase 2 never lets re-enter.
    fn drive_out_artificials(&self, tableau: &mut Tableau, iterations: &mut usize) {
        let art_start = tableau.n_vars + tableau.n_slack;
        let n_constraints = tableau.data.len() - 1;

        for i in 0..n_constraints {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            let entering = (0..art_start).find(|&j| tableau.data[i][j].abs() > self.tolerance);
            if let Some(j) = entering {
                self.pivot(tableau, i, j);
                *iterations += 1;
            }
        }
    }

    fn restore_objective(&self, tableau: &mut Tableau, problem: &LpProblem) {
        let obj_row = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();

        for j in 0..n_cols {
            tableau.data[obj_row][j] = 0.0;
        }
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            tableau.data[obj_row][j] = if problem.objective.minimize { -coef } else { coef };
        }

        for i in 0..obj_row {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[obj_row][basic];
            if ratio.abs() > self.tolerance {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] -= ratio * tableau.data[i][j];
                }
            }
        }
    }

    /// Pivot until no improving column below `exclude_from` remains.
    ///
    /// Uses the largest-coefficient rule, switching to Bland's rule after a
    /// run of degenerate pivots so that cycling cannot occur.
    fn run_simplex(&self, tableau: &mut Tableau, exclude_from: usize, iterations: &mut usize) -> SimplexResult {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;
        let mut degenerate_run = 0;

        for _ in 0..self.max_iterations {
            let bland = degenerate_run > n_constraints;
            let Some(pivot_col) = self.find_pivot_column(tableau, exclude_from, bland) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                return SimplexResult::Unbounded;
            };

            if tableau.data[pivot_row][rhs_col].abs() <= self.tolerance {
                degenerate_run += 1;
            } else {
                degenerate_run = 0;
            }

            self.pivot(tableau, pivot_row, pivot_col);
            *iterations += 1;
        }

        if self.find_pivot_column(tableau, exclude_from, false).is_none() {
            SimplexResult::Optimal
        } else {
            SimplexResult::IterationLimit
        }
    }

    fn find_pivot_column(&self, tableau: &Tableau, exclude_from: usize, bland: bool) -> Option<usize> {
        let obj_row = tableau.data.len() - 1;
        let n_cols = exclude_from.min(tableau.data[0].len() - 1);
        let row = &tableau.data[obj_row];

        if bland {
            return (0..n_cols).find(|&j| row[j] > self.tolerance);
        }

        // Most positive reduced cost improves the objective fastest
        let mut max_val = self.tolerance;
        let mut max_col = None;
        for j in 0..n_cols {
            if row[j] > max_val {
                max_val = row[j];
                max_col = Some(j);
            }
        }
        max_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..n_constraints {
            let val = tableau.data[i][col];
            if val > self.tolerance {
                let ratio = tableau.data[i][rhs_col] / val;
                let better = match min_row {
                    None => true,
                    Some(r) => {
                        ratio < min_ratio - self.tolerance
                            || (ratio <= min_ratio + self.tolerance
                                && tableau.basic_vars[i] < tableau.basic_vars[r])
                    }
                };
                if better {
                    min_ratio = ratio;
                    min_row = Some(i);
                }
            }
        }

        min_row
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;

        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        let pivot_row = tableau.data[row].clone();
        for i in 0..n_rows {
            if i != row {
                let factor = tableau.data[i][col];
                if factor != 0.0 {
                    for j in 0..n_cols {
                        tableau.data[i][j] -= factor * pivot_row[j];
                    }
                }
            }
        }
    }

    fn basic_values(&self, tableau: &Tableau) -> Vec<f64> {
        let rhs_col = tableau.data[0].len() - 1;
        let mut values = vec![0.0; tableau.n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < tableau.n_vars {
                // Clamp round-off below zero
                values[basic] = tableau.data[i][rhs_col].max(0.0);
            }
        }
        values
    }

    /// Constraints whose artificial variable is still positive after phase 1
    fn find_violations(&self, tableau: &Tableau, problem: &LpProblem) -> Vec<ConstraintViolation> {
        let rhs_col = tableau.data[0].len() - 1;
        let values = self.basic_values(tableau);
        let mut violations = Vec::new();

        for (k, c) in problem.constraints.iter().enumerate() {
            let Some(art_col) = tableau.artificial_of[k] else {
                continue;
            };
            let residual = tableau
                .basic_vars
                .iter()
                .position(|&b| b == art_col)
                .map(|row| tableau.data[row][rhs_col])
                .unwrap_or(0.0);
            if residual <= self.tolerance * (1.0 + c.rhs.abs()) {
                continue;
            }

            let lhs: f64 = c.coefficients.iter().zip(&values).map(|(a, x)| a * x).sum();
            let description = match c.op {
                ConstraintOp::Le => format!("{} exceeds maximum of {:.2} (reached {:.2})", c.name, c.rhs, lhs),
                ConstraintOp::Ge => format!("{} is below minimum of {:.2} (reached {:.2})", c.name, c.rhs, lhs),
                ConstraintOp::Eq => format!("{} requires exactly {:.2} but got {:.2}", c.name, c.rhs, lhs),
            };

            violations.push(ConstraintViolation {
                constraint: c.name.clone(),
                required: c.rhs,
                actual: lhs,
                violation_amount: residual,
                description,
            });
        }

        // Worst first
        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));
        violations
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    /// Artificial column for each constraint row, if it has one
    artificial_of: Vec<Option<usize>>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::LpProblem;
    use crate::solution::SolutionStatus;

    fn raw_solver() -> Solver {
        Solver::new().with_presolve(false)
    }

    #[test]
    fn test_builder_settings() {
        let solver = Solver::new();
        assert_eq!(solver.max_iterations(), 10000);
        assert_eq!(solver.tolerance(), 1e-9);
        assert!(solver.presolve());

        let solver = solver
            .with_max_iterations(50)
            .with_tolerance(1e-6)
            .with_presolve(false);
        assert_eq!(solver.max_iterations(), 50);
        assert_eq!(solver.tolerance(), 1e-6);
        assert!(!solver.presolve());
    }

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = raw_solver().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        let values = solution.values.unwrap();
        assert!((values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", values[0]);
        assert!((values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", values[1]);
        let obj = solution.objective_value.unwrap();
        assert!((obj - 11.0).abs() < 1e-6, "obj = {} (expected 11)", obj);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = raw_solver().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        let values = solution.values.unwrap();
        assert!((values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", values[0]);
        assert!((values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", values[1]);
        assert!((solution.objective_value.unwrap() - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_equality_split_prefers_cheaper_variable() {
        // Minimize: 2a + 3b
        // Subject to:
        //   10a + 5b = 15
        // Optimal: a=1.5, b=0, obj=3
        let mut problem = LpProblem::new(vec!["a".to_string(), "b".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("order", vec![10.0, 5.0], ConstraintOp::Eq, 15.0);

        let solution = raw_solver().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        let values = solution.values.unwrap();
        assert!((values[0] - 1.5).abs() < 1e-6, "a = {}", values[0]);
        assert!(values[1].abs() < 1e-6, "b = {}", values[1]);
        assert!((solution.objective_value.unwrap() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_rhs_is_flipped() {
        // -x <= -2 is x >= 2; minimize x
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("floor", vec![-1.0], ConstraintOp::Le, -2.0);

        let solution = raw_solver().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values.unwrap()[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = raw_solver().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.objective_value.is_none());
        assert!(solution.values.is_none());
        assert_eq!(solution.violations.len(), 1);
        assert_eq!(solution.violations[0].constraint, "lower");
    }

    #[test]
    fn test_zero_row_with_demand_is_infeasible() {
        let mut problem = LpProblem::new(vec!["a".to_string(), "b".to_string()]);
        problem.set_objective(vec![1.0, 1.0], true);
        problem.add_constraint("o1", vec![4.0, 0.0], ConstraintOp::Eq, 4.0);
        problem.add_constraint("o2", vec![0.0, 0.0], ConstraintOp::Eq, 7.0);

        let solution = raw_solver().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert_eq!(solution.violations[0].constraint, "o2");
        assert!((solution.violations[0].violation_amount - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_unbounded() {
        // Minimize -x subject to x >= 1
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![-1.0], true);
        problem.add_constraint("floor", vec![1.0], ConstraintOp::Ge, 1.0);

        let solution = raw_solver().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Unbounded);
        assert!(solution.objective_value.is_none());
    }

    #[test]
    fn test_optimal_zero_is_not_a_failure() {
        let mut problem = LpProblem::new(vec!["a".to_string()]);
        problem.set_objective(vec![0.0], true);
        problem.add_constraint("o1", vec![3.0], ConstraintOp::Eq, 3.0);

        let solution = raw_solver().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.objective_value, Some(0.0));
    }

    #[test]
    fn test_redundant_zero_rows_are_tolerated() {
        // The all-zero row with zero rhs keeps its artificial basic
        let mut problem = LpProblem::new(vec!["a".to_string(), "b".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("o1", vec![10.0, 0.0], ConstraintOp::Eq, 10.0);
        problem.add_constraint("o2", vec![0.0, 5.0], ConstraintOp::Eq, 5.0);
        problem.add_constraint("o3", vec![0.0, 0.0], ConstraintOp::Eq, 0.0);

        let solution = raw_solver().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        let values = solution.values.unwrap();
        assert!((values[0] - 1.0).abs() < 1e-6);
        assert!((values[1] - 1.0).abs() < 1e-6);
        assert!((solution.objective_value.unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_iteration_limit_is_reported() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);

        let solution = raw_solver().with_max_iterations(1).solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::IterationLimit);
        assert!(solution.values.is_none());
    }

    #[test]
    fn test_presolve_matches_full_solve() {
        let mut problem = LpProblem::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        problem.set_objective(vec![2.0, 3.0, 1.0], true);
        problem.add_constraint("o1", vec![10.0, 0.0, 0.0], ConstraintOp::Eq, 10.0);
        problem.add_constraint("o2", vec![0.0, 4.0, 2.0], ConstraintOp::Eq, 6.0);
        problem.add_constraint("o3", vec![0.0, 0.0, 0.0], ConstraintOp::Eq, 0.0);

        let with = Solver::new().solve(&problem).unwrap();
        let without = raw_solver().solve(&problem).unwrap();

        assert_eq!(with.status, SolutionStatus::Optimal);
        assert_eq!(without.status, SolutionStatus::Optimal);
        let a = with.objective_value.unwrap();
        let b = without.objective_value.unwrap();
        assert!((a - b).abs() < 1e-6, "presolve {} vs full {}", a, b);
        // a fixed at 1; o2 is cheapest through c = 3
        assert!((a - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_problem_is_an_error() {
        let mut problem = LpProblem::new(vec!["a".to_string()]);
        problem.set_objective(vec![1.0, 2.0], true);

        assert!(matches!(
            Solver::new().solve(&problem),
            Err(ProblemError::ObjectiveLength { expected: 1, actual: 2 })
        ));
    }
}
