use supplyopt_solver::Solver;
use tracing::{info, instrument};

use crate::annotate::annotate_costs;
use crate::loader::DataSet;
use crate::model::{build_model, ModelError, ModelShape};
use crate::optimize::{optimize, Optimization};
use crate::utilization::{analyze_utilization, Utilization};

/// Everything the dashboard shows for one run
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Report {
    pub total_historical_cost: f64,
    /// Orders whose plant had no warehouse cost row
    pub unmatched_cost_orders: usize,
    pub utilization: Utilization,
    pub model: ModelShape,
    pub optimization: Optimization,
}

/// Annotate, analyze, build, and solve.
///
/// Fails only on a malformed model. An LP without an optimum still yields
/// a report, with the outcome in [`Optimization::status`].
#[instrument(skip_all, fields(orders = data.orders.len()))]
pub fn run(data: &DataSet, solver: &Solver) -> Result<Report, ModelError> {
    info!(
        max_iterations = solver.max_iterations(),
        tolerance = solver.tolerance(),
        presolve = solver.presolve(),
        "solver settings"
    );
    let costs = annotate_costs(&data.orders, &data.costs);
    let utilization = analyze_utilization(&costs.orders, &data.capacities);
    let model = build_model(&costs.orders)?;
    let optimization = optimize(&model, solver)?;

    Ok(Report {
        total_historical_cost: costs.total_historical_cost,
        unmatched_cost_orders: costs.unmatched,
        utilization,
        model: model.shape(),
        optimization,
    })
}
