use std::collections::{BTreeSet, HashMap};

use supplyopt_solver::{ConstraintOp, LpProblem, ProblemError};
use thiserror::Error;
use tracing::{info, instrument};

use crate::annotate::AnnotatedOrder;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Shape mismatch in {dimension}: expected {expected}, got {actual}")]
    ShapeMismatch {
        dimension: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("No orders to allocate")]
    EmptyOrderSet,
    #[error("Solver rejected the problem: {0}")]
    Problem(#[from] ProblemError),
}

/// The one ordering of a set of keys shared by every vector built over it.
///
/// Keys are distinct and sorted ascending. Both the objective vector and
/// the matrix columns are laid out by the same plant index, and both the
/// matrix rows and the right-hand side by the same order index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIndex {
    keys: Vec<String>,
    positions: HashMap<String, usize>,
}

impl KeyIndex {
    pub fn new<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let sorted: BTreeSet<&str> = keys.into_iter().collect();
        let keys: Vec<String> = sorted.into_iter().map(str::to_string).collect();
        let positions = keys.iter().enumerate().map(|(i, k)| (k.clone(), i)).collect();
        Self { keys, positions }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Dimensions of a built model
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelShape {
    pub orders: usize,
    pub plants: usize,
}

/// `minimize c·x  subject to  A_eq·x = b_eq,  x >= 0`
///
/// Columns are plants, rows are orders. Only constructed through
/// [`LpModel::from_parts`] or [`build_model`], both of which check shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct LpModel {
    plants: Vec<String>,
    order_ids: Vec<String>,
    c: Vec<f64>,
    a_eq: Vec<Vec<f64>>,
    b_eq: Vec<f64>,
}

impl LpModel {
    /// Assemble a model from labelled parts, rejecting any size mismatch.
    pub fn from_parts(
        plants: Vec<String>,
        order_ids: Vec<String>,
        c: Vec<f64>,
        a_eq: Vec<Vec<f64>>,
        b_eq: Vec<f64>,
    ) -> Result<Self, ModelError> {
        if a_eq.is_empty() {
            return Err(ModelError::EmptyOrderSet);
        }
        check_dim("objective length vs plant labels", plants.len(), c.len())?;
        for row in &a_eq {
            check_dim("A_eq columns vs objective length", c.len(), row.len())?;
        }
        check_dim("b_eq length vs A_eq rows", a_eq.len(), b_eq.len())?;
        check_dim("order labels vs A_eq rows", a_eq.len(), order_ids.len())?;

        Ok(Self {
            plants,
            order_ids,
            c,
            a_eq,
            b_eq,
        })
    }

    pub fn plants(&self) -> &[String] {
        &self.plants
    }

    pub fn order_ids(&self) -> &[String] {
        &self.order_ids
    }

    pub fn c(&self) -> &[f64] {
        &self.c
    }

    pub fn a_eq(&self) -> &[Vec<f64>] {
        &self.a_eq
    }

    pub fn b_eq(&self) -> &[f64] {
        &self.b_eq
    }

    pub fn shape(&self) -> ModelShape {
        ModelShape {
            orders: self.a_eq.len(),
            plants: self.c.len(),
        }
    }

    /// The model as a generic LP, one equality constraint per order
    pub fn to_problem(&self) -> LpProblem {
        let mut lp = LpProblem::new(self.plants.clone());
        lp.set_objective(self.c.clone(), true);
        for ((order_id, row), &rhs) in self.order_ids.iter().zip(&self.a_eq).zip(&self.b_eq) {
            lp.add_constraint(format!("order {}", order_id), row.clone(), ConstraintOp::Eq, rhs);
        }
        lp
    }
}

fn check_dim(dimension: &'static str, expected: usize, actual: usize) -> Result<(), ModelError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ModelError::ShapeMismatch {
            dimension,
            expected,
            actual,
        })
    }
}

/// Build the allocation LP from annotated orders.
///
/// `c[p]` is the mean known cost per unit over plant p's orders (0 when
/// none is known). `A_eq[o][p]` sums the quantity of order o placed at
/// plant p, and `b_eq[o]` sums order o's quantity over all plants.
#[instrument(skip_all, fields(orders = orders.len()))]
pub fn build_model(orders: &[AnnotatedOrder]) -> Result<LpModel, ModelError> {
    if orders.is_empty() {
        return Err(ModelError::EmptyOrderSet);
    }

    let plants = KeyIndex::new(orders.iter().map(|o| o.plant_code()));
    let order_index = KeyIndex::new(orders.iter().map(|o| o.order_id()));

    let mut cost_sums = vec![(0.0_f64, 0_usize); plants.len()];
    let mut a_eq = vec![vec![0.0; plants.len()]; order_index.len()];
    let mut b_eq = vec![0.0; order_index.len()];

    for o in orders {
        let (Some(p), Some(r)) = (plants.position(o.plant_code()), order_index.position(o.order_id())) else {
            continue;
        };
        let quantity = o.order.quantity();
        a_eq[r][p] += quantity;
        b_eq[r] += quantity;
        if let Some(cost) = o.cost_per_unit {
            cost_sums[p].0 += cost;
            cost_sums[p].1 += 1;
        }
    }

    let c: Vec<f64> = cost_sums
        .iter()
        .map(|&(sum, n)| if n > 0 { sum / n as f64 } else { 0.0 })
        .collect();

    let model = LpModel::from_parts(
        plants.keys().to_vec(),
        order_index.keys().to_vec(),
        c,
        a_eq,
        b_eq,
    )?;

    let shape = model.shape();
    info!(orders = shape.orders, plants = shape.plants, "built allocation model");
    Ok(model)
}
