pub mod annotate;
pub mod loader;
pub mod model;
pub mod optimize;
pub mod pipeline;
pub mod records;
pub mod schema;
pub mod utilization;

pub use annotate::{annotate_costs, AnnotatedOrder, CostAnnotation};
pub use loader::{DataPaths, DataSet, LoadError};
pub use model::{build_model, KeyIndex, LpModel, ModelError, ModelShape};
pub use optimize::{optimize, Optimization};
pub use pipeline::{run, Report};
pub use records::*;
pub use schema::{RawTable, Record, SchemaError, TableSchema};
pub use utilization::{analyze_utilization, Utilization};

pub use supplyopt_solver::{ConstraintViolation, Solver, SolutionStatus};
