mod dashboard;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use supplyopt_core::{annotate_costs, build_model, DataPaths, DataSet};
use supplyopt_solver::Solver;
use tracing::info;

#[derive(Parser)]
#[command(name = "supplyopt")]
#[command(about = "Plant-to-order allocation cost optimizer", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the tables, optimize, and print the dashboard
    Run {
        #[command(flatten)]
        data: DataArgs,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Maximum simplex pivots per phase
        #[arg(long, default_value_t = 10000)]
        max_iterations: usize,
        /// Tolerance for floating point comparisons
        #[arg(long, default_value_t = 1e-9)]
        tolerance: f64,
        /// Skip singleton-row presolve
        #[arg(long)]
        no_presolve: bool,
    },
    /// Check that every table loads and matches its schema
    Check {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Build the LP and print its dimensions without solving
    Model {
        #[command(flatten)]
        data: DataArgs,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Directory holding the input CSV files
    data_dir: PathBuf,
    /// Order list file (default: OrderList.csv in the data directory)
    #[arg(long)]
    orders: Option<PathBuf>,
    /// Freight rates file
    #[arg(long)]
    freight_rates: Option<PathBuf>,
    /// Plant ports file
    #[arg(long)]
    plant_ports: Option<PathBuf>,
    /// Products per plant file
    #[arg(long)]
    products_per_plant: Option<PathBuf>,
    /// VMI customers file
    #[arg(long)]
    vmi_customers: Option<PathBuf>,
    /// Warehouse capacities file
    #[arg(long)]
    capacities: Option<PathBuf>,
    /// Warehouse costs file
    #[arg(long)]
    costs: Option<PathBuf>,
}

impl DataArgs {
    fn paths(&self) -> DataPaths {
        let defaults = DataPaths::in_dir(&self.data_dir);
        DataPaths {
            orders: self.orders.clone().unwrap_or(defaults.orders),
            freight_rates: self.freight_rates.clone().unwrap_or(defaults.freight_rates),
            plant_ports: self.plant_ports.clone().unwrap_or(defaults.plant_ports),
            products_per_plant: self.products_per_plant.clone().unwrap_or(defaults.products_per_plant),
            vmi_customers: self.vmi_customers.clone().unwrap_or(defaults.vmi_customers),
            capacities: self.capacities.clone().unwrap_or(defaults.capacities),
            costs: self.costs.clone().unwrap_or(defaults.costs),
        }
    }

    fn load(&self) -> Result<DataSet> {
        DataSet::load(&self.paths())
            .with_context(|| format!("loading tables from {}", self.data_dir.display()))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match execute(cli.command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but found no optimum
fn execute(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            data,
            format,
            max_iterations,
            tolerance,
            no_presolve,
        } => {
            let tables = data.load()?;
            let solver = Solver::new()
                .with_max_iterations(max_iterations)
                .with_tolerance(tolerance)
                .with_presolve(!no_presolve);

            let report = supplyopt_core::run(&tables, &solver).context("building the allocation model")?;
            info!(status = %report.optimization.status, "run finished");

            match format {
                Format::Text => print!("{}", dashboard::render(&report)),
                Format::Json => {
                    let json = serde_json::to_string_pretty(&report).context("serializing the report")?;
                    println!("{}", json);
                }
            }

            Ok(report.optimization.is_optimal())
        }
        Commands::Check { data } => {
            let tables = data.load()?;

            println!("✓ {} is valid", data.data_dir.display());
            for (table, rows) in tables.table_counts() {
                println!("  {:18} {} rows", table, rows);
            }
            Ok(true)
        }
        Commands::Model { data } => {
            let tables = data.load()?;
            let costs = annotate_costs(&tables.orders, &tables.costs);
            let model = build_model(&costs.orders).context("building the allocation model")?;
            let shape = model.shape();

            println!("A_eq: {} orders x {} plants", shape.orders, shape.plants);
            println!("b_eq: {} entries", model.b_eq().len());
            println!("c:    {} entries", model.c().len());
            println!();
            println!("Plants (column order):");
            for (plant, cost) in model.plants().iter().zip(model.c()) {
                println!("  {:12} mean cost/unit {:.4}", plant, cost);
            }
            Ok(true)
        }
    }
}
