use std::fs::File;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;
use tracing::{info, instrument};

use crate::records::{
    FreightRate, Order, PlantPort, ProductPerPlant, VmiCustomer, WarehouseCapacity, WarehouseCost,
};
use crate::schema::{normalize, RawTable, Record, SchemaError};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Schema error in {}: {source}", path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

/// Location of each input table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub orders: PathBuf,
    pub freight_rates: PathBuf,
    pub plant_ports: PathBuf,
    pub products_per_plant: PathBuf,
    pub vmi_customers: PathBuf,
    pub capacities: PathBuf,
    pub costs: PathBuf,
}

impl DataPaths {
    pub const ORDERS: &'static str = "OrderList.csv";
    pub const FREIGHT_RATES: &'static str = "FreightRates.csv";
    pub const PLANT_PORTS: &'static str = "PlantPorts.csv";
    pub const PRODUCTS_PER_PLANT: &'static str = "ProductsPerPlant.csv";
    pub const VMI_CUSTOMERS: &'static str = "VmiCustomers.csv";
    pub const CAPACITIES: &'static str = "WhCapacities.csv";
    pub const COSTS: &'static str = "WhCosts.csv";

    /// Default file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            orders: dir.join(Self::ORDERS),
            freight_rates: dir.join(Self::FREIGHT_RATES),
            plant_ports: dir.join(Self::PLANT_PORTS),
            products_per_plant: dir.join(Self::PRODUCTS_PER_PLANT),
            vmi_customers: dir.join(Self::VMI_CUSTOMERS),
            capacities: dir.join(Self::CAPACITIES),
            costs: dir.join(Self::COSTS),
        }
    }
}

/// All input tables, normalized and typed
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    pub orders: Vec<Order>,
    pub freight_rates: Vec<FreightRate>,
    pub plant_ports: Vec<PlantPort>,
    pub products_per_plant: Vec<ProductPerPlant>,
    pub vmi_customers: Vec<VmiCustomer>,
    pub capacities: Vec<WarehouseCapacity>,
    pub costs: Vec<WarehouseCost>,
}

impl DataSet {
    #[instrument(skip_all)]
    pub fn load(paths: &DataPaths) -> Result<Self, LoadError> {
        let data = Self {
            orders: load_table(&paths.orders)?,
            freight_rates: load_table(&paths.freight_rates)?,
            plant_ports: load_table(&paths.plant_ports)?,
            products_per_plant: load_table(&paths.products_per_plant)?,
            vmi_customers: load_table(&paths.vmi_customers)?,
            capacities: load_table(&paths.capacities)?,
            costs: load_table(&paths.costs)?,
        };

        info!(
            orders = data.orders.len(),
            freight_rates = data.freight_rates.len(),
            plant_ports = data.plant_ports.len(),
            products_per_plant = data.products_per_plant.len(),
            vmi_customers = data.vmi_customers.len(),
            capacities = data.capacities.len(),
            costs = data.costs.len(),
            "loaded input tables"
        );
        Ok(data)
    }

    /// Row count per table, in load order
    pub fn table_counts(&self) -> [(&'static str, usize); 7] {
        [
            (Order::SCHEMA.name, self.orders.len()),
            (FreightRate::SCHEMA.name, self.freight_rates.len()),
            (PlantPort::SCHEMA.name, self.plant_ports.len()),
            (ProductPerPlant::SCHEMA.name, self.products_per_plant.len()),
            (VmiCustomer::SCHEMA.name, self.vmi_customers.len()),
            (WarehouseCapacity::SCHEMA.name, self.capacities.len()),
            (WarehouseCost::SCHEMA.name, self.costs.len()),
        ]
    }
}

/// Read and normalize one table
pub fn load_table<R: Record>(path: &Path) -> Result<Vec<R>, LoadError> {
    let raw = read_raw_table(path)?;
    normalize(&raw).map_err(|source| LoadError::Schema {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a CSV file into trimmed text cells.
///
/// The first row is the header. Rows that are entirely blank are skipped.
pub fn read_raw_table(path: &Path) -> Result<RawTable, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    // Ragged rows are let through so the schema check can report them
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let header: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let cells: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
        if cells.iter().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(cells);
    }

    Ok(RawTable::new(header, rows))
}
