use std::collections::HashMap;

use tracing::warn;

use crate::schema::{self, Record, Row, TableSchema};

/// One customer order line
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub order_date: String,
    pub origin_port: String,
    pub carrier: String,
    /// Transit time in days
    pub tpt: Option<f64>,
    pub service_level: String,
    pub ship_ahead_day_count: Option<f64>,
    pub ship_late_day_count: Option<f64>,
    pub customer: String,
    pub product_id: String,
    pub plant_code: String,
    pub destination_port: String,
    pub unit_quantity: Option<f64>,
    pub weight: Option<f64>,
}

impl Order {
    /// Unit quantity with missing treated as zero
    pub fn quantity(&self) -> f64 {
        self.unit_quantity.unwrap_or(0.0)
    }
}

impl Record for Order {
    const SCHEMA: TableSchema = schema::ORDERS;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            order_id: row.text(0),
            order_date: row.text(1),
            origin_port: row.text(2),
            carrier: row.text(3),
            tpt: row.number(4),
            service_level: row.text(5),
            ship_ahead_day_count: row.number(6),
            ship_late_day_count: row.number(7),
            customer: row.text(8),
            product_id: row.text(9),
            plant_code: row.text(10),
            destination_port: row.text(11),
            unit_quantity: row.non_negative(12),
            weight: row.number(13),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FreightRate {
    pub carrier: String,
    pub orig_port_cd: String,
    pub dest_port_cd: String,
    pub minm_wgh_qty: Option<f64>,
    pub max_wgh_qty: Option<f64>,
    pub svc_cd: String,
    pub minimum_cost: Option<f64>,
    pub rate: Option<f64>,
    pub mode_dsc: String,
    pub tpt_day_cnt: Option<f64>,
    pub carrier_type: String,
}

impl Record for FreightRate {
    const SCHEMA: TableSchema = schema::FREIGHT_RATES;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            carrier: row.text(0),
            orig_port_cd: row.text(1),
            dest_port_cd: row.text(2),
            minm_wgh_qty: row.number(3),
            max_wgh_qty: row.number(4),
            svc_cd: row.text(5),
            minimum_cost: row.number(6),
            rate: row.number(7),
            mode_dsc: row.text(8),
            tpt_day_cnt: row.number(9),
            carrier_type: row.text(10),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantPort {
    pub plant_code: String,
    pub port: String,
}

impl Record for PlantPort {
    const SCHEMA: TableSchema = schema::PLANT_PORTS;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            plant_code: row.text(0),
            port: row.text(1),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPerPlant {
    pub plant_code: String,
    pub product_id: String,
}

impl Record for ProductPerPlant {
    const SCHEMA: TableSchema = schema::PRODUCTS_PER_PLANT;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            plant_code: row.text(0),
            product_id: row.text(1),
        }
    }
}

/// Vendor-managed-inventory customer served by a warehouse
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmiCustomer {
    pub warehouse_id: String,
    pub customer: String,
}

impl Record for VmiCustomer {
    const SCHEMA: TableSchema = schema::VMI_CUSTOMERS;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            warehouse_id: row.text(0),
            customer: row.text(1),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseCost {
    pub warehouse_id: String,
    pub cost_per_unit: Option<f64>,
}

impl Record for WarehouseCost {
    const SCHEMA: TableSchema = schema::WAREHOUSE_COSTS;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            warehouse_id: row.text(0),
            cost_per_unit: row.non_negative(1),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseCapacity {
    pub warehouse_id: String,
    pub daily_capacity: Option<f64>,
}

impl Record for WarehouseCapacity {
    const SCHEMA: TableSchema = schema::WAREHOUSE_CAPACITIES;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            warehouse_id: row.text(0),
            daily_capacity: row.number(1),
        }
    }
}

/// Index rows by key, keeping the first row for each key.
///
/// Later duplicates are dropped with a warning, so a join against the
/// index never multiplies the rows on the other side.
pub(crate) fn index_first<'a, T>(
    table: &'static str,
    items: &'a [T],
    key: impl Fn(&T) -> &str,
) -> HashMap<&'a str, &'a T> {
    let mut index: HashMap<&'a str, &'a T> = HashMap::with_capacity(items.len());
    for item in items {
        let k = key(item);
        if index.contains_key(k) {
            warn!(table, key = k, "duplicate key, keeping first row");
            continue;
        }
        index.insert(k, item);
    }
    index
}
