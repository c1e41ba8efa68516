use thiserror::Error;
use tracing::debug;

/// Canonical column layout of one input table.
///
/// Columns are matched by position only. Whatever header text the source
/// carries is replaced by these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl TableSchema {
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

pub const ORDERS: TableSchema = TableSchema {
    name: "OrderList",
    columns: &[
        "OrderID",
        "OrderDate",
        "OriginPort",
        "Carrier",
        "TPT",
        "ServiceLevel",
        "ShipAheadDayCount",
        "ShipLateDayCount",
        "Customer",
        "ProductID",
        "PlantCode",
        "DestinationPort",
        "UnitQuantity",
        "Weight",
    ],
};

pub const FREIGHT_RATES: TableSchema = TableSchema {
    name: "FreightRates",
    columns: &[
        "Carrier",
        "OrigPortCd",
        "DestPortCd",
        "MinmWghQty",
        "MaxWghQty",
        "SvcCd",
        "MinimumCost",
        "Rate",
        "ModeDsc",
        "TptDayCnt",
        "CarrierType",
    ],
};

pub const PLANT_PORTS: TableSchema = TableSchema {
    name: "PlantPorts",
    columns: &["PlantCode", "Port"],
};

pub const PRODUCTS_PER_PLANT: TableSchema = TableSchema {
    name: "ProductsPerPlant",
    columns: &["PlantCode", "ProductID"],
};

pub const VMI_CUSTOMERS: TableSchema = TableSchema {
    name: "VmiCustomers",
    columns: &["WarehouseID", "Customer"],
};

pub const WAREHOUSE_COSTS: TableSchema = TableSchema {
    name: "WhCosts",
    columns: &["WarehouseID", "CostPerUnit"],
};

pub const WAREHOUSE_CAPACITIES: TableSchema = TableSchema {
    name: "WhCapacities",
    columns: &["WarehouseID", "DailyCapacity"],
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{table}: header has {actual} columns, expected {expected}")]
    HeaderWidth {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{table}: row {row} has {actual} columns, expected {expected}")]
    RowWidth {
        table: &'static str,
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// A table as read from its source: trimmed text cells, header kept apart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }
}

/// One data row of a raw table, read through its schema
pub struct Row<'a> {
    schema: &'a TableSchema,
    cells: &'a [String],
    /// 1-based data row number, for diagnostics
    number: usize,
}

impl<'a> Row<'a> {
    pub fn text(&self, col: usize) -> String {
        self.cells[col].clone()
    }

    /// Numeric cell, `None` when blank or unparsable
    pub fn number(&self, col: usize) -> Option<f64> {
        let raw = &self.cells[col];
        let value = coerce_number(raw);
        if value.is_none() && !raw.is_empty() {
            debug!(
                table = self.schema.name,
                column = self.schema.columns[col],
                row = self.number,
                value = %raw,
                "coerced unparsable value to missing"
            );
        }
        value
    }

    /// Like [`Row::number`], but negative values are also treated as missing
    pub fn non_negative(&self, col: usize) -> Option<f64> {
        match self.number(col) {
            Some(v) if v < 0.0 => {
                debug!(
                    table = self.schema.name,
                    column = self.schema.columns[col],
                    row = self.number,
                    value = v,
                    "coerced negative value to missing"
                );
                None
            }
            other => other,
        }
    }
}

/// A typed record that can be built from one row of its table
pub trait Record: Sized {
    const SCHEMA: TableSchema;

    fn from_row(row: &Row<'_>) -> Self;
}

/// Parse a numeric cell. Blank, unparsable and non-finite text is missing.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Apply `R`'s schema to a raw table by position and coerce its cells.
///
/// Any width mismatch is fatal. A table with no header (an empty `header`
/// vector) skips the header check.
pub fn normalize<R: Record>(raw: &RawTable) -> Result<Vec<R>, SchemaError> {
    let schema = R::SCHEMA;

    if !raw.header.is_empty() && raw.header.len() != schema.width() {
        return Err(SchemaError::HeaderWidth {
            table: schema.name,
            expected: schema.width(),
            actual: raw.header.len(),
        });
    }

    raw.rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            if cells.len() != schema.width() {
                return Err(SchemaError::RowWidth {
                    table: schema.name,
                    row: i + 1,
                    expected: schema.width(),
                    actual: cells.len(),
                });
            }
            Ok(R::from_row(&Row {
                schema: &schema,
                cells,
                number: i + 1,
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Order, WarehouseCost};

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(" 12.5 "), Some(12.5));
        assert_eq!(coerce_number("3"), Some(3.0));
        assert_eq!(coerce_number(""), None);
        assert_eq!(coerce_number("n/a"), None);
        assert_eq!(coerce_number("1,000"), None);
        assert_eq!(coerce_number("inf"), None);
        assert_eq!(coerce_number("NaN"), None);
    }

    #[test]
    fn test_normalize_by_position_ignores_header_text() {
        let raw = RawTable::new(
            cells(&["wh", "whatever"]),
            vec![cells(&["PLANT01", "0.52"]), cells(&["PLANT02", "oops"])],
        );

        let costs: Vec<WarehouseCost> = normalize(&raw).unwrap();

        assert_eq!(costs.len(), 2);
        assert_eq!(costs[0].warehouse_id, "PLANT01");
        assert_eq!(costs[0].cost_per_unit, Some(0.52));
        assert_eq!(costs[1].cost_per_unit, None);
    }

    #[test]
    fn test_negative_cost_is_missing() {
        let raw = RawTable::new(Vec::new(), vec![cells(&["PLANT01", "-1"])]);

        let costs: Vec<WarehouseCost> = normalize(&raw).unwrap();

        assert_eq!(costs[0].cost_per_unit, None);
    }

    #[test]
    fn test_header_width_mismatch_is_fatal() {
        let raw = RawTable::new(cells(&["a", "b", "c"]), Vec::new());

        let err = normalize::<WarehouseCost>(&raw).unwrap_err();

        assert_eq!(
            err,
            SchemaError::HeaderWidth {
                table: "WhCosts",
                expected: 2,
                actual: 3,
            }
        );
    }

    #[test]
    fn test_row_width_mismatch_names_the_row() {
        let raw = RawTable::new(Vec::new(), vec![cells(&["1", "2"])]);

        let err = normalize::<Order>(&raw).unwrap_err();

        assert_eq!(
            err,
            SchemaError::RowWidth {
                table: "OrderList",
                row: 1,
                expected: 14,
                actual: 2,
            }
        );
        assert_eq!(err.to_string(), "OrderList: row 1 has 2 columns, expected 14");
    }
}
