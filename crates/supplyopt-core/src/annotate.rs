use tracing::{debug, info, instrument};

use crate::records::{index_first, Order, WarehouseCost};

/// An order joined to its plant's warehouse cost
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedOrder {
    pub order: Order,
    /// Cost per unit of the matching warehouse, `None` when unmatched or missing
    pub cost_per_unit: Option<f64>,
    /// Quantity times cost per unit; zero if either is missing or the product overflows
    pub total_cost: f64,
}

impl AnnotatedOrder {
    pub fn plant_code(&self) -> &str {
        &self.order.plant_code
    }

    pub fn order_id(&self) -> &str {
        &self.order.order_id
    }
}

/// Output of the cost join
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CostAnnotation {
    /// Same length and order as the input orders
    pub orders: Vec<AnnotatedOrder>,
    /// Sum of every order's total cost
    pub total_historical_cost: f64,
    /// Orders whose plant has no row in the cost table
    pub unmatched: usize,
}

/// Left-join orders to warehouse costs on plant code = warehouse id.
#[instrument(skip_all, fields(orders = orders.len(), costs = costs.len()))]
pub fn annotate_costs(orders: &[Order], costs: &[WarehouseCost]) -> CostAnnotation {
    let by_warehouse = index_first("WhCosts", costs, |c| c.warehouse_id.as_str());

    let mut unmatched = 0;
    let annotated: Vec<AnnotatedOrder> = orders
        .iter()
        .map(|order| {
            let matched = by_warehouse.get(order.plant_code.as_str());
            if matched.is_none() {
                unmatched += 1;
            }
            let cost_per_unit = matched.and_then(|c| c.cost_per_unit);
            let total_cost = match (order.unit_quantity, cost_per_unit) {
                (Some(q), Some(c)) => {
                    let product = q * c;
                    if product.is_finite() {
                        product
                    } else {
                        debug!(
                            order = %order.order_id,
                            quantity = q,
                            cost_per_unit = c,
                            "total cost overflows, treating as missing"
                        );
                        0.0
                    }
                }
                _ => 0.0,
            };
            AnnotatedOrder {
                order: order.clone(),
                cost_per_unit,
                total_cost,
            }
        })
        .collect();

    let total_historical_cost = annotated.iter().map(|o| o.total_cost).sum();

    info!(
        total_historical_cost,
        unmatched, "annotated orders with warehouse costs"
    );

    CostAnnotation {
        orders: annotated,
        total_historical_cost,
        unmatched,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn order(id: &str, plant: &str, quantity: Option<f64>) -> Order {
        Order {
            order_id: id.to_string(),
            order_date: "2013-05-26".to_string(),
            origin_port: "PORT09".to_string(),
            carrier: "V44_3".to_string(),
            tpt: Some(1.0),
            service_level: "CRF".to_string(),
            ship_ahead_day_count: Some(3.0),
            ship_late_day_count: Some(0.0),
            customer: "V55555_53".to_string(),
            product_id: "1700106".to_string(),
            plant_code: plant.to_string(),
            destination_port: "PORT09".to_string(),
            unit_quantity: quantity,
            weight: Some(14.3),
        }
    }

    pub(crate) fn cost(warehouse: &str, per_unit: Option<f64>) -> WarehouseCost {
        WarehouseCost {
            warehouse_id: warehouse.to_string(),
            cost_per_unit: per_unit,
        }
    }

    #[test]
    fn test_total_cost_per_row_and_sum() {
        let orders = vec![
            order("O1", "A", Some(10.0)),
            order("O2", "B", Some(5.0)),
            order("O3", "A", None),
        ];
        let costs = vec![cost("A", Some(2.0)), cost("B", Some(3.0))];

        let result = annotate_costs(&orders, &costs);

        let totals: Vec<f64> = result.orders.iter().map(|o| o.total_cost).collect();
        assert_eq!(totals, vec![20.0, 15.0, 0.0]);
        assert_eq!(result.total_historical_cost, 35.0);
        assert_eq!(result.unmatched, 0);
    }

    #[test]
    fn test_unmatched_and_missing_cost_are_zero() {
        let orders = vec![order("O1", "NOWHERE", Some(10.0)), order("O2", "B", Some(4.0))];
        let costs = vec![cost("B", None)];

        let result = annotate_costs(&orders, &costs);

        assert_eq!(result.orders.len(), 2);
        assert_eq!(result.orders[0].cost_per_unit, None);
        assert_eq!(result.orders[0].total_cost, 0.0);
        assert_eq!(result.orders[1].total_cost, 0.0);
        assert_eq!(result.total_historical_cost, 0.0);
        assert_eq!(result.unmatched, 1);
    }

    #[test]
    fn test_duplicate_cost_rows_do_not_multiply_orders() {
        let orders = vec![order("O1", "A", Some(10.0))];
        let costs = vec![cost("A", Some(2.0)), cost("A", Some(9.0))];

        let result = annotate_costs(&orders, &costs);

        assert_eq!(result.orders.len(), 1);
        assert_eq!(result.orders[0].cost_per_unit, Some(2.0));
        assert_eq!(result.total_historical_cost, 20.0);
    }

    #[test]
    fn test_overflowing_total_cost_is_missing() {
        let orders = vec![order("O1", "A", Some(1e300)), order("O2", "A", Some(2.0))];
        let costs = vec![cost("A", Some(1e10))];

        let result = annotate_costs(&orders, &costs);

        assert_eq!(result.orders[0].total_cost, 0.0);
        assert_eq!(result.orders[0].cost_per_unit, Some(1e10));
        assert_eq!(result.orders[1].total_cost, 2e10);
        assert!(result.total_historical_cost.is_finite());
        assert_eq!(result.total_historical_cost, 2e10);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let orders = vec![order("O1", "A", Some(3.0)), order("O2", "A", Some(7.5))];
        let costs = vec![cost("A", Some(0.4))];

        let first = annotate_costs(&orders, &costs);
        let second = annotate_costs(&orders, &costs);

        assert_eq!(first, second);
    }
}
