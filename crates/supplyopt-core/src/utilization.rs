use std::collections::BTreeMap;

use tracing::{info, instrument, warn};

use crate::annotate::AnnotatedOrder;
use crate::records::{index_first, WarehouseCapacity};

/// Orders per plant relative to daily capacity
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Utilization {
    /// Order count divided by daily capacity, per plant with a usable capacity
    pub ratios: BTreeMap<String, f64>,
    /// Order count per plant, including plants without a ratio
    pub order_counts: BTreeMap<String, usize>,
    /// Plants with orders but a missing, zero, or negative capacity
    pub uncapacitated: Vec<String>,
}

#[instrument(skip_all, fields(orders = orders.len(), capacities = capacities.len()))]
pub fn analyze_utilization(orders: &[AnnotatedOrder], capacities: &[WarehouseCapacity]) -> Utilization {
    let mut order_counts: BTreeMap<String, usize> = BTreeMap::new();
    for o in orders {
        *order_counts.entry(o.plant_code().to_string()).or_default() += 1;
    }

    let by_warehouse = index_first("WhCapacities", capacities, |c| c.warehouse_id.as_str());

    let mut ratios = BTreeMap::new();
    let mut uncapacitated = Vec::new();
    for (plant, &count) in &order_counts {
        let capacity = by_warehouse
            .get(plant.as_str())
            .and_then(|c| c.daily_capacity)
            .filter(|&c| c > 0.0);
        match capacity {
            Some(c) => {
                ratios.insert(plant.clone(), count as f64 / c);
            }
            None => uncapacitated.push(plant.clone()),
        }
    }

    if !uncapacitated.is_empty() {
        warn!(plants = ?uncapacitated, "plants without a usable daily capacity left out of utilization");
    }
    info!(plants = ratios.len(), "computed capacity utilization");

    Utilization {
        ratios,
        order_counts,
        uncapacitated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::annotate_costs;
    use crate::annotate::tests::order;

    fn capacity(warehouse: &str, daily: Option<f64>) -> WarehouseCapacity {
        WarehouseCapacity {
            warehouse_id: warehouse.to_string(),
            daily_capacity: daily,
        }
    }

    fn annotated(plants: &[&str]) -> Vec<AnnotatedOrder> {
        let orders: Vec<_> = plants
            .iter()
            .enumerate()
            .map(|(i, p)| order(&format!("O{}", i), p, Some(1.0)))
            .collect();
        annotate_costs(&orders, &[]).orders
    }

    #[test]
    fn test_ratio_is_count_over_capacity() {
        let orders = annotated(&["A", "A", "A", "B"]);
        let capacities = vec![capacity("A", Some(12.0)), capacity("B", Some(3.0))];

        let result = analyze_utilization(&orders, &capacities);

        assert_eq!(result.ratios.get("A"), Some(&(3.0 / 12.0)));
        assert_eq!(result.ratios.get("B"), Some(&(1.0 / 3.0)));
        assert_eq!(result.order_counts.get("A"), Some(&3));
        assert!(result.uncapacitated.is_empty());
    }

    #[test]
    fn test_missing_or_zero_capacity_is_flagged_not_divided() {
        let orders = annotated(&["A", "B", "C", "D"]);
        let capacities = vec![
            capacity("A", Some(10.0)),
            capacity("B", Some(0.0)),
            capacity("C", None),
        ];

        let result = analyze_utilization(&orders, &capacities);

        assert_eq!(result.ratios.len(), 1);
        assert!(result.ratios.contains_key("A"));
        assert_eq!(result.uncapacitated, vec!["B".to_string(), "C".to_string(), "D".to_string()]);
    }

    #[test]
    fn test_capacity_without_orders_is_not_reported() {
        let orders = annotated(&["A"]);
        let capacities = vec![capacity("A", Some(2.0)), capacity("Z", Some(5.0))];

        let result = analyze_utilization(&orders, &capacities);

        assert_eq!(result.ratios.keys().collect::<Vec<_>>(), vec!["A"]);
    }
}
