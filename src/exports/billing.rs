use super::OrderId;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// Row of the platform billing export
#[derive(Debug, Clone, Deserialize)]
pub struct BillingRecord {
    #[serde(rename = "Order", default)]
    pub order: Option<OrderId>,
    #[serde(rename = "Charge category", default)]
    pub category: Option<String>,
    #[serde(rename = "Amount", default)]
    pub amount: Option<Decimal>,
}

/// Shipping label charges per order
pub fn label_costs(records: &[BillingRecord]) -> HashMap<OrderId, Decimal> {
    let mut costs: HashMap<OrderId, Decimal> = HashMap::new();
    for record in records {
        let is_label = record
            .category
            .as_deref()
            .is_some_and(|c| c.to_ascii_lowercase().contains("shipping"));
        match (&record.order, record.amount) {
            (Some(order), Some(amount)) if is_label && !order.is_empty() => {
                *costs.entry(order.clone()).or_default() += amount;
            }
            _ => {}
        }
    }
    costs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exports::read_records;
    use rust_decimal_macros::dec;

    #[test]
    fn sums_label_charges_per_order() {
        let export = "\
Bill #,Charge category,Description,Amount,Currency,Order
1,shipping,USPS label,4.10,USD,#1001
1,shipping,USPS label adjustment,0.35,USD,#1001
1,subscription,Basic plan,39.00,USD,
1,Shipping,UPS label,7.25,USD,1002
";
        let records: Vec<BillingRecord> = read_records(export.as_bytes()).unwrap();
        let costs = label_costs(&records);
        assert_eq!(costs.len(), 2);
        assert_eq!(costs[&OrderId::new("1001")], dec!(4.45));
        assert_eq!(costs[&OrderId::new("#1002")], dec!(7.25));
    }
}
