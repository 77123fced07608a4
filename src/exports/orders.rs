use super::{eq_ignore_case, OrderId};
use crate::period::Quarter;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// Row of the orders export.
///
/// Multi-item orders span several rows; only the first carries the totals.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "Name")]
    pub id: OrderId,
    #[serde(rename = "Fulfillment Status", default)]
    pub fulfillment_status: Option<String>,
    #[serde(rename = "Total", default)]
    pub total: Option<Decimal>,
    #[serde(rename = "Refunded Amount", default)]
    pub refunded: Option<Decimal>,
    #[serde(rename = "Shipping", default)]
    pub shipping: Option<Decimal>,
    #[serde(rename = "Taxes", default)]
    pub taxes: Option<Decimal>,
    #[serde(rename = "Shipping City", default)]
    pub shipping_city: Option<String>,
    #[serde(rename = "Shipping Province", default)]
    pub shipping_province: Option<String>,
    #[serde(rename = "Created at", default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub fulfilled: bool,
    pub total: Decimal,
    pub refunded: Decimal,
    /// Shipping collected from the customer
    pub shipping: Decimal,
    pub taxes: Decimal,
    pub city: String,
    pub province: String,
    pub created: Option<NaiveDate>,
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        let created = record.created_at.as_deref().and_then(parse_created_at);
        Order {
            fulfilled: eq_ignore_case(record.fulfillment_status.as_deref(), "fulfilled"),
            total: record.total.unwrap_or_default(),
            refunded: record.refunded.unwrap_or_default(),
            shipping: record.shipping.unwrap_or_default(),
            taxes: record.taxes.unwrap_or_default(),
            city: record.shipping_city.unwrap_or_default().trim().to_string(),
            province: record.shipping_province.unwrap_or_default().trim().to_string(),
            created,
            id: record.id,
        }
    }
}

impl Order {
    /// Total less refunds
    pub fn net(&self) -> Decimal {
        self.total - self.refunded
    }

    pub fn ships_to(&self, state_code: &str) -> bool {
        self.province.eq_ignore_ascii_case(state_code)
    }
}

/// Parse the export's `2023-01-15 10:23:45 -0800` timestamps, falling back to plain dates
fn parse_created_at(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Orders keyed by order number, in export order
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: Vec<Order>,
    by_id: HashMap<OrderId, usize>,
}

impl OrderBook {
    /// Keeps the first row of each order
    pub fn from_records(records: Vec<OrderRecord>) -> Self {
        let mut book = OrderBook::default();
        for record in records {
            if record.id.is_empty() || book.by_id.contains_key(&record.id) {
                continue;
            }
            book.by_id.insert(record.id.clone(), book.orders.len());
            book.orders.push(record.into());
        }
        book
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.by_id.get(id).map(|&i| &self.orders[i])
    }

    pub fn fulfilled(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.fulfilled)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Drop orders created outside `period`. Orders without a creation date
    /// are kept. Returns the number dropped.
    pub fn retain_within(&mut self, period: &Quarter) -> usize {
        let before = self.orders.len();
        self.orders
            .retain(|o| o.created.is_none_or(|date| period.contains(date)));
        self.by_id = self
            .orders
            .iter()
            .enumerate()
            .map(|(i, o)| (o.id.clone(), i))
            .collect();
        before - self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exports::read_records;
    use rust_decimal_macros::dec;

    const EXPORT: &str = "\
Name,Email,Fulfillment Status,Subtotal,Shipping,Taxes,Total,Refunded Amount,Shipping City,Shipping Province,Created at
#1001,a@example.com,fulfilled,20.00,5.00,1.45,26.45,0.00,South Lake Tahoe,CA,2023-01-15 10:23:45 -0800
#1001,,,,,,,,,,
#1002,b@example.com,unfulfilled,10.00,0.00,0.73,10.73,0,Davis,CA,2023-02-01
#1003,c@example.com,fulfilled,30.00,4.00,0,34.00,10.00,Reno,NV,2023-03-31 23:59:59
";

    #[test]
    fn first_row_per_order_is_kept() {
        let records: Vec<OrderRecord> = read_records(EXPORT.as_bytes()).unwrap();
        assert_eq!(records.len(), 4);

        let book = OrderBook::from_records(records);
        assert_eq!(book.len(), 3);

        let first = book.get(&OrderId::new("1001")).unwrap();
        assert!(first.fulfilled);
        assert_eq!(first.total, dec!(26.45));
        assert_eq!(first.city, "South Lake Tahoe");
        assert!(first.ships_to("ca"));
        assert_eq!(first.created, NaiveDate::from_ymd_opt(2023, 1, 15));
    }

    #[test]
    fn net_and_filters() {
        let book = OrderBook::from_records(read_records(EXPORT.as_bytes()).unwrap());
        let fulfilled: Vec<_> = book.fulfilled().map(|o| o.id.to_string()).collect();
        assert_eq!(fulfilled, vec!["#1001", "#1003"]);

        let nevada = book.get(&OrderId::new("#1003")).unwrap();
        assert_eq!(nevada.net(), dec!(24.00));
        assert!(!nevada.ships_to("CA"));

        let unfulfilled = book.get(&OrderId::new("#1002")).unwrap();
        assert_eq!(unfulfilled.created, NaiveDate::from_ymd_opt(2023, 2, 1));
    }

    #[test]
    fn orders_outside_the_quarter_are_dropped() {
        let mut book = OrderBook::from_records(read_records(EXPORT.as_bytes()).unwrap());
        let q1 = "2023-q1".parse::<Quarter>().unwrap();
        assert_eq!(book.retain_within(&q1), 0);

        let export = format!("{}#1004,,fulfilled,5,0,0,5,0,Davis,CA,2023-04-01 00:00:01 -0700\n#1005,,fulfilled,5,0,0,5,0,Davis,CA,\n", EXPORT);
        let mut book = OrderBook::from_records(read_records(export.as_bytes()).unwrap());
        assert_eq!(book.retain_within(&q1), 1);
        assert_eq!(book.len(), 4);
        assert!(book.get(&OrderId::new("1004")).is_none());
        assert!(book.get(&OrderId::new("1005")).is_some());
        assert_eq!(book.get(&OrderId::new("1003")).unwrap().total, dec!(34.00));
    }

    #[test]
    fn missing_optional_columns_default() {
        let export = "Name,Total\n#9,12.50\n";
        let book = OrderBook::from_records(read_records(export.as_bytes()).unwrap());
        let order = book.get(&OrderId::new("9")).unwrap();
        assert!(!order.fulfilled);
        assert_eq!(order.total, dec!(12.50));
        assert_eq!(order.taxes, Decimal::ZERO);
        assert_eq!(order.created, None);
    }
}
