use super::{eq_ignore_case, OrderId};
use crate::money::deserialize_rate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};

/// Row of the tax report: one product line of an order, per taxing jurisdiction.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxLineRecord {
    #[serde(rename = "Order")]
    pub order: OrderId,
    #[serde(rename = "Destination State", default)]
    pub destination_state: Option<String>,
    /// `Filed` when a marketplace channel remits the tax itself
    #[serde(rename = "Filed By Channel", default)]
    pub filed_by_channel: Option<String>,
    #[serde(rename = "Sale Type", default)]
    pub sale_type: Option<String>,
    #[serde(rename = "Product", default)]
    pub product: Option<String>,
    #[serde(rename = "Product Variant", default)]
    pub variant: Option<String>,
    #[serde(rename = "Jurisdiction", default)]
    pub jurisdiction: Option<String>,
    #[serde(rename = "Tax Rate", default, deserialize_with = "deserialize_rate")]
    pub rate: Option<Decimal>,
    #[serde(rename = "Tax Amount", default)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaxLine {
    pub order: OrderId,
    pub state: String,
    pub filed_by_channel: bool,
    /// `false` for refunds and adjustments
    pub is_order_sale: bool,
    pub product: String,
    pub variant: String,
    pub jurisdiction: String,
    pub rate: Option<Decimal>,
    pub amount: Decimal,
}

impl From<TaxLineRecord> for TaxLine {
    fn from(record: TaxLineRecord) -> Self {
        let trimmed = |s: Option<String>| s.unwrap_or_default().trim().to_string();
        TaxLine {
            filed_by_channel: eq_ignore_case(record.filed_by_channel.as_deref(), "filed"),
            is_order_sale: record.sale_type.is_none()
                || eq_ignore_case(record.sale_type.as_deref(), "order"),
            state: trimmed(record.destination_state),
            product: trimmed(record.product),
            variant: trimmed(record.variant),
            jurisdiction: trimmed(record.jurisdiction),
            rate: record.rate,
            amount: record.amount.unwrap_or_default(),
            order: record.order,
        }
    }
}

impl TaxLine {
    /// Lines of the same product differ only by jurisdiction breakdown
    pub fn product_key(&self) -> (&OrderId, &str, &str) {
        (&self.order, &self.product, &self.variant)
    }

    /// Taxable amount implied by this line (`tax / rate`)
    pub fn taxable_base(&self) -> Option<Decimal> {
        match self.rate {
            Some(rate) if !rate.is_zero() => self.amount.checked_div(rate),
            _ => None,
        }
    }
}

/// All lines of the tax report, in export order
#[derive(Debug, Clone, Default)]
pub struct TaxLedger {
    lines: Vec<TaxLine>,
}

impl TaxLedger {
    pub fn from_records(records: Vec<TaxLineRecord>) -> Self {
        TaxLedger {
            lines: records.into_iter().map(TaxLine::from).collect(),
        }
    }

    /// Order sales into the state whose tax the merchant must file
    pub fn unfiled_sales<'a>(&'a self, state_name: &'a str) -> impl Iterator<Item = &'a TaxLine> {
        self.lines.iter().filter(move |l| {
            l.state.eq_ignore_ascii_case(state_name) && !l.filed_by_channel && l.is_order_sale
        })
    }

    /// As [`Self::unfiled_sales`] with exact duplicate rows dropped
    pub fn distinct_unfiled_sales<'a>(&'a self, state_name: &'a str) -> Vec<&'a TaxLine> {
        let mut seen = HashSet::new();
        self.unfiled_sales(state_name)
            .filter(|l| seen.insert(*l))
            .collect()
    }

    /// Orders into the state whose tax was remitted by the sales channel
    pub fn channel_filed_orders(&self, state_name: &str) -> BTreeSet<OrderId> {
        self.lines
            .iter()
            .filter(|l| l.state.eq_ignore_ascii_case(state_name) && l.filed_by_channel)
            .map(|l| l.order.clone())
            .collect()
    }
}
