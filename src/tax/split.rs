//! Taxable / nontaxable split of each classified order.

use super::Shipping;
use crate::classify::{ClassifiedOrder, Jurisdiction};
use crate::diagnostics::Diagnostic;
use crate::exports::orders::OrderBook;
use crate::exports::tax_lines::TaxLedger;
use crate::exports::OrderId;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Money breakdown of one taxable order.
///
/// `taxable + nontaxable + shipping + tax == net` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSplit {
    pub id: OrderId,
    pub jurisdiction: Jurisdiction,
    /// Total less refunds
    pub net: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub taxable: Decimal,
    pub nontaxable: Decimal,
    /// `false` when the order had no usable tax lines and all goods count as taxable
    pub from_tax_lines: bool,
}

/// Taxable amount per order reconstructed from the tax report.
///
/// The report repeats a product line once per jurisdiction rate, so only the
/// first line of each (order, product, variant) contributes. Per-line amounts
/// are not rounded.
fn taxable_bases(ledger: &TaxLedger, state_name: &str) -> (HashMap<OrderId, Decimal>, Vec<Diagnostic>) {
    let mut bases: HashMap<OrderId, Decimal> = HashMap::new();
    let mut counted: HashSet<(&OrderId, &str, &str)> = HashSet::new();
    let mut without_rate: BTreeSet<(&OrderId, &str, &str)> = BTreeSet::new();

    for line in ledger.unfiled_sales(state_name) {
        let key = line.product_key();
        if counted.contains(&key) {
            continue;
        }
        match line.taxable_base() {
            Some(base) => {
                counted.insert(key);
                *bases.entry(line.order.clone()).or_default() += base;
            }
            None => {
                without_rate.insert(key);
            }
        }
    }

    let diagnostics = without_rate
        .into_iter()
        .filter(|key| !counted.contains(key))
        .map(|(order, product, _)| {
            Diagnostic::LineWithoutRate {
                order: order.clone(),
                product: product.to_string(),
            }
            .raise()
        })
        .collect();
    (bases, diagnostics)
}

pub fn split_orders(
    classified: &[ClassifiedOrder],
    book: &OrderBook,
    ledger: &TaxLedger,
    state_name: &str,
    shipping: &Shipping,
) -> (Vec<OrderSplit>, Vec<Diagnostic>) {
    let (bases, mut diagnostics) = taxable_bases(ledger, state_name);
    let mut splits = Vec::with_capacity(classified.len());

    for order in classified {
        let Some(record) = book.get(&order.id) else {
            diagnostics.push(
                Diagnostic::MissingOrderSubtotal {
                    order: order.id.clone(),
                }
                .raise(),
            );
            continue;
        };

        let net = record.net();
        let shipping = shipping.for_order(record);
        let tax = record.taxes;
        let goods = net - shipping - tax;
        let (taxable, from_tax_lines) = match bases.get(&order.id) {
            Some(base) => (*base, true),
            None => {
                log::debug!("No tax lines for {}, treating all goods as taxable", order.id);
                (goods, false)
            }
        };

        splits.push(OrderSplit {
            id: order.id.clone(),
            jurisdiction: order.jurisdiction(),
            net,
            shipping,
            tax,
            taxable,
            nontaxable: goods - taxable,
            from_tax_lines,
        });
    }
    (splits, diagnostics)
}
