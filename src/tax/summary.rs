//! Revenue figures for the return's front page.

use super::{Shipping, TaxedState};
use crate::classify::ClassifiedOrder;
use crate::diagnostics::Diagnostic;
use crate::exports::orders::{Order, OrderBook};
use crate::exports::tax_lines::TaxLedger;
use crate::exports::OrderId;
use crate::money::{Rounding, CENT};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevenueSummary {
    /// Totals less refunds over fulfilled orders
    pub gross: Decimal,
    /// Net of shipping, shipped outside the state
    pub interstate_sales: Decimal,
    pub total_shipping: Decimal,
    /// Tax charged on the taxable orders, per the orders export
    pub sales_tax_orders: Decimal,
    /// Tax charged on the taxable orders, per the tax report
    pub sales_tax_report: Decimal,
    /// In-state sales without tax, including marketplace-filed orders
    pub nontaxable_in_state: Decimal,
    pub nontaxable: Decimal,
    pub taxable_income: Decimal,
}

fn net_of_shipping(order: &Order, shipping: &Shipping) -> Decimal {
    order.net() - shipping.for_order(order)
}

pub fn summarize(
    book: &OrderBook,
    ledger: &TaxLedger,
    classified: &[ClassifiedOrder],
    state: &TaxedState,
    shipping: &Shipping,
    rounding: Rounding,
) -> (RevenueSummary, Option<Diagnostic>) {
    let fulfilled: Vec<&Order> = book.fulfilled().collect();
    let (in_state, out_of_state): (Vec<&Order>, Vec<&Order>) =
        fulfilled.iter().copied().partition(|o| o.ships_to(&state.code));

    let gross: Decimal = fulfilled.iter().map(|o| o.net()).sum();
    let total_shipping: Decimal = fulfilled.iter().map(|o| shipping.for_order(o)).sum();
    let interstate_sales: Decimal = out_of_state
        .iter()
        .map(|o| net_of_shipping(o, shipping))
        .sum();

    let taxable_ids: HashSet<&OrderId> = classified.iter().map(|o| &o.id).collect();
    let sales_tax_orders: Decimal = classified
        .iter()
        .filter_map(|o| book.get(&o.id))
        .map(|o| o.taxes)
        .sum();
    let sales_tax_report: Decimal = ledger
        .distinct_unfiled_sales(&state.name)
        .into_iter()
        .filter(|l| taxable_ids.contains(&l.order))
        .map(|l| l.amount)
        .sum();

    // untaxed in-state orders never reach the classifier; neither do orders
    // whose tax a marketplace channel filed
    let channel_filed = ledger.channel_filed_orders(&state.name);
    let nontaxable_in_state: Decimal = in_state
        .iter()
        .filter(|o| o.taxes.is_zero() || channel_filed.contains(&o.id))
        .map(|o| net_of_shipping(o, shipping))
        .sum();

    let round = |d: Decimal| rounding.to_cents(d);
    let nontaxable = interstate_sales + total_shipping + sales_tax_report + nontaxable_in_state;
    let summary = RevenueSummary {
        gross: round(gross),
        interstate_sales: round(interstate_sales),
        total_shipping: round(total_shipping),
        sales_tax_orders: round(sales_tax_orders),
        sales_tax_report: round(sales_tax_report),
        nontaxable_in_state: round(nontaxable_in_state),
        nontaxable: round(nontaxable),
        taxable_income: round(gross - nontaxable),
    };

    let mismatch = ((summary.sales_tax_orders - summary.sales_tax_report).abs() > CENT).then(|| {
        Diagnostic::TaxMismatch {
            from_orders: summary.sales_tax_orders,
            from_report: summary.sales_tax_report,
        }
        .raise()
    });
    (summary, mismatch)
}
