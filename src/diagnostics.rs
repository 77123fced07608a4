use crate::exports::OrderId;
use crate::money::format_usd;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Recoverable problems found during a run.
/// Each one is logged when raised and the run carries on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Diagnostic {
    /// Shipping city maps to no county; the order is kept under `unknown`.
    UnresolvedCity {
        order: OrderId,
        city: String,
        suggestions: Vec<String>,
    },
    /// Classified order missing from the orders export; left out of the district totals.
    MissingOrderSubtotal { order: OrderId },
    /// Jurisdiction total with no worksheet row; not written.
    UnmatchedScheduleRow {
        jurisdiction: String,
        amount: Decimal,
    },
    /// Tax on the orders export disagrees with the tax report.
    TaxMismatch {
        from_orders: Decimal,
        from_report: Decimal,
    },
    /// Tax line without a usable rate; its taxable amount cannot be derived.
    LineWithoutRate { order: OrderId, product: String },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::UnresolvedCity { .. } => "UnresolvedCity",
            Diagnostic::MissingOrderSubtotal { .. } => "MissingOrderSubtotal",
            Diagnostic::UnmatchedScheduleRow { .. } => "UnmatchedScheduleRow",
            Diagnostic::TaxMismatch { .. } => "TaxMismatch",
            Diagnostic::LineWithoutRate { .. } => "LineWithoutRate",
        }
    }

    /// Log at debug and return self, the summary prints it as a warning
    pub fn raise(self) -> Self {
        log::debug!("{}", self);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnresolvedCity {
                order,
                city,
                suggestions,
            } => {
                write!(f, "cannot find county of city '{}' (order {})", city, order)?;
                if !suggestions.is_empty() {
                    write!(f, "; did you mean: {}", suggestions.join(", "))?;
                }
                Ok(())
            }
            Diagnostic::MissingOrderSubtotal { order } => {
                write!(f, "cannot find the subtotal for taxable order {}", order)
            }
            Diagnostic::UnmatchedScheduleRow {
                jurisdiction,
                amount,
            } => write!(
                f,
                "cannot find '{}' in the schedule worksheet, {} not written",
                jurisdiction,
                format_usd(*amount)
            ),
            Diagnostic::TaxMismatch {
                from_orders,
                from_report,
            } => write!(
                f,
                "sales tax from orders ({}) differs from the tax report ({})",
                format_usd(*from_orders),
                format_usd(*from_report)
            ),
            Diagnostic::LineWithoutRate { order, product } => write!(
                f,
                "tax line for '{}' on order {} has no usable rate",
                product, order
            ),
        }
    }
}
