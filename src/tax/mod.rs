pub mod districts;
pub mod shipping;
pub mod split;
pub mod summary;

pub use districts::{aggregate_districts, DistrictTotals};
pub use shipping::{Shipping, ShippingPolicy};
pub use split::{split_orders, OrderSplit};
pub use summary::{summarize, RevenueSummary};

/// The state whose sales tax is being filed.
/// Order exports use the postal code, the tax report the full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxedState {
    pub code: String,
    pub name: String,
}

impl Default for TaxedState {
    fn default() -> Self {
        TaxedState {
            code: "CA".to_string(),
            name: "California".to_string(),
        }
    }
}
