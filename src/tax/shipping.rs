use crate::exports::orders::Order;
use crate::exports::OrderId;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Which figure counts as an order's shipping when netting it out of sales.
///
/// The platform's own tax figures land closer to the label cost than to the
/// amount collected, so both are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShippingPolicy {
    /// Shipping charged to the customer (orders export)
    #[default]
    Collected,
    /// Shipping labels bought for the order (billing export)
    LabelCost,
}

#[derive(Debug, Clone, Default)]
pub struct Shipping {
    policy: ShippingPolicy,
    label_costs: HashMap<OrderId, Decimal>,
}

impl Shipping {
    pub fn collected() -> Self {
        Shipping::default()
    }

    pub fn label_cost(label_costs: HashMap<OrderId, Decimal>) -> Self {
        Shipping {
            policy: ShippingPolicy::LabelCost,
            label_costs,
        }
    }

    pub fn policy(&self) -> ShippingPolicy {
        self.policy
    }

    pub fn for_order(&self, order: &Order) -> Decimal {
        match self.policy {
            ShippingPolicy::Collected => order.shipping,
            ShippingPolicy::LabelCost => self
                .label_costs
                .get(&order.id)
                .copied()
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: &str, shipping: Decimal) -> Order {
        Order {
            id: OrderId::new(id),
            fulfilled: true,
            total: dec!(30),
            refunded: Decimal::ZERO,
            shipping,
            taxes: Decimal::ZERO,
            city: String::new(),
            province: "CA".into(),
            created: None,
        }
    }

    #[test]
    fn collected_uses_order_export() {
        assert_eq!(Shipping::collected().for_order(&order("1", dec!(5))), dec!(5));
    }

    #[test]
    fn label_cost_uses_billing_and_defaults_to_zero() {
        let costs = [(OrderId::new("1"), dec!(4.45))].into_iter().collect();
        let shipping = Shipping::label_cost(costs);
        assert_eq!(shipping.policy(), ShippingPolicy::LabelCost);
        assert_eq!(shipping.for_order(&order("1", dec!(5))), dec!(4.45));
        assert_eq!(shipping.for_order(&order("2", dec!(5))), Decimal::ZERO);
    }
}
