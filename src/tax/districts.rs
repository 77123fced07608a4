use super::OrderSplit;
use crate::classify::Jurisdiction;
use crate::money::Rounding;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DistrictTotal {
    /// Taxable sales, rounded to cents
    pub amount: Decimal,
    pub orders: usize,
}

/// Taxable sales per jurisdiction, the amounts reported on Schedule A
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistrictTotals {
    totals: BTreeMap<Jurisdiction, DistrictTotal>,
}

impl DistrictTotals {
    pub fn iter(&self) -> impl Iterator<Item = (&Jurisdiction, &DistrictTotal)> {
        self.totals.iter()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Sum of the rounded district amounts
    pub fn total(&self) -> Decimal {
        self.totals.values().map(|t| t.amount).sum()
    }
}

/// Accumulate each order's taxable amount under its jurisdiction, then round
/// every jurisdiction once.
pub fn aggregate_districts(splits: &[OrderSplit], rounding: Rounding) -> DistrictTotals {
    let mut totals: BTreeMap<Jurisdiction, DistrictTotal> = BTreeMap::new();
    for split in splits {
        let total = totals.entry(split.jurisdiction.clone()).or_default();
        total.amount += split.taxable;
        total.orders += 1;
    }
    for total in totals.values_mut() {
        total.amount = rounding.to_cents(total.amount);
    }
    DistrictTotals { totals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exports::OrderId;
    use rust_decimal_macros::dec;

    fn split(id: &str, jurisdiction: Jurisdiction, taxable: Decimal) -> OrderSplit {
        OrderSplit {
            id: OrderId::new(id),
            jurisdiction,
            net: taxable,
            shipping: Decimal::ZERO,
            tax: Decimal::ZERO,
            taxable,
            nontaxable: Decimal::ZERO,
            from_tax_lines: true,
        }
    }

    fn city(name: &str) -> Jurisdiction {
        Jurisdiction::City(name.into())
    }

    fn county(name: &str) -> Jurisdiction {
        Jurisdiction::County(name.into())
    }

    #[test]
    fn each_jurisdiction_sums_only_its_orders() {
        let splits = vec![
            split("1", city("south lake tahoe"), dec!(20)),
            split("2", county("el dorado"), dec!(12.50)),
            split("3", city("south lake tahoe"), dec!(7.25)),
            split("4", city("davis"), dec!(30)),
            split("5", county("el dorado"), dec!(0.50)),
        ];
        let totals = aggregate_districts(&splits, Rounding::HalfUp);

        assert_eq!(totals.len(), 3);
        let tahoe = totals.totals.get(&city("south lake tahoe")).unwrap();
        assert_eq!(tahoe.amount, dec!(27.25));
        assert_eq!(tahoe.orders, 2);
        assert_eq!(totals.totals.get(&county("el dorado")).unwrap().amount, dec!(13.00));
        assert_eq!(totals.totals.get(&city("davis")).unwrap().amount, dec!(30));
        assert_eq!(totals.totals.get(&county("davis")), None);
        assert_eq!(totals.total(), dec!(70.25));
    }

    #[test]
    fn rounding_applies_to_accumulated_totals() {
        let splits = vec![
            split("1", city("davis"), dec!(10.0025)),
            split("2", city("davis"), dec!(10.0025)),
        ];
        assert_eq!(
            aggregate_districts(&splits, Rounding::HalfUp)
                .totals
                .get(&city("davis"))
                .unwrap()
                .amount,
            dec!(20.01)
        );
        assert_eq!(
            aggregate_districts(&splits, Rounding::HalfEven)
                .totals
                .get(&city("davis"))
                .unwrap()
                .amount,
            dec!(20.00)
        );
    }

    #[test]
    fn no_orders_no_totals() {
        let totals = aggregate_districts(&[], Rounding::HalfUp);
        assert!(totals.totals.is_empty());
        assert_eq!(totals.total(), Decimal::ZERO);
    }
}
