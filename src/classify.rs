//! Resolve each taxable order's shipping city to a county and district.

use crate::diagnostics::Diagnostic;
use crate::exports::orders::{Order, OrderBook};
use crate::exports::OrderId;
use crate::reference::{normalize_city, CountySurtaxIndex, JurisdictionIndex};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum County {
    Known(String),
    Unknown,
}

impl County {
    pub fn name(&self) -> &str {
        match self {
            County::Known(name) => name,
            County::Unknown => "unknown",
        }
    }
}

/// Whether an order is taxed at a city's district rate or at the county rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum District {
    /// The city levies its own district tax on top of the county's
    City,
    /// Only the county's unincorporated-area rate applies
    Unincorporated,
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            District::City => write!(f, "City"),
            District::Unincorporated => write!(f, "Unincorporated"),
        }
    }
}

/// Taxing authority a district total is reported under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "name")]
pub enum Jurisdiction {
    City(String),
    County(String),
}

impl Jurisdiction {
    pub fn district(&self) -> District {
        match self {
            Jurisdiction::City(_) => District::City,
            Jurisdiction::County(_) => District::Unincorporated,
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Jurisdiction::City(name) => write!(f, "{}", name),
            Jurisdiction::County(name) => write!(f, "{} county", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedOrder {
    pub id: OrderId,
    /// Normalized shipping city
    pub city: String,
    pub county: County,
    pub district: District,
}

impl ClassifiedOrder {
    pub fn jurisdiction(&self) -> Jurisdiction {
        match self.district {
            District::City => Jurisdiction::City(self.city.clone()),
            District::Unincorporated => Jurisdiction::County(self.county.name().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    jurisdictions: &'a JurisdictionIndex,
    surtax: &'a CountySurtaxIndex,
}

impl<'a> Classifier<'a> {
    pub fn new(jurisdictions: &'a JurisdictionIndex, surtax: &'a CountySurtaxIndex) -> Self {
        Classifier {
            jurisdictions,
            surtax,
        }
    }

    pub fn resolve_county(&self, city: &str) -> County {
        if let Some(county) = self.jurisdictions.county_of(city) {
            return County::Known(county.to_string());
        }
        // cities sharing their county's name are missing from the rate table
        if self.surtax.contains_county(city) {
            return County::Known(city.to_string());
        }
        County::Unknown
    }

    /// Classify one order. Unresolved cities also yield a diagnostic.
    pub fn classify(&self, id: &OrderId, shipping_city: &str) -> (ClassifiedOrder, Option<Diagnostic>) {
        let city = normalize_city(shipping_city);
        let county = self.resolve_county(&city);

        let diagnostic = (county == County::Unknown).then(|| {
            let suggestions = self
                .jurisdictions
                .suggestions(&city)
                .into_iter()
                .map(|e| format!("{} ({} county)", e.city, e.county))
                .collect();
            Diagnostic::UnresolvedCity {
                order: id.clone(),
                city: city.clone(),
                suggestions,
            }
            .raise()
        });

        let district = if self.surtax.levies_surtax(county.name(), &city) {
            District::City
        } else {
            District::Unincorporated
        };

        let order = ClassifiedOrder {
            id: id.clone(),
            city,
            county,
            district,
        };
        (order, diagnostic)
    }

    pub fn classify_all<'o, I>(&self, orders: I) -> Classification
    where
        I: IntoIterator<Item = &'o Order>,
    {
        let mut classification = Classification::default();
        for order in orders {
            let (classified, diagnostic) = self.classify(&order.id, &order.city);
            log::debug!(
                "{} | {} : {} : {}",
                classified.id,
                classified.city,
                classified.county.name(),
                classified.district
            );
            classification.orders.push(classified);
            classification.diagnostics.extend(diagnostic);
        }
        log::info!("Classified {} taxable orders", classification.orders.len());
        classification
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub orders: Vec<ClassifiedOrder>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Fulfilled, taxed, in-state orders whose tax the merchant files.
pub fn taxable_orders<'a>(
    book: &'a OrderBook,
    state_code: &'a str,
    channel_filed: &'a BTreeSet<OrderId>,
) -> impl Iterator<Item = &'a Order> {
    book.fulfilled().filter(move |o| {
        o.ships_to(state_code) && !o.taxes.is_zero() && !channel_filed.contains(&o.id)
    })
}
