pub mod classify;
pub mod reference;
pub mod report;
pub mod schema;

use crate::classify::{taxable_orders, Classification, Classifier};
use crate::exports::billing::{label_costs, BillingRecord};
use crate::exports::orders::{OrderBook, OrderRecord};
use crate::exports::read_records;
use crate::exports::tax_lines::{TaxLedger, TaxLineRecord};
use crate::money::Rounding;
use crate::period::Quarter;
use crate::reference::{build_reference, JurisdictionIndex, ReferenceEntry};
use crate::schedule::{ScheduleLayout, ScheduleTemplate};
use crate::sheet::Grid;
use crate::tax::{Shipping, ShippingPolicy, TaxedState};
use anyhow::Context;
use clap::{Args, ValueEnum};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const RATES_FILE: &str = "tax-rates.xlsx";
pub const SCHEDULE_FILE: &str = "scheduleA.xlsx";
pub const REFERENCE_FILE: &str = "formatted-city-to-county.csv";

/// Input files and filing options shared by the commands
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Reporting quarter (e.g. 2023-q1), also names the default export files
    #[arg(short, long, default_value = "2023-q1")]
    pub period: Quarter,

    /// Directory holding the input files
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Orders export [default: orders-<period>.csv]
    #[arg(long)]
    pub orders: Option<PathBuf>,

    /// Tax line-item report [default: taxes-<period>.csv]
    #[arg(long)]
    pub taxes: Option<PathBuf>,

    /// Billing export, read with `--shipping label-cost` [default: billing-<period>.csv]
    #[arg(long)]
    pub billing: Option<PathBuf>,

    /// CDTFA tax rate spreadsheet [default: tax-rates.xlsx]
    #[arg(long)]
    pub rates: Option<PathBuf>,

    /// Schedule A worksheet template [default: scheduleA.xlsx]
    #[arg(long)]
    pub schedule: Option<PathBuf>,

    /// Postal code of the taxed state, as in the orders export
    #[arg(long, default_value = "CA")]
    pub state_code: String,

    /// Name of the taxed state, as in the tax report
    #[arg(long, default_value = "California")]
    pub state_name: String,

    /// Which shipping figure is netted out of sales
    #[arg(long, value_enum, default_value_t = ShippingArg::Collected)]
    pub shipping: ShippingArg,

    /// Rounding of district totals to cents
    #[arg(long, value_enum, default_value_t = RoundingArg::HalfUp)]
    pub rounding: RoundingArg,

    /// Ignore orders created outside the reporting quarter
    #[arg(long)]
    pub within_period: bool,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ShippingArg {
    /// Shipping charged to customers
    #[default]
    Collected,
    /// Shipping labels bought, from the billing export
    LabelCost,
}

impl From<ShippingArg> for ShippingPolicy {
    fn from(arg: ShippingArg) -> Self {
        match arg {
            ShippingArg::Collected => ShippingPolicy::Collected,
            ShippingArg::LabelCost => ShippingPolicy::LabelCost,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum RoundingArg {
    #[default]
    HalfUp,
    HalfEven,
}

impl From<RoundingArg> for Rounding {
    fn from(arg: RoundingArg) -> Self {
        match arg {
            RoundingArg::HalfUp => Rounding::HalfUp,
            RoundingArg::HalfEven => Rounding::HalfEven,
        }
    }
}

/// Everything read from the inputs, with the taxable orders classified
pub struct Prepared {
    pub reference: Vec<ReferenceEntry>,
    pub template: ScheduleTemplate,
    pub book: OrderBook,
    pub ledger: TaxLedger,
    pub classification: Classification,
}

impl InputArgs {
    fn resolve(&self, explicit: &Option<PathBuf>, default_name: String) -> PathBuf {
        explicit
            .clone()
            .unwrap_or_else(|| self.dir.join(default_name))
    }

    pub fn orders_path(&self) -> PathBuf {
        self.resolve(&self.orders, format!("orders-{}.csv", self.period.file_token()))
    }

    pub fn taxes_path(&self) -> PathBuf {
        self.resolve(&self.taxes, format!("taxes-{}.csv", self.period.file_token()))
    }

    pub fn billing_path(&self) -> PathBuf {
        self.resolve(&self.billing, format!("billing-{}.csv", self.period.file_token()))
    }

    pub fn rates_path(&self) -> PathBuf {
        self.resolve(&self.rates, RATES_FILE.to_string())
    }

    pub fn schedule_path(&self) -> PathBuf {
        self.resolve(&self.schedule, SCHEDULE_FILE.to_string())
    }

    pub fn state(&self) -> TaxedState {
        TaxedState {
            code: self.state_code.clone(),
            name: self.state_name.clone(),
        }
    }

    pub fn rounding(&self) -> Rounding {
        self.rounding.into()
    }

    pub fn load_orders(&self) -> anyhow::Result<OrderBook> {
        let records: Vec<OrderRecord> = read_csv(&self.orders_path())?;
        let mut book = OrderBook::from_records(records);
        log::info!("Loaded {} orders", book.len());
        if self.within_period {
            let dropped = book.retain_within(&self.period);
            log::info!("Ignoring {} orders created outside {}", dropped, self.period);
        }
        Ok(book)
    }

    pub fn load_ledger(&self) -> anyhow::Result<TaxLedger> {
        let records: Vec<TaxLineRecord> = read_csv(&self.taxes_path())?;
        Ok(TaxLedger::from_records(records))
    }

    pub fn load_shipping(&self) -> anyhow::Result<Shipping> {
        match ShippingPolicy::from(self.shipping) {
            ShippingPolicy::Collected => Ok(Shipping::collected()),
            ShippingPolicy::LabelCost => {
                let records: Vec<BillingRecord> = read_csv(&self.billing_path())?;
                Ok(Shipping::label_cost(label_costs(&records)))
            }
        }
    }

    pub fn load_reference(&self) -> anyhow::Result<Vec<ReferenceEntry>> {
        let path = self.rates_path();
        let grid = Grid::open(&path)
            .with_context(|| format!("Failed to read tax rates {}", path.display()))?;
        let reference = build_reference(&grid);
        log::info!("Loaded {} cities from {}", reference.len(), path.display());
        Ok(reference)
    }

    pub fn load_template(&self) -> anyhow::Result<ScheduleTemplate> {
        let path = self.schedule_path();
        let grid = Grid::open(&path)
            .with_context(|| format!("Failed to read schedule worksheet {}", path.display()))?;
        Ok(ScheduleTemplate::from_grid(&grid, ScheduleLayout::default()))
    }

    /// Read every input and classify the taxable orders
    pub fn prepare(&self) -> anyhow::Result<Prepared> {
        let state = self.state();
        let reference = self.load_reference()?;
        let template = self.load_template()?;
        let book = self.load_orders()?;
        let ledger = self.load_ledger()?;

        let jurisdictions = JurisdictionIndex::new(reference.clone());
        let surtax = template.surtax_index();
        log::info!(
            "{} cities in the reference, {} counties listed on the worksheet",
            jurisdictions.len(),
            surtax.len()
        );
        let channel_filed = ledger.channel_filed_orders(&state.name);
        if !channel_filed.is_empty() {
            log::info!("{} orders had their tax filed by the sales channel", channel_filed.len());
        }
        let classification = Classifier::new(&jurisdictions, &surtax)
            .classify_all(taxable_orders(&book, &state.code, &channel_filed));

        Ok(Prepared {
            reference,
            template,
            book,
            ledger,
            classification,
        })
    }
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_records(BufReader::new(file)).with_context(|| format!("Failed to parse {}", path.display()))
}
