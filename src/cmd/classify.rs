//! Classify command - county and district of every taxable order

use super::InputArgs;
use crate::classify::ClassifiedOrder;
use clap::Args;
use serde::Serialize;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ClassifyCommand {
    #[command(flatten)]
    inputs: InputArgs,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

#[derive(Debug, Clone, Tabled, Serialize)]
struct ClassifiedRow {
    #[tabled(rename = "Order")]
    order: String,
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "County")]
    county: String,
    #[tabled(rename = "District")]
    district: String,
    #[tabled(rename = "Reported Under")]
    jurisdiction: String,
}

impl From<&ClassifiedOrder> for ClassifiedRow {
    fn from(order: &ClassifiedOrder) -> Self {
        ClassifiedRow {
            order: order.id.to_string(),
            city: order.city.clone(),
            county: order.county.name().to_string(),
            district: order.district.to_string(),
            jurisdiction: order.jurisdiction().to_string(),
        }
    }
}

impl ClassifyCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let prepared = self.inputs.prepare()?;
        for diagnostic in &prepared.classification.diagnostics {
            log::warn!("{}", diagnostic);
        }
        let rows: Vec<ClassifiedRow> = prepared
            .classification
            .orders
            .iter()
            .map(ClassifiedRow::from)
            .collect();

        if self.csv {
            self.write_csv(&rows)
        } else {
            self.print_table(&rows);
            Ok(())
        }
    }

    fn print_table(&self, rows: &[ClassifiedRow]) {
        if rows.is_empty() {
            println!("No taxable orders found");
            return;
        }

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::left()))
            .to_string();
        println!("{}", table);
    }

    fn write_csv(&self, rows: &[ClassifiedRow]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
