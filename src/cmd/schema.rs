//! Schema command - print expected input formats

use crate::schedule::ScheduleLayout;
use crate::xlsx::column_letters;
use clap::Args;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Print only the CSV header rows
    #[arg(long)]
    headers: bool,
}

struct Export {
    name: &'static str,
    default_path: &'static str,
    fields: &'static [(&'static str, bool, &'static str)],
}

const EXPORTS: &[Export] = &[
    Export {
        name: "Orders export",
        default_path: "orders-<period>.csv",
        fields: &[
            ("Name", true, "Order number, e.g. #1001"),
            ("Fulfillment Status", true, "Only 'fulfilled' orders are counted"),
            ("Total", true, "Order total including shipping and tax"),
            ("Refunded Amount", false, "Refunds, subtracted from the total"),
            ("Shipping", false, "Shipping charged to the customer"),
            ("Taxes", false, "Sales tax charged"),
            ("Shipping City", true, "Destination city"),
            ("Shipping Province", true, "Destination state code, e.g. CA"),
            ("Created at", false, "Order timestamp, used with --within-period"),
        ],
    },
    Export {
        name: "Tax report",
        default_path: "taxes-<period>.csv",
        fields: &[
            ("Order", true, "Order number"),
            ("Destination State", true, "Full state name, e.g. California"),
            ("Filed By Channel", true, "'Filed' when the sales channel remitted the tax"),
            ("Sale Type", false, "Only 'Order' lines are counted"),
            ("Product", false, "Product title"),
            ("Product Variant", false, "Variant title"),
            ("Jurisdiction", false, "Taxing jurisdiction of the line"),
            ("Tax Rate", true, "Fraction (0.0725) or percentage (7.25%)"),
            ("Tax Amount", true, "Tax charged on the line"),
        ],
    },
    Export {
        name: "Billing export",
        default_path: "billing-<period>.csv",
        fields: &[
            ("Order", true, "Order number"),
            ("Charge category", true, "Shipping label rows contain 'shipping'"),
            ("Amount", true, "Amount charged"),
        ],
    },
];

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        if self.headers {
            for export in EXPORTS {
                let names: Vec<&str> = export.fields.iter().map(|(name, _, _)| *name).collect();
                println!("{}", names.join(","));
            }
            return Ok(());
        }

        for export in EXPORTS {
            println!("{} ({})", export.name, export.default_path);
            for (name, required, description) in export.fields {
                let req = if *required { "required" } else { "optional" };
                println!("  {:20} ({:8})  {}", name, req, description);
            }
            println!();
        }
        self.print_workbooks();
        Ok(())
    }

    fn print_workbooks(&self) {
        let layout = ScheduleLayout::default();
        println!("Tax rates ({})", super::RATES_FILE);
        println!("  First worksheet, first row skipped. Column A city, column C county.");
        println!();
        println!("Schedule A ({})", super::SCHEDULE_FILE);
        println!(
            "  First worksheet, jurisdiction rows from row {}.",
            layout.first_data_row
        );
        println!(
            "  Column {} tax amount, column {} county, column {} city or area.",
            column_letters(layout.tax_amount_col),
            column_letters(layout.county_col),
            column_letters(layout.label_col)
        );
        println!(
            "  Taxable income is added to {}.",
            layout.running_total_ref()
        );
    }
}
