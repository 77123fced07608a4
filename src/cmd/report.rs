//! Report command - fill in Schedule A for the period

use super::{InputArgs, Prepared, REFERENCE_FILE};
use crate::diagnostics::Diagnostic;
use crate::money::format_usd;
use crate::reference::write_reference_csv;
use crate::schedule::Placement;
use crate::tax::{aggregate_districts, split_orders, summarize, RevenueSummary, TaxedState};
use crate::xlsx::{cell_ref, patch_first_sheet, CellPatch};
use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tempfile::NamedTempFile;

#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    inputs: InputArgs,

    /// Completed worksheet to write [default: scheduleA-<period>.xlsx]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Normalized city/county reference to write [default: formatted-city-to-county.csv]
    #[arg(long)]
    reference_out: Option<PathBuf>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// Report data for JSON output
#[derive(Debug, Serialize)]
struct ReportData {
    period: String,
    start: NaiveDate,
    end: NaiveDate,
    summary: RevenueSummary,
    taxable_subtotal: Decimal,
    districts: Vec<Placement>,
    diagnostics: Vec<Diagnostic>,
    output: PathBuf,
}

#[derive(Debug, Tabled)]
struct DistrictRow {
    #[tabled(rename = "Jurisdiction")]
    jurisdiction: String,
    #[tabled(rename = "District")]
    district: String,
    #[tabled(rename = "Orders")]
    orders: usize,
    #[tabled(rename = "Taxable Sales")]
    amount: String,
    #[tabled(rename = "Cell")]
    cell: String,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let inputs = &self.inputs;
        let state = inputs.state();
        let rounding = inputs.rounding();
        let Prepared {
            reference,
            template,
            book,
            ledger,
            classification,
        } = inputs.prepare()?;

        let reference_path = self
            .reference_out
            .clone()
            .unwrap_or_else(|| inputs.dir.join(REFERENCE_FILE));
        let file = File::create(&reference_path)
            .with_context(|| format!("Failed to create {}", reference_path.display()))?;
        write_reference_csv(&reference, BufWriter::new(file))?;
        log::info!("Wrote {}", reference_path.display());

        let shipping = inputs.load_shipping()?;
        let (splits, split_diagnostics) = split_orders(
            &classification.orders,
            &book,
            &ledger,
            &state.name,
            &shipping,
        );
        let totals = aggregate_districts(&splits, rounding);
        log::info!(
            "{} districts with taxable sales, shipping netted out as {:?}",
            totals.len(),
            shipping.policy()
        );
        let (summary, mismatch) = summarize(
            &book,
            &ledger,
            &classification.orders,
            &state,
            &shipping,
            rounding,
        );
        let fill = template.fill(&totals, summary.taxable_income);

        let output = self.output.clone().unwrap_or_else(|| {
            inputs
                .dir
                .join(format!("scheduleA-{}.xlsx", inputs.period.file_token()))
        });
        write_workbook(&inputs.schedule_path(), &output, &fill.patches)?;
        log::info!("Wrote {}", output.display());

        let mut diagnostics = classification.diagnostics;
        diagnostics.extend(split_diagnostics);
        diagnostics.extend(mismatch);
        diagnostics.extend(fill.diagnostics);

        let report = ReportData {
            period: inputs.period.to_string(),
            start: inputs.period.start_date(),
            end: inputs.period.end_date(),
            taxable_subtotal: totals.total(),
            summary,
            districts: fill.placements,
            diagnostics,
            output,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report, &state, template.layout().tax_amount_col);
        }
        Ok(())
    }
}

/// Patch the template into a temporary file beside `output`, then move it into place
fn write_workbook(template: &Path, output: &Path, patches: &[CellPatch]) -> anyhow::Result<()> {
    if same_file(template, output) {
        anyhow::bail!("Refusing to overwrite the worksheet template {}", template.display());
    }
    let input = File::open(template)
        .with_context(|| format!("Failed to open {}", template.display()))?;
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    patch_first_sheet(input, tmp.as_file_mut(), patches)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tmp.persist(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn print_report(report: &ReportData, state: &TaxedState, tax_col: u32) {
    let s = &report.summary;
    println!();
    println!(
        "SALES TAX SUMMARY ({}: {} to {})",
        report.period, report.start, report.end
    );
    println!();
    println!("REVENUE");
    println!(
        "  Gross: {} | Interstate: {} | Shipping: {}",
        format_usd(s.gross),
        format_usd(s.interstate_sales),
        format_usd(s.total_shipping)
    );
    println!();
    println!("SALES TAX");
    println!(
        "  From orders: {} | From tax report: {}",
        format_usd(s.sales_tax_orders),
        format_usd(s.sales_tax_report)
    );
    println!();
    println!("NONTAXABLE");
    println!(
        "  {}: {} | Total: {}",
        state.name,
        format_usd(s.nontaxable_in_state),
        format_usd(s.nontaxable)
    );
    println!();
    println!("TAXABLE INCOME: {}", format_usd(s.taxable_income));
    println!(
        "{} TAXABLE SUBTOTAL: {}",
        state.name.to_uppercase(),
        format_usd(report.taxable_subtotal)
    );
    println!();

    if report.districts.is_empty() {
        println!("No taxable orders in {}", state.name);
    } else {
        let rows: Vec<DistrictRow> = report
            .districts
            .iter()
            .map(|p| DistrictRow {
                jurisdiction: p.jurisdiction.to_string(),
                district: p.jurisdiction.district().to_string(),
                orders: p.orders,
                amount: format_usd(p.amount),
                cell: p
                    .row
                    .map_or_else(|| "-".to_string(), |row| cell_ref(row, tax_col)),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    if !report.diagnostics.is_empty() {
        println!();
        println!("WARNINGS ({})", report.diagnostics.len());
        for diagnostic in &report.diagnostics {
            println!("  {:<22} {}", diagnostic.kind(), diagnostic);
        }
    }
    println!();
    println!("Wrote {}", report.output.display());
}
