//! The Schedule A worksheet: where each jurisdiction's total goes.

use crate::classify::Jurisdiction;
use crate::diagnostics::Diagnostic;
use crate::reference::{normalize_city, CountySurtaxIndex};
use crate::sheet::Grid;
use crate::tax::DistrictTotals;
use crate::xlsx::{cell_ref, CellPatch};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fixed cell positions of the worksheet. Rows 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleLayout {
    pub first_data_row: u32,
    pub tax_amount_col: u32,
    pub county_col: u32,
    pub label_col: u32,
    pub running_total_row: u32,
    pub running_total_col: u32,
}

impl Default for ScheduleLayout {
    fn default() -> Self {
        ScheduleLayout {
            first_data_row: 9,
            tax_amount_col: 6,
            county_col: 8,
            label_col: 9,
            running_total_row: 4,
            running_total_col: 10,
        }
    }
}

impl ScheduleLayout {
    pub fn running_total_ref(&self) -> String {
        cell_ref(self.running_total_row, self.running_total_col)
    }
}

/// One jurisdiction row of the worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub row: u32,
    pub county: Option<String>,
    /// City or area name as printed on the form
    pub label: String,
    /// Amount already in the tax amount cell
    pub tax_amount: Option<Decimal>,
}

impl ScheduleRow {
    pub fn from_grid(grid: &Grid, row: u32, layout: &ScheduleLayout) -> Option<ScheduleRow> {
        let county = grid.text(row, layout.county_col);
        let label = grid.text(row, layout.label_col);
        if county.is_none() && label.is_none() {
            return None;
        }
        Some(ScheduleRow {
            row,
            county: county.map(str::to_string),
            label: label.unwrap_or_default().to_string(),
            tax_amount: grid.number(row, layout.tax_amount_col),
        })
    }

    fn normalized_label(&self) -> String {
        normalize_city(&self.label)
    }
}

/// Where a jurisdiction total went, `row` is `None` when it had nowhere to go
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub jurisdiction: Jurisdiction,
    pub amount: Decimal,
    pub orders: usize,
    pub row: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleFill {
    pub patches: Vec<CellPatch>,
    pub placements: Vec<Placement>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct ScheduleTemplate {
    layout: ScheduleLayout,
    rows: Vec<ScheduleRow>,
    running_total: Option<Decimal>,
}

impl ScheduleTemplate {
    pub fn from_grid(grid: &Grid, layout: ScheduleLayout) -> Self {
        let rows: Vec<ScheduleRow> = grid
            .rows_from(layout.first_data_row)
            .filter_map(|row| ScheduleRow::from_grid(grid, row, &layout))
            .collect();
        log::debug!("Schedule worksheet has {} jurisdiction rows", rows.len());
        ScheduleTemplate {
            layout,
            rows,
            running_total: grid.number(layout.running_total_row, layout.running_total_col),
        }
    }

    pub fn layout(&self) -> &ScheduleLayout {
        &self.layout
    }

    /// Cities listed under each county, i.e. those with their own district tax
    pub fn surtax_index(&self) -> CountySurtaxIndex {
        CountySurtaxIndex::from_listing(
            self.rows
                .iter()
                .filter_map(|r| r.county.as_deref().map(|county| (county, r.label.as_str()))),
        )
    }

    /// A label equal to `pattern` wins over the first label containing it
    fn find_label(&self, pattern: &str) -> Option<&ScheduleRow> {
        self.rows
            .iter()
            .find(|r| r.normalized_label() == pattern)
            .or_else(|| {
                self.rows
                    .iter()
                    .find(|r| r.label.to_lowercase().contains(pattern))
            })
    }

    pub fn find_row(&self, jurisdiction: &Jurisdiction) -> Option<&ScheduleRow> {
        match jurisdiction {
            Jurisdiction::City(city) => self.find_label(city),
            Jurisdiction::County(county) => self
                .find_label(&format!("{} county", county))
                .or_else(|| self.find_label(&format!("{} county unincorporated area", county))),
        }
    }

    /// Cell values for the output workbook: each district total added to its
    /// row's tax amount and the taxable income added to the running total.
    pub fn fill(&self, totals: &DistrictTotals, taxable_income: Decimal) -> ScheduleFill {
        let mut fill = ScheduleFill::default();
        let mut amounts: BTreeMap<u32, Decimal> = BTreeMap::new();

        for (jurisdiction, total) in totals.iter() {
            let row = self.find_row(jurisdiction);
            match row {
                Some(row) => {
                    log::debug!("{} -> row {} ({})", jurisdiction, row.row, row.label);
                    *amounts
                        .entry(row.row)
                        .or_insert_with(|| row.tax_amount.unwrap_or_default()) += total.amount;
                }
                None => fill.diagnostics.push(
                    Diagnostic::UnmatchedScheduleRow {
                        jurisdiction: jurisdiction.to_string(),
                        amount: total.amount,
                    }
                    .raise(),
                ),
            }
            fill.placements.push(Placement {
                jurisdiction: jurisdiction.clone(),
                amount: total.amount,
                orders: total.orders,
                row: row.map(|r| r.row),
            });
        }

        fill.patches = amounts
            .into_iter()
            .map(|(row, value)| CellPatch {
                row,
                col: self.layout.tax_amount_col,
                value,
            })
            .collect();
        fill.patches.push(CellPatch {
            row: self.layout.running_total_row,
            col: self.layout.running_total_col,
            value: self.running_total.unwrap_or_default() + taxable_income,
        });
        fill
    }
}
