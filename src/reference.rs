//! City → county reference data.
//!
//! Built from the CDTFA tax rate spreadsheet (city, rate, county by position)
//! and from the county/city listing in the Schedule A worksheet.

use crate::sheet::Grid;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::sync::LazyLock;

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*\)").expect("valid regex"));
static COUNTY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+county$").expect("valid regex"));

/// Rate spreadsheet columns
const CITY_COL: u32 = 0;
const COUNTY_COL: u32 = 2;

/// Strip annotations and footnote markers: `"Bell (LA County)*"` -> `"bell"`
pub fn normalize_city(raw: &str) -> String {
    let stripped = PARENTHETICAL.replace_all(raw, "");
    stripped.replace('*', "").trim().to_lowercase()
}

/// `"EL DORADO COUNTY"` -> `"el dorado"`
pub fn normalize_county(raw: &str) -> String {
    COUNTY_SUFFIX
        .replace(raw.trim(), "")
        .trim()
        .to_lowercase()
}

/// A city row of the rate spreadsheet, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRow {
    pub city: String,
    pub county: String,
}

impl RateRow {
    /// Rows without a county are county headers or dividers
    pub fn from_grid(grid: &Grid, row: u32) -> Option<RateRow> {
        let city = grid.text(row, CITY_COL)?;
        let county = grid.text(row, COUNTY_COL)?;
        Some(RateRow {
            city: city.to_string(),
            county: county.to_string(),
        })
    }
}

/// Normalized `City,County` pair, also the format of the persisted reference file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "County")]
    pub county: String,
}

/// Normalize the rate spreadsheet, ordered by county.
/// The first row holds generic column labels and is skipped.
pub fn build_reference(grid: &Grid) -> Vec<ReferenceEntry> {
    let mut entries: Vec<ReferenceEntry> = grid
        .rows_from(2)
        .filter_map(|row| RateRow::from_grid(grid, row))
        .filter_map(|row| {
            let city = normalize_city(&row.city);
            let county = normalize_county(&row.county);
            if city.is_empty() || county.is_empty() {
                log::debug!("Skipping rate row {:?}", row);
                return None;
            }
            Some(ReferenceEntry { city, county })
        })
        .collect();
    entries.sort_by(|a, b| a.county.cmp(&b.county));
    entries
}

pub fn write_reference_csv<W: Write>(entries: &[ReferenceEntry], writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for entry in entries {
        wtr.serialize(entry)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Normalized city → county lookup.
#[derive(Debug, Clone, Default)]
pub struct JurisdictionIndex {
    entries: Vec<ReferenceEntry>,
    by_city: HashMap<String, usize>,
}

impl JurisdictionIndex {
    /// A city listed under several counties resolves to its first entry
    pub fn new(entries: Vec<ReferenceEntry>) -> Self {
        let mut by_city = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            by_city.entry(entry.city.clone()).or_insert(i);
        }
        JurisdictionIndex { entries, by_city }
    }

    pub fn county_of(&self, city: &str) -> Option<&str> {
        self.by_city
            .get(city)
            .map(|&i| self.entries[i].county.as_str())
    }

    /// Reference entries whose city name contains, or is contained in, `city`
    pub fn suggestions(&self, city: &str) -> Vec<&ReferenceEntry> {
        let city = city.trim().to_lowercase();
        if city.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| e.city.contains(&city) || city.contains(&e.city))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_city.len()
    }
}

/// County → cities that levy a district tax on top of the county rate.
#[derive(Debug, Clone, Default)]
pub struct CountySurtaxIndex {
    counties: HashMap<String, BTreeSet<String>>,
}

impl CountySurtaxIndex {
    /// Build from raw `(county, city)` cells of the worksheet listing
    pub fn from_listing<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut counties: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (county, city) in rows {
            let county = normalize_county(county);
            if county.is_empty() {
                continue;
            }
            let cities = counties.entry(county).or_default();
            let city = normalize_city(city);
            if !city.is_empty() {
                cities.insert(city);
            }
        }
        CountySurtaxIndex { counties }
    }

    pub fn contains_county(&self, county: &str) -> bool {
        self.counties.contains_key(county)
    }

    pub fn levies_surtax(&self, county: &str, city: &str) -> bool {
        self.counties
            .get(county)
            .is_some_and(|cities| cities.contains(city))
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }
}
