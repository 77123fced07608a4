//! Store platform CSV exports.

pub mod billing;
pub mod orders;
pub mod tax_lines;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::Read;

/// Order number, compared without surrounding spaces or the leading `#`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        OrderId(trimmed.strip_prefix('#').unwrap_or(trimmed).trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(OrderId::new(&raw))
    }
}

impl Serialize for OrderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Deserialize every record of a CSV export with headers
pub fn read_records<T, R>(reader: R) -> anyhow::Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let records = rdr.deserialize().collect::<Result<Vec<T>, _>>()?;
    log::info!("Read {} csv records", records.len());
    Ok(records)
}

pub(crate) fn eq_ignore_case(field: Option<&str>, expected: &str) -> bool {
    field.is_some_and(|f| f.trim().eq_ignore_ascii_case(expected))
}
