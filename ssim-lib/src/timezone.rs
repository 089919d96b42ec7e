//! Airport UTC offsets.
use std::{collections::HashMap, fs::File, io::Read, path::Path};

use serde::Deserialize;
use tracing::{debug, trace};

use crate::Result;

/// Offset used when an airport is unknown (Brasília, UTC-3).
pub const DEFAULT_OFFSET_HOURS: i32 = -3;

/// Maps IATA airport codes to whole-hour UTC offsets.
///
/// # Example
/// ```
/// use ssim::timezone::{resolve, AirportOffsetTable};
///
/// let table: AirportOffsetTable = [("JFK", -5)].into_iter().collect();
/// assert_eq!(resolve("JFK", Some(&table)), -5);
/// assert_eq!(resolve("GRU", Some(&table)), -3);
/// assert_eq!(resolve("JFK", None), -3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AirportOffsetTable {
    offsets: HashMap<String, i32>,
}

#[derive(Deserialize)]
struct AirportRow {
    #[serde(rename = "IATA")]
    iata: String,
    #[serde(rename = "Timezone")]
    timezone: String,
}

impl AirportOffsetTable {
    /// Load from CSV data with `IATA` and `Timezone` columns. Other columns are
    /// ignored. Fractional offsets are truncated to whole hours and rows without a
    /// usable code or offset are skipped.
    ///
    /// # Errors
    /// [Error::Csv](crate::Error::Csv) if the data cannot be read as CSV with the
    /// expected columns.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut table = Self::default();
        let mut rdr = csv::Reader::from_reader(reader);
        for row in rdr.deserialize() {
            let row: AirportRow = row?;
            let code = row.iata.trim();
            if code.is_empty() {
                continue;
            }
            let Ok(hours) = row.timezone.trim().parse::<f64>() else {
                trace!(code, timezone = %row.timezone, "skipping airport without offset");
                continue;
            };
            #[allow(clippy::cast_possible_truncation)]
            let hours = hours.trunc() as i32;
            table.insert(code, hours);
        }
        debug!(airports = table.len(), "loaded airport offsets");
        Ok(table)
    }

    /// Load from a CSV file. See [AirportOffsetTable::from_reader].
    ///
    /// # Errors
    /// If the file cannot be opened or read as CSV.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn insert(&mut self, code: &str, hours: i32) {
        self.offsets.insert(code.to_string(), hours);
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<i32> {
        self.offsets.get(code).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, i32)> for AirportOffsetTable {
    fn from_iter<T: IntoIterator<Item = (S, i32)>>(iter: T) -> Self {
        let mut table = Self::default();
        for (code, hours) in iter {
            table.insert(code.as_ref(), hours);
        }
        table
    }
}

/// UTC offset in hours for `airport`; [DEFAULT_OFFSET_HOURS] if there is no table
/// or the airport is not in it.
#[must_use]
pub fn resolve(airport: &str, table: Option<&AirportOffsetTable>) -> i32 {
    table
        .and_then(|t| t.get(airport))
        .unwrap_or(DEFAULT_OFFSET_HOURS)
}
