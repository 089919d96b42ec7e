//! Carriers present in a dataset and their display names.
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs::File,
    io::Read,
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    record::{carrier_code, width, RecordKind, MIN_FLIGHT_LEN},
    Result,
};

/// Carrier codes, sorted ascending.
pub type CarrierSet = BTreeSet<String>;

fn flight_carriers<I>(lines: I) -> impl Iterator<Item = String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    lines.into_iter().filter_map(|line| {
        let line = line.as_ref();
        if RecordKind::classify(line) != RecordKind::FlightData || width(line) < MIN_FLIGHT_LEN {
            return None;
        }
        carrier_code(line).map(str::to_string)
    })
}

/// Every carrier with at least one flight record in `lines`.
///
/// # Example
/// ```
/// use ssim::carriers::carrier_index;
///
/// let carriers = carrier_index(["3 G3 1007", "3 AF 0415", "3 G3 1008", "2LG3"]);
/// assert_eq!(carriers.into_iter().collect::<Vec<_>>(), ["AF", "G3"]);
/// ```
pub fn carrier_index<I>(lines: I) -> CarrierSet
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    flight_carriers(lines).collect()
}

/// Number of flight records per carrier.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CarrierSummary {
    counts: BTreeMap<String, usize>,
}

impl CarrierSummary {
    /// Count the flight records of each carrier in `lines`.
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut summary = Self::default();
        for code in flight_carriers(lines) {
            summary.add(code);
        }
        summary
    }

    pub fn add(&mut self, code: String) {
        *self.counts.entry(code).or_default() += 1;
    }

    #[must_use]
    pub fn count(&self, code: &str) -> usize {
        self.counts.get(code).copied().unwrap_or_default()
    }

    /// Total number of flight records counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Carrier codes in ascending order.
    #[must_use]
    pub fn carriers(&self) -> CarrierSet {
        self.counts.keys().cloned().collect()
    }

    /// `(code, count)` in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(code, count)| (code.as_str(), *count))
    }
}

#[derive(Deserialize)]
struct AirlineRow {
    #[serde(rename = "IATA Designator")]
    designator: String,
    #[serde(rename = "Airline Name")]
    name: String,
}

/// Maps carrier codes to display names.
#[derive(Debug, Clone, Default)]
pub struct CarrierNames {
    names: HashMap<String, String>,
}

impl CarrierNames {
    /// Load from CSV data with `IATA Designator` and `Airline Name` columns. Rows
    /// with a blank designator or name are skipped; the first name of a designator wins.
    ///
    /// # Errors
    /// [Error::Csv](crate::Error::Csv) if the data cannot be read as CSV with the
    /// expected columns.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut names = HashMap::default();
        let mut rdr = csv::Reader::from_reader(reader);
        for row in rdr.deserialize() {
            let row: AirlineRow = row?;
            let (code, name) = (row.designator.trim(), row.name.trim());
            if code.is_empty() || name.is_empty() {
                continue;
            }
            names
                .entry(code.to_string())
                .or_insert_with(|| name.to_string());
        }
        debug!(carriers = names.len(), "loaded carrier names");
        Ok(Self { names })
    }

    /// Load from a CSV file. See [CarrierNames::from_reader].
    ///
    /// # Errors
    /// If the file cannot be opened or read as CSV.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// `"<code> - <name>"`, or just the code if its name is unknown.
    #[must_use]
    pub fn label(&self, code: &str) -> String {
        match self.get(code) {
            Some(name) => format!("{code} - {name}"),
            None => code.to_string(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
