//! Record classification and fixed-width line helpers.
//!
//! SSIM files are made of 200 column records. The first one or two columns
//! identify the record type. All column positions in this crate are 0-based
//! character columns.

/// Width of every record in an output file.
pub const LINE_LEN: usize = 200;
/// Width of the record serial number closing every flight record.
pub const SERIAL_LEN: usize = 8;
/// Column of the 2 character carrier designator in a flight record.
pub const CARRIER_COLUMN: usize = 2;
/// Width of the carrier designator.
pub const CARRIER_LEN: usize = 2;
/// Flight records shorter than this carry no usable data.
pub const MIN_FLIGHT_LEN: usize = 6;

/// Kind of a record as given by its leading type indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Type 1, header record.
    CarrierHeader1,
    /// Type 2, carrier record.
    CarrierHeader2,
    /// Block separator of 200 `'0'`.
    ZeroFiller,
    /// Type 3, flight leg record.
    FlightData,
    /// Type 5, trailer record.
    Trailer,
    Unclassified,
}

impl RecordKind {
    /// Classify `line` by its leading characters. Never fails; anything not
    /// recognized is [RecordKind::Unclassified].
    #[must_use]
    pub fn classify(line: &str) -> Self {
        if line.starts_with("3 ") {
            return Self::FlightData;
        }
        match line.as_bytes().first() {
            Some(b'1') => Self::CarrierHeader1,
            Some(b'2') => Self::CarrierHeader2,
            Some(b'0') => Self::ZeroFiller,
            Some(b'5') => Self::Trailer,
            _ => Self::Unclassified,
        }
    }

    #[must_use]
    pub fn is_header(&self) -> bool {
        matches!(self, Self::CarrierHeader1 | Self::CarrierHeader2)
    }
}

/// What to do with lines that have no recognized type indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnclassifiedPolicy {
    #[default]
    Drop,
    /// Emit the line unchanged, in input order, with the header records.
    Keep,
}

/// A line of 200 `'0'`.
#[must_use]
pub fn zero_filler() -> String {
    "0".repeat(LINE_LEN)
}

/// Number of characters (columns) in `line`.
#[must_use]
pub fn width(line: &str) -> usize {
    if line.is_ascii() {
        line.len()
    } else {
        line.chars().count()
    }
}

/// Byte offset of character `column` in `line`, or `line.len()` if the line is
/// shorter.
#[must_use]
pub fn byte_offset(line: &str, column: usize) -> usize {
    if line.is_ascii() {
        return column.min(line.len());
    }
    line.char_indices()
        .nth(column)
        .map_or(line.len(), |(idx, _)| idx)
}

/// Characters `start..end` of `line`, clamped to the line.
#[must_use]
pub fn columns(line: &str, start: usize, end: usize) -> &str {
    let start = byte_offset(line, start);
    let end = byte_offset(line, end).max(start);
    &line[start..end]
}

/// Truncate or right-pad `line` with spaces to exactly `len` characters.
#[must_use]
pub fn fit(line: &str, len: usize) -> String {
    let cut = byte_offset(line, len);
    let mut fitted = String::with_capacity(len);
    fitted.push_str(&line[..cut]);
    let have = width(&fitted);
    fitted.extend(std::iter::repeat(' ').take(len.saturating_sub(have)));
    fitted
}

/// The trimmed carrier designator of a flight record, if it is a non-empty
/// alphanumeric code.
#[must_use]
pub fn carrier_code(line: &str) -> Option<&str> {
    let code = columns(line, CARRIER_COLUMN, CARRIER_COLUMN + CARRIER_LEN).trim();
    if !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(code)
    } else {
        None
    }
}
