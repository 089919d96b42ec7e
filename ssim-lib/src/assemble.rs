//! Assembly of the numbered output document.
//!
//! Every line of an output document carries its 1-based position implicitly.
//! Flight records embed it in their last 8 columns and the trailer embeds both the
//! position of the last flight record and its own position.
use std::{fmt::Display, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::{
    record::{carrier_code, columns, fit, width, zero_filler, RecordKind, LINE_LEN, SERIAL_LEN},
    Error, Result,
};

/// Number of zero filler lines around the flight records.
pub const FILLER_COUNT: usize = 4;
/// Carrier code written to the trailer when all carriers are selected.
pub const ALL_CARRIERS_CODE: &str = "XX";
/// Width of each of the trailer's counters.
const COUNTER_LEN: usize = 6;

/// Which carriers' flight records are emitted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CarrierSelection {
    #[default]
    All,
    Code(String),
}

impl CarrierSelection {
    /// True if the flight record `line` belongs to the selection.
    #[must_use]
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Self::All => true,
            Self::Code(code) => carrier_code(line) == Some(code.as_str()),
        }
    }

    fn trailer_code(&self) -> &str {
        match self {
            Self::All => ALL_CARRIERS_CODE,
            Self::Code(code) => columns(code, 0, 2),
        }
    }

    fn file_token(&self) -> &str {
        match self {
            Self::All => "ALL_CARRIERS",
            Self::Code(code) => code,
        }
    }
}

impl FromStr for CarrierSelection {
    type Err = String;

    /// `ALL` in any case selects all carriers; anything else is a carrier code.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("carrier code cannot be empty".to_string());
        }
        if s.eq_ignore_ascii_case("ALL") {
            Ok(Self::All)
        } else {
            Ok(Self::Code(s.to_ascii_uppercase()))
        }
    }
}

impl Display for CarrierSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "ALL"),
            Self::Code(code) => write!(f, "{code}"),
        }
    }
}

/// Orders header, filler, flight and trailer records into an [OutputDocument].
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use ssim::assemble::{Assembler, CarrierSelection};
///
/// let doc = Assembler::builder()
///     .selection(CarrierSelection::All)
///     .issued(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap())
///     .season("W25")
///     .build()
///     .assemble(["1AIRLINE STANDARD SCHEDULE DATA SET"], ["3 AF 0415"]);
///
/// assert_eq!(doc.lines().len(), 11);
/// assert!(doc.lines()[5].ends_with("00000006"));
/// assert!(doc.check().is_ok());
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct Assembler {
    selection: CarrierSelection,
    /// Date written to the trailer.
    issued: NaiveDate,
    /// Season label, e.g., `W25`.
    #[builder(setter(into))]
    season: String,
    /// Offset the times were converted to, if they were.
    #[builder(default)]
    converted_to: Option<i32>,
    /// Whether flight records were adapted to the target dialect.
    #[builder(default)]
    dialect: bool,
}

impl Assembler {
    /// Build the document from header records and already transformed flight
    /// records, both in input order.
    ///
    /// Header records are fitted to the record width. When there is at least one,
    /// four zero fillers follow the first. Flight records are cut or padded to 192
    /// columns and numbered. Four zero fillers and a trailer close the document.
    pub fn assemble<H, D>(&self, headers: H, data: D) -> OutputDocument
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let mut lines = Vec::default();
        for (idx, header) in headers.into_iter().enumerate() {
            lines.push(fit(header.as_ref(), LINE_LEN));
            if idx == 0 {
                lines.extend(std::iter::repeat_with(zero_filler).take(FILLER_COUNT));
            }
        }

        let mut data_lines = 0;
        for line in data {
            let number = lines.len() + 1;
            lines.push(numbered(line.as_ref(), number));
            data_lines += 1;
        }

        lines.extend(std::iter::repeat_with(zero_filler).take(FILLER_COUNT));
        let number = lines.len() + 1;
        lines.push(trailer(
            self.selection.trailer_code(),
            self.issued,
            number - FILLER_COUNT - 1,
            number,
        ));
        debug!(lines = lines.len(), data_lines, "assembled document");

        OutputDocument {
            lines,
            data_lines,
            selection: self.selection.clone(),
            season: self.season.clone(),
            converted_to: self.converted_to,
            dialect: self.dialect,
        }
    }
}

fn numbered(line: &str, number: usize) -> String {
    format!(
        "{}{number:0width$}",
        fit(line, LINE_LEN - SERIAL_LEN),
        width = SERIAL_LEN
    )
}

fn trailer(code: &str, issued: NaiveDate, last: usize, number: usize) -> String {
    let head = format!(
        "5 {code} {}",
        issued.format("%d%b%y").to_string().to_uppercase()
    );
    let tail = format!("{last:0width$}E{number:0width$}", width = COUNTER_LEN);
    let pad = LINE_LEN.saturating_sub(width(&head) + tail.len());
    format!("{head}{}{tail}", " ".repeat(pad))
}

/// Final sequence of fixed width records.
#[derive(Debug, Clone)]
pub struct OutputDocument {
    lines: Vec<String>,
    data_lines: usize,
    selection: CarrierSelection,
    season: String,
    converted_to: Option<i32>,
    dialect: bool,
}

impl OutputDocument {
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Number of flight records.
    #[must_use]
    pub fn data_lines(&self) -> usize {
        self.data_lines
    }

    /// Verify that every record is [LINE_LEN] wide, that each flight record
    /// carries its own position and that the document ends with a trailer
    /// carrying the position of the last flight record and its own.
    ///
    /// # Errors
    /// [Error::LineLength] or [Error::Sequence] for the first offending record.
    pub fn check(&self) -> Result<()> {
        let last = self.lines.len();
        for (idx, line) in self.lines.iter().enumerate() {
            let position = idx + 1;
            let actual = width(line);
            if actual != LINE_LEN {
                return Err(Error::LineLength {
                    line: position,
                    actual,
                    expected: LINE_LEN,
                });
            }
            let found = match RecordKind::classify(line) {
                RecordKind::FlightData => counter(line, LINE_LEN - SERIAL_LEN, LINE_LEN),
                RecordKind::Trailer if position == last => {
                    let expected = position.saturating_sub(FILLER_COUNT + 1);
                    let end = LINE_LEN - COUNTER_LEN - 1;
                    let found = counter(line, end - COUNTER_LEN, end);
                    if found != Some(expected) {
                        return Err(Error::Sequence {
                            line: position,
                            found,
                            expected,
                        });
                    }
                    counter(line, LINE_LEN - COUNTER_LEN, LINE_LEN)
                }
                _ => continue,
            };
            if found != Some(position) {
                return Err(Error::Sequence {
                    line: position,
                    found,
                    expected: position,
                });
            }
        }

        match self.lines.last() {
            Some(line) if RecordKind::classify(line) == RecordKind::Trailer => Ok(()),
            _ => Err(Error::Sequence {
                line: last,
                found: None,
                expected: last,
            }),
        }
    }

    /// Lines joined with `\n`, one byte per character. Characters outside
    /// Latin-1 are written as `?`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.lines.len() * (LINE_LEN + 1));
        for (idx, line) in self.lines.iter().enumerate() {
            if idx > 0 {
                bytes.push(b'\n');
            }
            bytes.extend(
                line.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')),
            );
        }
        bytes
    }

    /// File name describing the selection, season, time reference and format, e.g.,
    /// `ssim_AF_W25_UTC-3_TIME_TARGET_FORMAT_20251001_134501.ssim`.
    #[must_use]
    pub fn file_name(&self, timestamp: &NaiveDateTime) -> String {
        let time = match self.converted_to {
            Some(hours) => format!("UTC{hours:+}_TIME"),
            None => "LOCAL_TIME".to_string(),
        };
        let format = if self.dialect {
            "TARGET_FORMAT"
        } else {
            "SOURCE_FORMAT"
        };
        format!(
            "ssim_{}_{}_{time}_{format}_{}.ssim",
            self.selection.file_token(),
            self.season,
            timestamp.format("%Y%m%d_%H%M%S"),
        )
    }
}

fn counter(line: &str, start: usize, end: usize) -> Option<usize> {
    columns(line, start, end).parse().ok()
}
