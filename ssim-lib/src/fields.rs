//! Locating sub-fields inside flight (type 3) records.
//!
//! The positions used here come from one publisher's layout rather than an
//! authoritative column schema, so every offset and threshold is carried in
//! [Heuristics] and the fields are located through a small declarative
//! [Schema] instead of fixed reads.
//!
//! Located fields are views ([Span]s) into the original line. Absence of a
//! field is a normal outcome and is reported as `None`.
use std::ops::RangeInclusive;

use regex::Regex;
use typed_builder::TypedBuilder;

use crate::record::{byte_offset, CARRIER_COLUMN, CARRIER_LEN};

/// Tunable offsets and thresholds of the field heuristics.
///
/// # Example
/// ```
/// use ssim::fields::Heuristics;
///
/// let heuristics = Heuristics::builder().service_search_from(140).build();
/// assert_eq!(heuristics.onward_anchor, 120);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct Heuristics {
    /// Columns where an aircraft type token may start.
    #[builder(default = 100..=119)]
    pub aircraft_window: RangeInclusive<usize>,
    /// Width of an aircraft type token.
    #[builder(default = 3)]
    pub aircraft_len: usize,
    /// Aircraft type assumed when none is found.
    #[builder(default = String::from("320"), setter(into))]
    pub default_aircraft: String,
    /// Column where the rewritten onward carriage block is written.
    #[builder(default = 120)]
    pub onward_anchor: usize,
    /// Column where the onward carriage search starts. Matches before this column
    /// are the record's own flight designator.
    #[builder(default = 120)]
    pub onward_search_from: usize,
    /// Column where the service information search starts.
    #[builder(default = 150)]
    pub service_search_from: usize,
    /// Minimum run of spaces before `<carrier> NNNN` for carrier repetition.
    #[builder(default = 30)]
    pub repetition_min_run: usize,
    /// Minimum run of spaces before `<carrier> ` when the primary pattern is absent.
    #[builder(default = 25)]
    pub repetition_fallback_min_run: usize,
    /// Runs shorter than this are never shortened.
    #[builder(default = 15)]
    pub repetition_min_padding: usize,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Byte range of a located field within its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One `AAAddddaaaa±hhmm` group: station, departure, arrival and UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationTime {
    pub span: Span,
}

impl StationTime {
    /// Width of a station/time/offset group.
    pub const LEN: usize = 16;

    // The tuple pattern only matches ASCII so fixed byte offsets are safe.
    fn part<'a>(&self, line: &'a str, start: usize, len: usize) -> &'a str {
        let start = self.span.start + start;
        &line[start..start + len]
    }

    #[must_use]
    pub fn airport<'a>(&self, line: &'a str) -> &'a str {
        self.part(line, 0, 3)
    }

    #[must_use]
    pub fn departure<'a>(&self, line: &'a str) -> &'a str {
        self.part(line, 3, 4)
    }

    #[must_use]
    pub fn arrival<'a>(&self, line: &'a str) -> &'a str {
        self.part(line, 7, 4)
    }

    #[must_use]
    pub fn offset<'a>(&self, line: &'a str) -> &'a str {
        self.part(line, 11, 5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldName {
    CarrierCode,
    AircraftType,
    OnwardCarriage,
    ServiceInfo,
}

/// How a field is searched for.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Fixed columns starting at `column`, trimmed of spaces. Must be alphanumeric.
    Fixed { column: usize },
    /// First alphanumeric token starting at a column in `window`.
    Token { window: RangeInclusive<usize> },
    /// First `<carrier> NNNN` at or after column `from`. Requires the carrier code.
    CarrierFlight { from: usize },
    /// First match of `regex` at or after column `from`.
    Pattern { from: usize, regex: Regex },
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: FieldName,
    pub strategy: Strategy,
    /// Expected width, `None` when variable.
    pub width: Option<usize>,
}

/// Field layout of a flight record.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    stations: Regex,
}

impl Schema {
    /// Schema for flight (type 3) records. The carrier code is located first since
    /// the carrier/flight search depends on it.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn flight(heuristics: &Heuristics) -> Self {
        let fields = vec![
            FieldSpec {
                name: FieldName::CarrierCode,
                strategy: Strategy::Fixed {
                    column: CARRIER_COLUMN,
                },
                width: Some(CARRIER_LEN),
            },
            FieldSpec {
                name: FieldName::AircraftType,
                strategy: Strategy::Token {
                    window: heuristics.aircraft_window.clone(),
                },
                width: Some(heuristics.aircraft_len),
            },
            FieldSpec {
                name: FieldName::OnwardCarriage,
                strategy: Strategy::CarrierFlight {
                    from: heuristics.onward_search_from,
                },
                width: None,
            },
            FieldSpec {
                name: FieldName::ServiceInfo,
                strategy: Strategy::Pattern {
                    from: heuristics.service_search_from,
                    regex: Regex::new("000|Y[0-9]+").expect("regex to compile"),
                },
                width: None,
            },
        ];
        Self {
            fields,
            stations: Regex::new("[A-Z]{3}[0-9]{4}[0-9]{4}[-+][0-9]{4}").expect("regex to compile"),
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}

/// A flight record with its located fields.
#[derive(Debug, Clone)]
pub struct FlightLine<'a> {
    pub line: &'a str,
    pub carrier: Option<Span>,
    pub aircraft: Option<Span>,
    pub onward: Option<Span>,
    pub service: Option<Span>,
    pub stations: Vec<StationTime>,
}

impl<'a> FlightLine<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            line,
            carrier: None,
            aircraft: None,
            onward: None,
            service: None,
            stations: Vec::default(),
        }
    }

    #[must_use]
    pub fn get(&self, name: FieldName) -> Option<Span> {
        match name {
            FieldName::CarrierCode => self.carrier,
            FieldName::AircraftType => self.aircraft,
            FieldName::OnwardCarriage => self.onward,
            FieldName::ServiceInfo => self.service,
        }
    }

    fn set(&mut self, name: FieldName, span: Option<Span>) {
        match name {
            FieldName::CarrierCode => self.carrier = span,
            FieldName::AircraftType => self.aircraft = span,
            FieldName::OnwardCarriage => self.onward = span,
            FieldName::ServiceInfo => self.service = span,
        }
    }

    /// Text of field `name`, if located.
    #[must_use]
    pub fn text(&self, name: FieldName) -> Option<&'a str> {
        self.get(name).map(|span| span.text(self.line))
    }

    #[must_use]
    pub fn carrier_code(&self) -> Option<&'a str> {
        self.text(FieldName::CarrierCode)
    }

    #[must_use]
    pub fn aircraft_type(&self) -> Option<&'a str> {
        self.text(FieldName::AircraftType)
    }
}

/// Locates [FlightLine] fields according to a [Schema].
///
/// Regexes are compiled once; a locator can be shared by reference across threads.
///
/// # Example
/// ```
/// use ssim::fields::{Heuristics, Locator};
///
/// let locator = Locator::new(&Heuristics::default());
/// let flight = locator.locate("3 AF 04150101J01NOV2531MAR26 2     GRU22002200-0300");
/// assert_eq!(flight.carrier_code(), Some("AF"));
/// assert_eq!(flight.stations.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Locator {
    heuristics: Heuristics,
    schema: Schema,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(&Heuristics::default())
    }
}

impl Locator {
    #[must_use]
    pub fn new(heuristics: &Heuristics) -> Self {
        Self {
            heuristics: heuristics.clone(),
            schema: Schema::flight(heuristics),
        }
    }

    /// Heuristics the schema was built from.
    #[must_use]
    pub fn heuristics(&self) -> &Heuristics {
        &self.heuristics
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Locate every schema field and the station/time groups of `line`.
    #[must_use]
    pub fn locate<'a>(&self, line: &'a str) -> FlightLine<'a> {
        let mut flight = FlightLine::new(line);
        for spec in &self.schema.fields {
            let span = match &spec.strategy {
                Strategy::Fixed { column } => {
                    fixed(line, *column, spec.width.unwrap_or(CARRIER_LEN))
                }
                Strategy::Token { window } => token(line, window, spec.width.unwrap_or(0)),
                Strategy::CarrierFlight { from } => flight
                    .carrier_code()
                    .and_then(|code| find_carrier_flight(line, code, byte_offset(line, *from))),
                Strategy::Pattern { from, regex } => regex
                    .find_at(line, byte_offset(line, *from))
                    .map(|m| Span {
                        start: m.start(),
                        end: m.end(),
                    }),
            };
            flight.set(spec.name, span);
        }
        flight.stations = self.stations(line);
        flight
    }

    /// All non-overlapping station/time/offset groups, left to right.
    #[must_use]
    pub fn stations(&self, line: &str) -> Vec<StationTime> {
        self.schema
            .stations
            .find_iter(line)
            .map(|m| StationTime {
                span: Span {
                    start: m.start(),
                    end: m.end(),
                },
            })
            .collect()
    }
}

fn fixed(line: &str, column: usize, width: usize) -> Option<Span> {
    let start = byte_offset(line, column);
    let end = byte_offset(line, column + width);
    let raw = &line[start..end];
    let trimmed = raw.trim_matches(' ');
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let start = start + (raw.len() - raw.trim_start_matches(' ').len());
    Some(Span {
        start,
        end: start + trimmed.len(),
    })
}

fn token(line: &str, window: &RangeInclusive<usize>, len: usize) -> Option<Span> {
    if len == 0 || window.is_empty() {
        return None;
    }
    let starts = window.end() - window.start() + 1;
    let chars: Vec<(usize, char)> = line
        .char_indices()
        .skip(*window.start())
        .take(starts + len - 1)
        .collect();
    chars
        .windows(len)
        .take(starts)
        .find(|w| w.iter().all(|(_, c)| c.is_ascii_alphanumeric()))
        .map(|w| Span {
            start: w[0].0,
            end: w[len - 1].0 + 1,
        })
}

/// Find the first `<code> NNNN` (exactly 4 ASCII digits) at or after byte `from`.
pub(crate) fn find_carrier_flight(line: &str, code: &str, from: usize) -> Option<Span> {
    let bytes = line.as_bytes();
    let code = code.as_bytes();
    let need = code.len() + 5;
    (from..bytes.len())
        .find(|&i| {
            bytes.get(i..i + need).is_some_and(|w| {
                w.starts_with(code)
                    && w[code.len()] == b' '
                    && w[code.len() + 1..].iter().all(u8::is_ascii_digit)
            })
        })
        .map(|start| Span {
            start,
            end: start + need,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fit;

    /// Place `parts` at their columns on a blank 200 column line.
    fn layout(parts: &[(usize, &str)]) -> String {
        let mut line = fit("3 ", 200).into_bytes();
        for (column, text) in parts {
            line[*column..*column + text.len()].copy_from_slice(text.as_bytes());
        }
        String::from_utf8(line).unwrap()
    }

    #[test]
    fn locate_all_fields() {
        let line = layout(&[
            (0, "3 G3 1007"),
            (36, "GRU10001000-0300"),
            (54, "SSA12301230-0300"),
            (104, "73G"),
            (130, "G3 1007"),
            (170, "Y186"),
        ]);
        let locator = Locator::new(&Heuristics::default());
        let flight = locator.locate(&line);

        assert_eq!(flight.carrier_code(), Some("G3"));
        assert_eq!(flight.aircraft_type(), Some("73G"));
        assert_eq!(flight.onward, Some(Span { start: 130, end: 137 }));
        assert_eq!(flight.text(FieldName::ServiceInfo), Some("Y186"));
        assert_eq!(flight.stations.len(), 2);
        assert_eq!(flight.stations[0].airport(&line), "GRU");
        assert_eq!(flight.stations[1].departure(&line), "1230");
        assert_eq!(flight.stations[1].arrival(&line), "1230");
        assert_eq!(flight.stations[1].offset(&line), "-0300");
    }

    #[test]
    fn missing_fields_are_none() {
        let line = layout(&[(0, "3 G3 1007")]);
        let flight = Locator::new(&Heuristics::default()).locate(&line);

        assert_eq!(flight.carrier_code(), Some("G3"));
        assert!(flight.aircraft.is_none());
        assert!(flight.onward.is_none(), "own designator is before the search start");
        assert!(flight.service.is_none());
        assert!(flight.stations.is_empty());
    }

    #[test]
    fn onward_search_starts_after_own_designator() {
        let line = layout(&[(0, "3 AF 0415"), (100, "332")]);

        let flight = Locator::default().locate(&line);
        assert!(flight.onward.is_none());

        let from_start = Heuristics::builder().onward_search_from(0).build();
        let flight = Locator::new(&from_start).locate(&line);
        assert_eq!(flight.onward, Some(Span { start: 2, end: 9 }));
    }

    #[test]
    fn short_line_does_not_panic() {
        let flight = Locator::new(&Heuristics::default()).locate("3 G");
        assert_eq!(flight.carrier_code(), Some("G"));
        assert!(flight.aircraft.is_none());
    }

    #[test]
    fn service_info_only_searched_from_offset() {
        let line = layout(&[(0, "3 G3 1007"), (60, "000"), (160, "000")]);
        let flight = Locator::new(&Heuristics::default()).locate(&line);
        assert_eq!(flight.service, Some(Span { start: 160, end: 163 }));
    }

    #[test]
    fn aircraft_token_skips_partial_tokens() {
        // "7 3" is not a token; the first full token starts at 104
        let line = layout(&[(100, "7 3"), (104, "E95")]);
        let flight = Locator::new(&Heuristics::default()).locate(&line);
        assert_eq!(flight.aircraft_type(), Some("E95"));
    }

    #[test]
    fn carrier_flight_requires_four_digits() {
        let line = "x  AF 041 AF 0415";
        assert_eq!(
            find_carrier_flight(line, "AF", 0),
            Some(Span { start: 10, end: 17 })
        );
        assert_eq!(find_carrier_flight(line, "G3", 0), None);
        assert_eq!(find_carrier_flight("AF 04", "AF", 0), None);
    }

    #[test]
    fn stations_are_non_overlapping() {
        let line = "3 XX GRU10001000-0300SSA12301230-0300 POA1000";
        let stations = Locator::new(&Heuristics::default()).stations(line);
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].span.start, 21);
    }
}
