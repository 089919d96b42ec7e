//! Per-line rewrites and the end-to-end generation pipeline.
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

use crate::{
    assemble::{Assembler, CarrierSelection, OutputDocument},
    dialect::{repeat_carrier, rewrite_onward, rewrite_service},
    fields::{FlightLine, Locator},
    record::{fit, width, RecordKind, UnclassifiedPolicy, LINE_LEN, MIN_FLIGHT_LEN},
    timeconv::{convert_times, TARGET_OFFSET_HOURS},
    timezone::AirportOffsetTable,
};

/// Result of one rewrite on one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Applied,
    /// The field was found and is already in the wanted form.
    Unchanged,
    NotFound,
    /// The field was found but could not be rewritten; it is left as is.
    Skipped,
}

/// Outcomes of the rewrites applied to a flight record. A `None` rewrite was not
/// requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineReport {
    pub repetition: Option<Outcome>,
    /// One per station/time group, left to right.
    pub times: Vec<Outcome>,
    pub onward: Option<Outcome>,
    pub service: Option<Outcome>,
}

impl LineReport {
    /// True if any rewrite changed the line.
    #[must_use]
    pub fn changed(&self) -> bool {
        [self.repetition, self.onward, self.service]
            .iter()
            .flatten()
            .chain(self.times.iter())
            .any(|o| *o == Outcome::Applied)
    }
}

/// Applies the configured rewrites to flight records.
///
/// # Example
/// ```
/// use ssim::transform::{Outcome, Transformer};
///
/// let transformer = Transformer::builder().convert_times(true).build();
/// let (line, report) = transformer.transform_line("3 AA 0950 JFK10001200-0500");
/// assert_eq!(line, "3 AA 0950 JFK12001400-0300");
/// assert_eq!(report.times, vec![Outcome::Applied]);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct Transformer<'a> {
    /// Convert station times to `target_offset`.
    #[builder(default)]
    convert_times: bool,
    /// Rewrite onward carriage and service information for the target dialect.
    #[builder(default)]
    target_dialect: bool,
    /// Repeat the carrier code before the trailing designator. Defaults to
    /// `convert_times`.
    #[builder(default, setter(strip_option))]
    repeat_carrier: Option<bool>,
    #[builder(default = TARGET_OFFSET_HOURS)]
    target_offset: i32,
    #[builder(default)]
    locator: Locator,
    /// Offsets used for groups whose embedded offset cannot be read.
    #[builder(default)]
    airports: Option<&'a AirportOffsetTable>,
}

impl Default for Transformer<'_> {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Transformer<'_> {
    /// Target offset when converting times.
    #[must_use]
    pub fn converted_to(&self) -> Option<i32> {
        self.convert_times.then_some(self.target_offset)
    }

    #[must_use]
    pub fn target_dialect(&self) -> bool {
        self.target_dialect
    }

    /// Apply carrier repetition, time conversion, onward carriage and service
    /// information rewrites, in that order, each as configured.
    ///
    /// Fields are located again after each rewrite. A rewrite that does not apply
    /// leaves the line as is. With the target dialect the result is fitted to
    /// [LINE_LEN] columns; otherwise its width is that of `line`.
    #[must_use]
    pub fn transform_line(&self, line: &str) -> (String, LineReport) {
        let heuristics = self.locator.heuristics();
        let mut line = line.to_string();
        let mut report = LineReport::default();

        if self.repeat_carrier.unwrap_or(self.convert_times) {
            report.repetition = Some(self.rewrite(&mut line, |flight| {
                repeat_carrier(flight, heuristics).ok_or(Outcome::NotFound)
            }));
        }

        if self.convert_times {
            let stations = self.locator.stations(&line);
            let (converted, outcomes) =
                convert_times(&line, &stations, self.airports, self.target_offset);
            line = converted;
            report.times = outcomes;
        }

        if self.target_dialect {
            report.onward = Some(self.rewrite(&mut line, |flight| {
                if flight.onward.is_none() {
                    return Err(Outcome::NotFound);
                }
                rewrite_onward(flight, heuristics).ok_or(Outcome::Skipped)
            }));
            report.service = Some(self.rewrite(&mut line, |flight| {
                if flight.service.is_none() || flight.carrier.is_none() {
                    return Err(Outcome::NotFound);
                }
                rewrite_service(flight, heuristics).ok_or(Outcome::Skipped)
            }));
            if width(&line) != LINE_LEN {
                line = fit(&line, LINE_LEN);
            }
        }

        trace!(?report, "transformed line");
        (line, report)
    }

    fn rewrite<F>(&self, line: &mut String, f: F) -> Outcome
    where
        F: FnOnce(&FlightLine) -> Result<String, Outcome>,
    {
        let flight = self.locator.locate(line.as_str());
        match f(&flight) {
            Ok(rewritten) if rewritten == *line => Outcome::Unchanged,
            Ok(rewritten) => {
                *line = rewritten;
                Outcome::Applied
            }
            Err(outcome) => outcome,
        }
    }
}

/// Result of a [Pipeline] run.
#[derive(Debug, Clone)]
pub struct Generated {
    pub document: OutputDocument,
    /// One per emitted flight record, in document order.
    pub reports: Vec<LineReport>,
    /// Input lines not carried to the output, including filtered flight records.
    pub dropped: usize,
}

/// Classifies raw lines, selects and transforms flight records and assembles the
/// output document.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use ssim::transform::Pipeline;
///
/// let generated = Pipeline::builder()
///     .issued(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap())
///     .season("W25")
///     .build()
///     .run(&["1AIRLINE", "00000", "3 AF 0415", "3 G3 1007"]);
///
/// assert_eq!(generated.document.data_lines(), 2);
/// assert_eq!(generated.dropped, 1);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct Pipeline<'a> {
    #[builder(default)]
    selection: CarrierSelection,
    #[builder(default)]
    transformer: Transformer<'a>,
    #[builder(default)]
    unclassified: UnclassifiedPolicy,
    /// Date written to the trailer.
    issued: NaiveDate,
    #[builder(setter(into))]
    season: String,
}

impl Pipeline<'_> {
    /// Run over `lines` in input order.
    ///
    /// Input zero fillers and trailers are dropped as they are regenerated.
    /// Unclassified lines are dropped or kept with the headers per the configured
    /// [UnclassifiedPolicy]. Flight records are transformed in parallel when the
    /// `parallel` feature is enabled; output order is always input order.
    pub fn run<S>(&self, lines: &[S]) -> Generated
    where
        S: AsRef<str> + Sync,
    {
        let mut headers = Vec::default();
        let mut data = Vec::default();
        let mut dropped = 0;

        for line in lines {
            let line = line.as_ref();
            match RecordKind::classify(line) {
                kind if kind.is_header() => headers.push(line),
                RecordKind::FlightData
                    if width(line) >= MIN_FLIGHT_LEN && self.selection.matches(line) =>
                {
                    data.push(line);
                }
                RecordKind::Unclassified if self.unclassified == UnclassifiedPolicy::Keep => {
                    headers.push(line);
                }
                kind => {
                    trace!(?kind, line, "dropping line");
                    dropped += 1;
                }
            }
        }

        let (data, reports): (Vec<String>, Vec<LineReport>) =
            self.transform(&data).into_iter().unzip();
        debug!(
            selection = %self.selection,
            headers = headers.len(),
            flights = data.len(),
            dropped,
            "transformed flight records"
        );

        let assembler = Assembler::builder()
            .selection(self.selection.clone())
            .issued(self.issued)
            .season(self.season.clone())
            .converted_to(self.transformer.converted_to())
            .dialect(self.transformer.target_dialect())
            .build();

        Generated {
            document: assembler.assemble(headers, data),
            reports,
            dropped,
        }
    }

    #[cfg(feature = "parallel")]
    fn transform(&self, lines: &[&str]) -> Vec<(String, LineReport)> {
        use rayon::prelude::*;
        lines
            .par_iter()
            .map(|line| self.transformer.transform_line(line))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn transform(&self, lines: &[&str]) -> Vec<(String, LineReport)> {
        lines
            .iter()
            .map(|line| self.transformer.transform_line(line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Heuristics;

    fn layout(parts: &[(usize, &str)]) -> String {
        let mut line = fit("3 ", LINE_LEN).into_bytes();
        for (column, text) in parts {
            line[*column..*column + text.len()].copy_from_slice(text.as_bytes());
        }
        String::from_utf8(line).unwrap()
    }

    fn flight() -> String {
        layout(&[
            (0, "3 AF 04150101J01NOV2531MAR26 2"),
            (36, "JFK10001200-0500"),
            (54, "GRU23002330-0300"),
            (100, "332"),
            (134, "AF 0415"),
            (170, "Y312"),
        ])
    }

    #[test]
    fn nothing_requested() {
        let line = flight();
        let (out, report) = Transformer::default().transform_line(&line);

        assert_eq!(out, line);
        assert_eq!(report, LineReport::default());
        assert!(!report.changed());
    }

    #[test]
    fn convert_times_repeats_carrier_by_default() {
        let line = flight();
        let (out, report) = Transformer::builder()
            .convert_times(true)
            .build()
            .transform_line(&line);

        assert_eq!(report.repetition, Some(Outcome::Applied));
        assert_eq!(report.times, vec![Outcome::Applied, Outcome::Unchanged]);
        assert_eq!(&out[36..52], "JFK12001400-0300");
        assert_eq!(&out[54..70], "GRU23002330-0300");
        assert_eq!(&out[125..141], "AF       AF 0415");
        assert_eq!(out.len(), line.len());
        assert!(report.onward.is_none());
    }

    #[test]
    fn repetition_needs_a_long_run() {
        // 24 spaces between the aircraft type and the designator
        let line = layout(&[(0, "3 AF 0415"), (100, "332"), (127, "AF 0415")]);
        let (out, report) = Transformer::builder()
            .convert_times(true)
            .build()
            .transform_line(&line);

        assert_eq!(report.repetition, Some(Outcome::NotFound));
        assert_eq!(out, line);
    }

    #[test]
    fn repetition_can_be_disabled() {
        let (out, report) = Transformer::builder()
            .convert_times(true)
            .repeat_carrier(false)
            .build()
            .transform_line(&flight());

        assert!(report.repetition.is_none());
        assert_eq!(&out[125..141], format!("{}AF 0415", " ".repeat(9)));
    }

    #[test]
    fn target_dialect() {
        let line = flight();
        let (out, report) = Transformer::builder()
            .target_dialect(true)
            .build()
            .transform_line(&line);

        assert_eq!(report.onward, Some(Outcome::Applied));
        assert_eq!(report.service, Some(Outcome::Applied));
        assert_eq!(&out[120..136], "AF       AF 0415");
        assert_eq!(&out[136..141], "     ");
        assert_eq!(&out[170..174], "Y180");
        assert_eq!(&out[36..52], "JFK10001200-0500", "times are kept");
        assert_eq!(out.len(), LINE_LEN);
    }

    #[test]
    fn target_dialect_fits_short_lines() {
        let (out, report) = Transformer::builder()
            .target_dialect(true)
            .build()
            .transform_line("3 AF 0415");

        assert_eq!(report.onward, Some(Outcome::NotFound));
        assert_eq!(report.service, Some(Outcome::NotFound));
        assert_eq!(out.len(), LINE_LEN);
    }

    #[test]
    fn own_designator_is_not_onward_carriage() {
        let line = layout(&[(0, "3 AF 0415"), (100, "332"), (170, "Y312")]);
        let (out, report) = Transformer::builder()
            .target_dialect(true)
            .build()
            .transform_line(&line);

        assert_eq!(report.onward, Some(Outcome::NotFound));
        assert_eq!(&out[..9], "3 AF 0415");
        assert_eq!(&out[120..136], " ".repeat(16));
    }

    #[test]
    fn onward_without_room_is_skipped() {
        let line = layout(&[(0, "3 AF 0415"), (122, "AF 0415")]);
        let (out, report) = Transformer::builder()
            .target_dialect(true)
            .build()
            .transform_line(&line);

        assert_eq!(report.onward, Some(Outcome::Skipped));
        assert_eq!(out, line);
    }

    #[test]
    fn custom_heuristics() {
        let line = layout(&[(0, "3 AF 0415"), (100, "Y312")]);
        let locator = Locator::new(&Heuristics::builder().service_search_from(100).build());
        let (out, report) = Transformer::builder()
            .target_dialect(true)
            .locator(locator)
            .build()
            .transform_line(&line);

        assert_eq!(report.service, Some(Outcome::Applied));
        assert_eq!(&out[100..104], "Y180");
    }

    fn raw_lines() -> Vec<String> {
        vec![
            "1AIRLINE STANDARD SCHEDULE DATA SET".to_string(),
            "0".repeat(200),
            "2LAF  0008W25".to_string(),
            flight(),
            "3 G3 1007".to_string(),
            "3 AF".to_string(),
            "garbage".to_string(),
            "5 AF 01OCT25".to_string(),
        ]
    }

    fn pipeline(
        selection: CarrierSelection,
        unclassified: UnclassifiedPolicy,
    ) -> Pipeline<'static> {
        Pipeline::builder()
            .selection(selection)
            .unclassified(unclassified)
            .issued(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap())
            .season("W25")
            .build()
    }

    #[test]
    fn run_all_carriers() {
        let generated =
            pipeline(CarrierSelection::All, UnclassifiedPolicy::Drop).run(&raw_lines());
        let lines = generated.document.lines();

        assert_eq!(generated.document.data_lines(), 2);
        assert_eq!(generated.reports.len(), 2);
        assert_eq!(generated.dropped, 4);
        assert!(lines[0].starts_with("1AIRLINE"));
        assert!(lines[5].starts_with("2LAF"));
        assert!(lines[6].starts_with("3 AF 0415"));
        assert!(lines[7].starts_with("3 G3 1007"));
        generated.document.check().unwrap();
    }

    #[test]
    fn run_one_carrier_keeping_unclassified() {
        let generated = pipeline(CarrierSelection::Code("G3".into()), UnclassifiedPolicy::Keep)
            .run(&raw_lines());
        let lines = generated.document.lines();

        assert_eq!(generated.document.data_lines(), 1);
        assert!(lines[6].starts_with("garbage"));
        assert!(lines[7].starts_with("3 G3 1007"));
        assert!(lines.last().unwrap().starts_with("5 G3 01OCT25"));
        generated.document.check().unwrap();
    }

    #[test]
    fn run_preserves_order() {
        let lines: Vec<String> = (0..500).map(|n| format!("3 AF {n:04}")).collect();
        let generated = Pipeline::builder()
            .transformer(Transformer::builder().target_dialect(true).build())
            .issued(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap())
            .season("W25")
            .build()
            .run(&lines);

        for (n, line) in generated.document.lines()[..500].iter().enumerate() {
            assert!(line.starts_with(&format!("3 AF {n:04}")), "{line}");
        }
    }
}
