//! Conversion of station times to a fixed UTC offset.
use tracing::trace;

use crate::{
    fields::StationTime,
    timezone::{resolve, AirportOffsetTable},
    transform::Outcome,
};

/// Offset all times are converted to (Brasília, UTC-3).
pub const TARGET_OFFSET_HOURS: i32 = -3;

/// `±hh00` suffix for a whole-hour offset, e.g., `-0300` for -3.
#[must_use]
pub fn offset_suffix(hours: i32) -> String {
    let sign = if hours < 0 { '-' } else { '+' };
    format!("{sign}{:02}00", hours.unsigned_abs())
}

/// Shift an `HHMM` time by `delta` hours, wrapping around midnight once.
///
/// Minutes are kept as is. Returns `None` if `hhmm` is not a number or the hour is
/// still outside a day after wrapping.
#[must_use]
pub fn shift_hhmm(hhmm: &str, delta: i32) -> Option<String> {
    let value: i32 = hhmm.parse().ok()?;
    let minutes = value % 100;
    let mut hours = value / 100 + delta;
    if hours >= 24 {
        hours -= 24;
    } else if hours < 0 {
        hours += 24;
    }
    if !(0..24).contains(&hours) {
        return None;
    }
    Some(format!("{hours:02}{minutes:02}"))
}

/// UTC offset hours of a station group: the hour part of its embedded offset, or the
/// airport's offset from `airports` if that cannot be parsed.
#[must_use]
pub fn source_offset(
    station: &StationTime,
    line: &str,
    airports: Option<&AirportOffsetTable>,
) -> i32 {
    let offset = station.offset(line);
    offset[..3]
        .parse::<i32>()
        .unwrap_or_else(|_| resolve(station.airport(line), airports))
}

/// Convert each station group of `line` to `target` hours.
///
/// Groups already at the target offset are left untouched; a group whose times
/// cannot be converted is left as is without affecting the others. Returns the new
/// line and one [Outcome] per group.
#[must_use]
pub fn convert_times(
    line: &str,
    stations: &[StationTime],
    airports: Option<&AirportOffsetTable>,
    target: i32,
) -> (String, Vec<Outcome>) {
    let suffix = offset_suffix(target);
    let mut out = line.to_string();
    let mut outcomes = Vec::with_capacity(stations.len());

    for station in stations {
        let delta = target - source_offset(station, line, airports);
        if delta == 0 {
            outcomes.push(Outcome::Unchanged);
            continue;
        }
        let departure = shift_hhmm(station.departure(line), delta);
        let arrival = shift_hhmm(station.arrival(line), delta);
        let (Some(departure), Some(arrival)) = (departure, arrival) else {
            trace!(
                group = station.span.text(line),
                delta,
                "skipping unconvertible times"
            );
            outcomes.push(Outcome::Skipped);
            continue;
        };
        let group = format!(
            "{}{departure}{arrival}{suffix}",
            station.airport(line)
        );
        out.replace_range(station.span.start..station.span.end, &group);
        outcomes.push(Outcome::Applied);
    }

    (out, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Heuristics, Locator, Span};
    use test_case::test_case;

    #[test_case(-3, "-0300")]
    #[test_case(0, "+0000")]
    #[test_case(5, "+0500")]
    #[test_case(-10, "-1000")]
    fn suffix(hours: i32, expected: &str) {
        assert_eq!(offset_suffix(hours), expected);
    }

    #[test_case("1000", 2, Some("1200"))]
    #[test_case("2300", 2, Some("0100"); "wraps forward")]
    #[test_case("0130", -3, Some("2230"); "wraps backward")]
    #[test_case("0945", 0, Some("0945"))]
    #[test_case("1000", 40, None; "beyond a single wrap")]
    #[test_case("12a0", 1, None; "not a number")]
    fn shift(hhmm: &str, delta: i32, expected: Option<&str>) {
        assert_eq!(shift_hhmm(hhmm, delta).as_deref(), expected);
    }

    fn convert(line: &str, airports: Option<&AirportOffsetTable>) -> (String, Vec<Outcome>) {
        let stations = Locator::new(&Heuristics::default()).stations(line);
        convert_times(line, &stations, airports, TARGET_OFFSET_HOURS)
    }

    #[test]
    fn converts_to_target() {
        let (out, outcomes) = convert("3 AA 0950 JFK10001200-0500 MIA23002330-0500", None);

        assert_eq!(out, "3 AA 0950 JFK12001400-0300 MIA01000130-0300");
        assert_eq!(outcomes, vec![Outcome::Applied, Outcome::Applied]);
    }

    #[test]
    fn same_offset_is_untouched() {
        let line = "3 G3 1007 GRU10001200-0300 SSA13001500-0330";
        let (out, outcomes) = convert(line, None);

        assert_eq!(out, line);
        assert_eq!(outcomes, vec![Outcome::Unchanged, Outcome::Unchanged]);
    }

    #[test]
    fn only_bad_group_is_skipped() {
        let (out, outcomes) = convert("3 XX 0001 AAA10001200+3500 LIS10001200+0000", None);

        assert_eq!(out, "3 XX 0001 AAA10001200+3500 LIS07000900-0300");
        assert_eq!(outcomes, vec![Outcome::Skipped, Outcome::Applied]);
    }

    #[test]
    fn unreadable_offset_uses_airport_table() {
        let line = "JFK10001200-XX00";
        let station = StationTime {
            span: Span { start: 0, end: 16 },
        };
        let table: AirportOffsetTable = [("JFK", -5)].into_iter().collect();

        assert_eq!(source_offset(&station, line, Some(&table)), -5);
        assert_eq!(source_offset(&station, line, None), -3);

        let (out, _) = convert_times(line, &[station], Some(&table), TARGET_OFFSET_HOURS);
        assert_eq!(out, "JFK12001400-0300");
    }

    #[test]
    fn repeated_group_is_converted_by_position() {
        let (out, _) = convert("JFK10001200-0500JFK10001200-0500", None);
        assert_eq!(out, "JFK12001400-0300JFK12001400-0300");
    }
}
