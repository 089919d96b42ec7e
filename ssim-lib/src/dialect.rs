//! Rewrites of flight record sub-fields into the target publisher's dialect.
//!
//! Every rewrite works on a located [FlightLine], returns `None` when the field it
//! needs is not there, and otherwise returns a new line with the same number of
//! characters as the input.
use crate::{
    fields::{find_carrier_flight, FlightLine, Heuristics},
    record::{byte_offset, fit, width},
};

/// Spaces between a repeated carrier code and the following designator.
pub const REPEAT_GAP: usize = 7;

/// Seat configuration published for an aircraft type.
#[must_use]
pub fn seat_configuration(aircraft: &str) -> &'static str {
    match aircraft {
        "73G" | "73X" => "138",
        "738" => "186",
        "321" => "224",
        "789" | "788" => "304",
        _ => "180",
    }
}

fn gap() -> String {
    " ".repeat(REPEAT_GAP)
}

fn space_run_before(bytes: &[u8], end: usize) -> usize {
    bytes[..end].iter().rev().take_while(|b| **b == b' ').count()
}

/// Byte offset of the first `<code> ` preceded by a run of at least `min_run` spaces.
fn padded_carrier(bytes: &[u8], code: &[u8], min_run: usize) -> Option<usize> {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b' ' {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b' ' {
            i += 1;
        }
        if i - start >= min_run
            && bytes[i..].starts_with(code)
            && bytes.get(i + code.len()) == Some(&b' ')
        {
            return Some(i);
        }
    }
    None
}

/// Repeat the carrier code inside the padding that precedes the trailing
/// `<carrier> NNNN` designator.
///
/// The last `len(carrier) + 7` spaces of the padding become the carrier code followed by
/// 7 spaces, e.g., 62 spaces and `AF 0415` become 53 spaces, `AF`, 7 spaces and `AF 0415`.
/// When no designator follows a run of at least [Heuristics::repetition_min_run]
/// spaces, a run of [Heuristics::repetition_fallback_min_run] spaces followed by
/// `<carrier> ` is used instead.
#[must_use]
pub fn repeat_carrier(flight: &FlightLine, heuristics: &Heuristics) -> Option<String> {
    let line = flight.line;
    let code = flight.carrier_code()?;
    let bytes = line.as_bytes();

    let mut from = 0;
    let primary = loop {
        let Some(span) = find_carrier_flight(line, code, from) else {
            break None;
        };
        if space_run_before(bytes, span.start) >= heuristics.repetition_min_run {
            break Some(span.start);
        }
        from = span.start + 1;
    };
    let at = primary.or_else(|| {
        padded_carrier(
            bytes,
            code.as_bytes(),
            heuristics.repetition_fallback_min_run,
        )
    })?;

    let insert_len = code.len() + REPEAT_GAP;
    let run = space_run_before(bytes, at);
    if run < heuristics.repetition_min_padding || run <= insert_len {
        return None;
    }

    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..at - insert_len]);
    out.push_str(code);
    out.push_str(&gap());
    out.push_str(&line[at..]);
    Some(out)
}

/// Rewrite the onward carriage block `<carrier> NNNN` as
/// `<carrier>` + 7 spaces + `<carrier> NNNN` written at [Heuristics::onward_anchor].
///
/// The padding between the anchor and the block is absorbed; leftover room is
/// emitted as spaces after the new block. Returns `None` if the block starts before
/// the anchor or there is not enough room between the anchor and the end of the block.
#[must_use]
pub fn rewrite_onward(flight: &FlightLine, heuristics: &Heuristics) -> Option<String> {
    let line = flight.line;
    let code = flight.carrier_code()?;
    let span = flight.onward?;
    let anchor = byte_offset(line, heuristics.onward_anchor);
    if span.start < anchor {
        return None;
    }

    let number = &line[span.end - 4..span.end];
    let block = format!("{code}{}{code} {number}", gap());
    let budget = width(&line[anchor..span.end]);
    if budget < block.len() {
        return None;
    }

    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..anchor]);
    out.push_str(&block);
    out.push_str(&" ".repeat(budget - block.len()));
    out.push_str(&line[span.end..]);
    Some(out)
}

/// Replace the service information block with
/// `Y` + seat configuration + `VV` + aircraft type + carrier, cut or padded to
/// the width of the original block.
#[must_use]
pub fn rewrite_service(flight: &FlightLine, heuristics: &Heuristics) -> Option<String> {
    let line = flight.line;
    let code = flight.carrier_code()?;
    let span = flight.service?;
    let aircraft = flight
        .aircraft_type()
        .unwrap_or(heuristics.default_aircraft.as_str());

    let block = format!("Y{}VV{aircraft}{code}", seat_configuration(aircraft));
    let block = fit(&block, span.len());

    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..span.start]);
    out.push_str(&block);
    out.push_str(&line[span.end..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fields::Locator, record::LINE_LEN};
    use test_case::test_case;

    fn layout(parts: &[(usize, &str)]) -> String {
        let mut line = fit("3 ", LINE_LEN).into_bytes();
        for (column, text) in parts {
            line[*column..*column + text.len()].copy_from_slice(text.as_bytes());
        }
        String::from_utf8(line).unwrap()
    }

    #[test_case("73G", "138")]
    #[test_case("73X", "138")]
    #[test_case("738", "186")]
    #[test_case("320", "180")]
    #[test_case("321", "224")]
    #[test_case("319", "180")]
    #[test_case("789", "304")]
    #[test_case("788", "304")]
    #[test_case("E95", "180"; "unknown type")]
    fn seats(aircraft: &str, expected: &str) {
        assert_eq!(seat_configuration(aircraft), expected);
    }

    #[test]
    fn repeat_carrier_primary() {
        // 62 spaces between the last field and the designator
        let line = layout(&[(0, "3 AF 0415"), (60, "X"), (123, "AF 0415")]);
        let h = Heuristics::default();
        let flight = Locator::new(&h).locate(&line);

        let out = repeat_carrier(&flight, &h).unwrap();

        assert_eq!(out.len(), line.len());
        assert_eq!(&out[61..114], " ".repeat(53));
        assert_eq!(&out[114..130], "AF       AF 0415");
        assert_eq!(out.matches("AF 0415").count(), 2, "own designator + onward");
    }

    #[test]
    fn repeat_carrier_fallback() {
        // designator not followed by 4 digits, only `AF ` after the padding
        let line = layout(&[(0, "3 AF 0415"), (60, "X"), (123, "AF X")]);
        let h = Heuristics::default();
        let flight = Locator::new(&h).locate(&line);

        let out = repeat_carrier(&flight, &h).unwrap();

        assert_eq!(out.len(), line.len());
        assert_eq!(&out[114..127], "AF       AF X");
    }

    #[test]
    fn repeat_carrier_not_found() {
        let line = layout(&[(0, "3 AF 0415"), (100, "X"), (110, "AF 0415")]);
        let h = Heuristics::default();
        let flight = Locator::new(&h).locate(&line);

        assert!(repeat_carrier(&flight, &h).is_none());
    }

    #[test]
    fn onward_written_at_anchor() {
        let line = layout(&[(0, "3 G3 1007"), (110, "X"), (131, "G3 1007"), (140, "T")]);
        let h = Heuristics::default();
        let flight = Locator::new(&h).locate(&line);

        let out = rewrite_onward(&flight, &h).unwrap();

        assert_eq!(out.len(), line.len());
        assert_eq!(&out[120..136], "G3       G3 1007");
        assert_eq!(&out[136..138], "  ");
        assert_eq!(&out[138..141], "  T", "columns after the block do not move");
    }

    #[test]
    fn onward_without_room() {
        let line = layout(&[(0, "3 G3 1007"), (122, "G3 1007")]);
        let h = Heuristics::default();
        let flight = Locator::new(&h).locate(&line);

        assert!(flight.onward.is_some());
        assert!(rewrite_onward(&flight, &h).is_none());
    }

    #[test]
    fn service_info_keeps_width() {
        let line = layout(&[(0, "3 G3 1007"), (104, "73G"), (170, "Y312       ")]);
        let h = Heuristics::default();
        let flight = Locator::new(&h).locate(&line);

        let out = rewrite_service(&flight, &h).unwrap();

        assert_eq!(out.len(), line.len());
        assert_eq!(&out[170..174], "Y138", "block keeps the width of `Y312`");
    }

    #[test]
    fn service_info_default_aircraft() {
        let line = layout(&[(0, "3 LA 0707"), (180, "0000000000000")]);
        let h = Heuristics::builder().service_search_from(180).build();
        let flight = Locator::new(&h).locate(&line);
        assert_eq!(flight.service.map(|s| s.len()), Some(3));

        let out = rewrite_service(&flight, &h).unwrap();
        assert_eq!(&out[180..183], "Y18");
        assert_eq!(out.len(), LINE_LEN);
    }
}
