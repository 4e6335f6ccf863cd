//! Naive local date/time arithmetic for slot windows.
//!
//! Dates and times are stored and compared without any timezone: a slot on
//! `2025-06-10` from `10:00` to `11:00` means those wall-clock values in
//! whatever zone the server clock reports. This mirrors how slots are
//! entered by tutors and is a known limitation, not a feature; two servers
//! in different zones will disagree about "now".

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::{BookingError, BookingResult};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

pub fn parse_date(value: &str) -> BookingResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        BookingError::InvalidTimeFormat(format!("'{}' is not a YYYY-MM-DD date", value))
    })
}

/// Accepts `HH:MM` and `HH:MM:SS`.
pub fn parse_time(value: &str) -> BookingResult<NaiveTime> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .ok_or_else(|| {
            BookingError::InvalidTimeFormat(format!("'{}' is not an HH:MM time", value))
        })
}

pub fn to_instant(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    date.and_time(time)
}

pub fn is_past(date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> bool {
    to_instant(date, time) < now
}

/// Lead time from `now` until the instant; negative once it has passed.
pub fn time_until(date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> Duration {
    to_instant(date, time) - now
}

pub fn hours_until(date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> f64 {
    time_until(date, time, now).num_seconds() as f64 / 3600.0
}

/// A half-open `[date+start, date+end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Parses and validates the three wire fields of a slot.
    pub fn parse(date: &str, start: &str, end: &str) -> BookingResult<Self> {
        let window = Self {
            date: parse_date(date)?,
            start: parse_time(start)?,
            end: parse_time(end)?,
        };
        if window.end <= window.start {
            return Err(BookingError::InvalidInterval);
        }
        Ok(window)
    }

    pub fn start_instant(&self) -> NaiveDateTime {
        to_instant(self.date, self.start)
    }

    pub fn end_instant(&self) -> NaiveDateTime {
        to_instant(self.date, self.end)
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start_instant() < other.end_instant() && other.start_instant() < self.end_instant()
    }

    pub fn has_ended(&self, now: NaiveDateTime) -> bool {
        self.end_instant() < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        to_instant(parse_date(date).unwrap(), parse_time(time).unwrap())
    }

    #[rstest]
    #[case("10:00", 10, 0, 0)]
    #[case("09:30:15", 9, 30, 15)]
    #[case(" 23:59 ", 23, 59, 0)]
    fn parses_times(#[case] input: &str, #[case] h: u32, #[case] m: u32, #[case] s: u32) {
        assert_eq!(parse_time(input).unwrap(), NaiveTime::from_hms_opt(h, m, s).unwrap());
    }

    #[rstest]
    #[case("25:00")]
    #[case("10h")]
    #[case("")]
    fn rejects_malformed_times(#[case] input: &str) {
        assert!(matches!(parse_time(input), Err(BookingError::InvalidTimeFormat(_))));
    }

    #[rstest]
    #[case("2025-13-01")]
    #[case("10/06/2025")]
    #[case("2025-02-30")]
    fn rejects_malformed_dates(#[case] input: &str) {
        assert!(matches!(parse_date(input), Err(BookingError::InvalidTimeFormat(_))));
    }

    #[rstest]
    #[case("10:00", "10:00")]
    #[case("11:00", "10:00")]
    fn rejects_empty_or_inverted_windows(#[case] start: &str, #[case] end: &str) {
        assert!(matches!(
            TimeWindow::parse("2025-06-10", start, end),
            Err(BookingError::InvalidInterval)
        ));
    }

    #[test]
    fn hours_until_is_fractional_and_signed() {
        let date = parse_date("2025-06-10").unwrap();
        let start = parse_time("10:00").unwrap();

        assert_eq!(hours_until(date, start, at("2025-06-09", "10:00")), 24.0);
        assert_eq!(hours_until(date, start, at("2025-06-10", "08:30")), 1.5);
        assert_eq!(hours_until(date, start, at("2025-06-10", "11:00")), -1.0);
    }

    #[test]
    fn is_past_is_strict() {
        let date = parse_date("2025-06-10").unwrap();
        let end = parse_time("11:00").unwrap();

        assert!(!is_past(date, end, at("2025-06-10", "11:00")));
        assert!(is_past(date, end, at("2025-06-10", "11:00:01")));
    }

    #[rstest]
    #[case("10:00", "11:00", "10:30", "11:30", true)]
    #[case("10:00", "11:00", "11:00", "12:00", false)]
    #[case("10:00", "11:00", "09:00", "10:00", false)]
    #[case("10:00", "12:00", "10:30", "11:00", true)]
    fn overlap_is_half_open(
        #[case] a_start: &str,
        #[case] a_end: &str,
        #[case] b_start: &str,
        #[case] b_end: &str,
        #[case] expected: bool,
    ) {
        let a = TimeWindow::parse("2025-06-10", a_start, a_end).unwrap();
        let b = TimeWindow::parse("2025-06-10", b_start, b_end).unwrap();
        assert_eq!(a.overlaps(&b), expected);
        assert_eq!(b.overlaps(&a), expected);
    }

    #[test]
    fn windows_on_different_days_never_overlap() {
        let a = TimeWindow::parse("2025-06-10", "10:00", "11:00").unwrap();
        let b = TimeWindow::parse("2025-06-11", "10:00", "11:00").unwrap();
        assert!(!a.overlaps(&b));
    }
}
