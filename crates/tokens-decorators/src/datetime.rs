//! Date parsing for `ToDateTime`, `IsDateTime` and `IsLooseDateTime`.
//!
//! Formats use .NET-style specifiers: `yyyy`, `yy`, `MMMM`, `MMM`, `MM`,
//! `M`, `dd`, `d`, `HH`, `H`, `hh`, `h`, `mm`, `m`, `ss`, `s`, `f...`
//! (fractional seconds, discarded) and `tt` (AM/PM). Text in single quotes is
//! literal, whitespace matches any run of whitespace and every other
//! character matches itself.

use winnow::ascii::multispace1;
use winnow::combinator::{alt, delimited, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, literal, take_till, take_while};

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Layouts tried when no format is given.
const COMMON_FORMATS: &[&str] = &[
    "yyyy-MM-ddTHH:mm:ss.f",
    "yyyy-MM-ddTHH:mm:ss",
    "yyyy-MM-dd HH:mm:ss",
    "yyyy-MM-ddTHH:mm",
    "yyyy-MM-dd HH:mm",
    "yyyy-MM-dd",
    "yyyy/MM/dd HH:mm:ss",
    "yyyy/MM/dd",
    "yyyy.MM.dd",
    "yyyyMMdd",
    "dd/MM/yyyy HH:mm:ss",
    "dd/MM/yyyy",
    "d/M/yyyy",
    "dd.MM.yyyy",
    "dd-MMM-yyyy HH:mm:ss",
    "dd-MMM-yyyy",
    "d MMM yyyy",
    "d MMMM yyyy",
    "MMM d, yyyy",
    "MMMM d, yyyy",
    "MMM d yyyy HH:mm:ss",
    "ddd MMM d HH:mm:ss yyyy",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DateTime {
    /// `yyyy-MM-ddTHH:mm:ss`
    pub fn to_iso(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }

    fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
            && self.day >= 1
            && self.day <= days_in_month(self.year, self.month)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
    }
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 31,
    }
}

// ============ Format Parsing ============

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Year4,
    Year2,
    MonthName,
    MonthAbbrev,
    Month(usize),
    DayName,
    Day(usize),
    Hour24(usize),
    Hour12(usize),
    Minute(usize),
    Second(usize),
    Fraction,
    Meridiem,
    Whitespace,
    Literal(String),
}

fn date_field(input: &mut &str) -> ModalResult<Field> {
    alt((
        "yyyy".value(Field::Year4),
        "yy".value(Field::Year2),
        "MMMM".value(Field::MonthName),
        "MMM".value(Field::MonthAbbrev),
        "MM".value(Field::Month(2)),
        "M".value(Field::Month(1)),
        "ddd".value(Field::DayName),
        "dd".value(Field::Day(2)),
        "d".value(Field::Day(1)),
    ))
    .parse_next(input)
}

fn time_field(input: &mut &str) -> ModalResult<Field> {
    alt((
        "HH".value(Field::Hour24(2)),
        "H".value(Field::Hour24(1)),
        "hh".value(Field::Hour12(2)),
        "h".value(Field::Hour12(1)),
        "mm".value(Field::Minute(2)),
        "m".value(Field::Minute(1)),
        "ss".value(Field::Second(2)),
        "s".value(Field::Second(1)),
        take_while(1.., 'f').value(Field::Fraction),
        "tt".value(Field::Meridiem),
    ))
    .parse_next(input)
}

fn literal_field(input: &mut &str) -> ModalResult<Field> {
    alt((
        multispace1.value(Field::Whitespace),
        delimited('\'', take_till(0.., '\''), '\'').map(|s: &str| Field::Literal(s.to_string())),
        any.map(|c: char| Field::Literal(c.to_string())),
    ))
    .parse_next(input)
}

fn format_fields(input: &mut &str) -> ModalResult<Vec<Field>> {
    repeat(0.., alt((date_field, time_field, literal_field))).parse_next(input)
}

// ============ Value Parsing ============

fn backtrack<T>() -> ModalResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

fn digits<'a>(input: &mut &'a str, min: usize, max: usize) -> ModalResult<&'a str> {
    take_while(min..=max, |c: char| c.is_ascii_digit()).parse_next(input)
}

fn number(input: &mut &str, min: usize, max: usize) -> ModalResult<u32> {
    match digits(input, min, max)?.parse() {
        Ok(n) => Ok(n),
        Err(_) => backtrack(),
    }
}

fn word<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(2.., |c: char| c.is_ascii_alphabetic()).parse_next(input)
}

fn whitespace<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    multispace1.parse_next(input)
}

fn exact<'a>(input: &mut &'a str, expected: &str) -> ModalResult<&'a str> {
    literal(expected).parse_next(input)
}

fn month(input: &mut &str, abbreviated: bool) -> ModalResult<u32> {
    let name = word(input)?;
    let found = MONTHS.iter().position(|m| {
        if abbreviated {
            m[..3].eq_ignore_ascii_case(name)
        } else {
            m.eq_ignore_ascii_case(name)
        }
    });
    match found {
        Some(i) => Ok(i as u32 + 1),
        None => backtrack(),
    }
}

fn meridiem(input: &mut &str) -> ModalResult<bool> {
    let marker = word(input)?;
    if marker.eq_ignore_ascii_case("pm") {
        Ok(true)
    } else if marker.eq_ignore_ascii_case("am") {
        Ok(false)
    } else {
        backtrack()
    }
}

fn apply_fields(input: &mut &str, fields: &[Field]) -> ModalResult<DateTime> {
    let mut dt = DateTime {
        year: 1,
        month: 1,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
    };
    let mut pm = None;
    let mut twelve_hour = false;

    for field in fields {
        match field {
            Field::Year4 => dt.year = number(input, 4, 4)?,
            Field::Year2 => {
                let yy = number(input, 2, 2)?;
                dt.year = if yy < 50 { 2000 + yy } else { 1900 + yy };
            }
            Field::MonthName => dt.month = month(input, false)?,
            Field::MonthAbbrev => dt.month = month(input, true)?,
            Field::Month(min) => dt.month = number(input, *min, 2)?,
            Field::DayName => {
                word(input)?;
            }
            Field::Day(min) => dt.day = number(input, *min, 2)?,
            Field::Hour24(min) => dt.hour = number(input, *min, 2)?,
            Field::Hour12(min) => {
                dt.hour = number(input, *min, 2)?;
                twelve_hour = true;
            }
            Field::Minute(min) => dt.minute = number(input, *min, 2)?,
            Field::Second(min) => dt.second = number(input, *min, 2)?,
            Field::Fraction => {
                number(input, 1, 9)?;
            }
            Field::Meridiem => pm = Some(meridiem(input)?),
            Field::Whitespace => {
                whitespace(input)?;
            }
            Field::Literal(text) => {
                exact(input, text)?;
            }
        }
    }

    if twelve_hour {
        if !(1..=12).contains(&dt.hour) {
            return backtrack();
        }
        dt.hour %= 12;
    }
    if pm == Some(true) {
        if dt.hour >= 12 {
            return backtrack();
        }
        dt.hour += 12;
    }
    Ok(dt)
}

fn parse_with_format(text: &str, format: &str) -> Option<DateTime> {
    let mut format = format;
    let fields = format_fields.parse_next(&mut format).ok()?;
    let mut input = text.trim();
    let dt = apply_fields(&mut input, &fields).ok()?;
    (input.is_empty() && dt.is_valid()).then_some(dt)
}

/// Parses `text` with the first of `formats` that accepts it.
pub fn parse_date_time<S: AsRef<str>>(text: &str, formats: &[S]) -> Option<DateTime> {
    formats
        .iter()
        .find_map(|format| parse_with_format(text, format.as_ref()))
}

/// Parses `text` with a list of common layouts. A trailing `Z`, `UTC` or
/// `GMT` designator is ignored.
pub fn parse_loose_date_time(text: &str) -> Option<DateTime> {
    let text = text.trim();
    let text = ["UTC", "GMT", "Z"]
        .iter()
        .find_map(|suffix| text.strip_suffix(suffix))
        .unwrap_or(text)
        .trim_end();
    parse_date_time(text, COMMON_FORMATS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso(text: &str, format: &str) -> Option<String> {
        parse_date_time(text, &[format]).map(|dt| dt.to_iso())
    }

    #[test]
    fn test_numeric_format() {
        assert_eq!(
            iso("2019-01-02 03:04:05", "yyyy-MM-dd HH:mm:ss"),
            Some("2019-01-02T03:04:05".to_string())
        );
    }

    #[test]
    fn test_month_names() {
        assert_eq!(
            iso("2 January 2019", "d MMMM yyyy"),
            Some("2019-01-02T00:00:00".to_string())
        );
        assert_eq!(
            iso("02-jan-2019", "dd-MMM-yyyy"),
            Some("2019-01-02T00:00:00".to_string())
        );
    }

    #[test]
    fn test_twelve_hour_clock() {
        assert_eq!(
            iso("2019-01-02 01:30 PM", "yyyy-MM-dd hh:mm tt"),
            Some("2019-01-02T13:30:00".to_string())
        );
        assert_eq!(
            iso("2019-01-02 12:00 AM", "yyyy-MM-dd hh:mm tt"),
            Some("2019-01-02T00:00:00".to_string())
        );
    }

    #[test]
    fn test_quoted_literals_and_two_digit_years() {
        assert_eq!(
            iso("on 05/06/19", "'on' dd/MM/yy"),
            Some("2019-06-05T00:00:00".to_string())
        );
    }

    #[test]
    fn test_rejects_invalid_dates() {
        assert_eq!(iso("2019-02-30", "yyyy-MM-dd"), None);
        assert_eq!(iso("2019-01-02 extra", "yyyy-MM-dd"), None);
        assert_eq!(iso("19-01-02", "yyyy-MM-dd"), None);
    }

    #[test]
    fn test_loose_formats() {
        let parsed = parse_loose_date_time("2020-02-29T10:11:12Z").unwrap();
        assert_eq!(parsed.to_iso(), "2020-02-29T10:11:12");
        let parsed = parse_loose_date_time("1997-09-15T04:00:00.000Z").unwrap();
        assert_eq!(parsed.to_iso(), "1997-09-15T04:00:00");
        assert!(parse_loose_date_time("Sep 15, 1997").is_some());
        assert!(parse_loose_date_time("tomorrow").is_none());
    }
}
