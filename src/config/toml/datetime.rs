//! TOML date-time values.
//!
//! A datetime is an optional calendar date, an optional clock time, and an
//! optional UTC offset, covering the four RFC 3339 shapes: offset date-time,
//! local date-time, local date, and local time. Calendar and clock validity
//! checks go through chrono; rendering follows RFC 3339.

use std::fmt;

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datetime {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub offset: Option<FixedOffset>,
}

impl Datetime {
    pub fn from_date(date: NaiveDate) -> Self {
        Datetime {
            date: Some(date),
            time: None,
            offset: None,
        }
    }

    pub fn is_offset_date_time(&self) -> bool {
        self.date.is_some() && self.time.is_some() && self.offset.is_some()
    }

    pub fn is_local_date_time(&self) -> bool {
        self.date.is_some() && self.time.is_some() && self.offset.is_none()
    }

    pub fn is_local_date(&self) -> bool {
        self.date.is_some() && self.time.is_none()
    }

    pub fn is_local_time(&self) -> bool {
        self.date.is_none() && self.time.is_some()
    }
}

fn digits(bytes: &[u8], n: usize) -> Option<u32> {
    if bytes.len() < n || !bytes[..n].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let mut out = 0u32;
    for &b in &bytes[..n] {
        out = out * 10 + u32::from(b - b'0');
    }
    Some(out)
}

/// Parse `HH:MM[:SS[.frac]]` plus an optional trailing offset, consuming
/// the whole input.
fn parse_time_with_offset(bytes: &[u8]) -> Option<(NaiveTime, Option<FixedOffset>)> {
    let hour = digits(bytes, 2)?;
    if bytes.get(2) != Some(&b':') {
        return None;
    }
    let minute = digits(&bytes[3..], 2)?;
    let mut rest = &bytes[5..];

    let mut second = 0;
    let mut nanos = 0u32;
    if rest.first() == Some(&b':') {
        second = digits(&rest[1..], 2)?;
        rest = &rest[3..];
        if rest.first() == Some(&b'.') {
            let frac = &rest[1..];
            let len = frac.iter().take_while(|b| b.is_ascii_digit()).count();
            if len == 0 {
                return None;
            }
            // Nanosecond precision: excess digits truncate, missing digits
            // scale up.
            for (i, &b) in frac[..len].iter().enumerate() {
                if i < 9 {
                    nanos = nanos * 10 + u32::from(b - b'0');
                }
            }
            for _ in len..9 {
                nanos = nanos.saturating_mul(10);
            }
            rest = &rest[1 + len..];
        }
    }

    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;

    let offset = match rest.first() {
        None => None,
        Some(b'Z') | Some(b'z') => {
            if rest.len() != 1 {
                return None;
            }
            Some(FixedOffset::east_opt(0)?)
        }
        Some(sign @ (b'+' | b'-')) => {
            let oh = digits(&rest[1..], 2)?;
            if rest.get(3) != Some(&b':') {
                return None;
            }
            let om = digits(&rest[4..], 2)?;
            if rest.len() != 6 {
                return None;
            }
            let seconds = (oh * 3600 + om * 60) as i32;
            let seconds = if *sign == b'-' { -seconds } else { seconds };
            Some(FixedOffset::east_opt(seconds)?)
        }
        Some(_) => return None,
    };

    Some((time, offset))
}

/// Parse one of the four RFC 3339 shapes, consuming the whole input.
pub fn parse(text: &str) -> Option<Datetime> {
    let bytes = text.as_bytes();

    // A leading HH:MM path is a local time.
    if bytes.get(2) == Some(&b':') {
        let (time, offset) = parse_time_with_offset(bytes)?;
        // A bare time cannot carry an offset.
        if offset.is_some() {
            return None;
        }
        return Some(Datetime {
            date: None,
            time: Some(time),
            offset: None,
        });
    }

    let year = digits(bytes, 4)?;
    if bytes.get(4) != Some(&b'-') {
        return None;
    }
    let month = digits(&bytes[5..], 2)?;
    if bytes.get(7) != Some(&b'-') {
        return None;
    }
    let day = digits(&bytes[8..], 2)?;
    let date = NaiveDate::from_ymd_opt(year as i32, month, day)?;

    match bytes.get(10) {
        None => Some(Datetime::from_date(date)),
        Some(b'T') | Some(b't') | Some(b' ') => {
            let (time, offset) = parse_time_with_offset(&bytes[11..])?;
            Some(Datetime {
                date: Some(date),
                time: Some(time),
                offset,
            })
        }
        Some(_) => None,
    }
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(date) = self.date {
            write!(f, "{:04}-{:02}-{:02}", date.year(), date.month(), date.day())?;
            if self.time.is_some() {
                f.write_str("T")?;
            }
        }
        if let Some(time) = self.time {
            write!(f, "{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second())?;
            if time.nanosecond() != 0 {
                let frac = format!("{:09}", time.nanosecond());
                write!(f, ".{}", frac.trim_end_matches('0'))?;
            }
        }
        if let Some(offset) = self.offset {
            let seconds = offset.local_minus_utc();
            if seconds == 0 {
                f.write_str("Z")?;
            } else {
                let (sign, seconds) = if seconds < 0 { ('-', -seconds) } else { ('+', seconds) };
                write!(f, "{}{:02}:{:02}", sign, seconds / 3600, (seconds % 3600) / 60)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_rfc_shapes() {
        let odt = parse("1979-05-27T07:32:00Z").expect("offset date-time");
        assert!(odt.is_offset_date_time());
        assert_eq!(odt.to_string(), "1979-05-27T07:32:00Z");

        let ldt = parse("1979-05-27T00:32:00.999999").expect("local date-time");
        assert!(ldt.is_local_date_time());
        assert_eq!(ldt.to_string(), "1979-05-27T00:32:00.999999");

        let ld = parse("1979-05-27").expect("local date");
        assert!(ld.is_local_date());
        assert_eq!(ld.to_string(), "1979-05-27");

        let lt = parse("07:32:00").expect("local time");
        assert!(lt.is_local_time());
        assert_eq!(lt.to_string(), "07:32:00");
    }

    #[test]
    fn negative_offsets_and_space_separator() {
        let dt = parse("1979-05-27 00:32:00-07:00").expect("space separated");
        assert_eq!(dt.to_string(), "1979-05-27T00:32:00-07:00");
    }

    #[test]
    fn seconds_are_optional() {
        let dt = parse("1979-05-27T07:32").expect("no seconds");
        assert_eq!(dt.to_string(), "1979-05-27T07:32:00");
    }

    #[test]
    fn invalid_calendar_dates_are_rejected() {
        assert!(parse("2021-02-30").is_none());
        assert!(parse("2021-13-01").is_none());
        assert!(parse("24:00:00").is_none());
        assert!(parse("07:32:00Z").is_none());
        assert!(parse("1979-05-27X").is_none());
    }
}
