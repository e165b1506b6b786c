use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use crate::error::ParseError;

/// `3/5/2021 2:32:10 PM`, anywhere in the cell text (it is wrapped in
/// "Posted:" and a zone abbreviation).
static STAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})\s+(\d{1,2}:\d{2}(?::\d{2})?)\s*([AaPp][Mm])").unwrap()
});

/// Split a post's timestamp cell into date and 24-hour time.
pub fn split_timestamp(text: &str) -> Result<(NaiveDate, NaiveTime), ParseError> {
    let bad = || ParseError::BadTimestamp(text.trim().to_string());
    let caps = STAMP_RE.captures(text).ok_or_else(bad)?;

    let date = NaiveDate::parse_from_str(&caps[1], "%m/%d/%Y").map_err(|_| bad())?;

    let clock = format!("{} {}", &caps[2], caps[3].to_ascii_uppercase());
    let fmt = if caps[2].matches(':').count() == 2 {
        "%I:%M:%S %p"
    } else {
        "%I:%M %p"
    };
    let time = NaiveTime::parse_from_str(&clock, fmt).map_err(|_| bad())?;

    Ok((date, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn afternoon_with_seconds() {
        let (d, t) = split_timestamp("Posted: 3/5/2021 2:32:10 PM EST").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2021, 3, 5).unwrap());
        assert_eq!(t, hms(14, 32, 10));
    }

    #[test]
    fn midnight_and_noon() {
        assert_eq!(split_timestamp("12/31/2020 12:05:00 AM").unwrap().1, hms(0, 5, 0));
        assert_eq!(split_timestamp("12/31/2020 12:05:00 PM").unwrap().1, hms(12, 5, 0));
    }

    #[test]
    fn minutes_only_and_lowercase() {
        let (_, t) = split_timestamp("Posted: 11/20/2019 9:07pm").unwrap();
        assert_eq!(t, hms(21, 7, 0));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            split_timestamp("Posted: yesterday"),
            Err(ParseError::BadTimestamp(_))
        ));
        // right shape, impossible date
        assert!(split_timestamp("13/40/2021 1:00:00 PM").is_err());
    }
}
