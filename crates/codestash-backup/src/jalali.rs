//! Gregorian to Jalali (Persian) calendar conversion.
//!
//! Day-count arithmetic relative to the Persian epoch: the absolute day
//! number is split into 33-year cycles, 4-year sub-cycles and finally
//! month lengths, so the leap rule is carried by the cycle arithmetic.

use chrono::{Datelike, Timelike};
use std::fmt;

const GREGORIAN_MONTH_DAYS: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Days in one 33-year Jalali cycle (8 leap years).
const DAYS_PER_33_YEARS: i64 = 12053;

/// Days in one 4-year sub-cycle.
const DAYS_PER_4_YEARS: i64 = 1461;

/// A date in the Jalali calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JalaliDate {
    pub year: i64,
    pub month: u32,
    pub day: u32,
}

impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn is_gregorian_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Convert a Gregorian date to its Jalali equivalent.
pub fn gregorian_to_jalali<D: Datelike>(date: &D) -> JalaliDate {
    let gy = i64::from(date.year()) - 1600;
    let gm = date.month0() as usize;
    let gd = i64::from(date.day0());

    let mut g_day_no = 365 * gy + (gy + 3).div_euclid(4) - (gy + 99).div_euclid(100)
        + (gy + 399).div_euclid(400);
    g_day_no += GREGORIAN_MONTH_DAYS[..gm].iter().sum::<i64>();
    if gm > 1 && is_gregorian_leap(i64::from(date.year())) {
        g_day_no += 1;
    }
    g_day_no += gd;

    let mut j_day_no = g_day_no - 79;
    let cycles = j_day_no.div_euclid(DAYS_PER_33_YEARS);
    j_day_no = j_day_no.rem_euclid(DAYS_PER_33_YEARS);

    let mut year = 979 + 33 * cycles + 4 * (j_day_no / DAYS_PER_4_YEARS);
    j_day_no %= DAYS_PER_4_YEARS;

    if j_day_no >= 366 {
        year += (j_day_no - 1) / 365;
        j_day_no = (j_day_no - 1) % 365;
    }

    // First six months have 31 days, the rest 30 (Esfand absorbs the leap day).
    let (month, day) = if j_day_no < 186 {
        (1 + j_day_no / 31, 1 + j_day_no % 31)
    } else {
        let rest = j_day_no - 186;
        (7 + rest / 30, 1 + rest % 30)
    };

    JalaliDate {
        year,
        month: month as u32,
        day: day as u32,
    }
}

/// Compact filename-safe stamp: `YYYY-MM-DD_HH-MM`.
pub fn format_jalali_stamp<T: Datelike + Timelike>(dt: &T) -> String {
    let date = gregorian_to_jalali(dt);
    format!("{}_{:02}-{:02}", date, dt.hour(), dt.minute())
}

/// Human-readable stamp: `YYYY-MM-DD HH:MM:SS`.
pub fn format_jalali_datetime<T: Datelike + Timelike>(dt: &T) -> String {
    let date = gregorian_to_jalali(dt);
    format!(
        "{} {:02}:{:02}:{:02}",
        date,
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn jalali(y: i32, m: u32, d: u32) -> JalaliDate {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        gregorian_to_jalali(&date)
    }

    fn expect(year: i64, month: u32, day: u32) -> JalaliDate {
        JalaliDate { year, month, day }
    }

    #[test]
    fn test_nowruz() {
        assert_eq!(jalali(2024, 3, 20), expect(1403, 1, 1));
        assert_eq!(jalali(2023, 3, 21), expect(1402, 1, 1));
        assert_eq!(jalali(2025, 3, 21), expect(1404, 1, 1));
        assert_eq!(jalali(2021, 3, 21), expect(1400, 1, 1));
    }

    #[test]
    fn test_last_day_of_leap_year() {
        assert_eq!(jalali(2025, 3, 20), expect(1403, 12, 30));
        assert_eq!(jalali(2021, 3, 20), expect(1399, 12, 30));
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(jalali(2024, 9, 21), expect(1403, 6, 31));
        assert_eq!(jalali(2024, 9, 22), expect(1403, 7, 1));
        assert_eq!(jalali(2024, 3, 19), expect(1402, 12, 29));
    }

    #[test]
    fn test_gregorian_leap_day() {
        assert_eq!(jalali(2024, 2, 29), expect(1402, 12, 10));
    }

    #[test]
    fn test_historic_dates() {
        assert_eq!(jalali(1970, 1, 1), expect(1348, 10, 11));
        assert_eq!(jalali(1979, 2, 11), expect(1357, 11, 22));
        assert_eq!(jalali(2000, 1, 1), expect(1378, 10, 11));
    }

    #[test]
    fn test_formatting() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 20)
            .unwrap()
            .and_hms_opt(23, 45, 10)
            .unwrap();
        assert_eq!(format_jalali_stamp(&dt), "1403-01-01_23-45");
        assert_eq!(format_jalali_datetime(&dt), "1403-01-01 23:45:10");
    }

    #[test]
    fn test_conversion_is_pure() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(gregorian_to_jalali(&date), gregorian_to_jalali(&date));
        assert_eq!(gregorian_to_jalali(&date), expect(1405, 7, 27));
    }
}
