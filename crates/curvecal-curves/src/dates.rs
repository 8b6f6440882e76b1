//! Conversions between calendar dates and day serials.
//!
//! Curve abscissas are spreadsheet-style day serials: whole days since
//! 1899-12-30, so 1970-01-01 is serial 25569.

use chrono::{Duration, NaiveDate};

/// Serial of 1970-01-01.
pub const UNIX_EPOCH_SERIAL: f64 = 25569.0;

/// 1970-01-01, chrono's default date.
fn unix_epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Converts a date to its day serial.
#[must_use]
pub fn serial_from_date(date: NaiveDate) -> f64 {
    (date - unix_epoch()).num_days() as f64 + UNIX_EPOCH_SERIAL
}

/// Converts a day serial back to a date, rounding to the nearest day.
///
/// Returns `None` for non-finite serials or ones outside chrono's range.
#[must_use]
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = (serial - UNIX_EPOCH_SERIAL).round();
    if days.abs() > f64::from(i32::MAX) {
        return None;
    }
    unix_epoch().checked_add_signed(Duration::try_days(days as i64)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(serial_from_date(epoch), 25569.0);
        assert_eq!(date_from_serial(25569.0), Some(epoch));
    }

    #[test]
    fn test_known_serial() {
        let date = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
        assert_eq!(serial_from_date(date), 44287.0);
        assert_eq!(date_from_serial(44287.0), Some(date));
    }

    #[test]
    fn test_rounds_fractional_serials() {
        let date = NaiveDate::from_ymd_opt(2021, 4, 2).unwrap();
        assert_eq!(date_from_serial(44287.6), Some(date));
    }

    #[test]
    fn test_invalid_serials() {
        assert_eq!(date_from_serial(f64::NAN), None);
        assert_eq!(date_from_serial(f64::INFINITY), None);
        assert_eq!(date_from_serial(1e18), None);
    }
}
