use chrono::{Duration, NaiveDate, TimeZone};
use chrono_tz::{Tz, UTC};

use crate::{Error, Result};

const UNIX_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

/// Wrapper type for the `Date` type: days since 1970-01-01 as a `u16`.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug, Default)]
pub struct Date(pub u16);

impl TryFrom<NaiveDate> for Date {
    type Error = Error;

    /// Strict: dates before 1970-01-01 or past the `u16` day range are
    /// rejected rather than clamped.
    fn try_from(other: NaiveDate) -> Result<Self> {
        let days = other.signed_duration_since(UNIX_EPOCH).num_days();
        u16::try_from(days)
            .map(Date)
            .map_err(|_| Error::InvalidValue(format!("date out of range for Date: {other}")))
    }
}

impl From<Date> for NaiveDate {
    fn from(date: Date) -> Self { UNIX_EPOCH + Duration::days(i64::from(date.0)) }
}

/// Wrapper type for the `Date32` type: signed days since 1970-01-01.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug, Default)]
pub struct Date32(pub i32);

impl TryFrom<NaiveDate> for Date32 {
    type Error = Error;

    fn try_from(other: NaiveDate) -> Result<Self> {
        let days = other.signed_duration_since(UNIX_EPOCH).num_days();
        i32::try_from(days)
            .map(Date32)
            .map_err(|_| Error::InvalidValue(format!("date out of range for Date32: {other}")))
    }
}

impl From<Date32> for NaiveDate {
    fn from(date: Date32) -> Self { UNIX_EPOCH + Duration::days(i64::from(date.0)) }
}

/// Wrapper type for the `DateTime` type: a timezone plus seconds since the
/// Unix epoch as a `u32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DateTime(pub Tz, pub u32);

impl DateTime {
    /// Builds a `DateTime` from a Unix timestamp, clamping values outside
    /// the `u32` range to the nearest bound. Pre-epoch instants become 0.
    pub fn from_timestamp_clamped(tz: Tz, seconds: i64) -> Self {
        #[expect(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        Self(tz, seconds.clamp(0, i64::from(u32::MAX)) as u32)
    }
}

impl Default for DateTime {
    fn default() -> Self { Self(UTC, 0) }
}

impl TryFrom<chrono::DateTime<Tz>> for DateTime {
    type Error = Error;

    fn try_from(other: chrono::DateTime<Tz>) -> Result<Self> {
        let seconds = u32::try_from(other.timestamp()).map_err(|_| {
            Error::InvalidValue(format!("timestamp out of range for DateTime: {other}"))
        })?;
        Ok(Self(other.timezone(), seconds))
    }
}

impl From<DateTime> for chrono::DateTime<Tz> {
    fn from(date: DateTime) -> Self {
        // Seconds-only timestamps in the u32 range are never ambiguous.
        date.0.timestamp_opt(i64::from(date.1), 0).unwrap()
    }
}

/// Wrapper type for the `DateTime64` type: a timezone, a signed tick count
/// and the precision (fractional digits, 0..=9) the ticks are scaled to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DateTime64(pub Tz, pub i64, pub u8);

impl DateTime64 {
    /// Converts a chrono instant into ticks at `precision` digits.
    ///
    /// # Errors
    ///
    /// Returns an error if `precision` exceeds 9 or the scaled value
    /// overflows an `i64`.
    pub fn try_from_tz(other: chrono::DateTime<Tz>, precision: u8) -> Result<Self> {
        if precision > 9 {
            return Err(Error::InvalidValue(format!(
                "DateTime64 precision out of range: {precision}"
            )));
        }
        let scale = 10i64.pow(u32::from(precision));
        let sub_ticks = i64::from(other.timestamp_subsec_nanos()) / (1_000_000_000 / scale);
        let ticks = other
            .timestamp()
            .checked_mul(scale)
            .and_then(|t| t.checked_add(sub_ticks))
            .ok_or_else(|| {
                Error::InvalidValue(format!("timestamp out of range for DateTime64: {other}"))
            })?;
        Ok(Self(other.timezone(), ticks, precision))
    }
}

impl Default for DateTime64 {
    fn default() -> Self { Self(UTC, 0, 0) }
}

impl TryFrom<DateTime64> for chrono::DateTime<Tz> {
    type Error = Error;

    fn try_from(date: DateTime64) -> Result<Self> {
        let scale = 10i64.pow(u32::from(date.2.min(9)));
        let seconds = date.1.div_euclid(scale);
        let sub_ticks = date.1.rem_euclid(scale);
        #[expect(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let nanos = (sub_ticks * (1_000_000_000 / scale)) as u32;
        date.0
            .timestamp_opt(seconds, nanos)
            .single()
            .ok_or_else(|| Error::InvalidValue(format!("DateTime64 out of range: {}", date.1)))
    }
}
