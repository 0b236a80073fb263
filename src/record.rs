//! Daily records and the timestamp formatting shared by both commands.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use csv::StringRecord;

use crate::error::FetchError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Time zone the wall-clock timestamps are rendered in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Zone {
    /// The machine's local zone.
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl Zone {
    pub fn from_offset(offset: Option<FixedOffset>) -> Self {
        offset.map_or(Zone::Local, Zone::Fixed)
    }

    /// Wall-clock time of an epoch instant.
    pub fn wall_clock(&self, epoch: i64) -> Result<NaiveDateTime, FetchError> {
        let utc =
            DateTime::from_timestamp(epoch, 0).ok_or(FetchError::InvalidTimestamp(epoch))?;
        Ok(match self {
            Zone::Local => utc.with_timezone(&Local).naive_local(),
            Zone::Fixed(offset) => utc.with_timezone(offset).naive_local(),
        })
    }

    /// Epoch seconds of a wall-clock time. `None` when the time is ambiguous
    /// or skipped in this zone.
    pub fn epoch(&self, wall: &NaiveDateTime) -> Option<i64> {
        match self {
            Zone::Local => Local.from_local_datetime(wall).single().map(|d| d.timestamp()),
            Zone::Fixed(offset) => offset
                .from_local_datetime(wall)
                .single()
                .map(|d| d.timestamp()),
        }
    }
}

/// Format epoch seconds as `YYYY-MM-DD HH:MM:SS` in `zone`.
pub fn format_timestamp(epoch: i64, zone: Zone) -> Result<String, FetchError> {
    Ok(zone.wall_clock(epoch)?.format(TIMESTAMP_FORMAT).to_string())
}

/// Inverse of [`format_timestamp`].
pub fn parse_timestamp(text: &str, zone: Zone) -> Option<i64> {
    let wall = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()?;
    zone.epoch(&wall)
}

/// Every date in `[start, end)`, ascending.
pub fn days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d < end)
}

/// One output row: the queried date plus its sunrise and sunset.
#[derive(Clone, Debug, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
}

impl DailyRecord {
    pub fn from_epochs(
        date: NaiveDate,
        sunrise: i64,
        sunset: i64,
        zone: Zone,
    ) -> Result<Self, FetchError> {
        Ok(DailyRecord {
            date,
            sunrise: zone.wall_clock(sunrise)?,
            sunset: zone.wall_clock(sunset)?,
        })
    }

    pub fn to_row(&self) -> [String; 3] {
        [
            self.date.format(DATE_FORMAT).to_string(),
            self.sunrise.format(TIMESTAMP_FORMAT).to_string(),
            self.sunset.format(TIMESTAMP_FORMAT).to_string(),
        ]
    }

    pub fn from_row(row: &StringRecord) -> Result<Self, String> {
        if row.len() != 3 {
            return Err(format!("expected 3 fields, found {}", row.len()));
        }
        let date = NaiveDate::parse_from_str(row[0].trim(), DATE_FORMAT)
            .map_err(|e| format!("bad date '{}': {e}", &row[0]))?;
        let sunrise = NaiveDateTime::parse_from_str(row[1].trim(), TIMESTAMP_FORMAT)
            .map_err(|e| format!("bad sunrise '{}': {e}", &row[1]))?;
        let sunset = NaiveDateTime::parse_from_str(row[2].trim(), TIMESTAMP_FORMAT)
            .map_err(|e| format!("bad sunset '{}': {e}", &row[2]))?;
        Ok(DailyRecord {
            date,
            sunrise,
            sunset,
        })
    }
}
