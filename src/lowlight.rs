//! Low-light report: how much of each work shift falls outside daylight.
//!
//! Three back-to-back 8-hour shifts cover every day. A shift's darkness is
//! its length minus its overlap with the daylight window of each calendar day
//! it touches. A day's window is the sunrise and sunset time of day from that
//! day's row, placed on the day itself.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::LowLightError;
use crate::record::{DATE_FORMAT, DailyRecord, TIMESTAMP_FORMAT};

pub const SHIFT_MINUTES: f64 = 480.0;

const A_START: NaiveTime = clock(6, 30);
const B_START: NaiveTime = clock(14, 30);
const C_START: NaiveTime = clock(22, 30);

const fn clock(hour: u32, min: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, min, 0) {
        Some(t) => t,
        None => panic!("invalid shift start"),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Shift {
    /// 06:30 to 14:30
    A,
    /// 14:30 to 22:30
    B,
    /// 22:30 to 06:30 the next day
    C,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::A, Shift::B, Shift::C];

    pub fn label(&self) -> &'static str {
        match self {
            Shift::A => "A",
            Shift::B => "B",
            Shift::C => "C",
        }
    }

    pub fn start_time(&self) -> NaiveTime {
        match self {
            Shift::A => A_START,
            Shift::B => B_START,
            Shift::C => C_START,
        }
    }

    /// Start and end of the shift beginning on `date`.
    pub fn bounds(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = date.and_time(self.start_time());
        (start, start + Duration::minutes(SHIFT_MINUTES as i64))
    }
}

/// Darkness measured for one shift.
#[derive(Clone, Debug, PartialEq)]
pub struct ShiftDarkness {
    pub date: NaiveDate,
    pub shift: Shift,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Daylight window of the shift's own day.
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
    /// Sunrise of the following day, for shifts running past midnight.
    pub next_sunrise: Option<NaiveDateTime>,
    pub darkness_minutes: f64,
}

impl ShiftDarkness {
    pub fn percent_of_shift(&self) -> f64 {
        self.darkness_minutes / SHIFT_MINUTES * 100.0
    }
}

/// Aggregate darkness for one shift across the whole report.
#[derive(Clone, Debug, PartialEq)]
pub struct ShiftTotals {
    pub shift: Shift,
    pub count: usize,
    pub total_minutes: f64,
}

impl ShiftTotals {
    pub fn mean_minutes(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_minutes / self.count as f64
        }
    }
}

fn minutes(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / 60.0
}

/// Daylight window of `day` taken from `record`'s time of day. A sunset that
/// reads earlier than sunrise belongs to the following day.
pub fn daylight_on(day: NaiveDate, record: &DailyRecord) -> (NaiveDateTime, NaiveDateTime) {
    let rise = day.and_time(record.sunrise.time());
    let mut set = day.and_time(record.sunset.time());
    if set <= rise {
        set += Duration::days(1);
    }
    (rise, set)
}

/// Minutes of `[start, end)` not covered by any of the `daylight` windows.
/// Overlapping windows count once.
pub fn darkness(
    start: NaiveDateTime,
    end: NaiveDateTime,
    daylight: &[(NaiveDateTime, NaiveDateTime)],
) -> f64 {
    let total = minutes(start, end).max(0.0);
    let mut clipped: Vec<_> = daylight
        .iter()
        .map(|&(rise, set)| (rise.max(start), set.min(end)))
        .filter(|(rise, set)| rise < set)
        .collect();
    clipped.sort();

    let mut lit = 0.0;
    let mut covered_to = start;
    for (rise, set) in clipped {
        let from = rise.max(covered_to);
        if set > from {
            lit += minutes(from, set);
            covered_to = set;
        }
    }
    (total - lit).clamp(0.0, total)
}

/// Measure every shift that the records fully cover. A shift reaching into a
/// day with no record is left out.
pub fn analyze(records: &[DailyRecord]) -> Vec<ShiftDarkness> {
    let by_date: BTreeMap<NaiveDate, &DailyRecord> =
        records.iter().map(|r| (r.date, r)).collect();
    let mut out = Vec::with_capacity(by_date.len() * Shift::ALL.len());

    for &date in by_date.keys() {
        for shift in Shift::ALL {
            let (start, end) = shift.bounds(date);
            let last_day = (end - Duration::seconds(1)).date();
            let mut daylight = Vec::with_capacity(2);
            let mut complete = true;
            for day in start.date().iter_days().take_while(|d| *d <= last_day) {
                match by_date.get(&day) {
                    Some(r) => daylight.push(daylight_on(day, r)),
                    None => {
                        debug!(%date, shift = shift.label(), missing = %day, "skipping shift");
                        complete = false;
                        break;
                    }
                }
            }
            if !complete {
                continue;
            }
            let (sunrise, sunset) = daylight[0];
            out.push(ShiftDarkness {
                date,
                shift,
                start,
                end,
                sunrise,
                sunset,
                next_sunrise: daylight.get(1).map(|&(rise, _)| rise),
                darkness_minutes: darkness(start, end, &daylight),
            });
        }
    }
    out
}

/// Per-shift totals in `A, B, C` order.
pub fn totals(rows: &[ShiftDarkness]) -> Vec<ShiftTotals> {
    Shift::ALL
        .iter()
        .map(|&shift| {
            let matching = rows.iter().filter(|r| r.shift == shift);
            ShiftTotals {
                shift,
                count: matching.clone().count(),
                total_minutes: matching.map(|r| r.darkness_minutes).sum(),
            }
        })
        .collect()
}

/// Load records from a sunrise/sunset CSV. A header line, if present, is
/// skipped.
pub fn read_records(path: &Path) -> Result<Vec<DailyRecord>, LowLightError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|source| LowLightError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_records(&mut rdr)
}

pub fn parse_records<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
) -> Result<Vec<DailyRecord>, LowLightError> {
    let mut out = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        let line = idx as u64 + 1;
        let row = row.map_err(|e| LowLightError::MalformedRow {
            line,
            reason: e.to_string(),
        })?;
        match DailyRecord::from_row(&row) {
            Ok(rec) => out.push(rec),
            Err(_) if line == 1 && !starts_with_date(&row) => {
                debug!("skipping header row");
            }
            Err(reason) => return Err(LowLightError::MalformedRow { line, reason }),
        }
    }
    Ok(out)
}

fn starts_with_date(row: &csv::StringRecord) -> bool {
    row.get(0)
        .is_some_and(|f| NaiveDate::parse_from_str(f.trim(), DATE_FORMAT).is_ok())
}

pub fn write_report<W: Write>(
    wtr: &mut csv::Writer<W>,
    rows: &[ShiftDarkness],
) -> Result<(), LowLightError> {
    wtr.write_record([
        "date",
        "shift",
        "start",
        "end",
        "sunrise",
        "sunset",
        "next_sunrise",
        "darkness_minutes",
        "percent_of_shift",
    ])?;
    for r in rows {
        wtr.write_record([
            r.date.to_string(),
            r.shift.label().to_string(),
            r.start.format(TIMESTAMP_FORMAT).to_string(),
            r.end.format(TIMESTAMP_FORMAT).to_string(),
            r.sunrise.format(TIMESTAMP_FORMAT).to_string(),
            r.sunset.format(TIMESTAMP_FORMAT).to_string(),
            r.next_sunrise
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            format!("{:.1}", r.darkness_minutes),
            format!("{:.1}", r.percent_of_shift()),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read `input`, measure every shift and write the report to `output`.
pub fn run_low_light(input: &Path, output: &Path) -> Result<Vec<ShiftTotals>, LowLightError> {
    let records = read_records(input)?;
    info!(path = %input.display(), days = records.len(), "loaded sunrise/sunset records");

    let rows = analyze(&records);
    let mut wtr = csv::Writer::from_path(output)?;
    write_report(&mut wtr, &rows)?;
    info!(path = %output.display(), shifts = rows.len(), "low-light report written");

    let totals = totals(&rows);
    for t in &totals {
        info!(
            shift = t.shift.label(),
            shifts = t.count,
            total_minutes = t.total_minutes,
            mean_minutes = t.mean_minutes(),
            "shift darkness"
        );
    }
    Ok(totals)
}
