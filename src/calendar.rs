use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashMap;

/// One of the closed set of states a school day can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            "late" => Some(Self::Late),
            "excused" => Some(Self::Excused),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
            Self::Excused => "excused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// A single cell of the month grid: its absolute date plus whether the date
/// belongs to the requested month (padding cells come from adjacent months).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_month: bool,
}

/// Monday-first calendar matrix for one month. Rows always hold exactly
/// 7 consecutive dates; the row count varies between 4 and 6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month0: u32,
    pub weeks: Vec<Vec<DayCell>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarError {
    pub code: &'static str,
    pub message: String,
}

impl CalendarError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Build the Monday-first week matrix covering the given month.
///
/// `month0` is zero-based (0 = January). The first cell is the Monday on or
/// before the 1st, the last cell is the Sunday on or after the month's final
/// day. Out-of-range inputs are rejected, never wrapped.
pub fn month_grid(year: i32, month0: u32) -> Result<MonthGrid, CalendarError> {
    if month0 > 11 {
        return Err(CalendarError::new(
            "month_out_of_range",
            format!("month index {} must be 0..=11", month0),
        ));
    }
    let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1).ok_or_else(|| {
        CalendarError::new("year_out_of_range", format!("year {} not representable", year))
    })?;
    let last = last_day_of_month(year, month0)?;

    let mut cursor = first;
    while cursor.weekday() != Weekday::Mon {
        cursor = cursor.pred_opt().ok_or_else(|| {
            CalendarError::new("year_out_of_range", "date underflow before month start")
        })?;
    }

    let mut weeks: Vec<Vec<DayCell>> = Vec::new();
    let mut week: Vec<DayCell> = Vec::with_capacity(7);
    loop {
        week.push(DayCell {
            date: cursor,
            in_month: cursor.year() == year && cursor.month0() == month0,
        });
        if cursor.weekday() == Weekday::Sun {
            weeks.push(std::mem::take(&mut week));
            if cursor >= last {
                break;
            }
        }
        cursor = cursor.succ_opt().ok_or_else(|| {
            CalendarError::new("year_out_of_range", "date overflow past month end")
        })?;
    }

    Ok(MonthGrid {
        year,
        month0,
        weeks,
    })
}

fn last_day_of_month(year: i32, month0: u32) -> Result<NaiveDate, CalendarError> {
    let first_of_next = if month0 == 11 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month0 + 2, 1)
    };
    first_of_next
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| {
            CalendarError::new("year_out_of_range", format!("year {} not representable", year))
        })
}

/// Display resolution for one grid cell.
///
/// Weekends always win over recorded statuses; out-of-month cells never show
/// a recorded status. Everything else falls through to `NoStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayMark {
    NoStatus,
    Weekend,
    Status(AttendanceStatus),
}

impl DayMark {
    pub fn code(self) -> &'static str {
        match self {
            Self::NoStatus => "none",
            Self::Weekend => "weekend",
            Self::Status(s) => s.code(),
        }
    }
}

/// Map a sparse record list onto the grid, one mark per cell.
///
/// Records are indexed by date in list order, so a duplicate date keeps the
/// last entry.
pub fn status_overlay(grid: &MonthGrid, records: &[AttendanceRecord]) -> Vec<Vec<DayMark>> {
    let mut by_date: HashMap<NaiveDate, AttendanceStatus> = HashMap::new();
    for rec in records {
        by_date.insert(rec.date, rec.status);
    }

    grid.weeks
        .iter()
        .map(|week| {
            week.iter()
                .map(|cell| {
                    if matches!(cell.date.weekday(), Weekday::Sat | Weekday::Sun) {
                        DayMark::Weekend
                    } else if cell.in_month {
                        match by_date.get(&cell.date) {
                            Some(status) => DayMark::Status(*status),
                            None => DayMark::NoStatus,
                        }
                    } else {
                        DayMark::NoStatus
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn rows_are_complete_weeks() {
        for (year, month0) in [(2024, 0), (2024, 1), (2023, 11), (2021, 1), (2025, 5)] {
            let grid = month_grid(year, month0).expect("grid");
            assert!((4..=6).contains(&grid.weeks.len()), "{}-{}", year, month0);
            for week in &grid.weeks {
                assert_eq!(week.len(), 7);
            }
        }
    }

    #[test]
    fn every_in_month_day_appears_exactly_once() {
        let grid = month_grid(2024, 1).expect("grid");
        let in_month: Vec<NaiveDate> = grid
            .weeks
            .iter()
            .flatten()
            .filter(|c| c.in_month)
            .map(|c| c.date)
            .collect();
        assert_eq!(in_month.len(), 29);
        for day in 1..=29 {
            assert!(in_month.contains(&d(2024, 2, day)), "missing day {}", day);
        }
    }

    #[test]
    fn grid_starts_monday_ends_sunday() {
        for (year, month0) in [(2024, 1), (2023, 0), (2026, 10), (2021, 7)] {
            let grid = month_grid(year, month0).expect("grid");
            let first = grid.weeks.first().and_then(|w| w.first()).expect("first");
            let last = grid.weeks.last().and_then(|w| w.last()).expect("last");
            assert_eq!(first.date.weekday(), Weekday::Mon);
            assert_eq!(last.date.weekday(), Weekday::Sun);
        }
    }

    #[test]
    fn builder_is_deterministic() {
        let a = month_grid(2024, 6).expect("grid");
        let b = month_grid(2024, 6).expect("grid");
        assert_eq!(a, b);
    }

    #[test]
    fn four_row_month_needs_no_padding() {
        // February 2021 has 28 days and starts on a Monday.
        let grid = month_grid(2021, 1).expect("grid");
        assert_eq!(grid.weeks.len(), 4);
        assert!(grid.weeks.iter().flatten().all(|c| c.in_month));
    }

    #[test]
    fn six_row_month_pads_both_sides() {
        // March 2026 starts on a Sunday and runs 31 days.
        let grid = month_grid(2026, 2).expect("grid");
        assert_eq!(grid.weeks.len(), 6);
        assert_eq!(grid.weeks[0][0].date, d(2026, 2, 23));
        assert!(!grid.weeks[0][0].in_month);
        assert_eq!(grid.weeks[5][6].date, d(2026, 4, 5));
        assert!(!grid.weeks[5][6].in_month);
    }

    #[test]
    fn february_2024_spans_jan_29_to_mar_03() {
        let grid = month_grid(2024, 1).expect("grid");
        assert_eq!(grid.weeks.len(), 5);
        assert_eq!(grid.weeks[0][0].date, d(2024, 1, 29));
        assert_eq!(grid.weeks[4][6].date, d(2024, 3, 3));
    }

    #[test]
    fn month_13_is_rejected() {
        let err = month_grid(2024, 12).expect_err("must reject");
        assert_eq!(err.code, "month_out_of_range");
    }

    #[test]
    fn absurd_year_is_rejected() {
        let err = month_grid(i32::MAX, 0).expect_err("must reject");
        assert_eq!(err.code, "year_out_of_range");
    }

    #[test]
    fn weekday_record_resolves_to_its_status() {
        let grid = month_grid(2024, 1).expect("grid");
        let records = [AttendanceRecord {
            date: d(2024, 2, 14), // a Wednesday
            status: AttendanceStatus::Absent,
        }];
        let marks = status_overlay(&grid, &records);
        // 2024-02-14 sits in week row 2, cell 2.
        assert_eq!(marks[2][2], DayMark::Status(AttendanceStatus::Absent));
        assert_eq!(marks[2][1], DayMark::NoStatus);
    }

    #[test]
    fn weekend_wins_over_recorded_status() {
        let grid = month_grid(2024, 1).expect("grid");
        let records = [AttendanceRecord {
            date: d(2024, 2, 10), // a Saturday
            status: AttendanceStatus::Present,
        }];
        let marks = status_overlay(&grid, &records);
        assert_eq!(marks[1][5], DayMark::Weekend);
    }

    #[test]
    fn duplicate_dates_keep_the_last_record() {
        let grid = month_grid(2024, 1).expect("grid");
        let records = [
            AttendanceRecord {
                date: d(2024, 2, 14),
                status: AttendanceStatus::Late,
            },
            AttendanceRecord {
                date: d(2024, 2, 14),
                status: AttendanceStatus::Excused,
            },
        ];
        let marks = status_overlay(&grid, &records);
        assert_eq!(marks[2][2], DayMark::Status(AttendanceStatus::Excused));
    }

    #[test]
    fn padding_cells_never_show_recorded_status() {
        let grid = month_grid(2024, 1).expect("grid");
        let records = [AttendanceRecord {
            date: d(2024, 1, 30), // padding Tuesday from January
            status: AttendanceStatus::Present,
        }];
        let marks = status_overlay(&grid, &records);
        assert_eq!(marks[0][1], DayMark::NoStatus);
    }
}
