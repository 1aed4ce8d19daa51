//! Trading-session calendar.
//!
//! News published outside market hours can only move prices when the next
//! session opens. [`MarketCalendar::next_session_start`] maps any publication
//! time to the earliest moment at or after it that falls inside a session.
//! Sessions run from open to close on weekdays that are not listed holidays.

use crate::error::{Result, ScrapeError};
use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Weekday,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Upper bound on rule applications for a single timestamp. A year of
/// holidays still converges well below this; hitting it means the holiday
/// table covers every day.
const MAX_ADJUSTMENTS: usize = 1024;

/// A year-independent market holiday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub month: u32,
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Holiday {
    fn new(month: u32, day: u32, name: &str) -> Self {
        Self {
            month,
            day,
            name: Some(name.to_string()),
        }
    }

    fn matches(&self, date: NaiveDate) -> bool {
        self.month == date.month() && self.day == date.day()
    }
}

/// Session hours, exchange time zone and holidays.
#[derive(Debug, Clone)]
pub struct MarketCalendar {
    offset: FixedOffset,
    open: NaiveTime,
    close: NaiveTime,
    holidays: Vec<Holiday>,
}

/// Why a timestamp had to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adjustment {
    BeforeOpen,
    AfterClose,
    Saturday,
    Sunday,
    Holiday,
}

impl MarketCalendar {
    pub fn new(
        offset: FixedOffset,
        open: NaiveTime,
        close: NaiveTime,
        holidays: Vec<Holiday>,
    ) -> Result<Self> {
        if open >= close {
            return Err(ScrapeError::Config(format!(
                "session open {open} must be before close {close}"
            )));
        }
        if let Some(bad) = holidays
            .iter()
            .find(|h| NaiveDate::from_ymd_opt(2024, h.month, h.day).is_none())
        {
            return Err(ScrapeError::Config(format!(
                "holiday {:02}-{:02} is not a calendar day",
                bad.month, bad.day
            )));
        }
        Ok(Self {
            offset,
            open,
            close,
            holidays,
        })
    }

    /// National Stock Exchange of India: 09:15–15:30 IST.
    pub fn nse() -> Self {
        Self {
            offset: FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap(),
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            holidays: vec![
                Holiday::new(1, 26, "republic day"),
                Holiday::new(3, 25, "holi"),
                Holiday::new(8, 15, "independence day"),
                Holiday::new(10, 2, "gandhi jayanti"),
                Holiday::new(10, 12, "dussehra"),
                Holiday::new(11, 1, "diwali"),
            ],
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn session_open(&self) -> NaiveTime {
        self.open
    }

    pub fn session_close(&self) -> NaiveTime {
        self.close
    }

    pub fn holidays(&self) -> &[Holiday] {
        &self.holidays
    }

    /// Earliest session-valid moment at or after `timestamp`, expressed in
    /// the exchange's offset.
    ///
    /// Rules are checked in a fixed order and re-checked from the top after
    /// every move, so stepping past a holiday onto a Saturday is corrected
    /// as well. A timestamp already inside a session is returned unchanged.
    pub fn next_session_start<Tz: TimeZone>(
        &self,
        timestamp: &DateTime<Tz>,
    ) -> Result<DateTime<FixedOffset>> {
        let mut current = timestamp.with_timezone(&self.offset);

        for _ in 0..MAX_ADJUSTMENTS {
            let Some(adjustment) = self.violation(&current) else {
                return Ok(current);
            };
            let date = current.date_naive();
            let target = match adjustment {
                Adjustment::BeforeOpen => Some(date),
                Adjustment::AfterClose | Adjustment::Sunday | Adjustment::Holiday => {
                    date.checked_add_days(Days::new(1))
                }
                Adjustment::Saturday => date.checked_add_days(Days::new(2)),
            };
            let Some(next) = target.and_then(|d| self.at_open(d)) else {
                break;
            };
            trace!(?adjustment, from = %current, to = %next, "Adjusted to session");
            current = next;
        }

        Err(ScrapeError::Calendar {
            from: timestamp.with_timezone(&self.offset).to_rfc3339(),
            limit: MAX_ADJUSTMENTS,
        })
    }

    /// Whether `timestamp` falls inside a trading session.
    pub fn is_session<Tz: TimeZone>(&self, timestamp: &DateTime<Tz>) -> bool {
        self.violation(&timestamp.with_timezone(&self.offset)).is_none()
    }

    fn violation(&self, local: &DateTime<FixedOffset>) -> Option<Adjustment> {
        let hm = (local.hour(), local.minute());
        if hm < (self.open.hour(), self.open.minute()) {
            return Some(Adjustment::BeforeOpen);
        }
        if hm > (self.close.hour(), self.close.minute()) {
            return Some(Adjustment::AfterClose);
        }
        match local.weekday() {
            Weekday::Sat => return Some(Adjustment::Saturday),
            Weekday::Sun => return Some(Adjustment::Sunday),
            _ => {}
        }
        let date = local.date_naive();
        if self.holidays.iter().any(|h| h.matches(date)) {
            return Some(Adjustment::Holiday);
        }
        None
    }

    fn at_open(&self, date: NaiveDate) -> Option<DateTime<FixedOffset>> {
        self.offset
            .from_local_datetime(&date.and_time(self.open))
            .single()
    }
}

impl Default for MarketCalendar {
    fn default() -> Self {
        Self::nse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ist(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<FixedOffset> {
        MarketCalendar::nse()
            .offset()
            .with_ymd_and_hms(y, m, d, hh, mm, 0)
            .unwrap()
    }

    #[test]
    fn test_inside_session_is_unchanged() {
        let cal = MarketCalendar::nse();
        // Wednesday
        for t in [ist(2024, 8, 21, 9, 15), ist(2024, 8, 21, 12, 0), ist(2024, 8, 21, 15, 30)] {
            assert_eq!(cal.next_session_start(&t).unwrap(), t);
            assert!(cal.is_session(&t));
        }
    }

    #[test]
    fn test_before_open_moves_to_open() {
        let cal = MarketCalendar::nse();
        let t = ist(2024, 8, 21, 7, 42);
        assert_eq!(cal.next_session_start(&t).unwrap(), ist(2024, 8, 21, 9, 15));
    }

    #[test]
    fn test_after_close_moves_to_next_day() {
        let cal = MarketCalendar::nse();
        let t = ist(2024, 8, 21, 15, 31);
        assert_eq!(cal.next_session_start(&t).unwrap(), ist(2024, 8, 22, 9, 15));
    }

    #[test]
    fn test_friday_evening_moves_to_monday() {
        let cal = MarketCalendar::nse();
        // 2024-08-23 is a Friday
        let t = ist(2024, 8, 23, 17, 43);
        assert_eq!(cal.next_session_start(&t).unwrap(), ist(2024, 8, 26, 9, 15));
    }

    #[test]
    fn test_weekend_moves_to_monday() {
        let cal = MarketCalendar::nse();
        assert_eq!(
            cal.next_session_start(&ist(2024, 8, 24, 11, 0)).unwrap(),
            ist(2024, 8, 26, 9, 15)
        );
        assert_eq!(
            cal.next_session_start(&ist(2024, 8, 25, 11, 0)).unwrap(),
            ist(2024, 8, 26, 9, 15)
        );
    }

    #[test]
    fn test_holiday_then_weekend() {
        let cal = MarketCalendar::nse();
        // 2025-08-15 is a Friday holiday: skip to Monday the 18th
        let t = ist(2025, 8, 14, 16, 0);
        assert_eq!(cal.next_session_start(&t).unwrap(), ist(2025, 8, 18, 9, 15));
    }

    #[test]
    fn test_holiday_match_ignores_year() {
        let cal = MarketCalendar::nse();
        // 2027-01-26 is a Tuesday
        let t = ist(2027, 1, 26, 10, 0);
        assert_eq!(cal.next_session_start(&t).unwrap(), ist(2027, 1, 27, 9, 15));
    }

    #[test]
    fn test_other_offsets_are_converted() {
        let cal = MarketCalendar::nse();
        // 04:00 UTC == 09:30 IST on a Wednesday
        let utc = chrono::Utc.with_ymd_and_hms(2024, 8, 21, 4, 0, 0).unwrap();
        assert_eq!(cal.next_session_start(&utc).unwrap(), ist(2024, 8, 21, 9, 30));
    }

    #[test]
    fn test_idempotent() {
        let cal = MarketCalendar::nse();
        let mut t = ist(2024, 1, 1, 0, 0);
        let end = ist(2024, 1, 15, 0, 0);
        while t < end {
            let once = cal.next_session_start(&t).unwrap();
            assert!(once >= t);
            assert!(cal.is_session(&once));
            assert_eq!(cal.next_session_start(&once).unwrap(), once);
            t += chrono::Duration::minutes(37);
        }
    }

    #[test]
    fn test_every_day_holiday_is_an_error() {
        let mut holidays = Vec::new();
        for month in 1..=12 {
            for day in 1..=31 {
                if NaiveDate::from_ymd_opt(2024, month, day).is_some() {
                    holidays.push(Holiday { month, day, name: None });
                }
            }
        }
        let nse = MarketCalendar::nse();
        let cal = MarketCalendar::new(nse.offset, nse.open, nse.close, holidays).unwrap();
        let err = cal.next_session_start(&ist(2024, 8, 21, 10, 0)).unwrap_err();
        assert!(matches!(err, ScrapeError::Calendar { .. }));
    }

    #[test]
    fn test_invalid_calendar_config() {
        let nse = MarketCalendar::nse();
        assert!(MarketCalendar::new(nse.offset, nse.close, nse.open, vec![]).is_err());
        let bad = vec![Holiday { month: 2, day: 30, name: None }];
        assert!(MarketCalendar::new(nse.offset, nse.open, nse.close, bad).is_err());
    }
}
