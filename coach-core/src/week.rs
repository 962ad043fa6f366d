//! Date window for a planned week.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Monday to Sunday of the week after `today`.
    /// On a Monday this is the following Monday, never today.
    pub fn next_week(today: NaiveDate) -> Self {
        let from_monday = today.weekday().num_days_from_monday() as u64;
        // 1..=7, so a Monday moves a full week ahead
        let until_monday = 7 - from_monday;
        let start = today + Days::new(until_monday);
        DateRange {
            start,
            end: start + Days::new(6),
        }
    }

    /// Every day in the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|d| *d <= self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Start of the first day, 00:00:00 UTC.
    pub fn time_min(&self) -> DateTime<Utc> {
        self.start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
    }

    /// End of the last day, 23:59:59 UTC.
    pub fn time_max(&self) -> DateTime<Utc> {
        self.end.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_week_from_midweek() {
        // Wednesday
        let range = DateRange::next_week(date(2025, 4, 9));
        assert_eq!(range.start, date(2025, 4, 14));
        assert_eq!(range.end, date(2025, 4, 20));
    }

    #[test]
    fn test_next_week_from_monday_skips_today() {
        let range = DateRange::next_week(date(2025, 4, 14));
        assert_eq!(range.start, date(2025, 4, 21));
    }

    #[test]
    fn test_next_week_from_sunday() {
        let range = DateRange::next_week(date(2025, 4, 13));
        assert_eq!(range.start, date(2025, 4, 14));
    }

    #[test]
    fn test_days_are_inclusive() {
        let range = DateRange::new(date(2025, 4, 14), date(2025, 4, 20));
        let days: Vec<NaiveDate> = range.days().collect();
        assert_eq!(days.len(), 7);
        assert_eq!(days.first(), Some(&date(2025, 4, 14)));
        assert_eq!(days.last(), Some(&date(2025, 4, 20)));
    }

    #[test]
    fn test_time_bounds() {
        let range = DateRange::new(date(2025, 4, 14), date(2025, 4, 20));
        assert_eq!(range.time_min().to_rfc3339(), "2025-04-14T00:00:00+00:00");
        assert_eq!(range.time_max().to_rfc3339(), "2025-04-20T23:59:59+00:00");
    }
}
