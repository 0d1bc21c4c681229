//! Deterministic mapping from a publication date to its time bucket label.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Deserialize;

/// Width of a [`BucketPolicy::TenDay`] bucket.
pub const BUCKET_DAYS: i64 = 10;

const LABEL_FORMAT: &str = "%Y-%m-%d";

/// How dates are grouped. A deployment keeps one policy fixed so labels stay
/// stable across re-ingestion.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BucketPolicy {
    /// Ten-day windows counted from 1 January. The last window of a year is
    /// cut at 31 December so no bucket spans two years. Label
    /// `"<start> to <end>"`, both inclusive.
    #[default]
    TenDay,
    /// ISO weeks labelled by their Monday.
    Week,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TimeBucketer {
    policy: BucketPolicy,
}

impl TimeBucketer {
    pub fn new(policy: BucketPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> BucketPolicy {
        self.policy
    }

    /// First and last day (inclusive) of the bucket containing `date`.
    pub fn bounds(&self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self.policy {
            BucketPolicy::TenDay => {
                let offset = i64::from(date.ordinal0()) % BUCKET_DAYS;
                let start = date - Duration::days(offset);
                let year_end = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date);
                let end = (start + Duration::days(BUCKET_DAYS - 1)).min(year_end);
                (start, end)
            }
            BucketPolicy::Week => {
                let start = date.week(Weekday::Mon).first_day();
                (start, start + Duration::days(6))
            }
        }
    }

    /// Bucket label for `date`. Labels sort lexically in chronological order.
    pub fn label(&self, date: NaiveDate) -> String {
        let (start, end) = self.bounds(date);
        match self.policy {
            BucketPolicy::TenDay => format!(
                "{} to {}",
                start.format(LABEL_FORMAT),
                end.format(LABEL_FORMAT)
            ),
            BucketPolicy::Week => start.format(LABEL_FORMAT).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn january_fifth_lands_in_first_window() {
        let bucketer = TimeBucketer::new(BucketPolicy::TenDay);

        assert_eq!(
            bucketer.label(ymd(2023, 1, 5)),
            "2023-01-01 to 2023-01-10"
        );
        assert_eq!(
            bucketer.label(ymd(2023, 1, 11)),
            "2023-01-11 to 2023-01-20"
        );
    }

    #[test]
    fn last_window_is_cut_at_year_end() {
        let bucketer = TimeBucketer::new(BucketPolicy::TenDay);

        assert_eq!(
            bucketer.label(ymd(2023, 12, 31)),
            "2023-12-27 to 2023-12-31"
        );
        assert_eq!(
            bucketer.label(ymd(2024, 12, 31)),
            "2024-12-26 to 2024-12-31"
        );
        assert_eq!(
            bucketer.label(ymd(2024, 1, 1)),
            "2024-01-01 to 2024-01-10"
        );
    }

    #[test]
    fn ten_day_buckets_tile_the_calendar() {
        let bucketer = TimeBucketer::new(BucketPolicy::TenDay);
        let mut day = ymd(1999, 12, 1);
        let last = ymd(2025, 3, 1);
        let (_, mut prev_end) = bucketer.bounds(day - Duration::days(1));

        while day <= last {
            let (start, end) = bucketer.bounds(day);
            assert!(start <= day && day <= end, "{day} outside its bucket");
            if start == day {
                assert_eq!(start, prev_end + Duration::days(1), "gap or overlap at {day}");
            }
            prev_end = end;
            day += Duration::days(1);
        }
    }

    #[test]
    fn week_buckets_start_on_monday() {
        let bucketer = TimeBucketer::new(BucketPolicy::Week);

        // 2023-01-05 is a Thursday.
        assert_eq!(bucketer.label(ymd(2023, 1, 5)), "2023-01-02");
        assert_eq!(bucketer.label(ymd(2023, 1, 2)), "2023-01-02");
        assert_eq!(bucketer.label(ymd(2023, 1, 8)), "2023-01-02");
        assert_eq!(bucketer.label(ymd(2023, 1, 9)), "2023-01-09");
    }

    #[test]
    fn labels_sort_chronologically() {
        for policy in [BucketPolicy::TenDay, BucketPolicy::Week] {
            let bucketer = TimeBucketer::new(policy);
            let dates = [ymd(2021, 11, 30), ymd(2022, 2, 1), ymd(2022, 12, 31), ymd(2023, 1, 1)];
            let labels: Vec<String> = dates.iter().map(|d| bucketer.label(*d)).collect();
            let mut sorted = labels.clone();
            sorted.sort();
            assert_eq!(labels, sorted);
        }
    }
}
