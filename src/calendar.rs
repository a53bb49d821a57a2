//! Calendar grouping and trailing-window filters.
//!
//! Dates are UTC calendar dates, so year/month/quarter extraction never
//! depends on a local timezone. Every function has a fixed-period
//! fallback used when the series carries no dates.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use chrono::{Datelike, Months, NaiveDate};

use crate::utils::SeriesView;

pub const PERIODS_PER_WEEK: usize = 5;
pub const PERIODS_PER_MONTH: usize = 21;
pub const PERIODS_PER_QUARTER: usize = 63;
pub const PERIODS_PER_YEAR: usize = 252;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Bucket key of a date: (ISO year, ISO week), (year, month),
    /// (year, quarter) or (year, 0).
    pub fn key(self, date: &NaiveDate) -> (i32, u32) {
        match self {
            Frequency::Weekly => {
                let iso = date.iso_week();
                (iso.year(), iso.week())
            }
            Frequency::Monthly => (date.year(), date.month()),
            Frequency::Quarterly => (date.year(), (date.month() - 1) / 3 + 1),
            Frequency::Yearly => (date.year(), 0),
        }
    }

    /// Number of periods per bucket when no dates are available.
    pub fn fallback_periods(self) -> usize {
        match self {
            Frequency::Weekly => PERIODS_PER_WEEK,
            Frequency::Monthly => PERIODS_PER_MONTH,
            Frequency::Quarterly => PERIODS_PER_QUARTER,
            Frequency::Yearly => PERIODS_PER_YEAR,
        }
    }
}

/// Collapses a bucket to a single return: compounded `prod(1 + r) - 1`
/// or the arithmetic sum.
pub fn aggregate(values: &[f64], compounded: bool) -> f64 {
    if compounded {
        values.iter().fold(1.0_f64, |acc, r| acc * (1.0 + r)) - 1.0
    } else {
        values.iter().sum()
    }
}

/// Groups values by key in first-occurrence order.
fn group_by_key<K: Eq + Hash + Copy>(
    values: &[f64],
    dates: &[NaiveDate],
    key_fn: impl Fn(&NaiveDate) -> K,
) -> Vec<(K, Vec<f64>)> {
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<f64>)> = Vec::new();

    for (date, value) in dates.iter().zip(values) {
        let key = key_fn(date);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(*value);
    }
    groups
}

/// Resamples dated returns, keeping each bucket's key.
pub fn resample_keyed(
    values: &[f64],
    dates: &[NaiveDate],
    freq: Frequency,
    compounded: bool,
) -> Vec<((i32, u32), f64)> {
    group_by_key(values, dates, |d| freq.key(d))
        .into_iter()
        .map(|(key, bucket)| (key, aggregate(&bucket, compounded)))
        .collect()
}

/// Resamples a series to one return per calendar bucket.
///
/// Without dates the series is cut into consecutive chunks of
/// [`Frequency::fallback_periods`] observations, the last one possibly
/// short.
pub fn resample(series: SeriesView<'_>, freq: Frequency, compounded: bool) -> Vec<f64> {
    match series.dates {
        Some(dates) => resample_keyed(series.values, dates, freq, compounded)
            .into_iter()
            .map(|(_, v)| v)
            .collect(),
        None => series
            .values
            .chunks(freq.fallback_periods())
            .map(|chunk| aggregate(chunk, compounded))
            .collect(),
    }
}

pub fn resample_monthly(series: SeriesView<'_>, compounded: bool) -> Vec<f64> {
    resample(series, Frequency::Monthly, compounded)
}

pub fn resample_quarterly(series: SeriesView<'_>, compounded: bool) -> Vec<f64> {
    resample(series, Frequency::Quarterly, compounded)
}

pub fn resample_yearly(series: SeriesView<'_>, compounded: bool) -> Vec<f64> {
    resample(series, Frequency::Yearly, compounded)
}

/// Compounded return per calendar year.
pub fn yearly_table(values: &[f64], dates: &[NaiveDate]) -> BTreeMap<i32, f64> {
    resample_keyed(values, dates, Frequency::Yearly, true)
        .into_iter()
        .map(|((year, _), v)| (year, v))
        .collect()
}

/// Year x month grid of compounded monthly returns; months without
/// observations are `None`.
pub fn monthly_table(values: &[f64], dates: &[NaiveDate]) -> BTreeMap<i32, [Option<f64>; 12]> {
    let mut table: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for ((year, month), v) in resample_keyed(values, dates, Frequency::Monthly, true) {
        table.entry(year).or_insert([None; 12])[(month - 1) as usize] = Some(v);
    }
    table
}

/// Keeps observations dated on or after `from`; dates are sorted so this
/// is always a suffix.
fn since<'a>(series: SeriesView<'a>, dates: &[NaiveDate], from: NaiveDate) -> SeriesView<'a> {
    series.tail_from(dates.partition_point(|d| *d < from))
}

fn trailing(series: SeriesView<'_>, periods: usize) -> SeriesView<'_> {
    series.tail_from(series.len().saturating_sub(periods))
}

/// Month-to-date window anchored on the last date.
pub fn filter_mtd(series: SeriesView<'_>) -> SeriesView<'_> {
    match (series.dates, series.last_date()) {
        (Some(dates), Some(last)) => since(series, dates, last.with_day(1).unwrap_or(last)),
        _ => trailing(series, PERIODS_PER_MONTH),
    }
}

/// Year-to-date window anchored on the last date.
pub fn filter_ytd(series: SeriesView<'_>) -> SeriesView<'_> {
    match (series.dates, series.last_date()) {
        (Some(dates), Some(last)) => since(series, dates, last.with_ordinal(1).unwrap_or(last)),
        _ => trailing(series, PERIODS_PER_YEAR),
    }
}

/// Observations within `months` calendar months of the last date. The
/// day of month is clamped when the target month is shorter.
pub fn filter_months_back(series: SeriesView<'_>, months: u32) -> SeriesView<'_> {
    match (series.dates, series.last_date()) {
        (Some(dates), Some(last)) => match last.checked_sub_months(Months::new(months)) {
            Some(from) => since(series, dates, from),
            None => series,
        },
        _ => trailing(series, PERIODS_PER_MONTH * months as usize),
    }
}

pub fn filter_years_back(series: SeriesView<'_>, years: u32) -> SeriesView<'_> {
    match series.dates {
        Some(_) => filter_months_back(series, years.saturating_mul(12)),
        None => trailing(series, PERIODS_PER_YEAR * years as usize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> (Vec<f64>, Vec<NaiveDate>) {
        let dates = vec![
            date(2023, 11, 30),
            date(2023, 12, 1),
            date(2023, 12, 29),
            date(2024, 1, 2),
            date(2024, 1, 31),
            date(2024, 2, 1),
            date(2024, 2, 29),
        ];
        let values = vec![0.01, 0.02, -0.01, 0.03, -0.02, 0.01, 0.04];
        (values, dates)
    }

    #[test]
    fn monthly_buckets_follow_calendar() {
        let (values, dates) = sample();
        let view = SeriesView::new(&values, &dates).unwrap();
        let sums = resample_monthly(view, false);
        assert_eq!(sums.len(), 4);
        assert!((sums[0] - 0.01).abs() < 1e-15);
        assert!((sums[1] - 0.01).abs() < 1e-15);
        assert!((sums[2] - 0.01).abs() < 1e-15);
        assert!((sums[3] - 0.05).abs() < 1e-15);

        let comp = resample_monthly(view, true);
        assert!((comp[1] - (1.02 * 0.99 - 1.0)).abs() < 1e-15);
    }

    #[test]
    fn yearly_and_quarterly_buckets() {
        let (values, dates) = sample();
        let view = SeriesView::new(&values, &dates).unwrap();
        assert_eq!(resample_yearly(view, true).len(), 2);
        assert_eq!(resample_quarterly(view, true).len(), 2);

        let table = yearly_table(&values, &dates);
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![2023, 2024]);
    }

    #[test]
    fn undated_resampling_chunks_fixed_periods() {
        let values = vec![0.01; 50];
        let monthly = resample_monthly(SeriesView::undated(&values), false);
        assert_eq!(monthly.len(), 3);
        assert!((monthly[0] - 0.21).abs() < 1e-12);
        assert!((monthly[2] - 0.08).abs() < 1e-12);
    }

    #[test]
    fn monthly_table_places_cells() {
        let (values, dates) = sample();
        let table = monthly_table(&values, &dates);
        assert!(table[&2023][10].is_some());
        assert!(table[&2023][0].is_none());
        assert!(table[&2024][1].is_some());
    }

    #[test]
    fn mtd_and_ytd_anchor_on_last_date() {
        let (values, dates) = sample();
        let view = SeriesView::new(&values, &dates).unwrap();
        assert_eq!(filter_mtd(view).values, &[0.01, 0.04]);
        assert_eq!(filter_ytd(view).values, &[0.03, -0.02, 0.01, 0.04]);
    }

    #[test_case(1, 3 ; "one month back")]
    #[test_case(2, 5 ; "two months back")]
    #[test_case(12, 7 ; "beyond the start")]
    fn months_back_window(months: u32, expected_len: usize) {
        let (values, dates) = sample();
        let view = SeriesView::new(&values, &dates).unwrap();
        assert_eq!(filter_months_back(view, months).len(), expected_len);
    }

    #[test]
    fn month_arithmetic_clamps_day() {
        let dates = vec![date(2024, 2, 28), date(2024, 2, 29), date(2024, 5, 31)];
        let values = vec![0.1, 0.2, 0.3];
        let view = SeriesView::new(&values, &dates).unwrap();
        // 2024-05-31 minus three months clamps to 2024-02-29.
        assert_eq!(filter_months_back(view, 3).values, &[0.2, 0.3]);
    }

    #[test]
    fn undated_filters_use_trailing_windows() {
        let values = vec![0.0; 600];
        let view = SeriesView::undated(&values);
        assert_eq!(filter_mtd(view).len(), 21);
        assert_eq!(filter_ytd(view).len(), 252);
        assert_eq!(filter_months_back(view, 6).len(), 126);
        assert_eq!(filter_years_back(view, 2).len(), 504);
        assert_eq!(filter_years_back(view, 5).len(), 600);
    }
}
