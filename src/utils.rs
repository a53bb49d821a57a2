use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate};
use thiserror::Error;
use tracing::debug;

/// Trading periods per year used to de-annualise rates and as the
/// fixed-period fallback when no dates are available.
pub const PERIODS_PER_YEAR: u32 = 252;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("time series is empty")]
    Empty,

    #[error("time series length mismatch: {dates} dates vs {values} values")]
    LengthMismatch { dates: usize, values: usize },

    #[error("dates are not in non-decreasing order at index {index}")]
    UnsortedDates { index: usize },

    #[error("probability {p} is outside the supported range [0.001, 0.999]")]
    ProbabilityOutOfRange { p: f64 },
}

/// Borrowed view over a returns slice with optional aligned dates.
///
/// Calendar-aware metrics read the dates when present and fall back to
/// fixed-period approximations (21 per month, 252 per year) otherwise.
#[derive(Clone, Copy, Debug)]
pub struct SeriesView<'a> {
    pub values: &'a [f64],
    pub dates: Option<&'a [NaiveDate]>,
}

impl<'a> SeriesView<'a> {
    pub fn new(values: &'a [f64], dates: &'a [NaiveDate]) -> Result<Self, DataError> {
        if dates.len() != values.len() {
            return Err(DataError::LengthMismatch {
                dates: dates.len(),
                values: values.len(),
            });
        }
        if let Some(index) = dates.windows(2).position(|w| w[1] < w[0]) {
            return Err(DataError::UnsortedDates { index: index + 1 });
        }

        Ok(Self {
            values,
            dates: Some(dates),
        })
    }

    pub fn undated(values: &'a [f64]) -> Self {
        Self {
            values,
            dates: None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keeps positions `start..`; both slices stay aligned.
    pub fn tail_from(&self, start: usize) -> Self {
        let start = start.min(self.values.len());
        Self {
            values: &self.values[start..],
            dates: self.dates.map(|d| &d[start..]),
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.and_then(|d| d.first().copied())
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.and_then(|d| d.last().copied())
    }
}

#[derive(Clone, Debug)]
pub struct ReturnSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
    pub name: Option<String>,
}

impl ReturnSeries {
    /// Pairs dates with values, sorting both by date.
    pub fn new(
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
        name: Option<String>,
    ) -> Result<Self, DataError> {
        if dates.is_empty() || values.is_empty() {
            return Err(DataError::Empty);
        }

        if dates.len() != values.len() {
            return Err(DataError::LengthMismatch {
                dates: dates.len(),
                values: values.len(),
            });
        }

        let mut paired: Vec<(NaiveDate, f64)> = dates.into_iter().zip(values).collect();
        paired.sort_by_key(|(d, _)| *d);
        let (dates, values) = paired.into_iter().unzip();

        Ok(Self {
            dates,
            values,
            name,
        })
    }

    pub fn view(&self) -> SeriesView<'_> {
        SeriesView {
            values: &self.values,
            dates: Some(&self.dates),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }

    /// Re-checks what [`ReturnSeries::new`] guarantees, for series
    /// assembled through the public fields.
    pub fn validate(&self) -> Result<(), DataError> {
        SeriesView::new(&self.values, &self.dates).map(|_| ())
    }

    /// Sanitises the values the same way [`prepare_returns`] does while
    /// dropping the dates of every removed observation.
    pub fn prepare(&self, rf: f64, keep_nans: bool) -> ReturnSeries {
        let (values, kept) = prepare_indexed(&self.values, rf, keep_nans);
        ReturnSeries {
            dates: kept.into_iter().map(|i| self.dates[i]).collect(),
            values,
            name: self.name.clone(),
        }
    }

    fn slice(&self, start: usize, end: usize) -> ReturnSeries {
        ReturnSeries {
            dates: self.dates[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            name: self.name.clone(),
        }
    }

    fn pick(&self, positions: &[usize]) -> ReturnSeries {
        ReturnSeries {
            dates: positions.iter().map(|&i| self.dates[i]).collect(),
            values: positions.iter().map(|&i| self.values[i]).collect(),
            name: self.name.clone(),
        }
    }

    fn slice_dates(&self, from: NaiveDate, to: NaiveDate) -> ReturnSeries {
        let start = self.dates.partition_point(|d| *d < from);
        let end = self.dates.partition_point(|d| *d <= to).max(start);
        self.slice(start, end)
    }
}

/// Per-period equivalent of an annualised risk-free rate.
pub fn rf_per_period(rf: f64, periods_per_year: u32) -> f64 {
    if rf == 0.0 || periods_per_year == 0 {
        return 0.0;
    }
    (1.0 + rf).powf(1.0 / periods_per_year as f64) - 1.0
}

/// An input is read as prices when it has at least two observations, all
/// of them finite and positive, and its minimum exceeds 1.
pub fn looks_like_prices(data: &[f64]) -> bool {
    data.len() >= 2
        && data.iter().all(|v| v.is_finite() && *v > 0.0)
        && data.iter().copied().fold(f64::INFINITY, f64::min) > 1.0
}

/// Simple returns `p[i] / p[i-1] - 1` of a price series.
pub fn to_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Price path starting from `base` implied by compounding the returns.
pub fn to_prices(returns: &[f64], base: f64) -> Vec<f64> {
    let mut level = base;
    returns
        .iter()
        .map(|r| {
            if r.is_finite() {
                level *= 1.0 + r;
            }
            level
        })
        .collect()
}

/// Running compounded return `prod(1 + r) - 1` at each position.
pub fn compsum(returns: &[f64]) -> Vec<f64> {
    to_prices(returns, 1.0).into_iter().map(|v| v - 1.0).collect()
}

/// Sanitises raw input into a returns vector.
///
/// Price-shaped input is converted to returns, non-finite values are
/// dropped unless `keep_nans` is set, and a non-zero annual `rf` is
/// subtracted per period. Never fails; empty input yields an empty vector.
pub fn prepare_returns(data: &[f64], rf: f64, keep_nans: bool) -> Vec<f64> {
    prepare_indexed(data, rf, keep_nans).0
}

/// Returns the sanitised values together with the index in `data` each
/// value came from.
fn prepare_indexed(data: &[f64], rf: f64, keep_nans: bool) -> (Vec<f64>, Vec<usize>) {
    let (raw, offset) = if looks_like_prices(data) {
        debug!(len = data.len(), "input detected as prices; converting to returns");
        (to_returns(data), 1)
    } else {
        (data.to_vec(), 0)
    };

    let per_period = rf_per_period(rf, PERIODS_PER_YEAR);
    let mut values = Vec::with_capacity(raw.len());
    let mut kept = Vec::with_capacity(raw.len());
    for (i, r) in raw.into_iter().enumerate() {
        if !keep_nans && !r.is_finite() {
            continue;
        }
        values.push(r - per_period);
        kept.push(i + offset);
    }

    let dropped = data.len() - offset - values.len();
    if dropped > 0 {
        debug!(dropped, "dropped non-finite observations");
    }

    (values, kept)
}

/// Converts epoch-millisecond timestamps to UTC calendar dates.
pub fn dates_from_timestamps(millis: &[i64]) -> Vec<NaiveDate> {
    millis
        .iter()
        .filter_map(|ms| DateTime::from_timestamp_millis(*ms))
        .map(|dt| dt.date_naive())
        .collect()
}

/// Restricts both series to the overlap of their date ranges.
pub fn intersect_date_ranges(
    a: &ReturnSeries,
    b: &ReturnSeries,
) -> (ReturnSeries, ReturnSeries) {
    let (Some((a_start, a_end)), Some((b_start, b_end))) = (a.date_range(), b.date_range()) else {
        return (a.clone(), b.clone());
    };

    let from = a_start.max(b_start);
    let to = a_end.min(b_end);
    debug!(%from, %to, "intersecting strategy and benchmark date ranges");
    (a.slice_dates(from, to), b.slice_dates(from, to))
}

/// Inner join on date: keeps only the dates both series carry, so the
/// two outputs pair up position by position.
pub fn align_on_dates(a: &ReturnSeries, b: &ReturnSeries) -> (ReturnSeries, ReturnSeries) {
    let a_len = a.dates.len().min(a.values.len());
    let b_len = b.dates.len().min(b.values.len());

    let (mut a_keep, mut b_keep) = (Vec::new(), Vec::new());
    let (mut i, mut j) = (0, 0);
    while i < a_len && j < b_len {
        match a.dates[i].cmp(&b.dates[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                a_keep.push(i);
                b_keep.push(j);
                i += 1;
                j += 1;
            }
        }
    }

    debug!(
        left = a_len,
        right = b_len,
        common = a_keep.len(),
        "joined series on date"
    );
    (a.pick(&a_keep), b.pick(&b_keep))
}

/// Drops the leading stretch where either series has not started
/// trading, i.e. starts both at the later of their first non-zero dates.
pub fn match_start_dates(a: &ReturnSeries, b: &ReturnSeries) -> (ReturnSeries, ReturnSeries) {
    let first_active = |s: &ReturnSeries| {
        s.values
            .iter()
            .position(|v| v.is_finite() && *v != 0.0)
            .map(|i| s.dates[i])
    };

    let start = match (first_active(a), first_active(b)) {
        (Some(x), Some(y)) => x.max(y),
        (Some(x), None) | (None, Some(x)) => x,
        (None, None) => return (a.clone(), b.clone()),
    };

    let cut = |s: &ReturnSeries| {
        let idx = s.dates.partition_point(|d| *d < start);
        s.slice(idx, s.len())
    };
    (cut(a), cut(b))
}
