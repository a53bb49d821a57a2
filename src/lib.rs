//! Portfolio returns analytics.
//!
//! Statistics follow the QuantStats conventions (sample standard deviation,
//! 252 periods per year, compounded drawdowns), and [`html`] renders them
//! as a self-contained tearsheet with inline SVG charts.
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use perfstats::{HtmlReportOptions, ReturnSeries, html};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let dates = (0..5).map(|i| start + chrono::Days::new(i)).collect();
//! let series = ReturnSeries::new(dates, vec![0.01, -0.02, 0.005, 0.0, 0.01], None)?;
//! let page = html(&series, HtmlReportOptions::default().with_output("tearsheet.html"))?;
//! # let _ = page;
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod distribution;
pub mod drawdown;
pub mod plots;
pub mod reports;
pub mod stats;
pub mod utils;

pub use crate::calendar::Frequency;
pub use crate::drawdown::DrawdownPeriod;
pub use crate::reports::{HtmlReportError, HtmlReportOptions, html};
pub use crate::stats::{
    BenchmarkMetrics, MetricsOptions, PerformanceMetrics, Window, compute_performance_metrics,
};
pub use crate::utils::{DataError, PERIODS_PER_YEAR, ReturnSeries, SeriesView};
