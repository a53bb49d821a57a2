use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::calendar::{
    self, Frequency, filter_months_back, filter_mtd, filter_years_back, filter_ytd,
    resample_monthly,
};
use crate::distribution::{
    self, correlation, covariance, mean, norm_cdf, norm_ppf, quantile, std_dev, variance,
};
use crate::drawdown::{drawdown_details, to_drawdown_series};
use crate::utils::{PERIODS_PER_YEAR, ReturnSeries, SeriesView, rf_per_period};

const DAYS_PER_YEAR: f64 = 365.0;

// === return & growth ===

/// Compounded total return `prod(1 + r) - 1`.
pub fn total_return(returns: &[f64]) -> f64 {
    calendar::aggregate(returns, true)
}

/// Compound annual growth rate.
///
/// The time base is calendar days / 365 when the series is dated and
/// `n / 252` otherwise.
pub fn cagr(series: SeriesView<'_>) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let years = match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => (last - first).num_days() as f64 / DAYS_PER_YEAR,
        _ => series.len() as f64 / PERIODS_PER_YEAR as f64,
    };
    if years <= 0.0 {
        return 0.0;
    }
    (total_return(series.values) + 1.0).abs().powf(1.0 / years) - 1.0
}

/// Annualised sample standard deviation.
pub fn volatility(returns: &[f64], periods_per_year: u32) -> f64 {
    std_dev(returns) * (periods_per_year as f64).sqrt()
}

/// Geometric mean return per period, after resampling to `aggregate`
/// buckets when one is given.
pub fn expected_return(
    series: SeriesView<'_>,
    aggregate: Option<Frequency>,
    compounded: bool,
) -> f64 {
    let resampled;
    let values = match aggregate {
        Some(freq) => {
            resampled = calendar::resample(series, freq, compounded);
            resampled.as_slice()
        }
        None => series.values,
    };
    geometric_mean(values)
}

fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let growth = values.iter().fold(1.0_f64, |acc, r| acc * (1.0 + r));
    growth.powf(1.0 / values.len() as f64) - 1.0
}

pub fn expected_monthly(series: SeriesView<'_>, compounded: bool) -> f64 {
    expected_return(series, Some(Frequency::Monthly), compounded)
}

pub fn expected_yearly(series: SeriesView<'_>, compounded: bool) -> f64 {
    expected_return(series, Some(Frequency::Yearly), compounded)
}

/// Trailing windows shown in the period-returns block of the tearsheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Window {
    Mtd,
    ThreeMonths,
    SixMonths,
    Ytd,
    OneYear,
    ThreeYears,
    FiveYears,
    TenYears,
    AllTime,
}

impl Window {
    /// Windows of a year or more report CAGR instead of total return.
    pub fn annualised(self) -> bool {
        matches!(
            self,
            Window::OneYear
                | Window::ThreeYears
                | Window::FiveYears
                | Window::TenYears
                | Window::AllTime
        )
    }

    pub fn filter(self, series: SeriesView<'_>) -> SeriesView<'_> {
        match self {
            Window::Mtd => filter_mtd(series),
            Window::ThreeMonths => filter_months_back(series, 3),
            Window::SixMonths => filter_months_back(series, 6),
            Window::Ytd => filter_ytd(series),
            Window::OneYear => filter_years_back(series, 1),
            Window::ThreeYears => filter_years_back(series, 3),
            Window::FiveYears => filter_years_back(series, 5),
            Window::TenYears => filter_years_back(series, 10),
            Window::AllTime => series,
        }
    }
}

/// Return over a trailing window anchored on the last observation.
pub fn window_return(series: SeriesView<'_>, window: Window) -> f64 {
    let filtered = window.filter(series);
    if window.annualised() {
        cagr(filtered)
    } else {
        total_return(filtered.values)
    }
}

pub fn mtd(series: SeriesView<'_>) -> f64 {
    window_return(series, Window::Mtd)
}

pub fn ytd(series: SeriesView<'_>) -> f64 {
    window_return(series, Window::Ytd)
}

// === risk-adjusted ratios ===

fn excess_returns(returns: &[f64], rf: f64, periods_per_year: u32) -> Vec<f64> {
    let per_period = rf_per_period(rf, periods_per_year);
    returns.iter().map(|r| r - per_period).collect()
}

/// Sharpe ratio of the excess returns; 0 for fewer than two observations
/// or zero volatility.
pub fn sharpe(returns: &[f64], rf: f64, periods_per_year: u32, annualize: bool) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let excess = excess_returns(returns, rf, periods_per_year);
    let std = std_dev(&excess);
    if std == 0.0 {
        return 0.0;
    }
    let ratio = mean(&excess) / std;
    if annualize {
        ratio * (periods_per_year as f64).sqrt()
    } else {
        ratio
    }
}

/// Sortino ratio. The downside deviation squares only the strictly
/// negative excess returns and divides by `n - 1` over the full sample.
/// With no losing periods the ratio is `+inf` for a positive mean.
pub fn sortino(returns: &[f64], rf: f64, periods_per_year: u32, annualize: bool) -> f64 {
    let n = returns.len();
    if n < 2 {
        return 0.0;
    }
    let excess = excess_returns(returns, rf, periods_per_year);
    let mu = mean(&excess);
    let downside_sq: f64 = excess.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
    if downside_sq == 0.0 {
        return if mu > 0.0 { f64::INFINITY } else { 0.0 };
    }
    let downside = (downside_sq / (n as f64 - 1.0)).sqrt();
    let ratio = mu / downside;
    if annualize {
        ratio * (periods_per_year as f64).sqrt()
    } else {
        ratio
    }
}

pub fn sortino_sqrt2(returns: &[f64], rf: f64, periods_per_year: u32) -> f64 {
    sortino(returns, rf, periods_per_year, true) / std::f64::consts::SQRT_2
}

/// Standard-deviation inflation for serially correlated returns:
/// `sqrt(1 + 2 * sum_{k=1}^{n-1} ((n - k) / n) * c^k)` with `c` the
/// absolute lag-1 autocorrelation.
pub fn autocorr_penalty(returns: &[f64]) -> f64 {
    let n = returns.len();
    if n < 3 {
        return 1.0;
    }
    let coef = correlation(&returns[..n - 1], &returns[1..]).abs();
    if !coef.is_finite() || coef == 0.0 {
        return 1.0;
    }

    let nf = n as f64;
    let mut power = 1.0_f64;
    let mut sum = 0.0_f64;
    for k in 1..n {
        power *= coef;
        if power == 0.0 {
            break;
        }
        sum += ((nf - k as f64) / nf) * power;
    }
    (1.0 + 2.0 * sum).sqrt()
}

pub fn smart_sharpe(returns: &[f64], rf: f64, periods_per_year: u32) -> f64 {
    let excess = excess_returns(returns, rf, periods_per_year);
    sharpe(returns, rf, periods_per_year, true) / autocorr_penalty(&excess)
}

pub fn smart_sortino(returns: &[f64], rf: f64, periods_per_year: u32) -> f64 {
    let excess = excess_returns(returns, rf, periods_per_year);
    sortino(returns, rf, periods_per_year, true) / autocorr_penalty(&excess)
}

pub fn smart_sortino_sqrt2(returns: &[f64], rf: f64, periods_per_year: u32) -> f64 {
    smart_sortino(returns, rf, periods_per_year) / std::f64::consts::SQRT_2
}

/// Probability that the true (non-annualised) Sharpe ratio exceeds `rf`,
/// adjusted for skew, kurtosis and sample length.
pub fn probabilistic_sharpe_ratio(returns: &[f64], rf: f64, periods_per_year: u32) -> f64 {
    let n = returns.len();
    if n < 2 {
        return 0.0;
    }
    let sr = sharpe(returns, 0.0, periods_per_year, false);
    let skew = distribution::skew(returns);
    let kurt = distribution::kurtosis(returns);

    let radicand =
        (1.0 + 0.5 * sr * sr - skew * sr + ((kurt - 3.0) / 4.0) * sr * sr) / (n as f64 - 1.0);
    let sigma_sr = radicand.sqrt();
    if !sigma_sr.is_finite() || sigma_sr == 0.0 {
        return 0.0;
    }
    norm_cdf((sr - rf) / sigma_sr)
}

/// CAGR over the absolute maximum drawdown.
pub fn calmar(series: SeriesView<'_>) -> f64 {
    let max_dd = max_drawdown(series.values);
    if max_dd == 0.0 {
        return 0.0;
    }
    cagr(series) / max_dd.abs()
}

/// Gains above the de-annualised threshold over losses below it.
pub fn omega(returns: &[f64], threshold: f64, periods_per_year: u32) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let tau = if periods_per_year == 1 {
        threshold
    } else {
        (1.0 + threshold).powf(1.0 / periods_per_year as f64) - 1.0
    };

    let (mut gains, mut losses) = (0.0_f64, 0.0_f64);
    for r in returns {
        let diff = r - tau;
        if diff > 0.0 {
            gains += diff;
        } else {
            losses += diff;
        }
    }
    if losses == 0.0 {
        return 0.0;
    }
    gains / losses.abs()
}

// === drawdown ===

pub fn max_drawdown(returns: &[f64]) -> f64 {
    to_drawdown_series(returns)
        .into_iter()
        .fold(0.0_f64, f64::min)
}

/// Mean valley depth across drawdown periods.
pub fn avg_drawdown(series: SeriesView<'_>) -> f64 {
    let periods = drawdown_details(series);
    if periods.is_empty() {
        return 0.0;
    }
    periods.iter().map(|p| p.depth).sum::<f64>() / periods.len() as f64
}

pub fn longest_dd_days(series: SeriesView<'_>) -> u32 {
    drawdown_details(series)
        .iter()
        .map(|p| p.days)
        .max()
        .unwrap_or(0)
}

pub fn avg_dd_days(series: SeriesView<'_>) -> f64 {
    let periods = drawdown_details(series);
    if periods.is_empty() {
        return 0.0;
    }
    periods.iter().map(|p| p.days as f64).sum::<f64>() / periods.len() as f64
}

/// Root-mean-square drawdown, `sqrt(sum(dd^2) / (n - 1))` over the whole
/// series.
pub fn ulcer_index(returns: &[f64]) -> f64 {
    let n = returns.len();
    if n < 2 {
        return 0.0;
    }
    let sum_sq: f64 = to_drawdown_series(returns).iter().map(|d| d * d).sum();
    (sum_sq / (n as f64 - 1.0)).sqrt()
}

pub fn ulcer_performance_index(series: SeriesView<'_>) -> f64 {
    let ulcer = ulcer_index(series.values);
    if ulcer == 0.0 {
        return 0.0;
    }
    cagr(series) / ulcer
}

/// Arithmetic sum of returns (less `rf`) over the absolute max drawdown.
pub fn recovery_factor(returns: &[f64], rf: f64) -> f64 {
    let max_dd = max_drawdown(returns);
    if max_dd == 0.0 {
        return 0.0;
    }
    (returns.iter().sum::<f64>() - rf).abs() / max_dd.abs()
}

/// Return over ulcer index scaled by the drawdown pitfall
/// `-cvar(dd) / std(r)`.
pub fn serenity_index(returns: &[f64], rf: f64) -> f64 {
    let std = std_dev(returns);
    if std == 0.0 {
        return 0.0;
    }
    let drawdowns = to_drawdown_series(returns);
    let pitfall = -conditional_value_at_risk(&drawdowns, 1.0, 0.95) / std;
    let denom = ulcer_index(returns) * pitfall;
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (returns.iter().sum::<f64>() - rf) / denom
}

// === tail risk ===

fn normalise_confidence(confidence: f64) -> f64 {
    if confidence > 1.0 {
        confidence / 100.0
    } else {
        confidence
    }
}

/// Parametric (variance-covariance) value at risk:
/// `mean + sigma * std * ppf(1 - confidence)`. Confidence may be given in
/// percent.
pub fn value_at_risk(returns: &[f64], sigma: f64, confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let confidence = normalise_confidence(confidence);
    mean(returns) + sigma * std_dev(returns) * norm_ppf(1.0 - confidence)
}

/// Mean of the returns strictly below the parametric VaR, or the VaR
/// itself when fewer than two observations fall in the tail.
pub fn conditional_value_at_risk(returns: &[f64], sigma: f64, confidence: f64) -> f64 {
    let var = value_at_risk(returns, sigma, confidence);
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r < var).collect();
    if tail.len() > 1 { mean(&tail) } else { var }
}

/// CVaR at `confidence`; `sigma` is accepted for signature parity and
/// ignored.
pub fn expected_shortfall(returns: &[f64], _sigma: f64, confidence: f64) -> f64 {
    conditional_value_at_risk(returns, 1.0, confidence)
}

/// `|q(cutoff) / q(1 - cutoff)|` with empirical quantiles.
pub fn tail_ratio(returns: &[f64], cutoff: f64) -> f64 {
    let low = quantile(returns, 1.0 - cutoff);
    if low == 0.0 {
        return 0.0;
    }
    (quantile(returns, cutoff) / low).abs()
}

// === trading / win-loss ===

fn count(returns: &[f64], pred: impl Fn(f64) -> bool) -> usize {
    returns.iter().filter(|r| pred(**r)).count()
}

/// Share of winning periods among non-zero periods.
pub fn win_rate(returns: &[f64]) -> f64 {
    let non_zero = count(returns, |r| r != 0.0);
    if non_zero == 0 {
        return 0.0;
    }
    count(returns, |r| r > 0.0) as f64 / non_zero as f64
}

pub fn avg_win(returns: &[f64]) -> f64 {
    let wins: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
    mean(&wins)
}

pub fn avg_loss(returns: &[f64]) -> f64 {
    let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    mean(&losses)
}

pub fn profit_factor(returns: &[f64]) -> f64 {
    let wins: f64 = returns.iter().filter(|r| **r >= 0.0).sum();
    let losses: f64 = returns.iter().filter(|r| **r < 0.0).sum();
    if losses == 0.0 {
        return 0.0;
    }
    (wins / losses).abs()
}

pub fn payoff_ratio(returns: &[f64]) -> f64 {
    let loss = avg_loss(returns);
    if loss == 0.0 {
        return 0.0;
    }
    avg_win(returns) / loss.abs()
}

pub fn gain_to_pain(returns: &[f64]) -> f64 {
    let pain: f64 = returns.iter().filter(|r| **r < 0.0).sum::<f64>().abs();
    if pain == 0.0 {
        return 0.0;
    }
    returns.iter().sum::<f64>() / pain
}

/// Gain/pain on monthly sums.
pub fn gain_to_pain_monthly(series: SeriesView<'_>) -> f64 {
    gain_to_pain(&resample_monthly(series, false))
}

pub fn common_sense_ratio(returns: &[f64]) -> f64 {
    profit_factor(returns) * tail_ratio(returns, 0.95)
}

pub fn cpc_index(returns: &[f64]) -> f64 {
    profit_factor(returns) * win_rate(returns) * payoff_ratio(returns)
}

pub fn outlier_win_ratio(returns: &[f64]) -> f64 {
    let positive: Vec<f64> = returns.iter().copied().filter(|r| *r >= 0.0).collect();
    let avg = mean(&positive);
    if avg == 0.0 {
        return 0.0;
    }
    quantile(returns, 0.99) / avg
}

pub fn outlier_loss_ratio(returns: &[f64]) -> f64 {
    let avg = avg_loss(returns);
    if avg == 0.0 {
        return 0.0;
    }
    quantile(returns, 0.01) / avg
}

/// Kelly fraction `(payoff * p - (1 - p)) / payoff`.
pub fn kelly_criterion(returns: &[f64]) -> f64 {
    let payoff = payoff_ratio(returns);
    if payoff == 0.0 {
        return 0.0;
    }
    let win_prob = win_rate(returns);
    (payoff * win_prob - (1.0 - win_prob)) / payoff
}

pub fn risk_of_ruin(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let wins = win_rate(returns);
    ((1.0 - wins) / (1.0 + wins)).powi(returns.len() as i32)
}

/// Share of periods with a non-zero return, rounded up to whole percent.
pub fn exposure(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let active = count(returns, |r| r != 0.0) as f64 / returns.len() as f64;
    (active * 100.0).ceil() / 100.0
}

fn longest_run(returns: &[f64], pred: impl Fn(f64) -> bool) -> usize {
    let mut best = 0;
    let mut current = 0;
    for r in returns {
        if pred(*r) {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

pub fn consecutive_wins(returns: &[f64]) -> usize {
    longest_run(returns, |r| r > 0.0)
}

pub fn consecutive_losses(returns: &[f64]) -> usize {
    longest_run(returns, |r| r < 0.0)
}

pub fn best(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

pub fn worst(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Best compounded bucket return at `freq`.
pub fn best_period(series: SeriesView<'_>, freq: Frequency) -> f64 {
    best(&calendar::resample(series, freq, true))
}

pub fn worst_period(series: SeriesView<'_>, freq: Frequency) -> f64 {
    worst(&calendar::resample(series, freq, true))
}

pub fn avg_up_month(series: SeriesView<'_>) -> f64 {
    avg_win(&resample_monthly(series, true))
}

pub fn avg_down_month(series: SeriesView<'_>) -> f64 {
    avg_loss(&resample_monthly(series, true))
}

pub fn win_month(series: SeriesView<'_>) -> f64 {
    win_rate(&resample_monthly(series, true))
}

/// Quarterly win rate. Undated series report 0 rather than using the
/// fixed-period fallback.
pub fn win_quarter(series: SeriesView<'_>) -> f64 {
    if series.dates.is_none() {
        return 0.0;
    }
    win_rate(&calendar::resample_quarterly(series, true))
}

pub fn win_year(series: SeriesView<'_>) -> f64 {
    win_rate(&calendar::resample_yearly(series, true))
}

// === benchmark-relative ===

fn truncate<'a>(returns: &'a [f64], benchmark: &'a [f64]) -> (&'a [f64], &'a [f64]) {
    let n = returns.len().min(benchmark.len());
    (&returns[..n], &benchmark[..n])
}

pub fn beta(returns: &[f64], benchmark: &[f64]) -> f64 {
    let (r, b) = truncate(returns, benchmark);
    let var_b = variance(b);
    if var_b == 0.0 {
        return 0.0;
    }
    covariance(r, b) / var_b
}

pub fn alpha(returns: &[f64], benchmark: &[f64]) -> f64 {
    let (r, b) = truncate(returns, benchmark);
    geometric_mean(r) - beta(r, b) * geometric_mean(b)
}

/// Mean active return over tracking error.
pub fn information_ratio(returns: &[f64], benchmark: &[f64]) -> f64 {
    let (r, b) = truncate(returns, benchmark);
    let active: Vec<f64> = r.iter().zip(b).map(|(x, y)| x - y).collect();
    let tracking = std_dev(&active);
    if tracking == 0.0 {
        return 0.0;
    }
    mean(&active) / tracking
}

pub fn treynor_ratio(returns: &[f64], benchmark: &[f64], rf: f64) -> f64 {
    let (r, b) = truncate(returns, benchmark);
    let beta = beta(r, b);
    if beta == 0.0 {
        return 0.0;
    }
    (geometric_mean(r) - rf) / beta
}

pub fn benchmark_correlation(returns: &[f64], benchmark: &[f64]) -> f64 {
    let (r, b) = truncate(returns, benchmark);
    correlation(r, b)
}

pub fn r_squared(returns: &[f64], benchmark: &[f64]) -> f64 {
    benchmark_correlation(returns, benchmark).powi(2)
}

/// `(alpha, beta)` against the benchmark.
pub fn greeks(returns: &[f64], benchmark: &[f64]) -> (f64, f64) {
    (alpha(returns, benchmark), beta(returns, benchmark))
}

// === rolling ===

/// Applies `f` to every trailing window of length `window`; the first
/// `window - 1` positions are NaN.
pub fn rolling_apply(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for end in window - 1..values.len() {
        out[end] = f(&values[end + 1 - window..=end]);
    }
    out
}

/// Rolling `(alpha, beta)`; NaN for the first `window - 1` positions.
pub fn rolling_greeks(returns: &[f64], benchmark: &[f64], window: usize) -> Vec<(f64, f64)> {
    let (r, b) = truncate(returns, benchmark);
    let mut out = vec![(f64::NAN, f64::NAN); r.len()];
    if window == 0 || r.len() < window {
        return out;
    }
    for end in window - 1..r.len() {
        let start = end + 1 - window;
        out[end] = greeks(&r[start..=end], &b[start..=end]);
    }
    out
}

pub fn rolling_beta(returns: &[f64], benchmark: &[f64], window: usize) -> Vec<f64> {
    rolling_greeks(returns, benchmark, window)
        .into_iter()
        .map(|(_, beta)| beta)
        .collect()
}

pub fn rolling_volatility(returns: &[f64], window: usize, periods_per_year: u32) -> Vec<f64> {
    rolling_apply(returns, window, |w| volatility(w, periods_per_year))
}

pub fn rolling_sharpe(returns: &[f64], rf: f64, window: usize, periods_per_year: u32) -> Vec<f64> {
    rolling_apply(returns, window, |w| sharpe(w, rf, periods_per_year, true))
}

pub fn rolling_sortino(returns: &[f64], rf: f64, window: usize, periods_per_year: u32) -> Vec<f64> {
    rolling_apply(returns, window, |w| sortino(w, rf, periods_per_year, true))
}

// === full metric set ===

#[derive(Clone, Debug, Serialize)]
pub struct MetricsOptions {
    /// Annualised risk-free rate.
    pub rf: f64,
    pub periods_per_year: u32,
    pub compounded: bool,
    /// Keep non-finite observations in [`MetricsOptions::prepare`].
    pub keep_nans: bool,
    pub var_sigma: f64,
    pub var_confidence: f64,
    pub tail_cutoff: f64,
    pub omega_threshold: f64,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            rf: 0.0,
            periods_per_year: PERIODS_PER_YEAR,
            compounded: true,
            keep_nans: false,
            var_sigma: 1.0,
            var_confidence: 0.95,
            tail_cutoff: 0.95,
            omega_threshold: 0.0,
        }
    }
}

impl MetricsOptions {
    pub fn with_rf(mut self, rf: f64) -> Self {
        self.rf = rf;
        self
    }

    pub fn with_periods_per_year(mut self, periods: u32) -> Self {
        self.periods_per_year = periods;
        self
    }

    pub fn with_compounded(mut self, compounded: bool) -> Self {
        self.compounded = compounded;
        self
    }

    pub fn with_keep_nans(mut self, keep_nans: bool) -> Self {
        self.keep_nans = keep_nans;
        self
    }

    pub fn with_var(mut self, sigma: f64, confidence: f64) -> Self {
        self.var_sigma = sigma;
        self.var_confidence = confidence;
        self
    }

    pub fn with_tail_cutoff(mut self, cutoff: f64) -> Self {
        self.tail_cutoff = cutoff;
        self
    }

    pub fn with_omega_threshold(mut self, threshold: f64) -> Self {
        self.omega_threshold = threshold;
        self
    }

    /// Sanitises a raw series for [`compute_performance_metrics`]. The
    /// risk-free rate is not subtracted here; the ratios apply it.
    pub fn prepare(&self, series: &ReturnSeries) -> ReturnSeries {
        series.prepare(0.0, self.keep_nans)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchmarkMetrics {
    pub beta: f64,
    pub alpha: f64,
    pub correlation: f64,
    pub r_squared: f64,
    pub information_ratio: f64,
    pub treynor_ratio: f64,
}

impl BenchmarkMetrics {
    pub fn compute(returns: &[f64], benchmark: &[f64], rf: f64) -> Self {
        Self {
            beta: beta(returns, benchmark),
            alpha: alpha(returns, benchmark),
            correlation: benchmark_correlation(returns, benchmark),
            r_squared: r_squared(returns, benchmark),
            information_ratio: information_ratio(returns, benchmark),
            treynor_ratio: treynor_ratio(returns, benchmark, rf),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PerformanceMetrics {
    pub rf: f64,
    pub exposure: f64,

    pub total_return: f64,
    pub cagr: f64,

    pub sharpe: f64,
    pub probabilistic_sharpe: f64,
    pub smart_sharpe: f64,
    pub sortino: f64,
    pub smart_sortino: f64,
    pub sortino_sqrt2: f64,
    pub smart_sortino_sqrt2: f64,
    pub omega: f64,

    pub max_drawdown: f64,
    pub max_drawdown_start: Option<NaiveDate>,
    pub max_drawdown_valley: Option<NaiveDate>,
    pub max_drawdown_end: Option<NaiveDate>,
    pub longest_dd_days: u32,
    pub volatility: f64,
    pub calmar: f64,
    pub skew: f64,
    pub kurtosis: f64,

    pub expected_daily: f64,
    pub expected_monthly: f64,
    pub expected_yearly: f64,
    pub kelly_criterion: f64,
    pub risk_of_ruin: f64,
    pub value_at_risk: f64,
    pub expected_shortfall: f64,

    pub consecutive_wins: usize,
    pub consecutive_losses: usize,
    pub gain_to_pain: f64,
    pub gain_to_pain_monthly: f64,
    pub payoff_ratio: f64,
    pub profit_factor: f64,
    pub common_sense_ratio: f64,
    pub cpc_index: f64,
    pub tail_ratio: f64,
    pub outlier_win_ratio: f64,
    pub outlier_loss_ratio: f64,

    pub mtd: f64,
    pub three_month: f64,
    pub six_month: f64,
    pub ytd: f64,
    pub one_year: f64,
    pub three_year: f64,
    pub five_year: f64,
    pub ten_year: f64,
    pub all_time: f64,

    pub best_day: f64,
    pub worst_day: f64,
    pub best_month: f64,
    pub worst_month: f64,
    pub best_year: f64,
    pub worst_year: f64,

    pub avg_drawdown: f64,
    pub avg_drawdown_days: f64,
    pub recovery_factor: f64,
    pub ulcer_index: f64,
    pub ulcer_performance_index: f64,
    pub serenity_index: f64,

    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_up_month: f64,
    pub avg_down_month: f64,
    pub win_days: f64,
    pub win_month: f64,
    pub win_quarter: f64,
    pub win_year: f64,

    pub benchmark: Option<BenchmarkMetrics>,
}

/// Computes the full metric set for an already sanitised series.
pub fn compute_performance_metrics(
    series: SeriesView<'_>,
    benchmark: Option<&[f64]>,
    options: &MetricsOptions,
) -> PerformanceMetrics {
    debug!(
        len = series.len(),
        dated = series.dates.is_some(),
        benchmark = benchmark.is_some(),
        "computing performance metrics"
    );

    let r = series.values;
    let rf = options.rf;
    let periods = options.periods_per_year;
    let compounded = options.compounded;

    let periods_list = drawdown_details(series);
    let deepest = periods_list
        .iter()
        .min_by(|a, b| a.depth.total_cmp(&b.depth));
    let (avg_dd, avg_dd_days, longest) = if periods_list.is_empty() {
        (0.0, 0.0, 0)
    } else {
        let n = periods_list.len() as f64;
        (
            periods_list.iter().map(|p| p.depth).sum::<f64>() / n,
            periods_list.iter().map(|p| p.days as f64).sum::<f64>() / n,
            periods_list.iter().map(|p| p.days).max().unwrap_or(0),
        )
    };

    PerformanceMetrics {
        rf,
        exposure: exposure(r),

        total_return: total_return(r),
        cagr: cagr(series),

        sharpe: sharpe(r, rf, periods, true),
        probabilistic_sharpe: probabilistic_sharpe_ratio(r, rf, periods),
        smart_sharpe: smart_sharpe(r, rf, periods),
        sortino: sortino(r, rf, periods, true),
        smart_sortino: smart_sortino(r, rf, periods),
        sortino_sqrt2: sortino_sqrt2(r, rf, periods),
        smart_sortino_sqrt2: smart_sortino_sqrt2(r, rf, periods),
        omega: omega(r, options.omega_threshold, periods),

        max_drawdown: max_drawdown(r),
        max_drawdown_start: deepest.and_then(|p| p.start_date),
        max_drawdown_valley: deepest.and_then(|p| p.valley_date),
        max_drawdown_end: deepest.and_then(|p| p.end_date),
        longest_dd_days: longest,
        volatility: volatility(r, periods),
        calmar: calmar(series),
        skew: distribution::skew(r),
        kurtosis: distribution::kurtosis(r),

        expected_daily: expected_return(series, None, compounded),
        expected_monthly: expected_monthly(series, compounded),
        expected_yearly: expected_yearly(series, compounded),
        kelly_criterion: kelly_criterion(r),
        risk_of_ruin: risk_of_ruin(r),
        value_at_risk: value_at_risk(r, options.var_sigma, options.var_confidence),
        expected_shortfall: expected_shortfall(r, options.var_sigma, options.var_confidence),

        consecutive_wins: consecutive_wins(r),
        consecutive_losses: consecutive_losses(r),
        gain_to_pain: gain_to_pain(r),
        gain_to_pain_monthly: gain_to_pain_monthly(series),
        payoff_ratio: payoff_ratio(r),
        profit_factor: profit_factor(r),
        common_sense_ratio: common_sense_ratio(r),
        cpc_index: cpc_index(r),
        tail_ratio: tail_ratio(r, options.tail_cutoff),
        outlier_win_ratio: outlier_win_ratio(r),
        outlier_loss_ratio: outlier_loss_ratio(r),

        mtd: window_return(series, Window::Mtd),
        three_month: window_return(series, Window::ThreeMonths),
        six_month: window_return(series, Window::SixMonths),
        ytd: window_return(series, Window::Ytd),
        one_year: window_return(series, Window::OneYear),
        three_year: window_return(series, Window::ThreeYears),
        five_year: window_return(series, Window::FiveYears),
        ten_year: window_return(series, Window::TenYears),
        all_time: window_return(series, Window::AllTime),

        best_day: best(r),
        worst_day: worst(r),
        best_month: best_period(series, Frequency::Monthly),
        worst_month: worst_period(series, Frequency::Monthly),
        best_year: best_period(series, Frequency::Yearly),
        worst_year: worst_period(series, Frequency::Yearly),

        avg_drawdown: avg_dd,
        avg_drawdown_days: avg_dd_days,
        recovery_factor: recovery_factor(r, rf),
        ulcer_index: ulcer_index(r),
        ulcer_performance_index: ulcer_performance_index(series),
        serenity_index: serenity_index(r, rf),

        avg_win: avg_win(r),
        avg_loss: avg_loss(r),
        avg_up_month: avg_up_month(series),
        avg_down_month: avg_down_month(series),
        win_days: win_rate(r),
        win_month: win_month(series),
        win_quarter: win_quarter(series),
        win_year: win_year(series),

        benchmark: benchmark.map(|b| BenchmarkMetrics::compute(r, b, rf)),
    }
}
