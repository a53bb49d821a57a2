//! Static SVG charts for the tearsheet.
//!
//! Each chart is a self-contained `<svg>` with a fixed viewBox, wrapped in
//! a `qs-plot` div. Data shaping goes through the calendar, drawdown,
//! distribution and stats modules; this file only lays out geometry.
//! Charts with nothing to draw render as an empty string.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::calendar::{self, Frequency};
use crate::distribution::{self, quantile, std_dev};
use crate::drawdown::{equity_curve, to_drawdown_series, top_drawdowns};
use crate::stats;
use crate::utils::{ReturnSeries, compsum};

// Aspect ratio and base size close to the matplotlib figures (~576x288).
const WIDTH: i32 = 576;
const HEIGHT: i32 = 288;
const PADDING: f64 = 36.0;
const STRATEGY_COLOR: &str = "#348dc1";
const BENCHMARK_COLOR: &str = "#ff9933";
const ACCENT_COLOR: &str = "#8c8c8c";
const POSITIVE_COLOR: &str = "#4fa487";
const NEGATIVE_COLOR: &str = "#af4b64";
const Y_TICKS: usize = 4;
const HISTOGRAM_BINS: usize = 20;
const WORST_PERIODS: usize = 5;

struct Line {
    label: Option<String>,
    color: &'static str,
    stroke_width: f64,
    dash: bool,
    values: Vec<f64>,
}

impl Line {
    fn new(values: Vec<f64>, color: &'static str) -> Self {
        Self {
            label: None,
            color,
            stroke_width: 1.5,
            dash: false,
            values,
        }
    }

    fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn bold(mut self) -> Self {
        self.stroke_width = 1.8;
        self
    }

    fn dashed(mut self) -> Self {
        self.dash = true;
        self.stroke_width = 1.2;
        self
    }
}

struct Guide {
    value: f64,
    label: &'static str,
}

struct LegendEntry {
    label: String,
    color: &'static str,
    dash: bool,
}

struct BarGroup {
    label: Option<String>,
    color: &'static str,
    values: Vec<Option<f64>>,
}

#[derive(Clone, Copy, Default)]
enum Ticks {
    #[default]
    Percent,
    /// Values are `ln(equity)`; labels show the matching return.
    LogGrowth,
    Number,
    Count,
}

impl Ticks {
    fn label(self, value: f64) -> String {
        match self {
            Ticks::Percent => format_percentage(value),
            Ticks::LogGrowth => format_percentage(value.exp() - 1.0),
            Ticks::Number => format!("{value:.2}"),
            Ticks::Count => format!("{value:.0}"),
        }
    }
}

#[derive(Default)]
struct LineOptions {
    ticks: Ticks,
    include_zero: bool,
    zero_line: bool,
    legend: bool,
    /// Index ranges highlighted behind the lines.
    shaded: Vec<(usize, usize)>,
}

struct Scale {
    min: f64,
    max: f64,
    top: f64,
    bottom: f64,
}

impl Scale {
    /// Fits the finite values between `top` and `bottom` pixels. A flat
    /// range is widened so it still has height.
    fn fit(
        values: impl Iterator<Item = f64>,
        include_zero: bool,
        top: f64,
        bottom: f64,
    ) -> Option<Self> {
        let (mut min, mut max) = values
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !min.is_finite() || !max.is_finite() {
            return None;
        }
        if include_zero {
            min = min.min(0.0);
            max = max.max(0.0);
        }
        if min == max {
            let adjust = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
            min -= adjust;
            max += adjust;
        }
        Some(Self {
            min,
            max,
            top,
            bottom,
        })
    }

    fn y(&self, value: f64) -> f64 {
        let norm = (value - self.min) / (self.max - self.min);
        self.top + (1.0 - norm) * (self.bottom - self.top)
    }

    fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

fn series_label(series: &ReturnSeries, fallback: &str) -> String {
    series.name.clone().unwrap_or_else(|| fallback.to_string())
}

fn format_percentage(value: f64) -> String {
    let pct = value * 100.0;
    if pct.abs() >= 1000.0 {
        format!("{:.0}K%", pct / 1000.0)
    } else if pct.abs() >= 10.0 {
        format!("{pct:.0}%")
    } else {
        format!("{pct:.1}%")
    }
}

fn finite_mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    (!finite.is_empty()).then(|| distribution::mean(&finite))
}

fn svg_header(width: i32, height: i32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}"><style>text{{font-family:Arial,sans-serif;font-size:10px;fill:#666}}</style>"#
    )
}

fn svg_footer() -> &'static str {
    "</svg>"
}

fn wrap_plot(title: &str, svg_body: String) -> String {
    format!(
        r#"<div class="qs-plot"><div class="qs-plot-title">{title}</div>{svg_body}</div>"#
    )
}

fn hline(svg: &mut String, x1: f64, x2: f64, y: f64, color: &str, dash: bool) {
    let dash = if dash { "4 3" } else { "0" };
    svg.push_str(&format!(
        r#"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="1" stroke-dasharray="{dash}" />"#
    ));
}

fn push_y_ticks(svg: &mut String, scale: &Scale, ticks: Ticks, left: f64, right: f64) {
    for i in 0..=Y_TICKS {
        let value = scale.min + (scale.max - scale.min) * i as f64 / Y_TICKS as f64;
        let y = scale.y(value);
        hline(svg, left, right, y, "#eeeeee", false);
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end" dy="3">{label}</text>"#,
            x = left - 6.0,
            label = ticks.label(value)
        ));
    }
}

fn x_positions(len: usize, width: f64) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![width / 2.0],
        _ => {
            let inner_width = width - 2.0 * PADDING;
            (0..len)
                .map(|i| PADDING + inner_width * i as f64 / (len - 1) as f64)
                .collect()
        }
    }
}

/// Labels months, or years once the range spans more than two of them.
fn add_time_axis(svg: &mut String, dates: &[NaiveDate], xs: &[f64], axis_y: f64) {
    let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
        return;
    };
    let width = WIDTH as f64;
    hline(svg, PADDING, width - PADDING, axis_y, "#000", false);

    let yearly = (*last - *first).num_days() > 730;
    let mut last_key: Option<(i32, u32)> = None;
    for (date, x) in dates.iter().zip(xs) {
        let key = if yearly {
            (date.year(), 0)
        } else {
            (date.year(), date.month())
        };
        if last_key == Some(key) {
            continue;
        }
        last_key = Some(key);

        let label = if yearly {
            date.format("%Y").to_string()
        } else {
            date.format("%Y-%m").to_string()
        };
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#dddddd" stroke-width="0.5" />"##,
            y1 = PADDING,
            y2 = axis_y
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            y = axis_y + 14.0
        ));
    }
}

fn draw_legend(svg: &mut String, entries: &[LegendEntry]) {
    let x = PADDING + 10.0;
    let mut y = PADDING + 14.0;
    for entry in entries {
        let dash = if entry.dash { "4 3" } else { "0" };
        svg.push_str(&format!(
            r#"<line x1="{x:.2}" y1="{ly:.2}" x2="{x2:.2}" y2="{ly:.2}" stroke="{color}" stroke-width="1.5" stroke-dasharray="{dash}" />"#,
            ly = y - 4.0,
            x2 = x + 20.0,
            color = entry.color
        ));
        svg.push_str(&format!(
            r##"<text x="{tx:.2}" y="{y:.2}" text-anchor="start" fill="#333">{label}</text>"##,
            tx = x + 26.0,
            label = entry.label
        ));
        y += 16.0;
    }
}

/// Emits one polyline per run of finite values so gaps stay visible.
fn push_polyline(svg: &mut String, xs: &[f64], line: &Line, scale: &Scale) {
    let dash = if line.dash { "4 3" } else { "0" };
    let flush = |svg: &mut String, run: &mut Vec<String>| {
        if run.len() > 1 {
            svg.push_str(&format!(
                r#"<polyline fill="none" stroke="{color}" stroke-width="{width}" stroke-dasharray="{dash}" points="{points}" />"#,
                color = line.color,
                width = line.stroke_width,
                points = run.join(" ")
            ));
        }
        run.clear();
    };

    let mut run = Vec::new();
    for (x, value) in xs.iter().zip(&line.values) {
        if value.is_finite() {
            run.push(format!("{x:.2},{:.2}", scale.y(*value)));
        } else {
            flush(svg, &mut run);
        }
    }
    flush(svg, &mut run);
}

fn render_line_chart(
    dates: &[NaiveDate],
    lines: &[Line],
    guides: &[Guide],
    title: &str,
    options: &LineOptions,
) -> String {
    if dates.is_empty() || lines.is_empty() {
        return String::new();
    }

    let width = WIDTH as f64;
    let height = HEIGHT as f64;
    let values = lines
        .iter()
        .flat_map(|l| l.values.iter().take(dates.len()).copied())
        .chain(guides.iter().map(|g| g.value));
    let Some(scale) = Scale::fit(values, options.include_zero, PADDING, height - PADDING) else {
        return String::new();
    };
    let xs = x_positions(dates.len(), width);

    let mut svg = svg_header(WIDTH, HEIGHT);
    push_y_ticks(&mut svg, &scale, options.ticks, PADDING, width - PADDING);

    for &(start, end) in &options.shaded {
        if let (Some(x1), Some(x2)) = (xs.get(start), xs.get(end)) {
            svg.push_str(&format!(
                r##"<rect x="{x1:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{NEGATIVE_COLOR}" fill-opacity="0.12" />"##,
                y = PADDING,
                w = (x2 - x1).max(1.0),
                h = height - 2.0 * PADDING
            ));
        }
    }

    if options.zero_line && scale.contains(0.0) {
        hline(&mut svg, PADDING, width - PADDING, scale.y(0.0), "#bbbbbb", true);
    }

    for guide in guides {
        let y = scale.y(guide.value);
        hline(&mut svg, PADDING, width - PADDING, y, ACCENT_COLOR, true);
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{ty:.2}" text-anchor="end" fill="{ACCENT_COLOR}" font-size="9">{label}</text>"#,
            x = width - PADDING,
            ty = y - 4.0,
            label = guide.label
        ));
    }

    for line in lines {
        push_polyline(&mut svg, &xs, line, &scale);
    }

    add_time_axis(&mut svg, dates, &xs, height - PADDING + 5.0);

    if options.legend {
        let entries: Vec<LegendEntry> = lines
            .iter()
            .filter_map(|l| {
                l.label.as_ref().map(|label| LegendEntry {
                    label: label.clone(),
                    color: l.color,
                    dash: l.dash,
                })
            })
            .collect();
        draw_legend(&mut svg, &entries);
    }

    svg.push_str(svg_footer());
    wrap_plot(title, svg)
}

fn render_bar_chart(
    categories: &[String],
    groups: &[BarGroup],
    title: &str,
    ticks: Ticks,
    color_by_sign: bool,
) -> String {
    if categories.is_empty() || groups.is_empty() {
        return String::new();
    }

    let width = WIDTH as f64;
    let height = HEIGHT as f64;
    let (left_pad, right_pad, top_pad, bottom_pad) = (50.0, 20.0, 30.0, 40.0);

    let values = groups
        .iter()
        .flat_map(|g| g.values.iter().flatten().copied());
    let Some(scale) = Scale::fit(values, true, top_pad, height - bottom_pad) else {
        return String::new();
    };

    let mut svg = svg_header(WIDTH, HEIGHT);
    push_y_ticks(&mut svg, &scale, ticks, left_pad, width - right_pad);

    let zero_y = scale.y(0.0);
    let slot = (width - left_pad - right_pad) / categories.len() as f64;
    let bar_width = slot * 0.8 / groups.len() as f64;
    let label_every = (categories.len() / 12).max(1);

    for (i, category) in categories.iter().enumerate() {
        let slot_left = left_pad + i as f64 * slot;
        for (g, group) in groups.iter().enumerate() {
            let Some(Some(value)) = group.values.get(i) else {
                continue;
            };
            if !value.is_finite() {
                continue;
            }
            let y = scale.y(*value);
            let fill = match (color_by_sign, *value >= 0.0) {
                (true, true) => POSITIVE_COLOR,
                (true, false) => NEGATIVE_COLOR,
                (false, _) => group.color,
            };
            svg.push_str(&format!(
                r#"<rect x="{x:.2}" y="{top:.2}" width="{bar_width:.2}" height="{h:.2}" fill="{fill}" />"#,
                x = slot_left + slot * 0.1 + g as f64 * bar_width,
                top = y.min(zero_y),
                h = (y - zero_y).abs()
            ));
        }
        if i % label_every == 0 {
            svg.push_str(&format!(
                r##"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" fill="#808080">{category}</text>"##,
                x = slot_left + slot / 2.0,
                y = height - bottom_pad + 14.0
            ));
        }
    }

    hline(&mut svg, left_pad, width - right_pad, zero_y, "#000", false);

    if groups.len() > 1 {
        let entries: Vec<LegendEntry> = groups
            .iter()
            .filter_map(|g| {
                g.label.as_ref().map(|label| LegendEntry {
                    label: label.clone(),
                    color: g.color,
                    dash: false,
                })
            })
            .collect();
        draw_legend(&mut svg, &entries);
    }

    svg.push_str(svg_footer());
    wrap_plot(title, svg)
}

fn equity_chart(
    strategy: &ReturnSeries,
    benchmark: Option<&ReturnSeries>,
    title: &str,
    log_scale: bool,
) -> String {
    let curve = |values: &[f64]| -> Vec<f64> {
        if log_scale {
            equity_curve(values).into_iter().map(f64::ln).collect()
        } else {
            compsum(values)
        }
    };

    let mut lines = Vec::new();
    if let Some(bench) = benchmark {
        lines.push(
            Line::new(curve(&bench.values), BENCHMARK_COLOR)
                .labelled(series_label(bench, "Benchmark")),
        );
    }
    lines.push(
        Line::new(curve(&strategy.values), STRATEGY_COLOR)
            .labelled(series_label(strategy, "Strategy"))
            .bold(),
    );

    let options = LineOptions {
        ticks: if log_scale {
            Ticks::LogGrowth
        } else {
            Ticks::Percent
        },
        include_zero: true,
        zero_line: true,
        legend: benchmark.is_some(),
        ..Default::default()
    };
    render_line_chart(&strategy.dates, &lines, &[], title, &options)
}

pub fn cumulative_returns(strategy: &ReturnSeries, benchmark: Option<&ReturnSeries>) -> String {
    let title = if benchmark.is_some() {
        "Cumulative Returns vs Benchmark"
    } else {
        "Cumulative Returns"
    };
    equity_chart(strategy, benchmark, title, false)
}

pub fn log_returns(strategy: &ReturnSeries, benchmark: Option<&ReturnSeries>) -> String {
    let title = if benchmark.is_some() {
        "Cumulative Returns vs Benchmark (Log Scaled)"
    } else {
        "Cumulative Returns (Log Scaled)"
    };
    equity_chart(strategy, benchmark, title, true)
}

/// Cumulative returns with the strategy rescaled to the benchmark's
/// volatility over their common length.
pub fn vol_matched_returns(strategy: &ReturnSeries, benchmark: &ReturnSeries) -> String {
    let n = strategy.len().min(benchmark.len());
    let s_std = std_dev(&strategy.values[..n]);
    let b_std = std_dev(&benchmark.values[..n]);

    let scaled = if s_std > 0.0 && b_std > 0.0 {
        let k = b_std / s_std;
        ReturnSeries {
            values: strategy.values.iter().map(|r| r * k).collect(),
            ..strategy.clone()
        }
    } else {
        strategy.clone()
    };
    equity_chart(
        &scaled,
        Some(benchmark),
        "Cumulative Returns vs Benchmark (Volatility Matched)",
        false,
    )
}

pub fn eoy_returns(strategy: &ReturnSeries, benchmark: Option<&ReturnSeries>) -> String {
    let strat_years = calendar::yearly_table(&strategy.values, &strategy.dates);
    let bench_years = benchmark.map(|b| calendar::yearly_table(&b.values, &b.dates));

    let mut years: BTreeSet<i32> = strat_years.keys().copied().collect();
    if let Some(b) = &bench_years {
        years.extend(b.keys().copied());
    }
    let categories: Vec<String> = years.iter().map(|y| y.to_string()).collect();

    let mut groups = Vec::new();
    if let (Some(bench), Some(table)) = (benchmark, &bench_years) {
        groups.push(BarGroup {
            label: Some(series_label(bench, "Benchmark")),
            color: BENCHMARK_COLOR,
            values: years.iter().map(|y| table.get(y).copied()).collect(),
        });
    }
    groups.push(BarGroup {
        label: Some(series_label(strategy, "Strategy")),
        color: STRATEGY_COLOR,
        values: years.iter().map(|y| strat_years.get(y).copied()).collect(),
    });

    let title = if benchmark.is_some() {
        "EOY Returns vs Benchmark"
    } else {
        "EOY Returns"
    };
    render_bar_chart(&categories, &groups, title, Ticks::Percent, false)
}

pub fn monthly_distribution(strategy: &ReturnSeries) -> String {
    let monthly = calendar::resample_monthly(strategy.view(), true);
    let bins = distribution::histogram(&monthly, HISTOGRAM_BINS);
    if bins.is_empty() {
        return String::new();
    }

    let categories: Vec<String> = bins
        .iter()
        .map(|b| format_percentage((b.lower + b.upper) / 2.0))
        .collect();
    let groups = [BarGroup {
        label: None,
        color: STRATEGY_COLOR,
        values: bins.iter().map(|b| Some(b.count as f64)).collect(),
    }];
    render_bar_chart(
        &categories,
        &groups,
        "Distribution of Monthly Returns",
        Ticks::Count,
        false,
    )
}

pub fn daily_returns(strategy: &ReturnSeries) -> String {
    let lines = [Line::new(strategy.values.clone(), STRATEGY_COLOR)];
    let options = LineOptions {
        include_zero: true,
        zero_line: true,
        ..Default::default()
    };
    render_line_chart(&strategy.dates, &lines, &[], "Daily Returns", &options)
}

fn half_year_window(periods_per_year: u32) -> usize {
    periods_per_year.div_ceil(2) as usize
}

pub fn rolling_beta(
    strategy: &ReturnSeries,
    benchmark: &ReturnSeries,
    periods_per_year: u32,
) -> String {
    let short = stats::rolling_beta(
        &strategy.values,
        &benchmark.values,
        half_year_window(periods_per_year),
    );
    let long = stats::rolling_beta(
        &strategy.values,
        &benchmark.values,
        periods_per_year as usize,
    );

    let guides: Vec<Guide> = finite_mean(&short)
        .map(|value| Guide {
            value,
            label: "Mean",
        })
        .into_iter()
        .collect();
    let lines = [
        Line::new(short, STRATEGY_COLOR).labelled("6-Months").bold(),
        Line::new(long, ACCENT_COLOR).labelled("12-Months").dashed(),
    ];
    let options = LineOptions {
        ticks: Ticks::Number,
        include_zero: true,
        zero_line: true,
        legend: true,
        ..Default::default()
    };
    render_line_chart(
        &strategy.dates,
        &lines,
        &guides,
        "Rolling Beta to Benchmark",
        &options,
    )
}

pub fn rolling_volatility(
    strategy: &ReturnSeries,
    benchmark: Option<&ReturnSeries>,
    periods_per_year: u32,
) -> String {
    let window = half_year_window(periods_per_year);
    let strat = stats::rolling_volatility(&strategy.values, window, periods_per_year);
    let guides: Vec<Guide> = finite_mean(&strat)
        .map(|value| Guide {
            value,
            label: "Mean",
        })
        .into_iter()
        .collect();

    let mut lines = vec![
        Line::new(strat, STRATEGY_COLOR)
            .labelled(series_label(strategy, "Strategy"))
            .bold(),
    ];
    if let Some(bench) = benchmark {
        lines.push(
            Line::new(
                stats::rolling_volatility(&bench.values, window, periods_per_year),
                BENCHMARK_COLOR,
            )
            .labelled(series_label(bench, "Benchmark"))
            .dashed(),
        );
    }

    let options = LineOptions {
        legend: benchmark.is_some(),
        ..Default::default()
    };
    render_line_chart(
        &strategy.dates,
        &lines,
        &guides,
        "Rolling Volatility (6-Months)",
        &options,
    )
}

fn rolling_ratio_chart(strategy: &ReturnSeries, values: Vec<f64>, title: &str) -> String {
    let guides: Vec<Guide> = finite_mean(&values)
        .map(|value| Guide {
            value,
            label: "Mean",
        })
        .into_iter()
        .collect();
    let lines = [Line::new(values, STRATEGY_COLOR).bold()];
    let options = LineOptions {
        ticks: Ticks::Number,
        include_zero: true,
        zero_line: true,
        ..Default::default()
    };
    render_line_chart(&strategy.dates, &lines, &guides, title, &options)
}

pub fn rolling_sharpe(strategy: &ReturnSeries, rf: f64, periods_per_year: u32) -> String {
    let values = stats::rolling_sharpe(
        &strategy.values,
        rf,
        half_year_window(periods_per_year),
        periods_per_year,
    );
    rolling_ratio_chart(strategy, values, "Rolling Sharpe (6-Months)")
}

pub fn rolling_sortino(strategy: &ReturnSeries, rf: f64, periods_per_year: u32) -> String {
    let values = stats::rolling_sortino(
        &strategy.values,
        rf,
        half_year_window(periods_per_year),
        periods_per_year,
    );
    rolling_ratio_chart(strategy, values, "Rolling Sortino (6-Months)")
}

/// Cumulative returns with the five deepest drawdown periods shaded.
pub fn drawdown_periods(strategy: &ReturnSeries) -> String {
    let worst = top_drawdowns(strategy.view(), WORST_PERIODS);
    if worst.is_empty() {
        return String::new();
    }

    let lines = [Line::new(compsum(&strategy.values), STRATEGY_COLOR).bold()];
    let options = LineOptions {
        include_zero: true,
        zero_line: true,
        shaded: worst.iter().map(|p| (p.start, p.end)).collect(),
        ..Default::default()
    };
    let title = format!(
        "{} - Worst {WORST_PERIODS} Drawdown Periods",
        series_label(strategy, "Strategy")
    );
    render_line_chart(&strategy.dates, &lines, &[], &title, &options)
}

pub fn underwater(strategy: &ReturnSeries) -> String {
    let drawdowns = to_drawdown_series(&strategy.values);
    let guides: Vec<Guide> = finite_mean(&drawdowns)
        .filter(|mean| *mean < 0.0)
        .map(|value| Guide {
            value,
            label: "Average",
        })
        .into_iter()
        .collect();
    let lines = [Line::new(drawdowns, STRATEGY_COLOR)];
    let options = LineOptions {
        include_zero: true,
        ..Default::default()
    };
    render_line_chart(
        &strategy.dates,
        &lines,
        &guides,
        "Underwater Plot",
        &options,
    )
}

pub fn monthly_heatmap(strategy: &ReturnSeries) -> String {
    let table = calendar::monthly_table(&strategy.values, &strategy.dates);
    if table.is_empty() {
        return String::new();
    }

    const MONTHS: [&str; 12] = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];

    let width = WIDTH as f64;
    let height = HEIGHT as f64;
    let (left_pad, right_pad, top_pad, bottom_pad) = (55.0, 20.0, 20.0, 30.0);
    let cell_w = (width - left_pad - right_pad) / 12.0;
    let cell_h = (height - top_pad - bottom_pad) / table.len() as f64;

    let max_abs = table
        .values()
        .flatten()
        .flatten()
        .map(|v| v.abs())
        .fold(0.0_f64, f64::max);
    let max_abs = if max_abs > 0.0 { max_abs } else { 1.0 };

    let mut svg = svg_header(WIDTH, HEIGHT);

    for (i, label) in MONTHS.iter().enumerate() {
        svg.push_str(&format!(
            r##"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" fill="#808080">{label}</text>"##,
            x = left_pad + (i as f64 + 0.5) * cell_w,
            y = height - bottom_pad + 14.0
        ));
    }

    for (row, (year, months)) in table.iter().enumerate() {
        let y_top = top_pad + row as f64 * cell_h;
        let y_center = y_top + cell_h / 2.0;
        svg.push_str(&format!(
            r##"<text x="{x:.2}" y="{y:.2}" text-anchor="end" fill="#808080">{year}</text>"##,
            x = left_pad - 5.0,
            y = y_center + 3.0
        ));

        for (col, cell) in months.iter().enumerate() {
            let x_left = left_pad + col as f64 * cell_w;
            let Some(value) = cell else {
                svg.push_str(&format!(
                    r##"<rect x="{x_left:.2}" y="{y_top:.2}" width="{cell_w:.2}" height="{cell_h:.2}" fill="#f5f5f5" />"##
                ));
                continue;
            };

            // Blend from white towards green or red, keeping a floor of intensity.
            let t = 0.2 + 0.8 * (value.abs() / max_abs).min(1.0);
            let (br, bg, bb) = if *value >= 0.0 {
                (79.0, 164.0, 135.0)
            } else {
                (175.0, 75.0, 100.0)
            };
            let blend = |base: f64| 255.0 * (1.0 - t) + base * t;
            svg.push_str(&format!(
                r#"<rect x="{x_left:.2}" y="{y_top:.2}" width="{cell_w:.2}" height="{cell_h:.2}" fill="rgb({r:.0},{g:.0},{b:.0})" />"#,
                r = blend(br),
                g = blend(bg),
                b = blend(bb)
            ));
            let text_color = if t > 0.6 { "#ffffff" } else { "#262626" };
            svg.push_str(&format!(
                r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" font-size="9" fill="{text_color}">{pct:.1}</text>"#,
                x = x_left + cell_w / 2.0,
                y = y_center + 4.0,
                pct = value * 100.0
            ));
        }
    }

    svg.push_str(svg_footer());
    let title = format!(
        "{} - Monthly Returns (%)",
        series_label(strategy, "Strategy")
    );
    wrap_plot(&title, svg)
}

struct BoxStats {
    min: f64,
    q1: f64,
    median: f64,
    q3: f64,
    max: f64,
}

impl BoxStats {
    fn of(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }
        Some(Self {
            min: stats::worst(values),
            q1: quantile(values, 0.25),
            median: quantile(values, 0.5),
            q3: quantile(values, 0.75),
            max: stats::best(values),
        })
    }
}

/// Box plot of returns at daily, weekly, monthly, quarterly and yearly
/// resolution.
pub fn returns_distribution(strategy: &ReturnSeries) -> String {
    let view = strategy.view();
    let buckets = [
        ("Daily", POSITIVE_COLOR, strategy.values.clone()),
        ("Weekly", STRATEGY_COLOR, calendar::resample(view, Frequency::Weekly, true)),
        ("Monthly", BENCHMARK_COLOR, calendar::resample_monthly(view, true)),
        ("Quarterly", NEGATIVE_COLOR, calendar::resample_quarterly(view, true)),
        ("Yearly", "#9b59b6", calendar::resample_yearly(view, true)),
    ];
    let boxes: Vec<(&str, &str, BoxStats)> = buckets
        .iter()
        .filter_map(|(label, color, values)| BoxStats::of(values).map(|b| (*label, *color, b)))
        .collect();
    if boxes.is_empty() {
        return String::new();
    }

    let width = WIDTH as f64;
    let height = HEIGHT as f64;
    let (left_pad, right_pad, top_pad, bottom_pad) = (60.0, 40.0, 30.0, 40.0);
    let extremes = boxes.iter().flat_map(|(_, _, b)| [b.min, b.max]);
    let Some(scale) = Scale::fit(extremes, false, top_pad, height - bottom_pad) else {
        return String::new();
    };

    let mut svg = svg_header(WIDTH, HEIGHT);
    push_y_ticks(&mut svg, &scale, Ticks::Percent, left_pad, width - right_pad);
    if scale.contains(0.0) {
        hline(&mut svg, left_pad, width - right_pad, scale.y(0.0), "#bbbbbb", true);
    }

    let band = (width - left_pad - right_pad) / boxes.len() as f64;
    for (idx, (label, color, b)) in boxes.iter().enumerate() {
        let cx = left_pad + (idx as f64 + 0.5) * band;
        let (y_min, y_max) = (scale.y(b.min), scale.y(b.max));
        let (y_q1, y_q3) = (scale.y(b.q1), scale.y(b.q3));

        svg.push_str(&format!(
            r#"<line x1="{cx:.2}" y1="{y_max:.2}" x2="{cx:.2}" y2="{y_min:.2}" stroke="{color}" stroke-width="1" />"#
        ));
        for y in [y_min, y_max] {
            svg.push_str(&format!(
                r#"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="1" />"#,
                x1 = cx - band * 0.15,
                x2 = cx + band * 0.15
            ));
        }
        svg.push_str(&format!(
            r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{color}" fill-opacity="0.25" stroke="{color}" stroke-width="1" />"#,
            x = cx - band * 0.2,
            y = y_q3.min(y_q1),
            w = band * 0.4,
            h = (y_q1 - y_q3).abs().max(1.0)
        ));
        svg.push_str(&format!(
            r#"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="2" />"#,
            x1 = cx - band * 0.2,
            x2 = cx + band * 0.2,
            y = scale.y(b.median)
        ));
        svg.push_str(&format!(
            r##"<text x="{cx:.2}" y="{y:.2}" text-anchor="middle" fill="#444">{label}</text>"##,
            y = height - bottom_pad + 16.0
        ));
    }

    svg.push_str(svg_footer());
    wrap_plot("Return Quantiles", svg)
}
