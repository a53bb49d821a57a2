//! Sample moments, empirical quantiles and the normal distribution.
//!
//! Variance and standard deviation use the `n - 1` denominator. Skew and
//! kurtosis standardise with the moment (population) deviation and then
//! apply the adjusted Fisher-Pearson corrections, which is what pandas'
//! `Series.skew()` and `Series.kurt()` compute.

use tracing::debug;

use crate::utils::DataError;

const PPF_MIN: f64 = 0.001;
const PPF_MAX: f64 = 0.999;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Every element equal to the first. Rounding in the mean would otherwise
/// leave a constant series with a tiny non-zero variance.
fn is_flat(values: &[f64]) -> bool {
    values.iter().all(|x| *x == values[0])
}

/// Sample variance; 0 for fewer than two observations or a constant series.
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 || is_flat(values) {
        return 0.0;
    }
    let m = mean(values);
    values
        .iter()
        .map(|x| {
            let d = x - m;
            d * d
        })
        .sum::<f64>()
        / (n as f64 - 1.0)
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Sample covariance over the common prefix of `a` and `b`.
pub fn covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (ma, mb) = (mean(a), mean(b));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (n as f64 - 1.0)
}

/// Pearson correlation; 0 when either side has no variance.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let sa = std_dev(&a[..n]);
    let sb = std_dev(&b[..n]);
    if sa == 0.0 || sb == 0.0 {
        return 0.0;
    }
    covariance(a, b) / (sa * sb)
}

/// Central moments `(m2, m3, m4)` with the `1 / n` denominator.
fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let m = mean(values);
    let (mut m2, mut m3, mut m4) = (0.0_f64, 0.0_f64, 0.0_f64);
    for x in values {
        let d = x - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Bias-corrected sample skewness; 0 for `n <= 2` or a flat series.
pub fn skew(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 2 || is_flat(values) {
        return 0.0;
    }
    let (m2, m3, _) = central_moments(values);
    if m2 == 0.0 {
        return 0.0;
    }
    let n = n as f64;
    let g1 = m3 / m2.powf(1.5);
    g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
}

/// Bias-corrected excess kurtosis; 0 for `n <= 3` or a flat series.
pub fn kurtosis(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 3 || is_flat(values) {
        return 0.0;
    }
    let (m2, _, m4) = central_moments(values);
    if m2 == 0.0 {
        return 0.0;
    }
    let n = n as f64;
    let standardised = m4 / (m2 * m2);
    (n - 1.0) * ((n + 1.0) * standardised - 3.0 * (n - 1.0)) / ((n - 2.0) * (n - 3.0))
}

/// Empirical quantile: the element at `floor(p * n)` of the ascending
/// sort, clamped to the last element. 0 for an empty slice.
pub fn quantile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = (p.clamp(0.0, 1.0) * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Standard normal CDF.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * libm::erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal inverse CDF with `p` clamped to `[0.001, 0.999]`.
pub fn norm_ppf(p: f64) -> f64 {
    let clamped = p.clamp(PPF_MIN, PPF_MAX);
    if clamped != p {
        debug!(p, clamped, "probability clamped for inverse normal");
    }
    inverse_normal(clamped)
}

/// Like [`norm_ppf`] but rejects probabilities outside `[0.001, 0.999]`.
pub fn try_norm_ppf(p: f64) -> Result<f64, DataError> {
    if !(PPF_MIN..=PPF_MAX).contains(&p) {
        return Err(DataError::ProbabilityOutOfRange { p });
    }
    Ok(inverse_normal(p))
}

/// Acklam's rational approximation refined by one Halley step.
fn inverse_normal(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 1.0 - P_LOW;

    let x = if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    let e = norm_cdf(x) - p;
    let u = e * (2.0 * std::f64::consts::PI).sqrt() * (x * x / 2.0).exp();
    x - u / (1.0 + x * u / 2.0)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over the finite values. The maximum lands in
/// the last bin. Empty or flat input yields no bins.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return Vec::new();
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in finite {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}
