//! Summary and difference statistics with t-based and percentile intervals

use rand::Rng;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{ModelError, ModelResult};

// === INTERVALS ===

/// Which uncertainty band to report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Interval {
    /// t-based interval for the mean
    Confidence,
    /// Percentile interval of individual observations
    Prediction,
}

/// Point estimate with its interval
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Estimate {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Estimate {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Significance level must lie strictly between 0 and 1
fn check_alpha(alpha: f64) -> ModelResult<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(ModelError::InvalidSetting(format!("alpha must be in (0, 1), got {}", alpha)));
    }
    Ok(())
}

/// Two-sided Student's t critical value at level `alpha`
pub fn t_critical(alpha: f64, df: f64) -> ModelResult<f64> {
    check_alpha(alpha)?;
    let t = StudentsT::new(0.0, 1.0, df).map_err(|e| ModelError::Distribution(e.to_string()))?;
    Ok(t.inverse_cdf(1.0 - alpha / 2.0))
}

fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample variance (n - 1 denominator)
fn variance(data: &[f64], mean: f64) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}

/// Linear-interpolated percentile, `q` in [0, 1], of already sorted data
fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn percentile_interval(mut data: Vec<f64>, alpha: f64) -> ModelResult<(f64, f64)> {
    check_alpha(alpha)?;
    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok((percentile_sorted(&data, alpha / 2.0), percentile_sorted(&data, 1.0 - alpha / 2.0)))
}

// === ONE SAMPLE ===

#[derive(Clone, Debug)]
pub struct SummaryStat {
    pub name: String,
    data: Vec<f64>,
    mean: f64,
    stdev: f64,
}

impl SummaryStat {
    pub fn new(name: &str, data: &[f64]) -> Self {
        let m = mean(data);
        let sd = variance(data, m).sqrt();
        SummaryStat { name: name.to_string(), data: data.to_vec(), mean: m, stdev: sd }
    }

    pub fn n(&self) -> usize {
        self.data.len()
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn stdev(&self) -> f64 {
        self.stdev
    }

    pub fn std_error(&self) -> f64 {
        self.stdev / (self.n() as f64).sqrt()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Student's t interval for the mean with n - 1 degrees of freedom
    pub fn t_ci(&self, alpha: f64) -> ModelResult<(f64, f64)> {
        self.require_sample()?;
        let half = t_critical(alpha, (self.n() - 1) as f64)? * self.std_error();
        Ok((self.mean - half, self.mean + half))
    }

    /// Interval holding the central `1 - alpha` share of observations
    pub fn percentile_interval(&self, alpha: f64) -> ModelResult<(f64, f64)> {
        self.require_sample()?;
        percentile_interval(self.data.clone(), alpha)
    }

    pub fn estimate(&self, interval: Interval, alpha: f64) -> ModelResult<Estimate> {
        let (lower, upper) = match interval {
            Interval::Confidence => self.t_ci(alpha)?,
            Interval::Prediction => self.percentile_interval(alpha)?,
        };
        Ok(Estimate { mean: self.mean, lower, upper })
    }

    fn require_sample(&self) -> ModelResult<()> {
        if self.n() < 2 {
            return Err(ModelError::InsufficientSample { name: self.name.clone(), n: self.n() });
        }
        Ok(())
    }
}

// === TWO SAMPLES ===

/// Difference `x - y_ref` between two independent samples
#[derive(Clone, Debug)]
pub struct DifferenceStatIndp {
    pub name: String,
    x: SummaryStat,
    y_ref: SummaryStat,
}

impl DifferenceStatIndp {
    pub fn new(name: &str, x: &[f64], y_ref: &[f64]) -> Self {
        DifferenceStatIndp {
            name: name.to_string(),
            x: SummaryStat::new(name, x),
            y_ref: SummaryStat::new(name, y_ref),
        }
    }

    pub fn mean(&self) -> f64 {
        self.x.mean() - self.y_ref.mean()
    }

    /// Welch interval: unequal variances, Welch–Satterthwaite degrees of freedom
    pub fn t_ci(&self, alpha: f64) -> ModelResult<(f64, f64)> {
        check_alpha(alpha)?;
        for s in [&self.x, &self.y_ref] {
            if s.n() < 2 {
                return Err(ModelError::InsufficientSample { name: self.name.clone(), n: s.n() });
            }
        }
        let vx = self.x.stdev().powi(2) / self.x.n() as f64;
        let vy = self.y_ref.stdev().powi(2) / self.y_ref.n() as f64;
        let se = (vx + vy).sqrt();
        let diff = self.mean();
        if se == 0.0 {
            return Ok((diff, diff));
        }
        let df = (vx + vy).powi(2)
            / (vx.powi(2) / (self.x.n() - 1) as f64 + vy.powi(2) / (self.y_ref.n() - 1) as f64);
        let half = t_critical(alpha, df)? * se;
        Ok((diff - half, diff + half))
    }

    /// Percentile interval of differences between randomly matched observations
    pub fn prediction_interval<R: Rng + ?Sized>(&self, alpha: f64, rng: &mut R) -> ModelResult<(f64, f64)> {
        let (x, y) = (self.x.data(), self.y_ref.data());
        if x.is_empty() || y.is_empty() || x.len().max(y.len()) < 2 {
            let n = x.len().min(y.len());
            return Err(ModelError::InsufficientSample { name: self.name.clone(), n });
        }
        let n = x.len().max(y.len());
        let diffs: Vec<f64> = (0..n)
            .map(|_| x[rng.gen_range(0..x.len())] - y[rng.gen_range(0..y.len())])
            .collect();
        percentile_interval(diffs, alpha)
    }
}

/// Difference `x - y_ref` over matched observations
#[derive(Clone, Debug)]
pub struct DifferenceStatPaired {
    diffs: SummaryStat,
}

impl DifferenceStatPaired {
    pub fn new(name: &str, x: &[f64], y_ref: &[f64]) -> ModelResult<Self> {
        if x.len() != y_ref.len() {
            return Err(ModelError::LengthMismatch { left: x.len(), right: y_ref.len() });
        }
        let diffs: Vec<f64> = x.iter().zip(y_ref).map(|(a, b)| a - b).collect();
        Ok(DifferenceStatPaired { diffs: SummaryStat::new(name, &diffs) })
    }

    pub fn mean(&self) -> f64 {
        self.diffs.mean()
    }

    pub fn t_ci(&self, alpha: f64) -> ModelResult<(f64, f64)> {
        self.diffs.t_ci(alpha)
    }

    pub fn prediction_interval(&self, alpha: f64) -> ModelResult<(f64, f64)> {
        self.diffs.percentile_interval(alpha)
    }
}

/// Difference estimate of `x - y_ref` with the requested pairing and interval
pub fn difference_estimate<R: Rng + ?Sized>(
    name: &str,
    x: &[f64],
    y_ref: &[f64],
    paired: bool,
    interval: Interval,
    alpha: f64,
    rng: &mut R,
) -> ModelResult<Estimate> {
    if paired {
        let d = DifferenceStatPaired::new(name, x, y_ref)?;
        let (lower, upper) = match interval {
            Interval::Confidence => d.t_ci(alpha)?,
            Interval::Prediction => d.prediction_interval(alpha)?,
        };
        Ok(Estimate { mean: d.mean(), lower, upper })
    } else {
        let d = DifferenceStatIndp::new(name, x, y_ref);
        let (lower, upper) = match interval {
            Interval::Confidence => d.t_ci(alpha)?,
            Interval::Prediction => d.prediction_interval(alpha, rng)?,
        };
        Ok(Estimate { mean: d.mean(), lower, upper })
    }
}
