//! Cost-effectiveness analysis: frontier, dominance, ICERs

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::cohort::CohortResult;
use crate::error::{ModelError, ModelResult};
use crate::stats::{difference_estimate, Estimate, Interval, SummaryStat};

// === STRATEGIES ===

/// Named view over one cohort's per-patient cost and effect observations
#[derive(Clone, Debug)]
pub struct Strategy<'a> {
    pub name: String,
    pub costs: &'a [f64],
    pub effects: &'a [f64],
    mean_cost: f64,
    mean_effect: f64,
}

impl<'a> Strategy<'a> {
    pub fn new(name: &str, costs: &'a [f64], effects: &'a [f64]) -> ModelResult<Self> {
        if costs.is_empty() || effects.is_empty() {
            return Err(ModelError::EmptyStrategy(name.to_string()));
        }
        if costs.len() != effects.len() {
            return Err(ModelError::LengthMismatch { left: costs.len(), right: effects.len() });
        }
        Ok(Strategy {
            name: name.to_string(),
            costs,
            effects,
            mean_cost: costs.iter().sum::<f64>() / costs.len() as f64,
            mean_effect: effects.iter().sum::<f64>() / effects.len() as f64,
        })
    }

    /// Discounted cost against discounted utility of a simulated cohort
    pub fn from_cohort(cohort: &'a CohortResult) -> ModelResult<Self> {
        Strategy::new(&cohort.name, &cohort.costs, &cohort.utilities)
    }

    pub fn mean_cost(&self) -> f64 {
        self.mean_cost
    }

    pub fn mean_effect(&self) -> f64 {
        self.mean_effect
    }

    /// No more costly, no less effective, and strictly better on at least one axis
    fn dominates(&self, other: &Strategy) -> bool {
        self.mean_cost <= other.mean_cost
            && self.mean_effect >= other.mean_effect
            && (self.mean_cost < other.mean_cost || self.mean_effect > other.mean_effect)
    }

    fn same_point(&self, other: &Strategy) -> bool {
        self.mean_cost == other.mean_cost && self.mean_effect == other.mean_effect
    }
}

// === FRONTIER ===

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Dominance {
    Dominated { by: String },
    ExtendedDominated,
}

#[derive(Clone, Debug)]
pub struct FrontierPoint<'a> {
    pub strategy: Strategy<'a>,
    /// ICER against the previous frontier member; `None` for the first
    pub icer: Option<f64>,
}

/// Strategies surviving dominance and extended dominance, sorted by effect
#[derive(Clone, Debug)]
pub struct Frontier<'a> {
    points: Vec<FrontierPoint<'a>>,
    excluded: Vec<(Strategy<'a>, Dominance)>,
}

impl<'a> Frontier<'a> {
    pub fn points(&self) -> &[FrontierPoint<'a>] {
        &self.points
    }

    pub fn strategies(&self) -> Vec<Strategy<'a>> {
        self.points.iter().map(|p| p.strategy.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.strategy.name.as_str()).collect()
    }

    /// Strategies pruned from the frontier, with the reason
    pub fn dominated(&self) -> &[(Strategy<'a>, Dominance)] {
        &self.excluded
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn icer_between(prev: &Strategy, next: &Strategy) -> f64 {
    (next.mean_cost - prev.mean_cost) / (next.mean_effect - prev.mean_effect)
}

/// Build the cost-effectiveness frontier.
///
/// Pure: the input slice is untouched and a fresh frontier is returned.
/// Of several strategies sitting on the same (cost, effect) point only the
/// first one listed is kept.
pub fn build_frontier<'a>(strategies: &[Strategy<'a>]) -> Frontier<'a> {
    let mut excluded = Vec::new();
    let mut survivors: Vec<Strategy<'a>> = Vec::new();

    for (i, s) in strategies.iter().enumerate() {
        let dominator = strategies
            .iter()
            .enumerate()
            .find(|&(j, other)| j != i && (other.dominates(s) || (j < i && other.same_point(s))));
        match dominator {
            Some((_, d)) => {
                debug!("{} dominated by {}", s.name, d.name);
                excluded.push((s.clone(), Dominance::Dominated { by: d.name.clone() }));
            }
            None => survivors.push(s.clone()),
        }
    }

    survivors.sort_by(|a, b| {
        a.mean_effect
            .partial_cmp(&b.mean_effect)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.mean_cost.partial_cmp(&b.mean_cost).unwrap_or(std::cmp::Ordering::Equal))
    });

    // drop any member whose ICER exceeds the next one until ICERs rise with effect
    loop {
        let breaking = (1..survivors.len().saturating_sub(1)).find(|&i| {
            icer_between(&survivors[i - 1], &survivors[i]) > icer_between(&survivors[i], &survivors[i + 1])
        });
        match breaking {
            Some(i) => {
                let s = survivors.remove(i);
                debug!("{} extended-dominated", s.name);
                excluded.push((s, Dominance::ExtendedDominated));
            }
            None => break,
        }
    }

    let points = survivors
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let icer = if i == 0 {
                None
            } else {
                debug_assert!(s.mean_effect > survivors[i - 1].mean_effect, "zero ICER denominator on frontier");
                Some(icer_between(&survivors[i - 1], s))
            };
            FrontierPoint { strategy: s.clone(), icer }
        })
        .collect();

    Frontier { points, excluded }
}

// === ICER TABLE ===

#[derive(Clone, Debug)]
pub struct CeaOptions {
    pub alpha: f64,
    pub interval: Interval,
    /// Treat patient k of every strategy as the same patient
    pub paired: bool,
    /// Resamples for the ICER interval; 0 skips it, otherwise at least 2
    pub bootstrap_samples: usize,
    pub seed: u64,
}

impl Default for CeaOptions {
    fn default() -> Self {
        CeaOptions { alpha: 0.05, interval: Interval::Confidence, paired: false, bootstrap_samples: 1000, seed: 1 }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct IcerRow {
    pub name: String,
    pub mean_cost: f64,
    pub mean_effect: f64,
    pub incremental_cost: Option<Estimate>,
    pub incremental_effect: Option<Estimate>,
    pub icer: Option<f64>,
    pub icer_interval: Option<(f64, f64)>,
}

/// One row per frontier member, increments taken against the previous member
pub fn icer_table(frontier: &Frontier, opts: &CeaOptions) -> ModelResult<Vec<IcerRow>> {
    if opts.bootstrap_samples == 1 {
        return Err(ModelError::InvalidSetting("bootstrap needs at least 2 resamples, or 0 to skip it".to_string()));
    }
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut rows = Vec::with_capacity(frontier.len());

    for (i, point) in frontier.points().iter().enumerate() {
        let s = &point.strategy;
        let mut row = IcerRow {
            name: s.name.clone(),
            mean_cost: s.mean_cost,
            mean_effect: s.mean_effect,
            incremental_cost: None,
            incremental_effect: None,
            icer: None,
            icer_interval: None,
        };

        if i > 0 {
            let prev = &frontier.points()[i - 1].strategy;
            if s.mean_effect == prev.mean_effect {
                return Err(ModelError::DegenerateIcer { strategy: s.name.clone() });
            }
            row.incremental_cost = Some(difference_estimate(
                "Incremental cost", s.costs, prev.costs, opts.paired, opts.interval, opts.alpha, &mut rng,
            )?);
            row.incremental_effect = Some(difference_estimate(
                "Incremental effect", s.effects, prev.effects, opts.paired, opts.interval, opts.alpha, &mut rng,
            )?);
            row.icer = Some(icer_between(prev, s));
            if opts.bootstrap_samples > 0 {
                row.icer_interval = Some(icer_bootstrap_interval(
                    s, prev, opts.paired, opts.alpha, opts.bootstrap_samples, &mut rng,
                )?);
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

fn resampled_mean(data: &[f64], idx: &[usize]) -> f64 {
    idx.iter().map(|&i| data[i]).sum::<f64>() / idx.len() as f64
}

fn draw_indices<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

/// Bootstrap percentile interval of the ICER of `x` against `y_ref`
pub fn icer_bootstrap_interval<R: Rng + ?Sized>(
    x: &Strategy,
    y_ref: &Strategy,
    paired: bool,
    alpha: f64,
    samples: usize,
    rng: &mut R,
) -> ModelResult<(f64, f64)> {
    if paired && x.costs.len() != y_ref.costs.len() {
        return Err(ModelError::LengthMismatch { left: x.costs.len(), right: y_ref.costs.len() });
    }

    let mut ratios = Vec::with_capacity(samples);
    for _ in 0..samples {
        let ix = draw_indices(rng, x.costs.len());
        let iy = if paired { ix.clone() } else { draw_indices(rng, y_ref.costs.len()) };
        let d_cost = resampled_mean(x.costs, &ix) - resampled_mean(y_ref.costs, &iy);
        let d_effect = resampled_mean(x.effects, &ix) - resampled_mean(y_ref.effects, &iy);
        if d_effect != 0.0 {
            ratios.push(d_cost / d_effect);
        }
    }

    let stat = SummaryStat::new(&format!("ICER of {}", x.name), &ratios);
    stat.percentile_interval(alpha)
}
