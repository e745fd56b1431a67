//! Cohort of independent patients simulated under one therapy

use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::error::{ModelError, ModelResult};
use crate::inputs::TherapyParameters;
use crate::patient::{simulate_seeded, PatientTrajectory};
use crate::stats::SummaryStat;

/// Per-patient observations of one cohort, in patient-index order
#[derive(Clone, Debug)]
pub struct CohortResult {
    pub name: String,
    pub delta_t: f64,
    pub horizon_steps: usize,
    pub survival_times: Vec<f64>,
    pub costs: Vec<f64>,
    pub utilities: Vec<f64>,
    pub stroke_counts: Vec<u32>,
    /// First-stroke times of the patients who had one
    pub stroke_times: Vec<f64>,
    pub first_stroke_times: Vec<Option<f64>>,
    /// Step of absorption, `None` if alive at the horizon
    absorbed_at: Vec<Option<usize>>,
}

/// Simulate `population_size` patients; patient `k` draws from `seed_base + k`.
///
/// Patients with matching indices and seed bases share their uniform draws
/// across therapies, which is what paired comparisons rely on.
pub fn run_cohort(params: &TherapyParameters, population_size: usize, seed_base: u64) -> ModelResult<CohortResult> {
    if population_size == 0 {
        return Err(ModelError::InvalidSetting("cohort needs at least one patient".into()));
    }
    let start = Instant::now();
    info!("{}: simulating {} patients over {} steps", params.name, population_size, params.horizon_steps);

    let trajectories: Vec<PatientTrajectory> = (0..population_size)
        .into_par_iter()
        .map(|k| simulate_seeded(params, seed_base.wrapping_add(k as u64)))
        .collect();

    let result = CohortResult::from_trajectories(params, &trajectories);
    info!("{}: done in {:.2?}", params.name, start.elapsed());
    Ok(result)
}

impl CohortResult {
    pub fn from_trajectories(params: &TherapyParameters, trajectories: &[PatientTrajectory]) -> Self {
        let n = trajectories.len();
        let mut result = CohortResult {
            name: params.name.clone(),
            delta_t: params.delta_t,
            horizon_steps: params.horizon_steps,
            survival_times: Vec::with_capacity(n),
            costs: Vec::with_capacity(n),
            utilities: Vec::with_capacity(n),
            stroke_counts: Vec::with_capacity(n),
            stroke_times: Vec::new(),
            first_stroke_times: Vec::with_capacity(n),
            absorbed_at: Vec::with_capacity(n),
        };
        for t in trajectories {
            result.survival_times.push(t.survival_time);
            result.costs.push(t.discounted_cost);
            result.utilities.push(t.discounted_utility);
            result.stroke_counts.push(t.stroke_count);
            if let Some(time) = t.first_stroke_time {
                result.stroke_times.push(time);
            }
            result.first_stroke_times.push(t.first_stroke_time);
            result.absorbed_at.push(if t.absorbed { Some(t.survival_steps) } else { None });
        }
        result
    }

    pub fn population_size(&self) -> usize {
        self.survival_times.len()
    }

    /// Patients alive at the start of each step, for steps 0..=horizon
    pub fn survival_curve(&self) -> Vec<usize> {
        let mut deaths = vec![0usize; self.horizon_steps + 1];
        for step in self.absorbed_at.iter().flatten() {
            deaths[(*step).min(self.horizon_steps)] += 1;
        }
        let mut alive = self.population_size();
        deaths
            .iter()
            .map(|d| {
                alive -= d;
                alive
            })
            .collect()
    }

    pub fn stroke_count_obs(&self) -> Vec<f64> {
        self.stroke_counts.iter().map(|&c| c as f64).collect()
    }

    pub fn survival_stat(&self) -> SummaryStat {
        SummaryStat::new("Survival time", &self.survival_times)
    }

    pub fn stroke_count_stat(&self) -> SummaryStat {
        SummaryStat::new("Number of strokes", &self.stroke_count_obs())
    }

    pub fn stroke_time_stat(&self) -> SummaryStat {
        SummaryStat::new("Time to first stroke", &self.stroke_times)
    }

    pub fn cost_stat(&self) -> SummaryStat {
        SummaryStat::new("Discounted cost", &self.costs)
    }

    pub fn utility_stat(&self) -> SummaryStat {
        SummaryStat::new("Discounted utility", &self.utilities)
    }
}
