//! Simulation settings shared by every cohort in a run

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    pub population_size: usize,
    pub sim_length_years: f64,
    /// Significance level for confidence and prediction intervals
    pub alpha: f64,
    pub annual_discount: f64,
    /// Length of one time step in years
    pub delta_t: f64,
    /// Patient k draws from seed_base + k
    pub seed_base: u64,
    /// Scales every stroke rate, first and recurrent
    pub stroke_rate_multiplier: f64,
    /// Scales drug and state costs alike
    pub cost_multiplier: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        SimSettings {
            population_size: 2000,
            sim_length_years: 20.0,
            alpha: 0.05,
            annual_discount: 0.03,
            delta_t: 1.0 / 12.0,
            seed_base: 1,
            stroke_rate_multiplier: 1.0,
            cost_multiplier: 1.0,
        }
    }
}

impl SimSettings {
    pub fn horizon_steps(&self) -> usize {
        (self.sim_length_years / self.delta_t).round() as usize
    }

    pub fn discount_per_step(&self) -> f64 {
        self.annual_discount * self.delta_t
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.population_size == 0 {
            return Err(ModelError::InvalidSetting("population size must be at least 1".into()));
        }
        if !self.delta_t.is_finite() || self.delta_t <= 0.0 {
            return Err(ModelError::InvalidStepSize(self.delta_t));
        }
        if !self.sim_length_years.is_finite() || self.sim_length_years <= 0.0 {
            return Err(ModelError::InvalidSetting(format!(
                "simulation length must be positive, got {}",
                self.sim_length_years
            )));
        }
        if self.horizon_steps() == 0 {
            return Err(ModelError::InvalidSetting("horizon is shorter than one time step".into()));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ModelError::InvalidSetting(format!("alpha must be in (0, 1), got {}", self.alpha)));
        }
        if !self.annual_discount.is_finite() || self.annual_discount < 0.0 {
            return Err(ModelError::InvalidSetting(format!(
                "discount rate must be non-negative, got {}",
                self.annual_discount
            )));
        }
        let multipliers = [
            ("stroke rate multiplier", self.stroke_rate_multiplier),
            ("cost multiplier", self.cost_multiplier),
        ];
        for (name, value) in multipliers {
            if !value.is_finite() || value < 0.0 {
                return Err(ModelError::InvalidSetting(format!("{} must be non-negative, got {}", name, value)));
            }
        }
        Ok(())
    }
}
