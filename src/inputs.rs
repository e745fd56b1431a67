//! Fixed input table and per-therapy parameter bundles
//!
//! Annual rates, stroke outcome splits, state costs and utilities for
//! aspirin, aspirin/clopidogrel, warfarin and the two dabigatran doses.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::SimSettings;
use crate::error::{ModelError, ModelResult};
use crate::health::{HealthState, NUM_STATES};
use crate::rates::{continuous_to_discrete, ProbabilityMatrix, RateMatrix};

// === ANNUAL RATES ===

// Well -> Non-Stroke Death
const MORTALITY_ANTIPLATELET: f64 = 0.0420;
const MORTALITY_WARFARIN: f64 = 0.0400;
const MORTALITY_DABIGATRAN: f64 = 0.0390;

// Well -> any stroke
const STROKE_ASPIRIN: f64 = 0.0270;
const STROKE_DUAL: f64 = 0.0197; // RR 0.73 vs aspirin
const STROKE_WARFARIN: f64 = 0.0118; // RR 0.44 vs aspirin
const STROKE_DABIGATRAN110: f64 = 0.0132; // RR 1.11 vs warfarin
const STROKE_DABIGATRAN150: f64 = 0.0090; // RR 0.76 vs warfarin

/// Share of strokes that are transient ischaemic attacks, all therapies
const TIA_SHARE: f64 = 0.2800;

/// Minor / major shares of a stroke
#[derive(Clone, Copy, Debug)]
struct StrokeSplit {
    minor: f64,
    major: f64,
}

const SPLIT_ANTIPLATELET: StrokeSplit = StrokeSplit { minor: 0.4100, major: 0.3000 };
const SPLIT_WARFARIN: StrokeSplit = StrokeSplit { minor: 0.4250, major: 0.4020 };

/// Share of strokes that are fatal, applied to every therapy and to recurrences
const FATAL_SHARE: f64 = 0.1790;

/// Multiplier on the stroke rate once a patient is post-stroke
const RECURRENT_STROKE_MULTIPLIER: f64 = 2.6;

/// Acute stroke state -> Post-Stroke (one week on average)
const ACUTE_TO_POST_STROKE: f64 = 52.0;

// === COSTS AND UTILITIES ===

/// Annual cost of each state, in `HealthState::ALL` order
pub const ANNUAL_STATE_COST: [f64; NUM_STATES] = [0.0, 2470.0, 5400.0, 625.0, 10000.0, 200.0, 10000.0];

pub const ANNUAL_STATE_UTILITY: [f64; NUM_STATES] = [1.0, 0.75, 0.39, 0.9, 0.0, 0.12, 0.0];

const ASPIRIN_COST: f64 = 10.0;
const DUAL_COST: f64 = 1857.0;
const WARFARIN_COST: f64 = 180.0;
const DABIGATRAN_COST: f64 = 3240.0;

// === THERAPIES ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Therapy {
    Aspirin,
    DualTherapy,
    Warfarin,
    Dabigatran110,
    Dabigatran150,
}

impl Therapy {
    pub const ALL: [Therapy; 5] = [
        Therapy::Aspirin,
        Therapy::DualTherapy,
        Therapy::Warfarin,
        Therapy::Dabigatran110,
        Therapy::Dabigatran150,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Therapy::Aspirin => "Aspirin",
            Therapy::DualTherapy => "Aspirin/Clopidogrel",
            Therapy::Warfarin => "Warfarin",
            Therapy::Dabigatran110 => "Dabigatran 110mg",
            Therapy::Dabigatran150 => "Dabigatran 150mg",
        }
    }

    pub fn annual_treatment_cost(self) -> f64 {
        match self {
            Therapy::Aspirin => ASPIRIN_COST,
            Therapy::DualTherapy => DUAL_COST,
            Therapy::Warfarin => WARFARIN_COST,
            Therapy::Dabigatran110 | Therapy::Dabigatran150 => DABIGATRAN_COST,
        }
    }

    fn stroke_rate(self) -> f64 {
        match self {
            Therapy::Aspirin => STROKE_ASPIRIN,
            Therapy::DualTherapy => STROKE_DUAL,
            Therapy::Warfarin => STROKE_WARFARIN,
            Therapy::Dabigatran110 => STROKE_DABIGATRAN110,
            Therapy::Dabigatran150 => STROKE_DABIGATRAN150,
        }
    }

    fn mortality_rate(self) -> f64 {
        match self {
            Therapy::Aspirin | Therapy::DualTherapy => MORTALITY_ANTIPLATELET,
            Therapy::Warfarin => MORTALITY_WARFARIN,
            Therapy::Dabigatran110 | Therapy::Dabigatran150 => MORTALITY_DABIGATRAN,
        }
    }

    /// Minor/major split of a first stroke; only warfarin has its own
    fn stroke_split(self) -> StrokeSplit {
        match self {
            Therapy::Warfarin => SPLIT_WARFARIN,
            Therapy::Aspirin | Therapy::DualTherapy | Therapy::Dabigatran110 | Therapy::Dabigatran150 => {
                SPLIT_ANTIPLATELET
            }
        }
    }

    /// Annual transition rates for this therapy.
    ///
    /// The Post-Stroke row always uses the antiplatelet outcome split,
    /// whatever the therapy.
    pub fn rate_matrix(self) -> RateMatrix {
        self.rate_matrix_with_stroke_multiplier(1.0)
    }

    /// Annual transition rates with every stroke rate scaled by `stroke_rr`
    pub fn rate_matrix_with_stroke_multiplier(self, stroke_rr: f64) -> RateMatrix {
        let s = self.stroke_rate() * stroke_rr;
        let mort = self.mortality_rate();
        let split = self.stroke_split();
        let recur = SPLIT_ANTIPLATELET;
        let r = RECURRENT_STROKE_MULTIPLIER;
        let q = ACUTE_TO_POST_STROKE;

        [
            // Well
            [0.0, s * split.minor, s * split.major, s * TIA_SHARE, s * FATAL_SHARE, 0.0, mort],
            // Minor Stroke
            [0.0, 0.0, 0.0, 0.0, 0.0, q, 0.0],
            // Major Stroke
            [0.0, 0.0, 0.0, 0.0, 0.0, q, 0.0],
            // TIA
            [0.0, 0.0, 0.0, 0.0, 0.0, q, 0.0],
            // Stroke Death
            [0.0; NUM_STATES],
            // Post-Stroke
            [0.0, s * recur.minor * r, s * recur.major * r, s * TIA_SHARE * r, s * FATAL_SHARE, 0.0, mort],
            // Non-Stroke Death
            [0.0; NUM_STATES],
        ]
    }
}

impl fmt::Display for Therapy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Therapy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "aspirin" | "asa" => Ok(Therapy::Aspirin),
            "dual" | "dualtherapy" | "clopidogrel" => Ok(Therapy::DualTherapy),
            "warfarin" => Ok(Therapy::Warfarin),
            "dabigatran110" | "dab110" => Ok(Therapy::Dabigatran110),
            "dabigatran150" | "dab150" => Ok(Therapy::Dabigatran150),
            _ => Err(ModelError::UnknownTherapy(s.to_string())),
        }
    }
}

// === PARAMETER BUNDLE ===

/// Everything one cohort needs, built once before simulation
#[derive(Clone, Debug)]
pub struct TherapyParameters {
    pub name: String,
    pub probs: ProbabilityMatrix,
    pub two_transition_bound: f64,
    pub annual_treatment_cost: f64,
    pub initial_state: HealthState,
    pub state_costs: [f64; NUM_STATES],
    pub state_utilities: [f64; NUM_STATES],
    pub delta_t: f64,
    pub discount_per_step: f64,
    pub horizon_steps: usize,
}

impl TherapyParameters {
    /// Stroke rates scaled by `settings.stroke_rate_multiplier`
    pub fn new(therapy: Therapy, settings: &SimSettings) -> ModelResult<Self> {
        let rates = therapy.rate_matrix_with_stroke_multiplier(settings.stroke_rate_multiplier);
        Self::from_rates(therapy.name(), &rates, therapy.annual_treatment_cost(), settings)
    }

    /// Bundle for an arbitrary rate matrix with the standard state costs and utilities.
    /// Drug and state costs are both scaled by `settings.cost_multiplier`.
    pub fn from_rates(
        name: &str,
        rates: &RateMatrix,
        annual_treatment_cost: f64,
        settings: &SimSettings,
    ) -> ModelResult<Self> {
        settings.validate()?;
        let discretized = continuous_to_discrete(rates, settings.delta_t)?;
        debug!("{}: two-transition bound {:.4}", name, discretized.two_transition_bound);
        if discretized.two_transition_bound > 0.05 {
            warn!(
                "{}: P(>1 transition per step) may reach {:.3}; consider a finer time step",
                name, discretized.two_transition_bound
            );
        }

        Ok(TherapyParameters {
            name: name.to_string(),
            probs: discretized.probs,
            two_transition_bound: discretized.two_transition_bound,
            annual_treatment_cost: annual_treatment_cost * settings.cost_multiplier,
            initial_state: HealthState::Well,
            state_costs: ANNUAL_STATE_COST.map(|c| c * settings.cost_multiplier),
            state_utilities: ANNUAL_STATE_UTILITY,
            delta_t: settings.delta_t,
            discount_per_step: settings.discount_per_step(),
            horizon_steps: settings.horizon_steps(),
        })
    }

    /// Undiscounted cost of spending one step in `state`, treatment included while alive
    pub fn step_cost(&self, state: HealthState) -> f64 {
        if state.is_terminal() {
            return 0.0;
        }
        (self.state_costs[state.index()] + self.annual_treatment_cost) * self.delta_t
    }

    pub fn step_utility(&self, state: HealthState) -> f64 {
        if state.is_terminal() {
            return 0.0;
        }
        self.state_utilities[state.index()] * self.delta_t
    }

    /// Discount factor applied to step `k`
    pub fn discount_factor(&self, k: usize) -> f64 {
        (1.0 + self.discount_per_step).powi(-(k as i32))
    }
}
