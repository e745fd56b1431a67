//! Single-patient trajectory through the discretized Markov model

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::health::HealthState;
use crate::inputs::TherapyParameters;

// === DATA STRUCTURES ===

/// One simulated patient. `path` holds the initial state at step 0 and then
/// every state change, tagged with the step index at which it was entered.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientTrajectory {
    pub path: Vec<(HealthState, usize)>,
    /// Steps survived: absorption step, or the full horizon
    pub survival_steps: usize,
    pub survival_time: f64,
    pub absorbed: bool,
    pub discounted_cost: f64,
    pub discounted_utility: f64,
    pub stroke_count: u32,
    pub first_stroke_time: Option<f64>,
}

impl PatientTrajectory {
    pub fn final_state(&self) -> HealthState {
        self.path.last().map(|&(s, _)| s).unwrap_or(HealthState::Well)
    }

    /// State occupied at the start of step `k`
    pub fn state_at(&self, k: usize) -> HealthState {
        let mut current = self.path[0].0;
        for &(state, entered) in &self.path {
            if entered > k {
                break;
            }
            current = state;
        }
        current
    }
}

// === SIMULATION ===

/// Run one patient from `params.initial_state` until absorption or the horizon.
///
/// Step `k` accrues the cost and utility of the state held at its start,
/// discounted by `(1 + r)^-k`; then one categorical draw picks the next state.
pub fn simulate_patient<R: Rng + ?Sized>(rng: &mut R, params: &TherapyParameters) -> PatientTrajectory {
    let mut state = params.initial_state;
    let mut path = vec![(state, 0)];
    let mut discounted_cost = 0.0;
    let mut discounted_utility = 0.0;
    let mut stroke_count = 0u32;
    let mut first_stroke_time = None;
    let mut steps = 0;

    if !state.is_terminal() {
        for k in 0..params.horizon_steps {
            let df = params.discount_factor(k);
            discounted_cost += params.step_cost(state) * df;
            discounted_utility += params.step_utility(state) * df;

            let next = params.probs.sample_next(rng, state);
            steps = k + 1;
            if next != state {
                path.push((next, steps));
                if next.is_stroke_event() {
                    stroke_count += 1;
                    first_stroke_time.get_or_insert(steps as f64 * params.delta_t);
                }
            }
            state = next;
            if state.is_terminal() {
                break;
            }
        }
    }

    PatientTrajectory {
        path,
        survival_steps: steps,
        survival_time: steps as f64 * params.delta_t,
        absorbed: state.is_terminal(),
        discounted_cost,
        discounted_utility,
        stroke_count,
        first_stroke_time,
    }
}

/// Patient with its own stream, seeded from `seed`
pub fn simulate_seeded(params: &TherapyParameters, seed: u64) -> PatientTrajectory {
    let mut rng = StdRng::seed_from_u64(seed);
    simulate_patient(&mut rng, params)
}
