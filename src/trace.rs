//! Deterministic Markov trace: the expectation of what a cohort run estimates

use serde::Serialize;

use crate::health::{HealthState, NUM_STATES};
use crate::inputs::TherapyParameters;

#[derive(Clone, Debug, Serialize)]
pub struct ExpectedOutcomes {
    pub survival_time: f64,
    pub discounted_cost: f64,
    pub discounted_utility: f64,
    /// State distribution at the start of each step, 0..=horizon
    pub occupancy: Vec<[f64; NUM_STATES]>,
}

/// Propagate the state distribution step by step under the same accrual
/// rules as `simulate_patient`
pub fn expected_outcomes(params: &TherapyParameters) -> ExpectedOutcomes {
    let mut dist = [0.0; NUM_STATES];
    dist[params.initial_state.index()] = 1.0;
    let mut occupancy = Vec::with_capacity(params.horizon_steps + 1);
    occupancy.push(dist);

    let (mut survival, mut cost, mut utility) = (0.0, 0.0, 0.0);
    for k in 0..params.horizon_steps {
        let df = params.discount_factor(k);
        let mut next = [0.0; NUM_STATES];
        for s in HealthState::ALL {
            let p = dist[s.index()];
            if p == 0.0 {
                continue;
            }
            if !s.is_terminal() {
                survival += p * params.delta_t;
                cost += p * params.step_cost(s) * df;
                utility += p * params.step_utility(s) * df;
            }
            for (j, q) in params.probs.row(s).iter().enumerate() {
                next[j] += p * q;
            }
        }
        dist = next;
        occupancy.push(dist);
    }

    ExpectedOutcomes { survival_time: survival, discounted_cost: cost, discounted_utility: utility, occupancy }
}
