//! Continuous-time rates to discrete-time transition probabilities

use log::debug;
use rand::Rng;

use crate::error::{ModelError, ModelResult};
use crate::health::{HealthState, NUM_STATES};

/// Annual hazard rates indexed by (from, to). Diagonal entries are ignored.
pub type RateMatrix = [[f64; NUM_STATES]; NUM_STATES];

/// Tolerance on row sums of a probability matrix
pub const ROW_TOLERANCE: f64 = 1e-9;

// === PROBABILITY MATRIX ===

#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityMatrix {
    probs: [[f64; NUM_STATES]; NUM_STATES],
}

impl ProbabilityMatrix {
    /// Checks that every entry is a probability and every row sums to 1
    pub fn new(probs: [[f64; NUM_STATES]; NUM_STATES]) -> ModelResult<Self> {
        for (i, row) in probs.iter().enumerate() {
            let label = HealthState::ALL[i].label();
            if row.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
                return Err(ModelError::InvalidProbabilityMatrix { row: label, sum: row.iter().sum() });
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_TOLERANCE {
                return Err(ModelError::InvalidProbabilityMatrix { row: label, sum });
            }
        }
        Ok(ProbabilityMatrix { probs })
    }

    pub fn row(&self, from: HealthState) -> &[f64; NUM_STATES] {
        &self.probs[from.index()]
    }

    pub fn prob(&self, from: HealthState, to: HealthState) -> f64 {
        self.probs[from.index()][to.index()]
    }

    pub fn rows(&self) -> &[[f64; NUM_STATES]; NUM_STATES] {
        &self.probs
    }

    /// One categorical draw from the row of `current`
    pub fn sample_next<R: Rng + ?Sized>(&self, rng: &mut R, current: HealthState) -> HealthState {
        let r: f64 = rng.gen();
        let mut cumsum = 0.0;
        for (next, &prob) in self.probs[current.index()].iter().enumerate() {
            cumsum += prob;
            if r < cumsum {
                return HealthState::ALL[next];
            }
        }
        // row sums to 1 - eps and r landed in the gap
        current
    }
}

// === CONVERSION ===

/// Result of discretizing a rate matrix for one time step
#[derive(Clone, Debug)]
pub struct Discretized {
    pub probs: ProbabilityMatrix,
    /// Upper bound on P(two or more transitions within one step), taken at the largest out-rate
    pub two_transition_bound: f64,
}

/// Convert annual transition rates into per-step probabilities.
///
/// State `i` with total out-rate `λ_i` stays put with probability `exp(-λ_i·Δt)`;
/// the remaining mass `1 - exp(-λ_i·Δt)` is split in proportion to `rate(i,j)/λ_i`.
/// Terminal states get identity rows.
pub fn continuous_to_discrete(rates: &RateMatrix, delta_t: f64) -> ModelResult<Discretized> {
    if !delta_t.is_finite() || delta_t <= 0.0 {
        return Err(ModelError::InvalidStepSize(delta_t));
    }

    let out_rates = out_rates(rates)?;
    let mut probs = [[0.0; NUM_STATES]; NUM_STATES];

    for (i, row) in rates.iter().enumerate() {
        let lambda = out_rates[i];
        if lambda == 0.0 {
            probs[i][i] = 1.0;
            continue;
        }
        let x = lambda * delta_t;
        let leave = -(-x).exp_m1();
        for (j, &rate) in row.iter().enumerate() {
            probs[i][j] = if i == j { (-x).exp() } else { leave * rate / lambda };
        }
    }

    let lambda_max = out_rates.iter().cloned().fold(0.0, f64::max);
    let x = lambda_max * delta_t;
    let two_transition_bound = (1.0 - (-x).exp() * (1.0 + x)).max(0.0);
    debug!(
        "discretized rates: dt={:.5} lambda_max={:.3} P(>1 transition)<={:.4}",
        delta_t, lambda_max, two_transition_bound
    );

    Ok(Discretized { probs: ProbabilityMatrix::new(probs)?, two_transition_bound })
}

/// Total out-rate per state, validating entries and row shape on the way
fn out_rates(rates: &RateMatrix) -> ModelResult<[f64; NUM_STATES]> {
    let mut out = [0.0; NUM_STATES];
    for (i, row) in rates.iter().enumerate() {
        let from = HealthState::ALL[i];
        for (j, &rate) in row.iter().enumerate() {
            if i == j {
                continue;
            }
            if !rate.is_finite() || rate < 0.0 {
                return Err(ModelError::InvalidRateMatrix {
                    from: from.label(),
                    to: HealthState::ALL[j].label(),
                    reason: format!("rate must be finite and non-negative, got {}", rate),
                });
            }
            out[i] += rate;
        }
        if from.is_terminal() && out[i] > 0.0 {
            return Err(ModelError::InvalidRateMatrix {
                from: from.label(),
                to: from.label(),
                reason: format!("terminal state has outgoing rate {}", out[i]),
            });
        }
        if !from.is_terminal() && out[i] == 0.0 {
            return Err(ModelError::InvalidRateMatrix {
                from: from.label(),
                to: from.label(),
                reason: "transient state has no outgoing rate".to_string(),
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::Therapy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn simple_rates() -> RateMatrix {
        let mut r = [[0.0; NUM_STATES]; NUM_STATES];
        r[0][1] = 0.1;
        r[0][6] = 0.05;
        r[1][5] = 52.0;
        r[2][5] = 52.0;
        r[3][5] = 52.0;
        r[5][4] = 0.02;
        r[5][6] = 0.04;
        r
    }

    #[test]
    fn test_rows_sum_to_one() {
        for therapy in Therapy::ALL {
            let d = continuous_to_discrete(&therapy.rate_matrix(), 1.0 / 12.0).unwrap();
            for row in d.probs.rows() {
                let sum: f64 = row.iter().sum();
                assert!((sum - 1.0).abs() < 1e-9, "{:?} row sum {}", therapy, sum);
            }
        }
    }

    #[test]
    fn test_terminal_rows_are_identity() {
        let d = continuous_to_discrete(&simple_rates(), 0.25).unwrap();
        for s in HealthState::ALL.iter().filter(|s| s.is_terminal()) {
            for t in HealthState::ALL {
                let expected = if t == *s { 1.0 } else { 0.0 };
                assert_eq!(d.probs.prob(*s, t), expected);
            }
        }
    }

    #[test]
    fn test_split_proportional_to_rates() {
        let dt = 0.5;
        let d = continuous_to_discrete(&simple_rates(), dt).unwrap();
        let stay = (-0.15f64 * dt).exp();
        assert!((d.probs.prob(HealthState::Well, HealthState::Well) - stay).abs() < 1e-12);
        let to_minor = d.probs.prob(HealthState::Well, HealthState::MinorStroke);
        let to_death = d.probs.prob(HealthState::Well, HealthState::NonStrokeDeath);
        assert!((to_minor / to_death - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_step_stays_put() {
        let d = continuous_to_discrete(&simple_rates(), 1e-9).unwrap();
        for s in HealthState::ALL {
            assert!(d.probs.prob(s, s) > 1.0 - 1e-6);
        }
        assert!(d.two_transition_bound < 1e-9);
    }

    #[test]
    fn test_two_transition_bound_grows_with_step() {
        let fine = continuous_to_discrete(&simple_rates(), 1.0 / 365.0).unwrap();
        let coarse = continuous_to_discrete(&simple_rates(), 1.0 / 12.0).unwrap();
        assert!(fine.two_transition_bound < coarse.two_transition_bound);
        assert!(coarse.two_transition_bound < 1.0);
    }

    #[test]
    fn test_negative_rate_rejected() {
        let mut r = simple_rates();
        r[0][3] = -0.01;
        let err = continuous_to_discrete(&r, 0.1).unwrap_err();
        assert!(matches!(err, ModelError::InvalidRateMatrix { .. }));
    }

    #[test]
    fn test_stuck_transient_state_rejected() {
        let mut r = simple_rates();
        r[5] = [0.0; NUM_STATES];
        assert!(matches!(
            continuous_to_discrete(&r, 0.1),
            Err(ModelError::InvalidRateMatrix { .. })
        ));
    }

    #[test]
    fn test_terminal_with_outflow_rejected() {
        let mut r = simple_rates();
        r[6][0] = 0.1;
        assert!(matches!(
            continuous_to_discrete(&r, 0.1),
            Err(ModelError::InvalidRateMatrix { .. })
        ));
    }

    #[test]
    fn test_diagonal_ignored() {
        let mut r = simple_rates();
        r[0][0] = 99.0;
        let a = continuous_to_discrete(&r, 0.1).unwrap();
        let b = continuous_to_discrete(&simple_rates(), 0.1).unwrap();
        assert_eq!(a.probs, b.probs);
    }

    #[test]
    fn test_bad_step_rejected() {
        assert!(matches!(continuous_to_discrete(&simple_rates(), 0.0), Err(ModelError::InvalidStepSize(_))));
        assert!(matches!(continuous_to_discrete(&simple_rates(), f64::NAN), Err(ModelError::InvalidStepSize(_))));
    }

    #[test]
    fn test_sample_next_terminal_never_leaves() {
        let d = continuous_to_discrete(&simple_rates(), 0.1).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert_eq!(d.probs.sample_next(&mut rng, HealthState::StrokeDeath), HealthState::StrokeDeath);
        }
    }

    #[test]
    fn test_sample_next_frequencies() {
        let d = continuous_to_discrete(&simple_rates(), 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let n = 200_000;
        let stays = (0..n)
            .filter(|_| d.probs.sample_next(&mut rng, HealthState::Well) == HealthState::Well)
            .count();
        let expected = (-0.15f64).exp();
        assert!((stays as f64 / n as f64 - expected).abs() < 0.005);
    }

    #[test]
    fn test_probability_matrix_rejects_bad_row() {
        let mut p = [[0.0; NUM_STATES]; NUM_STATES];
        for (i, row) in p.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        p[0][0] = 0.9;
        assert!(matches!(ProbabilityMatrix::new(p), Err(ModelError::InvalidProbabilityMatrix { .. })));
    }
}
