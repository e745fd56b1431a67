//! Cost-benefit analysis: incremental net monetary benefit over willingness-to-pay

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::cea::Strategy;
use crate::error::{ModelError, ModelResult};
use crate::stats::{difference_estimate, Estimate, Interval};

#[derive(Clone, Copy, Debug, Serialize)]
pub struct NmbPoint {
    pub wtp: f64,
    pub estimate: Estimate,
}

/// Incremental NMB of one strategy against the reference, one point per WTP value
#[derive(Clone, Debug, Serialize)]
pub struct NmbCurve {
    pub name: String,
    pub reference: String,
    pub points: Vec<NmbPoint>,
}

fn nmb_obs(s: &Strategy, wtp: f64) -> Vec<f64> {
    s.effects.iter().zip(s.costs).map(|(e, c)| wtp * e - c).collect()
}

/// `mean(NMB_strategy) - mean(NMB_reference)` at one willingness-to-pay,
/// per-patient `NMB = wtp * effect - cost`
pub fn incremental_nmb(
    strategy: &Strategy,
    reference: &Strategy,
    wtp: f64,
    alpha: f64,
    interval: Interval,
    paired: bool,
    seed: u64,
) -> ModelResult<Estimate> {
    let mut rng = StdRng::seed_from_u64(seed);
    difference_estimate(
        "Incremental NMB",
        &nmb_obs(strategy, wtp),
        &nmb_obs(reference, wtp),
        paired,
        interval,
        alpha,
        &mut rng,
    )
}

/// Evenly spaced willingness-to-pay values from `min` to `max` inclusive
pub fn wtp_range(min: f64, max: f64, n_points: usize) -> ModelResult<Vec<f64>> {
    if n_points < 2 || !(max > min) {
        return Err(ModelError::InvalidSetting(format!(
            "WTP range needs max > min and at least 2 points, got [{}, {}] x {}",
            min, max, n_points
        )));
    }
    let step = (max - min) / (n_points - 1) as f64;
    Ok((0..n_points).map(|i| min + step * i as f64).collect())
}

/// One curve per non-reference strategy
pub fn nmb_curves(
    strategies: &[Strategy],
    reference_index: usize,
    wtps: &[f64],
    alpha: f64,
    paired: bool,
) -> ModelResult<Vec<NmbCurve>> {
    let reference = strategies.get(reference_index).ok_or_else(|| {
        ModelError::InvalidSetting(format!("reference index {} out of range", reference_index))
    })?;

    strategies
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != reference_index)
        .map(|(_, s)| {
            let points = wtps
                .iter()
                .map(|&wtp| {
                    let estimate = incremental_nmb(s, reference, wtp, alpha, Interval::Confidence, paired, 1)?;
                    Ok(NmbPoint { wtp, estimate })
                })
                .collect::<ModelResult<Vec<_>>>()?;
            Ok(NmbCurve { name: s.name.clone(), reference: reference.name.clone(), points })
        })
        .collect()
}

/// Willingness-to-pay where the mean incremental NMB first crosses zero,
/// linearly interpolated between sweep points
pub fn break_even_wtp(curve: &NmbCurve) -> Option<f64> {
    if let Some(first) = curve.points.first() {
        if first.estimate.mean == 0.0 {
            return Some(first.wtp);
        }
    }
    curve.points.windows(2).find_map(|w| {
        let (a, b) = (w[0], w[1]);
        if b.estimate.mean == 0.0 {
            return Some(b.wtp);
        }
        if (a.estimate.mean < 0.0) != (b.estimate.mean < 0.0) {
            let frac = a.estimate.mean / (a.estimate.mean - b.estimate.mean);
            Some(a.wtp + frac * (b.wtp - a.wtp))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wtp_range() {
        let r = wtp_range(0.0, 50_000.0, 11).unwrap();
        assert_eq!(r.len(), 11);
        assert_eq!(r[0], 0.0);
        assert!((r[10] - 50_000.0).abs() < 1e-9);
        assert!(wtp_range(10.0, 0.0, 5).is_err());
        assert!(wtp_range(0.0, 1.0, 1).is_err());
    }

    #[test]
    fn test_nmb_linear_in_wtp() {
        let (ca, ea) = (vec![100.0, 120.0, 80.0], vec![1.0, 1.2, 0.8]);
        let (cb, eb) = (vec![1100.0, 1120.0, 1080.0], vec![1.5, 1.7, 1.3]);
        let a = Strategy::new("A", &ca, &ea).unwrap();
        let b = Strategy::new("B", &cb, &eb).unwrap();
        for wtp in [0.0, 1000.0, 2000.0, 5000.0] {
            let est = incremental_nmb(&b, &a, wtp, 0.05, Interval::Confidence, true, 1).unwrap();
            assert!((est.mean - (wtp * 0.5 - 1000.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_break_even_matches_icer() {
        let (ca, ea) = (vec![100.0, 120.0, 80.0, 100.0], vec![1.0, 1.2, 0.8, 1.0]);
        let (cb, eb) = (vec![1100.0, 1130.0, 1070.0, 1100.0], vec![1.5, 1.8, 1.2, 1.5]);
        let a = Strategy::new("A", &ca, &ea).unwrap();
        let b = Strategy::new("B", &cb, &eb).unwrap();
        let wtps = wtp_range(0.0, 5000.0, 21).unwrap();
        let curves = nmb_curves(&[a, b], 0, &wtps, 0.05, false).unwrap();
        assert_eq!(curves.len(), 1);
        assert_eq!(curves[0].name, "B");
        assert_eq!(curves[0].reference, "A");
        // ICER = 1000 / 0.5
        let be = break_even_wtp(&curves[0]).unwrap();
        assert!((be - 2000.0).abs() < 1e-6);
        for p in &curves[0].points {
            assert!(p.estimate.lower <= p.estimate.mean && p.estimate.mean <= p.estimate.upper);
        }
    }

    #[test]
    fn test_no_crossing() {
        let (ca, ea) = (vec![100.0, 100.0], vec![1.0, 1.0]);
        let (cb, eb) = (vec![50.0, 50.0], vec![2.0, 2.0]);
        let a = Strategy::new("A", &ca, &ea).unwrap();
        let b = Strategy::new("B", &cb, &eb).unwrap();
        let curves = nmb_curves(&[a, b], 0, &[0.0, 100.0, 200.0], 0.05, true).unwrap();
        assert_eq!(break_even_wtp(&curves[0]), None);
    }

    #[test]
    fn test_bad_alpha_is_an_error() {
        let (c, e) = (vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 2.5]);
        let (c2, e2) = (vec![2.0, 3.0, 5.0], vec![1.5, 2.0, 3.0]);
        let a = Strategy::new("A", &c, &e).unwrap();
        let b = Strategy::new("B", &c2, &e2).unwrap();
        assert!(matches!(nmb_curves(&[a, b], 0, &[0.0, 10.0], 2.0, false), Err(ModelError::InvalidSetting(_))));
    }

    #[test]
    fn test_bad_reference() {
        let (c, e) = (vec![1.0, 2.0], vec![1.0, 2.0]);
        let a = Strategy::new("A", &c, &e).unwrap();
        assert!(nmb_curves(&[a], 3, &[0.0], 0.05, false).is_err());
    }
}
