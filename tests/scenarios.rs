//! End-to-end runs of the model against its deterministic Markov trace.

use afib_markov::cba::{break_even_wtp, nmb_curves, wtp_range};
use afib_markov::cea::{build_frontier, icer_table, CeaOptions, Strategy};
use afib_markov::cohort::run_cohort;
use afib_markov::config::SimSettings;
use afib_markov::inputs::{Therapy, TherapyParameters};
use afib_markov::report;
use afib_markov::stats::{DifferenceStatIndp, DifferenceStatPaired};
use afib_markov::trace::expected_outcomes;

fn within(actual: f64, expected: f64, rel: f64) -> bool {
    (actual - expected).abs() <= rel * expected.abs()
}

#[test]
fn warfarin_cohort_matches_trace() {
    let settings = SimSettings::default();
    let params = TherapyParameters::new(Therapy::Warfarin, &settings).unwrap();
    let cohort = run_cohort(&params, settings.population_size, settings.seed_base).unwrap();
    let expected = expected_outcomes(&params);

    let survival = cohort.survival_stat().mean();
    let cost = cohort.cost_stat().mean();
    let utility = cohort.utility_stat().mean();
    assert!(within(survival, expected.survival_time, 0.05), "survival {} vs {}", survival, expected.survival_time);
    assert!(within(cost, expected.discounted_cost, 0.05), "cost {} vs {}", cost, expected.discounted_cost);
    assert!(
        within(utility, expected.discounted_utility, 0.05),
        "utility {} vs {}",
        utility,
        expected.discounted_utility
    );

    // fraction alive at the horizon
    let alive = *cohort.survival_curve().last().unwrap() as f64 / settings.population_size as f64;
    let occupancy = expected.occupancy.last().unwrap();
    let expected_alive: f64 = afib_markov::health::HealthState::ALL
        .iter()
        .filter(|s| !s.is_terminal())
        .map(|s| occupancy[s.index()])
        .sum();
    assert!((alive - expected_alive).abs() < 0.05, "alive {} vs {}", alive, expected_alive);
}

#[test]
fn identical_therapies_paired_difference_is_zero() {
    let settings = SimSettings { population_size: 500, ..SimSettings::default() };
    let params = TherapyParameters::new(Therapy::Dabigatran110, &settings).unwrap();
    let a = run_cohort(&params, 500, 42).unwrap();
    let b = run_cohort(&params, 500, 42).unwrap();

    let d = DifferenceStatPaired::new("Increase in cost", &a.costs, &b.costs).unwrap();
    assert_eq!(d.mean(), 0.0);
    let (lo, hi) = d.t_ci(0.05).unwrap();
    assert!(lo <= 0.0 && hi >= 0.0);

    let strategies = vec![Strategy::from_cohort(&a).unwrap(), Strategy::from_cohort(&b).unwrap()];
    let frontier = build_frontier(&strategies);
    assert_eq!(frontier.len(), 1);
    assert_eq!(frontier.dominated().len(), 1);
}

#[test]
fn identical_therapies_independent_ci_covers_zero() {
    let settings = SimSettings { population_size: 1000, ..SimSettings::default() };
    let params = TherapyParameters::new(Therapy::Aspirin, &settings).unwrap();
    let a = run_cohort(&params, 1000, 1).unwrap();
    let b = run_cohort(&params, 1000, 100_001).unwrap();

    let d = DifferenceStatIndp::new("Increase in survival time", &a.survival_times, &b.survival_times);
    let (lo, hi) = d.t_ci(0.001).unwrap();
    assert!(lo <= 0.0 && 0.0 <= hi, "({}, {})", lo, hi);
}

#[test]
fn dabigatran_beats_aspirin_on_survival_and_utility() {
    let settings = SimSettings::default();
    let aspirin = TherapyParameters::new(Therapy::Aspirin, &settings).unwrap();
    let dab = TherapyParameters::new(Therapy::Dabigatran150, &settings).unwrap();
    let ca = run_cohort(&aspirin, 2000, 1).unwrap();
    let cd = run_cohort(&dab, 2000, 1).unwrap();

    let expected_gain = expected_outcomes(&dab).survival_time - expected_outcomes(&aspirin).survival_time;
    let d = DifferenceStatPaired::new("Increase in survival time", &cd.survival_times, &ca.survival_times).unwrap();
    let (lo, hi) = d.t_ci(0.001).unwrap();
    assert!(lo <= expected_gain && expected_gain <= hi, "{} not in ({}, {})", expected_gain, lo, hi);
    assert!(d.mean() > 0.0);
    assert!(cd.cost_stat().mean() > ca.cost_stat().mean());
}

#[test]
fn all_therapies_cost_effectiveness_pipeline() {
    let settings = SimSettings { population_size: 800, ..SimSettings::default() };
    let cohorts: Vec<_> = Therapy::ALL
        .iter()
        .map(|&t| {
            let p = TherapyParameters::new(t, &settings).unwrap();
            run_cohort(&p, settings.population_size, settings.seed_base).unwrap()
        })
        .collect();
    let strategies: Vec<Strategy> = cohorts.iter().map(|c| Strategy::from_cohort(c).unwrap()).collect();

    let frontier = build_frontier(&strategies);
    assert!(!frontier.is_empty());
    assert_eq!(frontier.len() + frontier.dominated().len(), Therapy::ALL.len());

    let opts = CeaOptions { paired: true, bootstrap_samples: 200, ..CeaOptions::default() };
    let rows = icer_table(&frontier, &opts).unwrap();
    assert_eq!(rows.len(), frontier.len());
    assert!(rows[0].icer.is_none());
    let icers: Vec<f64> = rows.iter().filter_map(|r| r.icer).collect();
    assert!(icers.windows(2).all(|w| w[0] <= w[1]));
    for r in rows.iter().skip(1) {
        assert!(r.icer.unwrap() > 0.0);
        let (lo, hi) = r.icer_interval.unwrap();
        assert!(lo <= hi);
    }

    let wtps = wtp_range(0.0, 200_000.0, 41).unwrap();
    let curves = nmb_curves(&strategies, 0, &wtps, 0.05, true).unwrap();
    assert_eq!(curves.len(), Therapy::ALL.len() - 1);
    for c in &curves {
        assert_eq!(c.reference, "Aspirin");
        assert_eq!(c.points.len(), 41);
        if let Some(wtp) = break_even_wtp(c) {
            assert!((0.0..=200_000.0).contains(&wtp));
        }
    }

    let table = report::ce_table_report(&rows, &frontier, 0.05);
    for t in Therapy::ALL {
        assert!(table.contains(t.name()), "{} missing from table", t.name());
    }
}

#[test]
fn finer_time_step_keeps_survival_close() {
    let monthly = SimSettings::default();
    let weekly = SimSettings { delta_t: 1.0 / 52.0, ..SimSettings::default() };
    for t in Therapy::ALL {
        let m = expected_outcomes(&TherapyParameters::new(t, &monthly).unwrap());
        let w = expected_outcomes(&TherapyParameters::new(t, &weekly).unwrap());
        assert!(within(m.survival_time, w.survival_time, 0.03), "{}: {} vs {}", t, m.survival_time, w.survival_time);
    }
}

#[test]
fn printed_outcomes_name_every_measure() {
    let settings = SimSettings { population_size: 300, ..SimSettings::default() };
    let warfarin = run_cohort(&TherapyParameters::new(Therapy::Warfarin, &settings).unwrap(), 300, 1).unwrap();
    let dab = run_cohort(&TherapyParameters::new(Therapy::Dabigatran150, &settings).unwrap(), 300, 1).unwrap();

    let text = report::outcome_report(&dab, 0.05).unwrap();
    assert!(text.starts_with("Dabigatran 150mg\n"));
    assert!(text.contains("Estimate of mean and 95% CI of survival time:"));
    assert!(text.contains("Estimate of discounted cost and 95% CI: $"));

    let cmp = report::comparative_report(&dab, &warfarin, 0.05, true).unwrap();
    assert!(cmp.starts_with("Dabigatran 150mg vs Warfarin (paired)\n"));
    for measure in ["survival time", "discounted cost", "discounted utility"] {
        assert!(cmp.contains(&format!("Average increase in {} and 95% CI:", measure)), "{}", measure);
    }
}

#[test]
fn higher_stroke_rate_shortens_survival() {
    let base = SimSettings::default();
    let sens = SimSettings { stroke_rate_multiplier: 5.0, ..SimSettings::default() };
    for t in [Therapy::Warfarin, Therapy::Dabigatran110] {
        let p_base = TherapyParameters::new(t, &base).unwrap();
        let p_sens = TherapyParameters::new(t, &sens).unwrap();
        assert!(expected_outcomes(&p_sens).survival_time < expected_outcomes(&p_base).survival_time);

        let c_base = run_cohort(&p_base, 2000, 1).unwrap();
        let c_sens = run_cohort(&p_sens, 2000, 1).unwrap();
        let d = DifferenceStatPaired::new("Increase in survival time", &c_sens.survival_times, &c_base.survival_times)
            .unwrap();
        let (_, hi) = d.t_ci(0.05).unwrap();
        assert!(hi < 0.0, "{}: survival change upper bound {}", t, hi);
        assert!(c_sens.stroke_count_stat().mean() > c_base.stroke_count_stat().mean());
    }
}

#[test]
fn cost_scale_leaves_paths_and_scales_costs() {
    let base = SimSettings { population_size: 300, ..SimSettings::default() };
    let scaled = SimSettings { cost_multiplier: 2.0, ..base.clone() };
    let a = run_cohort(&TherapyParameters::new(Therapy::Warfarin, &base).unwrap(), 300, 7).unwrap();
    let b = run_cohort(&TherapyParameters::new(Therapy::Warfarin, &scaled).unwrap(), 300, 7).unwrap();
    assert_eq!(a.survival_times, b.survival_times);
    assert_eq!(a.utilities, b.utilities);
    for (ca, cb) in a.costs.iter().zip(&b.costs) {
        assert!((cb - 2.0 * ca).abs() <= 1e-9 * ca.abs().max(1.0));
    }
}
