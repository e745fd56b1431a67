//! Text, CSV and HTML output for simulated cohorts and their comparison

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::cba::{break_even_wtp, NmbCurve};
use crate::cea::{Dominance, Frontier, IcerRow};
use crate::cli_input::chrono_lite;
use crate::cohort::CohortResult;
use crate::config::SimSettings;
use crate::error::ModelResult;
use crate::stats::{DifferenceStatIndp, DifferenceStatPaired};

// === NUMBER FORMATTING ===

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumberFormat {
    Plain,
    Currency,
}

/// `1234567.891` with 2 digits -> `1,234,567.89`
pub fn format_number(value: f64, digits: usize, form: NumberFormat) -> String {
    let raw = format!("{:.*}", digits, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (raw.clone(), None),
    };
    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(f) = frac_part {
        grouped.push('.');
        grouped.push_str(&f);
    }
    let sign = if value < 0.0 && grouped.chars().any(|c| c.is_ascii_digit() && c != '0') { "-" } else { "" };
    match form {
        NumberFormat::Plain => format!("{}{}", sign, grouped),
        NumberFormat::Currency => format!("{}${}", sign, grouped),
    }
}

/// `estimate (lower, upper)`
pub fn format_estimate_interval(estimate: f64, interval: (f64, f64), digits: usize, form: NumberFormat) -> String {
    format!(
        "{} ({}, {})",
        format_number(estimate, digits, form),
        format_number(interval.0, digits, form),
        format_number(interval.1, digits, form)
    )
}

fn confidence_label(alpha: f64) -> String {
    format!("{:.0}%", (1.0 - alpha) * 100.0)
}

// === CONSOLE REPORTS ===

/// Mean and t-based interval of survival, strokes, cost and utility for one cohort
pub fn outcome_report(cohort: &CohortResult, alpha: f64) -> ModelResult<String> {
    let ci = confidence_label(alpha);
    let survival = cohort.survival_stat();
    let strokes = cohort.stroke_count_stat();
    let cost = cohort.cost_stat();
    let utility = cohort.utility_stat();

    let mut s = String::new();
    s.push_str(&format!("{}\n", cohort.name));
    s.push_str(&format!(
        "  Estimate of mean and {} CI of survival time: {}\n",
        ci,
        format_estimate_interval(survival.mean(), survival.t_ci(alpha)?, 2, NumberFormat::Plain)
    ));
    s.push_str(&format!(
        "  Estimate of mean and {} CI of number of strokes: {}\n",
        ci,
        format_estimate_interval(strokes.mean(), strokes.t_ci(alpha)?, 2, NumberFormat::Plain)
    ));
    s.push_str(&format!(
        "  Estimate of discounted cost and {} CI: {}\n",
        ci,
        format_estimate_interval(cost.mean(), cost.t_ci(alpha)?, 2, NumberFormat::Currency)
    ));
    s.push_str(&format!(
        "  Estimate of discounted utility and {} CI: {}\n",
        ci,
        format_estimate_interval(utility.mean(), utility.t_ci(alpha)?, 2, NumberFormat::Plain)
    ));
    let stroke_times = cohort.stroke_time_stat();
    if stroke_times.n() >= 2 {
        s.push_str(&format!(
            "  Estimate of mean and {} CI of time to first stroke ({} patients): {}\n",
            ci,
            stroke_times.n(),
            format_estimate_interval(stroke_times.mean(), stroke_times.t_ci(alpha)?, 2, NumberFormat::Plain)
        ));
    }
    Ok(s)
}

/// Increase in survival, cost and utility of `new` over `reference`
pub fn comparative_report(
    new: &CohortResult,
    reference: &CohortResult,
    alpha: f64,
    paired: bool,
) -> ModelResult<String> {
    let ci = confidence_label(alpha);
    let rows: [(&str, &[f64], &[f64], usize, NumberFormat); 3] = [
        ("survival time", &new.survival_times, &reference.survival_times, 2, NumberFormat::Plain),
        ("discounted cost", &new.costs, &reference.costs, 0, NumberFormat::Currency),
        ("discounted utility", &new.utilities, &reference.utilities, 2, NumberFormat::Plain),
    ];

    let mut s = format!("{} vs {}{}\n", new.name, reference.name, if paired { " (paired)" } else { "" });
    for (label, x, y, digits, form) in rows {
        let name = format!("Increase in {}", label);
        let (mean, interval) = if paired {
            let d = DifferenceStatPaired::new(&name, x, y)?;
            (d.mean(), d.t_ci(alpha)?)
        } else {
            let d = DifferenceStatIndp::new(&name, x, y);
            (d.mean(), d.t_ci(alpha)?)
        };
        s.push_str(&format!(
            "  Average increase in {} and {} CI: {}\n",
            label,
            ci,
            format_estimate_interval(mean, interval, digits, form)
        ));
    }
    Ok(s)
}

pub fn ce_table_report(rows: &[IcerRow], frontier: &Frontier, alpha: f64) -> String {
    let ci = confidence_label(alpha);
    let mut s = String::new();
    s.push_str(&format!(
        "{:<22} | {:>10} | {:>8} | {:>32} | {:>26} | {:>12} | {}\n",
        "Strategy",
        "Cost",
        "Effect",
        format!("Incr. cost ({} int.)", ci),
        format!("Incr. effect ({} int.)", ci),
        "ICER",
        "ICER interval"
    ));
    s.push_str(&format!("{}\n", "-".repeat(140)));
    for r in rows {
        let dc = r
            .incremental_cost
            .map(|e| format_estimate_interval(e.mean, (e.lower, e.upper), 0, NumberFormat::Currency))
            .unwrap_or_else(|| "-".into());
        let de = r
            .incremental_effect
            .map(|e| format_estimate_interval(e.mean, (e.lower, e.upper), 2, NumberFormat::Plain))
            .unwrap_or_else(|| "-".into());
        let icer = r.icer.map(|v| format_number(v, 2, NumberFormat::Currency)).unwrap_or_else(|| "-".into());
        let icer_int = r
            .icer_interval
            .map(|(lo, hi)| {
                let money = |v: f64| format_number(v, 2, NumberFormat::Currency);
                format!("({}, {})", money(lo), money(hi))
            })
            .unwrap_or_else(|| "-".into());
        s.push_str(&format!(
            "{:<22} | {:>10} | {:>8.2} | {:>32} | {:>26} | {:>12} | {}\n",
            r.name,
            format_number(r.mean_cost, 0, NumberFormat::Currency),
            r.mean_effect,
            dc,
            de,
            icer,
            icer_int
        ));
    }
    for (strategy, why) in frontier.dominated() {
        let reason = match why {
            Dominance::Dominated { by } => format!("dominated by {}", by),
            Dominance::ExtendedDominated => "extended-dominated".to_string(),
        };
        s.push_str(&format!(
            "{:<22} | {:>10} | {:>8.2} | {}\n",
            strategy.name,
            format_number(strategy.mean_cost(), 0, NumberFormat::Currency),
            strategy.mean_effect(),
            reason
        ));
    }
    s
}

pub fn break_even_report(curves: &[NmbCurve]) -> String {
    let mut s = String::new();
    for c in curves {
        match break_even_wtp(c) {
            Some(wtp) => s.push_str(&format!(
                "  {} vs {}: incremental NMB crosses zero at WTP {}\n",
                c.name,
                c.reference,
                format_number(wtp, 0, NumberFormat::Currency)
            )),
            None => s.push_str(&format!("  {} vs {}: no crossing in the WTP range\n", c.name, c.reference)),
        }
    }
    s
}

// === CSV EXPORT ===

#[derive(Serialize)]
struct PatientRow {
    patient: usize,
    survival_time: f64,
    stroke_count: u32,
    first_stroke_time: Option<f64>,
    discounted_cost: f64,
    discounted_utility: f64,
}

/// One row per simulated patient
pub fn write_observations_csv<P: AsRef<Path>>(cohort: &CohortResult, path: P) -> ModelResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for k in 0..cohort.population_size() {
        writer.serialize(PatientRow {
            patient: k,
            survival_time: cohort.survival_times[k],
            stroke_count: cohort.stroke_counts[k],
            first_stroke_time: cohort.first_stroke_times[k],
            discounted_cost: cohort.costs[k],
            discounted_utility: cohort.utilities[k],
        })?;
    }
    writer.flush()?;
    Ok(())
}

// === HTML REPORT ===

fn js_string(s: &str) -> String {
    format!("{:?}", s)
}

/// Survival curves, survival-time histograms, CE plane and NMB lines
pub fn build_html(cohorts: &[&CohortResult], curves: &[NmbCurve], settings: &SimSettings, summary: &str) -> String {
    let mut survival_traces = Vec::new();
    let mut histogram_traces = Vec::new();
    let mut plane_traces = Vec::new();
    for c in cohorts {
        let years: Vec<f64> = (0..=c.horizon_steps).map(|k| k as f64 * c.delta_t).collect();
        survival_traces.push(format!(
            "{{type:'scatter',mode:'lines',name:{},x:{:?},y:{:?}}}",
            js_string(&c.name),
            years,
            c.survival_curve()
        ));
        histogram_traces.push(format!(
            "{{type:'histogram',opacity:0.6,xbins:{{size:1}},name:{},x:{:?}}}",
            js_string(&c.name),
            c.survival_times
        ));
        plane_traces.push(format!(
            "{{type:'scatter',mode:'markers',marker:{{size:4,opacity:0.3}},name:{},x:{:?},y:{:?}}}",
            js_string(&c.name),
            c.utilities,
            c.costs
        ));
    }

    let mut nmb_traces = Vec::new();
    for c in curves {
        let x: Vec<f64> = c.points.iter().map(|p| p.wtp).collect();
        let mean: Vec<f64> = c.points.iter().map(|p| p.estimate.mean).collect();
        let lower: Vec<f64> = c.points.iter().map(|p| p.estimate.lower).collect();
        let upper: Vec<f64> = c.points.iter().map(|p| p.estimate.upper).collect();
        nmb_traces.push(format!(
            "{{type:'scatter',mode:'lines',line:{{width:0}},showlegend:false,x:{:?},y:{:?}}}",
            x, lower
        ));
        nmb_traces.push(format!(
            "{{type:'scatter',mode:'lines',line:{{width:0}},fill:'tonexty',opacity:0.4,name:{},x:{:?},y:{:?}}}",
            js_string(&format!("{} interval", c.name)),
            x,
            upper
        ));
        nmb_traces.push(format!(
            "{{type:'scatter',mode:'lines',name:{},x:{:?},y:{:?}}}",
            js_string(&format!("{} vs {}", c.name, c.reference)),
            x,
            mean
        ));
    }

    format!(r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>AF Anticoagulation Markov Model</title>
<script src="https://cdn.plot.ly/plotly-2.12.1.min.js"></script>
<style>body{{font-family:monospace;max-width:1200px;margin:0 auto;padding:20px}}pre{{background:#f5f5f5;padding:10px}}</style>
</head><body>
<h1>AF Anticoagulation Markov Model</h1>
<pre>
{}
Patients: {}  |  Horizon: {} years  |  Step: {:.4} years  |  Discount: {:.1}%  |  Seed: {}

{}</pre>
<div id="survival" style="height:400px"></div>
<div id="histogram" style="height:400px"></div>
<div id="plane" style="height:450px"></div>
<div id="nmb" style="height:450px"></div>
<script>
Plotly.newPlot('survival',[{}],{{title:'Survival curve',xaxis:{{title:'Time (years)'}},yaxis:{{title:'Number of alive patients'}}}});
Plotly.newPlot('histogram',[{}],{{title:'Patient survival time',barmode:'overlay',xaxis:{{title:'Survival time (years)'}},yaxis:{{title:'Counts'}}}});
Plotly.newPlot('plane',[{}],{{title:'Cost-effectiveness plane',xaxis:{{title:'Discounted utility (QALY)'}},yaxis:{{title:'Discounted cost ($)'}}}});
Plotly.newPlot('nmb',[{}],{{title:'Incremental net monetary benefit',xaxis:{{title:'Willingness-to-pay for one additional QALY ($)'}},yaxis:{{title:'Incremental NMB ($)'}},
  shapes:[{{type:'line',x0:0,x1:1,xref:'paper',y0:0,y1:0,line:{{color:'gray',dash:'dash'}}}}]}});
</script></body></html>"#,
        chrono_lite(),
        settings.population_size,
        settings.sim_length_years,
        settings.delta_t,
        settings.annual_discount * 100.0,
        settings.seed_base,
        summary,
        survival_traces.join(","),
        histogram_traces.join(","),
        plane_traces.join(","),
        nmb_traces.join(","),
    )
}

pub fn write_html<P: AsRef<Path>>(html: &str, path: P) -> ModelResult<()> {
    File::create(path)?.write_all(html.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::run_cohort;
    use crate::inputs::{Therapy, TherapyParameters};

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.891, 2, NumberFormat::Plain), "1,234,567.89");
        assert_eq!(format_number(-1234.4, 0, NumberFormat::Currency), "-$1,234");
        assert_eq!(format_number(999.0, 0, NumberFormat::Plain), "999");
        assert_eq!(format_number(-0.001, 2, NumberFormat::Plain), "0.00");
        assert_eq!(format_number(12.5, 1, NumberFormat::Currency), "$12.5");
    }

    #[test]
    fn test_format_estimate_interval() {
        assert_eq!(
            format_estimate_interval(10.0, (9.5, 10.25), 2, NumberFormat::Plain),
            "10.00 (9.50, 10.25)"
        );
    }

    #[test]
    fn test_reports_mention_every_metric() {
        let settings = SimSettings { population_size: 200, ..SimSettings::default() };
        let p = TherapyParameters::new(Therapy::Aspirin, &settings).unwrap();
        let c = run_cohort(&p, settings.population_size, 1).unwrap();
        let text = outcome_report(&c, 0.05).unwrap();
        assert!(text.starts_with("Aspirin\n"));
        for key in ["survival time", "number of strokes", "discounted cost", "discounted utility"] {
            assert!(text.contains(key), "missing {}", key);
        }
        assert!(text.contains("95% CI"));

        let cmp = comparative_report(&c, &c, 0.05, true).unwrap();
        assert!(cmp.contains("Average increase in discounted cost and 95% CI: $0 ($0, $0)"));
    }

    #[test]
    fn test_csv_export() {
        let settings = SimSettings { population_size: 10, ..SimSettings::default() };
        let p = TherapyParameters::new(Therapy::Warfarin, &settings).unwrap();
        let c = run_cohort(&p, 10, 1).unwrap();
        let path = std::env::temp_dir().join(format!("afib_markov_obs_{}.csv", std::process::id()));
        write_observations_csv(&c, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "patient,survival_time,stroke_count,first_stroke_time,discounted_cost,discounted_utility"
        );
        assert_eq!(lines.count(), 10);
    }

    #[test]
    fn test_html_contains_plots() {
        let settings = SimSettings { population_size: 20, ..SimSettings::default() };
        let p = TherapyParameters::new(Therapy::Warfarin, &settings).unwrap();
        let c = run_cohort(&p, 20, 1).unwrap();
        let html = build_html(&[&c], &[], &settings, "summary text");
        assert!(html.contains("Plotly.newPlot('survival'"));
        assert!(html.contains("summary text"));
        assert!(html.contains("\"Warfarin\""));
    }
}
