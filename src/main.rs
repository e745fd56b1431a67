use std::env;

use log::info;

use afib_markov::cba::{nmb_curves, wtp_range, NmbCurve};
use afib_markov::cea::{build_frontier, icer_table, CeaOptions, Strategy};
use afib_markov::cli_input::{get_bool, get_choice, get_or_default, get_string};
use afib_markov::cohort::{run_cohort, CohortResult};
use afib_markov::config::SimSettings;
use afib_markov::error::{ModelError, ModelResult};
use afib_markov::inputs::{Therapy, TherapyParameters};
use afib_markov::report;
use afib_markov::stats::Interval;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    if args.len() > 1 {
        run_cli(&args[1..]);
        return;
    }

    run_interactive();
}

fn run_cli(args: &[String]) {
    if args.is_empty() {
        print_usage();
        return;
    }

    let result = match args[0].as_str() {
        "simulate" | "s" => {
            if args.len() < 2 {
                eprintln!("Error: therapy required");
                eprintln!("Usage: afib-markov simulate <therapy> [options]");
                return;
            }
            parse_therapies(&args[1..2]).and_then(|t| {
                let opts = parse_options(&args[2..])?;
                run_simulate(t[0], &opts)
            })
        }
        "compare" | "c" => {
            if args.len() < 3 {
                eprintln!("Error: two therapies required");
                eprintln!("Usage: afib-markov compare <therapy> <reference> [options]");
                return;
            }
            parse_therapies(&args[1..3]).and_then(|t| {
                let opts = parse_options(&args[3..])?;
                run_compare(&t, Comparison::Pairwise, &opts)
            })
        }
        "cea" => {
            let names: Vec<String> = args[1..].iter().take_while(|a| !a.starts_with('-')).cloned().collect();
            if names.len() < 2 {
                eprintln!("Error: at least two therapies required");
                eprintln!("Usage: afib-markov cea <therapy> <therapy> [...] [options]");
                return;
            }
            parse_therapies(&names).and_then(|t| {
                let opts = parse_options(&args[1 + names.len()..])?;
                run_compare(&t, Comparison::Frontier, &opts)
            })
        }
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", args[0]);
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }
}

pub struct RunOptions {
    pub settings: SimSettings,
    pub paired: bool,
    pub wtp_max: f64,
    pub csv_prefix: Option<String>,
    pub generate_report: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            settings: SimSettings::default(),
            paired: false,
            wtp_max: 100_000.0,
            csv_prefix: None,
            generate_report: true,
        }
    }
}

fn flag_value<T: std::str::FromStr>(args: &[String], i: usize) -> ModelResult<T> {
    let flag = &args[i];
    let raw = args
        .get(i + 1)
        .ok_or_else(|| ModelError::InvalidSetting(format!("{} needs a value", flag)))?;
    raw.parse()
        .map_err(|_| ModelError::InvalidSetting(format!("invalid value for {}: {}", flag, raw)))
}

fn parse_options(args: &[String]) -> ModelResult<RunOptions> {
    let mut opts = RunOptions::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--population" | "-n" => {
                opts.settings.population_size = flag_value(args, i)?;
                i += 1;
            }
            "--years" | "-y" => {
                opts.settings.sim_length_years = flag_value(args, i)?;
                i += 1;
            }
            "--alpha" | "-a" => {
                opts.settings.alpha = flag_value(args, i)?;
                i += 1;
            }
            "--discount" | "-d" => {
                opts.settings.annual_discount = flag_value(args, i)?;
                i += 1;
            }
            "--dt" => {
                opts.settings.delta_t = flag_value(args, i)?;
                i += 1;
            }
            "--seed" | "-s" => {
                opts.settings.seed_base = flag_value(args, i)?;
                i += 1;
            }
            "--wtp-max" => {
                opts.wtp_max = flag_value(args, i)?;
                i += 1;
            }
            "--csv" => {
                opts.csv_prefix = Some(flag_value(args, i)?);
                i += 1;
            }
            "--stroke-rr" => {
                opts.settings.stroke_rate_multiplier = flag_value(args, i)?;
                i += 1;
            }
            "--cost-scale" => {
                opts.settings.cost_multiplier = flag_value(args, i)?;
                i += 1;
            }
            "--paired" => opts.paired = true,
            "--no-report" => opts.generate_report = false,
            other => return Err(ModelError::InvalidSetting(format!("unknown option: {}", other))),
        }
        i += 1;
    }
    opts.settings.validate()?;
    Ok(opts)
}

fn parse_therapies(names: &[String]) -> ModelResult<Vec<Therapy>> {
    names.iter().map(|n| n.parse()).collect()
}

fn print_usage() {
    println!("afib-markov: AF anticoagulation Markov model");
    println!();
    println!("USAGE:");
    println!("  afib-markov                                   Interactive mode");
    println!("  afib-markov simulate <therapy>                Simulate one cohort");
    println!("  afib-markov compare <therapy> <reference>     Compare two therapies");
    println!("  afib-markov cea <therapy> <therapy> [...]     Cost-effectiveness across therapies");
    println!();
    println!("THERAPIES:");
    println!("  aspirin, dual, warfarin, dabigatran110, dabigatran150");
    println!();
    println!("OPTIONS:");
    println!("  -n, --population <N>     Patients per cohort (default: 2000)");
    println!("  -y, --years <N>          Simulation length in years (default: 20)");
    println!("  -a, --alpha <X>          Significance level (default: 0.05)");
    println!("  -d, --discount <X>       Annual discount rate (default: 0.03)");
    println!("  --dt <X>                 Time step in years (default: 1/12)");
    println!("  -s, --seed <N>           Seed base; patient k uses seed + k (default: 1)");
    println!("  --stroke-rr <X>          Multiply every stroke rate (sensitivity, default: 1)");
    println!("  --cost-scale <X>         Multiply drug and state costs (sensitivity, default: 1)");
    println!("  --paired                 Paired comparison (common random numbers)");
    println!("  --wtp-max <X>            Upper end of the WTP sweep (default: 100000)");
    println!("  --csv <prefix>           Write per-patient observations to <prefix>_<therapy>.csv");
    println!("  --no-report              Skip HTML report generation");
    println!();
    println!("EXAMPLES:");
    println!("  afib-markov simulate warfarin -n 5000");
    println!("  afib-markov compare dabigatran150 warfarin --paired");
    println!("  afib-markov cea aspirin dual warfarin dabigatran110 dabigatran150 --csv run1");
    println!("  afib-markov compare dabigatran110 warfarin --stroke-rr 1.5");
}

// === RUNNERS ===

/// Paired runs reuse the seed base for every therapy; otherwise each cohort
/// gets its own block of seeds
fn simulate_all(therapies: &[Therapy], settings: &SimSettings, paired: bool) -> ModelResult<Vec<CohortResult>> {
    therapies
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            let params = TherapyParameters::new(t, settings)?;
            let offset = if paired { 0 } else { (i * settings.population_size) as u64 };
            run_cohort(&params, settings.population_size, settings.seed_base.wrapping_add(offset))
        })
        .collect()
}

fn csv_path(prefix: &str, cohort: &CohortResult) -> String {
    let slug: String = cohort
        .name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}.csv", prefix, slug)
}

fn export_csv(cohorts: &[CohortResult], opts: &RunOptions) -> ModelResult<()> {
    if let Some(prefix) = &opts.csv_prefix {
        for c in cohorts {
            let path = csv_path(prefix, c);
            report::write_observations_csv(c, &path)?;
            println!("Observations saved: {}", path);
        }
    }
    Ok(())
}

fn save_report(cohorts: &[CohortResult], curves: &[NmbCurve], opts: &RunOptions, summary: &str) -> ModelResult<()> {
    if !opts.generate_report {
        return Ok(());
    }
    let refs: Vec<&CohortResult> = cohorts.iter().collect();
    let html = report::build_html(&refs, curves, &opts.settings, summary);
    report::write_html(&html, "afib_markov_report.html")?;
    println!("Report saved: afib_markov_report.html");
    Ok(())
}

fn run_simulate(therapy: Therapy, opts: &RunOptions) -> ModelResult<()> {
    let cohorts = simulate_all(&[therapy], &opts.settings, false)?;
    let summary = report::outcome_report(&cohorts[0], opts.settings.alpha)?;
    println!("\n{}", summary);
    export_csv(&cohorts, opts)?;
    save_report(&cohorts, &[], opts, &summary)
}

/// Which listed therapy the increments and NMB curves are measured against
#[derive(Clone, Copy, Debug, PartialEq)]
enum Comparison {
    /// `compare <new> <reference>`: the second
    Pairwise,
    /// `cea <t1> <t2> ...`: the first
    Frontier,
}

impl Comparison {
    fn reference_index(self) -> usize {
        match self {
            Comparison::Pairwise => 1,
            Comparison::Frontier => 0,
        }
    }
}

fn run_compare(therapies: &[Therapy], comparison: Comparison, opts: &RunOptions) -> ModelResult<()> {
    let settings = &opts.settings;
    let cohorts = simulate_all(therapies, settings, opts.paired)?;
    let reference_index = comparison.reference_index();
    let reference = &cohorts[reference_index];

    let mut summary = String::new();
    for c in &cohorts {
        summary.push_str(&report::outcome_report(c, settings.alpha)?);
        summary.push('\n');
    }
    for c in cohorts.iter().enumerate().filter(|&(i, _)| i != reference_index).map(|(_, c)| c) {
        summary.push_str(&report::comparative_report(c, reference, settings.alpha, opts.paired)?);
        summary.push('\n');
    }

    let strategies = cohorts.iter().map(Strategy::from_cohort).collect::<ModelResult<Vec<_>>>()?;
    let frontier = build_frontier(&strategies);
    let cea_opts = CeaOptions {
        alpha: settings.alpha,
        interval: Interval::Confidence,
        paired: opts.paired,
        seed: settings.seed_base,
        ..CeaOptions::default()
    };
    let rows = icer_table(&frontier, &cea_opts)?;
    summary.push_str(&report::ce_table_report(&rows, &frontier, settings.alpha));

    let wtps = wtp_range(0.0, opts.wtp_max, 101)?;
    let curves = nmb_curves(&strategies, reference_index, &wtps, settings.alpha, opts.paired)?;
    summary.push_str("\nBreak-even willingness-to-pay:\n");
    summary.push_str(&report::break_even_report(&curves));

    println!("\n{}", summary);
    info!("frontier: {}", frontier.names().join(" -> "));
    export_csv(&cohorts, opts)?;
    save_report(&cohorts, &curves, opts, &summary)
}

// === INTERACTIVE ===

fn run_interactive() {
    println!("\n==========================================");
    println!("   AF Anticoagulation Markov Model");
    println!("==========================================");

    let names: Vec<&str> = Therapy::ALL.iter().map(|t| t.name()).collect();
    let mode = get_choice(
        "\nSelect an option:",
        &["Simulate one therapy", "Compare two therapies", "Cost-effectiveness of all therapies", "Exit"],
    );

    let comparison = if mode == 1 { Comparison::Pairwise } else { Comparison::Frontier };
    let therapies = match mode {
        0 => vec![Therapy::ALL[get_choice("\nTherapy:", &names)]],
        1 => {
            let new = Therapy::ALL[get_choice("\nNew therapy:", &names)];
            let reference = Therapy::ALL[get_choice("\nReference therapy:", &names)];
            vec![new, reference]
        }
        2 => Therapy::ALL.to_vec(),
        _ => {
            println!("Goodbye!");
            return;
        }
    };

    let defaults = SimSettings::default();
    let mut opts = RunOptions::default();
    opts.settings.population_size = get_or_default("Patients per cohort [2000]: ", defaults.population_size);
    opts.settings.sim_length_years = get_or_default("Simulation length in years [20]: ", defaults.sim_length_years);
    opts.settings.seed_base = get_or_default("Seed [1]: ", defaults.seed_base);
    if therapies.len() > 1 {
        opts.paired = get_bool("Paired comparison");
    }
    let prefix = get_string("CSV prefix (Enter to skip): ");
    if !prefix.is_empty() {
        opts.csv_prefix = Some(prefix);
    }
    opts.generate_report = get_bool("Generate HTML report");

    let result = opts.settings.validate().and_then(|_| {
        if therapies.len() == 1 {
            run_simulate(therapies[0], &opts)
        } else {
            run_compare(&therapies, comparison, &opts)
        }
    });
    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }
}
