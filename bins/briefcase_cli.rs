//! Case base admission CLI
//!
//! Usage:
//!   briefcase_cli check --casebase data/cases --newcase new.jsonl --tolerance HORTY
//!   briefcase_cli add --casebase data/cases --newcase new.jsonl --policy NO_CORRUPTION
//!   briefcase_cli metrics --casebase data/cases
//!   briefcase_cli run-to-rejection --cases data/cases --policy NO --repeats 50 --balanced
//!   briefcase_cli filter-power --cases data/cases --out data/filtered.jsonl --percent 1.0

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use briefcase::config::Config;
use briefcase::dataset::{
    admission_log::{write_admission_log, AdmissionEntry},
    records::{load_case_source, records_to_cases, records_to_cases_lossy, write_case_records},
    sampling::{balanced_shuffle_records, filter_by_power, shuffle_records},
};
use briefcase::reasoning::{CaseBase, CaseBaseConfig, Policy, Tolerance};

#[derive(Parser)]
#[command(name = "briefcase_cli")]
#[command(about = "Precedential constraint case base: consistency checks and admission experiments")]
struct Cli {
    /// TOML config file; built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify new cases against a case base
    Check {
        #[arg(long)]
        casebase: String,
        #[arg(long)]
        newcase: String,
        #[arg(long)]
        tolerance: Option<Tolerance>,
    },
    /// Offer new cases to a case base under a policy and log the decisions
    Add {
        #[arg(long)]
        casebase: String,
        #[arg(long)]
        newcase: String,
        #[arg(long)]
        policy: Option<Policy>,
        #[arg(long)]
        data_dir: Option<String>,
    },
    /// Print size, tainted count and power of a case base
    Metrics {
        #[arg(long)]
        casebase: String,
    },
    /// Admit shuffled orderings of a dataset until the first refusal
    RunToRejection {
        #[arg(long)]
        cases: String,
        #[arg(long)]
        policy: Option<Policy>,
        #[arg(long)]
        repeats: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Alternate pi and delta decisions
        #[arg(long)]
        balanced: bool,
    },
    /// Keep only cases within a share of the maximum power
    FilterPower {
        #[arg(long)]
        cases: String,
        #[arg(long)]
        out: String,
        #[arg(long)]
        percent: Option<f64>,
    },
}

fn load_case_base(path: &str, config: &CaseBaseConfig) -> Result<CaseBase> {
    let records = load_case_source(path)?;
    let cases = records_to_cases(&records)?;

    let case_base = CaseBase::from_cases_with_config(config.clone(), cases);

    tracing::info!("Loaded case base of {} cases from {}", case_base.len(), path);
    Ok(case_base)
}

fn run_check_command(config: &Config, casebase: &str, newcase: &str, tolerance: Tolerance) -> Result<()> {
    let case_base = load_case_base(casebase, &config.case_base)?;
    let new_records = load_case_source(newcase)?;

    for (record, case) in new_records.iter().zip(records_to_cases(&new_records)?) {
        let verdict = case_base.classify(&case, tolerance);
        println!("{}\t{}\t{}", record.fingerprint(), verdict, case);
    }

    Ok(())
}

fn run_add_command(
    config: &Config,
    casebase: &str,
    newcase: &str,
    policy: Policy,
    data_dir: &str,
) -> Result<()> {
    let mut case_base = load_case_base(casebase, &config.case_base)?;
    let new_cases = records_to_cases(&load_case_source(newcase)?)?;

    let mut entries = Vec::with_capacity(new_cases.len());
    for case in new_cases {
        let verdict = case_base.classify(&case, Tolerance::Strict);
        let mut entry = AdmissionEntry::new(&case, policy, false, verdict);
        entry.admitted = case_base.add_case(case, policy);
        entries.push(entry);
    }

    let admitted = entries.iter().filter(|e| e.admitted).count();
    tracing::info!("Admitted {} of {} cases under {}", admitted, entries.len(), policy);

    write_admission_log(data_dir, &entries)?;
    println!("{}", serde_json::to_string_pretty(&case_base.metrics())?);
    Ok(())
}

fn run_metrics_command(config: &Config, casebase: &str) -> Result<()> {
    let case_base = load_case_base(casebase, &config.case_base)?;
    println!("{}", serde_json::to_string_pretty(&case_base.metrics())?);
    Ok(())
}

fn run_to_rejection_command(
    config: &Config,
    cases: &str,
    policy: Policy,
    repeats: usize,
    seed: u64,
    balanced: bool,
) -> Result<()> {
    let records = load_case_source(cases)?;
    if records.is_empty() {
        anyhow::bail!("No case records found in {}", cases);
    }

    let samples = if balanced {
        balanced_shuffle_records(&records, repeats, seed)
    } else {
        shuffle_records(&records, repeats, seed)
    };

    let progress = ProgressBar::new(samples.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?,
    );

    let mut runs = Vec::with_capacity(samples.len());
    for sample in &samples {
        let mut case_base = CaseBase::with_config(config.case_base.clone());
        let run = case_base.admit_until_rejected(records_to_cases_lossy(sample), policy);
        progress.set_message(format!("admitted {}", run.admitted));
        progress.inc(1);
        runs.push(run);
    }
    progress.finish_and_clear();

    let admitted: Vec<usize> = runs.iter().map(|r| r.admitted).collect();
    let total: usize = admitted.iter().sum();
    let mean = total as f64 / admitted.len().max(1) as f64;
    let min = admitted.iter().min().copied().unwrap_or(0);
    let max = admitted.iter().max().copied().unwrap_or(0);

    tracing::info!(
        "{} runs under {}: admitted mean {:.2}, min {}, max {}",
        runs.len(),
        policy,
        mean,
        min,
        max
    );
    println!("{}", serde_json::to_string_pretty(&runs)?);
    Ok(())
}

fn run_filter_power_command(cases: &str, out: &str, percent: f64) -> Result<()> {
    let records = load_case_source(cases)?;
    let kept = filter_by_power(&records, percent);
    write_case_records(out, &kept)?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { casebase, newcase, tolerance } => {
            let tolerance = tolerance.unwrap_or(config.admission.tolerance);
            run_check_command(&config, &casebase, &newcase, tolerance)?;
        }
        Commands::Add { casebase, newcase, policy, data_dir } => {
            let policy = policy.unwrap_or(config.admission.policy);
            let data_dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
            run_add_command(&config, &casebase, &newcase, policy, &data_dir)?;
        }
        Commands::Metrics { casebase } => {
            run_metrics_command(&config, &casebase)?;
        }
        Commands::RunToRejection { cases, policy, repeats, seed, balanced } => {
            let policy = policy.unwrap_or(config.admission.policy);
            let repeats = repeats.unwrap_or(config.experiment.repeats);
            let seed = seed.unwrap_or(config.experiment.seed);
            run_to_rejection_command(&config, &cases, policy, repeats, seed, balanced)?;
        }
        Commands::FilterPower { cases, out, percent } => {
            let percent = percent.unwrap_or(config.experiment.power_percent);
            run_filter_power_command(&cases, &out, percent)?;
        }
    }

    Ok(())
}
