use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use riskmc::analysis::LossReport;
use riskmc::{EventReport, Scenario, Simulation, SimulationConfig, SimulationResult};

/// Monte Carlo risk-event simulator.
///
/// Estimates occurrence probabilities and expected losses for a set of risk
/// events, some conditioned on others. Reproducible for a fixed seed and
/// worker count.
#[derive(Parser, Debug)]
#[command(name = "riskmc")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scenario JSON file. Runs the built-in demo scenario when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Trials per phase
    #[arg(short = 'n', long, default_value = "1000000")]
    trials: u64,

    /// Run seed
    #[arg(long, default_value_t = SimulationConfig::DEFAULT_SEED)]
    seed: u64,

    /// Worker count. Defaults to the number of available cores.
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// NDJSON output: one line per event, then a portfolio line
    #[arg(short, long, default_value = "results.ndjson")]
    output: PathBuf,

    /// Skip the summary table
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record<'a> {
    Event(&'a EventReport),
    Portfolio {
        seed: u64,
        requested_trials: u64,
        executed_trials: u64,
        workers: usize,
        phases: usize,
        loss: &'a LossReport,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> riskmc::Result<()> {
    let scenario = match &args.scenario {
        Some(path) => {
            info!(path = %path.display(), "loading scenario");
            Scenario::from_json_file(path)?
        }
        None => Scenario::canonical(),
    };

    let mut config = SimulationConfig::new(args.trials).with_seed(args.seed);
    if let Some(w) = args.workers {
        config = config.with_workers(w);
    }

    let result = Simulation::new(config, scenario).run()?;
    write_ndjson(&result, &args.output)?;
    info!(path = %args.output.display(), lines = result.events.len() + 1, "results written");

    if !args.quiet {
        print_summary(&result);
    }
    Ok(())
}

fn write_ndjson(result: &SimulationResult, path: &Path) -> riskmc::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for report in &result.events {
        serde_json::to_writer(&mut writer, &Record::Event(report))?;
        writeln!(writer)?;
    }
    let portfolio = Record::Portfolio {
        seed: result.seed,
        requested_trials: result.requested_trials,
        executed_trials: result.executed_trials,
        workers: result.workers,
        phases: result.phases,
        loss: &result.loss,
    };
    serde_json::to_writer(&mut writer, &portfolio)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn print_summary(result: &SimulationResult) {
    println!(
        "Trials: {} per phase ({} requested) | workers: {} | phases: {} | seed: {}",
        result.executed_trials, result.requested_trials, result.workers, result.phases, result.seed
    );

    // ── Per-event table ──────────────────────────────────────────────────────
    println!(
        "\n{:<28} | {:>8} | {:>7} | {:>7} | {:>14} | {:>14} | {:>14}",
        "Event", "Window", "P%", "SD%", "Min loss", "Avg loss", "Max loss"
    );
    println!("{}", "-".repeat(28 + 3 + 8 + 3 + 7 + 3 + 7 + 3 + 14 + 3 + 14 + 3 + 14));

    for report in &result.events {
        let (min, avg, max) = match result.loss.breakdown.get(&report.name) {
            Some(l) => (currency(l.min_loss), currency(l.avg_loss), currency(l.max_loss)),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        println!(
            "{:<28} | {:>8} | {:>6.2}% | {:>6.2}% | {:>14} | {:>14} | {:>14}",
            report.name,
            report.timeframe.label(),
            report.stat.probability * 100.0,
            report.stat.std_dev * 100.0,
            min,
            avg,
            max,
        );
    }

    // ── Controls ─────────────────────────────────────────────────────────────
    let controls: Vec<_> = result.events.iter().filter_map(|r| r.savings.map(|s| (r, s))).collect();
    if !controls.is_empty() {
        println!("\n=== Cost-saving controls ===");
        for (report, savings) in controls {
            println!(
                "  {:<28} saves {} ± {} per occurrence, mitigation {}",
                report.name,
                currency(savings.estimated),
                currency(savings.std_dev),
                currency(savings.mitigation),
            );
            if let (Some(lo), Some(hi)) =
                (report.stat.min_cost_of_implementation, report.stat.max_cost_of_implementation)
            {
                println!("  {:<28} implementation cost {} – {}", "", currency(lo), currency(hi));
            }
        }
    }

    // ── Portfolio ────────────────────────────────────────────────────────────
    let loss = &result.loss;
    println!("\n=== Portfolio ===");
    println!(
        "  Expected loss:   {} (range {} – {})",
        currency(loss.total_avg_loss),
        currency(loss.total_min_loss),
        currency(loss.total_max_loss)
    );
    println!("  Std dev (prob):  {:.4}", loss.total_variance.sqrt());
    println!("  P(loss > min):   {:.2}%", loss.prob_exceed_total_min * 100.0);
    println!("  P(loss > max):   {:.2}%", loss.prob_exceed_total_max * 100.0);
}

fn currency(v: f64) -> String {
    let whole = v.abs().round() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if v < 0.0 && whole > 0 { format!("-${out}") } else { format!("${out}") }
}

#[cfg(test)]
mod tests {
    use super::currency;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(currency(0.0), "$0");
        assert_eq!(currency(999.4), "$999");
        assert_eq!(currency(1_234_567.8), "$1,234,568");
        assert_eq!(currency(-45_000.0), "-$45,000");
        assert_eq!(currency(-0.2), "$0");
    }
}
