//! Comparison CLI: records an experiment run gains and loses against a baseline.

use anyhow::{Context, Result};
use clap::Parser;
use qaeval::eval::{
    compare_runs, format_percentage, jsonl, metric_deltas, read_hits, DatasetMetrics, MetricDeltas,
    ScoringMode,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Compare two scored runs (output of `qaeval --output`): EM deltas at every
/// cutoff, and the records gained or lost at one cutoff.
#[derive(Parser, Debug)]
#[command(name = "compare")]
struct Args {
    /// Scored JSONL of the experiment run.
    #[arg(long)]
    experiment: PathBuf,

    /// Scored JSONL of the baseline run.
    #[arg(long)]
    baseline: PathBuf,

    /// Cutoff k at which records are partitioned into hits and misses.
    #[arg(long, default_value_t = 5)]
    k: usize,

    /// Cutoffs to report deltas at, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = [1, 5, 10, 50])]
    cutoffs: Vec<usize>,

    /// Compare strict EM instead of normalized EM.
    #[arg(long)]
    strict: bool,

    /// Directory to write hits.jsonl and misses.jsonl into.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Where to write the experiment summary with `em_k_delta` fields (JSON).
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    qaeval::config::validate_cutoffs(&args.cutoffs)?;
    let mode = if args.strict {
        ScoringMode::Strict
    } else {
        ScoringMode::Normalized
    };

    let experiment: Vec<Value> = jsonl::read_jsonl(&args.experiment)
        .with_context(|| format!("Failed to read {}", args.experiment.display()))?;
    let baseline: Vec<Value> = jsonl::read_jsonl(&args.baseline)
        .with_context(|| format!("Failed to read {}", args.baseline.display()))?;

    let experiment_metrics =
        DatasetMetrics::from_scored_lines(args.experiment.display().to_string(), &experiment, &args.cutoffs)?;
    let baseline_metrics =
        DatasetMetrics::from_scored_lines(args.baseline.display().to_string(), &baseline, &args.cutoffs)?;
    let deltas = metric_deltas(&experiment_metrics, &baseline_metrics)?;
    print_deltas(&experiment_metrics, &deltas);

    let comparison = compare_runs(
        &read_hits(&experiment, mode, args.k)?,
        &read_hits(&baseline, mode, args.k)?,
    )?;

    println!("\n=== {} vs baseline ({}) ===", args.experiment.display(), mode.field_name(args.k));
    println!("  Hits (gained):  {}", comparison.hits.len());
    println!("  Misses (lost):  {}", comparison.misses.len());
    println!("  Both hit:       {}", comparison.both);
    println!("  Neither hit:    {}", comparison.neither);
    println!("  Net gain:       {:+}", comparison.net_gain());

    if let Some(path) = &args.summary {
        let mut summary = experiment_metrics.to_summary();
        if let Some(fields) = summary.as_object_mut() {
            fields.extend(deltas.to_fields());
        }
        jsonl::write_json(path, &summary)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote summary to {}", path.display());
    }

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        write_changed(&dir.join("hits.jsonl"), &comparison.hits, &experiment, &baseline)?;
        write_changed(&dir.join("misses.jsonl"), &comparison.misses, &experiment, &baseline)?;
        log::info!("Wrote hits and misses to {}", dir.display());
    }

    Ok(())
}

fn print_deltas(experiment: &DatasetMetrics, deltas: &MetricDeltas) {
    println!("\n=== EM vs baseline: {} ({} records) ===", experiment.name, experiment.records);
    println!("{:<8} {:>10} {:>10} {:>12} {:>10}", "Cutoff", "EM", "Delta", "EM (norm)", "Delta");
    println!("{:-<54}", "");
    for &k in &deltas.cutoffs {
        let value = |mode| experiment.percentage(mode, k).unwrap_or(0.0);
        let delta = |mode| deltas.delta(mode, k).unwrap_or(0.0);
        println!(
            "{:<8} {:>9}% {:>10} {:>11}% {:>10}",
            format!("@{}", k),
            format_percentage(value(ScoringMode::Strict)),
            format!("{:+.2}", delta(ScoringMode::Strict)),
            format_percentage(value(ScoringMode::Normalized)),
            format!("{:+.2}", delta(ScoringMode::Normalized))
        );
    }
}

/// Write the experiment lines for `ids`, tagged with their id and the
/// baseline's ranked predictions.
fn write_changed(path: &Path, ids: &[usize], experiment: &[Value], baseline: &[Value]) -> Result<()> {
    let lines = ids.iter().map(|&id| {
        let mut line = experiment[id - 1].clone();
        if let Value::Object(map) = &mut line {
            map.insert("id".to_string(), json!(id));
            let baseline_qas = baseline[id - 1].get("retrieved_qas").cloned().unwrap_or(Value::Null);
            map.insert("retrieved_qas_baseline".to_string(), baseline_qas);
        }
        line
    });
    jsonl::write_jsonl(path, lines).with_context(|| format!("Failed to write {}", path.display()))
}
