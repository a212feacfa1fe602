//! Scoring CLI: match a retrieval run against a QA dataset and report EM@k.

use anyhow::{Context, Result};
use clap::Parser;
use qaeval::{
    config::validate_cutoffs,
    eval::{
        format_percentage, jsonl, score_dataset, scored_line, DatasetMetrics, QaRecord,
        RetrievalResult, ScoringMode,
    },
    AnswerMatcher, Config,
};
use std::path::PathBuf;

/// Score ranked predictions with Exact Match at k.
#[derive(Parser, Debug)]
#[command(name = "qaeval", version)]
struct Args {
    /// Dataset JSONL: one {question, answer, answer_alias?} per line.
    #[arg(long)]
    dataset: PathBuf,

    /// Retrieval results JSONL, aligned line-by-line with the dataset.
    #[arg(long)]
    results: PathBuf,

    /// Original (pre-augmentation) dataset JSONL. Its answers become the
    /// reference set; other dataset answers become aliases.
    #[arg(long)]
    original: Option<PathBuf>,

    /// Rewrite ISO-8601 answers and aliases ("2021-12-02") as "December 2, 2021"
    /// before scoring.
    #[arg(long)]
    render_iso_dates: bool,

    /// Where to write the scored records (JSONL).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Where to write the dataset summary (JSON).
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Run name recorded in the summary.
    #[arg(long, default_value = "baseline")]
    name: String,

    /// Cutoffs k, comma separated (overrides config).
    #[arg(long, value_delimiter = ',')]
    cutoffs: Option<Vec<usize>>,

    /// Worker threads (overrides config; 0 = one per core).
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();

    if let Some(cutoffs) = args.cutoffs.clone() {
        validate_cutoffs(&cutoffs)?;
        config.evaluation.cutoffs = cutoffs;
    }
    if let Some(threads) = args.threads {
        config.evaluation.threads = threads;
    }
    if config.evaluation.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.evaluation.threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let records = load_records(&args)?;
    let results: Vec<RetrievalResult> = jsonl::read_jsonl(&args.results)
        .with_context(|| format!("Failed to read results {}", args.results.display()))?;

    log::info!(
        "Scoring {} records at cutoffs {:?}",
        records.len(),
        config.evaluation.cutoffs
    );

    let matcher = AnswerMatcher::from_config(&config.cache);
    let scores = score_dataset(&matcher, &records, &results, &config.evaluation.cutoffs)?;
    let metrics = DatasetMetrics::from_scores(args.name.clone(), &scores)?;

    print_metrics(&metrics);

    if let Some(path) = &args.output {
        let lines = records
            .iter()
            .zip(&results)
            .zip(&scores)
            .map(|((record, result), score)| scored_line(record, result, score));
        jsonl::write_jsonl(path, lines)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote scored records to {}", path.display());
    }

    if let Some(path) = &args.summary {
        jsonl::write_json(path, &metrics.to_summary())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote summary to {}", path.display());
    }

    Ok(())
}

/// Read the dataset, split off aliases against the original answers if given,
/// optionally render ISO dates, and normalize every record's answer lists.
fn load_records(args: &Args) -> Result<Vec<QaRecord>> {
    let mut records: Vec<QaRecord> = jsonl::read_jsonl(&args.dataset)
        .with_context(|| format!("Failed to read dataset {}", args.dataset.display()))?;

    if let Some(path) = &args.original {
        let originals: Vec<QaRecord> = jsonl::read_jsonl(path)
            .with_context(|| format!("Failed to read original dataset {}", path.display()))?;
        if originals.len() != records.len() {
            anyhow::bail!(
                "{} has {} records but {} has {}",
                path.display(),
                originals.len(),
                args.dataset.display(),
                records.len()
            );
        }
        for (record, original) in records.iter_mut().zip(&originals) {
            record.split_aliases(&original.answer);
        }
    }

    for (i, record) in records.iter_mut().enumerate() {
        if args.render_iso_dates {
            record.render_iso_dates();
        }
        record
            .normalize_answers()
            .with_context(|| format!("Invalid record on line {}", i + 1))?;
    }
    Ok(records)
}

fn print_metrics(metrics: &DatasetMetrics) {
    println!("\n=== Evaluation Results: {} ({} records) ===", metrics.name, metrics.records);
    println!("{:<8} {:>10} {:>12}", "Cutoff", "EM", "EM (norm)");
    println!("{:-<32}", "");
    for &k in &metrics.cutoffs {
        let strict = metrics.percentage(ScoringMode::Strict, k).unwrap_or(0.0);
        let normalized = metrics.percentage(ScoringMode::Normalized, k).unwrap_or(0.0);
        println!(
            "{:<8} {:>9}% {:>11}%",
            format!("@{}", k),
            format_percentage(strict),
            format_percentage(normalized)
        );
    }
}
