use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use codonscan::{
    Codon, EndpointReport, LocalStore, ScanOrchestrator, ScanOutcome, ScanParams, ShardedStore,
    SimilarityModel, SimilarityParams,
};

#[derive(Parser, Debug)]
#[command(
    name = "codonscan",
    about = "Recover aligned codon subsequences from end-points reported by a forward scan"
)]
struct Cli {
    /// Main codon sequence (base letters agct, three per codon).
    main_seq: PathBuf,
    /// Match codon sequence (base letters agct, three per codon).
    match_seq: PathBuf,
    /// End-point reports, one `mainEnd matchEnd score` triple per line,
    /// 0-based.
    reports: PathBuf,

    /// Score for exactly matching codons.
    #[arg(long, default_value_t = 5)]
    exact: i32,
    /// Score for distinct codons of the same amino acid.
    #[arg(long, default_value_t = 4)]
    similar: i32,
    /// Score for codons of different amino acids.
    #[arg(long, default_value_t = -3, allow_negative_numbers = true)]
    dissimilar: i32,
    /// Penalty to open a gap.
    #[arg(long, default_value_t = 5)]
    gap_start: i32,
    /// Penalty per codon inside a gap.
    #[arg(long, default_value_t = 2)]
    gap_extend: i32,
    /// Longest interesting match, including gaps.
    #[arg(long, default_value_t = 66)]
    match_limit: usize,

    /// Stop after this many accepted alignments.
    #[arg(long, default_value_t = 100)]
    max_reports: usize,
    /// Minimum Chebyshev separation between accepted start-points.
    #[arg(long, default_value_t = 5)]
    min_separation: u64,
    /// Number of accepted alignments to print in full.
    #[arg(long, default_value_t = 10)]
    display: usize,
    /// Spread the sequences over this many in-process shards.
    #[arg(long, default_value_t = 1)]
    shards: usize,
    /// Re-score every accepted alignment and fail on a mismatch.
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let model = SimilarityModel::new(SimilarityParams {
        exact: cli.exact,
        similar: cli.similar,
        dissimilar: cli.dissimilar,
        gap_start: cli.gap_start,
        gap_extend: cli.gap_extend,
        match_limit: cli.match_limit,
    })?;

    let main_seq = read_codon_file(&cli.main_seq)
        .with_context(|| format!("failed to read main sequence from {}", cli.main_seq.display()))?;
    let match_seq = read_codon_file(&cli.match_seq).with_context(|| {
        format!("failed to read match sequence from {}", cli.match_seq.display())
    })?;
    let reports = read_report_file(&cli.reports)
        .with_context(|| format!("failed to read reports from {}", cli.reports.display()))?;

    for (idx, report) in reports.iter().enumerate() {
        if report.main_end >= main_seq.len() as u64 || report.match_end >= match_seq.len() as u64 {
            bail!(
                "report {idx} end-point ({}, {}) is outside the sequences",
                report.main_end,
                report.match_end
            );
        }
    }

    let params = ScanParams::new(cli.max_reports, cli.min_separation);
    let outcome = if cli.shards > 1 {
        let store = ShardedStore::in_process(main_seq, match_seq, cli.shards)
            .context("sequences do not partition evenly over the requested shards")?;
        ScanOrchestrator::new(&model, &store, params).run(&reports)
    } else {
        let store = LocalStore::new(main_seq, match_seq);
        ScanOrchestrator::new(&model, &store, params).run(&reports)
    };

    present(&model, &outcome, cli.display);

    if cli.verify {
        verify_scores(&model, &outcome)?;
    }
    Ok(())
}

/// Print the run summary the way the surrounding program expects it.
fn present(model: &SimilarityModel, outcome: &ScanOutcome, display: usize) {
    if outcome.alignments.is_empty() {
        println!("\nFound no acceptable alignments.");
    } else {
        let first = outcome.alignments[0].score;
        let last = outcome.alignments[outcome.alignments.len() - 1].score;
        println!(
            "\nFound {} acceptable alignments with scores from {} to {}.",
            outcome.alignments.len(),
            first,
            last
        );
        if display > 0 {
            println!("\nStarting   Amino     Codon           Ending");
            println!("position   acids     bases           position");
        }
        for alignment in outcome.alignments.iter().take(display) {
            println!(
                "{:>7}  {}  {}  {:>7}",
                alignment.start_main,
                model.amino_chain(&alignment.aligned_main),
                model.codon_chain(&alignment.aligned_main),
                alignment.end_main
            );
            println!(
                "{:>7}  {}  {}  {:>7}",
                alignment.start_match,
                model.amino_chain(&alignment.aligned_match),
                model.codon_chain(&alignment.aligned_match),
                alignment.end_match
            );
        }
    }

    println!(
        "\nAccepted {} of {} reports.",
        outcome.accepted_count(),
        outcome.requested
    );
    for skip in &outcome.skipped {
        println!("report {} skipped: {}", skip.report, skip.reason);
    }
}

/// Re-score every alignment from its reconstructed sequences.
fn verify_scores(model: &SimilarityModel, outcome: &ScanOutcome) -> Result<()> {
    let mut failures = 0;
    for (idx, alignment) in outcome.alignments.iter().enumerate() {
        let rescored = model.rescore(&alignment.aligned_main, &alignment.aligned_match);
        if rescored != alignment.score {
            eprintln!(
                "verification of alignment {idx} failed: reported {} versus rescored {}",
                alignment.score, rescored
            );
            failures += 1;
        }
    }
    if failures > 0 {
        bail!("{failures} alignments failed score verification");
    }
    println!("All {} alignments verified.", outcome.alignments.len());
    Ok(())
}

/// Parse a whitespace-insensitive base-letter file into codons.
fn read_codon_file(path: &Path) -> Result<Vec<Codon>> {
    let text = fs::read_to_string(path)?;
    let bases: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if bases.len() % 3 != 0 {
        bail!("{} base letters do not form whole codons", bases.len());
    }
    bases
        .chunks(3)
        .enumerate()
        .map(|(idx, chunk)| {
            Codon::from_bases([chunk[0], chunk[1], chunk[2]])
                .with_context(|| format!("codon {idx} holds a letter outside agct"))
        })
        .collect()
}

/// Parse `mainEnd matchEnd score` triples, one per line. Blank lines and
/// `#` comments are ignored.
fn read_report_file(path: &Path) -> Result<Vec<EndpointReport>> {
    let text = fs::read_to_string(path)?;
    let mut reports = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let parse = |field: Option<&str>, name: &str| -> Result<i64> {
            field
                .with_context(|| format!("line {}: missing {name}", lineno + 1))?
                .parse::<i64>()
                .with_context(|| format!("line {}: {name} is not an integer", lineno + 1))
        };
        let main_end = parse(fields.next(), "main end-point")?;
        let match_end = parse(fields.next(), "match end-point")?;
        let score = parse(fields.next(), "score")?;
        if main_end < 0 || match_end < 0 {
            bail!("line {}: end-points must be non-negative", lineno + 1);
        }
        let score = i32::try_from(score)
            .map_err(|_| anyhow::anyhow!("line {}: score does not fit in 32 bits", lineno + 1))?;
        reports.push(EndpointReport::new(main_end as u64, match_end as u64, score));
    }
    Ok(reports)
}
