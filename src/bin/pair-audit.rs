use anyhow::Context;
use clap::Parser;
use mri_pairs::audit::{audit, AuditSummary, PairStatus};
use mri_pairs::corpus::Corpus;
use mri_pairs::{init_tracing, InspectParams};
use std::path::PathBuf;

/// checks that every paired volume in a corpus has a readable header and matching shape
#[derive(Debug, Parser)]
struct Args {
    /// corpus root holding one subdirectory per modality
    #[arg(short, long)]
    root: PathBuf,
    /// parameter file for modality names, file pattern and pairing
    #[arg(short, long)]
    params: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let params = match &args.params {
        Some(p) => InspectParams::from_file(p).context("failed to load parameters")?,
        None => InspectParams::default(),
    };

    let corpus = Corpus::discover(
        &args.root,
        &params.source_modality,
        &params.target_modality,
        &params.file_pattern,
        params.pairing,
    )
    .with_context(|| format!("failed to locate corpus at {}", args.root.display()))?;

    let reports = audit(&corpus);
    for r in &reports {
        match &r.status {
            PairStatus::Ok => {
                let shape = r.source_shape.as_deref().unwrap_or_default();
                println!("{}\tok\t{:?}", r.subject, shape)
            }
            PairStatus::ShapeMismatch => println!(
                "{}\tshape mismatch\t{:?} vs {:?}",
                r.subject, r.source_shape, r.target_shape
            ),
            PairStatus::Unreadable(msg) => println!("{}\tunreadable\t{}", r.subject, msg),
        }
    }

    let summary = AuditSummary::from_reports(&reports);
    println!(
        "{} pairs: {} ok, {} mismatched, {} unreadable",
        summary.total, summary.ok, summary.mismatched, summary.unreadable
    );
    if !summary.is_healthy() {
        anyhow::bail!("corpus at {} failed the audit", args.root.display());
    }
    Ok(())
}
