use anyhow::Context;
use clap::Parser;
use mri_pairs::InspectParams;
use std::path::PathBuf;

#[derive(Debug, Parser)]
struct Args {
    /// path to inspection parameters file to write
    parameter_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filename = InspectParams::default()
        .write(&args.parameter_file)
        .with_context(|| format!("can't write {}", args.parameter_file.display()))?;
    println!("wrote default parameter file to {}", filename.display());
    Ok(())
}
