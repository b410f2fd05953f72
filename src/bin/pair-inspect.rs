use anyhow::Context;
use clap::Parser;
use mri_pairs::{init_tracing, inspect_exec, DataSetArgs};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = DataSetArgs::parse();
    let params = args.resolve_params().context("failed to load inspection parameters")?;
    let report = inspect_exec(&args, &params)
        .with_context(|| format!("failed to inspect corpus at {}", args.root.display()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
