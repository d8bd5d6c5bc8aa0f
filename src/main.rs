use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use rusty_sampler::export::{self, DEFAULT_BATCH_SIZE};
use rusty_sampler::{PreprocessConfig, Preprocessor};

/// Turn a raw input/alpha file pair into class-balanced training examples.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Raw input file (`width height` header, then one byte per sample).
    input: PathBuf,

    /// Raw alpha (label) file with the same dimensions.
    alpha: PathBuf,

    /// Neighbourhood side length; must be odd.
    #[arg(short, long, default_value_t = 3)]
    window: usize,

    /// Decode both files again even if the cached CSV/JSON match.
    #[arg(long)]
    refresh: bool,

    /// Write the examples to this Parquet file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Examples per Parquet record batch.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = PreprocessConfig::new(args.window).with_refresh(args.refresh);
    let prepared = Preprocessor::new(config)
        .run(&args.input, &args.alpha)
        .with_context(|| {
            format!(
                "preprocessing {} / {}",
                args.input.display(),
                args.alpha.display()
            )
        })?;

    info!(
        "input {} ({}), alpha {} ({})",
        prepared.input.csv.display(),
        if prepared.input.decoded { "decoded" } else { "cached" },
        prepared.alpha.csv.display(),
        if prepared.alpha.decoded { "decoded" } else { "cached" },
    );

    let counts = prepared.counts();
    let mut examples = prepared.examples();
    match &args.output {
        Some(path) => {
            let summary = export::write_parquet(path, examples.by_ref(), args.batch_size)
                .with_context(|| format!("exporting to {}", path.display()))?;
            println!("Wrote {} examples to {}", summary.examples, path.display());
        }
        None => {
            for example in examples.by_ref() {
                example.context("reading examples")?;
            }
        }
    }

    println!(
        "{} ({}), window {}, {} discarded",
        args.input.display(),
        prepared.dims(),
        prepared.window,
        examples.discarded()
    );
    println!("{:>6} {:>6} {:>10} {:>8}", "label", "index", "available", "emitted");
    for (index, &label) in examples.encoder().labels().iter().enumerate() {
        let available = counts.get(&label).copied().unwrap_or(0);
        let emitted = examples.emitted().get(&label).copied().unwrap_or(0);
        println!("{label:>6} {index:>6} {available:>10} {emitted:>8}");
    }
    Ok(())
}
