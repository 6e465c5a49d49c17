//! skim CLI

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::info;

use sk_core::RunPeriod;
use sk_engine::{channels, ChannelSpec, Engine};
use sk_ntuple::Sample;

#[derive(Parser)]
#[command(name = "skim")]
#[command(about = "skim - ntuple event reduction with combinatorial candidate selection")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce one or more samples through a channel
    Run {
        /// Channel descriptor (wz, hpp3l, hpp4l)
        #[arg(short, long)]
        channel: String,

        /// Data-taking period (8 or 13)
        #[arg(long, default_value = "13")]
        period: String,

        /// Output directory; one JSON result per sample
        #[arg(short, long)]
        output: PathBuf,

        /// Sample directories, each holding *.json row containers
        #[arg(required = true)]
        samples: Vec<PathBuf>,

        /// Threads (0 = auto). Parallelism is per sample; each sample owns
        /// its output file.
        #[arg(long, default_value = "0")]
        threads: usize,
    },
}

fn build_channel(name: &str, period: RunPeriod) -> Result<ChannelSpec> {
    match name {
        "wz" => Ok(channels::wz(period)),
        "hpp3l" => Ok(channels::hpp3l(period)),
        "hpp4l" => Ok(channels::hpp4l(period)),
        other => bail!("unknown channel '{other}' (expected wz, hpp3l, or hpp4l)"),
    }
}

fn reduce_sample(channel: &str, period: RunPeriod, dir: &Path, out_dir: &Path) -> Result<()> {
    let sample = Sample::from_dir(dir)
        .with_context(|| format!("loading sample from {}", dir.display()))?;
    let mut engine = Engine::new(build_channel(channel, period)?)?;
    engine.process_sample(&sample)?;
    let out = engine.finalize(sample.name.as_str())?;

    let path = out_dir.join(format!("{}.json", out.sample));
    let file = fs::File::create(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &out)?;
    info!(sample = %out.sample, rows = out.table.n_rows(), path = %path.display(), "wrote result");
    Ok(())
}

fn cmd_run(
    channel: &str,
    period: &str,
    output: &Path,
    samples: &[PathBuf],
    threads: usize,
) -> Result<()> {
    let period: RunPeriod = period.parse()?;
    if threads > 0 {
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }

    // Validate the descriptor once up front so a bad channel name or
    // period fails before any sample is touched.
    build_channel(channel, period)?.validate()?;
    fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    samples
        .par_iter()
        .map(|dir| reduce_sample(channel, period, dir, output))
        .collect::<Result<Vec<_>>>()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Run { channel, period, output, samples, threads } => {
            cmd_run(&channel, &period, &output, &samples, threads)
        }
    }
}
