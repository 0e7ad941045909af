//! CLI for probcopa: build the demo's `data.json` from a results directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;
use probcopa_core::{
    BuildOptions, DataLayout, ExperimentConfig, build_dataset, load_config_from_path,
    write_dataset,
};
use sha2::{Digest, Sha256};

#[derive(Parser, Debug)]
#[command(name = "probcopa")]
#[command(about = "Aggregate ProbCOPA human and model results into a single data.json")]
#[command(version = probcopa_core::VERSION)]
struct Cli {
    /// Directory holding `datasets/` and `results/`
    #[arg(long)]
    data_dir: PathBuf,

    /// Output path
    #[arg(long, short, default_value = "data.json")]
    output: PathBuf,

    /// JSON file overriding the experiment topology and estimator settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Indent the output
    #[arg(long)]
    pretty: bool,

    /// Do not insert canary records even if the human file carries a tag
    #[arg(long)]
    no_canary: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> io::Result<()> {
    let cfg = match &cli.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_config_from_path(path)?
        }
        None => ExperimentConfig::default(),
    };

    let layout = DataLayout::new(&cli.data_dir);
    let opts = BuildOptions {
        watermark: !cli.no_canary,
    };
    let dataset = build_dataset(&layout, &cfg, opts)?;

    let size = write_dataset(&dataset, &cli.output, cli.pretty)?;
    let digest = file_digest(&cli.output)?;
    println!(
        "Wrote {} ({:.0} KB, sha256 {})",
        cli.output.display(),
        size as f64 / 1024.0,
        digest
    );
    Ok(())
}

/// SHA-256 of a file, lowercase hex.
fn file_digest(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(hex_encode(&Sha256::digest(&bytes)))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}
