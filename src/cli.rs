//! Command-line conversion of network data files.
//!
//! Reads a data file (any supported atom style), normalizes it through the
//! graph store and writes the canonical text with inferred angles.

use crate::{codec, serialization::TopologyFile, EditorConfig, Graph, GraphStore};
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Command-line arguments for the spring network converter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input data file
    #[arg(help = "Path to the input data file")]
    pub input: String,

    /// Output path; standard output when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path to configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace); overrides the
    /// config file's `log_level`
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Level name from the command line, else from the config
    pub fn log_level<'a>(&'a self, config: &'a EditorConfig) -> &'a str {
        self.log_level.as_deref().unwrap_or(&config.log_level)
    }
}

/// Parse the input file and write it back in canonical form
pub fn run(args: &Args) -> Result<()> {
    info!(input_path = args.input, output_path:? = args.output; "Converting network");

    let text = TopologyFile::open(&args.input)?.read_to_string()?;
    let mut store = GraphStore::new(Graph::new());
    store.load_from_string(&text);

    let data = codec::generate(store.graph())
        .with_context(|| format!("Failed to convert: {}", args.input))?;

    match &args.output {
        Some(path) => {
            let path = Path::new(path);
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(data.as_bytes())
                .and_then(|()| writer.flush())
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            info!(output_file = path.display().to_string(); "Data file written");
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(data.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    Ok(())
}
