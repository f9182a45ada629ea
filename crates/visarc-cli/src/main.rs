//! visarc - turn a raw visibility dump into a compressed, transposed
//! archive by assembling a pipeline configuration and handing it to the
//! external execution engine.

mod runner;

use clap::Parser;
use std::path::PathBuf;

use runner::EngineRunner;
use visarc_config::{ArchiveConfig, ChunkGeometry, TruncationConfig};

#[derive(Parser, Debug)]
#[command(
    name = "visarc",
    version,
    about = "Transform a raw receiver dump into a transposed, bitshuffle-compressed archive"
)]
struct Cli {
    /// Path to the raw receiver dump
    infile: PathBuf,

    /// Path for the compressed, transposed archive
    outfile: PathBuf,

    /// Log level for this process and the pipeline engine
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Chunk size of the transposed archive
    #[arg(
        long,
        num_args = 3,
        value_names = ["FREQ", "PROD", "TIME"],
        default_values_t = [16, 16, 16]
    )]
    chunk: Vec<u32>,

    /// Truncation profile TOML file (explicit precision flags take
    /// precedence over it)
    #[arg(long, value_name = "FILE")]
    truncation_profile: Option<PathBuf>,

    /// Maximum tolerated squared relative error
    #[arg(long, value_name = "ERR")]
    err_sq_lim: Option<f64>,

    /// Fixed precision for visibility data
    #[arg(long, value_name = "PREC")]
    data_fixed_precision: Option<f64>,

    /// Fixed precision for weights
    #[arg(long, value_name = "PREC")]
    weight_fixed_precision: Option<f64>,

    /// Number of correlator elements
    #[arg(long, default_value_t = 2048)]
    num_elements: u32,

    /// Number of blocks to advise the OS to read ahead of the reader
    #[arg(long, value_name = "N")]
    readahead_blocks: Option<u32>,

    /// Maximum reader rate in MB/s (unset means unlimited)
    #[arg(long, value_name = "RATE")]
    max_read_rate: Option<f64>,

    /// Seconds the reader pauses after the read before signalling shutdown
    #[arg(long, value_name = "SECS")]
    sleep_time: Option<f64>,

    /// Pipeline engine binary to hand the configuration to
    #[arg(long, default_value = "visrunner", value_name = "BIN")]
    engine: PathBuf,

    /// Print the assembled configuration to stdout instead of running the
    /// engine
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Resolve the truncation precision policy: profile file first, then
    /// explicit flag overrides.
    fn truncation(&self) -> anyhow::Result<TruncationConfig> {
        let mut truncation = match &self.truncation_profile {
            Some(path) => TruncationConfig::load(path)?,
            None => TruncationConfig::default(),
        };
        if let Some(v) = self.err_sq_lim {
            truncation.err_sq_lim = v;
        }
        if let Some(v) = self.data_fixed_precision {
            truncation.data_fixed_precision = v;
        }
        if let Some(v) = self.weight_fixed_precision {
            truncation.weight_fixed_precision = v;
        }
        Ok(truncation)
    }

    /// Build the conversion options from the parsed arguments.
    fn archive_config(&self) -> anyhow::Result<ArchiveConfig> {
        // clap guarantees exactly three values for --chunk.
        let chunk = ChunkGeometry::new(self.chunk[0], self.chunk[1], self.chunk[2])?;
        let mut config = ArchiveConfig::new(&self.infile, &self.outfile)
            .with_chunk(chunk)
            .with_truncation(self.truncation()?)
            .with_log_level(&self.log_level)
            .with_num_elements(self.num_elements);
        config.readahead_blocks = self.readahead_blocks;
        config.max_read_rate = self.max_read_rate;
        config.sleep_time = self.sleep_time;
        Ok(config)
    }
}

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(log_level)
        .map_err(|e| anyhow::anyhow!("invalid log level '{log_level}': {e}"))?;
    // Logs go to stderr so --dry-run can emit clean JSON on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let pipeline = cli.archive_config()?.assemble()?;

    if cli.dry_run {
        println!("{}", pipeline.to_json()?);
        return Ok(());
    }

    let status = EngineRunner::new(&cli.engine).run(&pipeline)?;
    if !status.success() {
        // The conversion is atomic pass/fail: surface the engine's exit
        // code as our own.
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
