//! xml2csv CLI
//!
//! ```bash
//! xml2csv -c people.xml -i data/ -o out/ --recursive
//! ```

use clap::Parser;
use log::{LevelFilter, error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use xml2csv::{OutputManager, Xml2CsvError, XmlDataExtractor, config, files};

#[derive(Parser)]
#[command(name = "xml2csv")]
#[command(about = "Extract CSV files from XML documents using XPath mappings", long_about = None)]
struct Cli {
    /// Mapping configuration file(s)
    #[arg(short, long = "config", required = true, num_args = 1..)]
    configs: Vec<PathBuf>,

    /// Input XML file or directory
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the CSV files are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Descend into subdirectories of the input directory
    #[arg(short, long)]
    recursive: bool,

    /// Append to existing CSV files instead of overwriting them
    #[arg(short, long)]
    append: bool,

    /// Trim leading and trailing whitespace from extracted values
    #[arg(short, long)]
    trim: bool,

    /// Create the output directory if it does not exist
    #[arg(long)]
    create_output_dir: bool,

    /// More logging (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::Error,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        }
    }
}

fn run(cli: &Cli) -> Result<bool, Xml2CsvError> {
    let config = config::load_files(&cli.configs)?;
    files::ensure_output_dir(&cli.output_dir, cli.create_output_dir)?;
    let inputs = files::find_input_files(&cli.input, cli.recursive)?;

    let mut outputs = OutputManager::initialise(&cli.output_dir, &config, cli.append)?;
    let summary = XmlDataExtractor::new(&config)
        .with_trim_whitespace(cli.trim)
        .extract_files(&inputs, &mut outputs);
    outputs.close()?;

    info!(
        "Done: {} processed, {} skipped, {} failed",
        summary.processed,
        summary.skipped,
        summary.failed.len()
    );
    Ok(summary.failed.is_empty())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
