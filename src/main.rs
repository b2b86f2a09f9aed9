// USAGE cargo run --release -- [-o OUTFILE] [-s SKIPROWS] input.csv

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Result};
use clap::Parser;
use csv_to_netcdf::{convert, default_output_path, ConvertOptions, FlagPair};
use tracing::Level;

// ─────────────────────────────────────────────────────────────────────
// CLI
// ─────────────────────────────────────────────────────────────────────
/// Convert csv file to netCDF file.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Name of CSV file to convert
    input_file: PathBuf,

    /// Name of netCDF file to be created. Defaults to the input name with a .nc extension
    #[arg(short, long)]
    outfile: Option<PathBuf>,

    /// Number of lines in the input to skip before the column headers
    #[arg(short, long, default_value_t = 0)]
    skiprows: usize,

    /// Column of timestamps to store as `time`, in seconds since midnight of the first day
    #[arg(short, long)]
    time_column: Option<String>,

    /// Name of the row dimension [default: row, or time with --time-column]
    #[arg(short, long)]
    dimension: Option<String>,

    /// Global title attribute
    #[arg(long)]
    title: Option<String>,

    /// Attach flag_values/flag_meanings to an integer column, as VALUES=MEANINGS
    #[arg(short, long = "flag", value_name = "VALUES=MEANINGS")]
    flags: Vec<FlagPair>,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────
/// True when both paths name the same file. Paths that do not exist yet
/// are compared as written.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

// ─────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────
fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let output = args.outfile.unwrap_or_else(|| default_output_path(&args.input_file));
    if same_file(&output, &args.input_file) {
        bail!("output {} would overwrite the input, pass -o", output.display());
    }

    let options = ConvertOptions {
        skip_rows:   args.skiprows,
        time_column: args.time_column,
        dimension:   args.dimension,
        title:       args.title,
        flags:       args.flags,
    };
    let summary = convert(&args.input_file, &output, &options)?;
    eprintln!(
        "Finished OK, wrote {} rows × {} variables → {}",
        summary.rows,
        summary.variables,
        output.display()
    );

    Ok(())
}
