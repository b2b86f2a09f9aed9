//! Convert a CSV table into a NetCDF4 file.
//!
//! Every column becomes a one-dimensional variable over a single dimension
//! sized to the number of data rows. Column types are inferred: int64 when
//! every cell is an integer, double when every non-empty cell is numeric,
//! variable-length string otherwise.
//!
//! ```no_run
//! use std::path::Path;
//! use csv_to_netcdf::{convert, default_output_path, ConvertOptions};
//!
//! let input = Path::new("ozone.csv");
//! let options = ConvertOptions { skip_rows: 5, ..Default::default() };
//! convert(input, &default_output_path(input), &options)?;
//! # Ok::<(), csv_to_netcdf::ConversionError>(())
//! ```

pub mod container;
pub mod error;
pub mod flags;
pub mod table;
pub mod time;

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::Local;
use tracing::{debug, info};

pub use container::OutputContainer;
pub use error::{ConversionError, Result};
pub use flags::FlagPair;
pub use table::{Column, ColumnData, InputTable};

// ─────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────
/// Dimension name used when none is given and there is no time column.
pub const DEFAULT_DIMENSION: &str = "row";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertOptions {
    /// Lines dropped before the header row.
    pub skip_rows: usize,
    /// Column holding timestamps, written as `time` in seconds since midnight.
    pub time_column: Option<String>,
    /// Overrides the dimension name.
    pub dimension: Option<String>,
    /// Global `title` attribute.
    pub title: Option<String>,
    pub flags: Vec<FlagPair>,
}

impl ConvertOptions {
    pub fn dimension_name(&self) -> &str {
        match (&self.dimension, &self.time_column) {
            (Some(d), _) => d,
            (None, Some(_)) => container::TIME_VARIABLE,
            (None, None) => DEFAULT_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionSummary {
    pub rows: usize,
    pub variables: usize,
}

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────
/// `data/ozone.csv` → `data/ozone.nc`
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("nc")
}

fn timeit<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let t0 = Instant::now();
    let out = f();
    debug!(step = label, elapsed = ?t0.elapsed(), "step finished");
    out
}

// ─────────────────────────────────────────────────────────────────────
// CSV → NetCDF
// ─────────────────────────────────────────────────────────────────────
/// Reads `input`, then writes `output` from scratch.
///
/// The input is parsed and every option checked before the output is
/// touched, so input and option errors never leave a file behind.
pub fn convert(input: &Path, output: &Path, options: &ConvertOptions) -> Result<ConversionSummary> {
    info!(input = %input.display(), output = %output.display(), skip_rows = options.skip_rows, "converting");

    let table = timeit("read_csv", || InputTable::read(input, options.skip_rows))?;

    let source = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let history = format!("Created at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let container = OutputContainer::from_table(&table, options, &source, history)?;

    timeit("write_netcdf", || container.write(output))?;

    let summary = ConversionSummary { rows: table.rows(), variables: container.variables.len() };
    info!(rows = summary.rows, variables = summary.variables, "wrote {}", output.display());
    Ok(summary)
}
