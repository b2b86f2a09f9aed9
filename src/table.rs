use std::{fs, path::Path};

use tracing::{debug, trace};

use crate::error::{ConversionError, Result};

/// Values of one CSV column after type inference.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<i64>),
    /// Empty cells are NaN.
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    /// Picks the narrowest of int64 / double / string that holds every cell.
    ///
    /// Cells are trimmed before numeric parsing. An integer column with an
    /// empty cell is promoted to double so the gap can be NaN; a column with
    /// no value at all is NaN throughout. Zero-length columns stay text.
    pub fn infer(cells: Vec<String>) -> Self {
        if cells.is_empty() {
            return ColumnData::Text(cells);
        }

        let mut has_empty = false;
        let mut all_int = true;
        let mut all_float = true;
        for cell in &cells {
            let t = cell.trim();
            if t.is_empty() {
                has_empty = true;
                continue;
            }
            if all_int && t.parse::<i64>().is_err() {
                all_int = false;
            }
            if !all_int && t.parse::<f64>().is_err() {
                all_float = false;
                break;
            }
        }

        if all_int && !has_empty {
            // every cell parsed above
            let ints = cells.iter().filter_map(|c| c.trim().parse().ok()).collect();
            ColumnData::Int(ints)
        } else if all_float {
            let floats = cells
                .iter()
                .map(|c| c.trim().parse().unwrap_or(f64::NAN))
                .collect();
            ColumnData::Float(floats)
        } else {
            ColumnData::Text(cells)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One cell rendered as text; NaN gaps come back empty.
    pub fn cell_string(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Int(v) => v.get(row).map(i64::to_string),
            ColumnData::Float(v) => v
                .get(row)
                .map(|x| if x.is_nan() { String::new() } else { x.to_string() }),
            ColumnData::Text(v) => v.get(row).cloned(),
        }
    }

    /// netCDF type name the column is written as.
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnData::Int(_) => "int64",
            ColumnData::Float(_) => "double",
            ColumnData::Text(_) => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Header text exactly as read.
    pub name: String,
    pub data: ColumnData,
}

/// A whole CSV file held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTable {
    /// Lines dropped before the header, without line endings.
    pub header_lines: Vec<String>,
    pub columns: Vec<Column>,
    rows: usize,
}

impl InputTable {
    /// Reads `path`, drops its first `skip_rows` lines, and parses the rest.
    pub fn read(path: &Path, skip_rows: usize) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| ConversionError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|e| {
            ConversionError::parse(path, format!("input is not valid UTF-8: {e}"))
        })?;
        Self::parse(path, &text, skip_rows)
    }

    /// Parses CSV text already in memory. `path` is only used in errors.
    pub fn parse(path: &Path, text: &str, skip_rows: usize) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let (header_lines, body) = split_skipped(text, skip_rows).ok_or_else(|| {
            ConversionError::parse(
                path,
                format!("cannot skip {skip_rows} lines, the file is shorter than that"),
            )
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(body.as_bytes());

        let names: Vec<String> = rdr
            .headers()
            .map_err(|e| ConversionError::parse(path, describe(&e, skip_rows)))?
            .iter()
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(ConversionError::parse(
                path,
                format!("no header row after skipping {skip_rows} lines"),
            ));
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        let mut rows = 0;
        for result in rdr.records() {
            let rec = result.map_err(|e| ConversionError::parse(path, describe(&e, skip_rows)))?;
            for (col, field) in cells.iter_mut().zip(rec.iter()) {
                col.push(field.to_string());
            }
            rows += 1;
        }
        trace!(rows, columns = names.len(), "parsed CSV body");

        let columns: Vec<Column> = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| {
                let data = ColumnData::infer(values);
                debug!(column = %name, kind = data.type_name(), "inferred column type");
                Column { name, data }
            })
            .collect();

        Ok(Self { header_lines, columns, rows })
    }

    /// Number of data rows, shared by every column.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Looks a column up by header, falling back to a whitespace-insensitive match.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .or_else(|| self.columns.iter().position(|c| c.name.trim() == name.trim()))
    }
}

/// Splits off the first `n` lines. `None` when the text has fewer lines.
/// Accepts the same line endings as the csv reader.
fn split_skipped(text: &str, n: usize) -> Option<(Vec<String>, &str)> {
    let mut skipped = Vec::with_capacity(n);
    let mut rest = text;
    while skipped.len() < n {
        if rest.is_empty() {
            return None;
        }
        // a line ends at "\r\n", "\n" or a lone "\r"
        let (line, tail) = match rest.find(|c: char| c == '\n' || c == '\r') {
            Some(i) if rest[i..].starts_with("\r\n") => (&rest[..i], &rest[i + 2..]),
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        skipped.push(line.to_string());
        rest = tail;
    }
    Some((skipped, rest))
}

/// Renders a csv error with line numbers counted from the top of the file.
fn describe(err: &csv::Error, skip_rows: usize) -> String {
    match err.kind() {
        csv::ErrorKind::UnequalLengths { pos: Some(pos), expected_len, len } => format!(
            "line {}: expected {} fields, found {}",
            pos.line() + skip_rows as u64,
            expected_len,
            len
        ),
        _ => err.to_string(),
    }
}
