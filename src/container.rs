use std::{borrow::Cow, collections::HashSet, fs, path::Path};

use netcdf::AttributeValue;
use tracing::debug;

use crate::{
    error::{ConversionError, Result},
    flags::FlagTable,
    table::{ColumnData, InputTable},
    time::TimeAxis,
    ConvertOptions,
};

// ─────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────
/// Name given to the variable built from the time column.
pub const TIME_VARIABLE: &str  = "time";
/// netCDF's NC_MAX_NAME, in bytes.
pub const MAX_NAME_LEN:  usize = 256;

// ─────────────────────────────────────────────────────────────────────
// Layout of the output file
// ─────────────────────────────────────────────────────────────────────
/// Attribute value as the converter produces them.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Text(String),
    Codes(Vec<i64>),
}

impl From<&Attr> for AttributeValue {
    fn from(attr: &Attr) -> Self {
        match attr {
            Attr::Text(s) => s.as_str().into(),
            Attr::Codes(c) => c.clone().into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Values<'a> {
    Int(&'a [i64]),
    /// NaN marks a missing cell and is also the fill value.
    Float(Cow<'a, [f64]>),
    Text(&'a [String]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec<'a> {
    pub name: String,
    pub values: Values<'a>,
    pub attributes: Vec<(String, Attr)>,
}

/// Everything that goes into the netCDF file, decided before it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputContainer<'a> {
    pub dimension: String,
    pub rows: usize,
    pub attributes: Vec<(String, Attr)>,
    pub variables: Vec<VariableSpec<'a>>,
}

impl<'a> OutputContainer<'a> {
    /// Lays out one variable per column of `table`.
    ///
    /// Fails on option errors (unknown columns, unparsable time column) so
    /// nothing is written when the request itself is wrong.
    pub fn from_table(
        table: &'a InputTable,
        options: &ConvertOptions,
        source: &str,
        history: String,
    ) -> Result<Self> {
        let time_index = match &options.time_column {
            Some(name) => Some(
                table
                    .column_index(name)
                    .ok_or_else(|| ConversionError::column(name, "no such column"))?,
            ),
            None => None,
        };
        let time_axis = time_index
            .map(|i| TimeAxis::from_column(&table.columns[i]))
            .transpose()?;

        let mut attributes = Vec::new();
        if let Some(title) = &options.title {
            attributes.push(("title".to_string(), Attr::Text(title.clone())));
        }
        attributes.push(("source".to_string(), Attr::Text(source.to_string())));
        attributes.push(("history".to_string(), Attr::Text(history)));
        for (i, line) in table.header_lines.iter().enumerate() {
            attributes.push((format!("header_{i}"), Attr::Text(line.clone())));
        }
        if let Some(axis) = &time_axis {
            attributes.push(("start_time".to_string(), Attr::Text(axis.start_attr())));
            attributes.push(("end_time".to_string(), Attr::Text(axis.end_attr())));
        }

        let desired: Vec<String> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if Some(i) == time_index {
                    TIME_VARIABLE.to_string()
                } else {
                    variable_name(&c.name, i)
                }
            })
            .collect();
        let names = unique_names(desired, time_index);

        let mut variables: Vec<VariableSpec<'a>> = table
            .columns
            .iter()
            .zip(names)
            .enumerate()
            .map(|(i, (column, name))| {
                let mut attrs = vec![("long_name".to_string(), Attr::Text(column.name.clone()))];
                let values = match (&column.data, &time_axis) {
                    (_, Some(axis)) if Some(i) == time_index => {
                        attrs.push(("units".to_string(), Attr::Text(axis.units())));
                        Values::Float(Cow::Owned(axis.seconds.clone()))
                    }
                    (ColumnData::Int(v), _) => Values::Int(v),
                    (ColumnData::Float(v), _) => Values::Float(Cow::Borrowed(v)),
                    (ColumnData::Text(v), _) => Values::Text(v),
                };
                VariableSpec { name, values, attributes: attrs }
            })
            .collect();

        for pair in &options.flags {
            let flags = FlagTable::build(table, pair)?;
            let index = table
                .column_index(&pair.values)
                .ok_or_else(|| ConversionError::column(&pair.values, "no such column"))?;
            let attrs = &mut variables[index].attributes;
            attrs.push(("flag_values".to_string(), Attr::Codes(flags.codes)));
            attrs.push(("flag_meanings".to_string(), Attr::Text(flags.meanings)));
        }

        Ok(Self {
            dimension: options.dimension_name().to_string(),
            rows: table.rows(),
            attributes,
            variables,
        })
    }

    // ─────────────────────────────────────────────────────────────────
    // Write
    // ─────────────────────────────────────────────────────────────────
    /// Creates `path` (replacing whatever is there) and writes every variable.
    /// A file left half-written by a failure is removed.
    pub fn write(&self, path: &Path) -> Result<()> {
        let write_err = |source| ConversionError::Write { path: path.to_path_buf(), source };

        if path.is_file() {
            let _ = fs::remove_file(path);
        }
        let mut nc = netcdf::create(path).map_err(write_err)?;
        let written = self.populate(&mut nc);
        drop(nc);

        if let Err(source) = written {
            let _ = fs::remove_file(path);
            return Err(write_err(source));
        }
        Ok(())
    }

    fn populate(&self, nc: &mut netcdf::FileMut) -> std::result::Result<(), netcdf::Error> {
        nc.add_dimension(&self.dimension, self.rows)?;
        for (name, value) in &self.attributes {
            nc.add_attribute(name, AttributeValue::from(value))?;
        }

        let dims = [self.dimension.as_str()];
        for spec in &self.variables {
            debug!(variable = %spec.name, rows = self.rows, "writing variable");
            let mut var = match &spec.values {
                Values::Int(_) => nc.add_variable::<i64>(&spec.name, &dims)?,
                Values::Float(_) => {
                    let mut v = nc.add_variable::<f64>(&spec.name, &dims)?;
                    v.set_fill_value(f64::NAN)?;
                    v
                }
                Values::Text(_) => nc.add_string_variable(&spec.name, &dims)?,
            };
            for (name, value) in &spec.attributes {
                var.put_attribute(name, AttributeValue::from(value))?;
            }
            if self.rows == 0 {
                continue;
            }
            match &spec.values {
                Values::Int(data) => var.put_values(&data[..], ..)?,
                Values::Float(data) => var.put_values(&data[..], ..)?,
                Values::Text(data) => {
                    for (i, s) in data.iter().enumerate() {
                        var.put_string(s, (i,))?;
                    }
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Variable names
// ─────────────────────────────────────────────────────────────────────
/// Turns a CSV header into a legal netCDF name.
pub fn variable_name(header: &str, index: usize) -> String {
    let mut name: String = header
        .trim()
        .chars()
        .map(|c| if c == '/' || c.is_control() { '_' } else { c })
        .collect();
    if name.is_empty() {
        return format!("column_{index}");
    }
    if !name.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        name.insert(0, '_');
    }
    clip_name(&name, MAX_NAME_LEN).to_string()
}

/// Longest prefix of `name` within `max` bytes, cut on a char boundary.
/// Trailing whitespace is dropped since netCDF rejects it.
fn clip_name(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].trim_end()
}

/// Suffixes repeats with `_1`, `_2`, ... The entry at `reserved` keeps its name.
/// Suffixed names still fit in `MAX_NAME_LEN`.
fn unique_names(desired: Vec<String>, reserved: Option<usize>) -> Vec<String> {
    let mut taken: HashSet<String> = reserved.map(|i| desired[i].clone()).into_iter().collect();
    desired
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if Some(i) == reserved {
                return name.clone();
            }
            let mut candidate = name.clone();
            let mut n = 1;
            while taken.contains(&candidate) {
                let suffix = format!("_{n}");
                candidate = format!("{}{suffix}", clip_name(name, MAX_NAME_LEN - suffix.len()));
                n += 1;
            }
            taken.insert(candidate.clone());
            candidate
        })
        .collect()
}
