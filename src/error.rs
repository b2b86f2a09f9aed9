use std::{io, path::PathBuf};

use thiserror::Error;

/// Everything that can stop a conversion.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Input file missing or unreadable.
    #[error("cannot read input file {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Input readable but not a well-formed table.
    #[error("malformed CSV in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Output could not be created or written.
    #[error("cannot write output file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    /// A column named by an option is missing or unusable for that role.
    #[error("column '{column}': {message}")]
    Column { column: String, message: String },
}

impl ConversionError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse { path: path.into(), message: message.into() }
    }

    pub(crate) fn column(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Column { column: column.into(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;
