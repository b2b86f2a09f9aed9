use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::{
    error::{ConversionError, Result},
    table::{ColumnData, InputTable},
};

/// An integer code column paired with the column that explains each code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagPair {
    pub values: String,
    pub meanings: String,
}

impl FromStr for FlagPair {
    type Err = String;

    /// `VALUES=MEANINGS`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (values, meanings) = s
            .split_once('=')
            .ok_or_else(|| format!("expected VALUES=MEANINGS, got '{s}'"))?;
        if values.trim().is_empty() || meanings.trim().is_empty() {
            return Err(format!("both column names are required, got '{s}'"));
        }
        Ok(Self { values: values.to_string(), meanings: meanings.to_string() })
    }
}

impl fmt::Display for FlagPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.values, self.meanings)
    }
}

/// `flag_values` / `flag_meanings` for the values column of `pair`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagTable {
    pub codes: Vec<i64>,
    pub meanings: String,
}

impl FlagTable {
    /// Distinct codes in ascending order, each described by the meaning on
    /// the first row that carries it.
    pub fn build(table: &InputTable, pair: &FlagPair) -> Result<Self> {
        let values = table
            .column(&pair.values)
            .ok_or_else(|| ConversionError::column(&pair.values, "no such column"))?;
        let meanings = table
            .column(&pair.meanings)
            .ok_or_else(|| ConversionError::column(&pair.meanings, "no such column"))?;

        let ColumnData::Int(codes) = &values.data else {
            return Err(ConversionError::column(
                &values.name,
                format!("flag values must be integers, found {}", values.data.type_name()),
            ));
        };

        let mut first_seen = BTreeMap::new();
        for (row, code) in codes.iter().enumerate() {
            first_seen.entry(*code).or_insert(row);
        }

        let mut meaning_words = Vec::with_capacity(first_seen.len());
        for &row in first_seen.values() {
            let text = meanings.data.cell_string(row).unwrap_or_default();
            meaning_words.push(text.trim().replace(' ', "_"));
        }

        Ok(Self {
            codes: first_seen.into_keys().collect(),
            meanings: meaning_words.join(" "),
        })
    }
}
