//! CSV parsing with per-column type inference.
//!
//! Records are read with the [`csv`] crate (strict record widths), then
//! each column is typed from its content. The inference priority is
//! Numeric → Boolean → Categorical → Text.
//!
//! - A UTF-8 BOM is stripped and every field is trimmed.
//! - Standard null markers are recognized: empty, `NA`, `N/A`, `null`,
//!   `None`, `.`, `NaN`, `#N/A` and their case variants.
//! - A header-only input yields an empty [`DataFrame`].
//!
//! # Example
//!
//! ```
//! use incident_insight::csv_parser::CsvParser;
//! use incident_insight::dataframe::DataType;
//!
//! let csv = "Country,Incidents,Verified\nBrazil,120,true\nIndia,85,false\n";
//! let df = CsvParser::new().parse_str(csv).unwrap();
//! assert_eq!(df.row_count(), 2);
//! assert_eq!(df.column(1).unwrap().data_type(), DataType::Numeric);
//! assert_eq!(df.column(2).unwrap().data_type(), DataType::Boolean);
//! ```

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use crate::dataframe::{Column, DataFrame, DataType, ValidityBitmap};
use crate::error::InsightError;

/// Null markers recognized by default.
pub const DEFAULT_NULL_MARKERS: &[&str] = &[
    "", "NA", "N/A", "na", "n/a", "null", "NULL", "None", "none", ".", "NaN", "nan", "NAN",
    "#N/A", "#NA",
];

/// A column is Categorical when unique/non-null is below this ratio.
const CATEGORICAL_THRESHOLD: f64 = 0.5;

const MAX_CATEGORICAL_UNIQUE: usize = 1000;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV parser configuration and entry point.
#[derive(Debug, Clone)]
pub struct CsvParser {
    delimiter: u8,
    has_header: bool,
    null_markers: Vec<String>,
}

impl CsvParser {
    /// Comma delimiter, header row, standard null markers.
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn delimiter(mut self, delim: u8) -> Self {
        self.delimiter = delim;
        self
    }

    pub fn has_header(mut self, header: bool) -> Self {
        self.has_header = header;
        self
    }

    /// Replaces the default null markers.
    pub fn null_markers(mut self, markers: Vec<String>) -> Self {
        self.null_markers = markers;
        self
    }

    pub fn parse_str(&self, input: &str) -> Result<DataFrame, InsightError> {
        self.parse_bytes(input.as_bytes())
    }

    /// Reads the whole stream, then parses it.
    pub fn parse_reader<R: Read>(&self, mut reader: R) -> Result<DataFrame, InsightError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        self.parse_bytes(&buf)
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<DataFrame, InsightError> {
        let bytes = std::fs::read(path)?;
        self.parse_bytes(&bytes)
    }

    /// Parses raw UTF-8 CSV bytes.
    pub fn parse_bytes(&self, input: &[u8]) -> Result<DataFrame, InsightError> {
        let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
        let (headers, rows) = self.read_records(input)?;
        if headers.is_empty() || rows.is_empty() {
            tracing::debug!(columns = headers.len(), "no data rows, returning empty table");
            return Ok(DataFrame::new());
        }

        let n_cols = headers.len();
        let mut raw_columns: Vec<Vec<&str>> = vec![Vec::with_capacity(rows.len()); n_cols];
        for row in &rows {
            for (col_idx, field) in row.iter().enumerate() {
                raw_columns[col_idx].push(field.trim());
            }
        }

        let mut df = DataFrame::new();
        for (name, raw) in headers.into_iter().zip(raw_columns) {
            let column = self.build_column(&raw);
            tracing::debug!(column = %name, kind = %column.data_type(), "inferred column type");
            df.add_column(name, column).map_err(|e| match e {
                InsightError::DuplicateColumn { name } => InsightError::MalformedInput {
                    line: 1,
                    message: format!("duplicate header '{name}'"),
                },
                other => other,
            })?;
        }
        Ok(df)
    }

    // ── Internal parsing ─────────────────────────────────────────

    fn read_records(
        &self,
        input: &[u8],
    ) -> Result<(Vec<String>, Vec<csv::StringRecord>), InsightError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_header)
            .flexible(false)
            .from_reader(input);

        let mut headers: Vec<String> = if self.has_header {
            reader
                .headers()
                .map_err(malformed)?
                .iter()
                .map(|h| h.trim().to_string())
                .collect()
        } else {
            Vec::new()
        };

        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(malformed)?;

        if !self.has_header {
            let width = rows.first().map_or(0, csv::StringRecord::len);
            headers = (0..width).map(|i| format!("col_{i}")).collect();
        }
        Ok((headers, rows))
    }

    fn is_null(&self, value: &str) -> bool {
        self.null_markers.iter().any(|m| m == value)
    }

    /// Infers the column type and builds a typed [`Column`].
    fn build_column(&self, values: &[&str]) -> Column {
        let non_null: Vec<&str> = values.iter().copied().filter(|v| !self.is_null(v)).collect();
        if non_null.is_empty() {
            return Column::numeric(vec![0.0; values.len()], ValidityBitmap::all_invalid(values.len()));
        }

        match infer_type(&non_null) {
            DataType::Numeric => {
                let (nums, validity) = self.collect(values, 0.0, |v| v.parse().unwrap_or(0.0));
                Column::numeric(nums, validity)
            }
            DataType::Boolean => {
                let (flags, validity) = self.collect(values, false, parse_boolean_str);
                Column::boolean(flags, validity)
            }
            DataType::Categorical => self.build_categorical(values),
            DataType::Text => {
                let (texts, validity) = self.collect(values, String::new(), str::to_string);
                Column::text(texts, validity)
            }
        }
    }

    fn collect<T>(
        &self,
        values: &[&str],
        placeholder: T,
        mut convert: impl FnMut(&str) -> T,
    ) -> (Vec<T>, ValidityBitmap)
    where
        T: Clone,
    {
        let mut out = Vec::with_capacity(values.len());
        let mut validity = ValidityBitmap::empty();
        for &v in values {
            if self.is_null(v) {
                out.push(placeholder.clone());
                validity.push(false);
            } else {
                out.push(convert(v));
                validity.push(true);
            }
        }
        (out, validity)
    }

    fn build_categorical(&self, values: &[&str]) -> Column {
        let mut lookup: HashMap<String, u32> = HashMap::new();
        let mut dictionary: Vec<String> = Vec::new();
        let (indices, validity) = self.collect(values, 0u32, |v| match lookup.get(v) {
            Some(&idx) => idx,
            None => {
                let idx = dictionary.len() as u32;
                dictionary.push(v.to_string());
                lookup.insert(v.to_string(), idx);
                idx
            }
        });
        Column::categorical(dictionary, indices, validity)
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

// ── Helper functions ──────────────────────────────────────────────────

fn malformed(err: csv::Error) -> InsightError {
    let line = err.position().map_or(0, |p| p.line() as usize);
    InsightError::MalformedInput {
        line,
        message: err.to_string(),
    }
}

/// Most specific type that fits every non-null value.
fn infer_type(non_null: &[&str]) -> DataType {
    if non_null.iter().all(|s| s.parse::<f64>().is_ok()) {
        return DataType::Numeric;
    }
    if non_null.iter().all(|s| is_boolean_str(s)) {
        return DataType::Boolean;
    }
    let unique: HashSet<&str> = non_null.iter().copied().collect();
    let ratio = unique.len() as f64 / non_null.len() as f64;
    if ratio < CATEGORICAL_THRESHOLD && unique.len() <= MAX_CATEGORICAL_UNIQUE {
        DataType::Categorical
    } else {
        DataType::Text
    }
}

fn is_boolean_str(s: &str) -> bool {
    matches!(
        s.to_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "t" | "f" | "y" | "n"
    )
}

fn parse_boolean_str(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "yes" | "t" | "y")
}

// ── Tests ─────────────────────────────────────────────────────────────
