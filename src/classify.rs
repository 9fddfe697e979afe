//! Type Classifier: splits a table's columns into numeric and categorical.
//!
//! A column is numeric when its storage kind is a number type; Boolean,
//! Categorical and Text columns are all categorical. Every column lands
//! in exactly one list, in table order.
//!
//! ```
//! use incident_insight::classify::classify_columns;
//! use incident_insight::csv_parser::CsvParser;
//!
//! let df = CsvParser::new()
//!     .parse_str("Ano,Região,Incidentes\n2020,Asia,10\n2021,Asia,12\n2022,Asia,9\n")
//!     .unwrap();
//! let classes = classify_columns(&df);
//! assert_eq!(classes.numeric, vec!["Ano", "Incidentes"]);
//! assert_eq!(classes.categorical, vec!["Região"]);
//! ```

use serde::Serialize;

use crate::dataframe::DataFrame;

/// Name fragments that mark a column as a time axis candidate.
const TIME_NAME_HINTS: &[&str] = &["ano", "data", "year", "date"];

/// Partition of a table's column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnClassification {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl ColumnClassification {
    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric.iter().any(|n| n == name)
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical.iter().any(|n| n == name)
    }

    /// Whether both a numeric target and a grouping column exist.
    pub fn supports_group_comparison(&self) -> bool {
        !self.numeric.is_empty() && !self.categorical.is_empty()
    }
}

/// Classifies every column of `df`. Never fails; an empty table gives
/// two empty lists.
pub fn classify_columns(df: &DataFrame) -> ColumnClassification {
    let mut classes = ColumnClassification::default();
    for (name, column) in df.iter() {
        if column.data_type().is_numeric() {
            classes.numeric.push(name.to_string());
        } else {
            classes.categorical.push(name.to_string());
        }
    }
    tracing::debug!(
        numeric = classes.numeric.len(),
        categorical = classes.categorical.len(),
        "classified columns"
    );
    classes
}

/// Columns whose name suggests a time axis (`Ano`, `Year`, `Data`, ...).
pub fn time_columns(df: &DataFrame) -> Vec<String> {
    df.column_names()
        .iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            TIME_NAME_HINTS.iter().any(|hint| lower.contains(hint))
        })
        .cloned()
        .collect()
}
