//! Column-major table for the incidents dataset.
//!
//! A [`DataFrame`] is an ordered set of uniquely named [`Column`]s of equal
//! length. Missing values are tracked per column in a [`ValidityBitmap`]
//! rather than with sentinel values.
//!
//! | Kind | Storage | Classified as |
//! |------|---------|---------------|
//! | [`Numeric`](Column::Numeric) | `Vec<f64>` + bitmap | numeric |
//! | [`Boolean`](Column::Boolean) | `Vec<bool>` + bitmap | categorical |
//! | [`Categorical`](Column::Categorical) | dictionary + `Vec<u32>` | categorical |
//! | [`Text`](Column::Text) | `Vec<String>` + bitmap | categorical |
//!
//! # Example
//!
//! ```
//! use incident_insight::dataframe::{Column, DataFrame, ValidityBitmap};
//!
//! let mut df = DataFrame::new();
//! df.add_column(
//!     "Incidentes".to_string(),
//!     Column::numeric(vec![120.0, 85.0, 240.0], ValidityBitmap::all_valid(3)),
//! )
//! .unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert!(df.add_column("Incidentes".into(), Column::numeric(vec![0.0; 3], ValidityBitmap::all_valid(3))).is_err());
//! ```

use crate::error::InsightError;

// ── ValidityBitmap ────────────────────────────────────────────────────

/// Bit-packed validity flags, one bit per row (1 = present, 0 = missing).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityBitmap {
    words: Vec<u64>,
    len: usize,
}

impl ValidityBitmap {
    /// Creates a bitmap where all `len` positions are present.
    pub fn all_valid(len: usize) -> Self {
        let mut bitmap = Self::empty();
        for _ in 0..len {
            bitmap.push(true);
        }
        bitmap
    }

    /// Creates a bitmap where all `len` positions are missing.
    pub fn all_invalid(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Creates a bitmap with no rows.
    pub fn empty() -> Self {
        Self {
            words: Vec::new(),
            len: 0,
        }
    }

    /// Appends one position.
    pub fn push(&mut self, valid: bool) {
        let (word, bit) = (self.len / 64, self.len % 64);
        if word == self.words.len() {
            self.words.push(0);
        }
        if valid {
            self.words[word] |= 1u64 << bit;
        }
        self.len += 1;
    }

    /// Returns `true` if the value at `idx` is present.
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        (self.words[idx / 64] >> (idx % 64)) & 1 == 1
    }

    /// Marks position `idx` as missing.
    pub fn set_invalid(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        self.words[idx / 64] &= !(1u64 << (idx % 64));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of present positions.
    pub fn valid_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Number of missing positions.
    pub fn null_count(&self) -> usize {
        self.len - self.valid_count()
    }

    /// Iterates over the indices of present positions in row order.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.is_valid(i))
    }
}

// ── DataType ──────────────────────────────────────────────────────────

/// Storage kind inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DataType {
    /// Integer or floating point values, stored as `f64`.
    Numeric,
    Boolean,
    /// Low-cardinality strings (dictionary-encoded).
    Categorical,
    /// High-cardinality or free-form text.
    Text,
}

impl DataType {
    /// Whether the kind counts as a number type for classification.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Numeric)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Numeric => "Numeric",
            Self::Boolean => "Boolean",
            Self::Categorical => "Categorical",
            Self::Text => "Text",
        };
        f.write_str(name)
    }
}

// ── Column ────────────────────────────────────────────────────────────

/// A typed column. Missing positions hold a placeholder (0.0, false,
/// index 0 or an empty string) that is never read.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric {
        values: Vec<f64>,
        validity: ValidityBitmap,
    },
    Boolean {
        values: Vec<bool>,
        validity: ValidityBitmap,
    },
    /// `indices[i]` points into `dictionary`.
    Categorical {
        dictionary: Vec<String>,
        indices: Vec<u32>,
        validity: ValidityBitmap,
    },
    Text {
        values: Vec<String>,
        validity: ValidityBitmap,
    },
}

impl Column {
    pub fn numeric(values: Vec<f64>, validity: ValidityBitmap) -> Self {
        Self::Numeric { values, validity }
    }

    pub fn boolean(values: Vec<bool>, validity: ValidityBitmap) -> Self {
        Self::Boolean { values, validity }
    }

    pub fn categorical(
        dictionary: Vec<String>,
        indices: Vec<u32>,
        validity: ValidityBitmap,
    ) -> Self {
        Self::Categorical {
            dictionary,
            indices,
            validity,
        }
    }

    pub fn text(values: Vec<String>, validity: ValidityBitmap) -> Self {
        Self::Text { values, validity }
    }

    /// Builds a fully present numeric column.
    pub fn from_f64(values: Vec<f64>) -> Self {
        let validity = ValidityBitmap::all_valid(values.len());
        Self::Numeric { values, validity }
    }

    /// Builds a fully present text column.
    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let validity = ValidityBitmap::all_valid(values.len());
        Self::Text { values, validity }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Numeric { .. } => DataType::Numeric,
            Self::Boolean { .. } => DataType::Boolean,
            Self::Categorical { .. } => DataType::Categorical,
            Self::Text { .. } => DataType::Text,
        }
    }

    pub fn len(&self) -> usize {
        self.validity().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validity(&self) -> &ValidityBitmap {
        match self {
            Self::Numeric { validity, .. }
            | Self::Boolean { validity, .. }
            | Self::Categorical { validity, .. }
            | Self::Text { validity, .. } => validity,
        }
    }

    pub fn null_count(&self) -> usize {
        self.validity().null_count()
    }

    pub fn valid_count(&self) -> usize {
        self.validity().valid_count()
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity().is_valid(idx)
    }

    /// Raw numeric storage, or `None` for non-numeric columns.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Present numeric values in row order (missing values dropped).
    pub fn valid_numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            Self::Numeric { values, validity } => {
                Some(validity.valid_indices().map(|i| values[i]).collect())
            }
            _ => None,
        }
    }

    /// Numeric value at `idx`, `None` if missing or not numeric.
    pub fn numeric_at(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Numeric { values, validity } if validity.is_valid(idx) => Some(values[idx]),
            _ => None,
        }
    }

    /// Display label of the value at `idx`, used as a grouping key.
    ///
    /// Numbers use their shortest decimal form (`2015`, `2.5`).
    pub fn label_at(&self, idx: usize) -> Option<String> {
        if !self.is_valid(idx) {
            return None;
        }
        let label = match self {
            Self::Numeric { values, .. } => values[idx].to_string(),
            Self::Boolean { values, .. } => values[idx].to_string(),
            Self::Categorical {
                dictionary,
                indices,
                ..
            } => dictionary.get(indices[idx] as usize)?.clone(),
            Self::Text { values, .. } => values[idx].clone(),
        };
        Some(label)
    }
}

// ── DataFrame ─────────────────────────────────────────────────────────

/// Ordered, uniquely named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl DataFrame {
    /// Creates a table with no columns or rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named column.
    ///
    /// Fails if the name is already taken or the length differs from
    /// the existing columns.
    pub fn add_column(&mut self, name: String, column: Column) -> Result<(), InsightError> {
        if self.names.contains(&name) {
            return Err(InsightError::DuplicateColumn { name });
        }
        if self.columns.is_empty() {
            self.row_count = column.len();
        } else if column.len() != self.row_count {
            return Err(InsightError::DimensionMismatch {
                expected: self.row_count,
                actual: column.len(),
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Renames `from` to `to`. Returns `Ok(false)` if `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<bool, InsightError> {
        let Some(idx) = self.column_index(from) else {
            return Ok(false);
        };
        if from == to {
            return Ok(true);
        }
        if self.column_index(to).is_some() {
            return Err(InsightError::DuplicateColumn { name: to.to_string() });
        }
        self.names[idx] = to.to_string();
        Ok(true)
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Looks up a column, failing with [`InsightError::ColumnNotFound`].
    pub fn require_column(&self, name: &str) -> Result<&Column, InsightError> {
        self.column_by_name(name)
            .ok_or_else(|| InsightError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    /// Looks up a numeric column.
    pub fn require_numeric(&self, name: &str) -> Result<&Column, InsightError> {
        let column = self.require_column(name)?;
        if column.data_type().is_numeric() {
            Ok(column)
        } else {
            Err(InsightError::NonNumericColumn {
                column: name.to_string(),
            })
        }
    }

    /// Iterates over (name, column) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Column names with their storage kinds.
    pub fn schema(&self) -> Vec<(&str, DataType)> {
        self.iter().map(|(name, col)| (name, col.data_type())).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_push_across_word_boundary() {
        let mut bm = ValidityBitmap::empty();
        for i in 0..130 {
            bm.push(i % 3 != 0);
        }
        assert_eq!(bm.len(), 130);
        assert_eq!(bm.null_count(), (0..130).filter(|i| i % 3 == 0).count());
        assert!(!bm.is_valid(129));
        assert!(bm.is_valid(128));
    }

    #[test]
    fn bitmap_all_valid_and_invalid() {
        let valid = ValidityBitmap::all_valid(65);
        assert_eq!(valid.valid_count(), 65);
        assert!(valid.is_valid(64));

        let invalid = ValidityBitmap::all_invalid(65);
        assert_eq!(invalid.null_count(), 65);
        assert_eq!(invalid.valid_indices().count(), 0);
    }

    #[test]
    fn bitmap_set_invalid() {
        let mut bm = ValidityBitmap::all_valid(5);
        bm.set_invalid(1);
        bm.set_invalid(3);
        assert_eq!(bm.valid_indices().collect::<Vec<_>>(), vec![0, 2, 4]);
    }

    #[test]
    fn numeric_values_skip_missing() {
        let mut validity = ValidityBitmap::all_valid(4);
        validity.set_invalid(1);
        let col = Column::numeric(vec![1.0, 0.0, 3.0, 4.0], validity);
        assert_eq!(col.valid_numeric_values(), Some(vec![1.0, 3.0, 4.0]));
        assert_eq!(col.numeric_at(1), None);
        assert_eq!(col.numeric_at(2), Some(3.0));
    }

    #[test]
    fn labels_per_kind() {
        let num = Column::from_f64(vec![2015.0, 2.5]);
        assert_eq!(num.label_at(0).as_deref(), Some("2015"));
        assert_eq!(num.label_at(1).as_deref(), Some("2.5"));

        let flags = Column::boolean(vec![true, false], ValidityBitmap::all_valid(2));
        assert_eq!(flags.label_at(1).as_deref(), Some("false"));

        let mut validity = ValidityBitmap::all_valid(3);
        validity.set_invalid(2);
        let cat = Column::categorical(vec!["Asia".into(), "Europe".into()], vec![1, 0, 0], validity);
        assert_eq!(cat.label_at(0).as_deref(), Some("Europe"));
        assert_eq!(cat.label_at(2), None);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut df = DataFrame::new();
        df.add_column("a".into(), Column::from_f64(vec![1.0])).unwrap();
        let err = df.add_column("a".into(), Column::from_f64(vec![2.0])).unwrap_err();
        assert_eq!(err, InsightError::DuplicateColumn { name: "a".into() });
    }

    #[test]
    fn length_mismatch_rejected() {
        let mut df = DataFrame::new();
        df.add_column("a".into(), Column::from_f64(vec![1.0, 2.0])).unwrap();
        let err = df.add_column("b".into(), Column::from_f64(vec![1.0])).unwrap_err();
        assert!(matches!(err, InsightError::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn rename_column_rules() {
        let mut df = DataFrame::new();
        df.add_column("Year".into(), Column::from_f64(vec![2020.0])).unwrap();
        df.add_column("Ano".into(), Column::from_f64(vec![1.0])).unwrap();
        df.add_column("Loss_USD".into(), Column::from_f64(vec![5.0])).unwrap();

        assert_eq!(df.rename_column("Loss_USD", "Perda_USD"), Ok(true));
        assert_eq!(df.rename_column("Missing", "Other"), Ok(false));
        assert!(df.rename_column("Year", "Ano").is_err());
        assert_eq!(df.column_names(), &["Year", "Ano", "Perda_USD"]);
    }

    #[test]
    fn require_numeric_checks_kind() {
        let mut df = DataFrame::new();
        df.add_column("x".into(), Column::from_f64(vec![1.0])).unwrap();
        df.add_column("label".into(), Column::from_strings(["a"])).unwrap();

        assert!(df.require_numeric("x").is_ok());
        assert!(matches!(
            df.require_numeric("label"),
            Err(InsightError::NonNumericColumn { .. })
        ));
        assert!(matches!(
            df.require_column("nope"),
            Err(InsightError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn schema_lists_kinds_in_order() {
        let mut df = DataFrame::new();
        df.add_column("x".into(), Column::from_f64(vec![1.0])).unwrap();
        df.add_column("ok".into(), Column::boolean(vec![true], ValidityBitmap::all_valid(1)))
            .unwrap();
        assert_eq!(
            df.schema(),
            vec![("x", DataType::Numeric), ("ok", DataType::Boolean)]
        );
    }
}
