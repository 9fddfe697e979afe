//! Descriptive statistics for numeric columns.
//!
//! Missing values are dropped before anything is computed. The functions
//! here are total: an empty sample produces NaN statistics and an absent
//! mode, never an error.
//!
//! # Example
//!
//! ```
//! use incident_insight::profiling::describe;
//!
//! let summary = describe(&[10.0, 20.0, 20.0, 40.0]);
//! assert_eq!(summary.mean, 22.5);
//! assert_eq!(summary.median, 20.0);
//! assert_eq!(summary.mode, Some(20.0));
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::dataframe::DataFrame;
use crate::error::InsightError;

// ── Descriptive Summary ───────────────────────────────────────────────

/// Central tendency and dispersion of one numeric sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveSummary {
    /// Number of non-missing values.
    pub count: usize,
    pub mean: f64,
    /// Middle of the sorted sample (average of the two middle values for
    /// even counts).
    pub median: f64,
    /// Most frequent value; ties go to the value seen first.
    pub mode: Option<f64>,
    /// Sample variance (divisor n − 1).
    pub variance: f64,
    /// `variance.sqrt()`.
    pub std_dev: f64,
}

impl DescriptiveSummary {
    /// Whether the standard deviation exceeds the mean, a sign of a
    /// skewed sample with outliers where the median is the better
    /// typical value.
    pub fn is_highly_dispersed(&self) -> bool {
        self.std_dev > self.mean
    }
}

/// Summarizes a sample. NaN entries count as missing.
pub fn describe(values: &[f64]) -> DescriptiveSummary {
    let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let count = valid.len();

    let mean = if count == 0 {
        f64::NAN
    } else {
        u_numflow::stats::mean(&valid).unwrap_or(f64::NAN)
    };
    let median = if count == 0 {
        f64::NAN
    } else {
        u_numflow::stats::median(&valid).unwrap_or(f64::NAN)
    };
    let variance = if count < 2 {
        f64::NAN
    } else {
        u_numflow::stats::variance(&valid).unwrap_or(f64::NAN)
    };

    DescriptiveSummary {
        count,
        mean,
        median,
        mode: mode(&valid),
        variance,
        std_dev: variance.sqrt(),
    }
}

/// Summarizes the named numeric column of `df`.
pub fn describe_column(df: &DataFrame, column: &str) -> Result<DescriptiveSummary, InsightError> {
    let values = df
        .require_numeric(column)?
        .valid_numeric_values()
        .unwrap_or_default();
    Ok(describe(&values))
}

/// Most frequent value, first occurrence winning ties.
pub fn mode(values: &[f64]) -> Option<f64> {
    // Keyed by bit pattern; -0.0 and 0.0 are folded together.
    let mut counts: HashMap<u64, (usize, usize)> = HashMap::new();
    for (pos, &v) in values.iter().enumerate() {
        let key = if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
        counts.entry(key).or_insert((0, pos)).0 += 1;
    }
    counts
        .values()
        .max_by(|(count_a, first_a), (count_b, first_b)| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|&(_, first)| values[first])
}

// ── Describe table ────────────────────────────────────────────────────

/// One row of the summary table shown for all numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    /// 25th percentile.
    pub q1: f64,
    pub median: f64,
    /// 75th percentile.
    pub q3: f64,
    pub max: f64,
}

/// Count, mean, spread and quartiles of every numeric column, in table
/// order. Non-numeric columns are skipped.
pub fn describe_numeric_columns(df: &DataFrame) -> Vec<ColumnDescription> {
    df.iter()
        .filter_map(|(name, col)| {
            let values: Vec<f64> = col
                .valid_numeric_values()?
                .into_iter()
                .filter(|v| !v.is_nan())
                .collect();
            Some(describe_values(name, &values))
        })
        .collect()
}

fn describe_values(name: &str, valid: &[f64]) -> ColumnDescription {
    let summary = describe(valid);
    let (min, q1, q3, max) = if valid.is_empty() {
        (f64::NAN, f64::NAN, f64::NAN, f64::NAN)
    } else {
        (
            u_numflow::stats::min(valid).unwrap_or(f64::NAN),
            u_numflow::stats::quantile(valid, 0.25).unwrap_or(f64::NAN),
            u_numflow::stats::quantile(valid, 0.75).unwrap_or(f64::NAN),
            u_numflow::stats::max(valid).unwrap_or(f64::NAN),
        )
    };

    ColumnDescription {
        name: name.to_string(),
        count: summary.count,
        mean: summary.mean,
        std_dev: summary.std_dev,
        min,
        q1,
        median: summary.median,
        q3,
        max,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_parser::CsvParser;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summary_of_simple_sample() {
        let s = describe(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        assert_eq!(s.count, 5);
        assert!(close(s.mean, 30.0));
        assert!(close(s.median, 30.0));
        assert!(close(s.variance, 250.0));
        assert!(close(s.std_dev, 250.0f64.sqrt()));
        // all values unique: first one wins
        assert_eq!(s.mode, Some(10.0));
    }

    #[test]
    fn even_count_median_averages_middle() {
        let s = describe(&[4.0, 1.0, 3.0, 2.0]);
        assert!(close(s.median, 2.5));
    }

    #[test]
    fn mode_ties_go_to_first_occurrence() {
        assert_eq!(mode(&[3.0, 1.0, 1.0, 3.0, 2.0]), Some(3.0));
        assert_eq!(mode(&[5.0, 7.0, 7.0, 5.0, 7.0]), Some(7.0));
        assert_eq!(mode(&[]), None);
    }

    #[test]
    fn empty_sample_is_nan_not_error() {
        let s = describe(&[]);
        assert_eq!(s.count, 0);
        assert!(s.mean.is_nan());
        assert!(s.median.is_nan());
        assert!(s.variance.is_nan());
        assert!(s.std_dev.is_nan());
        assert_eq!(s.mode, None);
    }

    #[test]
    fn single_value_has_undefined_spread() {
        let s = describe(&[5.0]);
        assert!(close(s.mean, 5.0));
        assert_eq!(s.mode, Some(5.0));
        assert!(s.variance.is_nan());
    }

    #[test]
    fn variance_non_negative_and_std_is_sqrt() {
        let samples: [&[f64]; 4] = [
            &[1.0, 1.0, 1.0],
            &[-3.0, 7.5, 2.25, 0.0],
            &[1e6, 1e6 + 1.0, 1e6 + 2.0],
            &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
        ];
        for sample in samples {
            let s = describe(sample);
            assert!(s.variance >= 0.0, "{sample:?}");
            assert_eq!(s.std_dev, s.variance.sqrt());
        }
    }

    #[test]
    fn dispersion_flag() {
        assert!(describe(&[1.0, 1.0, 1.0, 100.0]).is_highly_dispersed());
        assert!(!describe(&[100.0, 101.0, 99.0]).is_highly_dispersed());
    }

    #[test]
    fn describe_column_drops_missing() {
        let df = CsvParser::new()
            .parse_str("Incidentes,País\n10,BR\nNA,IN\n30,US\n")
            .unwrap();
        let s = describe_column(&df, "Incidentes").unwrap();
        assert_eq!(s.count, 2);
        assert!(close(s.mean, 20.0));
    }

    #[test]
    fn describe_column_all_missing() {
        let df = CsvParser::new().parse_str("x,y\nNA,1\nNA,2\n").unwrap();
        let s = describe_column(&df, "x").unwrap();
        assert_eq!(s.count, 0);
        assert_eq!(s.mode, None);
        assert!(s.mean.is_nan());
    }

    #[test]
    fn describe_column_rejects_bad_columns() {
        let df = CsvParser::new().parse_str("País\nBR\nIN\n").unwrap();
        assert!(matches!(
            describe_column(&df, "País"),
            Err(InsightError::NonNumericColumn { .. })
        ));
        assert!(matches!(
            describe_column(&df, "Ano"),
            Err(InsightError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn describe_table_covers_numeric_columns() {
        let df = CsvParser::new()
            .parse_str("Ano,País,Incidentes\n2020,BR,1\n2021,IN,2\n2022,US,3\n2023,BR,4\n2024,IN,5\n")
            .unwrap();
        let rows = describe_numeric_columns(&df);
        assert_eq!(rows.len(), 2);
        let inc = &rows[1];
        assert_eq!(inc.name, "Incidentes");
        assert_eq!(inc.count, 5);
        assert!(close(inc.min, 1.0));
        assert!(close(inc.max, 5.0));
        assert!(close(inc.median, 3.0));
        assert!(inc.q1 <= inc.median && inc.median <= inc.q3);
    }
}
