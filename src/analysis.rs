//! Cross-column aggregates for the analysis panel: correlation between
//! numeric columns and the mean of a metric over time.
//!
//! Unlike the interval and test functions, these tolerate missing values
//! by using whatever rows are complete for the columns involved.
//!
//! ```
//! use incident_insight::analysis::correlation_matrix;
//! use incident_insight::csv_parser::CsvParser;
//!
//! let df = CsvParser::new()
//!     .parse_str("Incidentes,Perda_USD\n1,10\n2,20\n3,30\n4,40\n")
//!     .unwrap();
//! let corr = correlation_matrix(&df).unwrap();
//! assert!((corr.get(0, 1) - 1.0).abs() < 1e-12);
//! ```

use std::collections::HashMap;

use serde::Serialize;
use statrs::statistics::Statistics;

use crate::dataframe::{Column, DataFrame};
use crate::error::InsightError;

// ── Correlation ───────────────────────────────────────────────────────

/// Square Pearson correlation matrix over the numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    /// Row-major, `names.len()` × `names.len()`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }

    /// Coefficient between two named columns.
    pub fn between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }
}

/// Pairwise Pearson correlation of every numeric column.
///
/// Each pair uses the rows where both columns are present. Pairs with
/// fewer than two such rows, or with a constant side, are NaN. Returns
/// `None` when the table has fewer than two numeric columns.
pub fn correlation_matrix(df: &DataFrame) -> Option<CorrelationMatrix> {
    let numeric: Vec<(&str, &Column)> = df
        .iter()
        .filter(|(_, col)| col.data_type().is_numeric())
        .collect();
    if numeric.len() < 2 {
        return None;
    }

    let k = numeric.len();
    let mut values = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        for j in i..k {
            let r = pairwise_pearson(numeric[i].1, numeric[j].1, df.row_count());
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Some(CorrelationMatrix {
        names: numeric.iter().map(|(name, _)| (*name).to_string()).collect(),
        values,
    })
}

fn pairwise_pearson(a: &Column, b: &Column, rows: usize) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = (0..rows)
        .filter_map(|row| Some((a.numeric_at(row)?, b.numeric_at(row)?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();
    if xs.len() < 2 {
        return f64::NAN;
    }

    let sx = xs.iter().std_dev();
    let sy = ys.iter().std_dev();
    if sx == 0.0 || sy == 0.0 {
        return f64::NAN;
    }
    let r = xs.iter().covariance(ys.iter()) / (sx * sy);
    r.clamp(-1.0, 1.0)
}

// ── Temporal trend ────────────────────────────────────────────────────

/// Mean of a metric for one time value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub mean: f64,
    pub n: usize,
}

/// Mean of `metric_column` per distinct value of `time_column`, ordered
/// by time: numerically for numeric time columns, by label otherwise.
///
/// ```
/// use incident_insight::analysis::temporal_trend;
/// use incident_insight::csv_parser::CsvParser;
///
/// let df = CsvParser::new()
///     .parse_str("Ano,Incidentes\n2021,10\n2020,4\n2021,20\n")
///     .unwrap();
/// let trend = temporal_trend(&df, "Ano", "Incidentes").unwrap();
/// assert_eq!(trend[0].period, "2020");
/// assert_eq!(trend[1].mean, 15.0);
/// ```
pub fn temporal_trend(
    df: &DataFrame,
    time_column: &str,
    metric_column: &str,
) -> Result<Vec<TrendPoint>, InsightError> {
    let time = df.require_column(time_column)?;
    let metric = df.require_numeric(metric_column)?;

    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<(String, Option<f64>, Vec<f64>)> = Vec::new();
    for row in 0..df.row_count() {
        let Some(value) = metric.numeric_at(row).filter(|v| !v.is_nan()) else {
            continue;
        };
        let Some(period) = time.label_at(row) else {
            continue;
        };
        let slot = *slots.entry(period.clone()).or_insert_with(|| {
            buckets.push((period, time.numeric_at(row), Vec::new()));
            buckets.len() - 1
        });
        buckets[slot].2.push(value);
    }

    buckets.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.0.cmp(&b.0),
    });

    Ok(buckets
        .into_iter()
        .map(|(period, _, values)| TrendPoint {
            mean: values.iter().sum::<f64>() / values.len() as f64,
            n: values.len(),
            period,
        })
        .collect())
}

// ── Tests ─────────────────────────────────────────────────────────────
