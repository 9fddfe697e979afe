//! Confidence intervals for the mean and Welch's two-sample t-test.
//!
//! Both rely on Student's t distribution. Samples too small to estimate
//! a variance (fewer than two values) never raise an error: intervals
//! come back with absent bounds and the t-test with no result.
//!
//! # Example
//!
//! ```
//! use incident_insight::inference::{mean_confidence_interval, welch_t_test, ConfidenceLevel};
//!
//! let level = ConfidenceLevel::from_percent(95).unwrap();
//! let (lower, upper) = mean_confidence_interval(&[10.0, 20.0, 30.0, 40.0, 50.0], level).unwrap();
//! assert!(lower < 30.0 && 30.0 < upper);
//!
//! let test = welch_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[10.0, 11.0, 12.0, 13.0, 14.0]).unwrap();
//! assert!(test.t_statistic < 0.0);
//! assert!(test.p_value < 0.01);
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::dataframe::DataFrame;
use crate::error::InsightError;

// ── Confidence level ──────────────────────────────────────────────────

/// Two-sided confidence level in the open interval (0, 1).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct ConfidenceLevel(f64);

impl ConfidenceLevel {
    pub fn new(level: f64) -> Result<Self, InsightError> {
        if level > 0.0 && level < 1.0 {
            Ok(Self(level))
        } else {
            Err(InsightError::InvalidParameter {
                name: "confidence level",
                message: format!("{level} is not in (0, 1)"),
            })
        }
    }

    /// Level from an integer percentage (the panel's slider uses 80..=99).
    pub fn from_percent(percent: u8) -> Result<Self, InsightError> {
        Self::new(f64::from(percent) / 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Percentage for labels such as `IC95%`.
    pub fn percent(self) -> f64 {
        self.0 * 100.0
    }

    /// Two-tailed t critical value with `df` degrees of freedom.
    pub fn t_critical(self, df: f64) -> Option<f64> {
        t_dist(df).map(|t| t.inverse_cdf((1.0 + self.0) / 2.0))
    }
}

impl Default for ConfidenceLevel {
    fn default() -> Self {
        Self(0.95)
    }
}

// ── t-distribution helpers ────────────────────────────────────────────

/// Standard Student's t(df); `None` when `df` is not a positive number.
fn t_dist(df: f64) -> Option<StudentsT> {
    StudentsT::new(0.0, 1.0, df).ok()
}

/// Bessel-corrected mean and variance. Caller guarantees `n >= 2`.
fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (mean, ss / (n - 1.0))
}

fn drop_missing(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

// ── Single-sample interval ────────────────────────────────────────────

/// t-based interval for the mean: x̄ ± t(n−1) · s/√n.
///
/// NaN values are dropped first; `None` when fewer than two remain.
pub fn mean_confidence_interval(values: &[f64], level: ConfidenceLevel) -> Option<(f64, f64)> {
    let valid = drop_missing(values);
    let n = valid.len();
    if n < 2 {
        return None;
    }
    let (mean, variance) = mean_and_variance(&valid);
    let standard_error = (variance / n as f64).sqrt();
    let margin = level.t_critical((n - 1) as f64)? * standard_error;
    Some((mean - margin, mean + margin))
}

// ── Grouped intervals ─────────────────────────────────────────────────

/// Interval for the mean of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupInterval {
    pub group: String,
    /// Rows in the group after dropping missing values.
    pub n: usize,
    pub mean: f64,
    /// Absent when `n < 2`.
    pub lower: Option<f64>,
    /// Absent when `n < 2`.
    pub upper: Option<f64>,
}

/// Per-group intervals of `numeric_column`, grouped by the labels of
/// `group_column`, sorted by descending mean.
///
/// Rows missing either column are dropped. Groups with a single row are
/// kept with absent bounds.
///
/// ```
/// use incident_insight::csv_parser::CsvParser;
/// use incident_insight::inference::{grouped_confidence_intervals, ConfidenceLevel};
///
/// let df = CsvParser::new()
///     .parse_str("Região,Incidentes\nAsia,10\nAsia,14\nEurope,30\nEurope,34\nAfrica,5\n")
///     .unwrap();
/// let rows = grouped_confidence_intervals(&df, "Incidentes", "Região", ConfidenceLevel::default()).unwrap();
/// let order: Vec<&str> = rows.iter().map(|r| r.group.as_str()).collect();
/// assert_eq!(order, ["Europe", "Asia", "Africa"]);
/// assert!(rows[2].lower.is_none());
/// ```
pub fn grouped_confidence_intervals(
    df: &DataFrame,
    numeric_column: &str,
    group_column: &str,
    level: ConfidenceLevel,
) -> Result<Vec<GroupInterval>, InsightError> {
    let groups = group_values(df, numeric_column, group_column)?;

    let mut intervals: Vec<GroupInterval> = groups
        .into_iter()
        .map(|(group, values)| {
            let bounds = mean_confidence_interval(&values, level);
            GroupInterval {
                n: values.len(),
                mean: values.iter().sum::<f64>() / values.len() as f64,
                lower: bounds.map(|(lo, _)| lo),
                upper: bounds.map(|(_, hi)| hi),
                group,
            }
        })
        .collect();

    // Stable: equal means keep ascending label order.
    intervals.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    tracing::debug!(groups = intervals.len(), column = numeric_column, "grouped intervals");
    Ok(intervals)
}

/// Values of `numeric_column` keyed by group label (ascending), rows
/// missing either side dropped.
pub fn group_values(
    df: &DataFrame,
    numeric_column: &str,
    group_column: &str,
) -> Result<BTreeMap<String, Vec<f64>>, InsightError> {
    let values = df.require_numeric(numeric_column)?;
    let groups = df.require_column(group_column)?;

    let mut out: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in 0..df.row_count() {
        let Some(value) = values.numeric_at(row).filter(|v| !v.is_nan()) else {
            continue;
        };
        let Some(label) = groups.label_at(row) else {
            continue;
        };
        out.entry(label).or_default().push(value);
    }
    Ok(out)
}

// ── Welch's t-test ────────────────────────────────────────────────────

/// Outcome of Welch's unequal-variance t-test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WelchTestResult {
    pub t_statistic: f64,
    /// Two-tailed.
    pub p_value: f64,
    /// Welch–Satterthwaite degrees of freedom.
    pub degrees_of_freedom: f64,
    pub n_a: usize,
    pub n_b: usize,
    pub mean_a: f64,
    pub mean_b: f64,
}

impl WelchTestResult {
    /// Whether the null hypothesis of equal means is rejected at `alpha`.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Welch's t-test of `a` against `b`.
///
/// NaN values are dropped from each sample. Returns `None` unless both
/// samples keep more than one value.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<WelchTestResult> {
    let a = drop_missing(a);
    let b = drop_missing(b);
    if a.len() < 2 || b.len() < 2 {
        return None;
    }

    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let (mean_a, var_a) = mean_and_variance(&a);
    let (mean_b, var_b) = mean_and_variance(&b);
    let (se2_a, se2_b) = (var_a / n_a, var_b / n_b);
    let standard_error = (se2_a + se2_b).sqrt();
    let diff = mean_a - mean_b;

    let t_statistic = diff / standard_error;
    let degrees_of_freedom =
        (se2_a + se2_b).powi(2) / (se2_a.powi(2) / (n_a - 1.0) + se2_b.powi(2) / (n_b - 1.0));

    let p_value = if t_statistic.is_nan() {
        f64::NAN
    } else if t_statistic.is_infinite() {
        0.0
    } else {
        t_dist(degrees_of_freedom)
            .map(|t| (2.0 * t.sf(t_statistic.abs())).min(1.0))
            .unwrap_or(f64::NAN)
    };

    Some(WelchTestResult {
        t_statistic,
        p_value,
        degrees_of_freedom,
        n_a: a.len(),
        n_b: b.len(),
        mean_a,
        mean_b,
    })
}

/// Welch's t-test between the rows of `group_column` labelled `group_a`
/// and those labelled `group_b`.
///
/// `Ok(None)` means the precondition (more than one value per group) is
/// not met and nothing should be displayed.
pub fn two_sample_test(
    df: &DataFrame,
    numeric_column: &str,
    group_column: &str,
    group_a: &str,
    group_b: &str,
) -> Result<Option<WelchTestResult>, InsightError> {
    let values = df.require_numeric(numeric_column)?;
    let groups = df.require_column(group_column)?;

    let mut sample_a = Vec::new();
    let mut sample_b = Vec::new();
    for row in 0..df.row_count() {
        let Some(label) = groups.label_at(row) else {
            continue;
        };
        let target = if label == group_a {
            &mut sample_a
        } else if label == group_b {
            &mut sample_b
        } else {
            continue;
        };
        if let Some(v) = values.numeric_at(row) {
            target.push(v);
        }
    }

    let result = welch_t_test(&sample_a, &sample_b);
    if result.is_none() {
        tracing::debug!(
            group_a,
            group_b,
            n_a = sample_a.len(),
            n_b = sample_b.len(),
            "t-test skipped: each group needs more than one value"
        );
    }
    Ok(result)
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_parser::CsvParser;

    fn level(p: u8) -> ConfidenceLevel {
        ConfidenceLevel::from_percent(p).unwrap()
    }

    #[test]
    fn confidence_level_bounds() {
        assert!(ConfidenceLevel::new(0.0).is_err());
        assert!(ConfidenceLevel::new(1.0).is_err());
        assert!(ConfidenceLevel::new(f64::NAN).is_err());
        assert!(ConfidenceLevel::from_percent(100).is_err());
        assert_eq!(level(95).value(), 0.95);
        assert_eq!(ConfidenceLevel::default(), level(95));
    }

    #[test]
    fn t_critical_known_values() {
        // t_{0.975, 4} = 2.776445
        let t = level(95).t_critical(4.0).unwrap();
        assert!((t - 2.776_445).abs() < 1e-4, "{t}");
        assert!(level(95).t_critical(0.0).is_none());
    }

    #[test]
    fn interval_of_simple_sample() {
        let (lo, hi) = mean_confidence_interval(&[10.0, 20.0, 30.0, 40.0, 50.0], level(95)).unwrap();
        // 30 ± 2.776445 * sqrt(250 / 5)
        let margin = 2.776_445 * 50.0f64.sqrt();
        assert!((lo - (30.0 - margin)).abs() < 1e-3);
        assert!((hi - (30.0 + margin)).abs() < 1e-3);
        assert!(lo < 30.0 && 30.0 < hi);
        assert!(hi - lo > 0.0);
    }

    #[test]
    fn single_value_has_no_interval() {
        assert_eq!(mean_confidence_interval(&[5.0], level(95)), None);
        assert_eq!(mean_confidence_interval(&[], level(95)), None);
        assert_eq!(mean_confidence_interval(&[5.0, f64::NAN], level(95)), None);
    }

    #[test]
    fn interval_brackets_mean() {
        let samples: [&[f64]; 3] = [&[1.0, 2.0], &[3.0, 3.0, 3.0], &[-5.0, 0.5, 12.0, 7.25]];
        for sample in samples {
            let mean = sample.iter().sum::<f64>() / sample.len() as f64;
            for p in [80, 90, 95, 99] {
                let (lo, hi) = mean_confidence_interval(sample, level(p)).unwrap();
                assert!(lo <= mean && mean <= hi, "{sample:?} at {p}%");
            }
        }
    }

    #[test]
    fn width_grows_with_confidence() {
        let sample = [12.0, 15.0, 9.0, 21.0, 17.0, 11.0];
        let width = |p| {
            let (lo, hi) = mean_confidence_interval(&sample, level(p)).unwrap();
            hi - lo
        };
        assert!(width(80) <= width(95));
        assert!(width(95) <= width(99));
    }

    #[test]
    fn welch_separated_groups() {
        let r = welch_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[10.0, 11.0, 12.0, 13.0, 14.0]).unwrap();
        assert!((r.t_statistic + 9.0).abs() < 1e-9);
        assert!((r.degrees_of_freedom - 8.0).abs() < 1e-9);
        assert!(r.p_value < 0.01);
        assert!(r.is_significant(0.05));
        assert_eq!((r.n_a, r.n_b), (5, 5));
    }

    #[test]
    fn welch_unequal_variances() {
        // t ≈ -1.46 with df ≈ 3.03
        let a = [19.0, 20.0, 21.0, 20.0, 20.0];
        let b = [15.0, 35.0, 25.0, 30.0];
        let r = welch_t_test(&a, &b).unwrap();
        let se = (0.5f64 / 5.0 + (218.75f64 / 3.0) / 4.0).sqrt();
        assert!((r.t_statistic - (20.0 - 26.25) / se).abs() < 1e-9);
        assert!(r.degrees_of_freedom > 3.0 && r.degrees_of_freedom < 4.0);
        assert!(r.p_value > 0.05 && r.p_value < 0.5);
    }

    #[test]
    fn welch_is_antisymmetric() {
        let a = [3.1, 4.7, 2.2, 5.9, 4.4];
        let b = [6.3, 5.1, 7.7, 6.0];
        let ab = welch_t_test(&a, &b).unwrap();
        let ba = welch_t_test(&b, &a).unwrap();
        assert_eq!(ab.t_statistic, -ba.t_statistic);
        assert_eq!(ab.p_value, ba.p_value);
    }

    #[test]
    fn welch_requires_two_values_each() {
        assert!(welch_t_test(&[1.0], &[2.0, 3.0]).is_none());
        assert!(welch_t_test(&[1.0, 2.0], &[f64::NAN, 3.0]).is_none());
    }

    #[test]
    fn welch_zero_spread() {
        let r = welch_t_test(&[1.0, 1.0], &[2.0, 2.0]).unwrap();
        assert!(r.t_statistic.is_infinite() && r.t_statistic < 0.0);
        assert_eq!(r.p_value, 0.0);

        let r = welch_t_test(&[1.0, 1.0], &[1.0, 1.0]).unwrap();
        assert!(r.t_statistic.is_nan());
        assert!(r.p_value.is_nan());
    }

    fn incidents() -> DataFrame {
        CsvParser::new()
            .parse_str(
                "Região,Incidentes\n\
                 Asia,10\nAsia,12\nAsia,14\n\
                 Europe,30\nEurope,NA\nEurope,34\n\
                 Africa,20\nAfrica,22\n\
                 Oceania,3\n\
                 NA,100\n",
            )
            .unwrap()
    }

    #[test]
    fn grouped_intervals_sorted_by_mean() {
        let rows = grouped_confidence_intervals(&incidents(), "Incidentes", "Região", level(95)).unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(order, ["Europe", "Africa", "Asia", "Oceania"]);
        assert!(rows.windows(2).all(|w| w[0].mean > w[1].mean));

        let europe = &rows[0];
        assert_eq!(europe.n, 2);
        assert_eq!(europe.mean, 32.0);
        assert!(europe.lower.unwrap() < 32.0 && 32.0 < europe.upper.unwrap());

        let oceania = &rows[3];
        assert_eq!(oceania.n, 1);
        assert_eq!((oceania.lower, oceania.upper), (None, None));
    }

    #[test]
    fn grouped_intervals_by_numeric_group() {
        let df = CsvParser::new()
            .parse_str("Ano,Incidentes\n2020,1\n2020,3\n2021,10\n2021,12\n")
            .unwrap();
        let rows = grouped_confidence_intervals(&df, "Incidentes", "Ano", level(90)).unwrap();
        assert_eq!(rows[0].group, "2021");
        assert_eq!(rows[1].group, "2020");
    }

    #[test]
    fn grouped_intervals_column_errors() {
        let df = incidents();
        assert!(matches!(
            grouped_confidence_intervals(&df, "Região", "Incidentes", level(95)),
            Err(InsightError::NonNumericColumn { .. })
        ));
        assert!(matches!(
            grouped_confidence_intervals(&df, "Incidentes", "País", level(95)),
            Err(InsightError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn two_sample_test_on_table() {
        let df = incidents();
        let r = two_sample_test(&df, "Incidentes", "Região", "Asia", "Europe")
            .unwrap()
            .unwrap();
        assert_eq!((r.n_a, r.n_b), (3, 2));
        assert!(r.t_statistic < 0.0);
        assert_eq!(r.mean_b, 32.0);
    }

    #[test]
    fn two_sample_test_precondition() {
        let df = incidents();
        assert_eq!(
            two_sample_test(&df, "Incidentes", "Região", "Asia", "Oceania").unwrap(),
            None
        );
        assert_eq!(
            two_sample_test(&df, "Incidentes", "Região", "Asia", "Antarctica").unwrap(),
            None
        );
    }
}
