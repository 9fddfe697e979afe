//! One full recomputation of the analysis panel.
//!
//! Every user selection lives in an [`AnalysisRequest`] that is passed in
//! explicitly; [`run_analysis`] holds no state between calls. Selections
//! left empty fall back to the panel defaults (first numeric column,
//! first categorical column, 95% confidence, first two groups).
//!
//! ```
//! use incident_insight::loader::DatasetLoader;
//! use incident_insight::report::{run_analysis, AnalysisRequest};
//!
//! let csv = "Year,Region,Incidents\n2020,Asia,10\n2021,Asia,12\n2020,Europe,30\n2021,Europe,33\n2022,Asia,11\n";
//! let df = DatasetLoader::default().load(Some(csv.into())).unwrap();
//! let report = run_analysis(&df, &AnalysisRequest::default()).unwrap();
//!
//! assert_eq!(report.classification.categorical, vec!["Região"]);
//! let test = report.hypothesis_test.unwrap();
//! assert_eq!(test.groups, ("Asia".to_string(), "Europe".to_string()));
//! ```

use serde::{Deserialize, Serialize};

use crate::analysis::{correlation_matrix, temporal_trend, CorrelationMatrix, TrendPoint};
use crate::classify::{classify_columns, time_columns, ColumnClassification};
use crate::dataframe::DataFrame;
use crate::error::InsightError;
use crate::inference::{
    grouped_confidence_intervals, two_sample_test, ConfidenceLevel, GroupInterval,
    WelchTestResult,
};
use crate::profiling::{describe_column, describe_numeric_columns, ColumnDescription, DescriptiveSummary};

const DEFAULT_CONFIDENCE_PERCENT: u8 = 95;

/// User selections for one analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisRequest {
    /// Column summarized and compared across groups.
    pub numeric_column: Option<String>,
    pub group_column: Option<String>,
    /// Integer percentage, e.g. 95.
    pub confidence_percent: u8,
    /// Groups to compare. `None` picks the first two labels in row
    /// order; any count other than two skips the test.
    pub selected_groups: Option<Vec<String>>,
    pub time_column: Option<String>,
    /// Metric for the trend; must differ from the time column.
    pub trend_metric: Option<String>,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            numeric_column: None,
            group_column: None,
            confidence_percent: DEFAULT_CONFIDENCE_PERCENT,
            selected_groups: None,
            time_column: None,
            trend_metric: None,
        }
    }
}

/// Summary of the selected numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    #[serde(flatten)]
    pub summary: DescriptiveSummary,
}

/// Trend of one metric over one time column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub time_column: String,
    pub metric: String,
    pub points: Vec<TrendPoint>,
}

/// Per-group intervals at the requested level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    pub numeric_column: String,
    pub group_column: String,
    pub confidence: ConfidenceLevel,
    pub intervals: Vec<GroupInterval>,
}

/// Welch's test between the two selected groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisTest {
    pub groups: (String, String),
    #[serde(flatten)]
    pub result: WelchTestResult,
}

/// Everything the panel displays for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub row_count: usize,
    pub classification: ColumnClassification,
    pub describe: Vec<ColumnDescription>,
    pub summary: Option<ColumnSummary>,
    pub correlation: Option<CorrelationMatrix>,
    pub trend: Option<Trend>,
    pub comparison: Option<GroupComparison>,
    /// Absent unless exactly two groups are selected and each has more
    /// than one value.
    pub hypothesis_test: Option<HypothesisTest>,
}

/// Runs the whole pipeline over a loaded table.
///
/// Fails with [`InsightError::EmptyDataset`] on an empty table, so the
/// caller can halt and tell the user no data is loaded.
pub fn run_analysis(df: &DataFrame, request: &AnalysisRequest) -> Result<AnalysisReport, InsightError> {
    if df.is_empty() {
        return Err(InsightError::EmptyDataset);
    }
    let classification = classify_columns(df);
    let level = ConfidenceLevel::from_percent(request.confidence_percent)?;

    let numeric_column = pick(&request.numeric_column, &classification.numeric);
    let summary = numeric_column
        .map(|column| {
            describe_column(df, column).map(|summary| ColumnSummary {
                column: column.to_string(),
                summary,
            })
        })
        .transpose()?;

    let trend = build_trend(df, request, &classification)?;

    let group_column = pick(&request.group_column, &classification.categorical);
    let (comparison, hypothesis_test) = match (numeric_column, group_column) {
        (Some(numeric), Some(group)) => {
            let intervals = grouped_confidence_intervals(df, numeric, group, level)?;
            let test = compare_selected(df, numeric, group, request.selected_groups.as_deref())?;
            let comparison = GroupComparison {
                numeric_column: numeric.to_string(),
                group_column: group.to_string(),
                confidence: level,
                intervals,
            };
            (Some(comparison), test)
        }
        _ => (None, None),
    };

    tracing::info!(
        rows = df.row_count(),
        numeric = classification.numeric.len(),
        categorical = classification.categorical.len(),
        tested = hypothesis_test.is_some(),
        "analysis complete"
    );

    Ok(AnalysisReport {
        row_count: df.row_count(),
        describe: describe_numeric_columns(df),
        summary,
        correlation: correlation_matrix(df),
        trend,
        comparison,
        hypothesis_test,
        classification,
    })
}

/// Distinct labels of `column` in order of first appearance.
pub fn distinct_labels(df: &DataFrame, column: &str) -> Result<Vec<String>, InsightError> {
    let col = df.require_column(column)?;
    let mut seen = std::collections::HashSet::new();
    Ok((0..df.row_count())
        .filter_map(|row| col.label_at(row))
        .filter(|label| seen.insert(label.clone()))
        .collect())
}

/// The requested name, or the first candidate.
fn pick<'a>(requested: &'a Option<String>, candidates: &'a [String]) -> Option<&'a str> {
    requested
        .as_deref()
        .or_else(|| candidates.first().map(String::as_str))
}

fn build_trend(
    df: &DataFrame,
    request: &AnalysisRequest,
    classification: &ColumnClassification,
) -> Result<Option<Trend>, InsightError> {
    let candidates = time_columns(df);
    let Some(time_column) = pick(&request.time_column, &candidates) else {
        return Ok(None);
    };
    let metrics: Vec<String> = classification
        .numeric
        .iter()
        .filter(|name| name.as_str() != time_column)
        .cloned()
        .collect();
    let Some(metric) = pick(&request.trend_metric, &metrics) else {
        return Ok(None);
    };
    if metric == time_column {
        return Err(InsightError::InvalidParameter {
            name: "trend metric",
            message: format!("'{metric}' is the time column"),
        });
    }

    Ok(Some(Trend {
        points: temporal_trend(df, time_column, metric)?,
        time_column: time_column.to_string(),
        metric: metric.to_string(),
    }))
}

fn compare_selected(
    df: &DataFrame,
    numeric: &str,
    group: &str,
    selected: Option<&[String]>,
) -> Result<Option<HypothesisTest>, InsightError> {
    let selected: Vec<String> = match selected {
        Some(groups) => groups.to_vec(),
        None => distinct_labels(df, group)?.into_iter().take(2).collect(),
    };
    let [a, b] = selected.as_slice() else {
        tracing::debug!(selected = selected.len(), "hypothesis test needs exactly two groups");
        return Ok(None);
    };

    Ok(two_sample_test(df, numeric, group, a, b)?.map(|result| HypothesisTest {
        groups: (a.clone(), b.clone()),
        result,
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────
