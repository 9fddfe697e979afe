//! # incident-insight
//!
//! Statistical analysis core for a cybersecurity incidents dashboard,
//! with C FFI bindings.
//!
//! A CSV of incident records (year, region, country, threat type,
//! severity, incident count, financial loss) is loaded into a typed
//! table, its columns are classified as numeric or categorical, and the
//! analysis panel's statistics are computed on demand:
//!
//! - **Loading**: CSV parsing with type inference, display-name mapping,
//!   default file fallback and a content-addressed cache
//! - **Estimation**: descriptive summaries, t-based confidence intervals
//!   per group, Welch's two-sample t-test, correlation and trends
//!
//! ## Modules
//!
//! - [`dataframe`]: Column-major tabular data model (DataFrame, Column, DataType)
//! - [`csv_parser`]: CSV parsing with automatic type inference
//! - [`loader`]: Dataset source resolution and column renaming
//! - [`cache`]: Content-hash keyed cache of loaded tables
//! - [`classify`]: Numeric / categorical column classification
//! - [`profiling`]: Mean, median, mode, variance and the describe table
//! - [`inference`]: Confidence intervals and Welch's t-test
//! - [`analysis`]: Pearson correlation matrix and temporal trend
//! - [`report`]: One full analysis pass driven by explicit selections
//! - [`ffi`]: C FFI bindings (auto-generated C header via cbindgen)
//! - [`error`]: Error types
//!
//! ## Quick Start
//!
//! ```
//! use incident_insight::classify::classify_columns;
//! use incident_insight::inference::{grouped_confidence_intervals, ConfidenceLevel};
//! use incident_insight::loader::DatasetLoader;
//!
//! let csv = "Year,Region,Incidents\n2020,Asia,10\n2021,Asia,14\n2020,Europe,30\n2021,Europe,34\n";
//! let df = DatasetLoader::default().load(Some(csv.into())).unwrap();
//!
//! let classes = classify_columns(&df);
//! assert_eq!(classes.numeric, vec!["Ano", "Incidentes"]);
//!
//! let level = ConfidenceLevel::from_percent(95).unwrap();
//! let groups = grouped_confidence_intervals(&df, "Incidentes", "Região", level).unwrap();
//! assert_eq!(groups[0].group, "Europe");
//! assert_eq!(groups[0].mean, 32.0);
//! ```

pub mod analysis;
pub mod cache;
pub mod classify;
pub mod csv_parser;
pub mod dataframe;
pub mod error;
pub mod ffi;
pub mod inference;
pub mod loader;
pub mod profiling;
pub mod report;
