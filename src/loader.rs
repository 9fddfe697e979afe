//! Dataset Loader: resolves the input source, parses it and applies the
//! display-name mapping for the known incident columns.
//!
//! When no source is given the configured default file is used; if that
//! file does not exist the loader returns an empty [`DataFrame`] and the
//! caller is expected to check [`DataFrame::is_empty`] before analysing.
//!
//! ```
//! use incident_insight::loader::{DatasetLoader, DatasetSource};
//!
//! let csv = "Year,Threat_Type,Loss_USD,Notes\n2020,Phishing,1000,x\n2021,Malware,2500,y\n";
//! let df = DatasetLoader::default()
//!     .load(Some(DatasetSource::from(csv)))
//!     .unwrap();
//! assert_eq!(df.column_names(), &["Ano", "Tipo de Ameaça", "Perda_USD", "Notes"]);
//! ```

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::csv_parser::{CsvParser, DEFAULT_NULL_MARKERS};
use crate::dataframe::DataFrame;
use crate::error::InsightError;

/// File loaded when the caller provides no source.
pub const DEFAULT_DATASET_PATH: &str = "Global_Cybersecurity_Threats_2015-2024.csv";

/// Known source columns and their display names.
pub const COLUMN_RENAMES: [(&str, &str); 7] = [
    ("Year", "Ano"),
    ("Region", "Região"),
    ("Country", "País"),
    ("Threat_Type", "Tipo de Ameaça"),
    ("Severity", "Severidade"),
    ("Incidents", "Incidentes"),
    ("Loss_USD", "Perda_USD"),
];

// ── Source ────────────────────────────────────────────────────────────

/// Where the raw CSV comes from.
pub enum DatasetSource {
    /// In-memory upload.
    Bytes(Vec<u8>),
    /// File-like byte stream.
    Reader(Box<dyn Read>),
    Path(PathBuf),
}

impl DatasetSource {
    /// Reads the whole source into memory.
    pub fn into_bytes(self) -> Result<Vec<u8>, InsightError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(buf)
            }
            Self::Path(path) => Ok(std::fs::read(path)?),
        }
    }
}

impl fmt::Debug for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

impl From<&str> for DatasetSource {
    fn from(csv: &str) -> Self {
        Self::Bytes(csv.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for DatasetSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<PathBuf> for DatasetSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for DatasetSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

// ── Config ────────────────────────────────────────────────────────────

/// Loader settings. Deserializable so a host can keep them in its own
/// config file; missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// File used when no source is given.
    pub default_path: PathBuf,
    /// `(source name, display name)` pairs applied after parsing.
    pub column_renames: Vec<(String, String)>,
    pub delimiter: u8,
    pub null_markers: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            default_path: PathBuf::from(DEFAULT_DATASET_PATH),
            column_renames: COLUMN_RENAMES
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
            delimiter: b',',
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

// ── Loader ────────────────────────────────────────────────────────────

/// Parses a dataset source into a renamed [`DataFrame`].
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    config: LoaderConfig,
}

impl DatasetLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads `source`, or the default file when `source` is `None`.
    ///
    /// A missing default file yields an empty table, not an error.
    pub fn load(&self, source: Option<DatasetSource>) -> Result<DataFrame, InsightError> {
        let bytes = match source {
            Some(source) => source.into_bytes()?,
            None => match self.read_default()? {
                Some(bytes) => bytes,
                None => return Ok(DataFrame::new()),
            },
        };
        self.load_bytes(&bytes)
    }

    /// Parses raw CSV bytes and applies the rename mapping.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<DataFrame, InsightError> {
        let mut df = self.parser().parse_bytes(bytes)?;
        self.apply_renames(&mut df)?;
        tracing::info!(
            rows = df.row_count(),
            columns = df.column_count(),
            "dataset loaded"
        );
        Ok(df)
    }

    /// Contents of the default file, `None` if it does not exist.
    pub fn read_default(&self) -> Result<Option<Vec<u8>>, InsightError> {
        let path = &self.config.default_path;
        if !path.exists() {
            tracing::warn!(path = %path.display(), "default dataset not found");
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }

    fn parser(&self) -> CsvParser {
        CsvParser::new()
            .delimiter(self.config.delimiter)
            .null_markers(self.config.null_markers.clone())
    }

    fn apply_renames(&self, df: &mut DataFrame) -> Result<(), InsightError> {
        for (from, to) in &self.config.column_renames {
            if df.rename_column(from, to)? {
                tracing::debug!(from = %from, to = %to, "renamed column");
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::DataType;

    const SAMPLE: &str = "Year,Region,Country,Threat_Type,Severity,Incidents,Loss_USD\n\
        2015,Asia,India,Malware,High,120,1500000\n\
        2016,Europe,France,Phishing,Low,80,300000\n\
        2017,Asia,Japan,Ransomware,High,150,2500000\n";

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("incident-insight-{}-{name}", std::process::id()))
    }

    #[test]
    fn renames_all_known_columns() {
        let df = DatasetLoader::default().load(Some(SAMPLE.into())).unwrap();
        assert_eq!(
            df.column_names(),
            &["Ano", "Região", "País", "Tipo de Ameaça", "Severidade", "Incidentes", "Perda_USD"]
        );
        assert_eq!(df.row_count(), 3);
        assert_eq!(df.column_by_name("Incidentes").unwrap().data_type(), DataType::Numeric);
    }

    #[test]
    fn unknown_columns_pass_through() {
        let df = DatasetLoader::default()
            .load(Some("Sector,Incidents\nBank,3\nRetail,4\n".into()))
            .unwrap();
        assert_eq!(df.column_names(), &["Sector", "Incidentes"]);
    }

    #[test]
    fn reader_and_path_sources() {
        let reader = DatasetSource::Reader(Box::new(std::io::Cursor::new(SAMPLE.as_bytes().to_vec())));
        let from_reader = DatasetLoader::default().load(Some(reader)).unwrap();

        let path = temp_path("reader_and_path.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        let from_path = DatasetLoader::default().load(Some(path.clone().into())).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(from_reader, from_path);
    }

    #[test]
    fn missing_default_file_yields_empty_table() {
        let loader = DatasetLoader::new(LoaderConfig {
            default_path: temp_path("does-not-exist.csv"),
            ..LoaderConfig::default()
        });
        let df = loader.load(None).unwrap();
        assert!(df.is_empty());
        assert_eq!(df.row_count(), 0);
    }

    #[test]
    fn default_file_is_used_when_present() {
        let path = temp_path("default.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        let loader = DatasetLoader::new(LoaderConfig {
            default_path: path.clone(),
            ..LoaderConfig::default()
        });
        let df = loader.load(None).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(df.row_count(), 3);
        assert!(df.column_by_name("Ano").is_some());
    }

    #[test]
    fn explicit_missing_path_is_io_error() {
        let err = DatasetLoader::default()
            .load(Some(temp_path("nope.csv").into()))
            .unwrap_err();
        assert!(matches!(err, InsightError::Io(_)));
    }

    #[test]
    fn malformed_input_propagates() {
        let err = DatasetLoader::default()
            .load(Some("Year,Incidents\n2020,1\n2021\n".into()))
            .unwrap_err();
        assert!(matches!(err, InsightError::MalformedInput { .. }));
    }

    #[test]
    fn rename_collision_is_rejected() {
        let err = DatasetLoader::default()
            .load(Some("Year,Ano\n2020,1\n".into()))
            .unwrap_err();
        assert_eq!(err, InsightError::DuplicateColumn { name: "Ano".into() });
    }

    #[test]
    fn header_only_input_is_empty() {
        let df = DatasetLoader::default()
            .load(Some("Year,Region,Incidents\n".into()))
            .unwrap();
        assert_eq!(df.row_count(), 0);
        assert!(df.is_empty());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: LoaderConfig =
            serde_json::from_str(r#"{"default_path": "data/threats.csv"}"#).unwrap();
        assert_eq!(config.default_path, PathBuf::from("data/threats.csv"));
        assert_eq!(config.column_renames.len(), 7);
        assert_eq!(config.delimiter, b',');
    }
}
