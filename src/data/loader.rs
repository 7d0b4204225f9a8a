//! Survey Data Loader Module
//! Fetches the GSS extract, decodes it and builds the cleaned table using Polars.

use crate::config::SourceConfig;
use crate::data::schema::{self, AGE_SENTINEL, NUMERIC_COLUMNS, RAW_COLUMNS};
use crate::data::table;
use encoding_rs::Encoding;
use polars::prelude::*;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unknown character encoding: {0}")]
    UnknownEncoding(String),
    #[error("Missing expected column: {0}")]
    MissingColumn(String),
    #[error("Column '{column}', row {row}: cannot parse '{value}' as a number")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },
}

/// Where the survey extract lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Remote(String),
    Local(PathBuf),
}

impl DataSource {
    /// URLs with an http(s) scheme are remote, anything else is a file path.
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            DataSource::Remote(location.to_string())
        } else {
            DataSource::Local(PathBuf::from(location))
        }
    }

    /// Read the raw, still-encoded bytes of the source.
    pub fn read_bytes(&self, timeout: Duration) -> Result<Vec<u8>, LoaderError> {
        match self {
            DataSource::Remote(url) => {
                let fetch_err = |source| LoaderError::Fetch {
                    url: url.clone(),
                    source,
                };
                let client = reqwest::blocking::Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(fetch_err)?;
                let response = client
                    .get(url)
                    .send()
                    .and_then(|r| r.error_for_status())
                    .map_err(fetch_err)?;
                let bytes = response.bytes().map_err(fetch_err)?;
                Ok(bytes.to_vec())
            }
            DataSource::Local(path) => std::fs::read(path).map_err(|source| LoaderError::Io {
                path: path.clone(),
                source,
            }),
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Remote(url) => write!(f, "{}", url),
            DataSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Builds the cleaned survey table.
pub struct SurveyLoader {
    encoding: &'static Encoding,
    na_values: Vec<String>,
    timeout: Duration,
}

impl SurveyLoader {
    pub fn new(config: &SourceConfig) -> Result<Self, LoaderError> {
        let encoding = Encoding::for_label(config.encoding.as_bytes())
            .ok_or_else(|| LoaderError::UnknownEncoding(config.encoding.clone()))?;

        Ok(Self {
            encoding,
            na_values: config.na_values.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    /// Fetch the source and build the cleaned table.
    pub fn load(&self, source: &DataSource) -> Result<DataFrame, LoaderError> {
        info!("Reading survey data from {}", source);
        let bytes = source.read_bytes(self.timeout)?;
        debug!("Fetched {} bytes", bytes.len());
        let df = self.load_from_bytes(&bytes)?;
        info!(
            "Cleaned table: {} rows, {} columns",
            table::row_count(&df),
            df.width()
        );
        Ok(df)
    }

    /// Build the cleaned table from raw CSV bytes in the configured encoding.
    pub fn load_from_bytes(&self, bytes: &[u8]) -> Result<DataFrame, LoaderError> {
        let (text, _, had_errors) = self.encoding.decode(bytes);
        if had_errors {
            warn!(
                "Malformed {} sequences replaced while decoding",
                self.encoding.name()
            );
        }

        let raw = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .into_reader_with_file_handle(Cursor::new(text.into_owned().into_bytes()))
            .finish()?;

        let cleaned = self.clean(raw)?;
        info!(
            "Loaded {} rows, {} columns",
            cleaned.height(),
            cleaned.width()
        );
        Ok(cleaned)
    }

    /// Project, null out sentinels, rename and coerce numeric fields.
    fn clean(&self, raw: DataFrame) -> Result<DataFrame, LoaderError> {
        for name in RAW_COLUMNS {
            if !table::has_column(&raw, name) {
                return Err(LoaderError::MissingColumn(name.to_string()));
            }
        }
        let mut df = raw.select(RAW_COLUMNS)?;

        for name in RAW_COLUMNS {
            if df.column(name)?.dtype() == &DataType::String {
                let nulled = self.null_sentinels(df.column(name)?.str()?);
                df.with_column(nulled.into_series())?;
            }
        }

        for raw in RAW_COLUMNS {
            let renamed = schema::display_name(raw);
            if renamed != raw {
                df.rename(raw, renamed.into())?;
            }
        }

        for name in NUMERIC_COLUMNS {
            let replacement = if name == schema::AGE {
                Some(AGE_SENTINEL)
            } else {
                None
            };
            let coerced = coerce_numeric(df.column(name)?, replacement)?;
            df.with_column(coerced)?;
        }

        Ok(df)
    }

    fn null_sentinels(&self, ca: &StringChunked) -> StringChunked {
        let nulled: StringChunked = ca
            .into_iter()
            .map(|v| v.filter(|s| !self.na_values.iter().any(|na| na == s)))
            .collect();
        nulled.with_name(ca.name().clone())
    }
}

/// Coerce a column to Float64, rewriting `replacement.0` to `replacement.1` first.
fn coerce_numeric(
    column: &Column,
    replacement: Option<(&str, &str)>,
) -> Result<Series, LoaderError> {
    if column.dtype() != &DataType::String {
        return Ok(column
            .as_materialized_series()
            .cast(&DataType::Float64)?);
    }

    let ca = column.str()?;
    let mut values: Vec<Option<f64>> = Vec::with_capacity(ca.len());
    for (row, value) in ca.into_iter().enumerate() {
        let Some(raw) = value else {
            values.push(None);
            continue;
        };
        let text = match replacement {
            Some((from, to)) if raw == from => to,
            _ => raw,
        };
        let parsed = text
            .trim()
            .parse::<f64>()
            .map_err(|_| LoaderError::InvalidNumber {
                column: column.name().to_string(),
                row,
                value: raw.to_string(),
            })?;
        values.push(Some(parsed));
    }

    let ca: Float64Chunked = values.into_iter().collect();
    Ok(ca.with_name(column.name().clone()).into_series())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::SourceConfig;

    pub(crate) const HEADER: &str = "id,wtss,sex,educ,region,age,coninc,prestg10,mapres10,papres10,sei10,satjob,fechld,fefam,fepol,fepresch,meovrwrk,extra";

    /// Small synthetic extract covering sentinels, the age top code and both sexes.
    pub(crate) fn fixture_csv() -> String {
        let rows = [
            "1,1.2,male,12,new england,43,30000,47,31,45,65.3,very satisfied,agree,disagree,disagree,agree,agree,x",
            "2,0.8,female,16,pacific,89 or older,50000,60,IAP,50,70.1,mod. satisfied,strongly agree,agree,DK,disagree,IAP,y",
            "3,1.0,female,14,pacific,30,,22,20,DK,30.2,very satisfied,IAP,strongly disagree,agree,CAN'T CHOOSE,disagree,z",
            "4,1.1,male,12,new england,55,40000,80,40,60,82.5,IAP,disagree,strongly agree,NOT SURE,agree,agree,w",
            "5,0.9,male,18,south atlantic,61,60000,,35,38,,a little dissat,agree,agree,.a,strongly disagree,disagree,v",
        ];
        format!("{}\n{}\n", HEADER, rows.join("\n"))
    }

    pub(crate) fn loader() -> SurveyLoader {
        SurveyLoader::new(&SourceConfig::default()).unwrap()
    }

    pub(crate) fn fixture_table() -> DataFrame {
        loader().load_from_bytes(fixture_csv().as_bytes()).unwrap()
    }

    #[test]
    fn test_columns_projected_and_renamed() {
        let df = fixture_table();
        let cols = table::column_names(&df);
        let expected: Vec<String> = schema::cleaned_columns()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(cols, expected);
        assert!(!cols.contains(&"extra".to_string()));
        assert!(!cols.contains(&"hire_women".to_string()));
    }

    #[test]
    fn test_sentinels_become_null() {
        let df = fixture_table();

        let satjob = table::string_values(&df, "satjob").unwrap();
        assert_eq!(satjob[3], None);
        let relationship = table::string_values(&df, "relationship").unwrap();
        assert_eq!(relationship[2], None);
        let bettersuited = table::string_values(&df, "men_bettersuited").unwrap();
        assert_eq!(bettersuited[1], None);
        assert_eq!(bettersuited[3], None);
        assert_eq!(bettersuited[4], None);
        let child = table::string_values(&df, "child_suffer").unwrap();
        assert_eq!(child[2], None);

        // Sentinels in numeric columns are null rather than parse failures
        let mother = table::f64_values(&df, "mother_job_prestige").unwrap();
        assert_eq!(mother[1], None);
        let father = table::f64_values(&df, "father_job_prestige").unwrap();
        assert_eq!(father[2], None);

        for name in table::column_names(&df) {
            for value in table::string_values(&df, &name).unwrap().into_iter().flatten() {
                assert!(
                    !SourceConfig::default().na_values.contains(&value),
                    "{} kept sentinel {}",
                    name,
                    value
                );
            }
        }
    }

    #[test]
    fn test_comma_sentinels_in_quoted_fields() {
        let csv = format!(
            "{}{}\n",
            fixture_csv(),
            "6,1.0,female,13,pacific,40,35000,50,30,\"IAP, DK, NA, uncodeable\",44.0,\"IAP,DK,NA,uncodeable\",agree,agree,\"IAP, DK, NA, uncodeable\",agree,agree,u"
        );
        let df = loader().load_from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table::row_count(&df), 6);

        let satjob = table::string_values(&df, "satjob").unwrap();
        assert_eq!(satjob[5], None);
        let bettersuited = table::string_values(&df, "men_bettersuited").unwrap();
        assert_eq!(bettersuited[5], None);
        let father = table::f64_values(&df, "father_job_prestige").unwrap();
        assert_eq!(father[5], None);
        assert_eq!(father[0], Some(45.0));

        let breadwinner = table::string_values(&df, "male_breadwinner").unwrap();
        assert_eq!(breadwinner[5].as_deref(), Some("agree"));
    }

    #[test]
    fn test_age_top_code_normalized() {
        let df = fixture_table();
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::Float64);
        let ages = table::f64_values(&df, "age").unwrap();
        assert_eq!(ages, vec![Some(43.0), Some(89.0), Some(30.0), Some(55.0), Some(61.0)]);
    }

    #[test]
    fn test_unparsable_age_fails_load() {
        let csv = fixture_csv().replace("male,18,south atlantic,61", "male,18,south atlantic,sixty");
        let err = loader().load_from_bytes(csv.as_bytes()).unwrap_err();
        match err {
            LoaderError::InvalidNumber { column, row, value } => {
                assert_eq!(column, "age");
                assert_eq!(row, 4);
                assert_eq!(value, "sixty");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_column_fails_load() {
        let csv = fixture_csv().replace("fepresch", "something_else");
        let err = loader().load_from_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn(ref c) if c == "fepresch"));
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let config = SourceConfig {
            encoding: "klingon".to_string(),
            ..SourceConfig::default()
        };
        assert!(matches!(
            SurveyLoader::new(&config),
            Err(LoaderError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_cp1252_decoding() {
        let mut bytes = fixture_csv().into_bytes();
        // 0x92 is a right single quote in cp1252
        let pos = bytes.windows(11).position(|w| w == b"new england").unwrap();
        bytes.splice(pos..pos + 3, [b'n', 0x92, b'w']);
        let df = loader().load_from_bytes(&bytes).unwrap();
        let regions = table::string_values(&df, "region").unwrap();
        assert_eq!(regions[0].as_deref(), Some("n\u{2019}w england"));
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gss.csv");
        std::fs::write(&path, fixture_csv()).unwrap();
        let source = DataSource::from_location(path.to_str().unwrap());
        assert!(matches!(source, DataSource::Local(_)));

        let first = loader().load(&source).unwrap();
        let second = loader().load(&source).unwrap();
        assert!(first.equals_missing(&second));
        assert_eq!(first.dtypes(), second.dtypes());
        assert_eq!(table::column_names(&first), table::column_names(&second));
    }

    #[test]
    fn test_source_detection() {
        assert_eq!(
            DataSource::from_location("https://example.org/gss.csv"),
            DataSource::Remote("https://example.org/gss.csv".to_string())
        );
        assert!(matches!(
            DataSource::from_location("data/gss.csv"),
            DataSource::Local(_)
        ));
    }
}
