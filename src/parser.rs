use crate::ir::{Dataset, Record};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([+-]?\d+)(?:\.0*)?$").unwrap());

/// Years outside this range load fine but are reported.
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unsupported data format: {0} (use .csv or .json)")]
    UnsupportedFormat(String),
    #[error("data file is empty")]
    Empty,
    #[error("missing required columns: {}; required: {}", .missing.join(", "), required_columns())]
    MissingColumns { missing: Vec<String> },
    #[error("rows with empty required values: {rows:?}")]
    NullValues { rows: Vec<usize> },
    #[error("rows with invalid year values: {rows:?}; years must be integers")]
    InvalidYears { rows: Vec<usize> },
    #[error("unexpected JSON layout: {0}")]
    Shape(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Year,
    Category,
    Name,
    CitationKey,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::Year,
        Column::Category,
        Column::Name,
        Column::CitationKey,
    ];

    /// Header written by the sample generator and expected by default.
    pub fn header(self) -> &'static str {
        match self {
            Column::Year => "年份",
            Column::Category => "种类",
            Column::Name => "方法名",
            Column::CitationKey => "引用标识",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim_start_matches('\u{feff}').trim();
        match header.to_lowercase().as_str() {
            "年份" | "year" => Some(Column::Year),
            "种类" | "category" => Some(Column::Category),
            "方法名" | "name" | "method" => Some(Column::Name),
            "引用标识" | "citation_key" | "citation" | "ref" | "cite" => Some(Column::CitationKey),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

fn required_columns() -> String {
    Column::ALL
        .iter()
        .map(|c| c.header())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One input row before validation; `None` marks a missing or blank cell.
#[derive(Debug, Clone, Default)]
struct RawRow {
    cells: [Option<String>; 4],
}

impl RawRow {
    fn set(&mut self, column: Column, value: Option<String>) {
        let value = value.filter(|v| !v.trim().is_empty());
        self.cells[column.index()] = value;
    }
}

pub fn load_dataset(path: &Path) -> Result<Dataset, DataError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !matches!(extension.as_str(), "csv" | "json") {
        return Err(DataError::UnsupportedFormat(format!(".{extension}")));
    }

    info!(path = %path.display(), "loading data file");
    let contents = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match extension.as_str() {
        "csv" => parse_csv_str(&contents),
        _ => parse_json_str(&contents),
    }
}

pub fn parse_csv_str(input: &str) -> Result<Dataset, DataError> {
    if input.trim().is_empty() {
        return Err(DataError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let columns = resolve_columns(headers.iter().map(String::as_str))?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row = RawRow::default();
        for (column, idx) in &columns {
            row.set(*column, record.get(*idx).map(str::to_string));
        }
        rows.push(row);
    }

    validate_rows(rows)
}

/// Accepts an array of row objects or a column-oriented object of arrays.
pub fn parse_json_str(input: &str) -> Result<Dataset, DataError> {
    if input.trim().is_empty() {
        return Err(DataError::Empty);
    }
    let value: Value = serde_json::from_str(input)?;

    let rows = match value {
        Value::Array(items) => {
            let mut keys: Vec<&str> = Vec::new();
            for item in &items {
                let Value::Object(map) = item else {
                    return Err(DataError::Shape("array items must be objects".to_string()));
                };
                for key in map.keys() {
                    if !keys.contains(&key.as_str()) {
                        keys.push(key.as_str());
                    }
                }
            }
            if items.is_empty() {
                return Err(DataError::Empty);
            }
            let columns = resolve_columns(keys.iter().copied())?;
            let key_of: BTreeMap<usize, &str> =
                columns.iter().map(|(column, idx)| (column.index(), keys[*idx])).collect();
            items
                .iter()
                .map(|item| {
                    let mut row = RawRow::default();
                    for column in Column::ALL {
                        let cell = item.get(key_of[&column.index()]).and_then(json_cell);
                        row.set(column, cell);
                    }
                    row
                })
                .collect::<Vec<_>>()
        }
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            let columns = resolve_columns(keys.iter().copied())?;
            let mut rows: Vec<RawRow> = Vec::new();
            for (column, idx) in &columns {
                let cells = column_cells(&map[keys[*idx]])?;
                if rows.len() < cells.len() {
                    rows.resize_with(cells.len(), RawRow::default);
                }
                for (row, cell) in rows.iter_mut().zip(cells) {
                    row.set(*column, cell);
                }
            }
            rows
        }
        _ => {
            return Err(DataError::Shape(
                "expected an array of records or an object of columns".to_string(),
            ));
        }
    };

    validate_rows(rows)
}

/// Pandas writes `{"col": {"0": v, "1": v}}`; plain arrays are accepted too.
fn column_cells(value: &Value) -> Result<Vec<Option<String>>, DataError> {
    match value {
        Value::Array(items) => Ok(items.iter().map(json_cell).collect()),
        Value::Object(map) => {
            let mut indexed: Vec<(usize, Option<String>)> = Vec::with_capacity(map.len());
            for (key, cell) in map {
                let idx = key
                    .parse::<usize>()
                    .map_err(|_| DataError::Shape(format!("non-numeric row index '{key}'")))?;
                indexed.push((idx, json_cell(cell)));
            }
            indexed.sort_by_key(|(idx, _)| *idx);
            Ok(indexed.into_iter().map(|(_, cell)| cell).collect())
        }
        _ => Err(DataError::Shape("column values must be an array or object".to_string())),
    }
}

fn json_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Maps each required column to the position of its header.
fn resolve_columns<'a>(
    headers: impl Iterator<Item = &'a str>,
) -> Result<Vec<(Column, usize)>, DataError> {
    let mut found: [Option<usize>; 4] = [None; 4];
    for (idx, header) in headers.enumerate() {
        if let Some(column) = Column::from_header(header) {
            if found[column.index()].is_none() {
                found[column.index()] = Some(idx);
            }
        }
    }

    let missing: Vec<String> = Column::ALL
        .iter()
        .filter(|c| found[c.index()].is_none())
        .map(|c| c.header().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DataError::MissingColumns { missing });
    }

    debug!("column check passed");
    Ok(Column::ALL
        .iter()
        .filter_map(|c| found[c.index()].map(|idx| (*c, idx)))
        .collect())
}

fn parse_year(value: &str) -> Option<i32> {
    let caps = YEAR_RE.captures(value.trim())?;
    caps.get(1)?.as_str().parse().ok()
}

fn validate_rows(rows: Vec<RawRow>) -> Result<Dataset, DataError> {
    if rows.is_empty() {
        return Err(DataError::Empty);
    }

    let null_rows: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.cells.iter().any(Option::is_none))
        .map(|(idx, _)| idx + 1)
        .collect();
    if !null_rows.is_empty() {
        return Err(DataError::NullValues { rows: null_rows });
    }
    debug!("null check passed");

    let mut records = Vec::with_capacity(rows.len());
    let mut invalid_years = Vec::new();
    for (idx, row) in rows.into_iter().enumerate() {
        let [year, category, name, citation_key] = row.cells.map(Option::unwrap_or_default);
        match parse_year(&year) {
            Some(year) => records.push(Record {
                year,
                category,
                name,
                citation_key,
            }),
            None => invalid_years.push(idx + 1),
        }
    }
    if !invalid_years.is_empty() {
        return Err(DataError::InvalidYears { rows: invalid_years });
    }
    if records.iter().any(|r| !PLAUSIBLE_YEARS.contains(&r.year)) {
        warn!("unusual year values detected (<1900 or >2100)");
    }

    let dataset = Dataset::new(records);
    let categories = dataset.categories();
    info!(
        count = categories.len(),
        categories = %categories.join(", "),
        "categories detected"
    );
    info!(
        records = dataset.len(),
        years = dataset.years().len(),
        "data validation passed"
    );
    Ok(dataset)
}

/// Facts reported by `fishbone --validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSummary {
    pub records: usize,
    pub first_year: i32,
    pub last_year: i32,
    pub categories: BTreeMap<String, usize>,
}

impl ValidationSummary {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let years = dataset.years();
        Self {
            records: dataset.len(),
            first_year: years.first().copied().unwrap_or_default(),
            last_year: years.last().copied().unwrap_or_default(),
            categories: dataset.category_counts(),
        }
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  records: {}", self.records)?;
        writeln!(f, "  years: {} - {}", self.first_year, self.last_year)?;
        let categories: Vec<String> = self
            .categories
            .iter()
            .map(|(name, count)| format!("{name}={count}"))
            .collect();
        write!(f, "  categories: {}", categories.join(", "))
    }
}

pub fn validate_file(path: &Path) -> Result<ValidationSummary, DataError> {
    let dataset = load_dataset(path)?;
    Ok(ValidationSummary::from_dataset(&dataset))
}
