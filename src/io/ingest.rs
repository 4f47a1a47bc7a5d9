//! CSV ingest and normalization.
//!
//! This module turns a joined, month-keyed economic CSV into a
//! `RawObservationTable` the data preparer can consume.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip rows with an unreadable month, but report them)
//! - **Deterministic behavior** (rows sorted by month, duplicates rejected)
//! - **Separation of concerns**: no derivation or estimation here

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{
    COL_CPI, COL_GDP_INDEX, COL_LONG_RATE, COL_SHORT_RATE, RawObservation, RawObservationTable,
};
use crate::error::AppError;

/// Month column names, in lookup order.
const MONTH_COLUMNS: [&str; 3] = ["date", "month", "observation_date"];

/// Cell values treated as missing (besides anything non-numeric).
const MISSING_TOKENS: [&str; 4] = [".", "nan", "na", "null"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the month-keyed table plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub table: RawObservationTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a raw economic table from CSV.
pub fn load_raw_table(path: &Path) -> Result<IngestedTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    let month_column = resolve_month_column(&header_map)?;
    ensure_required_columns_exist(&header_map)?;

    let mut by_month: BTreeMap<String, RawObservation> = BTreeMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let row = match parse_row(&record, &header_map, month_column) {
            Ok(row) => row,
            Err(message) => {
                row_errors.push(RowError { line, message });
                continue;
            }
        };

        if by_month.contains_key(&row.month) {
            return Err(AppError::new(
                2,
                format!("Duplicate month '{}' at line {line}.", row.month),
            ));
        }
        by_month.insert(row.month.clone(), row);
    }

    if by_month.is_empty() {
        return Err(AppError::new(3, "No rows with a valid month were found."));
    }

    for err in &row_errors {
        warn!(line = err.line, "{}", err.message);
    }
    debug!(rows_read, rows_used = by_month.len(), "raw table loaded");

    // BTreeMap over `YYYY-MM` keys iterates chronologically.
    let rows = by_month.into_values().collect();
    Ok(IngestedTable {
        table: RawObservationTable::new(rows),
        row_errors,
        rows_read,
    })
}

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for repeated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

pub(crate) fn normalize_header_name(name: &str) -> String {
    // Spreadsheet tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_month_column(header_map: &HashMap<String, usize>) -> Result<usize, AppError> {
    MONTH_COLUMNS
        .iter()
        .find_map(|name| header_map.get(*name).copied())
        .ok_or_else(|| {
            AppError::new(
                2,
                "Missing month column: expected one of `date`, `month`, `observation_date`.",
            )
        })
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for name in [COL_GDP_INDEX, COL_CPI, COL_LONG_RATE, COL_SHORT_RATE] {
        if !header_map.contains_key(&normalize_header_name(name)) {
            return Err(AppError::new(2, format!("Missing required column: `{name}`")));
        }
    }
    Ok(())
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    month_column: usize,
) -> Result<RawObservation, String> {
    let raw_month = record
        .get(month_column)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing month value.".to_string())?;
    let month = month_label(parse_month(raw_month)?);

    let value = |name: &str| parse_cell(get_optional(record, header_map, &normalize_header_name(name)));

    Ok(RawObservation {
        month,
        gdp_index: value(COL_GDP_INDEX),
        cpi: value(COL_CPI),
        long_rate: value(COL_LONG_RATE),
        short_rate: value(COL_SHORT_RATE),
    })
}

pub(crate) fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a date or a bare `YYYY-MM` month (taken as the 1st).
pub(crate) fn parse_month(s: &str) -> Result<NaiveDate, String> {
    // Economic downloads mix ISO dates, US-style dates, and bare months. We
    // accept a small set of common formats while keeping parsing deterministic.
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m/%d/%y"];
    let s = s.trim();
    // Timestamps like `2020-01-01 00:00:00`: the date part is enough.
    let date_part = s.split_whitespace().next().unwrap_or(s);
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, fmt) {
            return Ok(d);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{date_part}-01"), "%Y-%m-%d") {
        return Ok(d);
    }
    Err(format!(
        "Invalid month '{s}'. Expected one of: YYYY-MM, YYYY-MM-DD, MM/DD/YYYY, YYYY/MM/DD."
    ))
}

pub(crate) fn month_label(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Numeric cell; missing tokens and non-numeric text become `None`.
pub(crate) fn parse_cell(s: Option<&str>) -> Option<f64> {
    let s = s?;
    if MISSING_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t)) {
        return None;
    }
    let v = s.replace(',', "").parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn month_formats_normalize() {
        for raw in ["2020-03", "2020-03-01", "03/15/2020", "2020/03/31", "2020-03-01 00:00:00"] {
            assert_eq!(month_label(parse_month(raw).unwrap()), "2020-03", "{raw}");
        }
        assert!(parse_month("March 2020").is_err());
    }

    #[test]
    fn missing_tokens_become_none() {
        assert_eq!(parse_cell(Some("4.25")), Some(4.25));
        assert_eq!(parse_cell(Some("1,234.5")), Some(1234.5));
        assert_eq!(parse_cell(Some(".")), None);
        assert_eq!(parse_cell(Some("NaN")), None);
        assert_eq!(parse_cell(Some("n/a")), None);
        assert_eq!(parse_cell(None), None);
    }

    #[test]
    fn loads_sorted_table_with_index_column_and_bom() {
        let file = write_csv(
            "\u{feff},date,Monthly Nominal GDP Index,CPIAUCSL,10 Yr,3 Mo,extra\n\
             1,2020-02-01,101,201,4.0,5.0,x\n\
             0,2020-01-01,100,200,4.0,5.0,y\n\
             2,2020-03-01,102.5,.,4.1,5.0,z\n",
        );
        let ingested = load_raw_table(file.path()).unwrap();
        let rows = &ingested.table.rows;
        assert_eq!(ingested.rows_read, 3);
        assert!(ingested.row_errors.is_empty());
        assert_eq!(
            rows.iter().map(|r| r.month.as_str()).collect::<Vec<_>>(),
            vec!["2020-01", "2020-02", "2020-03"]
        );
        assert_eq!(rows[0].gdp_index, Some(100.0));
        assert_eq!(rows[2].cpi, None);
        assert_eq!(rows[2].long_rate, Some(4.1));
        assert_eq!(rows[1].short_rate, Some(5.0));
    }

    #[test]
    fn bad_months_are_reported_not_fatal() {
        let file = write_csv(
            "month,Monthly Nominal GDP Index,CPIAUCSL,10 yr,3 mo\n\
             2020-01,100,200,4,5\n\
             someday,101,201,4,5\n",
        );
        let ingested = load_raw_table(file.path()).unwrap();
        assert_eq!(ingested.table.len(), 1);
        assert_eq!(ingested.row_errors.len(), 1);
        assert_eq!(ingested.row_errors[0].line, 3);
    }

    #[test]
    fn duplicate_months_are_rejected() {
        let file = write_csv(
            "date,Monthly Nominal GDP Index,CPIAUCSL,10 yr,3 mo\n\
             2020-01-01,100,200,4,5\n\
             2020-01-15,101,201,4,5\n",
        );
        let err = load_raw_table(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("2020-01"));
    }

    #[test]
    fn missing_columns_are_rejected() {
        let file = write_csv("date,CPIAUCSL,10 yr,3 mo\n2020-01-01,200,4,5\n");
        let err = load_raw_table(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("Monthly Nominal GDP Index"));

        let file = write_csv("when,Monthly Nominal GDP Index,CPIAUCSL,10 yr,3 mo\n");
        assert_eq!(load_raw_table(file.path()).unwrap_err().exit_code(), 2);
    }
}
