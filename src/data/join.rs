//! Month-keyed joining of raw economic downloads.
//!
//! Each source is a CSV with a date column and one or more numeric columns
//! (a FRED download, a Treasury par-yield file, a GDP index export, ...). The
//! joiner:
//!
//! - reduces every source to one row per `YYYY-MM` month (see [`MonthPolicy`])
//! - outer-joins all sources on the month label, sorted chronologically
//! - suffixes colliding column names with the source label
//!
//! Missing cells stay missing; the data preparer drops incomplete rows later.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use tracing::{debug, info};

use crate::error::AppError;
use crate::io::ingest::{build_header_map, get_optional, month_label, normalize_header_name, parse_cell, parse_month};

/// How a source with several observations per month is reduced to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MonthPolicy {
    /// Keep only observations dated on the 1st of the month.
    #[value(name = "day-one")]
    DayOne,
    /// Keep the earliest observation in each month.
    #[value(name = "first")]
    FirstAvailable,
}

/// One input file of a join.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    /// Short name used for collision suffixes (defaults to the file stem).
    pub label: String,
    pub path: PathBuf,
    pub date_column: String,
    pub policy: MonthPolicy,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "source".to_string());
        Self {
            label,
            path,
            date_column: "date".to_string(),
            policy: MonthPolicy::FirstAvailable,
        }
    }

    /// Parse `PATH[:DATE_COLUMN[:POLICY]]`, e.g. `yields.csv:date:day-one`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let mut parts = raw.split(':');
        let path = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::new(2, format!("Invalid source '{raw}': missing path.")))?;

        let mut spec = Self::new(path);
        if let Some(col) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
            spec.date_column = col.to_string();
        }
        if let Some(policy) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
            spec.policy = MonthPolicy::from_str(policy, true).map_err(|_| {
                AppError::new(
                    2,
                    format!("Invalid month policy '{policy}' (expected `day-one` or `first`)."),
                )
            })?;
        }
        if parts.next().is_some() {
            return Err(AppError::new(
                2,
                format!("Invalid source '{raw}': expected PATH[:DATE_COLUMN[:POLICY]]."),
            ));
        }
        Ok(spec)
    }
}

/// One source reduced to month rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFrame {
    pub label: String,
    pub columns: Vec<String>,
    /// Month label -> one value per column.
    pub rows: BTreeMap<String, Vec<Option<f64>>>,
}

/// Outer join of several sources.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedTable {
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

impl JoinedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a source CSV and reduce it to one row per month.
pub fn read_source(spec: &SourceSpec) -> Result<SourceFrame, AppError> {
    let file = File::open(&spec.path).map_err(|e| {
        AppError::new(2, format!("Failed to open CSV '{}': {e}", spec.path.display()))
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let date_key = normalize_header_name(&spec.date_column);
    if !header_map.contains_key(&date_key) {
        return Err(AppError::new(
            2,
            format!(
                "Source '{}' has no date column `{}`.",
                spec.label, spec.date_column
            ),
        ));
    }

    // Every named, non-date column is a value column. Unnamed columns are
    // dataframe index columns and are skipped.
    let value_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| (idx, h.trim().trim_start_matches('\u{feff}').to_string()))
        .filter(|(_, h)| !h.is_empty() && normalize_header_name(h) != date_key)
        .collect();

    let mut kept: BTreeMap<String, (NaiveDate, Vec<Option<f64>>)> = BTreeMap::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = result.map_err(|e| {
            AppError::new(2, format!("CSV parse error in '{}': {e}", spec.path.display()))
        })?;
        let Some(date) = get_optional(&record, &header_map, &date_key).and_then(|s| parse_month(s).ok())
        else {
            skipped += 1;
            continue;
        };
        if spec.policy == MonthPolicy::DayOne && date.day() != 1 {
            continue;
        }

        // Read by position: repeated headers each keep their own cells.
        let values: Vec<Option<f64>> = value_columns
            .iter()
            .map(|(idx, _)| parse_cell(record.get(*idx).map(str::trim).filter(|c| !c.is_empty())))
            .collect();

        let month = month_label(date);
        match kept.get(&month) {
            Some((existing, _)) if *existing <= date => {}
            _ => {
                kept.insert(month, (date, values));
            }
        }
    }

    debug!(
        source = %spec.label,
        months = kept.len(),
        skipped,
        "source reduced to months"
    );

    Ok(SourceFrame {
        label: spec.label.clone(),
        columns: value_columns.into_iter().map(|(_, name)| name).collect(),
        rows: kept.into_iter().map(|(m, (_, v))| (m, v)).collect(),
    })
}

/// Outer-join frames on month, in the order given.
pub fn join_frames(frames: &[SourceFrame]) -> JoinedTable {
    let months: BTreeSet<&String> = frames.iter().flat_map(|f| f.rows.keys()).collect();

    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for frame in frames {
        for col in &frame.columns {
            let key = col.to_ascii_lowercase();
            let name = if seen.contains_key(&key) {
                format!("{col}_{}", frame.label)
            } else {
                col.clone()
            };
            seen.insert(name.to_ascii_lowercase(), columns.len());
            seen.entry(key).or_insert(columns.len());
            columns.push(name);
        }
    }

    let rows = months
        .into_iter()
        .map(|month| {
            let mut values = Vec::with_capacity(columns.len());
            for frame in frames {
                match frame.rows.get(month) {
                    Some(row) => values.extend(row.iter().copied()),
                    None => values.extend(std::iter::repeat(None).take(frame.columns.len())),
                }
            }
            (month.clone(), values)
        })
        .collect();

    JoinedTable { columns, rows }
}

/// Read and join several sources.
pub fn join_sources(sources: &[SourceSpec]) -> Result<JoinedTable, AppError> {
    if sources.is_empty() {
        return Err(AppError::new(2, "At least one source is required to join."));
    }
    let frames = sources
        .iter()
        .map(read_source)
        .collect::<Result<Vec<_>, _>>()?;
    let joined = join_frames(&frames);
    info!(
        sources = sources.len(),
        months = joined.len(),
        columns = joined.columns.len(),
        "sources joined"
    );
    Ok(joined)
}

/// Write a joined table with a leading `date` column. Missing cells are empty.
pub fn write_joined_csv(table: &JoinedTable, path: &Path) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display()))
    })?;
    let write_err = |e: csv::Error| AppError::new(2, format!("Failed to write joined CSV: {e}"));

    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push("date".to_string());
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header).map_err(write_err)?;

    for (month, values) in &table.rows {
        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(month.clone());
        record.extend(values.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        writer.write_record(&record).map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush joined CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_source(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_source_specs() {
        let spec = SourceSpec::parse("data/CPIAUCSL.csv:observation_date").unwrap();
        assert_eq!(spec.label, "CPIAUCSL");
        assert_eq!(spec.date_column, "observation_date");
        assert_eq!(spec.policy, MonthPolicy::FirstAvailable);

        let spec = SourceSpec::parse("yields.csv:Date:day-one").unwrap();
        assert_eq!(spec.policy, MonthPolicy::DayOne);

        assert!(SourceSpec::parse("x.csv:date:weekly").is_err());
        assert!(SourceSpec::parse("").is_err());
    }

    #[test]
    fn day_one_policy_drops_mid_month_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(
            dir.path(),
            "yields.csv",
            "Date,10 Yr,3 Mo\n01/02/2020,1.88,1.54\n02/01/2020,1.52,1.57\n02/14/2020,1.59,1.58\n",
        );
        let mut spec = SourceSpec::new(&path);
        spec.date_column = "Date".to_string();
        spec.policy = MonthPolicy::DayOne;

        let frame = read_source(&spec).unwrap();
        assert_eq!(frame.columns, vec!["10 Yr", "3 Mo"]);
        assert_eq!(frame.rows.len(), 1);
        assert_eq!(frame.rows["2020-02"], vec![Some(1.52), Some(1.57)]);
    }

    #[test]
    fn first_available_keeps_earliest_in_month() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(
            dir.path(),
            "ebp.csv",
            "date,ebp\n2020-01-20,0.5\n2020-01-03,0.4\n2020-02-07,.\n",
        );
        let frame = read_source(&SourceSpec::new(&path)).unwrap();
        assert_eq!(frame.rows["2020-01"], vec![Some(0.4)]);
        assert_eq!(frame.rows["2020-02"], vec![None]);
    }

    #[test]
    fn outer_join_sorts_and_suffixes_collisions() {
        let cpi = SourceFrame {
            label: "cpi".to_string(),
            columns: vec!["CPIAUCSL".to_string(), "value".to_string()],
            rows: BTreeMap::from([
                ("2020-02".to_string(), vec![Some(201.0), Some(1.0)]),
                ("2020-01".to_string(), vec![Some(200.0), Some(2.0)]),
            ]),
        };
        let gdp = SourceFrame {
            label: "gdp".to_string(),
            columns: vec!["Value".to_string()],
            rows: BTreeMap::from([("2020-03".to_string(), vec![Some(102.5)])]),
        };

        let joined = join_frames(&[cpi, gdp]);
        assert_eq!(joined.columns, vec!["CPIAUCSL", "value", "Value_gdp"]);
        let months: Vec<&str> = joined.rows.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(months, vec!["2020-01", "2020-02", "2020-03"]);
        assert_eq!(joined.rows[0].1, vec![Some(200.0), Some(2.0), None]);
        assert_eq!(joined.rows[2].1, vec![None, None, Some(102.5)]);
    }

    #[test]
    fn joined_csv_loads_as_raw_table() {
        let dir = tempfile::tempdir().unwrap();
        let cpi = write_source(
            dir.path(),
            "cpi.csv",
            "observation_date,CPIAUCSL\n2020-01-01,200\n2020-02-01,201\n",
        );
        let rest = write_source(
            dir.path(),
            "rest.csv",
            ",date,Monthly Nominal GDP Index,10 yr,3 mo\n0,2020-01-01,100,4.0,5.0\n1,2020-02-01,101,4.0,5.0\n",
        );
        let mut cpi_spec = SourceSpec::new(&cpi);
        cpi_spec.date_column = "observation_date".to_string();
        let joined = join_sources(&[cpi_spec, SourceSpec::new(&rest)]).unwrap();

        let out = dir.path().join("joined.csv");
        write_joined_csv(&joined, &out).unwrap();
        let raw = crate::io::load_raw_table(&out).unwrap().table;
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.rows[1].cpi, Some(201.0));
        assert_eq!(raw.rows[1].gdp_index, Some(101.0));
    }

    #[test]
    fn repeated_headers_keep_their_own_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "dup.csv", "date,value,Value\n2020-01-01,1.5,2.5\n");
        let frame = read_source(&SourceSpec::new(&path)).unwrap();
        assert_eq!(frame.columns, vec!["value", "Value"]);
        assert_eq!(frame.rows["2020-01"], vec![Some(1.5), Some(2.5)]);
    }

    #[test]
    fn missing_date_column_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "x.csv", "when,v\n2020-01-01,1\n");
        assert_eq!(read_source(&SourceSpec::new(&path)).unwrap_err().exit_code(), 2);
    }
}
