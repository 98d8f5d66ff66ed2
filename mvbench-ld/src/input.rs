//! Dataset input
//!
//! Two formats are accepted, chosen by file extension:
//! - `.csv`: header row plus one row per movie; empty cells are absent values
//! - `.jsonl` / `.ndjson`: one JSON object per line; release dates may be
//!   `{"year", "month", "day"}` objects

use crate::error::{LoadError, LoadResult};
use mvbench_common::RawMovieRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    JsonLines,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "jsonl" | "ndjson" => Ok(InputFormat::JsonLines),
            _ => Err(LoadError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read every record of a dataset file
pub fn read_records(path: &Path) -> LoadResult<Vec<RawMovieRecord>> {
    let records = match InputFormat::from_path(path)? {
        InputFormat::Csv => read_csv(path)?,
        InputFormat::JsonLines => read_json_lines(path)?,
    };
    info!(path = %path.display(), rows = records.len(), "Read dataset");
    Ok(records)
}

fn read_csv(path: &Path) -> LoadResult<Vec<RawMovieRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(RawMovieRecord::from_csv_row(headers.iter(), row.iter()));
    }
    Ok(records)
}

fn read_json_lines(path: &Path) -> LoadResult<Vec<RawMovieRecord>> {
    let reader = BufReader::new(File::open(path)?);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| LoadError::Json {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Dataset overview logged before loading
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetDiagnostics {
    pub rows: usize,
    pub distinct_ids: usize,
    /// Ids that occur more than once
    pub duplicated_ids: usize,
    pub missing_imdb_id: usize,
    pub missing_id: usize,
}

impl DatasetDiagnostics {
    pub fn from_records(records: &[RawMovieRecord]) -> Self {
        let mut occurrences: HashMap<i64, usize> = HashMap::new();
        let mut missing_id = 0;
        let mut missing_imdb_id = 0;

        for record in records {
            match record.source_id() {
                Some(id) => *occurrences.entry(id).or_default() += 1,
                None => missing_id += 1,
            }
            if !record.is_present("imdb_id") {
                missing_imdb_id += 1;
            }
        }

        Self {
            rows: records.len(),
            distinct_ids: occurrences.len(),
            duplicated_ids: occurrences.values().filter(|n| **n > 1).count(),
            missing_imdb_id,
            missing_id,
        }
    }

    pub fn log(&self) {
        info!(
            rows = self.rows,
            distinct_ids = self.distinct_ids,
            duplicated_ids = self.duplicated_ids,
            missing_imdb_id = self.missing_imdb_id,
            missing_id = self.missing_id,
            "Dataset diagnostics"
        );
    }
}
