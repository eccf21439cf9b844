//! JSONL case files
//!
//! One `CaseRecord` per line:
//! `{"pi": ["p1"], "delta": ["d1"], "reason": ["p1"], "decision": "pi"}`

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::reasoning::{Case, CaseRecord};

/// Read case records from a JSONL file, skipping blank lines
pub fn load_case_records<P: AsRef<Path>>(path: P) -> Result<Vec<CaseRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        anyhow::bail!("Case file not found: {:?}", path);
    }

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open case file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: CaseRecord = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse case at {:?} line {}", path, line_no + 1))?;
        records.push(record);
    }

    Ok(records)
}

/// Read every `*.jsonl` file under `dir`, in path order
pub fn load_case_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<CaseRecord>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        anyhow::bail!("Case directory not found: {:?}", dir);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "jsonl").unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    let mut records = Vec::new();
    for file in &files {
        records.extend(load_case_records(file)?);
    }

    tracing::info!("Loaded {} case records from {} files in {:?}", records.len(), files.len(), dir);
    Ok(records)
}

/// Load from a single file or a directory of files
pub fn load_case_source<P: AsRef<Path>>(path: P) -> Result<Vec<CaseRecord>> {
    let path = path.as_ref();
    if path.is_dir() {
        load_case_dir(path)
    } else {
        load_case_records(path)
    }
}

/// Build cases from records, failing on the first malformed one
pub fn records_to_cases(records: &[CaseRecord]) -> Result<Vec<Case>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            Case::from_record(record)
                .with_context(|| format!("Invalid case record #{} ({})", i, record.fingerprint()))
        })
        .collect()
}

/// Build cases from records, dropping malformed ones with a warning
pub fn records_to_cases_lossy(records: &[CaseRecord]) -> Vec<Case> {
    records
        .iter()
        .filter_map(|record| match Case::from_record(record) {
            Ok(case) => Some(case),
            Err(e) => {
                tracing::warn!(case_id = %record.fingerprint(), "Skipping case record: {}", e);
                None
            }
        })
        .collect()
}

pub fn write_case_records<P: AsRef<Path>>(path: P, records: &[CaseRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create case file: {:?}", path))?;
    for record in records {
        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)?;
    }

    tracing::info!("Wrote {} case records to {:?}", records.len(), path);
    Ok(())
}
