//! Append-only record of admission decisions

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::reasoning::{Case, Policy, Verdict};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionEntry {
    /// Fingerprint of the case record
    pub case_id: String,
    pub policy: Policy,
    pub admitted: bool,
    /// Strict classification of the case before the decision
    pub verdict: Verdict,
    /// Unix millis
    pub recorded_at: i64,
}

impl AdmissionEntry {
    pub fn new(case: &Case, policy: Policy, admitted: bool, verdict: Verdict) -> Self {
        Self {
            case_id: case.to_record().fingerprint(),
            policy,
            admitted,
            verdict,
            recorded_at: Utc::now().timestamp_millis(),
        }
    }
}

pub fn admission_log_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("admissions").join("admissions.jsonl")
}

/// Append entries to `<data_dir>/admissions/admissions.jsonl`
pub fn write_admission_log(data_dir: &str, entries: &[AdmissionEntry]) -> Result<PathBuf> {
    let path = admission_log_path(data_dir);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open admission log: {:?}", path))?;

    for entry in entries {
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
    }

    tracing::info!("Wrote {} admission entries to {:?}", entries.len(), path);
    Ok(path)
}

/// Read the admission log. A missing log reads as empty.
pub fn load_admission_log(data_dir: &str) -> Result<Vec<AdmissionEntry>> {
    let path = admission_log_path(data_dir);
    let mut entries = Vec::new();

    if !path.exists() {
        return Ok(entries);
    }

    let file = std::fs::File::open(&path)
        .with_context(|| format!("Failed to open admission log: {:?}", path))?;
    let reader = BufReader::new(file);

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AdmissionEntry = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse admission entry: {}", line))?;
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::{CaseRecord, Tolerance};
    use tempfile::TempDir;

    fn make_entry(admitted: bool, verdict: Verdict) -> AdmissionEntry {
        let case = Case::from_record(&CaseRecord::new(&["p1"], &["d1"], &["p1"], "pi")).unwrap();
        AdmissionEntry::new(&case, Policy::NoCorruption, admitted, verdict)
    }

    #[test]
    fn test_write_and_load_appends() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().to_str().unwrap();

        let first = vec![make_entry(true, Verdict::ConsistentCase)];
        let second = vec![make_entry(false, Verdict::Inconsistent)];

        let path = write_admission_log(data_dir, &first).unwrap();
        assert!(path.ends_with("admissions/admissions.jsonl"));
        write_admission_log(data_dir, &second).unwrap();

        let loaded = load_admission_log(data_dir).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], first[0]);
        assert!(!loaded[1].admitted);
        assert_eq!(loaded[1].policy, Policy::NoCorruption);
    }

    #[test]
    fn test_missing_log_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().to_str().unwrap();
        assert!(load_admission_log(data_dir).unwrap().is_empty());
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = make_entry(true, Verdict::Tolerated(Tolerance::Tainted));
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["policy"], "NO_CORRUPTION");
        assert_eq!(json["verdict"]["tolerated"], "TAINTED");
        assert_eq!(json["case_id"].as_str().unwrap().len(), 16);
        assert!(json["recorded_at"].as_i64().unwrap() > 0);
    }
}
