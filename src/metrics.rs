//! Structured performance/quality metrics.
//!
//! A [`MetricsLog`] owns one destination per process lifetime: a JSON-Lines
//! file with a timestamp-derived name, created lazily on the first commit
//! and appended to until the log is dropped. Records are built field by
//! field against a fixed, pre-declared schema and committed as discrete
//! lines; committing clears the in-progress record for reuse.
//!
//! The log is an explicitly owned object handed to the runner and pipeline,
//! never ambient global state.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::info;

/// The pre-declared metric field names, one value each per committed record.
pub const METRIC_FIELDS: [&str; 21] = [
    "Input",
    "Intrinsic_dim",
    "Ambient_dim",
    "Sparsity",
    "Num_points_in_input",
    "Num_points",
    "Initial_num_inconsistent_local_tr",
    "Best_num_inconsistent_local_tr",
    "Final_num_inconsistent_local_tr",
    "Init_time",
    "Comput_time",
    "Perturb_successful",
    "Perturb_time",
    "Perturb_steps",
    "Add_higher_dim_simpl_time",
    "Result_pure_pseudomanifold",
    "Result_num_wrong_dim_simplices",
    "Result_num_wrong_number_of_cofaces",
    "Result_num_unconnected_stars",
    "Num_threads",
    "Info",
];

/// Value recorded for declared fields that were never set before a commit,
/// and for stages that did not run.
pub const NOT_APPLICABLE: &str = "N/A";

/// Errors produced by the metrics log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MetricsError {
    /// The field name is not part of the declared schema.
    #[error("Unknown metric field: {name}")]
    UnknownField {
        /// The rejected field name.
        name: String,
    },

    /// The destination file could not be created or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Record serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Append-only structured record log.
pub struct MetricsLog {
    directory: PathBuf,
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    current: BTreeMap<&'static str, String>,
    committed: usize,
}

impl MetricsLog {
    /// Creates a log that will write under `directory`.
    ///
    /// Nothing is touched on disk until the first [`commit`](Self::commit).
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            writer: None,
            path: None,
            current: BTreeMap::new(),
            committed: 0,
        }
    }

    /// Sets one field of the in-progress record.
    ///
    /// # Errors
    ///
    /// Rejects names outside the declared [`METRIC_FIELDS`] schema.
    pub fn set(&mut self, field: &str, value: impl Display) -> Result<(), MetricsError> {
        let canonical = METRIC_FIELDS
            .iter()
            .find(|&&f| f == field)
            .ok_or_else(|| MetricsError::UnknownField {
                name: field.to_string(),
            })?;
        self.current.insert(canonical, value.to_string());
        Ok(())
    }

    /// Commits the in-progress record as one JSON line and clears it.
    ///
    /// Every declared field is written; unset fields get
    /// [`NOT_APPLICABLE`]. The destination file is created on the first
    /// commit with a timestamp-derived name.
    pub fn commit(&mut self) -> Result<(), MetricsError> {
        let mut record: BTreeMap<&'static str, &str> = BTreeMap::new();
        for field in METRIC_FIELDS {
            record.insert(field, self.current.get(field).map_or(NOT_APPLICABLE, String::as_str));
        }

        if self.writer.is_none() {
            let (path, file) = self.create_destination()?;
            info!(path = %path.display(), "opened metrics log");
            self.path = Some(path);
            self.writer = Some(BufWriter::new(file));
        }
        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, &record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        self.current.clear();
        self.committed += 1;
        Ok(())
    }

    /// Destination path, once the first commit has opened it.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of committed records.
    #[must_use]
    pub fn committed(&self) -> usize {
        self.committed
    }

    fn create_destination(&self) -> Result<(PathBuf, File), MetricsError> {
        fs::create_dir_all(&self.directory)?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        // Pid in the name keeps concurrent runners from clobbering each
        // other within the same second.
        let filename = format!("performance_log_{timestamp}_{}.jsonl", std::process::id());
        let path = self.directory.join(filename);
        let file = File::options().create(true).append(true).open(&path)?;
        Ok((path, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_records(log: &MetricsLog) -> Vec<serde_json::Value> {
        let text = fs::read_to_string(log.path().unwrap()).unwrap();
        text.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut log = MetricsLog::new("unused");
        assert!(matches!(
            log.set("Bogus_field", 1),
            Err(MetricsError::UnknownField { .. })
        ));
    }

    #[test]
    fn destination_is_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = MetricsLog::new(dir.path().join("perf_logs"));
        assert!(log.path().is_none());
        assert!(!dir.path().join("perf_logs").exists());

        log.set("Input", "sphere").unwrap();
        log.commit().unwrap();
        assert!(log.path().is_some());
        assert!(log.path().unwrap().exists());
    }

    #[test]
    fn commit_writes_all_declared_fields_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = MetricsLog::new(dir.path());
        log.set("Input", "klein").unwrap();
        log.set("Intrinsic_dim", 2).unwrap();
        log.commit().unwrap();
        // Second record reuses the cleared buffer.
        log.set("Input", "sphere").unwrap();
        log.commit().unwrap();

        let records = read_records(&log);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Input"], "klein");
        assert_eq!(records[0]["Intrinsic_dim"], "2");
        assert_eq!(records[0]["Perturb_time"], NOT_APPLICABLE);
        assert_eq!(records[1]["Input"], "sphere");
        assert_eq!(records[1]["Intrinsic_dim"], NOT_APPLICABLE);
        for field in METRIC_FIELDS {
            assert!(records[0].get(field).is_some(), "missing field {field}");
        }
        assert_eq!(log.committed(), 2);
    }
}
