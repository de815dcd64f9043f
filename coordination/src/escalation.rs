//! Escalation sinks: where tickets that exhaust their retries are recorded
//! for a human agent.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;

use crate::error::SinkError;
use crate::ports::{EscalationRecord, EscalationSink};

/// Customer-facing output for an escalated ticket.
pub const ESCALATION_NOTICE: &str = "Ticket escalated to human agent after max retries.";

/// Column order of the CSV log.
pub const CSV_HEADER: [&str; 6] = [
    "timestamp",
    "subject",
    "description",
    "category",
    "draft",
    "reason",
];

/// Current local time in escalation-log format.
pub fn escalation_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Appends records to a CSV file, writing the header when the file is new.
///
/// Appends from concurrent runs are serialized by an internal lock so rows
/// never interleave.
pub struct CsvEscalationSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvEscalationSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EscalationSink for CsvEscalationSink {
    fn append(&self, record: &EscalationRecord) -> Result<(), SinkError> {
        let _guard = self.lock.lock().map_err(|_| SinkError::Poisoned)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;

        info!(path = %self.path.display(), subject = %record.subject, "Appended escalation record");
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Default)]
pub struct MemoryEscalationSink {
    records: Mutex<Vec<EscalationRecord>>,
}

impl MemoryEscalationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far.
    pub fn records(&self) -> Vec<EscalationRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EscalationSink for MemoryEscalationSink {
    fn append(&self, record: &EscalationRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(subject: &str) -> EscalationRecord {
        EscalationRecord {
            timestamp: "2026-01-05 10:00:00".into(),
            subject: subject.into(),
            description: "Card declined, \"twice\"".into(),
            category: "Billing".into(),
            draft: "Hello Customer,\nwe are looking into it.".into(),
            reason: "Draft rejected after 3 attempts. Feedback: Add refund timeline".into(),
        }
    }

    #[test]
    fn test_csv_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escalation_log.csv");
        let sink = CsvEscalationSink::new(&path);

        sink.append(&record("first")).unwrap();
        sink.append(&record("second")).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADER);

        let rows: Vec<EscalationRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subject, "first");
        assert_eq!(rows[1], record("second"));
    }

    #[test]
    fn test_csv_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/nested/escalations.csv");
        CsvEscalationSink::new(&path).append(&record("x")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_csv_concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escalation_log.csv");
        let sink = Arc::new(CsvEscalationSink::new(&path));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for j in 0..5 {
                        sink.append(&record(&format!("ticket-{i}-{j}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<EscalationRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 40);
        assert!(rows.iter().all(|r| r.draft == "Hello Customer,\nwe are looking into it."));
    }

    #[test]
    fn test_memory_sink_records() {
        let sink = MemoryEscalationSink::new();
        assert!(sink.is_empty());
        sink.append(&record("a")).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].subject, "a");
    }
}
