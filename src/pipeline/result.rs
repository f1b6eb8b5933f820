use std::fmt;

use crate::common::SeqRecord;

/// Audit fields recorded for one read, in the order they are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadLog {
    fields: Vec<(&'static str, String)>,
}

impl ReadLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<V: ToString>(&mut self, key: &'static str, value: V) {
        self.fields.push((key, value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// `KEY> value` lines, one per field.
impl fmt::Display for ReadLog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (key, value) in &self.fields {
            writeln!(f, "{}> {}", key, value)?;
        }
        Ok(())
    }
}

/// Outcome of one read, handed from a worker to the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerResult {
    /// Position of the read in the input.
    pub index: usize,
    pub id: String,
    /// The read as it came in. Absent when the input record was unreadable.
    pub original: Option<SeqRecord>,
    /// The rewritten read, present whenever a primer was placed.
    pub masked: Option<SeqRecord>,
    pub valid: bool,
    pub log: ReadLog,
}

impl WorkerResult {
    pub fn failed(index: usize, original: SeqRecord, log: ReadLog) -> Self {
        WorkerResult {
            index,
            id: original.id.clone(),
            original: Some(original),
            masked: None,
            valid: false,
            log,
        }
    }

    pub fn malformed(index: usize, reason: &str) -> Self {
        let id = format!("record_{}", index);
        let mut log = ReadLog::new();
        log.push("ID", &id);
        log.push("MALFORMED", reason);
        WorkerResult {
            index,
            id,
            original: None,
            masked: None,
            valid: false,
            log,
        }
    }
}
