use std::fmt;
use std::ops::Range;

use crate::common::dna;

/// Annotation fields of a read. Keys are unique; inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    fields: Vec<(String, String)>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(field) => field.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A single sequencing read. Records are never edited in place by the
/// masking transform; it builds a new record instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
    pub annotations: Annotations,
}

impl SeqRecord {
    pub fn new<I: Into<String>>(id: I, seq: &[u8]) -> Self {
        SeqRecord {
            id: id.into(),
            desc: None,
            seq: seq.to_vec(),
            qual: None,
            annotations: Annotations::new(),
        }
    }

    pub fn with_qual(mut self, qual: &[u8]) -> Self {
        self.qual = Some(qual.to_vec());
        self
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn seq_str(&self) -> String {
        String::from_utf8_lossy(&self.seq).into_owned()
    }

    /// Reverse complement of the sequence with reversed qualities.
    pub fn revcomp(&self) -> SeqRecord {
        SeqRecord {
            id: self.id.clone(),
            desc: self.desc.clone(),
            seq: dna::revcomp(&self.seq),
            qual: self
                .qual
                .as_ref()
                .map(|q| q.iter().rev().copied().collect()),
            annotations: self.annotations.clone(),
        }
    }

    /// A new record holding `range` of this one. Annotations are carried over.
    pub fn slice(&self, range: Range<usize>) -> SeqRecord {
        SeqRecord {
            id: self.id.clone(),
            desc: self.desc.clone(),
            seq: self.seq[range.clone()].to_vec(),
            qual: self.qual.as_ref().map(|q| q[range].to_vec()),
            annotations: self.annotations.clone(),
        }
    }
}

impl fmt::Display for SeqRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.id, String::from_utf8_lossy(&self.seq))
    }
}
