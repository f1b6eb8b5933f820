use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use bio::io::fasta;
use regex::bytes::Regex;

use crate::common::dna;
use crate::primer::ScoringModel;
use crate::runtime::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primer {
    pub name: String,
    pub seq: Vec<u8>,
}

impl Primer {
    pub fn new(name: impl ToString, seq: &[u8]) -> Self {
        Primer {
            name: name.to_string(),
            seq: seq.to_ascii_uppercase(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Named primers in input order. Input order decides ties between equally
/// good matches, so it is never reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimerSet {
    primers: Vec<Primer>,
}

impl PrimerSet {
    /// Build a primer set, rejecting duplicate names and sequences that are
    /// empty or contain non-IUPAC characters.
    pub fn new(primers: Vec<Primer>) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        for primer in &primers {
            if !seen.insert(primer.name.as_str()) {
                return Err(Error::invalid_config(
                    "primers",
                    Some(format!("duplicate primer name '{}'", primer.name)),
                ));
            }
            if primer.is_empty() {
                return Err(Error::invalid_config(
                    "primers",
                    Some(format!("primer '{}' has an empty sequence", primer.name)),
                ));
            }
            if let Some((pos, c)) = primer
                .seq
                .iter()
                .position(|&c| dna::iupac_bases(c).is_none())
                .map(|pos| (pos, primer.seq[pos]))
            {
                return Err(Error::invalid_config(
                    "primers",
                    Some(format!(
                        "primer '{}' has invalid character '{}' at position {}",
                        primer.name, c as char, pos
                    )),
                ));
            }
        }
        Ok(PrimerSet { primers })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self, Error> {
        let primers = pairs
            .into_iter()
            .map(|(name, seq)| Primer::new(name, seq.as_bytes()))
            .collect();
        Self::new(primers)
    }

    /// Read primers from a FASTA file, keeping file order.
    pub fn from_fasta<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|_| Error::file_not_found(path))?;
        let reader = fasta::Reader::new(file);

        let mut primers = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                Error::parse_error(format!("primer file {:?}", path), Some(e.to_string()))
            })?;
            primers.push(Primer::new(record.id(), record.seq()));
        }

        if primers.is_empty() {
            return Err(Error::file_not_valid(path, Some("no primer records found")));
        }
        Self::new(primers)
    }

    /// Reverse complement of every primer, names unchanged.
    pub fn revcomp(&self) -> PrimerSet {
        PrimerSet {
            primers: self
                .primers
                .iter()
                .map(|p| Primer {
                    name: p.name.clone(),
                    seq: dna::revcomp(&p.seq),
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Primer> {
        self.primers.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Primer> {
        self.primers.get(index)
    }

    pub fn len(&self) -> usize {
        self.primers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primers.is_empty()
    }

    pub fn max_primer_len(&self) -> usize {
        self.primers.iter().map(|p| p.len()).max().unwrap_or(0)
    }
}

/// Exact ambiguity-aware matchers, one per primer in primer-set order.
/// A primer position matches every read character that the scoring model
/// rates as a full match. `None` marks a primer with a position nothing can
/// match exactly.
#[derive(Debug, Clone)]
pub struct CompiledPrimers {
    patterns: Vec<Option<Regex>>,
}

impl CompiledPrimers {
    pub fn compile(primers: &PrimerSet, scoring: &ScoringModel) -> Result<Self, Error> {
        let mut patterns = Vec::with_capacity(primers.len());
        for primer in primers.iter() {
            patterns.push(compile_primer(primer, scoring)?);
        }
        Ok(CompiledPrimers { patterns })
    }

    pub fn get(&self, index: usize) -> Option<&Regex> {
        self.patterns.get(index).and_then(|p| p.as_ref())
    }
}

fn compile_primer(primer: &Primer, scoring: &ScoringModel) -> Result<Option<Regex>, Error> {
    let mut pattern = String::with_capacity(primer.len() * 8);
    for &c in &primer.seq {
        let class: String = dna::IUPAC_CODES
            .iter()
            .filter(|&&r| scoring.score(c, r) >= crate::primer::scoring::MATCH_SCORE)
            .flat_map(|&r| [r as char, r.to_ascii_lowercase() as char])
            .collect();
        if class.is_empty() {
            return Ok(None);
        }
        pattern.push('[');
        pattern.push_str(&class);
        pattern.push(']');
    }

    Regex::new(&pattern).map(Some).map_err(|e| {
        Error::parse_error(format!("primer '{}'", primer.name), Some(e.to_string()))
    })
}
