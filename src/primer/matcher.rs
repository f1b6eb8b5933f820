use std::fmt;
use std::sync::Arc;

use bio::alignment::pairwise::Aligner;
use serde::{Deserialize, Serialize};

use crate::common::SeqRecord;
use crate::primer::{FixedPositionMatcher, FixedRegionExtractor, LocalMatcher, ScoringModel};

/// Strand of the read on which a primer was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Forward,
    ReverseComplement,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Forward => "F",
            Orientation::ReverseComplement => "RC",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a primer (or an extracted region) sits in a read.
///
/// `start` and `end` are ungapped half-open coordinates on the read in the
/// orientation given by `orientation`. `align_seq` and `align_primer` are the
/// equal-length aligned strings used for the audit log; `align_seq` covers
/// the searched part of the read, with `gaps` gap characters inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimerAlignment {
    pub primer: String,
    pub start: usize,
    pub end: usize,
    pub rev_primer: bool,
    pub orientation: Orientation,
    pub gaps: usize,
    pub error: f64,
    pub align_seq: String,
    pub align_primer: String,
}

impl PrimerAlignment {
    pub fn is_reverse_complement(&self) -> bool {
        self.orientation == Orientation::ReverseComplement
    }
}

/// Per-worker scratch space. The local matcher keeps its dynamic programming
/// buffers here, so they are allocated once per thread instead of once per
/// read.
#[derive(Default)]
pub struct MatchScratch {
    local: Option<(ScoringModel, Aligner<ScoringModel>)>,
}

impl MatchScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aligner for `scoring`, rebuilt when the scratch was last used with a
    /// different scoring model.
    pub(crate) fn aligner(
        &mut self,
        scoring: &ScoringModel,
        m: usize,
        n: usize,
    ) -> &mut Aligner<ScoringModel> {
        if self.local.as_ref().is_some_and(|(s, _)| s != scoring) {
            self.local = None;
        }
        let (_, aligner) = self.local.get_or_insert_with(|| {
            let gap = scoring.gap_penalty();
            let aligner = Aligner::with_capacity(
                m,
                n,
                gap.bio_gap_open(),
                gap.bio_gap_extend(),
                scoring.clone(),
            );
            (scoring.clone(), aligner)
        });
        aligner
    }
}

/// Common interface of the primer matching strategies.
pub trait PrimerMatcher {
    /// Best placement of a primer in `record`, or `None` when nothing can be
    /// placed at all. Error thresholds are applied by the caller.
    fn find_with(&self, record: &SeqRecord, scratch: &mut MatchScratch) -> Option<PrimerAlignment>;

    fn find(&self, record: &SeqRecord) -> Option<PrimerAlignment> {
        self.find_with(record, &mut MatchScratch::new())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    #[default]
    Local,
    FixedPosition,
    FixedRegion,
}

impl MatcherKind {
    /// Matchers that look up named primers, as opposed to cutting a region.
    pub fn uses_primers(&self) -> bool {
        !matches!(self, MatcherKind::FixedRegion)
    }
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            MatcherKind::Local => "local",
            MatcherKind::FixedPosition => "fixed_position",
            MatcherKind::FixedRegion => "fixed_region",
        })
    }
}

/// The matching strategy chosen for a run. Built once before the workers
/// start and shared read-only between them.
#[derive(Debug, Clone)]
pub enum Matcher {
    Local(Arc<LocalMatcher>),
    FixedPosition(Arc<FixedPositionMatcher>),
    FixedRegion(FixedRegionExtractor),
}

impl Matcher {
    pub fn kind(&self) -> MatcherKind {
        match self {
            Matcher::Local(_) => MatcherKind::Local,
            Matcher::FixedPosition(_) => MatcherKind::FixedPosition,
            Matcher::FixedRegion(_) => MatcherKind::FixedRegion,
        }
    }
}

impl PrimerMatcher for Matcher {
    fn find_with(&self, record: &SeqRecord, scratch: &mut MatchScratch) -> Option<PrimerAlignment> {
        match self {
            Matcher::Local(m) => m.find_with(record, scratch),
            Matcher::FixedPosition(m) => m.find_with(record, scratch),
            Matcher::FixedRegion(m) => m.find_with(record, scratch),
        }
    }
}

/// Pad `s` on the left with spaces to `width` characters.
pub(crate) fn right_justify(s: &str, width: usize) -> String {
    format!("{:>width$}", s, width = width)
}

pub(crate) fn gap_run(n: usize) -> String {
    "-".repeat(n)
}

pub(crate) fn error_rate(score: i32, primer_len: usize) -> f64 {
    if primer_len == 0 {
        return 1.0;
    }
    (1.0 - score as f64 / primer_len as f64).clamp(0.0, 1.0)
}
