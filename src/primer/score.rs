use crate::common::SeqRecord;
use crate::primer::matcher::{error_rate, gap_run};
use crate::primer::{
    MatchScratch, Orientation, PrimerAlignment, PrimerMatcher, PrimerSet, ScoringModel,
};

/// Ungapped scoring of every primer at a fixed offset from the start of the
/// read, or from the end when `rev_primer` is set. The reverse complement of
/// the read is never searched.
#[derive(Debug)]
pub struct FixedPositionMatcher {
    primers: PrimerSet,
    scoring: ScoringModel,
    start: usize,
    rev_primer: bool,
}

impl FixedPositionMatcher {
    pub fn new(primers: PrimerSet, scoring: ScoringModel, start: usize, rev_primer: bool) -> Self {
        FixedPositionMatcher {
            primers,
            scoring,
            start,
            rev_primer,
        }
    }

    pub fn primers(&self) -> &PrimerSet {
        &self.primers
    }

    /// Read region compared against a primer of length `plen`.
    fn region(&self, read_len: usize, plen: usize) -> Option<(usize, usize)> {
        if self.rev_primer {
            let end = read_len.checked_sub(self.start)?;
            let start = end.checked_sub(plen)?;
            Some((start, end))
        } else {
            let end = self.start.checked_add(plen)?;
            (end <= read_len).then_some((self.start, end))
        }
    }
}

impl PrimerMatcher for FixedPositionMatcher {
    fn find_with(&self, record: &SeqRecord, _scratch: &mut MatchScratch) -> Option<PrimerAlignment> {
        let seq = &record.seq;
        let mut best: Option<PrimerAlignment> = None;

        for primer in self.primers.iter() {
            let Some((start, end)) = self.region(seq.len(), primer.len()) else {
                continue;
            };
            let score = self.scoring.score_slices(&seq[start..end], &primer.seq);
            let error = error_rate(score, primer.len());
            if best.as_ref().is_some_and(|b| b.error <= error) {
                continue;
            }

            let primer_str = String::from_utf8_lossy(&primer.seq);
            let (align_seq, align_primer) = if self.rev_primer {
                (
                    String::from_utf8_lossy(&seq[start..]).into_owned(),
                    format!("{}{}", primer_str, gap_run(seq.len() - end)),
                )
            } else {
                (
                    String::from_utf8_lossy(&seq[..end]).into_owned(),
                    format!("{}{}", gap_run(start), primer_str),
                )
            };

            best = Some(PrimerAlignment {
                primer: primer.name.clone(),
                start,
                end,
                rev_primer: self.rev_primer,
                orientation: Orientation::Forward,
                gaps: 0,
                error,
                align_seq,
                align_primer,
            });
        }
        best
    }
}
