use crate::common::SeqRecord;
use crate::primer::matcher::gap_run;
use crate::primer::{MatchScratch, Orientation, PrimerAlignment, PrimerMatcher};

/// Cuts a fixed region out of the read. The region's own sequence takes the
/// place of the primer name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRegionExtractor {
    start: usize,
    length: usize,
    rev_primer: bool,
}

impl FixedRegionExtractor {
    pub fn new(start: usize, length: usize, rev_primer: bool) -> Self {
        FixedRegionExtractor {
            start,
            length,
            rev_primer,
        }
    }

    pub fn region(&self, read_len: usize) -> Option<(usize, usize)> {
        if self.rev_primer {
            let end = read_len.checked_sub(self.start)?;
            let start = end.checked_sub(self.length)?;
            Some((start, end))
        } else {
            let end = self.start.checked_add(self.length)?;
            (end <= read_len).then_some((self.start, end))
        }
    }
}

impl PrimerMatcher for FixedRegionExtractor {
    fn find_with(&self, record: &SeqRecord, _scratch: &mut MatchScratch) -> Option<PrimerAlignment> {
        let seq = &record.seq;
        let (start, end) = self.region(seq.len())?;
        let region = String::from_utf8_lossy(&seq[start..end]).into_owned();

        let (align_seq, align_primer) = if self.rev_primer {
            (
                String::from_utf8_lossy(&seq[start..]).into_owned(),
                format!("{}{}", region, gap_run(seq.len() - end)),
            )
        } else {
            (
                String::from_utf8_lossy(&seq[..end]).into_owned(),
                format!("{}{}", gap_run(start), region),
            )
        };

        Some(PrimerAlignment {
            primer: region,
            start,
            end,
            rev_primer: self.rev_primer,
            orientation: Orientation::Forward,
            gaps: 0,
            error: 0.0,
            align_seq,
            align_primer,
        })
    }
}
