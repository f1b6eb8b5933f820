//! Local alignment of primers against the head (or tail) of a read.
use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation::{Del, Ins, Match, Subst};
use log::trace;

use crate::common::SeqRecord;
use crate::primer::matcher::{error_rate, gap_run};
use crate::primer::{
    CompiledPrimers, MatchScratch, Orientation, PrimerAlignment, PrimerMatcher, PrimerSet,
    ScoringModel,
};
use crate::runtime::Error;

#[derive(Debug)]
pub struct LocalMatcher {
    primers: PrimerSet,
    compiled: CompiledPrimers,
    scoring: ScoringModel,
    max_len: usize,
    rev_primer: bool,
    skip_rc: bool,
}

impl LocalMatcher {
    pub fn new(
        primers: PrimerSet,
        scoring: ScoringModel,
        max_len: usize,
        rev_primer: bool,
        skip_rc: bool,
    ) -> Result<Self, Error> {
        if max_len == 0 {
            return Err(Error::invalid_config("max_len", Some("must be positive")));
        }
        scoring.gap_penalty().validate()?;
        let compiled = CompiledPrimers::compile(&primers, &scoring)?;
        Ok(LocalMatcher {
            primers,
            compiled,
            scoring,
            max_len,
            rev_primer,
            skip_rc,
        })
    }

    pub fn primers(&self) -> &PrimerSet {
        &self.primers
    }

    fn orientations(&self, record: &SeqRecord) -> Vec<(Orientation, Vec<u8>)> {
        let mut out = vec![(Orientation::Forward, record.seq.clone())];
        if !self.skip_rc {
            out.push((Orientation::ReverseComplement, record.revcomp().seq));
        }
        out
    }

    /// Searched part of the read and its offset into the read.
    fn window<'a>(&self, seq: &'a [u8]) -> (usize, &'a [u8]) {
        let wlen = self.max_len.min(seq.len());
        if self.rev_primer {
            let offset = seq.len() - wlen;
            (offset, &seq[offset..])
        } else {
            (0, &seq[..wlen])
        }
    }

    fn exact_hit(&self, orientation: Orientation, seq: &[u8]) -> Option<PrimerAlignment> {
        let (offset, window) = self.window(seq);
        for (idx, primer) in self.primers.iter().enumerate() {
            let Some(regex) = self.compiled.get(idx) else {
                continue;
            };
            if let Some(m) = regex.find(window) {
                return Some(PrimerAlignment {
                    primer: primer.name.clone(),
                    start: offset + m.start(),
                    end: offset + m.end(),
                    rev_primer: self.rev_primer,
                    orientation,
                    gaps: 0,
                    error: 0.0,
                    align_seq: String::from_utf8_lossy(window).into_owned(),
                    align_primer: format!(
                        "{}{}{}",
                        gap_run(m.start()),
                        String::from_utf8_lossy(&primer.seq),
                        gap_run(window.len() - m.end())
                    ),
                });
            }
        }
        None
    }

    /// Highest scoring local alignment of any primer against the window.
    /// Equal scores keep the earlier primer.
    fn best_alignment(
        &self,
        orientation: Orientation,
        seq: &[u8],
        aligner: &mut Aligner<ScoringModel>,
    ) -> Option<PrimerAlignment> {
        let (offset, window) = self.window(seq);
        if window.is_empty() {
            return None;
        }

        let mut best: Option<(i32, PrimerAlignment)> = None;
        for primer in self.primers.iter() {
            let aln = aligner.local(window, &primer.seq);
            if aln.score <= 0 {
                continue;
            }
            if best.as_ref().is_some_and(|(score, _)| *score >= aln.score) {
                continue;
            }

            let plen = primer.len();
            let wlen = window.len();
            let (align_seq, align_primer) = render_local(window, &primer.seq, &aln);
            let gaps = align_seq.bytes().filter(|&c| c == b'-').count();

            // the footprint covers primer overhang on both sides of the aligned core
            let start = aln.xstart.saturating_sub(aln.ystart);
            let end = (aln.xend + (plen - aln.yend)).min(wlen);

            let alignment = PrimerAlignment {
                primer: primer.name.clone(),
                start: offset + start,
                end: offset + end,
                rev_primer: self.rev_primer,
                orientation,
                gaps,
                error: error_rate(aln.score, plen),
                align_seq,
                align_primer,
            };
            best = Some((aln.score, alignment));
        }
        best.map(|(_, alignment)| alignment)
    }
}

/// Full-width aligned strings of a local alignment: the whole window against
/// the whole primer, aligned cores lined up and the rest padded with gaps.
fn render_local(window: &[u8], primer: &[u8], aln: &bio::alignment::Alignment) -> (String, String) {
    let mut x = Vec::with_capacity(window.len() + primer.len());
    let mut y = Vec::with_capacity(window.len() + primer.len());

    let lead = aln.xstart.max(aln.ystart);
    x.extend(std::iter::repeat(b'-').take(lead - aln.xstart));
    x.extend_from_slice(&window[..aln.xstart]);
    y.extend(std::iter::repeat(b'-').take(lead - aln.ystart));
    y.extend_from_slice(&primer[..aln.ystart]);

    let (mut i, mut j) = (aln.xstart, aln.ystart);
    for op in &aln.operations {
        match op {
            Match | Subst => {
                x.push(window[i]);
                y.push(primer[j]);
                i += 1;
                j += 1;
            }
            Ins => {
                x.push(window[i]);
                y.push(b'-');
                i += 1;
            }
            Del => {
                x.push(b'-');
                y.push(primer[j]);
                j += 1;
            }
            _ => {}
        }
    }

    let x_tail = window.len() - aln.xend;
    let y_tail = primer.len() - aln.yend;
    let trail = x_tail.max(y_tail);
    x.extend_from_slice(&window[aln.xend..]);
    x.extend(std::iter::repeat(b'-').take(trail - x_tail));
    y.extend_from_slice(&primer[aln.yend..]);
    y.extend(std::iter::repeat(b'-').take(trail - y_tail));

    (
        String::from_utf8_lossy(&x).into_owned(),
        String::from_utf8_lossy(&y).into_owned(),
    )
}

impl PrimerMatcher for LocalMatcher {
    fn find_with(&self, record: &SeqRecord, scratch: &mut MatchScratch) -> Option<PrimerAlignment> {
        let oriented = self.orientations(record);

        for (orientation, seq) in &oriented {
            if let Some(hit) = self.exact_hit(*orientation, seq) {
                trace!("{}: exact hit for {} ({})", record.id, hit.primer, orientation);
                return Some(hit);
            }
        }

        let aligner = scratch.aligner(
            &self.scoring,
            self.max_len.min(record.len()),
            self.primers.max_primer_len(),
        );
        let mut best: Option<PrimerAlignment> = None;
        for (orientation, seq) in &oriented {
            if let Some(candidate) = self.best_alignment(*orientation, seq, aligner) {
                if best.as_ref().map_or(true, |b| candidate.error < b.error) {
                    best = Some(candidate);
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::dna;
    use crate::primer::GapPenalty;

    fn matcher(pairs: &[(&str, &str)], max_len: usize, rev: bool, skip_rc: bool) -> LocalMatcher {
        let primers = PrimerSet::from_pairs(pairs.iter().copied()).unwrap();
        LocalMatcher::new(primers, ScoringModel::default(), max_len, rev, skip_rc).unwrap()
    }

    #[test]
    fn test_exact_forward_hit() {
        let m = matcher(&[("P1", "GGGCCCAAA"), ("P2", "ACGTACGT")], 50, false, false);
        let rec = SeqRecord::new("r1", b"TTACGTACGTGGATCC");

        let hit = m.find(&rec).unwrap();
        assert_eq!(hit.primer, "P2");
        assert_eq!((hit.start, hit.end), (2, 10));
        assert_eq!(hit.error, 0.0);
        assert_eq!(hit.gaps, 0);
        assert_eq!(hit.orientation, Orientation::Forward);
        assert_eq!(hit.align_seq, "TTACGTACGTGGATCC");
        assert_eq!(hit.align_primer, "--ACGTACGT------");
    }

    #[test]
    fn test_reverse_complement_hit() {
        let m = matcher(&[("P1", "ACGGATTC")], 50, false, false);
        let body = b"TTTTTACGGATTCCCAGAGAG";
        let rec = SeqRecord::new("r1", &dna::revcomp(body));

        let hit = m.find(&rec).unwrap();
        assert_eq!(hit.orientation, Orientation::ReverseComplement);
        assert_eq!((hit.start, hit.end), (5, 13));

        let skipping = matcher(&[("P1", "ACGGATTC")], 50, false, true);
        let hit = skipping.find(&rec);
        assert!(hit.map_or(true, |h| h.orientation == Orientation::Forward && h.error > 0.0));
    }

    #[test]
    fn test_mismatch_goes_through_aligner() {
        let m = matcher(&[("P1", "ACGTACGTAC")], 50, false, true);
        let rec = SeqRecord::new("r1", b"GGACGTTCGTACTTTTTTTT");

        let hit = m.find(&rec).unwrap();
        assert_eq!(hit.primer, "P1");
        assert_eq!((hit.start, hit.end), (2, 12));
        assert!((hit.error - 0.1).abs() < 1e-9);
        assert_eq!(hit.align_seq.len(), hit.align_primer.len());
    }

    #[test]
    fn test_gap_in_read() {
        let primers = PrimerSet::from_pairs([("P1", "AAAACCCCGGGGTTTT")]).unwrap();
        let m = LocalMatcher::new(
            primers,
            ScoringModel::new(1, 0, GapPenalty::new(1, 1).unwrap()),
            50,
            false,
            true,
        )
        .unwrap();
        // one C missing from the read
        let rec = SeqRecord::new("r1", b"AAAACCCGGGGTTTTATATATATA");
        let hit = m.find(&rec).unwrap();
        assert_eq!(hit.gaps, 1);
        assert!(hit.error > 0.0 && hit.error <= 0.2);
        assert_eq!(hit.align_seq.len() - hit.gaps, 24);
        assert_eq!(hit.end, 15);
    }

    #[test]
    fn test_window_limits_search() {
        let m = matcher(&[("P1", "ACGTACGT")], 6, false, true);
        let rec = SeqRecord::new("r1", b"TTTTTTTTTTACGTACGT");
        let hit = m.find(&rec);
        assert!(hit.map_or(true, |h| h.end <= 6));
    }

    #[test]
    fn test_tail_window_when_rev_primer() {
        let m = matcher(&[("P1", "ACGTACGT")], 12, true, true);
        let rec = SeqRecord::new("r1", b"GGGGGGGGGGGGGGGGTTACGTACGTTT");
        let hit = m.find(&rec).unwrap();
        assert_eq!((hit.start, hit.end), (18, 26));
        assert!(hit.rev_primer);
    }

    #[test]
    fn test_ties_follow_primer_order() {
        let m = matcher(&[("A", "ACGTACGT"), ("B", "ACGTACGT")], 50, false, false);
        let rec = SeqRecord::new("r1", b"ACGTACGTTTT");
        assert_eq!(m.find(&rec).unwrap().primer, "A");
    }

    #[test]
    fn test_highest_score_wins_over_lower_error() {
        // P1 aligns with five mismatches (score 15, error 0.25), P2 with one
        // (score 9, error 0.1)
        let m = matcher(
            &[("P1", "AAAAACCCCCGGGGGTTTTT"), ("P2", "GATCGATCGA")],
            50,
            false,
            true,
        );
        let rec = SeqRecord::new("r1", b"CCAAGAACCTCCGGAGGTTCTAACGATCGTTCGACCCC");

        let hit = m.find(&rec).unwrap();
        assert_eq!(hit.primer, "P1");
        assert_eq!((hit.start, hit.end), (2, 22));
        assert!((hit.error - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_scratch_is_reused_and_rebuilt() {
        let reads: [&[u8]; 3] = [
            b"GGACGTTCGTACTTTTTTTT",
            b"TTTTTTTTTTTTTTTTTTTTGGACGTTCGTACTTTTTTTTTTTTTTTTTTTTTTTT",
            b"ACGAACG",
        ];
        let m = matcher(&[("P1", "ACGTACGTAC")], 50, false, false);
        let mut scratch = MatchScratch::new();
        for read in reads {
            let rec = SeqRecord::new("r", read);
            assert_eq!(m.find_with(&rec, &mut scratch), m.find(&rec));
        }

        // a matcher with other gap penalties must not reuse the old matrices
        let primers = PrimerSet::from_pairs([("P1", "AAAACCCCGGGGTTTT")]).unwrap();
        let gapped = LocalMatcher::new(
            primers,
            ScoringModel::new(1, 0, GapPenalty::new(4, 2).unwrap()),
            50,
            false,
            true,
        )
        .unwrap();
        let rec = SeqRecord::new("r1", b"AAAACCCGGGGTTTTATATATATA");
        assert_eq!(gapped.find_with(&rec, &mut scratch), gapped.find(&rec));
    }

    #[test]
    fn test_no_alignment_for_unrelated_read() {
        let m = matcher(&[("P1", "AAAAAAAA")], 50, false, true);
        let rec = SeqRecord::new("r1", b"CCCCCCCCCCCC");
        assert!(m.find(&rec).is_none());
    }
}
