use crate::common::SeqRecord;
use crate::pipeline::{ReadLog, WorkerResult};
use crate::primer::matcher::right_justify;
use crate::primer::{
    mask_seq, MaskConfig, MatchScratch, Matcher, PrimerAlignment, PrimerMatcher,
};

/// Match, mask and log a single read.
pub fn process_record(
    index: usize,
    record: SeqRecord,
    matcher: &Matcher,
    config: &MaskConfig,
) -> WorkerResult {
    process_record_with(index, record, matcher, config, &mut MatchScratch::new())
}

/// As [`process_record`], reusing the caller's scratch space.
pub fn process_record_with(
    index: usize,
    record: SeqRecord,
    matcher: &Matcher,
    config: &MaskConfig,
    scratch: &mut MatchScratch,
) -> WorkerResult {
    let mut log = ReadLog::new();
    log.push("ID", &record.id);

    let Some(alignment) = matcher.find_with(&record, scratch) else {
        log.push("ALIGN", "None");
        return WorkerResult::failed(index, record, log);
    };

    let masked = mask_seq(&record, &alignment, config);
    let valid = alignment.error <= config.max_error && !masked.is_empty();
    write_alignment_log(&mut log, &record, &alignment, &masked, config);

    WorkerResult {
        index,
        id: record.id.clone(),
        original: Some(record),
        masked: Some(masked),
        valid,
        log,
    }
}

fn write_alignment_log(
    log: &mut ReadLog,
    record: &SeqRecord,
    alignment: &PrimerAlignment,
    masked: &SeqRecord,
    config: &MaskConfig,
) {
    let seq = if alignment.is_reverse_complement() {
        record.revcomp().seq
    } else {
        record.seq.clone()
    };
    let width = seq.len() + alignment.gaps;
    let aligned_read_len = alignment.align_seq.len().saturating_sub(alignment.gaps);

    log.push("SEQORIENT", alignment.orientation);
    log.push("PRIMER", &alignment.primer);
    log.push("PRORIENT", if alignment.rev_primer { "RC" } else { "F" });
    log.push("PRSTART", alignment.start);
    log.push("GAPS", alignment.gaps);
    if config.barcode {
        log.push(
            "BARCODE",
            masked
                .annotations
                .get(&config.barcode_field)
                .unwrap_or_default(),
        );
    }

    if alignment.rev_primer {
        let cut = seq.len().saturating_sub(aligned_read_len);
        log.push(
            "INSEQ",
            format!("{}{}", String::from_utf8_lossy(&seq[..cut]), alignment.align_seq),
        );
        log.push("ALIGN", right_justify(&alignment.align_primer, width));
        log.push("OUTSEQ", masked.seq_str());
    } else {
        let cut = aligned_read_len.min(seq.len());
        log.push(
            "INSEQ",
            format!("{}{}", alignment.align_seq, String::from_utf8_lossy(&seq[cut..])),
        );
        log.push("ALIGN", &alignment.align_primer);
        log.push("OUTSEQ", right_justify(&masked.seq_str(), width));
    }
    log.push("ERROR", format!("{:?}", alignment.error));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primer::{MaskMode, MatcherKind, PrimerSet};
    use pretty_assertions::assert_eq;

    fn fixed_position(start: usize, mode: MaskMode) -> (Matcher, MaskConfig) {
        let config = MaskConfig {
            matcher: MatcherKind::FixedPosition,
            start,
            mode,
            ..MaskConfig::default()
        };
        let primers = PrimerSet::from_pairs([("P1", "ACGTACGT")]).unwrap();
        (config.build_matcher(Some(primers)).unwrap(), config)
    }

    #[test]
    fn test_fixed_position_cut_example() {
        let (matcher, config) = fixed_position(4, MaskMode::Cut);
        let rec = SeqRecord::new("r1", b"NNNNACGTACGTTTTTT");

        let result = process_record(0, rec, &matcher, &config);
        assert!(result.valid);
        let masked = result.masked.unwrap();
        assert_eq!(masked.seq, b"TTTTT".to_vec());
        assert_eq!(masked.annotations.get("PRIMER"), Some("P1"));
        assert_eq!(result.log.get("ERROR"), Some("0.0"));
    }

    #[test]
    fn test_log_strings_forward() {
        let (matcher, config) = fixed_position(2, MaskMode::Cut);
        let rec = SeqRecord::new("r1", b"GGACGTACGTCC");

        let result = process_record(0, rec, &matcher, &config);
        assert_eq!(result.log.get("INSEQ"), Some("GGACGTACGTCC"));
        assert_eq!(result.log.get("ALIGN"), Some("--ACGTACGT"));
        assert_eq!(result.log.get("OUTSEQ"), Some("          CC"));
        assert_eq!(result.log.get("PRSTART"), Some("2"));
        assert_eq!(result.log.get("PRORIENT"), Some("F"));
    }

    #[test]
    fn test_log_strings_reverse() {
        let config = MaskConfig {
            matcher: MatcherKind::FixedRegion,
            start: 2,
            length: 4,
            rev_primer: true,
            mode: MaskMode::Mask,
            ..MaskConfig::default()
        };
        let matcher = config.build_matcher(None).unwrap();
        let rec = SeqRecord::new("r1", b"AACCGGTTAA");

        let result = process_record(0, rec, &matcher, &config);
        assert!(result.valid);
        assert_eq!(result.log.get("PRIMER"), Some("GGTT"));
        assert_eq!(result.log.get("INSEQ"), Some("AACCGGTTAA"));
        assert_eq!(result.log.get("ALIGN"), Some("    GGTT--"));
        assert_eq!(result.log.get("OUTSEQ"), Some("AACCNNNN"));
    }

    #[test]
    fn test_error_above_threshold_is_invalid() {
        let (matcher, mut config) = fixed_position(0, MaskMode::Mask);
        config.max_error = 0.1;
        // two mismatches out of eight
        let rec = SeqRecord::new("r1", b"ACGAACGAGGGG");

        let result = process_record(0, rec, &matcher, &config);
        assert!(!result.valid);
        assert!(result.masked.is_some());
        assert_eq!(result.log.get("ERROR"), Some("0.25"));
    }

    #[test]
    fn test_empty_output_is_invalid() {
        let (matcher, config) = fixed_position(0, MaskMode::Cut);
        let rec = SeqRecord::new("r1", b"ACGTACGT");
        let result = process_record(0, rec, &matcher, &config);
        assert!(!result.valid);
    }

    #[test]
    fn test_no_alignment() {
        let (matcher, config) = fixed_position(10, MaskMode::Cut);
        let rec = SeqRecord::new("r1", b"ACGT");

        let result = process_record(3, rec.clone(), &matcher, &config);
        assert!(!result.valid);
        assert_eq!(result.index, 3);
        assert_eq!(result.original, Some(rec));
        assert_eq!(result.log.to_string(), "ID> r1\nALIGN> None\n");
    }
}
