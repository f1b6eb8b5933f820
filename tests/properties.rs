use maskprimers::common::dna;
use maskprimers::pipeline::process_record;
use maskprimers::primer::{
    LocalMatcher, MaskConfig, MaskMode, MatcherKind, Orientation, PrimerMatcher, PrimerSet,
    ScoringModel,
};
use maskprimers::SeqRecord;
use proptest::prelude::*;

// Contains both G and C, so it cannot occur in an [AC] background or in the
// reverse complement of one.
const PRIMER_A: &str = "GACTTGCAGC";
const PRIMER_B: &str = "GCCATGTCAG";

fn primers() -> PrimerSet {
    PrimerSet::from_pairs([("PA", PRIMER_A), ("PB", PRIMER_B)]).unwrap()
}

fn local_config() -> MaskConfig {
    MaskConfig {
        matcher: MatcherKind::Local,
        max_len: 100,
        mode: MaskMode::Cut,
        ..MaskConfig::default()
    }
}

fn embed(prefix: &str, primer: &str, suffix: &str) -> SeqRecord {
    SeqRecord::new("read", format!("{}{}{}", prefix, primer, suffix).as_bytes())
}

#[test]
fn test_fixed_position_example() {
    let config = MaskConfig {
        matcher: MatcherKind::FixedPosition,
        start: 4,
        mode: MaskMode::Cut,
        ..MaskConfig::default()
    };
    let matcher = config
        .build_matcher(Some(PrimerSet::from_pairs([("P1", "ACGTACGT")]).unwrap()))
        .unwrap();
    let read = SeqRecord::new("r1", b"NNNNACGTACGTTTTTT");

    let result = process_record(0, read, &matcher, &config);
    let masked = result.masked.unwrap();
    assert!(result.valid);
    assert_eq!(result.log.get("ERROR"), Some("0.0"));
    assert_eq!(masked.annotations.get("PRIMER"), Some("P1"));
    assert_eq!(masked.seq, b"TTTTT".to_vec());
}

proptest! {
    #[test]
    fn prop_local_and_fixed_agree_on_exact_primer(
        prefix in "[AC]{0,30}",
        suffix in "[AC]{0,30}",
        second in any::<bool>(),
    ) {
        let primer = if second { PRIMER_B } else { PRIMER_A };
        let read = embed(&prefix, primer, &suffix);

        let local = local_config().build_matcher(Some(primers())).unwrap();
        let fixed = MaskConfig {
            matcher: MatcherKind::FixedPosition,
            start: prefix.len(),
            ..MaskConfig::default()
        }
        .build_matcher(Some(primers()))
        .unwrap();

        let a = local.find(&read).unwrap();
        let b = fixed.find(&read).unwrap();
        prop_assert_eq!(&a.primer, &b.primer);
        prop_assert_eq!(a.error, 0.0);
        prop_assert_eq!(b.error, 0.0);
        prop_assert_eq!((a.start, a.end), (b.start, b.end));
    }

    #[test]
    fn prop_error_above_threshold_is_invalid(
        seq in "[ACGTN]{5,60}",
        max_error in 0.0f64..=1.0,
        mode in prop_oneof![Just(MaskMode::Cut), Just(MaskMode::Mask), Just(MaskMode::Trim), Just(MaskMode::Tag)],
    ) {
        let config = MaskConfig { max_error, mode, ..local_config() };
        let matcher = config.build_matcher(Some(primers())).unwrap();
        let result = process_record(0, SeqRecord::new("r", seq.as_bytes()), &matcher, &config);

        if let Some(error) = result.log.get("ERROR") {
            let error: f64 = error.parse().unwrap();
            if error > max_error {
                prop_assert!(!result.valid);
            }
        } else {
            prop_assert!(!result.valid);
        }
    }

    #[test]
    fn prop_tag_mode_keeps_sequence(prefix in "[ACGT]{0,20}", suffix in "[ACGT]{0,20}") {
        let config = MaskConfig { mode: MaskMode::Tag, barcode: true, ..local_config() };
        let matcher = config.build_matcher(Some(primers())).unwrap();
        let read = embed(&prefix, PRIMER_A, &suffix);

        let result = process_record(0, read.clone(), &matcher, &config);
        let masked = result.masked.unwrap();
        prop_assert_eq!(&masked.seq, &read.seq);
        prop_assert!(masked.annotations.contains_key("PRIMER"));

        // same for the reverse complemented read
        let flipped = read.revcomp();
        let result = process_record(0, flipped.clone(), &matcher, &config);
        let masked = result.masked.unwrap();
        prop_assert_eq!(&masked.seq, &flipped.seq);
        prop_assert!(masked.annotations.contains_key("SEQORIENT"));
    }

    #[test]
    fn prop_cut_accounts_for_every_base(prefix in "[AC]{0,30}", suffix in "[AC]{1,30}") {
        let config = local_config();
        let matcher = config.build_matcher(Some(primers())).unwrap();
        let read = embed(&prefix, PRIMER_B, &suffix);

        let hit = matcher.find(&read).unwrap();
        let result = process_record(0, read.clone(), &matcher, &config);
        let cut = result.masked.unwrap();
        prop_assert_eq!(cut.len() + hit.end, read.len());
        prop_assert_eq!(hit.end - hit.start, PRIMER_B.len());
    }

    #[test]
    fn prop_reverse_complement_symmetry(prefix in "[AC]{0,30}", suffix in "[AC]{0,30}") {
        let matcher = local_config().build_matcher(Some(primers())).unwrap();
        let read = embed(&prefix, PRIMER_A, &suffix);
        let flipped = read.revcomp();

        let forward = matcher.find(&read).unwrap();
        let reverse = matcher.find(&flipped).unwrap();
        prop_assert_eq!(forward.orientation, Orientation::Forward);
        prop_assert_eq!(reverse.orientation, Orientation::ReverseComplement);
        prop_assert_eq!(&forward.primer, &reverse.primer);
        prop_assert_eq!(forward.error, reverse.error);
        prop_assert_eq!((forward.start, forward.end), (reverse.start, reverse.end));
    }

    #[test]
    fn prop_revcomp_primers_agree_with_revcomp_search(
        prefix in "[AC]{0,30}",
        suffix in "[AC]{0,30}",
        second in any::<bool>(),
        pos in 1usize..9,
        base in 0usize..4,
    ) {
        // the read carries the reverse complement of a primer with at most
        // one substitution away from its ends
        let primer = if second { PRIMER_B } else { PRIMER_A };
        let mut mutated = primer.as_bytes().to_vec();
        mutated[pos] = b"ACGT"[base];
        let mut seq = prefix.as_bytes().to_vec();
        seq.extend(dna::revcomp(&mutated));
        seq.extend_from_slice(suffix.as_bytes());
        let read = SeqRecord::new("read", &seq);

        // primers as written, both strands of the read searched
        let both_strands = local_config().build_matcher(Some(primers())).unwrap();
        // reverse complemented primers, read searched as given from its tail
        let tail = LocalMatcher::new(primers().revcomp(), ScoringModel::default(), 100, true, true)
            .unwrap();

        let a = both_strands.find(&read).unwrap();
        let b = tail.find(&read).unwrap();
        prop_assert_eq!(a.orientation, Orientation::ReverseComplement);
        prop_assert_eq!(b.orientation, Orientation::Forward);
        prop_assert_eq!(&a.primer, &b.primer);
        prop_assert_eq!(a.error, b.error);
        // a is placed on the reverse complement, b on the read itself
        prop_assert_eq!((a.start, a.end), (read.len() - b.end, read.len() - b.start));
    }
}

#[test]
fn test_rev_primer_finds_tail_primer() {
    // the primer as written in the primer file, found reverse complemented
    // at the end of the read
    let config = MaskConfig {
        rev_primer: true,
        skip_rc: true,
        ..local_config()
    };
    let matcher = config.build_matcher(Some(primers())).unwrap();
    let tail = String::from_utf8(dna::revcomp(PRIMER_A.as_bytes())).unwrap();
    let read = embed("ACACACACACCA", &tail, "AAC");

    let result = process_record(0, read, &matcher, &config);
    assert!(result.valid);
    assert_eq!(result.log.get("PRIMER"), Some("PA"));
    assert_eq!(result.log.get("PRORIENT"), Some("RC"));
    assert_eq!(result.masked.unwrap().seq, b"ACACACACACCA".to_vec());
}
