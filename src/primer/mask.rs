use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::{dna, SeqRecord};
use crate::primer::{MaskConfig, PrimerAlignment};

/// Annotation recording the strand on which the primer was found.
pub const SEQORIENT_FIELD: &str = "SEQORIENT";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaskMode {
    /// Remove the primer and the sequence preceding it.
    Cut,
    /// Replace the primer with Ns and remove the preceding sequence.
    #[default]
    Mask,
    /// Remove the sequence preceding the primer only.
    Trim,
    /// Leave the sequence untouched.
    Tag,
}

impl FromStr for MaskMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.to_lowercase().as_str() {
            "cut" => MaskMode::Cut,
            "mask" => MaskMode::Mask,
            "trim" => MaskMode::Trim,
            "tag" => MaskMode::Tag,
            _ => return Err(format!("Invalid mask mode: {}", s)),
        };
        Ok(mode)
    }
}

impl fmt::Display for MaskMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            MaskMode::Cut => "cut",
            MaskMode::Mask => "mask",
            MaskMode::Trim => "trim",
            MaskMode::Tag => "tag",
        })
    }
}

/// Rewrite `record` around `alignment` according to the configured mode.
///
/// The output is built from the read in the orientation the primer was found
/// in, except in tag mode, which returns the input bytes unchanged. Barcode
/// coordinates always follow the alignment orientation. "Preceding" means towards the read start, or towards the read end
/// when the primer was searched from the tail. The barcode, if requested,
/// is the sequence between that boundary and the primer.
pub fn mask_seq(record: &SeqRecord, alignment: &PrimerAlignment, config: &MaskConfig) -> SeqRecord {
    let seq = if alignment.is_reverse_complement() {
        record.revcomp()
    } else {
        record.clone()
    };

    let len = seq.len();
    let start = alignment.start.min(len);
    let end = alignment.end.clamp(start, len);
    let rev = alignment.rev_primer;

    let mut out = match config.mode {
        // the read keeps its input orientation; only annotations are added
        MaskMode::Tag => record.clone(),
        MaskMode::Trim if rev => seq.slice(0..end),
        MaskMode::Trim => seq.slice(start..len),
        MaskMode::Cut if rev => seq.slice(0..start),
        MaskMode::Cut => seq.slice(end..len),
        MaskMode::Mask if rev => mask_region(&seq, 0..start, end - start, true),
        MaskMode::Mask => mask_region(&seq, end..len, end - start, false),
    };

    out.annotations
        .insert(SEQORIENT_FIELD, alignment.orientation.as_str());
    if config.barcode {
        let barcode = if rev { &seq.seq[end..] } else { &seq.seq[..start] };
        out.annotations.insert(
            config.barcode_field.as_str(),
            String::from_utf8_lossy(barcode).into_owned(),
        );
    }
    out.annotations
        .insert(config.primer_field.as_str(), alignment.primer.as_str());
    out
}

/// Keep `keep` of `seq` and attach `n_masked` masking characters on the
/// primer side of it.
fn mask_region(
    seq: &SeqRecord,
    keep: std::ops::Range<usize>,
    n_masked: usize,
    masked_last: bool,
) -> SeqRecord {
    let kept = seq.slice(keep);
    let mask = vec![dna::MASK_CHAR; n_masked];
    let mask_qual = vec![dna::MASK_QUAL; n_masked];

    let join = |a: &[u8], b: &[u8]| -> Vec<u8> { [a, b].concat() };
    let (new_seq, new_qual) = if masked_last {
        (
            join(&kept.seq, &mask),
            kept.qual.as_ref().map(|q| join(q, &mask_qual)),
        )
    } else {
        (
            join(&mask, &kept.seq),
            kept.qual.as_ref().map(|q| join(&mask_qual, q)),
        )
    };

    SeqRecord {
        seq: new_seq,
        qual: new_qual,
        ..kept
    }
}
