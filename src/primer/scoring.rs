//! Pairwise character scores for IUPAC nucleotides and the affine gap
//! penalties used by the local aligner.
use bio::alignment::pairwise::MatchFunc;
use serde::{Deserialize, Serialize};

use crate::common::dna;
use crate::runtime::Error;

pub const MATCH_SCORE: i32 = 1;
pub const MISMATCH_SCORE: i32 = 0;

/// Alphabet indexed by the score table. Anything else scores as a mismatch.
const ALPHABET_LEN: usize = 17;
const ALPHABET: &[u8; ALPHABET_LEN] = b"ACGTRYSWKMBDHVN-.";
const UNKNOWN: u8 = u8::MAX;

const fn build_index() -> [u8; 256] {
    let mut index = [UNKNOWN; 256];
    let mut i = 0;
    while i < ALPHABET_LEN {
        let c = ALPHABET[i];
        index[c as usize] = i as u8;
        index[c.to_ascii_lowercase() as usize] = i as u8;
        i += 1;
    }
    // uracil scores as thymine
    index[b'U' as usize] = 3;
    index[b'u' as usize] = 3;
    index
}

static INDEX: [u8; 256] = build_index();

/// Affine gap penalties as positive costs: a gap of length `k` costs
/// `open + (k - 1) * extend`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapPenalty {
    pub open: i32,
    pub extend: i32,
}

impl Default for GapPenalty {
    fn default() -> Self {
        GapPenalty { open: 1, extend: 1 }
    }
}

impl GapPenalty {
    pub fn new(open: i32, extend: i32) -> Result<Self, Error> {
        let gap = GapPenalty { open, extend };
        gap.validate()?;
        Ok(gap)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.extend < 0 {
            return Err(Error::invalid_config(
                "gap_penalty",
                Some(format!("extend penalty {} must not be negative", self.extend)),
            ));
        }
        if self.open < self.extend {
            return Err(Error::invalid_config(
                "gap_penalty",
                Some(format!(
                    "open penalty {} must be at least the extend penalty {}",
                    self.open, self.extend
                )),
            ));
        }
        Ok(())
    }

    /// Opening score in the convention of `bio::alignment::pairwise`, where
    /// a gap of length `k` scores `gap_open + k * gap_extend`.
    pub fn bio_gap_open(&self) -> i32 {
        -(self.open - self.extend)
    }

    pub fn bio_gap_extend(&self) -> i32 {
        -self.extend
    }
}

/// Symmetric score table over the IUPAC alphabet plus gap characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringModel {
    table: [[i32; ALPHABET_LEN]; ALPHABET_LEN],
    mask_score: i32,
    gap_score: i32,
    gap_penalty: GapPenalty,
}

impl Default for ScoringModel {
    fn default() -> Self {
        ScoringModel::new(1, 0, GapPenalty::default())
    }
}

impl ScoringModel {
    /// `mask_score` applies whenever either base is `N`, `gap_score` whenever
    /// either character is a gap. Compatible IUPAC codes score as a match.
    pub fn new(mask_score: i32, gap_score: i32, gap_penalty: GapPenalty) -> Self {
        let mut table = [[MISMATCH_SCORE; ALPHABET_LEN]; ALPHABET_LEN];
        for (i, &a) in ALPHABET.iter().enumerate() {
            for (j, &b) in ALPHABET.iter().enumerate() {
                table[i][j] = if dna::is_gap(a) || dna::is_gap(b) {
                    gap_score
                } else if a == dna::MASK_CHAR || b == dna::MASK_CHAR {
                    mask_score
                } else if compatible(a, b) {
                    MATCH_SCORE
                } else {
                    MISMATCH_SCORE
                };
            }
        }

        ScoringModel {
            table,
            mask_score,
            gap_score,
            gap_penalty,
        }
    }

    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        let i = INDEX[a as usize];
        let j = INDEX[b as usize];
        if i == UNKNOWN || j == UNKNOWN {
            return MISMATCH_SCORE;
        }
        self.table[i as usize][j as usize]
    }

    /// Ungapped score of two equal-length sequences.
    pub fn score_slices(&self, x: &[u8], y: &[u8]) -> i32 {
        x.iter().zip(y.iter()).map(|(&a, &b)| self.score(a, b)).sum()
    }

    pub fn mask_score(&self) -> i32 {
        self.mask_score
    }

    pub fn gap_score(&self) -> i32 {
        self.gap_score
    }

    pub fn gap_penalty(&self) -> GapPenalty {
        self.gap_penalty
    }
}

impl MatchFunc for ScoringModel {
    fn score(&self, a: u8, b: u8) -> i32 {
        ScoringModel::score(self, a, b)
    }
}

fn compatible(a: u8, b: u8) -> bool {
    match (dna::iupac_bases(a), dna::iupac_bases(b)) {
        (Some(x), Some(y)) => x.iter().any(|c| y.contains(c)),
        _ => false,
    }
}
