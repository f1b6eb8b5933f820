//! IUPAC nucleotide helpers shared by the matchers and the masking transform.

/// Character written over masked bases.
pub const MASK_CHAR: u8 = b'N';

/// Quality assigned to masked bases (phred 0, offset 33).
pub const MASK_QUAL: u8 = b'!';

/// Gap characters as they appear in aligned strings.
pub const GAP_CHARS: &[u8] = b"-.";

/// Upper-case IUPAC nucleotide codes.
pub const IUPAC_CODES: &[u8] = b"ACGTURYSWKMBDHVN";

const fn build_complement_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    let pairs: [(u8, u8); 11] = [
        (b'A', b'T'),
        (b'C', b'G'),
        (b'R', b'Y'),
        (b'K', b'M'),
        (b'S', b'S'),
        (b'W', b'W'),
        (b'B', b'V'),
        (b'D', b'H'),
        (b'N', b'N'),
        (b'U', b'A'),
        (b'-', b'-'),
    ];
    let mut p = 0;
    while p < pairs.len() {
        let (a, b) = pairs[p];
        table[a as usize] = b;
        table[a.to_ascii_lowercase() as usize] = b.to_ascii_lowercase();
        if a != b'U' {
            table[b as usize] = a;
            table[b.to_ascii_lowercase() as usize] = a.to_ascii_lowercase();
        }
        p += 1;
    }
    table
}

static COMPLEMENT: [u8; 256] = build_complement_table();

/// Reverse complement over the full IUPAC alphabet. Case is preserved and
/// characters outside the alphabet are passed through unchanged.
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&c| COMPLEMENT[c as usize]).collect()
}

/// The set of concrete bases an IUPAC code stands for, or `None` for
/// characters outside the nucleotide alphabet.
pub fn iupac_bases(c: u8) -> Option<&'static [u8]> {
    let bases: &'static [u8] = match c.to_ascii_uppercase() {
        b'A' => b"A",
        b'C' => b"C",
        b'G' => b"G",
        b'T' | b'U' => b"T",
        b'R' => b"AG",
        b'Y' => b"CT",
        b'S' => b"CG",
        b'W' => b"AT",
        b'K' => b"GT",
        b'M' => b"AC",
        b'B' => b"CGT",
        b'D' => b"AGT",
        b'H' => b"ACT",
        b'V' => b"ACG",
        b'N' => b"ACGT",
        _ => return None,
    };
    Some(bases)
}

pub fn is_gap(c: u8) -> bool {
    GAP_CHARS.contains(&c)
}

/// Position of the first character that is neither an IUPAC code nor a gap.
pub fn find_invalid_base(seq: &[u8]) -> Option<(usize, u8)> {
    seq.iter()
        .enumerate()
        .find(|(_, &c)| iupac_bases(c).is_none() && !is_gap(c))
        .map(|(i, &c)| (i, c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revcomp() {
        let seq = b"ATGCTTCCAGAA";
        let actual = revcomp(seq);
        let expected = b"TTCTGGAAGCAT";
        assert_eq!(actual, expected)
    }

    #[test]
    fn test_revcomp_iupac() {
        assert_eq!(revcomp(b"RYKMBDHVNSW"), b"WSNBDHVKMRY".to_vec());
        assert_eq!(revcomp(b"acgN"), b"Ncgt".to_vec());
    }

    #[test]
    fn test_revcomp_is_involution() {
        let seq = b"ACGTRYKMSWBDHVN";
        assert_eq!(revcomp(&revcomp(seq)), seq.to_vec());
    }

    #[test]
    fn test_find_invalid_base() {
        assert_eq!(find_invalid_base(b"ACGTN-"), None);
        assert_eq!(find_invalid_base(b"ACXGT"), Some((2, b'X')));
    }
}
