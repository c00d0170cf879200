//! Per-matrix residue counts.
use ahash::AHashMap as HashMap;

use crate::helper::types::{DataType, GAP, SeqMatrix};

/// Residues counted towards character proportions.
pub fn valid_chars(datatype: &DataType) -> &'static [char] {
    match datatype {
        DataType::Dna => &['a', 'c', 'g', 't', 'u'],
        DataType::Aa => &[
            'a', 'r', 'n', 'd', 'c', 'q', 'e', 'g', 'h', 'i', 'l', 'k', 'm', 'f', 'p', 's', 't',
            'w', 'y', 'v',
        ],
    }
}

/// Character counts over one sequence, case-folded to lowercase.
pub fn char_counts(seq: &str) -> HashMap<char, usize> {
    let mut counts = HashMap::new();
    seq.chars().for_each(|ch| {
        *counts.entry(ch.to_ascii_lowercase()).or_insert(0) += 1;
    });
    counts
}

/// Gap and missing symbol counts over one sequence.
pub fn count_gaps_missing(seq: &str, missing: char) -> (usize, usize) {
    let bytes = seq.as_bytes();
    let gaps = bytecount::count(bytes, GAP as u8);
    let missings = bytecount::count(bytes, missing as u8);
    (gaps, missings)
}

/// Sequence length after stripping gaps and missing symbols.
pub fn ungapped_len(seq: &str, missing: char) -> usize {
    let (gaps, missings) = count_gaps_missing(seq, missing);
    seq.len() - gaps - missings
}

/// Proportion of gap and missing sites over a whole matrix.
pub fn missing_data_proportion(matrix: &SeqMatrix, missing: char) -> f64 {
    let total: usize = matrix.values().map(|seq| seq.len()).sum();
    if total == 0 {
        return 0.0;
    }
    let unresolved: usize = matrix
        .values()
        .map(|seq| {
            let (gaps, missings) = count_gaps_missing(seq, missing);
            gaps + missings
        })
        .sum();
    unresolved as f64 / total as f64
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use indexmap::indexmap;

    #[test]
    fn test_count_gaps_missing() {
        let (gaps, missings) = count_gaps_missing("ac--nn", 'n');
        assert_eq!(2, gaps);
        assert_eq!(2, missings);
    }

    #[test]
    fn test_ungapped_len() {
        assert_eq!(2, ungapped_len("ac--nn", 'n'));
    }

    #[test]
    fn test_char_counts() {
        let counts = char_counts("acGGt");
        assert_eq!(Some(&2), counts.get(&'g'));
        assert_eq!(Some(&1), counts.get(&'a'));
    }

    #[test]
    fn test_missing_data_proportion() {
        let matrix = indexmap! {
            String::from("a") => String::from("ac--"),
            String::from("b") => String::from("acnn"),
        };
        let prop = missing_data_proportion(&matrix, 'n');
        assert_approx_eq!(0.5, prop, 1e-10);
    }
}
