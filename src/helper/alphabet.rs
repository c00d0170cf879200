//! Residue alphabets and datatype inference.
use crate::helper::types::DataType;

/// Alphabet for dna. All cases stored as bytes.
/// Include IUPAC characters plus ambiguous, missing, and gap characters.
const DNA: &[u8] = b"?-ACGTUNRYSWKMBDHVacgtunryswkmbdhv.";

/// Alphabet for amino acid. All cases stored as bytes.
/// Include the 20 IUPAC characters plus ambiguous, missing,
/// and gap characters.
const AA: &[u8] = b"?-ARNDCQEGHILKMFPSTWYVXBZJUOarndcqeghilkmfpstwyvxbzjuo*.~";

/// Unambiguous characters used by the datatype inference sample.
const DNA_CORE: &[u8] = b"acgtun";

/// Number of residues sampled when inferring the datatype of a file.
pub const INFERENCE_SAMPLE: usize = 500;

/// Check that a sequence is drawn from the alphabet of its datatype.
pub fn is_valid_seq(datatype: &DataType, seq: &str) -> bool {
    match datatype {
        DataType::Dna => is_valid_dna(seq),
        DataType::Aa => is_valid_aa(seq),
    }
}

pub fn is_valid_dna(dna: &str) -> bool {
    dna.bytes().all(|char| DNA.contains(&char))
}

pub fn is_valid_aa(aa: &str) -> bool {
    aa.bytes().all(|char| AA.contains(&char))
}

/// Infer the datatype from sampled residues.
///
/// Residues are expected lowercase with gaps and missing symbols already
/// skipped by the caller. Everything within `{a, c, g, t, u, n}` is called
/// DNA; anything else flips the sample to amino acid.
pub fn infer_datatype<I>(residues: I) -> DataType
where
    I: IntoIterator<Item = u8>,
{
    let dna = residues
        .into_iter()
        .take(INFERENCE_SAMPLE)
        .all(|res| DNA_CORE.contains(&res.to_ascii_lowercase()));
    if dna { DataType::Dna } else { DataType::Aa }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_check_valid_dna() {
        assert!(is_valid_dna("agtc?-"));
        assert!(!is_valid_dna("agtc?-z"));
    }

    #[test]
    fn test_check_valid_aa() {
        assert!(is_valid_aa("ARNDCQEGH-"));
        assert!(is_valid_seq(&DataType::Aa, "arndcx"));
    }

    #[test]
    fn test_infer_datatype() {
        assert_eq!(DataType::Dna, infer_datatype("acgtacgt".bytes()));
        assert_eq!(DataType::Aa, infer_datatype("mktear".bytes()));
    }
}
