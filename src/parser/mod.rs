//! All the parsers for the supported formats.
//!
//! Includes the following parsers:
//! 1. `delimited`: Delimited text parser: taxa lists and population maps.
//! 2. `fasta`: Fasta format parser.
//! 3. `loci`: pyRAD loci format parser.
//! 4. `nexus`: Nexus format parser.
//! 5. `phylip`: Sequential phylip format parser.
//! 6. `probe`: Content-based format and datatype detection.
pub mod delimited;
pub mod fasta;
pub mod loci;
pub mod nexus;
pub mod phylip;
pub mod probe;

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::types::SeqMatrix;

lazy_static! {
    // Characters that break downstream tree and alignment formats.
    static ref ILLEGAL_ID: Regex = Regex::new(r#"[\s:,\(\);']"#).expect("Failed compiling regex");
}

/// Strip illegal characters from a taxon name.
pub(crate) fn clean_id(id: &str) -> String {
    ILLEGAL_ID.replace_all(id.trim(), "").to_string()
}

/// Normalize a sequence chunk: lowercase, no whitespace, no stop marks.
pub(crate) fn clean_seq(seq: &str) -> String {
    seq.trim()
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '*')
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Insert a record, rejecting duplicate taxa within one file.
pub(crate) fn insert_matrix(
    matrix: &mut SeqMatrix,
    id: String,
    seq: String,
    path: &Path,
) -> SeqResult<()> {
    match matrix.get(&id) {
        Some(_) => Err(SeqError::DuplicateTaxon {
            path: path.to_path_buf(),
            name: id,
        }),
        None => {
            matrix.insert(id, seq);
            Ok(())
        }
    }
}
