//! Content-based format and datatype detection.
//!
//! Reads the head of a file and classifies it without trusting the
//! extension. Used by the `Auto` input format.
use std::io::Read;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::helper::alphabet;
use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::files;
use crate::helper::types::{DataType, InputFmt};

/// Bytes sampled from the head of the file.
const PROBE_LEN: usize = 8192;

lazy_static! {
    static ref PHYLIP_HEADER: Regex =
        Regex::new(r"^\s*\d+\s+\d+\s*$").expect("Failed compiling regex");
}

/// Detect the input format and datatype of a file.
pub fn infer(input: &Path) -> SeqResult<(InputFmt, DataType)> {
    let head = read_head(input)?;
    let format = classify(input, &head)?;
    let datatype = infer_datatype(&head, &format);
    Ok((format, datatype))
}

/// Detect the input format of a file.
pub fn infer_format(input: &Path) -> SeqResult<InputFmt> {
    let head = read_head(input)?;
    classify(input, &head)
}

fn read_head(input: &Path) -> SeqResult<String> {
    let mut reader = files::open_file(input).map_err(|err| SeqError::Parse {
        path: input.to_path_buf(),
        line: 0,
        reason: err.to_string(),
    })?;
    let mut buffer = vec![0u8; PROBE_LEN];
    let mut read = 0;
    loop {
        match reader.read(&mut buffer[read..]) {
            Ok(0) => break,
            Ok(n) => {
                read += n;
                if read == buffer.len() {
                    break;
                }
            }
            Err(err) => {
                return Err(SeqError::Parse {
                    path: input.to_path_buf(),
                    line: 0,
                    reason: err.to_string(),
                });
            }
        }
    }
    buffer.truncate(read);
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

fn classify(input: &Path, head: &str) -> SeqResult<InputFmt> {
    let first = match head.lines().find(|line| !line.trim().is_empty()) {
        Some(line) => line.trim(),
        None => return Err(SeqError::FormatUnknown(input.to_path_buf())),
    };
    if first.to_lowercase().starts_with("#nexus") {
        return Ok(InputFmt::Nexus);
    }
    if first.starts_with('>') {
        if is_loci(head) {
            return Ok(InputFmt::Loci);
        }
        return Ok(InputFmt::Fasta);
    }
    if PHYLIP_HEADER.is_match(first) {
        return Ok(InputFmt::Phylip);
    }
    Err(SeqError::FormatUnknown(input.to_path_buf()))
}

// Loci records keep taxon and sequence on one line and close each locus
// with a `//` marker line.
fn is_loci(head: &str) -> bool {
    let has_marker = head.lines().any(|line| line.trim_start().starts_with("//"));
    let inline_records = head
        .lines()
        .filter(|line| line.trim_start().starts_with('>'))
        .all(|line| line.split_whitespace().count() >= 2);
    has_marker && inline_records
}

fn infer_datatype(head: &str, format: &InputFmt) -> DataType {
    let residues = sample_residues(head, format);
    alphabet::infer_datatype(residues.bytes())
}

fn sample_residues(head: &str, format: &InputFmt) -> String {
    let mut sample = String::new();
    match format {
        InputFmt::Fasta => {
            head.lines()
                .filter(|line| !line.trim_start().starts_with('>'))
                .for_each(|line| sample.push_str(line.trim()));
        }
        InputFmt::Loci => {
            head.lines()
                .filter(|line| line.trim_start().starts_with('>'))
                .for_each(|line| {
                    if let Some(seq) = line.split_whitespace().nth(1) {
                        sample.push_str(seq);
                    }
                });
        }
        InputFmt::Phylip => {
            head.lines().skip(1).for_each(|line| {
                if let Some(seq) = line.split_whitespace().nth(1) {
                    sample.push_str(seq);
                }
            });
        }
        InputFmt::Nexus => {
            let mut in_matrix = false;
            for line in head.lines() {
                let trimmed = line.trim();
                if trimmed.to_lowercase() == "matrix" {
                    in_matrix = true;
                    continue;
                }
                if in_matrix {
                    if trimmed.starts_with(';') {
                        break;
                    }
                    if let Some(seq) = trimmed.split_whitespace().nth(1) {
                        sample.push_str(seq);
                    }
                }
            }
        }
        InputFmt::Auto => (),
    }
    sample
        .chars()
        .filter(|ch| !matches!(ch, '-' | '?' | '.' | '~' | 'n' | 'N' | 'x' | 'X'))
        .collect()
}
