//! A module for parsing fasta files.
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

use indexmap::IndexMap;

use crate::helper::alphabet;
use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::files;
use crate::helper::types::{DataType, SeqMatrix};
use crate::parser::{clean_id, clean_seq, insert_matrix};

pub struct Fasta<'a> {
    input: &'a Path,
    datatype: &'a DataType,
    pub matrix: SeqMatrix,
}

impl<'a> Fasta<'a> {
    pub fn new(input: &'a Path, datatype: &'a DataType) -> Self {
        Self {
            input,
            datatype,
            matrix: IndexMap::new(),
        }
    }

    pub fn parse(&mut self) -> SeqResult<()> {
        let file = files::open_file(self.input).map_err(|err| SeqError::Parse {
            path: self.input.to_path_buf(),
            line: 0,
            reason: err.to_string(),
        })?;
        let reader = FastaReader::new(file);
        for rec in reader {
            let id = clean_id(&rec.id);
            if !alphabet::is_valid_seq(self.datatype, &rec.seq) {
                return Err(SeqError::Parse {
                    path: self.input.to_path_buf(),
                    line: 0,
                    reason: format!("sequence {} is not a valid {} sequence", id, self.datatype),
                });
            }
            insert_matrix(&mut self.matrix, id, rec.seq, self.input)?;
        }
        if self.matrix.is_empty() {
            return Err(SeqError::Parse {
                path: self.input.to_path_buf(),
                line: 0,
                reason: String::from("no fasta records found"),
            });
        }
        Ok(())
    }
}

pub fn parse_only_id(input: &Path) -> SeqResult<Vec<String>> {
    let file = files::open_file(input).map_err(|err| SeqError::Parse {
        path: input.to_path_buf(),
        line: 0,
        reason: err.to_string(),
    })?;
    let buff = BufReader::new(file);
    let mut ids: Vec<String> = Vec::new();
    buff.lines()
        .map_while(|ok| ok.ok())
        .filter(|line| line.starts_with('>'))
        .for_each(|line| {
            if let Some(id) = line.strip_prefix('>') {
                ids.push(clean_id(id));
            }
        });
    Ok(ids)
}

pub(crate) struct Records {
    pub id: String,
    pub seq: String,
}

impl Records {
    fn new(id: &str, seq: &str) -> Self {
        Self {
            id: String::from(id),
            seq: String::from(seq),
        }
    }
}

pub(crate) struct FastaReader<R> {
    reader: BufReader<R>,
    id: String,
    seq: String,
    found_rec: bool,
}

impl<R: Read> FastaReader<R> {
    pub(crate) fn new(file: R) -> Self {
        Self {
            reader: BufReader::new(file),
            id: String::new(),
            seq: String::new(),
            found_rec: false,
        }
    }

    fn next_seq(&mut self) -> Option<Records> {
        while let Some(Ok(line)) = self.reader.by_ref().lines().next() {
            if let Some(id) = line.strip_prefix('>') {
                if !self.found_rec {
                    self.id = String::from(id.trim());
                    self.found_rec = true;
                    self.seq.clear();
                } else {
                    let recs = Records::new(&self.id, &self.seq);
                    self.id = String::from(id.trim());
                    self.seq.clear();
                    return Some(recs);
                }
            } else {
                self.seq.push_str(&clean_seq(&line));
            }
        }
        if self.found_rec {
            let recs = Records::new(&self.id, &self.seq);
            self.found_rec = false;
            self.id.clear();
            self.seq.clear();
            Some(recs)
        } else {
            None
        }
    }
}

impl<R: Read> Iterator for FastaReader<R> {
    type Item = Records;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_seq()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DNA: DataType = DataType::Dna;

    #[test]
    fn read_fasta_simple_test() {
        let path = Path::new("tests/files/simple.fas");
        let mut fasta = Fasta::new(path, &DNA);
        fasta.parse().unwrap();
        assert_eq!(2, fasta.matrix.len());
    }

    #[test]
    fn read_fasta_lowercases_test() {
        let path = Path::new("tests/files/simple.fas");
        let mut fasta = Fasta::new(path, &DNA);
        fasta.parse().unwrap();
        let seq = fasta.matrix.get("ABCD").unwrap();
        assert_eq!("agtatgatgtatatgtat", seq);
    }

    #[test]
    fn read_fasta_duplicates_test() {
        let path = Path::new("tests/files/duplicates.fas");
        let mut fasta = Fasta::new(path, &DNA);
        let res = fasta.parse();
        assert!(matches!(res, Err(SeqError::DuplicateTaxon { .. })));
    }

    #[test]
    fn interleaved_fasta_reader_test() {
        let data = b">ABCD\nAGTA\nTGAT\n>ABCE\nAGTA\nAAAA\n" as &[u8];
        let rec = FastaReader::new(data);
        let mut seq = IndexMap::new();
        rec.into_iter().for_each(|r| {
            seq.insert(r.id, r.seq);
        });

        assert_eq!(Some(&String::from("agtatgat")), seq.get("ABCD"));
        assert_eq!(Some(&String::from("agtaaaaa")), seq.get("ABCE"));
    }

    #[test]
    fn parse_only_id_test() {
        let path = Path::new("tests/files/simple.fas");
        let ids = parse_only_id(path).unwrap();
        assert_eq!(2, ids.len());
    }
}
