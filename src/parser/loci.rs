//! A module for parsing pyRAD loci files.
//!
//! Each locus is a run of `>taxon sequence` lines closed by a `//` marker
//! line. Taxa absent from a locus are padded with the missing symbol, so
//! the parsed matrix is a concatenation over all loci with one partition
//! per locus.
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::{IndexMap, IndexSet};

use crate::helper::alphabet;
use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::files;
use crate::helper::partition::PartitionModel;
use crate::helper::types::{DataType, SeqMatrix};
use crate::parser::{clean_id, clean_seq};

pub struct Loci<'a> {
    input: &'a Path,
    datatype: &'a DataType,
    pub matrix: SeqMatrix,
    pub partitions: PartitionModel,
    pub locus_length: usize,
}

impl<'a> Loci<'a> {
    pub fn new(input: &'a Path, datatype: &'a DataType) -> Self {
        Self {
            input,
            datatype,
            matrix: IndexMap::new(),
            partitions: PartitionModel::new(),
            locus_length: 0,
        }
    }

    pub fn parse(&mut self) -> SeqResult<()> {
        let taxa = self.collect_taxa()?;
        let mut buffers: IndexMap<String, Vec<String>> =
            taxa.iter().map(|id| (id.clone(), Vec::new())).collect();
        let missing = self.datatype.missing();

        let reader = self.open()?;
        let mut locus_count = 0;
        let mut present: IndexMap<String, String> = IndexMap::new();
        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(|err| self.parse_error(idx + 1, &err.to_string()))?;
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if let Some(record) = line.strip_prefix('>') {
                let mut fields = record.split_whitespace();
                let id = fields
                    .next()
                    .map(clean_id)
                    .ok_or_else(|| self.parse_error(idx + 1, "missing taxon name"))?;
                let seq = fields
                    .next()
                    .map(clean_seq)
                    .ok_or_else(|| self.parse_error(idx + 1, "missing sequence field"))?;
                if !alphabet::is_valid_seq(self.datatype, &seq) {
                    return Err(self.parse_error(
                        idx + 1,
                        &format!("sequence {} is not a valid {} sequence", id, self.datatype),
                    ));
                }
                if present.insert(id.clone(), seq).is_some() {
                    return Err(SeqError::DuplicateTaxon {
                        path: self.input.to_path_buf(),
                        name: id,
                    });
                }
            } else if line.starts_with("//") {
                locus_count += 1;
                self.close_locus(locus_count, &mut present, &mut buffers, missing, idx + 1)?;
            }
        }
        if !present.is_empty() {
            // Trailing locus without a closing marker line.
            locus_count += 1;
            self.close_locus(locus_count, &mut present, &mut buffers, missing, 0)?;
        }
        if locus_count == 0 {
            return Err(self.parse_error(0, "no loci records found"));
        }
        self.matrix = buffers
            .into_iter()
            .map(|(id, chunks)| (id, chunks.concat()))
            .collect();
        self.partitions.set_length(self.locus_length);
        Ok(())
    }

    fn close_locus(
        &mut self,
        locus_count: usize,
        present: &mut IndexMap<String, String>,
        buffers: &mut IndexMap<String, Vec<String>>,
        missing: char,
        lnum: usize,
    ) -> SeqResult<()> {
        let locus_len = match present.values().next() {
            Some(seq) => seq.len(),
            None => return Err(self.parse_error(lnum, "locus marker without records")),
        };
        if present.values().any(|seq| seq.len() != locus_len) {
            return Err(self.parse_error(lnum, "unequal sequence lengths within one locus"));
        }
        for (id, chunks) in buffers.iter_mut() {
            match present.get(id) {
                Some(seq) => chunks.push(seq.clone()),
                None => chunks.push(missing.to_string().repeat(locus_len)),
            }
        }
        let name = format!("locus_{}", locus_count);
        self.partitions
            .add_by_length(&name, locus_len, Some(self.input))?;
        self.locus_length += locus_len;
        present.clear();
        Ok(())
    }

    fn collect_taxa(&self) -> SeqResult<IndexSet<String>> {
        let reader = self.open()?;
        let mut taxa = IndexSet::new();
        for line in BufReader::new(reader).lines().map_while(|ok| ok.ok()) {
            let line = line.trim().to_string();
            if let Some(record) = line.strip_prefix('>') {
                if let Some(id) = record.split_whitespace().next() {
                    taxa.insert(clean_id(id));
                }
            }
        }
        if taxa.is_empty() {
            return Err(self.parse_error(0, "no loci records found"));
        }
        Ok(taxa)
    }

    fn open(&self) -> SeqResult<Box<dyn std::io::Read>> {
        files::open_file(self.input).map_err(|err| self.parse_error(0, &err.to_string()))
    }

    fn parse_error(&self, line: usize, reason: &str) -> SeqError {
        SeqError::Parse {
            path: self.input.to_path_buf(),
            line,
            reason: String::from(reason),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DNA: DataType = DataType::Dna;

    #[test]
    fn read_loci_simple_test() {
        let path = Path::new("tests/files/simple.loci");
        let mut loci = Loci::new(path, &DNA);
        loci.parse().unwrap();
        assert_eq!(3, loci.matrix.len());
        assert_eq!(2, loci.partitions.len());
    }

    #[test]
    fn read_loci_pads_missing_test() {
        let path = Path::new("tests/files/simple.loci");
        let mut loci = Loci::new(path, &DNA);
        loci.parse().unwrap();
        let seq = loci.matrix.get("taxon_c").unwrap();
        assert!(seq.starts_with("nnnn"));
        assert_eq!(loci.locus_length, seq.len());
    }
}
