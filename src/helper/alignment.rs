//! A parsed alignment and its in-place operations.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::files;
use crate::helper::partition::PartitionModel;
use crate::helper::types::{DataType, GAP, InputFmt, SeqMatrix};
use crate::parser::loci::Loci;
use crate::parser::nexus::Nexus;
use crate::parser::phylip::Phylip;
use crate::parser::{fasta::Fasta, probe};

/// Modes for the in-place taxa filter.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RemoveMode {
    /// Remove the listed taxa.
    Remove,
    /// Remove all but the listed taxa.
    Inverse,
}

/// Check the length consistency of a sequence matrix.
#[derive(Default)]
pub struct SeqCheck {
    pub shortest: usize,
    pub longest: usize,
    pub is_alignment: bool,
}

impl SeqCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, matrix: &SeqMatrix) {
        self.shortest = matrix.values().map(|seq| seq.len()).min().unwrap_or(0);
        self.longest = matrix.values().map(|seq| seq.len()).max().unwrap_or(0);
        self.is_alignment = self.shortest == self.longest;
    }
}

/// One parsed alignment: an ordered taxon to sequence map plus its
/// partition model.
///
/// Sequences are stored lowercase as parsed; writers uppercase on
/// emission. After `code_gaps` the sequences carry the binary indel
/// matrix past `locus_length` and only nexus output is legal.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub name: String,
    pub path: Option<PathBuf>,
    pub input_fmt: InputFmt,
    pub datatype: DataType,
    pub locus_length: usize,
    pub matrix: SeqMatrix,
    pub partitions: PartitionModel,
    pub restriction_range: Option<(usize, usize)>,
    pub is_alignment: bool,
}

impl Alignment {
    /// Build an alignment from an explicit matrix and partition model.
    ///
    /// An empty partition model is replaced by a single partition covering
    /// the full length. A non-empty model must match the alignment length.
    pub fn from_matrix(
        name: &str,
        matrix: SeqMatrix,
        datatype: DataType,
        partitions: PartitionModel,
    ) -> SeqResult<Self> {
        let mut check = SeqCheck::new();
        check.check(&matrix);
        let locus_length = check.longest;
        let partitions = Self::resolve_partitions(name, None, partitions, locus_length)?;
        Ok(Self {
            name: String::from(name),
            path: None,
            input_fmt: InputFmt::Auto,
            datatype,
            locus_length,
            matrix,
            partitions,
            restriction_range: None,
            is_alignment: check.is_alignment,
        })
    }

    /// Parse an alignment file.
    ///
    /// Unequal sequence lengths are not an error here: the rows stay
    /// accessible and `is_alignment` is false. Batch callers decide how to
    /// record the file.
    pub fn from_file(path: &Path, input_fmt: &InputFmt, datatype: &DataType) -> SeqResult<Self> {
        let input_fmt = match input_fmt {
            InputFmt::Auto => probe::infer_format(path)?,
            fmt => *fmt,
        };
        let name = files::file_stem(path);
        let (matrix, partitions) = match input_fmt {
            InputFmt::Fasta => {
                let mut fasta = Fasta::new(path, datatype);
                fasta.parse()?;
                (fasta.matrix, PartitionModel::new())
            }
            InputFmt::Phylip => {
                let mut phylip = Phylip::new(path, datatype);
                phylip.parse()?;
                (phylip.matrix, PartitionModel::new())
            }
            InputFmt::Nexus => {
                let mut nexus = Nexus::new(path, datatype);
                nexus.parse()?;
                (nexus.matrix, nexus.partitions)
            }
            InputFmt::Loci => {
                let mut loci = Loci::new(path, datatype);
                loci.parse()?;
                (loci.matrix, loci.partitions)
            }
            InputFmt::Auto => unreachable!("Auto format resolved by the probe"),
        };
        let mut check = SeqCheck::new();
        check.check(&matrix);
        let locus_length = check.longest;
        let partitions = Self::resolve_partitions(&name, Some(path), partitions, locus_length)?;
        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            input_fmt,
            datatype: *datatype,
            locus_length,
            matrix,
            partitions,
            restriction_range: None,
            is_alignment: check.is_alignment,
        })
    }

    /// Parse an alignment file, probing both format and datatype.
    pub fn from_file_auto(path: &Path) -> SeqResult<Self> {
        let (input_fmt, datatype) = probe::infer(path)?;
        Self::from_file(path, &input_fmt, &datatype)
    }

    pub fn ntax(&self) -> usize {
        self.matrix.len()
    }

    /// Total sequence length including the gap-coded block, when present.
    pub fn total_length(&self) -> usize {
        match self.restriction_range {
            Some((_, end)) => end + 1,
            None => self.locus_length,
        }
    }

    pub fn is_gap_coded(&self) -> bool {
        self.restriction_range.is_some()
    }

    /// Replace the partition model after checking it against the
    /// alignment length.
    pub fn set_partitions(&mut self, partitions: PartitionModel) -> SeqResult<()> {
        if partitions.counter() != self.locus_length {
            return Err(SeqError::InvalidPartitionFile(format!(
                "partitions span {} sites but the alignment has {}",
                partitions.counter(),
                self.locus_length
            )));
        }
        self.partitions = partitions;
        Ok(())
    }

    /// Filter taxa in place.
    pub fn remove_taxa(&mut self, taxa: &[String], mode: RemoveMode) {
        match mode {
            RemoveMode::Remove => self.matrix.retain(|id, _| !taxa.contains(id)),
            RemoveMode::Inverse => self.matrix.retain(|id, _| taxa.contains(id)),
        }
    }

    /// Drop alignment columns exceeding the missing data thresholds.
    ///
    /// A column is dropped when its gap percentage exceeds `gap_pct` or
    /// its gap plus missing percentage exceeds `missing_pct`. Both
    /// thresholds at 100 are a no-op. The partition layout is replaced by
    /// a single partition covering the filtered length.
    pub fn filter_missing(&mut self, gap_pct: f64, missing_pct: f64) {
        if gap_pct >= 100.0 && missing_pct >= 100.0 {
            return;
        }
        if self.matrix.is_empty() || self.locus_length == 0 {
            return;
        }
        let missing = self.datatype.missing() as u8;
        let gap = GAP as u8;
        let ntax = self.matrix.len() as f64;
        let mut keep = vec![true; self.locus_length];
        for (col, keep_col) in keep.iter_mut().enumerate() {
            let mut gaps = 0usize;
            let mut missings = 0usize;
            for seq in self.matrix.values() {
                match seq.as_bytes().get(col) {
                    Some(&byte) if byte == gap => gaps += 1,
                    Some(&byte) if byte == missing => missings += 1,
                    _ => (),
                }
            }
            let gap_prop = gaps as f64 / ntax * 100.0;
            let missing_prop = (gaps + missings) as f64 / ntax * 100.0;
            if gap_prop > gap_pct || missing_prop > missing_pct {
                *keep_col = false;
            }
        }
        let new_length = keep.iter().filter(|kept| **kept).count();
        self.matrix.values_mut().for_each(|seq| {
            let filtered: String = seq
                .chars()
                .zip(keep.iter())
                .filter(|(_, kept)| **kept)
                .map(|(ch, _)| ch)
                .collect();
            *seq = filtered;
        });
        self.locus_length = new_length;
        self.rebuild_single_partition();
    }

    /// Keep only the columns whose position within each codon triplet is
    /// flagged in the mask.
    pub fn filter_codon_positions(&mut self, mask: &[bool; 3]) {
        self.matrix.values_mut().for_each(|seq| {
            let filtered: String = seq
                .chars()
                .enumerate()
                .filter(|(idx, _)| mask[idx % 3])
                .map(|(_, ch)| ch)
                .collect();
            *seq = filtered;
        });
        self.locus_length = self
            .matrix
            .values()
            .map(|seq| seq.len())
            .max()
            .unwrap_or(0);
        self.rebuild_single_partition();
    }

    /// Code unique indel events as a binary matrix appended to every
    /// sequence (Simmons & Ochoterena 2000).
    ///
    /// After coding, only nexus output is legal; the appended block is
    /// declared through `restriction_range`.
    pub fn code_gaps(&mut self) {
        let mut events: Vec<(usize, usize)> = Vec::new();
        for seq in self.matrix.values() {
            for run in gap_runs(seq.as_bytes()) {
                if !events.contains(&run) {
                    events.push(run);
                }
            }
        }
        if events.is_empty() {
            return;
        }
        for seq in self.matrix.values_mut() {
            let bytes = seq.as_bytes().to_vec();
            let mut coded = String::with_capacity(events.len());
            for &(start, end) in &events {
                coded.push(code_gap_event(&bytes, start, end));
            }
            seq.push_str(&coded);
        }
        let old_length = self.locus_length;
        self.restriction_range = Some((old_length, old_length + events.len() - 1));
    }

    /// Collapse identical sequences into haplotypes.
    ///
    /// Replaces the matrix rows with `prefix_i` haplotype names and
    /// returns the haplotype to taxa mapping in insertion order.
    pub fn collapse(&mut self, prefix: &str) -> IndexMap<String, Vec<String>> {
        let mut collapsed: IndexMap<String, Vec<String>> = IndexMap::new();
        for (taxon, seq) in &self.matrix {
            collapsed
                .entry(seq.clone())
                .or_default()
                .push(taxon.clone());
        }
        let mut matrix: SeqMatrix = IndexMap::new();
        let mut mapping: IndexMap<String, Vec<String>> = IndexMap::new();
        for (counter, (seq, taxa)) in collapsed.into_iter().enumerate() {
            let haplotype = format!("{}_{}", prefix, counter + 1);
            matrix.insert(haplotype.clone(), seq);
            mapping.insert(haplotype, taxa);
        }
        self.matrix = matrix;
        mapping
    }

    /// Split a concatenated alignment into one alignment per partition.
    ///
    /// Taxa whose slice is all missing data are dropped from the
    /// sub-alignment. Each sub-alignment gets a fresh single-partition
    /// model.
    pub fn reverse_concatenate(&self) -> SeqResult<Vec<Alignment>> {
        let missing = self.datatype.missing();
        let mut alignments = Vec::with_capacity(self.partitions.len());
        for (name, part) in self.partitions.iter() {
            let mut matrix: SeqMatrix = IndexMap::new();
            for (taxon, seq) in &self.matrix {
                let slice = match seq.get(part.start..=part.end) {
                    Some(slice) => slice,
                    None => {
                        return Err(SeqError::PartitionConflict(format!(
                            "partition {} exceeds the alignment length",
                            name
                        )));
                    }
                };
                if slice.chars().any(|ch| ch != missing) {
                    matrix.insert(taxon.clone(), String::from(slice));
                }
            }
            if matrix.is_empty() {
                continue;
            }
            let mut partitions = PartitionModel::new();
            partitions.add_by_length(name, part.len(), None)?;
            let aln = Alignment::from_matrix(name, matrix, self.datatype, partitions)?;
            alignments.push(aln);
        }
        Ok(alignments)
    }

    fn rebuild_single_partition(&mut self) {
        let mut partitions = PartitionModel::new();
        if self.locus_length > 0 {
            partitions
                .add_by_length(&self.name, self.locus_length, self.path.as_deref())
                .expect("Fresh partition model cannot conflict");
        }
        self.partitions = partitions;
    }

    fn resolve_partitions(
        name: &str,
        path: Option<&Path>,
        partitions: PartitionModel,
        locus_length: usize,
    ) -> SeqResult<PartitionModel> {
        if partitions.is_empty() {
            let mut single = PartitionModel::new();
            if locus_length > 0 {
                single.add_by_length(name, locus_length, path)?;
            }
            return Ok(single);
        }
        if partitions.counter() != locus_length {
            return Err(SeqError::InvalidPartitionFile(format!(
                "partitions span {} sites but the alignment has {}",
                partitions.counter(),
                locus_length
            )));
        }
        Ok(partitions)
    }
}

/// Maximal gap runs as half-open `(start, end)` spans.
fn gap_runs(seq: &[u8]) -> Vec<(usize, usize)> {
    let gap = GAP as u8;
    let mut runs = Vec::new();
    let mut start = None;
    for (idx, &byte) in seq.iter().enumerate() {
        if byte == gap {
            if start.is_none() {
                start = Some(idx);
            }
        } else if let Some(run_start) = start.take() {
            runs.push((run_start, idx));
        }
    }
    if let Some(run_start) = start {
        runs.push((run_start, seq.len()));
    }
    runs
}

/// Code one indel event for one sequence: `1` when the event run is
/// present and bordered by data, `-` when the run is part of a longer
/// gap, `0` when the site carries data.
fn code_gap_event(seq: &[u8], start: usize, end: usize) -> char {
    let gap = GAP as u8;
    let all_gap = seq[start..end].iter().all(|&byte| byte == gap);
    if !all_gap {
        return '0';
    }
    let left_gap = start > 0 && seq[start - 1] == gap;
    let right_gap = end < seq.len() && seq[end] == gap;
    if left_gap || right_gap { '-' } else { '1' }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_matrix() -> SeqMatrix {
        let mut matrix = IndexMap::new();
        matrix.insert(String::from("a"), String::from("acgt"));
        matrix.insert(String::from("b"), String::from("acga"));
        matrix
    }

    #[test]
    fn test_from_matrix() {
        let aln = Alignment::from_matrix(
            "simple",
            sample_matrix(),
            DataType::Dna,
            PartitionModel::new(),
        )
        .unwrap();
        assert!(aln.is_alignment);
        assert_eq!(4, aln.locus_length);
        assert!(aln.partitions.is_single());
        assert_eq!(4, aln.partitions.counter());
    }

    #[test]
    fn test_unequal_matrix() {
        let mut matrix = sample_matrix();
        matrix.insert(String::from("c"), String::from("ac"));
        let aln =
            Alignment::from_matrix("bad", matrix, DataType::Dna, PartitionModel::new()).unwrap();
        assert!(!aln.is_alignment);
    }

    #[test]
    fn test_remove_taxa() {
        let mut aln = Alignment::from_matrix(
            "simple",
            sample_matrix(),
            DataType::Dna,
            PartitionModel::new(),
        )
        .unwrap();
        aln.remove_taxa(&[String::from("a")], RemoveMode::Remove);
        assert_eq!(1, aln.ntax());
        assert!(aln.matrix.contains_key("b"));
    }

    #[test]
    fn test_remove_taxa_inverse() {
        let mut aln = Alignment::from_matrix(
            "simple",
            sample_matrix(),
            DataType::Dna,
            PartitionModel::new(),
        )
        .unwrap();
        aln.remove_taxa(&[String::from("a")], RemoveMode::Inverse);
        assert_eq!(1, aln.ntax());
        assert!(aln.matrix.contains_key("a"));
    }

    #[test]
    fn test_filter_missing_spec_case() {
        // Column 1 carries 2/3 gaps (> 50%); column 2 is all missing but
        // the missing threshold of 100 keeps it.
        let mut matrix = IndexMap::new();
        matrix.insert(String::from("a"), String::from("a-n"));
        matrix.insert(String::from("b"), String::from("aan"));
        matrix.insert(String::from("c"), String::from("a-n"));
        let mut aln =
            Alignment::from_matrix("gappy", matrix, DataType::Dna, PartitionModel::new()).unwrap();
        aln.filter_missing(50.0, 100.0);
        assert_eq!(2, aln.locus_length);
        assert_eq!(Some(&String::from("an")), aln.matrix.get("a"));
        assert_eq!(Some(&String::from("an")), aln.matrix.get("b"));
        assert_eq!(2, aln.partitions.counter());
    }

    #[test]
    fn test_filter_missing_noop() {
        let mut aln = Alignment::from_matrix(
            "simple",
            sample_matrix(),
            DataType::Dna,
            PartitionModel::new(),
        )
        .unwrap();
        aln.filter_missing(100.0, 100.0);
        assert_eq!(4, aln.locus_length);
    }

    #[test]
    fn test_filter_codon_positions() {
        let mut matrix = IndexMap::new();
        matrix.insert(String::from("a"), String::from("acgacg"));
        let mut aln =
            Alignment::from_matrix("codon", matrix, DataType::Dna, PartitionModel::new()).unwrap();
        aln.filter_codon_positions(&[true, true, false]);
        assert_eq!(Some(&String::from("acac")), aln.matrix.get("a"));
        assert_eq!(4, aln.locus_length);
    }

    #[test]
    fn test_collapse() {
        let mut matrix = IndexMap::new();
        matrix.insert(String::from("a"), String::from("ac"));
        matrix.insert(String::from("b"), String::from("ac"));
        matrix.insert(String::from("c"), String::from("at"));
        let mut aln =
            Alignment::from_matrix("hap", matrix, DataType::Dna, PartitionModel::new()).unwrap();
        let mapping = aln.collapse("Hap");
        assert_eq!(2, aln.ntax());
        assert_eq!(Some(&String::from("ac")), aln.matrix.get("Hap_1"));
        assert_eq!(Some(&String::from("at")), aln.matrix.get("Hap_2"));
        assert_eq!(vec!["a", "b"], mapping["Hap_1"]);
        assert_eq!(vec!["c"], mapping["Hap_2"]);
    }

    #[test]
    fn test_collapse_idempotent() {
        let mut matrix = IndexMap::new();
        matrix.insert(String::from("a"), String::from("ac"));
        matrix.insert(String::from("b"), String::from("ac"));
        let mut aln =
            Alignment::from_matrix("hap", matrix, DataType::Dna, PartitionModel::new()).unwrap();
        aln.collapse("Hap");
        let first = aln.matrix.clone();
        aln.collapse("Hap");
        assert_eq!(first, aln.matrix);
    }

    #[test]
    fn test_gap_runs() {
        let runs = gap_runs(b"ac--gt-a");
        assert_eq!(vec![(2, 4), (6, 7)], runs);
        let trailing = gap_runs(b"acgt--");
        assert_eq!(vec![(4, 6)], trailing);
    }

    #[test]
    fn test_code_gaps() {
        let mut matrix = IndexMap::new();
        matrix.insert(String::from("a"), String::from("ac--gt"));
        matrix.insert(String::from("b"), String::from("acgtgt"));
        matrix.insert(String::from("c"), String::from("a---gt"));
        let mut aln =
            Alignment::from_matrix("gaps", matrix, DataType::Dna, PartitionModel::new()).unwrap();
        aln.code_gaps();
        // Events: (2,4) from a, (1,4) from c.
        assert_eq!(Some((6, 7)), aln.restriction_range);
        assert_eq!(Some(&String::from("ac--gt10")), aln.matrix.get("a"));
        assert_eq!(Some(&String::from("acgtgt00")), aln.matrix.get("b"));
        assert_eq!(Some(&String::from("a---gt-1")), aln.matrix.get("c"));
    }

    #[test]
    fn test_reverse_concatenate() {
        let mut matrix = IndexMap::new();
        matrix.insert(String::from("a"), String::from("aatt"));
        matrix.insert(String::from("b"), String::from("aann"));
        let mut partitions = PartitionModel::new();
        partitions.add_by_length("x", 2, None).unwrap();
        partitions.add_by_length("y", 2, None).unwrap();
        let aln = Alignment::from_matrix("concat", matrix, DataType::Dna, partitions).unwrap();
        let alns = aln.reverse_concatenate().unwrap();
        assert_eq!(2, alns.len());
        assert_eq!(2, alns[0].ntax());
        // Taxon b is all missing within partition y and is dropped.
        assert_eq!(1, alns[1].ntax());
        assert_eq!(Some(&String::from("tt")), alns[1].matrix.get("a"));
    }

    #[test]
    fn test_set_partitions_mismatch() {
        let mut aln = Alignment::from_matrix(
            "simple",
            sample_matrix(),
            DataType::Dna,
            PartitionModel::new(),
        )
        .unwrap();
        let mut partitions = PartitionModel::new();
        partitions.add_by_length("wrong", 10, None).unwrap();
        let res = aln.set_partitions(partitions);
        assert!(matches!(res, Err(SeqError::InvalidPartitionFile(_))));
    }
}
