//! Filter a batch of alignments and write the survivors.
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;

use crate::handler::OutputPrint;
use crate::helper::alignment::RemoveMode;
use crate::helper::logger::AlignSeqLogger;
use crate::helper::progress::ProgressSink;
use crate::helper::set::{AlignmentSet, TaxaScreen};
use crate::helper::types::{DataType, InputFmt, OutputFmt, WriteOpts};
use crate::helper::utils;

/// Filtering criteria mirroring the alignment-set operations.
pub enum FilteringParameters {
    /// Drop alignments below a taxa occupancy percentage.
    MinTaxa(f64),
    /// Keep alignments containing all listed taxa.
    TaxonAll(Vec<String>),
    /// Drop alignments containing any listed taxon.
    TaxonNone(Vec<String>),
    /// Drop columns over the gap and missing thresholds.
    MissingData(f64, f64),
    /// Keep only the flagged codon positions.
    CodonPositions([bool; 3]),
    /// Remove the listed taxa from every alignment.
    RemoveTaxa(Vec<String>, RemoveMode),
}

impl OutputPrint for FilterHandler<'_> {}

pub struct FilterHandler<'a> {
    input_fmt: &'a InputFmt,
    output_dir: &'a Path,
    output_fmt: &'a OutputFmt,
    params: &'a FilteringParameters,
}

impl<'a> FilterHandler<'a> {
    pub fn new(
        input_fmt: &'a InputFmt,
        output_dir: &'a Path,
        output_fmt: &'a OutputFmt,
        params: &'a FilteringParameters,
    ) -> Self {
        Self {
            input_fmt,
            output_dir,
            output_fmt,
            params,
        }
    }

    /// Load the files, apply the filter, and write every surviving
    /// alignment into the output directory.
    pub fn filter(
        &self,
        files: &[PathBuf],
        datatype: &DataType,
        progress: &dyn ProgressSink,
    ) -> Result<AlignmentSet> {
        let input_dir = files.first().and_then(|file| file.parent());
        AlignSeqLogger::new(input_dir, self.input_fmt, datatype, files.len())
            .log("Filtering alignments");

        let mut set = AlignmentSet::new();
        set.add_files(files, self.input_fmt, datatype, progress)?;
        self.apply(&mut set);
        anyhow::ensure!(!set.is_empty(), "No alignments left after filtering!");

        progress.set_stage("Writing filtered alignments...");
        let written = set.write_all(self.output_dir, self.output_fmt, &WriteOpts::new(datatype))?;
        self.print_output(written.len());
        Ok(set)
    }

    fn apply(&self, set: &mut AlignmentSet) {
        match self.params {
            FilteringParameters::MinTaxa(pct) => {
                let removed = set.filter_min_taxa(*pct);
                log::info!("{:18}: {}", "Removed loci", utils::fmt_num(&removed.len()));
            }
            FilteringParameters::TaxonAll(taxa) => {
                set.filter_by_taxa(taxa, TaxaScreen::Contain);
            }
            FilteringParameters::TaxonNone(taxa) => {
                set.filter_by_taxa(taxa, TaxaScreen::Exclude);
            }
            FilteringParameters::MissingData(gap_pct, missing_pct) => {
                set.filter_missing(*gap_pct, *missing_pct);
            }
            FilteringParameters::CodonPositions(mask) => {
                set.filter_codon_positions(mask);
            }
            FilteringParameters::RemoveTaxa(taxa, mode) => {
                set.remove_taxa(taxa, *mode);
            }
        }
    }

    fn print_output(&self, fcounts: usize) {
        log::info!("{}", "Output".yellow());
        log::info!("{:18}: {}", "File counts", utils::fmt_num(&fcounts));
        log::info!("{:18}: {}", "Dir", self.output_dir.display());
        self.print_output_fmt(self.output_fmt);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helper::progress::NoProgress;
    use std::io::Write;
    use tempdir::TempDir;

    fn write_input(dir: &TempDir) -> Vec<PathBuf> {
        let gene_1 = dir.path().join("gene_1.fas");
        let gene_2 = dir.path().join("gene_2.fas");
        let mut file = std::fs::File::create(&gene_1).unwrap();
        writeln!(file, ">a\nAA\n>b\nAA\n>c\nAA").unwrap();
        let mut file = std::fs::File::create(&gene_2).unwrap();
        writeln!(file, ">a\nTT").unwrap();
        vec![gene_1, gene_2]
    }

    #[test]
    fn test_filter_min_taxa() {
        let dir = TempDir::new("filter").unwrap();
        let files = write_input(&dir);
        let output_dir = dir.path().join("filtered");
        let params = FilteringParameters::MinTaxa(60.0);
        let handler =
            FilterHandler::new(&InputFmt::Fasta, &output_dir, &OutputFmt::Fasta, &params);
        let set = handler
            .filter(&files, &DataType::Dna, &NoProgress)
            .unwrap();
        assert_eq!(1, set.len());
        assert!(output_dir.join("gene_1.fas").exists());
        assert!(!output_dir.join("gene_2.fas").exists());
    }
}
