//! Concatenate alignment files and write the result.
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;

use crate::handler::{OutputPrint, PartitionPrint};
use crate::helper::alignment::Alignment;
use crate::helper::logger::AlignSeqLogger;
use crate::helper::progress::ProgressSink;
use crate::helper::set::AlignmentSet;
use crate::helper::types::{DataType, InputFmt, OutputFmt, WriteOpts};
use crate::helper::utils;
use crate::writer::partition::sidecar_path;
use crate::writer::sequences::SeqWriter;

impl OutputPrint for ConcatHandler<'_> {}
impl PartitionPrint for ConcatHandler<'_> {}

pub struct ConcatHandler<'a> {
    input_fmt: &'a InputFmt,
    output: &'a Path,
    output_fmt: &'a OutputFmt,
    opts: WriteOpts,
}

impl<'a> ConcatHandler<'a> {
    pub fn new(
        input_fmt: &'a InputFmt,
        output: &'a Path,
        output_fmt: &'a OutputFmt,
        opts: WriteOpts,
    ) -> Self {
        Self {
            input_fmt,
            output,
            output_fmt,
            opts,
        }
    }

    /// Parse the input files, concatenate them, and write the result
    /// with its partition bookkeeping.
    pub fn concat_alignment(
        &mut self,
        files: &[PathBuf],
        datatype: &DataType,
        progress: &dyn ProgressSink,
    ) -> Result<Alignment> {
        let input_dir = files.first().and_then(|file| file.parent());
        AlignSeqLogger::new(input_dir, self.input_fmt, datatype, files.len())
            .log("Concatenating alignments");

        let mut set = AlignmentSet::new();
        set.add_files(files, self.input_fmt, datatype, progress)?;
        self.log_problem_files(&set);
        let concat = set.concatenate(progress)?;

        progress.set_stage("Writing output files...");
        let mut writer = SeqWriter::new(self.output, &concat, self.opts.clone());
        writer.write(self.output_fmt)?;
        self.print_output_info(&concat);
        Ok(concat)
    }

    fn log_problem_files(&self, set: &AlignmentSet) {
        if !set.bad.is_empty() {
            log::warn!(
                "{:18}: {}",
                "Unparseable files",
                utils::fmt_num(&set.bad.len())
            );
        }
        if !set.unequal_length.is_empty() {
            log::warn!(
                "{:18}: {}",
                "Unaligned files",
                utils::fmt_num(&set.unequal_length.len())
            );
        }
    }

    fn print_output_info(&self, concat: &Alignment) {
        log::info!("{}", "Output".yellow());
        log::info!("{:18}: {}", "Taxa", utils::fmt_num(&concat.ntax()));
        log::info!(
            "{:18}: {}",
            "Loci",
            utils::fmt_num(&concat.partitions.len())
        );
        log::info!(
            "{:18}: {}",
            "Alignment length",
            utils::fmt_num(&concat.locus_length)
        );
        log::info!("{:18}: {}", "Alignment file", self.output.display());
        self.print_output_fmt(self.output_fmt);
        if matches!(self.output_fmt, OutputFmt::Phylip | OutputFmt::PhylipInt)
            && self.opts.partition_file
            && !concat.partitions.is_single()
        {
            let part_path = sidecar_path(self.output);
            self.print_partition_info(&part_path, &concat.partitions.len());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helper::progress::NoProgress;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn test_concat_handler() {
        let dir = TempDir::new("concat").unwrap();
        let gene_1 = dir.path().join("gene_1.fas");
        let gene_2 = dir.path().join("gene_2.fas");
        let mut file = std::fs::File::create(&gene_1).unwrap();
        writeln!(file, ">a\nAA\n>b\nAA").unwrap();
        let mut file = std::fs::File::create(&gene_2).unwrap();
        writeln!(file, ">a\nTT\n>c\nTT").unwrap();

        let output = dir.path().join("concat.phy");
        let mut handler = ConcatHandler::new(
            &InputFmt::Fasta,
            &output,
            &OutputFmt::Phylip,
            WriteOpts::default(),
        );
        let concat = handler
            .concat_alignment(&[gene_1, gene_2], &DataType::Dna, &NoProgress)
            .unwrap();

        assert_eq!(3, concat.ntax());
        assert_eq!(4, concat.locus_length);
        assert!(output.exists());
        assert!(dir.path().join("concat_part.File").exists());
    }
}
