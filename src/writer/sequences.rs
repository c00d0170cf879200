//! Write alignments to fasta, phylip, and nexus files.
use std::collections::BTreeMap;
use std::io::prelude::*;
use std::path::Path;

use anyhow::Result;

use crate::helper::alignment::Alignment;
use crate::helper::errors::SeqError;
use crate::helper::types::{OutputFmt, PartitionFmt, WriteOpts};
use crate::writer::FileWriter;
use crate::writer::partition::{PartWriter, sidecar_path};

/// Interleaved output block width.
const BLOCK_LEN: usize = 90;
/// Phylip name padding; truncated names pad to the truncation width.
const PHYLIP_PAD: usize = 30;
const PHYLIP_TRUNCATE: usize = 10;

impl FileWriter for SeqWriter<'_> {}

pub struct SeqWriter<'a> {
    output: &'a Path,
    aln: &'a Alignment,
    opts: WriteOpts,
    id_len: usize,
}

impl<'a> SeqWriter<'a> {
    pub fn new(output: &'a Path, aln: &'a Alignment, opts: WriteOpts) -> Self {
        let id_len = aln.matrix.keys().map(|id| id.len()).max().unwrap_or(0);
        Self {
            output,
            aln,
            opts,
            id_len,
        }
    }

    pub fn write(&mut self, output_fmt: &OutputFmt) -> Result<()> {
        if self.aln.is_gap_coded() && !output_fmt.is_nexus() {
            return Err(SeqError::WriteBlocked(format!(
                "gap-coded alignments can only be written in nexus format, not {}",
                output_fmt
            ))
            .into());
        }
        match output_fmt {
            OutputFmt::Fasta => self.write_fasta(false)?,
            OutputFmt::FastaInt => self.write_fasta(true)?,
            OutputFmt::Nexus => self.write_nexus(false)?,
            OutputFmt::NexusInt => self.write_nexus(true)?,
            OutputFmt::Phylip => self.write_phylip(false)?,
            OutputFmt::PhylipInt => self.write_phylip(true)?,
        }
        Ok(())
    }

    fn write_fasta(&mut self, interleave: bool) -> Result<()> {
        let mut writer = self.create_output_file(self.output)?;
        for (id, seq) in &self.aln.matrix {
            writeln!(writer, ">{}", id)?;
            if !interleave {
                writeln!(writer, "{}", seq.to_uppercase())?;
            } else {
                for chunk in chunk_seq(seq, BLOCK_LEN) {
                    writeln!(writer, "{}", chunk.to_uppercase())?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn write_phylip(&mut self, interleave: bool) -> Result<()> {
        let mut writer = self.create_output_file(self.output)?;
        writeln!(
            writer,
            "{} {}",
            self.aln.ntax(),
            self.aln.total_length()
        )?;
        if !interleave {
            for (id, seq) in &self.aln.matrix {
                writeln!(
                    writer,
                    "{}{}",
                    self.phylip_id(id),
                    seq.to_uppercase()
                )?;
            }
        } else {
            self.write_matrix_interleave(&mut writer, true)?;
        }
        writer.flush()?;
        if self.opts.partition_file && !self.aln.partitions.is_single() {
            self.write_partition_sidecar()?;
        }
        Ok(())
    }

    fn write_nexus(&mut self, interleave: bool) -> Result<()> {
        let mut writer = self.create_output_file(self.output)?;
        self.write_nexus_header(&mut writer, interleave)?;

        // Write only instead of write line.
        // This allows for no whitespace before the semicolon closing
        // the matrix command.
        write!(writer, "matrix")?;

        if !interleave {
            writeln!(writer)?;
            for (id, seq) in &self.aln.matrix {
                writeln!(
                    writer,
                    "{}{}",
                    self.padded_id(id),
                    seq.to_uppercase()
                )?;
            }
        } else {
            self.write_matrix_interleave(&mut writer, false)?;
        }

        writeln!(writer, ";")?;
        writeln!(writer, "end;")?;

        if self.opts.use_charset && !self.aln.partitions.is_single() {
            let part_writer = PartWriter::new(
                self.output,
                &self.aln.partitions,
                &PartitionFmt::Charset,
                &self.aln.datatype,
            );
            part_writer.write_charset_block(&mut writer)?;
        }
        self.write_outgroup_block(&mut writer)?;

        writer.flush()?;
        Ok(())
    }

    fn write_nexus_header<W: Write>(&self, writer: &mut W, interleave: bool) -> Result<()> {
        writeln!(writer, "#NEXUS")?;
        writeln!(writer, "begin data;")?;
        writeln!(
            writer,
            "dimensions ntax={} nchar={};",
            self.aln.ntax(),
            self.aln.total_length()
        )?;
        write!(writer, "format datatype={}", self.datatype_token())?;
        write!(
            writer,
            " missing={} gap={}",
            self.opts.missing, self.opts.gap
        )?;
        if interleave {
            write!(writer, " interleave")?;
        }
        writeln!(writer, ";")?;
        Ok(())
    }

    // Gap-coded alignments declare the appended binary block through a
    // mixed datatype: base sites first, restriction sites after.
    fn datatype_token(&self) -> String {
        match self.aln.restriction_range {
            Some((base_len, end)) => format!(
                "mixed({}:1-{}, restriction:{}-{})",
                self.aln.datatype.nexus_name(),
                base_len,
                base_len + 1,
                end + 1
            ),
            None => String::from(self.aln.datatype.nexus_name()),
        }
    }

    fn write_outgroup_block<W: Write>(&self, writer: &mut W) -> Result<()> {
        if let Some(outgroup) = &self.opts.outgroup {
            let present: Vec<&String> = outgroup
                .iter()
                .filter(|taxon| self.aln.matrix.contains_key(*taxon))
                .collect();
            if !present.is_empty() {
                writeln!(writer, "begin mrbayes;")?;
                let names: Vec<&str> = present.iter().map(|taxon| taxon.as_str()).collect();
                writeln!(writer, "outgroup {};", names.join(" "))?;
                writeln!(writer, "end;")?;
            }
        }
        Ok(())
    }

    fn write_matrix_interleave<W: Write>(&self, writer: &mut W, phylip: bool) -> Result<()> {
        let blocks = self.interleave_blocks();
        for (idx, block) in &blocks {
            writeln!(writer)?;
            for (id, chunk) in block {
                if phylip && *idx > 0 {
                    writeln!(writer, "{}", chunk.to_uppercase())?;
                } else if phylip {
                    writeln!(writer, "{}{}", self.phylip_id(id), chunk.to_uppercase())?;
                } else {
                    writeln!(writer, "{}{}", self.padded_id(id), chunk.to_uppercase())?;
                }
            }
        }
        Ok(())
    }

    fn interleave_blocks(&self) -> BTreeMap<usize, Vec<(String, String)>> {
        let mut blocks: BTreeMap<usize, Vec<(String, String)>> = BTreeMap::new();
        for (id, seq) in &self.aln.matrix {
            for (idx, chunk) in chunk_seq(seq, BLOCK_LEN).into_iter().enumerate() {
                blocks.entry(idx).or_default().push((id.clone(), chunk));
            }
        }
        blocks
    }

    fn write_partition_sidecar(&self) -> Result<()> {
        let part_path = sidecar_path(self.output);
        let writer = PartWriter::new(
            &part_path,
            &self.aln.partitions,
            &PartitionFmt::Raxml,
            &self.aln.datatype,
        )
        .with_model(self.opts.model.as_deref());
        writer.write_partition()
    }

    fn phylip_id(&self, id: &str) -> String {
        if self.opts.phylip_truncate_names {
            let cut: String = id.chars().take(PHYLIP_TRUNCATE).collect();
            format!("{:<width$}", cut, width = PHYLIP_TRUNCATE)
        } else {
            format!("{:<width$}", id, width = PHYLIP_PAD)
        }
    }

    fn padded_id(&self, id: &str) -> String {
        format!("{:<width$} ", id, width = self.id_len)
    }
}

fn chunk_seq(seq: &str, n: usize) -> Vec<String> {
    seq.as_bytes()
        .chunks(n)
        .map(|chunk| {
            std::str::from_utf8(chunk)
                .expect("Failed chunking sequence")
                .to_string()
        })
        .collect()
}
