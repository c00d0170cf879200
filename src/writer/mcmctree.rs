//! Write alignments as MCMCTree-ready phylip blocks.
//!
//! Multi-partition alignments emit one phylip block per partition;
//! single-partition alignments emit one block covering the whole matrix.
use std::io::prelude::*;
use std::path::Path;

use anyhow::Result;

use crate::helper::alignment::Alignment;
use crate::writer::FileWriter;

const NAME_PAD: usize = 30;

impl FileWriter for McmcTreeWriter<'_> {}

pub struct McmcTreeWriter<'a> {
    output: &'a Path,
    aln: &'a Alignment,
}

impl<'a> McmcTreeWriter<'a> {
    pub fn new(output: &'a Path, aln: &'a Alignment) -> Self {
        Self { output, aln }
    }

    pub fn write(&self) -> Result<()> {
        let mut writer = self.create_output_file(self.output)?;
        if self.aln.partitions.is_single() {
            self.write_block(&mut writer, 0, self.aln.locus_length)?;
        } else {
            for (_, part) in self.aln.partitions.iter() {
                self.write_block(&mut writer, part.start, part.end + 1)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn write_block<W: Write>(&self, writer: &mut W, start: usize, end: usize) -> Result<()> {
        writeln!(writer, "{} {}", self.aln.ntax(), end - start)?;
        for (id, seq) in &self.aln.matrix {
            let slice = seq.get(start..end).unwrap_or_default();
            writeln!(
                writer,
                "{:<width$}  {}",
                id,
                slice.to_uppercase(),
                width = NAME_PAD
            )?;
        }
        Ok(())
    }
}
