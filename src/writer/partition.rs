//! Partition writer module.
//!
//! Emits either a MrBayes charset block appended to nexus output or a
//! RAxML-style sidecar file with one line per partition:
//! `MODEL, NAME = S-E[, S2-E2 ...]` with 1-based inclusive coordinates.
//! Codon sub-partitions join their per-offset ranges with commas.
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::helper::partition::{Partition, PartitionModel};
use crate::helper::types::{DataType, PartitionFmt};
use crate::writer::FileWriter;

impl FileWriter for PartWriter<'_> {}

pub struct PartWriter<'a> {
    fpath: &'a Path,
    partitions: &'a PartitionModel,
    part_fmt: &'a PartitionFmt,
    datatype: &'a DataType,
    model: Option<&'a str>,
}

impl<'a> PartWriter<'a> {
    pub fn new(
        fpath: &'a Path,
        partitions: &'a PartitionModel,
        part_fmt: &'a PartitionFmt,
        datatype: &'a DataType,
    ) -> Self {
        Self {
            fpath,
            partitions,
            part_fmt,
            datatype,
            model: None,
        }
    }

    /// Override the substitution model for partitions without a bound one.
    pub fn with_model(mut self, model: Option<&'a str>) -> Self {
        self.model = model;
        self
    }

    pub fn write_partition(&self) -> Result<()> {
        match self.part_fmt {
            PartitionFmt::Charset => {
                let mut writer = self.append_output_file(self.fpath)?;
                self.write_charset_block(&mut writer)?;
                writer.flush()?;
            }
            PartitionFmt::Raxml => {
                let mut writer = self.create_output_file(self.fpath)?;
                self.write_raxml(&mut writer)?;
                writer.flush()?;
            }
        }
        Ok(())
    }

    /// Write the `begin sets;` charset block for nexus output.
    pub fn write_charset_block<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "begin sets;")?;
        for (name, part) in self.partitions.iter() {
            match &part.codon_positions {
                Some(positions) => {
                    for offset in positions {
                        writeln!(
                            writer,
                            "charset {}_{} = {}-{}\\3;",
                            self.quote_name(name),
                            offset + 1,
                            part.start + offset + 1,
                            part.end + 1
                        )?;
                    }
                }
                None => {
                    writeln!(
                        writer,
                        "charset {} = {}-{};",
                        self.quote_name(name),
                        part.start + 1,
                        part.end + 1
                    )?;
                }
            }
        }
        writeln!(writer, "end;")?;
        Ok(())
    }

    fn write_raxml<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (name, part) in self.partitions.iter() {
            writeln!(
                writer,
                "{}, {} = {}",
                self.resolve_model(part),
                name,
                self.fmt_ranges(part)
            )?;
        }
        Ok(())
    }

    // Codon partitions list one `s-e` range per offset, comma-joined.
    fn fmt_ranges(&self, part: &Partition) -> String {
        match &part.codon_positions {
            Some(positions) => positions
                .iter()
                .map(|offset| format!("{}-{}", part.start + offset + 1, part.end + 1))
                .collect::<Vec<String>>()
                .join(", "),
            None => format!("{}-{}", part.start + 1, part.end + 1),
        }
    }

    fn resolve_model(&self, part: &Partition) -> String {
        match &part.model {
            Some(model) => model.clone(),
            None => match self.model {
                Some(model) => String::from(model),
                None => String::from(self.datatype.default_model()),
            },
        }
    }

    fn quote_name(&self, name: &str) -> String {
        if name.contains('-') {
            format!("'{}'", name)
        } else {
            String::from(name)
        }
    }
}

/// Sidecar path next to a phylip output: `out.phy` becomes
/// `out_part.File`.
pub fn sidecar_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("alignment");
    let fname = format!("{}_part.File", stem);
    match output.parent() {
        Some(parent) => parent.join(fname),
        None => PathBuf::from(fname),
    }
}
