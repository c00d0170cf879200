//! Write alignments as IMa2 input files.
//!
//! The header lists the locus count, the population count, the population
//! names, and the population tree. Each locus block starts with the locus
//! name, the per-population sequence counts, the locus length, the
//! mutational model, and the inheritance scalar, followed by the rows in
//! population-map order. Taxa whose slice is entirely missing data are
//! omitted from that locus.
use std::io::prelude::*;
use std::path::Path;

use anyhow::{Result, bail};
use indexmap::IndexMap;

use crate::helper::alignment::Alignment;
use crate::writer::FileWriter;

const NAME_CUT: usize = 8;
const NAME_PAD: usize = 10;

impl FileWriter for Ima2Writer<'_> {}

pub struct Ima2Writer<'a> {
    output: &'a Path,
    aln: &'a Alignment,
    populations: &'a IndexMap<String, Vec<String>>,
    pop_tree: &'a str,
    mut_model: &'a str,
    inheritance_scalar: &'a str,
}

impl<'a> Ima2Writer<'a> {
    pub fn new(
        output: &'a Path,
        aln: &'a Alignment,
        populations: &'a IndexMap<String, Vec<String>>,
        pop_tree: &'a str,
        mut_model: &'a str,
        inheritance_scalar: &'a str,
    ) -> Self {
        Self {
            output,
            aln,
            populations,
            pop_tree,
            mut_model,
            inheritance_scalar,
        }
    }

    pub fn write(&self) -> Result<()> {
        let mut writer = self.create_output_file(self.output)?;
        let nloci = self.aln.partitions.len();
        writeln!(writer, "Input file for IMa2 using {} alignments", nloci)?;
        writeln!(writer, "{}", self.populations.len())?;
        let names: Vec<&str> = self.populations.keys().map(String::as_str).collect();
        writeln!(writer, "{}", names.join(" "))?;
        writeln!(writer, "{}", self.pop_tree)?;

        for (name, part) in self.aln.partitions.iter() {
            self.write_locus(&mut writer, name, part.start, part.end + 1)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_locus<W: Write>(
        &self,
        writer: &mut W,
        name: &str,
        start: usize,
        end: usize,
    ) -> Result<()> {
        let missing = self.aln.datatype.missing().to_ascii_uppercase();
        // Rows resolved first so per-population counts reflect the taxa
        // actually present in this locus.
        let mut rows: Vec<(String, String)> = Vec::new();
        let mut counts: Vec<usize> = Vec::with_capacity(self.populations.len());
        for (population, taxa) in self.populations {
            let mut count = 0;
            for taxon in taxa {
                let seq = match self.aln.matrix.get(taxon) {
                    Some(seq) => seq,
                    None => bail!(
                        "taxon {} from population {} is not in the alignment",
                        taxon,
                        population
                    ),
                };
                let slice = seq.get(start..end).unwrap_or_default().to_uppercase();
                if slice.chars().any(|ch| ch != missing) {
                    rows.push((self.ima2_id(taxon), slice));
                    count += 1;
                }
            }
            counts.push(count);
        }
        let counts: Vec<String> = counts.iter().map(usize::to_string).collect();
        writeln!(
            writer,
            "{} {} {} {} {}",
            name,
            counts.join(" "),
            end - start,
            self.mut_model,
            self.inheritance_scalar
        )?;
        for (id, seq) in rows {
            writeln!(writer, "{}{}", id, seq)?;
        }
        Ok(())
    }

    fn ima2_id(&self, id: &str) -> String {
        let cut: String = id.chars().take(NAME_CUT).collect();
        format!("{:<width$}", cut, width = NAME_PAD)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helper::partition::PartitionModel;
    use crate::helper::types::DataType;
    use indexmap::indexmap;
    use tempdir::TempDir;

    #[test]
    fn test_write_ima2() {
        let dir = TempDir::new("ima2").unwrap();
        let output = dir.path().join("out.txt");
        let matrix = indexmap! {
            String::from("a") => String::from("aatt"),
            String::from("b") => String::from("aann"),
            String::from("c") => String::from("nntt"),
        };
        let mut partitions = PartitionModel::new();
        partitions.add_by_length("x", 2, None).unwrap();
        partitions.add_by_length("y", 2, None).unwrap();
        let aln = Alignment::from_matrix("concat", matrix, DataType::Dna, partitions).unwrap();
        let populations = indexmap! {
            String::from("north") => vec![String::from("a"), String::from("b")],
            String::from("south") => vec![String::from("c")],
        };
        let writer = Ima2Writer::new(&output, &aln, &populations, "(0,1):2", "HKY", "1");
        writer.write().unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!("Input file for IMa2 using 2 alignments", lines[0]);
        assert_eq!("2", lines[1]);
        assert_eq!("north south", lines[2]);
        assert_eq!("(0,1):2", lines[3]);
        // Locus x: c is all missing and omitted; north keeps 2, south 0.
        assert_eq!("x 2 0 2 HKY 1", lines[4]);
        // Locus y: b is all missing and omitted.
        assert_eq!("y 1 1 2 HKY 1", lines[7]);
    }

    #[test]
    fn test_missing_taxon_fails() {
        let dir = TempDir::new("ima2").unwrap();
        let output = dir.path().join("out.txt");
        let matrix = indexmap! {
            String::from("a") => String::from("aatt"),
        };
        let aln =
            Alignment::from_matrix("concat", matrix, DataType::Dna, PartitionModel::new()).unwrap();
        let populations = indexmap! {
            String::from("north") => vec![String::from("ghost")],
        };
        let writer = Ima2Writer::new(&output, &aln, &populations, "(0,1):2", "HKY", "1");
        assert!(writer.write().is_err());
    }
}
