//! Write the haplotype correspondence sidecar produced by collapsing.
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indexmap::IndexMap;

use crate::writer::FileWriter;

impl FileWriter for HaplotypeWriter<'_> {}

pub struct HaplotypeWriter<'a> {
    output: &'a Path,
    mapping: &'a IndexMap<String, Vec<String>>,
}

impl<'a> HaplotypeWriter<'a> {
    pub fn new(output: &'a Path, mapping: &'a IndexMap<String, Vec<String>>) -> Self {
        Self { output, mapping }
    }

    /// Write `HAP_i: tx1; tx2; ...` lines to `<name>.haplotypes`.
    pub fn write(&self) -> Result<()> {
        let path = self.haplotype_path();
        let mut writer = self.create_output_file(&path)?;
        for (haplotype, taxa) in self.mapping {
            writeln!(writer, "{}: {}", haplotype, taxa.join("; "))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn haplotype_path(&self) -> PathBuf {
        self.output.with_extension("haplotypes")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indexmap::indexmap;
    use tempdir::TempDir;

    #[test]
    fn test_write_haplotypes() {
        let dir = TempDir::new("haps").unwrap();
        let output = dir.path().join("gene_1.fas");
        let mapping = indexmap! {
            String::from("Hap_1") => vec![String::from("a"), String::from("b")],
            String::from("Hap_2") => vec![String::from("c")],
        };
        let writer = HaplotypeWriter::new(&output, &mapping);
        writer.write().unwrap();
        let text = std::fs::read_to_string(dir.path().join("gene_1.haplotypes")).unwrap();
        assert_eq!("Hap_1: a; b\nHap_2: c\n", text);
    }
}
