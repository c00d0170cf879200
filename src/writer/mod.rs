//! Writer trait and its implementations.
//!
//! The writer trait is used to write the output of the program to a file.
//! The trait is implemented for the following types:
//! 1. `SeqWriter`: write alignments as fasta, phylip, or nexus.
//! 2. `PartWriter`: write partition data as charset blocks or sidecar files.
//! 3. `McmcTreeWriter`: write multi-partition phylip blocks for MCMCTree.
//! 4. `Ima2Writer`: write IMa2 input files.
//! 5. `HaplotypeWriter`: write haplotype correspondence sidecars.
pub mod haplotypes;
pub mod ima2;
pub mod mcmctree;
pub mod partition;
pub mod sequences;

use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};

trait FileWriter {
    fn create_output_file(&self, path: &Path) -> Result<BufWriter<File>> {
        create_parent_directory(path)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Failed writing to {}", path.display()))?;
        Ok(BufWriter::new(file))
    }

    fn append_output_file(&self, path: &Path) -> Result<BufWriter<File>> {
        create_parent_directory(path)?;
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("Failed appending to {}", path.display()))?;
        Ok(BufWriter::new(file))
    }
}

fn create_parent_directory(path: &Path) -> Result<()> {
    if let Some(dir_name) = path.parent() {
        fs::create_dir_all(dir_name).with_context(|| {
            format!("Failed creating an output directory for {}", path.display())
        })?;
    }
    Ok(())
}
