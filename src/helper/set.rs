//! A collection of alignments with cross-alignment operations.
//!
//! The set owns its alignments. Parse failures never sink a batch: bad
//! files, unequal-length files, and duplicate names are recorded in their
//! own lists and the remaining files load normally.
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;

use crate::helper::alignment::{Alignment, RemoveMode};
use crate::helper::concat::Concat;
use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::files;
use crate::helper::partition::PartitionModel;
use crate::helper::progress::ProgressSink;
use crate::helper::types::{DataType, InputFmt, OutputFmt, SeqMatrix, WriteOpts};
use crate::writer::sequences::SeqWriter;

/// Modes for the alignment-level taxa screen.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TaxaScreen {
    /// Keep alignments containing every listed taxon.
    Contain,
    /// Remove alignments containing any listed taxon.
    Exclude,
}

/// Direction for moving alignments between the active and shelved maps.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Shelf {
    ToActive,
    ToShelved,
}

#[derive(Debug, Default, Clone)]
pub struct AlignmentSet {
    active: IndexMap<String, Alignment>,
    shelved: IndexMap<String, Alignment>,
    /// Files that failed to parse.
    pub bad: Vec<PathBuf>,
    /// Files that failed the equal-length check.
    pub unequal_length: Vec<PathBuf>,
    /// Names observed more than once.
    pub duplicates: Vec<String>,
    /// Names added with a datatype disagreeing with the set.
    pub alphabet_mismatch: Vec<String>,
    taxa_names: IndexSet<String>,
    datatype: Option<DataType>,
    partitions: PartitionModel,
}

impl AlignmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The common datatype of the set, fixed by the first added alignment.
    pub fn datatype(&self) -> Option<DataType> {
        self.datatype
    }

    pub fn taxa_names(&self) -> &IndexSet<String> {
        &self.taxa_names
    }

    pub fn partitions(&self) -> &PartitionModel {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn alignments(&self) -> impl Iterator<Item = &Alignment> {
        self.active.values()
    }

    pub fn get(&self, name: &str) -> Option<&Alignment> {
        self.active.get(name)
    }

    pub fn shelved_names(&self) -> Vec<String> {
        self.shelved.keys().cloned().collect()
    }

    /// Parse a batch of files and add the results.
    ///
    /// Files are sorted and parsed in parallel; insertion stays in sorted
    /// order so row and partition order are deterministic.
    pub fn add_files(
        &mut self,
        files: &[PathBuf],
        input_fmt: &InputFmt,
        datatype: &DataType,
        progress: &dyn ProgressSink,
    ) -> SeqResult<()> {
        let mut files: Vec<PathBuf> = files.to_vec();
        alphanumeric_sort::sort_path_slice(&mut files);
        progress.set_stage("Parsing alignment files...");
        progress.set_total(files.len());
        let parsed: Vec<(PathBuf, SeqResult<Alignment>)> = files
            .par_iter()
            .map(|file| (file.clone(), Alignment::from_file(file, input_fmt, datatype)))
            .collect();
        for (done, (path, result)) in parsed.into_iter().enumerate() {
            if progress.cancelled() {
                return Err(SeqError::Cancelled);
            }
            match result {
                Ok(aln) if !aln.is_alignment => {
                    log::warn!("{}", SeqError::UnequalLength(path.clone()));
                    self.unequal_length.push(path);
                }
                Ok(aln) => self.add(aln),
                Err(err) => {
                    log::warn!("Skipping {}: {}", path.display(), err);
                    self.bad.push(path);
                }
            }
            progress.set_progress(done + 1);
        }
        Ok(())
    }

    /// Add one alignment, recording duplicates and alphabet disagreements.
    pub fn add(&mut self, aln: Alignment) {
        if self.active.contains_key(&aln.name) || self.shelved.contains_key(&aln.name) {
            self.duplicates.push(aln.name);
            return;
        }
        match self.datatype {
            None => self.datatype = Some(aln.datatype),
            Some(expected) if expected != aln.datatype => {
                log::warn!(
                    "{}: {}",
                    aln.name,
                    SeqError::AlphabetMismatch {
                        expected,
                        got: aln.datatype,
                    }
                );
                self.alphabet_mismatch.push(aln.name.clone());
            }
            Some(_) => (),
        }
        aln.matrix.keys().for_each(|taxon| {
            self.taxa_names.insert(taxon.clone());
        });
        self.partitions
            .add_by_length(&aln.name, aln.locus_length, aln.path.as_deref())
            .expect("Unique alignment names cannot conflict");
        self.active.insert(aln.name.clone(), aln);
    }

    /// Move one alignment between the active and shelved maps.
    pub fn move_alignment(&mut self, name: &str, direction: Shelf) {
        match direction {
            Shelf::ToShelved => {
                if let Some(aln) = self.active.shift_remove(name) {
                    self.shelved.insert(String::from(name), aln);
                }
            }
            Shelf::ToActive => {
                if let Some(aln) = self.shelved.shift_remove(name) {
                    self.active.insert(String::from(name), aln);
                }
            }
        }
        self.rebuild();
    }

    /// Make exactly the listed names active, shelving everything else.
    pub fn update_active(&mut self, names: &[String]) {
        let mut combined: IndexMap<String, Alignment> = IndexMap::new();
        combined.extend(self.active.drain(..));
        combined.extend(self.shelved.drain(..));
        for (name, aln) in combined {
            if names.contains(&name) {
                self.active.insert(name, aln);
            } else {
                self.shelved.insert(name, aln);
            }
        }
        self.rebuild();
    }

    /// Remove an alignment entirely, dropping its partition contribution.
    pub fn remove_alignment(&mut self, name: &str) -> Option<Alignment> {
        let removed = self
            .active
            .shift_remove(name)
            .or_else(|| self.shelved.shift_remove(name));
        self.rebuild();
        removed
    }

    /// Concatenate the active alignments.
    pub fn concatenate(&self, progress: &dyn ProgressSink) -> SeqResult<Alignment> {
        let datatype = self.require_datatype()?;
        let concat = Concat::new(&self.active, &self.taxa_names, datatype);
        concat.concat(progress)
    }

    /// Split a set holding a single concatenated alignment back into one
    /// alignment per partition.
    pub fn reverse_concatenate(&self) -> SeqResult<AlignmentSet> {
        let aln = match self.active.values().next() {
            Some(aln) if self.active.len() == 1 => aln,
            _ => {
                return Err(SeqError::PartitionConflict(String::from(
                    "reverse concatenation expects a single concatenated alignment",
                )));
            }
        };
        let mut set = AlignmentSet::new();
        for sub in aln.reverse_concatenate()? {
            set.add(sub);
        }
        Ok(set)
    }

    /// Delete active alignments holding fewer taxa than `pct` percent of
    /// the set's taxa universe. Returns the removed names.
    pub fn filter_min_taxa(&mut self, pct: f64) -> Vec<String> {
        let min_taxa = (pct / 100.0 * self.taxa_names.len() as f64).ceil() as usize;
        let removed: Vec<String> = self
            .active
            .iter()
            .filter(|(_, aln)| aln.ntax() < min_taxa)
            .map(|(name, _)| name.clone())
            .collect();
        self.active.retain(|name, _| !removed.contains(name));
        self.rebuild();
        removed
    }

    /// Screen active alignments by taxa membership. Returns the removed
    /// names.
    pub fn filter_by_taxa(&mut self, taxa: &[String], mode: TaxaScreen) -> Vec<String> {
        let removed: Vec<String> = self
            .active
            .iter()
            .filter(|(_, aln)| match mode {
                TaxaScreen::Contain => !taxa.iter().all(|taxon| aln.matrix.contains_key(taxon)),
                TaxaScreen::Exclude => taxa.iter().any(|taxon| aln.matrix.contains_key(taxon)),
            })
            .map(|(name, _)| name.clone())
            .collect();
        self.active.retain(|name, _| !removed.contains(name));
        self.rebuild();
        removed
    }

    /// Keep only the flagged codon positions of every active alignment.
    pub fn filter_codon_positions(&mut self, mask: &[bool; 3]) {
        self.active
            .values_mut()
            .for_each(|aln| aln.filter_codon_positions(mask));
        self.rebuild();
    }

    /// Drop columns exceeding the missing data thresholds in every active
    /// alignment.
    pub fn filter_missing(&mut self, gap_pct: f64, missing_pct: f64) {
        self.active
            .values_mut()
            .for_each(|aln| aln.filter_missing(gap_pct, missing_pct));
        self.rebuild();
    }

    /// Filter taxa in every active alignment.
    pub fn remove_taxa(&mut self, taxa: &[String], mode: RemoveMode) {
        self.active
            .values_mut()
            .for_each(|aln| aln.remove_taxa(taxa, mode));
        self.rebuild();
    }

    /// Collapse identical sequences in every active alignment. Returns
    /// the haplotype mapping per alignment name.
    pub fn collapse(&mut self, prefix: &str) -> IndexMap<String, IndexMap<String, Vec<String>>> {
        let mut mappings = IndexMap::new();
        for (name, aln) in self.active.iter_mut() {
            mappings.insert(name.clone(), aln.collapse(prefix));
        }
        self.rebuild();
        mappings
    }

    /// Code indel events in every active alignment.
    pub fn code_gaps(&mut self) {
        self.active.values_mut().for_each(|aln| aln.code_gaps());
    }

    /// Write every active alignment into a directory. Returns the
    /// written paths.
    pub fn write_all(
        &self,
        output_dir: &Path,
        output_fmt: &OutputFmt,
        opts: &WriteOpts,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.active.len());
        for aln in self.active.values() {
            let fname = files::create_output_fname_from_path(Path::new(&aln.name), output_fmt);
            let output = output_dir.join(fname);
            let mut writer = SeqWriter::new(&output, aln, opts.clone());
            writer.write(output_fmt)?;
            written.push(output);
        }
        Ok(written)
    }

    fn require_datatype(&self) -> SeqResult<DataType> {
        self.datatype.ok_or_else(|| {
            SeqError::PartitionConflict(String::from("the set holds no alignments"))
        })
    }

    // Rebuild the taxa universe and the concatenated-space partitions
    // from the active alignments.
    fn rebuild(&mut self) {
        self.taxa_names = self
            .active
            .values()
            .flat_map(|aln| aln.matrix.keys().cloned())
            .collect();
        let mut partitions = PartitionModel::new();
        self.active.values().for_each(|aln| {
            if aln.locus_length > 0 {
                partitions
                    .add_by_length(&aln.name, aln.locus_length, aln.path.as_deref())
                    .expect("Unique alignment names cannot conflict");
            }
        });
        self.partitions = partitions;
    }
}

/// Build a set from an explicit list of rows-maps, mainly for tests and
/// in-process callers.
pub fn set_from_matrices(
    matrices: Vec<(String, SeqMatrix)>,
    datatype: DataType,
) -> SeqResult<AlignmentSet> {
    let mut set = AlignmentSet::new();
    for (name, matrix) in matrices {
        let aln = Alignment::from_matrix(&name, matrix, datatype, PartitionModel::new())?;
        set.add(aln);
    }
    Ok(set)
}
