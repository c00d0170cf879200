//! A collection of group files persisted as on-disk snapshots.
//!
//! Only aggregate statistics and the per-group thresholds stay in memory;
//! each parsed group file is serialized to a private, versioned JSON blob
//! under a caller-supplied scratch directory and reloaded on demand.
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::helper::errors::{SeqError, SeqResult};
use crate::ortho::groups::{GroupFile, GroupStats};

/// Blob format version; bump on layout changes.
const BLOB_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Blob {
    version: u32,
    group: GroupFile,
}

/// In-memory handle to one persisted group file.
#[derive(Debug, Clone)]
pub struct GroupHandle {
    pub blob_path: PathBuf,
    pub gene_threshold: Option<usize>,
    pub species_threshold: Option<usize>,
    pub stats: GroupStats,
}

#[derive(Debug)]
pub struct GroupSet {
    scratch_dir: PathBuf,
    groups: IndexMap<String, GroupHandle>,
    blob_counter: usize,
}

impl GroupSet {
    pub fn new(scratch_dir: &Path) -> SeqResult<Self> {
        fs::create_dir_all(scratch_dir).map_err(|err| {
            SeqError::Parse {
                path: scratch_dir.to_path_buf(),
                line: 0,
                reason: err.to_string(),
            }
        })?;
        Ok(Self {
            scratch_dir: scratch_dir.to_path_buf(),
            groups: IndexMap::new(),
            blob_counter: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn handle(&self, name: &str) -> Option<&GroupHandle> {
        self.groups.get(name)
    }

    /// Persist a parsed group file and keep only its handle.
    pub fn add_group(&mut self, group: GroupFile) -> SeqResult<()> {
        if self.groups.contains_key(&group.name) {
            return Err(SeqError::PartitionConflict(format!(
                "group {} already exists in the set",
                group.name
            )));
        }
        self.blob_counter += 1;
        let blob_path = self
            .scratch_dir
            .join(format!("{}-{}.sfg", group.name, self.blob_counter));
        let handle = GroupHandle {
            blob_path: blob_path.clone(),
            gene_threshold: group.gene_threshold,
            species_threshold: group.species_threshold,
            stats: group.stats(),
        };
        let name = group.name.clone();
        write_blob(&blob_path, group)?;
        self.groups.insert(name, handle);
        Ok(())
    }

    /// Reload one persisted group file.
    pub fn load_group(&self, name: &str) -> SeqResult<GroupFile> {
        let handle = self.groups.get(name).ok_or_else(|| {
            blob_error(
                &self.scratch_dir,
                &format!("group {} is not in the set", name),
            )
        })?;
        read_blob(&handle.blob_path)
    }

    /// Update thresholds across the set, or a named subset, re-sweeping
    /// each group's counters.
    pub fn update_filters(
        &mut self,
        gene_threshold: Option<usize>,
        species_threshold: Option<usize>,
        names: Option<&[String]>,
    ) -> SeqResult<()> {
        let targets: Vec<String> = match names {
            Some(names) => names.to_vec(),
            None => self.names(),
        };
        for name in targets {
            let mut group = self.load_group(&name)?;
            group.update_filters(gene_threshold, species_threshold, true);
            self.replace_group(&name, group)?;
        }
        Ok(())
    }

    /// Remove taxa from every group in the set.
    pub fn exclude_taxa(&mut self, taxa: &[String]) -> SeqResult<()> {
        for name in self.names() {
            let mut group = self.load_group(&name)?;
            group.exclude_taxa(taxa);
            self.replace_group(&name, group)?;
        }
        Ok(())
    }

    /// Per-group statistics snapshots in insertion order.
    pub fn group_stats(&self) -> Vec<(String, GroupStats)> {
        self.groups
            .iter()
            .map(|(name, handle)| (name.clone(), handle.stats))
            .collect()
    }

    /// Aggregate statistics over the whole set.
    pub fn summary_stats(&self) -> GroupStats {
        let mut total = GroupStats::default();
        for handle in self.groups.values() {
            total.clusters += handle.stats.clusters;
            total.total_seqs += handle.stats.total_seqs;
            total.max_extra_copy = total.max_extra_copy.max(handle.stats.max_extra_copy);
            total.num_gene_compliant += handle.stats.num_gene_compliant;
            total.num_species_compliant += handle.stats.num_species_compliant;
            total.all_compliant += handle.stats.all_compliant;
        }
        total
    }

    /// Drop a group and its blob.
    pub fn remove_group(&mut self, name: &str) -> SeqResult<()> {
        if let Some(handle) = self.groups.shift_remove(name) {
            let _ = fs::remove_file(&handle.blob_path);
        }
        Ok(())
    }

    fn replace_group(&mut self, name: &str, group: GroupFile) -> SeqResult<()> {
        let handle = self.groups.get_mut(name).ok_or_else(|| {
            blob_error(
                &self.scratch_dir,
                &format!("group {} is not in the set", name),
            )
        })?;
        handle.gene_threshold = group.gene_threshold;
        handle.species_threshold = group.species_threshold;
        handle.stats = group.stats();
        write_blob(&handle.blob_path, group)?;
        Ok(())
    }
}

fn write_blob(path: &Path, group: GroupFile) -> SeqResult<()> {
    let file = File::create(path).map_err(|err| blob_error(path, &err.to_string()))?;
    let blob = Blob {
        version: BLOB_VERSION,
        group,
    };
    serde_json::to_writer(BufWriter::new(file), &blob)
        .map_err(|err| blob_error(path, &err.to_string()))?;
    Ok(())
}

fn read_blob(path: &Path) -> SeqResult<GroupFile> {
    let file = File::open(path).map_err(|err| blob_error(path, &err.to_string()))?;
    let blob: Blob = serde_json::from_reader(BufReader::new(file))
        .map_err(|err| blob_error(path, &err.to_string()))?;
    if blob.version != BLOB_VERSION {
        return Err(blob_error(
            path,
            &format!("unsupported blob version {}", blob.version),
        ));
    }
    Ok(blob.group)
}

fn blob_error(path: &Path, reason: &str) -> SeqError {
    SeqError::Parse {
        path: path.to_path_buf(),
        line: 0,
        reason: String::from(reason),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helper::progress::NoProgress;
    use std::io::Write;
    use tempdir::TempDir;

    fn write_groups(dir: &TempDir, fname: &str) -> PathBuf {
        let path = dir.path().join(fname);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "cluster1: sp1|g1 sp1|g2 sp2|g3 sp3|g4").unwrap();
        writeln!(file, "cluster2: sp1|g5 sp2|g6").unwrap();
        path
    }

    #[test]
    fn test_roundtrip_blob() {
        let dir = TempDir::new("groupset").unwrap();
        let groups_path = write_groups(&dir, "groups.txt");
        let group = GroupFile::parse(&groups_path, Some(2), Some(3), &NoProgress).unwrap();
        let mut set = GroupSet::new(&dir.path().join("scratch")).unwrap();
        set.add_group(group).unwrap();

        let loaded = set.load_group("groups").unwrap();
        assert_eq!(2, loaded.len());
        assert_eq!(Some(2), loaded.gene_threshold);
        assert_eq!(vec!["sp1", "sp2", "sp3"], loaded.species_list);
    }

    #[test]
    fn test_update_filters_fan_out() {
        let dir = TempDir::new("groupset").unwrap();
        let groups_path = write_groups(&dir, "groups.txt");
        let group = GroupFile::parse(&groups_path, Some(2), Some(3), &NoProgress).unwrap();
        let mut set = GroupSet::new(&dir.path().join("scratch")).unwrap();
        set.add_group(group).unwrap();

        set.update_filters(Some(2), Some(2), None).unwrap();
        let stats = set.handle("groups").unwrap().stats;
        assert_eq!(2, stats.all_compliant);
    }

    #[test]
    fn test_exclude_taxa_fan_out() {
        let dir = TempDir::new("groupset").unwrap();
        let groups_path = write_groups(&dir, "groups.txt");
        let group = GroupFile::parse(&groups_path, Some(2), Some(3), &NoProgress).unwrap();
        let mut set = GroupSet::new(&dir.path().join("scratch")).unwrap();
        set.add_group(group).unwrap();

        set.exclude_taxa(&[String::from("sp3")]).unwrap();
        let loaded = set.load_group("groups").unwrap();
        assert_eq!(vec!["sp1", "sp2"], loaded.species_list);
        assert_eq!(0, set.summary_stats().all_compliant);
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let dir = TempDir::new("groupset").unwrap();
        let groups_path = write_groups(&dir, "groups.txt");
        let group = GroupFile::parse(&groups_path, None, None, &NoProgress).unwrap();
        let copy = group.clone();
        let mut set = GroupSet::new(&dir.path().join("scratch")).unwrap();
        set.add_group(group).unwrap();
        assert!(set.add_group(copy).is_err());
    }
}
