//! Indexed protein sequence store and the per-cluster FASTA join.
//!
//! The protein database is indexed once into a path-derived sidecar file
//! mapping each sequence id to its byte span inside the FASTA. Later runs
//! against the same database path reuse the existing index. Lookups seek
//! into the FASTA, so the join never holds more than one record in
//! memory.
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};

use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::progress::ProgressSink;
use crate::ortho::ClusterSource;
use crate::ortho::cluster::is_all_compliant;
use crate::ortho::groups::GroupFile;

const INDEX_VERSION: u32 = 1;
const INDEX_EXT: &str = "fidx";

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    db_path: PathBuf,
    entries: HashMap<String, (u64, u64)>,
}

/// Outcome of one sequence retrieval run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Retrieval {
    /// Compliant clusters written.
    pub clusters: usize,
    /// Sequences written across all clusters.
    pub sequences: usize,
    /// Identifiers the database could not resolve.
    pub missed: usize,
}

/// Byte-span index over a protein FASTA database.
pub struct SeqIndex {
    db_path: PathBuf,
    index_path: PathBuf,
    entries: HashMap<String, (u64, u64)>,
}

impl SeqIndex {
    /// Open the index for a database, building it when absent.
    pub fn open(
        protein_db: &Path,
        scratch_dir: &Path,
        progress: &dyn ProgressSink,
    ) -> SeqResult<Self> {
        fs::create_dir_all(scratch_dir).map_err(|err| io_error(scratch_dir, &err))?;
        let index_path = scratch_dir
            .join(table_name(protein_db))
            .with_extension(INDEX_EXT);
        if index_path.exists() {
            if let Some(index) = Self::load(protein_db, &index_path)? {
                return Ok(index);
            }
        }
        progress.set_stage("Indexing the protein database...");
        let entries = build_entries(protein_db, progress)?;
        let index = Self {
            db_path: protein_db.to_path_buf(),
            index_path,
            entries,
        };
        index.save()?;
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Fetch one sequence by id, reading only its byte span.
    pub fn fetch(&self, id: &str) -> SeqResult<Option<String>> {
        let mut reader = File::open(&self.db_path).map_err(|err| io_error(&self.db_path, &err))?;
        self.fetch_with(&mut reader, id)
    }

    /// Emit one `<cluster>.fas` per compliant cluster of the group.
    ///
    /// Unresolved identifiers are counted in `missed` and skipped;
    /// they never fail the cluster.
    pub fn retrieve_sequences(
        &self,
        group: &GroupFile,
        dest: &Path,
        progress: &dyn ProgressSink,
    ) -> SeqResult<Retrieval> {
        fs::create_dir_all(dest).map_err(|err| io_error(dest, &err))?;
        progress.set_stage("Fetching cluster sequences...");
        progress.set_total(group.len());
        let mut db = File::open(&self.db_path).map_err(|err| io_error(&self.db_path, &err))?;
        let mut retrieval = Retrieval::default();
        for (done, summary) in group.iter_clusters()?.enumerate() {
            if progress.cancelled() {
                return Err(SeqError::Cancelled);
            }
            let summary = summary?;
            let (gene, species) = group.cluster_compliance(&summary.species_frequency);
            if !is_all_compliant(gene, species) {
                progress.set_progress(done + 1);
                continue;
            }
            let output = dest.join(format!("{}.fas", summary.name));
            let file = File::create(&output).map_err(|err| io_error(&output, &err))?;
            let mut writer = BufWriter::new(file);
            for token in &summary.sequences {
                match self.fetch_with(&mut db, token)? {
                    Some(seq) => {
                        writeln!(writer, ">{}", token).map_err(|err| io_error(&output, &err))?;
                        writeln!(writer, "{}", seq).map_err(|err| io_error(&output, &err))?;
                        retrieval.sequences += 1;
                    }
                    None => {
                        log::warn!("{}", SeqError::MissingSequence(token.clone()));
                        retrieval.missed += 1;
                    }
                }
            }
            writer.flush().map_err(|err| io_error(&output, &err))?;
            retrieval.clusters += 1;
            progress.set_progress(done + 1);
        }
        Ok(retrieval)
    }

    fn fetch_with(&self, reader: &mut File, id: &str) -> SeqResult<Option<String>> {
        let (offset, len) = match self.entries.get(id) {
            Some(span) => *span,
            None => return Ok(None),
        };
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(|err| io_error(&self.db_path, &err))?;
        let mut buffer = vec![0u8; len as usize];
        reader
            .read_exact(&mut buffer)
            .map_err(|err| io_error(&self.db_path, &err))?;
        let seq: String = String::from_utf8_lossy(&buffer)
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect();
        Ok(Some(seq))
    }

    fn load(protein_db: &Path, index_path: &Path) -> SeqResult<Option<Self>> {
        let file = File::open(index_path).map_err(|err| io_error(index_path, &err))?;
        let parsed: Result<IndexFile, _> = serde_json::from_reader(BufReader::new(file));
        match parsed {
            Ok(index) if index.version == INDEX_VERSION && index.db_path == protein_db => {
                Ok(Some(Self {
                    db_path: index.db_path,
                    index_path: index_path.to_path_buf(),
                    entries: index.entries,
                }))
            }
            // A stale or foreign index is rebuilt, not trusted.
            _ => Ok(None),
        }
    }

    fn save(&self) -> SeqResult<()> {
        let file = File::create(&self.index_path).map_err(|err| io_error(&self.index_path, &err))?;
        let index = IndexFile {
            version: INDEX_VERSION,
            db_path: self.db_path.clone(),
            entries: self.entries.clone(),
        };
        serde_json::to_writer(BufWriter::new(file), &index)
            .map_err(|err| SeqError::Parse {
                path: self.index_path.clone(),
                line: 0,
                reason: err.to_string(),
            })?;
        Ok(())
    }
}

// Stream the FASTA once, recording the byte span of every record's
// sequence region.
fn build_entries(
    protein_db: &Path,
    progress: &dyn ProgressSink,
) -> SeqResult<HashMap<String, (u64, u64)>> {
    let file = File::open(protein_db).map_err(|err| io_error(protein_db, &err))?;
    let mut reader = BufReader::new(file);
    let mut entries: HashMap<String, (u64, u64)> = HashMap::new();
    let mut line = String::new();
    let mut offset: u64 = 0;
    let mut current: Option<(String, u64)> = None;
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|err| io_error(protein_db, &err))?;
        if bytes == 0 {
            break;
        }
        if let Some(id) = line.strip_prefix('>') {
            if let Some((prev_id, seq_start)) = current.take() {
                entries.insert(prev_id, (seq_start, offset - seq_start));
            }
            let seq_start = offset + bytes as u64;
            current = Some((String::from(id.trim()), seq_start));
            progress.set_progress(entries.len());
        }
        offset += bytes as u64;
    }
    if let Some((prev_id, seq_start)) = current.take() {
        entries.insert(prev_id, (seq_start, offset - seq_start));
    }
    Ok(entries)
}

// Path-derived index name, stable across runs for the same database
// path.
fn table_name(protein_db: &Path) -> String {
    let name: String = protein_db
        .to_string_lossy()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect();
    if name.is_empty() {
        String::from("seqdb")
    } else {
        name
    }
}

fn io_error(path: &Path, err: &dyn std::fmt::Display) -> SeqError {
    SeqError::Parse {
        path: path.to_path_buf(),
        line: 0,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helper::progress::NoProgress;
    use tempdir::TempDir;

    fn write_db(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("proteins.fas");
        let mut file = File::create(&path).unwrap();
        writeln!(file, ">sp1|g1").unwrap();
        writeln!(file, "MKTE").unwrap();
        writeln!(file, "ARVL").unwrap();
        writeln!(file, ">sp2|g3").unwrap();
        writeln!(file, "MKAE").unwrap();
        writeln!(file, ">sp3|g4").unwrap();
        writeln!(file, "MQTE").unwrap();
        writeln!(file, ">sp1|g2").unwrap();
        writeln!(file, "MMMM").unwrap();
        path
    }

    fn write_groups(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("groups.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "cluster1: sp1|g1 sp1|g2 sp2|g3 sp3|g4").unwrap();
        writeln!(file, "cluster2: sp1|g5 sp2|g6").unwrap();
        path
    }

    #[test]
    fn test_build_and_fetch() {
        let dir = TempDir::new("seqdb").unwrap();
        let db = write_db(&dir);
        let index = SeqIndex::open(&db, &dir.path().join("scratch"), &NoProgress).unwrap();
        assert_eq!(4, index.len());
        assert_eq!(Some(String::from("MKTEARVL")), index.fetch("sp1|g1").unwrap());
        assert_eq!(Some(String::from("MMMM")), index.fetch("sp1|g2").unwrap());
        assert_eq!(None, index.fetch("ghost|g9").unwrap());
    }

    #[test]
    fn test_index_reuse() {
        let dir = TempDir::new("seqdb").unwrap();
        let db = write_db(&dir);
        let scratch = dir.path().join("scratch");
        let index = SeqIndex::open(&db, &scratch, &NoProgress).unwrap();
        let index_path = index.index_path().to_path_buf();
        assert!(index_path.exists());
        // A second open reuses the existing sidecar.
        let reopened = SeqIndex::open(&db, &scratch, &NoProgress).unwrap();
        assert_eq!(index_path, reopened.index_path());
        assert_eq!(4, reopened.len());
    }

    #[test]
    fn test_retrieve_compliant_clusters() {
        let dir = TempDir::new("seqdb").unwrap();
        let db = write_db(&dir);
        let groups_path = write_groups(&dir);
        let group =
            GroupFile::parse(&groups_path, Some(2), Some(3), &NoProgress).unwrap();
        let index = SeqIndex::open(&db, &dir.path().join("scratch"), &NoProgress).unwrap();
        let dest = dir.path().join("clusters");
        let retrieval = index.retrieve_sequences(&group, &dest, &NoProgress).unwrap();

        // Only cluster1 is compliant; every identifier resolves.
        assert_eq!(1, retrieval.clusters);
        assert_eq!(4, retrieval.sequences);
        assert_eq!(0, retrieval.missed);
        let text = std::fs::read_to_string(dest.join("cluster1.fas")).unwrap();
        assert!(text.starts_with(">sp1|g1\nMKTEARVL\n"));
        assert!(!dest.join("cluster2.fas").exists());
    }

    #[test]
    fn test_retrieve_counts_missed() {
        let dir = TempDir::new("seqdb").unwrap();
        let db = write_db(&dir);
        let groups_path = dir.path().join("missing.txt");
        let mut file = File::create(&groups_path).unwrap();
        writeln!(file, "cluster1: sp1|g1 sp2|ghost sp3|g4").unwrap();
        let group =
            GroupFile::parse(&groups_path, Some(1), Some(3), &NoProgress).unwrap();
        let index = SeqIndex::open(&db, &dir.path().join("scratch"), &NoProgress).unwrap();
        let dest = dir.path().join("clusters");
        let retrieval = index.retrieve_sequences(&group, &dest, &NoProgress).unwrap();
        assert_eq!(1, retrieval.clusters);
        assert_eq!(2, retrieval.sequences);
        assert_eq!(1, retrieval.missed);
    }
}
