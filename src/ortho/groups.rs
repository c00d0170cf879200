//! Memory-frugal parser for OrthoMCL-style group files.
//!
//! One pass over the file keeps only the per-cluster species frequency
//! maps; the raw cluster text is never held in memory. Passes that need
//! tokens re-open the file and advance line by line in lockstep with the
//! stored maps.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};

use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::files;
use crate::helper::progress::ProgressSink;
use crate::ortho::cluster::{compliance, is_all_compliant};
use crate::ortho::{ClusterSource, ClusterSummary, token_taxon};

/// Snapshot of the compliance counters of one group file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub clusters: usize,
    pub total_seqs: usize,
    pub max_extra_copy: usize,
    pub num_gene_compliant: usize,
    pub num_species_compliant: usize,
    pub all_compliant: usize,
}

/// One parsed group file with its thresholds and counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupFile {
    pub path: PathBuf,
    pub name: String,
    pub gene_threshold: Option<usize>,
    pub species_threshold: Option<usize>,
    /// Distinct species in insertion order.
    pub species_list: Vec<String>,
    /// Per-cluster species frequencies aligned with the file order.
    pub species_frequency: Vec<HashMap<String, usize>>,
    pub total_seqs: usize,
    pub max_extra_copy: usize,
    pub num_gene_compliant: usize,
    pub num_species_compliant: usize,
    pub all_compliant: usize,
    pub excluded_taxa: Vec<String>,
}

impl GroupFile {
    /// Parse a group file in one streaming pass.
    ///
    /// When both thresholds are given the compliance counters are
    /// populated during the same pass.
    pub fn parse(
        path: &Path,
        gene_threshold: Option<usize>,
        species_threshold: Option<usize>,
        progress: &dyn ProgressSink,
    ) -> SeqResult<Self> {
        let mut group = Self {
            path: path.to_path_buf(),
            name: files::file_stem(path),
            gene_threshold,
            species_threshold,
            species_list: Vec::new(),
            species_frequency: Vec::new(),
            total_seqs: 0,
            max_extra_copy: 0,
            num_gene_compliant: 0,
            num_species_compliant: 0,
            all_compliant: 0,
            excluded_taxa: Vec::new(),
        };
        progress.set_stage("Parsing ortholog groups...");
        let reader = open_lines(path)?;
        for (idx, line) in reader.enumerate() {
            if progress.cancelled() {
                return Err(SeqError::Cancelled);
            }
            let line = line.map_err(|err| SeqError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: err.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            group.parse_cluster(&line, idx + 1)?;
            progress.set_progress(group.species_frequency.len());
        }
        Ok(group)
    }

    fn parse_cluster(&mut self, line: &str, lnum: usize) -> SeqResult<()> {
        let (_, field) = line.split_once(':').ok_or_else(|| SeqError::Parse {
            path: self.path.clone(),
            line: lnum,
            reason: format!("missing `:` separator in cluster line: {}", line),
        })?;
        let mut freq: HashMap<String, usize> = HashMap::new();
        let mut tokens = 0;
        for token in field.split_whitespace() {
            tokens += 1;
            let taxon = token_taxon(token);
            *freq.entry(String::from(taxon)).or_insert(0) += 1;
        }
        self.total_seqs += tokens;
        let extra_copies = freq.values().copied().max().unwrap_or(0);
        self.max_extra_copy = self.max_extra_copy.max(extra_copies);
        for taxon in freq.keys() {
            if !self.species_list.contains(taxon) {
                self.species_list.push(taxon.clone());
            }
        }
        if self.gene_threshold.is_some() && self.species_threshold.is_some() {
            self.count_compliance(&freq);
        }
        self.species_frequency.push(freq);
        Ok(())
    }

    /// Number of clusters in the file.
    pub fn len(&self) -> usize {
        self.species_frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species_frequency.is_empty()
    }

    /// Remove taxa from every cluster map and recompute the counters.
    pub fn exclude_taxa(&mut self, taxa: &[String]) {
        let new_taxa: Vec<String> = taxa
            .iter()
            .filter(|taxon| !self.excluded_taxa.contains(*taxon))
            .cloned()
            .collect();
        self.excluded_taxa.extend(new_taxa);
        for freq in self.species_frequency.iter_mut() {
            for taxon in taxa {
                freq.remove(taxon);
            }
        }
        self.species_list.retain(|taxon| !taxa.contains(taxon));
        self.recompute_stats();
    }

    /// Replace the thresholds, optionally re-sweeping the counters.
    pub fn update_filters(
        &mut self,
        gene_threshold: Option<usize>,
        species_threshold: Option<usize>,
        recompute: bool,
    ) {
        self.gene_threshold = gene_threshold;
        self.species_threshold = species_threshold;
        if recompute {
            self.recompute_stats();
        }
    }

    /// Recompute every counter from the stored cluster maps. After any
    /// mutation the counters equal those of a full re-sweep.
    pub fn recompute_stats(&mut self) {
        self.num_gene_compliant = 0;
        self.num_species_compliant = 0;
        self.all_compliant = 0;
        self.max_extra_copy = 0;
        let freqs = std::mem::take(&mut self.species_frequency);
        for freq in &freqs {
            let extra_copies = freq.values().copied().max().unwrap_or(0);
            self.max_extra_copy = self.max_extra_copy.max(extra_copies);
            self.count_compliance(freq);
        }
        self.species_frequency = freqs;
    }

    pub fn stats(&self) -> GroupStats {
        GroupStats {
            clusters: self.len(),
            total_seqs: self.total_seqs,
            max_extra_copy: self.max_extra_copy,
            num_gene_compliant: self.num_gene_compliant,
            num_species_compliant: self.num_species_compliant,
            all_compliant: self.all_compliant,
        }
    }

    /// Compliance of one stored cluster map against the thresholds.
    pub fn cluster_compliance(&self, freq: &HashMap<String, usize>) -> (Option<bool>, Option<bool>) {
        compliance(freq, self.gene_threshold, self.species_threshold)
    }

    /// Write the compliant raw cluster lines into a new groups file.
    pub fn export_filtered(&self, output: &Path) -> SeqResult<PathBuf> {
        use std::io::Write;
        let out_path = output.to_path_buf();
        let file = File::create(&out_path).map_err(|err| SeqError::Parse {
            path: out_path.clone(),
            line: 0,
            reason: err.to_string(),
        })?;
        let mut writer = std::io::BufWriter::new(file);
        for entry in self.lockstep()? {
            let (line, freq) = entry?;
            let (gene, species) = self.cluster_compliance(&freq);
            if is_all_compliant(gene, species) {
                writeln!(writer, "{}", line).map_err(|err| SeqError::Parse {
                    path: out_path.clone(),
                    line: 0,
                    reason: err.to_string(),
                })?;
            }
        }
        Ok(out_path)
    }

    /// Cluster counts keyed by species number, for distribution plots.
    pub fn species_distribution(&self, compliant_only: bool) -> BTreeMap<usize, usize> {
        let mut distribution = BTreeMap::new();
        for freq in self.iter_counted(compliant_only) {
            *distribution.entry(freq.len()).or_insert(0) += 1;
        }
        distribution
    }

    /// Cluster counts keyed by maximum gene copy number.
    pub fn genecopy_distribution(&self, compliant_only: bool) -> BTreeMap<usize, usize> {
        let mut distribution = BTreeMap::new();
        for freq in self.iter_counted(compliant_only) {
            let copies = freq.values().copied().max().unwrap_or(0);
            *distribution.entry(copies).or_insert(0) += 1;
        }
        distribution
    }

    fn iter_counted(&self, compliant_only: bool) -> impl Iterator<Item = &HashMap<String, usize>> {
        self.species_frequency.iter().filter(move |freq| {
            if freq.is_empty() {
                return false;
            }
            if !compliant_only {
                return true;
            }
            let (gene, species) = self.cluster_compliance(freq);
            is_all_compliant(gene, species)
        })
    }

    fn count_compliance(&mut self, freq: &HashMap<String, usize>) {
        let (gene, species) = self.cluster_compliance(freq);
        if gene == Some(true) {
            self.num_gene_compliant += 1;
        }
        if species == Some(true) {
            self.num_species_compliant += 1;
        }
        if is_all_compliant(gene, species) {
            self.all_compliant += 1;
        }
    }

    // Re-read the file, yielding each raw cluster line with its stored
    // frequency map.
    fn lockstep(&self) -> SeqResult<LockstepIter<'_>> {
        let lines = open_lines(&self.path)?;
        Ok(LockstepIter {
            lines,
            freqs: self.species_frequency.iter(),
            path: self.path.clone(),
            lnum: 0,
        })
    }
}

impl ClusterSource for GroupFile {
    fn iter_clusters(&self) -> SeqResult<Box<dyn Iterator<Item = SeqResult<ClusterSummary>> + '_>> {
        let lockstep = self.lockstep()?;
        let excluded = self.excluded_taxa.clone();
        Ok(Box::new(lockstep.map(move |entry| {
            entry.map(|(line, freq)| {
                let (name, field) = line.split_once(':').unwrap_or((line.as_str(), ""));
                let sequences = field
                    .split_whitespace()
                    .filter(|token| {
                        !excluded.iter().any(|taxon| taxon == token_taxon(token))
                    })
                    .map(String::from)
                    .collect();
                ClusterSummary {
                    name: String::from(name.trim()),
                    sequences,
                    species_frequency: freq,
                }
            })
        })))
    }
}

struct LockstepIter<'a> {
    lines: Lines<BufReader<File>>,
    freqs: std::slice::Iter<'a, HashMap<String, usize>>,
    path: PathBuf,
    lnum: usize,
}

impl Iterator for LockstepIter<'_> {
    type Item = SeqResult<(String, HashMap<String, usize>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.lnum += 1;
            match self.lines.next()? {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let freq = self.freqs.next()?;
                    return Some(Ok((line, freq.clone())));
                }
                Err(err) => {
                    return Some(Err(SeqError::Parse {
                        path: self.path.clone(),
                        line: self.lnum,
                        reason: err.to_string(),
                    }));
                }
            }
        }
    }
}

fn open_lines(path: &Path) -> SeqResult<Lines<BufReader<File>>> {
    let file = File::open(path).map_err(|err| SeqError::Parse {
        path: path.to_path_buf(),
        line: 0,
        reason: err.to_string(),
    })?;
    Ok(BufReader::new(file).lines())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helper::progress::NoProgress;
    use std::io::Write;
    use tempdir::TempDir;

    fn write_groups(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("groups.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "cluster1: sp1|g1 sp1|g2 sp2|g3 sp3|g4").unwrap();
        writeln!(file, "cluster2: sp1|g5 sp2|g6").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "cluster3: sp1|g7 sp1|g8 sp1|g9").unwrap();
        path
    }

    #[test]
    fn test_parse_groups() {
        let dir = TempDir::new("groups").unwrap();
        let path = write_groups(&dir);
        let group = GroupFile::parse(&path, Some(2), Some(3), &NoProgress).unwrap();
        assert_eq!(3, group.len());
        assert_eq!(9, group.total_seqs);
        assert_eq!(3, group.max_extra_copy);
        assert_eq!(vec!["sp1", "sp2", "sp3"], group.species_list);
        // cluster1 passes both; cluster2 passes gene only; cluster3 fails
        // both.
        assert_eq!(2, group.num_gene_compliant);
        assert_eq!(1, group.num_species_compliant);
        assert_eq!(1, group.all_compliant);
    }

    #[test]
    fn test_parse_without_thresholds() {
        let dir = TempDir::new("groups").unwrap();
        let path = write_groups(&dir);
        let group = GroupFile::parse(&path, None, None, &NoProgress).unwrap();
        assert_eq!(0, group.all_compliant);
        assert_eq!(3, group.len());
    }

    #[test]
    fn test_exclude_taxa_recomputes() {
        let dir = TempDir::new("groups").unwrap();
        let path = write_groups(&dir);
        let mut group = GroupFile::parse(&path, Some(2), Some(3), &NoProgress).unwrap();
        group.exclude_taxa(&[String::from("sp3")]);
        assert_eq!(vec!["sp1", "sp2"], group.species_list);
        // cluster1 drops to two species and is no longer species
        // compliant.
        assert_eq!(0, group.num_species_compliant);
        assert_eq!(0, group.all_compliant);
        assert_eq!(2, group.num_gene_compliant);

        // Counters must match a full re-sweep after the mutation.
        let counters = (
            group.num_gene_compliant,
            group.num_species_compliant,
            group.all_compliant,
        );
        group.recompute_stats();
        assert_eq!(
            counters,
            (
                group.num_gene_compliant,
                group.num_species_compliant,
                group.all_compliant
            )
        );
    }

    #[test]
    fn test_update_filters() {
        let dir = TempDir::new("groups").unwrap();
        let path = write_groups(&dir);
        let mut group = GroupFile::parse(&path, Some(2), Some(3), &NoProgress).unwrap();
        group.update_filters(Some(3), Some(2), true);
        // cluster1, cluster2 pass both; cluster3 is single species.
        assert_eq!(3, group.num_gene_compliant);
        assert_eq!(2, group.num_species_compliant);
        assert_eq!(2, group.all_compliant);
    }

    #[test]
    fn test_streaming_lockstep() {
        let dir = TempDir::new("groups").unwrap();
        let path = write_groups(&dir);
        let group = GroupFile::parse(&path, Some(2), Some(3), &NoProgress).unwrap();
        let summaries: Vec<ClusterSummary> = group
            .iter_clusters()
            .unwrap()
            .collect::<SeqResult<Vec<_>>>()
            .unwrap();
        assert_eq!(3, summaries.len());
        assert_eq!("cluster1", summaries[0].name);
        assert_eq!(4, summaries[0].sequences.len());
        assert_eq!(
            summaries[0].species_frequency,
            group.species_frequency[0]
        );
    }

    #[test]
    fn test_export_filtered() {
        let dir = TempDir::new("groups").unwrap();
        let path = write_groups(&dir);
        let group = GroupFile::parse(&path, Some(2), Some(3), &NoProgress).unwrap();
        let output = dir.path().join("filtered.txt");
        group.export_filtered(&output).unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!("cluster1: sp1|g1 sp1|g2 sp2|g3 sp3|g4\n", text);
    }

    #[test]
    fn test_distributions() {
        let dir = TempDir::new("groups").unwrap();
        let path = write_groups(&dir);
        let group = GroupFile::parse(&path, Some(2), Some(3), &NoProgress).unwrap();
        let species = group.species_distribution(false);
        assert_eq!(Some(&1), species.get(&1));
        assert_eq!(Some(&1), species.get(&2));
        assert_eq!(Some(&1), species.get(&3));
        let copies = group.genecopy_distribution(false);
        assert_eq!(Some(&1), copies.get(&1));
        assert_eq!(Some(&1), copies.get(&2));
        assert_eq!(Some(&1), copies.get(&3));
        let filtered = group.genecopy_distribution(true);
        assert_eq!(1, filtered.values().sum::<usize>());
    }
}
