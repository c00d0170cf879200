//! In-memory ortholog clusters and the compliance predicates.
use ahash::AHashMap as HashMap;

use crate::helper::errors::{SeqError, SeqResult};
use crate::ortho::{ClusterSource, ClusterSummary, token_taxon};

/// Evaluate the compliance predicates over a species frequency map.
///
/// Returns `(gene_compliant, species_compliant)`; a side is `None` when
/// its threshold is unset. An empty map complies with nothing.
pub fn compliance(
    freq: &HashMap<String, usize>,
    gene_threshold: Option<usize>,
    species_threshold: Option<usize>,
) -> (Option<bool>, Option<bool>) {
    if freq.is_empty() {
        return (gene_threshold.map(|_| false), species_threshold.map(|_| false));
    }
    let max_copy = freq.values().copied().max().unwrap_or(0);
    let gene = gene_threshold.map(|threshold| max_copy <= threshold);
    let species = species_threshold.map(|threshold| freq.len() >= threshold);
    (gene, species)
}

/// True when both predicates evaluated and passed.
pub fn is_all_compliant(gene: Option<bool>, species: Option<bool>) -> bool {
    gene == Some(true) && species == Some(true)
}

/// One ortholog cluster held fully in memory.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub name: String,
    /// `TAXON|gene` identifiers in file order.
    pub sequences: Vec<String>,
    pub species_frequency: HashMap<String, usize>,
    pub gene_compliant: Option<bool>,
    pub species_compliant: Option<bool>,
}

impl Cluster {
    /// Parse one `NAME: tok tok ...` line.
    pub fn from_line(line: &str, lnum: usize) -> SeqResult<Self> {
        let (name, field) = line.split_once(':').ok_or_else(|| SeqError::Parse {
            path: Default::default(),
            line: lnum,
            reason: format!("missing `:` separator in cluster line: {}", line),
        })?;
        let sequences: Vec<String> = field.split_whitespace().map(String::from).collect();
        let mut species_frequency: HashMap<String, usize> = HashMap::new();
        sequences.iter().for_each(|token| {
            *species_frequency
                .entry(String::from(token_taxon(token)))
                .or_insert(0) += 1;
        });
        Ok(Self {
            name: String::from(name.trim()),
            sequences,
            species_frequency,
            gene_compliant: None,
            species_compliant: None,
        })
    }

    /// Drop the listed taxa from the cluster.
    pub fn remove_taxa(&mut self, taxa: &[String]) {
        self.sequences
            .retain(|token| !taxa.iter().any(|taxon| taxon == token_taxon(token)));
        taxa.iter().for_each(|taxon| {
            self.species_frequency.remove(taxon);
        });
    }

    /// Re-evaluate the compliance predicates.
    pub fn apply_filter(&mut self, gene_threshold: Option<usize>, species_threshold: Option<usize>) {
        let (gene, species) = compliance(&self.species_frequency, gene_threshold, species_threshold);
        self.gene_compliant = gene;
        self.species_compliant = species;
    }

    pub fn is_all_compliant(&self) -> bool {
        is_all_compliant(self.gene_compliant, self.species_compliant)
    }
}

/// Eagerly parsed cluster list; the strict-mode counterpart of the
/// streaming group file.
#[derive(Debug, Default, Clone)]
pub struct ClusterList {
    pub clusters: Vec<Cluster>,
}

impl ClusterList {
    pub fn from_lines<I>(lines: I) -> SeqResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut clusters = Vec::new();
        for (idx, line) in lines.into_iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            clusters.push(Cluster::from_line(&line, idx + 1)?);
        }
        Ok(Self { clusters })
    }
}

impl ClusterSource for ClusterList {
    fn iter_clusters(&self) -> SeqResult<Box<dyn Iterator<Item = SeqResult<ClusterSummary>> + '_>> {
        Ok(Box::new(self.clusters.iter().map(|cluster| {
            Ok(ClusterSummary {
                name: cluster.name.clone(),
                sequences: cluster.sequences.clone(),
                species_frequency: cluster.species_frequency.clone(),
            })
        })))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn spec_cluster() -> Cluster {
        Cluster::from_line("cluster1: sp1|g1 sp1|g2 sp2|g3 sp3|g4", 1).unwrap()
    }

    #[test]
    fn test_parse_cluster_line() {
        let cluster = spec_cluster();
        assert_eq!("cluster1", cluster.name);
        assert_eq!(4, cluster.sequences.len());
        assert_eq!(Some(&2), cluster.species_frequency.get("sp1"));
        assert_eq!(Some(&1), cluster.species_frequency.get("sp2"));
        assert_eq!(Some(&1), cluster.species_frequency.get("sp3"));
    }

    #[test]
    fn test_compliance_spec_case() {
        let mut cluster = spec_cluster();
        cluster.apply_filter(Some(2), Some(3));
        assert_eq!(Some(true), cluster.gene_compliant);
        assert_eq!(Some(true), cluster.species_compliant);
        assert!(cluster.is_all_compliant());
    }

    #[test]
    fn test_compliance_fails_gene() {
        let mut cluster = spec_cluster();
        cluster.apply_filter(Some(1), Some(3));
        assert_eq!(Some(false), cluster.gene_compliant);
        assert_eq!(Some(true), cluster.species_compliant);
        assert!(!cluster.is_all_compliant());
    }

    #[test]
    fn test_compliance_unset_thresholds() {
        let mut cluster = spec_cluster();
        cluster.apply_filter(None, Some(2));
        assert_eq!(None, cluster.gene_compliant);
        assert_eq!(Some(true), cluster.species_compliant);
        assert!(!cluster.is_all_compliant());
    }

    #[test]
    fn test_remove_taxa() {
        let mut cluster = spec_cluster();
        cluster.remove_taxa(&[String::from("sp1")]);
        assert_eq!(2, cluster.sequences.len());
        assert!(!cluster.species_frequency.contains_key("sp1"));
    }

    #[test]
    fn test_cluster_list_source() {
        let lines = vec![
            String::from("c1: sp1|g1 sp2|g2"),
            String::new(),
            String::from("c2: sp1|g3"),
        ];
        let list = ClusterList::from_lines(lines).unwrap();
        let summaries: Vec<ClusterSummary> = list
            .iter_clusters()
            .unwrap()
            .collect::<SeqResult<Vec<_>>>()
            .unwrap();
        assert_eq!(2, summaries.len());
        assert_eq!("c1", summaries[0].name);
    }
}
