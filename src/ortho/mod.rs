//! Ortholog cluster engine: group file parsing, threshold filtering,
//! and sequence database joins.
//!
//! Two cluster sources share one capability: the eager [`cluster::Cluster`]
//! list holds every token in memory, while the streaming
//! [`groups::GroupFile`] keeps only per-cluster species frequencies and
//! re-reads the file when raw tokens are needed.
pub mod cluster;
pub mod groups;
pub mod multigroups;
pub mod seqdb;

use ahash::AHashMap as HashMap;

use crate::helper::errors::SeqResult;

/// One cluster as seen by downstream consumers.
#[derive(Debug, Clone)]
pub struct ClusterSummary {
    pub name: String,
    /// `TAXON|gene` identifiers in file order, excluded taxa dropped.
    pub sequences: Vec<String>,
    pub species_frequency: HashMap<String, usize>,
}

/// A source of clusters, eager or streaming.
pub trait ClusterSource {
    fn iter_clusters(&self) -> SeqResult<Box<dyn Iterator<Item = SeqResult<ClusterSummary>> + '_>>;
}

/// Taxon identifier of a `TAXON|gene` token: everything before the first
/// pipe.
pub(crate) fn token_taxon(token: &str) -> &str {
    token.split('|').next().unwrap_or(token)
}
