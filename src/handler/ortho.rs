//! Orchestrate ortholog group filtering and sequence retrieval.
use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::helper::logger::GroupLogger;
use crate::helper::progress::ProgressSink;
use crate::helper::utils;
use crate::ortho::groups::GroupFile;
use crate::ortho::seqdb::{Retrieval, SeqIndex};

pub struct OrthoHandler<'a> {
    groups_path: &'a Path,
    gene_threshold: Option<usize>,
    species_threshold: Option<usize>,
}

impl<'a> OrthoHandler<'a> {
    pub fn new(
        groups_path: &'a Path,
        gene_threshold: Option<usize>,
        species_threshold: Option<usize>,
    ) -> Self {
        Self {
            groups_path,
            gene_threshold,
            species_threshold,
        }
    }

    /// Parse the groups file and log its statistics.
    pub fn parse(&self, progress: &dyn ProgressSink) -> Result<GroupFile> {
        let group = GroupFile::parse(
            self.groups_path,
            self.gene_threshold,
            self.species_threshold,
            progress,
        )?;
        GroupLogger::new(self.groups_path, group.len()).log("Parsing ortholog groups");
        self.print_stats(&group);
        Ok(group)
    }

    /// Join a parsed group file against a protein database, emitting one
    /// fasta file per compliant cluster.
    pub fn retrieve_sequences(
        &self,
        group: &GroupFile,
        protein_db: &Path,
        scratch_dir: &Path,
        dest: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<Retrieval> {
        let index = SeqIndex::open(protein_db, scratch_dir, progress)?;
        let retrieval = index.retrieve_sequences(group, dest, progress)?;
        log::info!("{}", "Output".yellow());
        log::info!(
            "{:18}: {}",
            "Cluster files",
            utils::fmt_num(&retrieval.clusters)
        );
        log::info!(
            "{:18}: {}",
            "Sequences",
            utils::fmt_num(&retrieval.sequences)
        );
        log::info!("{:18}: {}", "Missed", utils::fmt_num(&retrieval.missed));
        log::info!("{:18}: {}\n", "Dir", dest.display());
        Ok(retrieval)
    }

    fn print_stats(&self, group: &GroupFile) {
        let stats = group.stats();
        log::info!("{}", "Groups".yellow());
        log::info!("{:18}: {}", "Clusters", utils::fmt_num(&stats.clusters));
        log::info!("{:18}: {}", "Sequences", utils::fmt_num(&stats.total_seqs));
        log::info!(
            "{:18}: {}",
            "Max extra copies",
            utils::fmt_num(&stats.max_extra_copy)
        );
        if self.gene_threshold.is_some() && self.species_threshold.is_some() {
            log::info!(
                "{:18}: {}",
                "Gene compliant",
                utils::fmt_num(&stats.num_gene_compliant)
            );
            log::info!(
                "{:18}: {}",
                "Species compliant",
                utils::fmt_num(&stats.num_species_compliant)
            );
            log::info!(
                "{:18}: {}\n",
                "Fully compliant",
                utils::fmt_num(&stats.all_compliant)
            );
        }
    }
}
