//! # Utilities for sequence alignment and ortholog cluster processing
//! Seqfuse provides fast and memory efficient utilities for multiple sequence
//! alignment manipulation and OrthoMCL-style ortholog cluster handling.
//!
//! ## Features:
//! 1. Alignment parsing: FASTA, PHYLIP, NEXUS, and pyRAD loci formats
//! 2. Alignment concatenation and reverse concatenation with partition bookkeeping
//! 3. Column and row filtering: missing data, taxa, codon positions, minimum occupancy
//! 4. Haplotype collapsing and binary indel coding
//! 5. Alignment summary statistics
//! 6. Streaming ortholog group parsing and threshold filtering
//! 7. Protein database indexing and per-cluster sequence retrieval
//! 8. Output writers: FASTA, PHYLIP, NEXUS, MCMCTree, and IMa2
//!
//! ## Example
//!
//! ### Parse a fasta alignment and write it as phylip
//! ```rust, ignore
//! use std::path::Path;
//! use seqfuse::helper::alignment::Alignment;
//! use seqfuse::helper::types::{DataType, InputFmt, OutputFmt, WriteOpts};
//! use seqfuse::writer::sequences::SeqWriter;
//!
//! let input = Path::new("tests/files/simple.fas");
//! let aln = Alignment::from_file(input, &InputFmt::Fasta, &DataType::Dna).unwrap();
//! let writer = SeqWriter::new(Path::new("alignment.phy"), &aln, WriteOpts::default());
//! writer.write(&OutputFmt::Phylip).unwrap()
//! ```
pub mod handler;
pub mod helper;
pub mod ortho;
pub mod parser;
pub mod stats;
pub mod writer;
