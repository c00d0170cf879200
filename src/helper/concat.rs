//! Concatenate multiple alignments into a single alignment.
use indexmap::{IndexMap, IndexSet};

use crate::helper::alignment::Alignment;
use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::partition::PartitionModel;
use crate::helper::progress::ProgressSink;
use crate::helper::types::{DataType, SeqMatrix};

/// Name given to the concatenated alignment.
pub const CONCAT_NAME: &str = "concatenated";

/// Concatenate alignments over a shared taxa universe.
///
/// Every taxon contributes its sequence verbatim to each alignment it is
/// present in; absent taxa are padded with that alignment's missing
/// symbol. Partitions are appended in alignment iteration order, so the
/// partition cursor ends at the concatenated length.
pub struct Concat<'a> {
    alignments: &'a IndexMap<String, Alignment>,
    taxa: &'a IndexSet<String>,
    datatype: DataType,
}

impl<'a> Concat<'a> {
    pub fn new(
        alignments: &'a IndexMap<String, Alignment>,
        taxa: &'a IndexSet<String>,
        datatype: DataType,
    ) -> Self {
        Self {
            alignments,
            taxa,
            datatype,
        }
    }

    pub fn concat(&self, progress: &dyn ProgressSink) -> SeqResult<Alignment> {
        progress.set_stage("Concatenating alignments...");
        progress.set_total(self.alignments.len());
        let mut matrix: SeqMatrix = self
            .taxa
            .iter()
            .map(|taxon| (taxon.clone(), String::new()))
            .collect();
        let mut partitions = PartitionModel::new();
        for (done, (name, aln)) in self.alignments.iter().enumerate() {
            if progress.cancelled() {
                return Err(SeqError::Cancelled);
            }
            partitions.add_by_length(name, aln.locus_length, aln.path.as_deref())?;
            let missing = aln.datatype.missing().to_string().repeat(aln.locus_length);
            for (taxon, buffer) in matrix.iter_mut() {
                match aln.matrix.get(taxon) {
                    Some(seq) => buffer.push_str(seq),
                    None => buffer.push_str(&missing),
                }
            }
            progress.set_progress(done + 1);
        }
        Alignment::from_matrix(CONCAT_NAME, matrix, self.datatype, partitions)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helper::progress::NoProgress;

    fn alignment(name: &str, rows: &[(&str, &str)]) -> Alignment {
        let matrix: SeqMatrix = rows
            .iter()
            .map(|(id, seq)| (String::from(*id), String::from(*seq)))
            .collect();
        Alignment::from_matrix(name, matrix, DataType::Dna, PartitionModel::new()).unwrap()
    }

    #[test]
    fn test_concat_spec_case() {
        let mut alignments = IndexMap::new();
        alignments.insert(
            String::from("x"),
            alignment("x", &[("a", "aa"), ("b", "aa")]),
        );
        alignments.insert(
            String::from("y"),
            alignment("y", &[("a", "tt"), ("c", "tt")]),
        );
        let mut taxa = IndexSet::new();
        taxa.insert(String::from("a"));
        taxa.insert(String::from("b"));
        taxa.insert(String::from("c"));

        let concat = Concat::new(&alignments, &taxa, DataType::Dna);
        let aln = concat.concat(&NoProgress).unwrap();

        assert_eq!(Some(&String::from("aatt")), aln.matrix.get("a"));
        assert_eq!(Some(&String::from("aann")), aln.matrix.get("b"));
        assert_eq!(Some(&String::from("nntt")), aln.matrix.get("c"));
        assert_eq!(4, aln.locus_length);

        let x = aln.partitions.get("x").unwrap();
        assert_eq!((0, 1), (x.start, x.end));
        let y = aln.partitions.get("y").unwrap();
        assert_eq!((2, 3), (y.start, y.end));
        assert_eq!(4, aln.partitions.counter());
    }

    #[test]
    fn test_concat_row_order() {
        let mut alignments = IndexMap::new();
        alignments.insert(
            String::from("x"),
            alignment("x", &[("b", "cc"), ("a", "gg")]),
        );
        let mut taxa = IndexSet::new();
        taxa.insert(String::from("a"));
        taxa.insert(String::from("b"));

        let concat = Concat::new(&alignments, &taxa, DataType::Dna);
        let aln = concat.concat(&NoProgress).unwrap();
        let rows: Vec<&String> = aln.matrix.keys().collect();
        assert_eq!(vec!["a", "b"], rows);
    }
}
