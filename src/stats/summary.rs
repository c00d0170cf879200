//! Cross-alignment statistics for the plotting adapter.
//!
//! Every producer returns a [`PlotData`] payload: the numeric series plus
//! the labels, legend, and table header the host plotting layer renders.
//! The core promises these shapes but never renders them.
use indexmap::IndexMap;
use serde::Serialize;

use crate::helper::set::AlignmentSet;
use crate::helper::types::DataType;
use crate::stats::sequence;

/// Payload handed to the external plotting adapter.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PlotData {
    /// One inner vector per series.
    pub data: Vec<Vec<f64>>,
    pub labels: Vec<String>,
    pub legend: Vec<String>,
    pub title: String,
    /// X and y axis names.
    pub ax_names: (Option<String>, Option<String>),
    pub table_header: Vec<String>,
    /// Divide counts by this factor when rendering proportions.
    pub normalize_factor: Option<usize>,
}

pub struct SummaryStats<'a> {
    set: &'a AlignmentSet,
}

impl<'a> SummaryStats<'a> {
    pub fn new(set: &'a AlignmentSet) -> Self {
        Self { set }
    }

    /// Presence/absence matrix: one row per taxon, one column per
    /// alignment.
    pub fn gene_occupancy(&self) -> PlotData {
        let taxa = self.set.taxa_names();
        let mut data: Vec<Vec<f64>> = taxa.iter().map(|_| Vec::new()).collect();
        for aln in self.set.alignments() {
            for (row, taxon) in taxa.iter().enumerate() {
                let present = if aln.matrix.contains_key(taxon) {
                    1.0
                } else {
                    0.0
                };
                data[row].push(present);
            }
        }
        PlotData {
            data,
            labels: taxa.iter().cloned().collect(),
            title: String::from("Gene occupancy"),
            ..Default::default()
        }
    }

    /// Stacked gap/missing/data counts per taxon, sorted by
    /// missingness.
    pub fn missing_data_per_species(&self) -> PlotData {
        let mut storage: IndexMap<String, [f64; 3]> = self
            .set
            .taxa_names()
            .iter()
            .map(|taxon| (taxon.clone(), [0.0, 0.0, 0.0]))
            .collect();
        let mut total_len = 0;
        for aln in self.set.alignments() {
            total_len += aln.locus_length;
            let missing = aln.datatype.missing();
            for (taxon, counts) in storage.iter_mut() {
                match aln.matrix.get(taxon) {
                    Some(seq) => {
                        let (gaps, missings) = sequence::count_gaps_missing(seq, missing);
                        counts[0] += gaps as f64;
                        counts[1] += missings as f64;
                        counts[2] += (aln.locus_length - gaps - missings) as f64;
                    }
                    None => counts[1] += aln.locus_length as f64,
                }
            }
        }
        storage.sort_by(|_, a, _, b| {
            (b[0] + b[1])
                .partial_cmp(&(a[0] + a[1]))
                .expect("Missing data counts are finite")
        });
        let data = (0..3)
            .map(|idx| storage.values().map(|counts| counts[idx]).collect())
            .collect();
        PlotData {
            data,
            labels: storage.keys().cloned().collect(),
            legend: vec![
                String::from("Gaps"),
                String::from("Missing"),
                String::from("Data"),
            ],
            title: String::from("Missing data distribution"),
            table_header: ["Taxon", "Gaps", "%", "Missing", "%", "Data", "%"]
                .iter()
                .map(|header| String::from(*header))
                .collect(),
            normalize_factor: Some(total_len),
            ..Default::default()
        }
    }

    /// Number of alignments missing each taxon, sorted descending.
    pub fn missing_genes_per_species(&self) -> PlotData {
        let mut storage: IndexMap<String, usize> = self
            .set
            .taxa_names()
            .iter()
            .map(|taxon| (taxon.clone(), 0))
            .collect();
        for aln in self.set.alignments() {
            for (taxon, count) in storage.iter_mut() {
                if !aln.matrix.contains_key(taxon) {
                    *count += 1;
                }
            }
        }
        storage.sort_by(|_, a, _, b| b.cmp(a));
        PlotData {
            data: vec![storage.values().map(|count| *count as f64).collect()],
            labels: storage.keys().cloned().collect(),
            title: String::from("Distribution of missing genes per species"),
            ax_names: (None, Some(String::from("Frequency"))),
            table_header: vec![String::from("Taxon"), String::from("Missing genes")],
            ..Default::default()
        }
    }

    /// Histogram data of missing taxa counts per alignment.
    pub fn missing_genes_average(&self) -> PlotData {
        let universe = self.set.taxa_names().len();
        let data: Vec<f64> = self
            .set
            .alignments()
            .map(|aln| (universe - aln.ntax()) as f64)
            .collect();
        PlotData {
            data: vec![data],
            title: String::from("Distribution of missing genes"),
            ax_names: (
                Some(String::from("Number of missing genes")),
                Some(String::from("Frequency")),
            ),
            table_header: vec![
                String::from("Number of missing genes"),
                String::from("Frequency"),
            ],
            ..Default::default()
        }
    }

    /// Ungapped sequence sizes per taxon, sorted by mean size.
    pub fn average_seqsize_per_species(&self) -> PlotData {
        let mut storage: IndexMap<String, Vec<f64>> = self
            .set
            .taxa_names()
            .iter()
            .map(|taxon| (taxon.clone(), Vec::new()))
            .collect();
        for aln in self.set.alignments() {
            let missing = aln.datatype.missing();
            for (taxon, seq) in &aln.matrix {
                if let Some(sizes) = storage.get_mut(taxon) {
                    sizes.push(sequence::ungapped_len(seq, missing) as f64);
                }
            }
        }
        storage.sort_by(|_, a, _, b| {
            mean(b)
                .partial_cmp(&mean(a))
                .expect("Sequence sizes are finite")
        });
        PlotData {
            labels: storage.keys().cloned().collect(),
            data: storage.into_values().collect(),
            title: String::from("Sequence size distribution per species"),
            ax_names: (None, Some(self.size_axis())),
            ..Default::default()
        }
    }

    /// Alignment length distribution over the whole set.
    pub fn average_seqsize(&self) -> PlotData {
        let data: Vec<f64> = self
            .set
            .alignments()
            .map(|aln| aln.locus_length as f64)
            .collect();
        PlotData {
            data: vec![data],
            title: String::from("Average sequence size distribution"),
            ax_names: (Some(self.size_axis()), Some(String::from("Frequency"))),
            table_header: vec![self.size_axis(), String::from("Frequency")],
            ..Default::default()
        }
    }

    /// Residue proportions over the data set.
    pub fn character_proportion(&self) -> PlotData {
        let datatype = self.set.datatype().unwrap_or(DataType::Dna);
        let valid = sequence::valid_chars(&datatype);
        let mut counts: IndexMap<char, usize> =
            valid.iter().map(|residue| (*residue, 0)).collect();
        for aln in self.set.alignments() {
            for seq in aln.matrix.values() {
                for (residue, count) in sequence::char_counts(seq) {
                    if let Some(total) = counts.get_mut(&residue) {
                        *total += count;
                    }
                }
            }
        }
        let total: usize = counts.values().sum();
        let data: Vec<f64> = counts
            .values()
            .map(|count| {
                if total == 0 {
                    0.0
                } else {
                    *count as f64 / total as f64
                }
            })
            .collect();
        let (title, axis) = self.char_axis(&datatype);
        PlotData {
            data: vec![data],
            labels: counts
                .keys()
                .map(|residue| residue.to_ascii_uppercase().to_string())
                .collect(),
            title,
            ax_names: (Some(axis.clone()), Some(String::from("Proportion"))),
            table_header: vec![axis, String::from("Proportion")],
            ..Default::default()
        }
    }

    /// Residue proportions per taxon: one series per residue.
    pub fn character_proportion_per_species(&self) -> PlotData {
        let datatype = self.set.datatype().unwrap_or(DataType::Dna);
        let valid = sequence::valid_chars(&datatype);
        let taxa = self.set.taxa_names();
        let mut storage: IndexMap<String, IndexMap<char, usize>> = taxa
            .iter()
            .map(|taxon| {
                (
                    taxon.clone(),
                    valid.iter().map(|residue| (*residue, 0)).collect(),
                )
            })
            .collect();
        for aln in self.set.alignments() {
            for (taxon, seq) in &aln.matrix {
                if let Some(counts) = storage.get_mut(taxon) {
                    for (residue, count) in sequence::char_counts(seq) {
                        if let Some(total) = counts.get_mut(&residue) {
                            *total += count;
                        }
                    }
                }
            }
        }
        let mut data: Vec<Vec<f64>> = valid.iter().map(|_| Vec::new()).collect();
        for counts in storage.values() {
            let total: usize = counts.values().sum();
            for (row, residue) in valid.iter().enumerate() {
                let count = counts.get(residue).copied().unwrap_or(0);
                let prop = if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64
                };
                data[row].push(prop);
            }
        }
        let (_, axis) = self.char_axis(&datatype);
        PlotData {
            data,
            labels: storage.keys().cloned().collect(),
            legend: valid
                .iter()
                .map(|residue| residue.to_ascii_uppercase().to_string())
                .collect(),
            title: String::from("Character proportions per species"),
            ax_names: (Some(String::from("Taxa")), Some(axis)),
            ..Default::default()
        }
    }

    fn size_axis(&self) -> String {
        match self.set.datatype() {
            Some(DataType::Aa) => String::from("Size (residues)"),
            _ => String::from("Size (bp)"),
        }
    }

    fn char_axis(&self, datatype: &DataType) -> (String, String) {
        match datatype {
            DataType::Dna => (
                String::from("Nucleotide proportions"),
                String::from("Nucleotide"),
            ),
            DataType::Aa => (
                String::from("Amino acid proportions"),
                String::from("Amino acid"),
            ),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helper::set::set_from_matrices;
    use assert_approx_eq::assert_approx_eq;
    use indexmap::indexmap;

    fn sample_set() -> AlignmentSet {
        set_from_matrices(
            vec![
                (
                    String::from("x"),
                    indexmap! {
                        String::from("a") => String::from("ac-t"),
                        String::from("b") => String::from("acnn"),
                    },
                ),
                (
                    String::from("y"),
                    indexmap! {
                        String::from("a") => String::from("gg"),
                    },
                ),
            ],
            DataType::Dna,
        )
        .unwrap()
    }

    #[test]
    fn test_gene_occupancy() {
        let set = sample_set();
        let plot = SummaryStats::new(&set).gene_occupancy();
        assert_eq!(vec![1.0, 1.0], plot.data[0]);
        assert_eq!(vec![1.0, 0.0], plot.data[1]);
        assert_eq!(vec!["a", "b"], plot.labels);
    }

    #[test]
    fn test_missing_data_per_species() {
        let set = sample_set();
        let plot = SummaryStats::new(&set).missing_data_per_species();
        // Taxon b carries the most gaps+missing and sorts first.
        assert_eq!("b", plot.labels[0]);
        // b: no gaps, 2 missing in x plus 2 for the absent y.
        assert_eq!(0.0, plot.data[0][0]);
        assert_eq!(4.0, plot.data[1][0]);
        assert_eq!(2.0, plot.data[2][0]);
        assert_eq!(Some(6), plot.normalize_factor);
    }

    #[test]
    fn test_missing_genes_per_species() {
        let set = sample_set();
        let plot = SummaryStats::new(&set).missing_genes_per_species();
        assert_eq!("b", plot.labels[0]);
        assert_eq!(1.0, plot.data[0][0]);
        assert_eq!(0.0, plot.data[0][1]);
    }

    #[test]
    fn test_average_seqsize() {
        let set = sample_set();
        let plot = SummaryStats::new(&set).average_seqsize();
        assert_eq!(vec![4.0, 2.0], plot.data[0]);
    }

    #[test]
    fn test_character_proportion() {
        let set = sample_set();
        let plot = SummaryStats::new(&set).character_proportion();
        // Counted residues: a:2 c:2 g:2 t:1 u:0 over 7; gaps and missing
        // are excluded from the denominator.
        let a_idx = plot.labels.iter().position(|label| label == "A").unwrap();
        assert_approx_eq!(2.0 / 7.0, plot.data[0][a_idx], 1e-10);
    }

    #[test]
    fn test_character_proportion_per_species() {
        let set = sample_set();
        let plot = SummaryStats::new(&set).character_proportion_per_species();
        assert_eq!(5, plot.data.len());
        assert_eq!(vec!["a", "b"], plot.labels);
        let g_row = plot.legend.iter().position(|label| label == "G").unwrap();
        // Taxon a: residues a,c,t,g,g over 5 counted => g = 2/5.
        assert_approx_eq!(2.0 / 5.0, plot.data[g_row][0], 1e-10);
    }
}
