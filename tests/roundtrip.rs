use std::path::Path;

use seqfuse::helper::alignment::Alignment;
use seqfuse::helper::types::{DataType, InputFmt, OutputFmt, WriteOpts};
use seqfuse::writer::sequences::SeqWriter;
use tempdir::TempDir;

const DNA: DataType = DataType::Dna;

fn roundtrip(aln: &Alignment, fmt: &OutputFmt, input_fmt: &InputFmt, fname: &str) -> Alignment {
    let dir = TempDir::new("roundtrip").unwrap();
    let output = dir.path().join(fname);
    let mut writer = SeqWriter::new(&output, aln, WriteOpts::default());
    writer.write(fmt).unwrap();
    Alignment::from_file(&output, input_fmt, &DNA).unwrap()
}

#[test]
fn test_fasta_round_trip() {
    let input = Path::new("tests/files/simple.fas");
    let aln = Alignment::from_file(input, &InputFmt::Fasta, &DNA).unwrap();
    let back = roundtrip(&aln, &OutputFmt::Fasta, &InputFmt::Fasta, "rt.fas");
    assert_eq!(aln.matrix, back.matrix);
    assert_eq!(aln.locus_length, back.locus_length);
}

#[test]
fn test_phylip_round_trip() {
    let input = Path::new("tests/files/simple.phy");
    let aln = Alignment::from_file(input, &InputFmt::Phylip, &DNA).unwrap();
    let back = roundtrip(&aln, &OutputFmt::Phylip, &InputFmt::Phylip, "rt.phy");
    assert_eq!(aln.matrix, back.matrix);
}

#[test]
fn test_nexus_round_trip() {
    let input = Path::new("tests/files/simple.nex");
    let aln = Alignment::from_file(input, &InputFmt::Nexus, &DNA).unwrap();
    let back = roundtrip(&aln, &OutputFmt::Nexus, &InputFmt::Nexus, "rt.nex");
    assert_eq!(aln.matrix, back.matrix);
}

#[test]
fn test_nexus_charset_round_trip() {
    let input = Path::new("tests/files/charset.nex");
    let aln = Alignment::from_file(input, &InputFmt::Nexus, &DNA).unwrap();
    assert_eq!(2, aln.partitions.len());
    let back = roundtrip(&aln, &OutputFmt::Nexus, &InputFmt::Nexus, "rt.nex");
    assert_eq!(aln.matrix, back.matrix);
    assert_eq!(2, back.partitions.len());
    let gene_2 = back.partitions.get("gene_2").unwrap();
    assert_eq!((4, 7), (gene_2.start, gene_2.end));
}

#[test]
fn test_probe_auto_parse() {
    let aln = Alignment::from_file_auto(Path::new("tests/files/simple.phy")).unwrap();
    assert_eq!(InputFmt::Phylip, aln.input_fmt);
    assert_eq!(DataType::Dna, aln.datatype);
    assert_eq!(2, aln.ntax());
}

#[test]
fn test_loci_parse() {
    let aln = Alignment::from_file(
        Path::new("tests/files/simple.loci"),
        &InputFmt::Loci,
        &DNA,
    )
    .unwrap();
    assert_eq!(3, aln.ntax());
    assert_eq!(8, aln.locus_length);
    assert_eq!(2, aln.partitions.len());
    assert_eq!(Some(&String::from("nnnnggtc")), aln.matrix.get("taxon_c"));
}

#[test]
fn test_missing_filter_monotonic() {
    let input = Path::new("tests/files/concat/gene_1.nex");
    let aln = Alignment::from_file(input, &InputFmt::Nexus, &DNA).unwrap();
    let mut tight = aln.clone();
    let mut loose = aln.clone();
    tight.filter_missing(0.0, 0.0);
    loose.filter_missing(100.0, 100.0);
    assert!(tight.locus_length <= loose.locus_length);
    assert_eq!(aln.locus_length, loose.locus_length);
}
