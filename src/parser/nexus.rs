//! A module for parsing nexus files.
//!
//! Parses the data/characters block and, when present, the `charset`,
//! `lset`, and `prset` commands that define partitions and their
//! substitution models.
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use indexmap::IndexMap;
use nom::{IResult, bytes::complete, character, sequence};

use crate::helper::alphabet;
use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::files;
use crate::helper::partition::PartitionModel;
use crate::helper::types::{DataType, SeqMatrix};
use crate::parser::{clean_id, clean_seq};

pub struct Nexus<'a> {
    input: &'a Path,
    datatype: &'a DataType,
    pub matrix: SeqMatrix,
    pub partitions: PartitionModel,
    pub ntax: usize,
    pub nchar: usize,
    pub missing: char,
    pub gap: char,
    pub interleave: bool,
}

impl<'a> Nexus<'a> {
    pub fn new(input: &'a Path, datatype: &'a DataType) -> Self {
        Self {
            input,
            datatype,
            matrix: IndexMap::new(),
            partitions: PartitionModel::new(),
            ntax: 0,
            nchar: 0,
            missing: '?',
            gap: '-',
            interleave: false,
        }
    }

    pub fn parse(&mut self) -> SeqResult<()> {
        let blocks = self.get_blocks()?;
        let mut charsets: Vec<String> = Vec::new();
        let mut models: Vec<String> = Vec::new();
        for block in blocks {
            match block {
                Block::Dimensions(dimensions) => self.parse_dimensions(&dimensions),
                Block::Format(format) => self.parse_format(&format),
                Block::Matrix(matrix) => self.parse_matrix(&matrix)?,
                Block::Charset(charset) => charsets.push(charset),
                Block::Model(model) => models.push(model),
                Block::Undetermined => (),
            }
        }
        for charset in &charsets {
            self.partitions
                .read_from_nexus_string(charset, Some(self.input))?;
        }
        for model in &models {
            self.partitions.parse_nexus_model(model);
        }
        self.validate()?;
        Ok(())
    }

    pub fn parse_only_id(&mut self) -> SeqResult<Vec<String>> {
        let blocks = self.get_blocks()?;
        let mut ids = Vec::new();
        for block in blocks {
            if let Block::Matrix(matrix) = block {
                matrix.iter().for_each(|(id, _)| {
                    if !ids.contains(id) {
                        ids.push(id.to_string());
                    }
                });
            }
        }
        Ok(ids)
    }

    fn get_blocks(&mut self) -> SeqResult<Vec<Block>> {
        let input = files::open_file(self.input).map_err(|err| self.parse_error(&err.to_string()))?;
        let mut buff = BufReader::new(input);
        let mut header = String::new();
        buff.read_line(&mut header)
            .map_err(|err| self.parse_error(&err.to_string()))?;
        self.check_nexus(header.trim())?;
        let reader = NexusReader::new(buff);
        Ok(reader.into_iter().collect())
    }

    fn parse_dimensions(&mut self, blocks: &[String]) {
        blocks.iter().for_each(|dimension| match dimension {
            tag if tag.starts_with("ntax") => self.ntax = self.parse_ntax(dimension),
            tag if tag.starts_with("nchar") => self.nchar = self.parse_characters(dimension),
            _ => (),
        });
    }

    fn parse_format(&mut self, blocks: &[String]) {
        blocks.iter().for_each(|format| match format {
            token if token.starts_with("missing") => {
                if let Some(missing) = token.replace("missing=", "").chars().next() {
                    self.missing = missing;
                }
            }
            token if token.starts_with("gap") => {
                if let Some(gap) = token.replace("gap=", "").chars().next() {
                    self.gap = gap;
                }
            }
            token if token.starts_with("interleave") => {
                self.interleave = !token.ends_with("=no");
            }
            _ => (),
        });
    }

    fn parse_matrix(&mut self, matrix: &[(String, String)]) -> SeqResult<()> {
        for (id, seq) in matrix {
            let id = clean_id(id);
            let seq = clean_seq(seq);
            if !alphabet::is_valid_seq(self.datatype, &seq) {
                return Err(self.parse_error(&format!(
                    "sequence {} is not a valid {} sequence",
                    id, self.datatype
                )));
            }
            match self.matrix.get_mut(&id) {
                Some(value) => {
                    if self.interleave {
                        value.push_str(&seq);
                    } else {
                        return Err(SeqError::DuplicateTaxon {
                            path: self.input.to_path_buf(),
                            name: id,
                        });
                    }
                }
                None => {
                    self.matrix.insert(id, seq);
                }
            }
        }
        Ok(())
    }

    fn parse_ntax(&self, input: &str) -> usize {
        let tag: IResult<&str, &str> =
            sequence::preceded(complete::tag("ntax="), character::complete::digit1)(input);
        self.parse_usize(tag)
    }

    fn parse_characters(&self, input: &str) -> usize {
        let tag: IResult<&str, &str> =
            sequence::preceded(complete::tag("nchar="), character::complete::digit1)(input);
        self.parse_usize(tag)
    }

    fn parse_usize(&self, tag: IResult<&str, &str>) -> usize {
        match tag {
            Ok((_, out)) => out.trim().parse::<usize>().unwrap_or(0),
            Err(_) => 0,
        }
    }

    fn check_nexus(&self, line: &str) -> SeqResult<()> {
        if !line.to_lowercase().starts_with("#nexus") {
            return Err(self.parse_error("missing #NEXUS header"));
        }
        Ok(())
    }

    fn validate(&self) -> SeqResult<()> {
        if self.matrix.is_empty() {
            return Err(self.parse_error("no matrix block found"));
        }
        if self.ntax != 0 && self.matrix.len() != self.ntax {
            return Err(self.parse_error(&format!(
                "taxa count mismatch: block says {}, found {}",
                self.ntax,
                self.matrix.len()
            )));
        }
        let longest = self.matrix.values().map(|seq| seq.len()).max().unwrap_or(0);
        if self.nchar != 0 && self.nchar != longest {
            return Err(self.parse_error(&format!(
                "site count mismatch: block says {}, longest sequence is {}",
                self.nchar, longest
            )));
        }
        Ok(())
    }

    fn parse_error(&self, reason: &str) -> SeqError {
        SeqError::Parse {
            path: self.input.to_path_buf(),
            line: 0,
            reason: String::from(reason),
        }
    }
}

enum Block {
    Dimensions(Vec<String>),
    Format(Vec<String>),
    Matrix(Vec<(String, String)>),
    Charset(String),
    Model(String),
    Undetermined,
}

struct NexusReader<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
}

impl<R: Read> NexusReader<R> {
    fn new(file: R) -> Self {
        Self {
            reader: BufReader::new(file),
            buffer: Vec::new(),
        }
    }

    fn next_block(&mut self) -> Option<Block> {
        self.buffer.clear();
        let bytes = self
            .reader
            .read_until(b';', &mut self.buffer)
            .expect("Failed reading nexus blocks");
        if bytes == 0 {
            None
        } else {
            let mut block: String = String::from_utf8_lossy(&self.buffer).trim().to_string();
            block.pop(); // remove the terminating semicolon
            match block.to_lowercase() {
                b if b.starts_with("dimensions") => {
                    Some(Block::Dimensions(self.parse_tokens(&block)))
                }
                b if b.starts_with("format") => Some(Block::Format(self.parse_tokens(&block))),
                b if b.starts_with("matrix") => Some(Block::Matrix(self.parse_matrix(&block))),
                b if b.starts_with("charset") => Some(Block::Charset(block)),
                b if b.starts_with("lset") || b.starts_with("prset") => Some(Block::Model(block)),
                _ => Some(Block::Undetermined),
            }
        }
    }

    fn parse_tokens(&self, block: &str) -> Vec<String> {
        let headers: Vec<&str> = block.split_whitespace().collect();
        let mut tokens: Vec<String> = Vec::new();
        headers[1..]
            .iter()
            .filter(|h| !h.is_empty())
            .for_each(|h| tokens.push(h.to_lowercase()));
        tokens
    }

    fn parse_matrix(&self, block: &str) -> Vec<(String, String)> {
        let matrix: Vec<&str> = block.split('\n').collect();
        let mut sequence = Vec::new();
        matrix[1..].iter().filter(|s| !s.is_empty()).for_each(|s| {
            let mut seq = s.split_whitespace();
            if let Some(id) = seq.next() {
                let rest: String = seq.collect::<Vec<&str>>().join("");
                if !rest.is_empty() {
                    sequence.push((id.to_string(), rest));
                }
            }
        });

        sequence
    }
}

// Iterate over the file.
// Collect each of the nexus commands terminated by a semicolon.
impl<R: Read> Iterator for NexusReader<R> {
    type Item = Block;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DNA: DataType = DataType::Dna;

    #[test]
    fn nexus_reading_simple_test() {
        let sample = Path::new("tests/files/simple.nex");
        let mut nex = Nexus::new(sample, &DNA);
        nex.parse().unwrap();
        assert_eq!(2, nex.matrix.len());
        assert_eq!(2, nex.ntax);
        assert_eq!(4, nex.nchar);
        assert_eq!('-', nex.gap);
    }

    #[test]
    fn nexus_parse_ntax_test() {
        let nex = Nexus::new(Path::new("."), &DNA);
        assert_eq!(5, nex.parse_ntax("ntax=5"));
    }

    #[test]
    fn nexus_charset_test() {
        let sample = Path::new("tests/files/charset.nex");
        let mut nex = Nexus::new(sample, &DNA);
        nex.parse().unwrap();
        assert_eq!(2, nex.partitions.len());
        let part = nex.partitions.get("gene_2").unwrap();
        assert_eq!(4, part.start);
        assert_eq!(7, part.end);
    }

    #[test]
    fn nexus_invalid_test() {
        let sample = Path::new("tests/files/simple.fas");
        let mut nex = Nexus::new(sample, &DNA);
        assert!(nex.parse().is_err());
    }

    #[test]
    fn nexus_interleave_test() {
        let sample = Path::new("tests/files/interleave.nex");
        let mut nex = Nexus::new(sample, &DNA);
        nex.parse().unwrap();
        let res = nex.matrix.get("ABCD");
        assert_eq!(Some(&String::from("agccatggcc")), res);
    }
}
