//! A module for parsing sequential phylip files.
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use nom::{IResult, character::complete, sequence};

use crate::helper::alphabet;
use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::files;
use crate::helper::types::{DataType, SeqMatrix};
use crate::parser::{clean_id, clean_seq, insert_matrix};

pub struct Phylip<'a> {
    input: &'a Path,
    datatype: &'a DataType,
    pub matrix: SeqMatrix,
    pub ntax: usize,
    pub nchar: usize,
}

impl<'a> Phylip<'a> {
    pub fn new(input: &'a Path, datatype: &'a DataType) -> Self {
        Self {
            input,
            datatype,
            matrix: IndexMap::new(),
            ntax: 0,
            nchar: 0,
        }
    }

    pub fn parse(&mut self) -> SeqResult<()> {
        let reader = self.open()?;
        let mut lines = reader.lines().enumerate();
        let header = loop {
            match lines.next() {
                Some((idx, Ok(line))) => {
                    if !line.trim().is_empty() {
                        break (idx, line);
                    }
                }
                Some((idx, Err(err))) => return Err(self.parse_error(idx + 1, &err.to_string())),
                None => return Err(self.parse_error(0, "empty file")),
            }
        };
        self.parse_header(&header.1, header.0 + 1)?;
        for (idx, line) in lines {
            let line = line.map_err(|err| self.parse_error(idx + 1, &err.to_string()))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.matrix.len() == self.ntax {
                // Extra records past ntax mean an interleaved layout.
                return Err(self.parse_error(
                    idx + 1,
                    "interleaved phylip input is not supported; \
                    convert to sequential phylip first",
                ));
            }
            let mut fields = line.split_whitespace();
            let id = match fields.next() {
                Some(id) => clean_id(id),
                None => continue,
            };
            let seq = match fields.next() {
                Some(seq) => clean_seq(seq),
                None => {
                    return Err(self.parse_error(idx + 1, "missing sequence field"));
                }
            };
            if !alphabet::is_valid_seq(self.datatype, &seq) {
                return Err(self.parse_error(
                    idx + 1,
                    &format!("sequence {} is not a valid {} sequence", id, self.datatype),
                ));
            }
            insert_matrix(&mut self.matrix, id, seq, self.input)?;
        }
        self.check_header_matches()?;
        Ok(())
    }

    pub fn parse_only_id(&mut self) -> SeqResult<Vec<String>> {
        self.parse()?;
        Ok(self.matrix.keys().cloned().collect())
    }

    fn open(&self) -> SeqResult<BufReader<Box<dyn std::io::Read>>> {
        let file = files::open_file(self.input).map_err(|err| SeqError::Parse {
            path: self.input.to_path_buf(),
            line: 0,
            reason: err.to_string(),
        })?;
        Ok(BufReader::new(file))
    }

    fn parse_header(&mut self, header_line: &str, lnum: usize) -> SeqResult<()> {
        let header: IResult<&str, (&str, &str)> = sequence::separated_pair(
            complete::digit1,
            complete::space1,
            complete::digit1,
        )(header_line.trim());

        match header {
            Ok((_, (tax, chars))) => {
                self.ntax = tax
                    .parse::<usize>()
                    .map_err(|_| self.parse_error(lnum, "taxa count is not a number"))?;
                self.nchar = chars
                    .parse::<usize>()
                    .map_err(|_| self.parse_error(lnum, "site count is not a number"))?;
                Ok(())
            }
            Err(_) => Err(self.parse_error(lnum, "invalid phylip header")),
        }
    }

    fn check_header_matches(&self) -> SeqResult<()> {
        if self.matrix.len() != self.ntax {
            return Err(self.parse_error(
                0,
                &format!(
                    "taxa count mismatch: header says {}, found {}",
                    self.ntax,
                    self.matrix.len()
                ),
            ));
        }
        let longest = self.matrix.values().map(|seq| seq.len()).max().unwrap_or(0);
        if self.nchar != longest {
            return Err(self.parse_error(
                0,
                &format!(
                    "site count mismatch: header says {}, longest sequence is {}",
                    self.nchar, longest
                ),
            ));
        }
        Ok(())
    }

    fn parse_error(&self, line: usize, reason: &str) -> SeqError {
        SeqError::Parse {
            path: self.input.to_path_buf(),
            line,
            reason: String::from(reason),
        }
    }
}
