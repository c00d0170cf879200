//! Partition model over the concatenated coordinate space.
//!
//! A partition is a named contiguous range, optionally carrying 3-periodic
//! codon sub-positions and a substitution model descriptor. The model keeps
//! insertion order; partition order is observable in every output format.
use std::io::BufRead;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use lazy_static::lazy_static;
use nom::{IResult, character::complete, sequence};
use regex::Regex;

use crate::helper::errors::{SeqError, SeqResult};
use crate::helper::files;

lazy_static! {
    static ref CODON_SUFFIX: Regex = Regex::new(r"_(\d+)$").expect("Failed compiling regex");
}

/// A named range within the concatenated coordinate space.
///
/// `start` and `end` are zero-based and inclusive. When `codon_positions`
/// is present, each offset o defines the site set
/// `{start + o, start + o + 3, ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub codon_positions: Option<Vec<usize>>,
    pub model: Option<String>,
    pub source_file: Option<PathBuf>,
}

impl Partition {
    pub fn new(name: &str, start: usize, end: usize) -> Self {
        Self {
            name: String::from(name),
            start,
            end,
            codon_positions: None,
            model: None,
            source_file: None,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start <= end && start <= self.end
    }
}

/// Ordered collection of disjoint partitions.
///
/// `counter` tracks the total length of the concatenated space. Appending
/// by length grows the space; inserting by range only extends it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionModel {
    partitions: IndexMap<String, Partition>,
    counter: usize,
}

impl PartitionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.partitions.len() == 1
    }

    pub fn get(&self, name: &str) -> Option<&Partition> {
        self.partitions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Partition)> {
        self.partitions.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.partitions.keys().cloned().collect()
    }

    /// Append a partition at the end of the concatenated space.
    pub fn add_by_length(
        &mut self,
        name: &str,
        length: usize,
        source_file: Option<&Path>,
    ) -> SeqResult<()> {
        if length == 0 {
            return Err(SeqError::PartitionConflict(format!(
                "partition {} cannot be empty",
                name
            )));
        }
        if self.partitions.contains_key(name) {
            return Err(SeqError::PartitionConflict(format!(
                "partition {} already exists",
                name
            )));
        }
        let mut part = Partition::new(name, self.counter, self.counter + length - 1);
        part.source_file = source_file.map(PathBuf::from);
        self.counter += length;
        self.partitions.insert(String::from(name), part);
        Ok(())
    }

    /// Insert a partition at an explicit range.
    ///
    /// Does not advance the running counter beyond `end + 1`. Overlapping
    /// ranges are rejected and leave the model unchanged.
    pub fn add_by_range(
        &mut self,
        name: &str,
        range: (usize, usize),
        codon_positions: Option<Vec<usize>>,
        source_file: Option<&Path>,
    ) -> SeqResult<()> {
        let (start, end) = range;
        if end < start {
            return Err(SeqError::PartitionConflict(format!(
                "invalid range {}-{} for partition {}",
                start, end, name
            )));
        }
        if self.partitions.contains_key(name) {
            return Err(SeqError::PartitionConflict(format!(
                "partition {} already exists",
                name
            )));
        }
        if let Some(other) = self
            .partitions
            .values()
            .find(|part| part.overlaps(start, end))
        {
            return Err(SeqError::PartitionConflict(format!(
                "range {}-{} of {} overlaps {}",
                start, end, name, other.name
            )));
        }
        if codon_positions.is_some() && (end - start + 1) % 3 != 0 {
            return Err(SeqError::PartitionConflict(format!(
                "codon partition {} spans {} sites, not a multiple of three",
                name,
                end - start + 1
            )));
        }
        let mut part = Partition::new(name, start, end);
        part.codon_positions = codon_positions;
        part.source_file = source_file.map(PathBuf::from);
        self.counter = self.counter.max(end + 1);
        self.partitions.insert(String::from(name), part);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Partition> {
        let removed = self.partitions.shift_remove(name);
        self.rebuild_counter();
        removed
    }

    /// Remove every partition contributed by one source file.
    pub fn remove_by_file(&mut self, file: &Path) {
        self.partitions
            .retain(|_, part| part.source_file.as_deref() != Some(file));
        self.rebuild_counter();
    }

    /// Force the total length of the coordinate space.
    pub fn set_length(&mut self, length: usize) {
        self.counter = length;
    }

    /// Bind a substitution model descriptor to a partition by name.
    pub fn set_model(&mut self, name: &str, model: &str) {
        if let Some(part) = self.partitions.get_mut(name) {
            part.model = Some(String::from(model));
        }
    }

    /// Parse a MrBayes `charset` command.
    ///
    /// Recognizes `charset NAME = s-e;` and the codon form
    /// `charset NAME_i = s-e\3;`. Codon charsets sharing a base name fold
    /// into a single partition carrying one offset per charset.
    pub fn read_from_nexus_string(&mut self, line: &str, source_file: Option<&Path>) -> SeqResult<()> {
        let line = line.trim().trim_end_matches(';');
        let body = match line.to_lowercase().strip_prefix("charset") {
            Some(_) => line["charset".len()..].trim(),
            None => {
                return Err(SeqError::InvalidPartitionFile(format!(
                    "not a charset command: {}",
                    line
                )));
            }
        };
        let (name, range) = body.split_once('=').ok_or_else(|| {
            SeqError::InvalidPartitionFile(format!("missing `=` in charset: {}", line))
        })?;
        let name = name.trim();
        let range = range.trim();
        let is_codon = range.ends_with("\\3");
        let range = range.trim_end_matches("\\3");
        let (start, end) = parse_range(range)?;
        if start < 1 || end < start {
            return Err(SeqError::InvalidPartitionFile(format!(
                "invalid charset range {}-{}",
                start, end
            )));
        }
        if !is_codon {
            return self.add_by_range(name, (start - 1, end - 1), None, source_file);
        }
        self.fold_codon_charset(name, start - 1, end - 1, source_file)
    }

    /// Parse MrBayes `lset`/`prset` commands, binding model descriptors
    /// to partitions by `applyto` index.
    pub fn parse_nexus_model(&mut self, line: &str) {
        let line = line.trim().trim_end_matches(';');
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return;
        }
        let cmd = tokens[0].to_lowercase();
        if cmd != "lset" && cmd != "prset" {
            return;
        }
        let mut applyto: Vec<usize> = Vec::new();
        let mut all = false;
        let mut model_tokens: Vec<&str> = Vec::new();
        for token in &tokens[1..] {
            if let Some(idx) = token.to_lowercase().strip_prefix("applyto=(") {
                let idx = idx.trim_end_matches(')');
                if idx == "all" {
                    all = true;
                } else {
                    applyto.extend(idx.split(',').filter_map(|i| i.parse::<usize>().ok()));
                }
            } else {
                model_tokens.push(token);
            }
        }
        if model_tokens.is_empty() {
            return;
        }
        let model = model_tokens.join(" ");
        if all {
            self.partitions
                .values_mut()
                .for_each(|part| part.model = Some(model.clone()));
        } else {
            applyto.iter().for_each(|idx| {
                // applyto indices are 1-based partition positions
                if let Some((_, part)) = self.partitions.get_index_mut(idx.saturating_sub(1)) {
                    part.model = Some(model.clone());
                }
            });
        }
    }

    /// Parse a RAxML-style partition file: `DNA, name = 1-100` per line,
    /// with optional codon ranges `1-100\3`.
    pub fn from_raxml_file(path: &Path) -> SeqResult<Self> {
        let reader = files::open_file(path).map_err(|err| SeqError::Parse {
            path: path.to_path_buf(),
            line: 0,
            reason: err.to_string(),
        })?;
        let mut model = Self::new();
        for (idx, line) in std::io::BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(|err| SeqError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: err.to_string(),
            })?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (datatype, rest) = line.split_once(',').ok_or_else(|| {
                SeqError::InvalidPartitionFile(format!("missing datatype field: {}", line))
            })?;
            let (name, range) = rest.split_once('=').ok_or_else(|| {
                SeqError::InvalidPartitionFile(format!("missing `=`: {}", line))
            })?;
            let name = name.trim();
            let range = range.trim();
            let is_codon = range.ends_with("\\3");
            let range = range.trim_end_matches("\\3");
            let (start, end) = parse_range(range)?;
            let base = if is_codon {
                model.fold_codon_charset(name, start - 1, end - 1, Some(path))?;
                split_codon_suffix(name).0
            } else {
                model.add_by_range(name, (start - 1, end - 1), None, Some(path))?;
                String::from(name)
            };
            if let Some(part) = model.partitions.get_mut(&base) {
                if part.model.is_none() {
                    part.model = Some(String::from(datatype.trim()));
                }
            }
        }
        Ok(model)
    }

    fn fold_codon_charset(
        &mut self,
        name: &str,
        start: usize,
        end: usize,
        source_file: Option<&Path>,
    ) -> SeqResult<()> {
        let (base, offset_hint) = split_codon_suffix(name);
        match self.partitions.get_mut(&base) {
            Some(part) => {
                if start < part.start || start - part.start > 2 {
                    return Err(SeqError::PartitionConflict(format!(
                        "codon charset {} does not align with partition {}",
                        name, base
                    )));
                }
                let offset = start - part.start;
                part.end = part.end.max(end);
                if (part.end - part.start + 1) % 3 != 0 {
                    return Err(SeqError::PartitionConflict(format!(
                        "codon partition {} spans {} sites, not a multiple of three",
                        base,
                        part.end - part.start + 1
                    )));
                }
                let positions = part.codon_positions.get_or_insert_with(Vec::new);
                if !positions.contains(&offset) {
                    positions.push(offset);
                }
                self.counter = self.counter.max(end + 1);
                Ok(())
            }
            None => {
                // The first charset of a gene anchors the base range; its
                // numeric suffix tells the offset from the true start.
                let offset = offset_hint.unwrap_or(0);
                if start < offset {
                    return Err(SeqError::PartitionConflict(format!(
                        "codon charset {} starts before its base range",
                        name
                    )));
                }
                self.add_by_range(&base, (start - offset, end), Some(vec![offset]), source_file)
            }
        }
    }

    fn rebuild_counter(&mut self) {
        self.counter = self
            .partitions
            .values()
            .map(|part| part.end + 1)
            .max()
            .unwrap_or(0);
    }
}

/// Split a codon charset name into its base name and zero-based offset.
/// `gene1_2` yields `("gene1", Some(1))`; a bare name yields offset None.
fn split_codon_suffix(name: &str) -> (String, Option<usize>) {
    match CODON_SUFFIX.captures(name) {
        Some(caps) => {
            let idx: usize = caps[1].parse().unwrap_or(1);
            let base = CODON_SUFFIX.replace(name, "").to_string();
            (base, Some(idx.saturating_sub(1)))
        }
        None => (String::from(name), None),
    }
}

/// Parse a 1-based `s-e` range token.
fn parse_range(range: &str) -> SeqResult<(usize, usize)> {
    let parsed: IResult<&str, (&str, &str)> = sequence::separated_pair(
        complete::digit1,
        complete::char('-'),
        complete::digit1,
    )(range.trim());
    match parsed {
        Ok((_, (start, end))) => {
            let start = start.parse::<usize>().map_err(|_| {
                SeqError::InvalidPartitionFile(format!("range start is not a number: {}", range))
            })?;
            let end = end.parse::<usize>().map_err(|_| {
                SeqError::InvalidPartitionFile(format!("range end is not a number: {}", range))
            })?;
            Ok((start, end))
        }
        Err(_) => Err(SeqError::InvalidPartitionFile(format!(
            "cannot parse range: {}",
            range
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_add_by_length() {
        let mut model = PartitionModel::new();
        model.add_by_length("gene_1", 6, None).unwrap();
        model.add_by_length("gene_2", 8, None).unwrap();
        assert_eq!(14, model.counter());
        let part = model.get("gene_2").unwrap();
        assert_eq!(6, part.start);
        assert_eq!(13, part.end);
    }

    #[test]
    fn test_add_by_range_updates_counter() {
        let mut model = PartitionModel::new();
        model.add_by_range("gene_1", (0, 5), None, None).unwrap();
        model.add_by_range("gene_2", (6, 13), None, None).unwrap();
        assert_eq!(14, model.counter());
    }

    #[test]
    fn test_overlap_rejected() {
        let mut model = PartitionModel::new();
        model.add_by_range("gene_1", (0, 5), None, None).unwrap();
        let err = model.add_by_range("gene_2", (3, 10), None, None);
        assert!(matches!(err, Err(SeqError::PartitionConflict(_))));
        assert_eq!(1, model.len());
        assert_eq!(6, model.counter());
    }

    #[test]
    fn test_remove_by_file() {
        let mut model = PartitionModel::new();
        model
            .add_by_length("gene_1", 6, Some(Path::new("a.nex")))
            .unwrap();
        model
            .add_by_length("gene_2", 9, Some(Path::new("b.nex")))
            .unwrap();
        model.remove_by_file(Path::new("b.nex"));
        assert_eq!(1, model.len());
        assert_eq!(6, model.counter());
    }

    #[test]
    fn test_read_charset() {
        let mut model = PartitionModel::new();
        model
            .read_from_nexus_string("charset gene_a = 1-6;", None)
            .unwrap();
        model
            .read_from_nexus_string("charset gene_b = 7-14;", None)
            .unwrap();
        assert_eq!(2, model.len());
        let part = model.get("gene_b").unwrap();
        assert_eq!(6, part.start);
        assert_eq!(13, part.end);
        assert_eq!(14, model.counter());
    }

    #[test]
    fn test_read_codon_charsets_fold() {
        let mut model = PartitionModel::new();
        model
            .read_from_nexus_string("charset apc_1 = 1-6\\3;", None)
            .unwrap();
        model
            .read_from_nexus_string("charset apc_2 = 2-6\\3;", None)
            .unwrap();
        model
            .read_from_nexus_string("charset apc_3 = 3-6\\3;", None)
            .unwrap();
        assert_eq!(1, model.len());
        let part = model.get("apc").unwrap();
        assert_eq!(0, part.start);
        assert_eq!(5, part.end);
        assert_eq!(Some(vec![0, 1, 2]), part.codon_positions);
    }

    #[test]
    fn test_codon_span_not_triplet() {
        let mut model = PartitionModel::new();
        let res = model.read_from_nexus_string("charset bad_1 = 1-7\\3;", None);
        assert!(matches!(res, Err(SeqError::PartitionConflict(_))));
    }

    #[test]
    fn test_parse_nexus_model() {
        let mut model = PartitionModel::new();
        model.add_by_length("gene_1", 6, None).unwrap();
        model.add_by_length("gene_2", 6, None).unwrap();
        model.parse_nexus_model("lset applyto=(2) nst=6 rates=gamma;");
        assert_eq!(None, model.get("gene_1").unwrap().model);
        assert_eq!(
            Some(String::from("nst=6 rates=gamma")),
            model.get("gene_2").unwrap().model
        );
        model.parse_nexus_model("prset applyto=(all) statefreqpr=fixed(equal);");
        assert_eq!(
            Some(String::from("statefreqpr=fixed(equal)")),
            model.get("gene_1").unwrap().model
        );
    }

    #[test]
    fn test_is_single() {
        let mut model = PartitionModel::new();
        model.add_by_length("only", 12, None).unwrap();
        assert!(model.is_single());
    }
}
