//! Delimited text parsers: taxa lists and population maps.
use std::path::Path;

use csv::ReaderBuilder;
use indexmap::IndexMap;

use crate::helper::errors::{SeqError, SeqResult};

/// Parse a single-column taxa list. Only the first field of each
/// line is used, so both plain text and csv files are accepted.
pub fn parse_taxa_list(path: &Path) -> SeqResult<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| parse_error(path, &err.to_string()))?;
    let mut taxa = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| parse_error(path, &err.to_string()))?;
        if let Some(field) = record.get(0) {
            let field = field.trim();
            if !field.is_empty() {
                taxa.push(String::from(field));
            }
        }
    }
    Ok(taxa)
}

/// Parse a two-column `taxon<sep>population` map, where the separator is
/// a tab, semicolon, or comma. Returns populations in insertion order,
/// each with its member taxa.
pub fn parse_population_map(path: &Path) -> SeqResult<IndexMap<String, Vec<String>>> {
    let delimiter = sniff_delimiter(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|err| parse_error(path, &err.to_string()))?;
    let mut populations: IndexMap<String, Vec<String>> = IndexMap::new();
    for record in reader.records() {
        let record = record.map_err(|err| parse_error(path, &err.to_string()))?;
        let taxon = record.get(0).map(str::trim).unwrap_or_default();
        let population = record.get(1).map(str::trim).unwrap_or_default();
        if taxon.is_empty() || population.is_empty() {
            return Err(parse_error(path, "expected `taxon<sep>population` lines"));
        }
        populations
            .entry(String::from(population))
            .or_default()
            .push(String::from(taxon));
    }
    if populations.is_empty() {
        return Err(parse_error(path, "empty population map"));
    }
    Ok(populations)
}

fn sniff_delimiter(path: &Path) -> SeqResult<u8> {
    let content =
        std::fs::read_to_string(path).map_err(|err| parse_error(path, &err.to_string()))?;
    let first = content.lines().find(|line| !line.trim().is_empty());
    match first {
        Some(line) if line.contains('\t') => Ok(b'\t'),
        Some(line) if line.contains(';') => Ok(b';'),
        Some(_) => Ok(b','),
        None => Err(parse_error(path, "empty file")),
    }
}

fn parse_error(path: &Path, reason: &str) -> SeqError {
    SeqError::Parse {
        path: path.to_path_buf(),
        line: 0,
        reason: String::from(reason),
    }
}
