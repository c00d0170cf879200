//! Input file discovery.
use std::path::{Path, PathBuf};

use glob::glob;
use walkdir::WalkDir;

use crate::helper::types::InputFmt;

pub struct SeqFileFinder<'a> {
    dir: &'a Path,
}

impl<'a> SeqFileFinder<'a> {
    pub fn new(dir: &'a Path) -> Self {
        Self { dir }
    }

    /// Find alignment files matching the input format extension.
    pub fn find(&self, input_fmt: &InputFmt) -> Vec<PathBuf> {
        let pattern = self.pattern(input_fmt);
        let mut files = glob(&pattern)
            .expect("Failed globbing files")
            .filter_map(|ok| ok.ok())
            .collect::<Vec<PathBuf>>();
        alphanumeric_sort::sort_path_slice(&mut files);
        files
    }

    /// Find alignment files recursively, regardless of extension.
    /// Used with the content-based format probe.
    pub fn find_recursive(&self) -> Vec<PathBuf> {
        let mut files = WalkDir::new(self.dir)
            .into_iter()
            .filter_map(|ok| ok.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect::<Vec<PathBuf>>();
        alphanumeric_sort::sort_path_slice(&mut files);
        files
    }

    fn pattern(&self, input_fmt: &InputFmt) -> String {
        match input_fmt {
            InputFmt::Fasta => format!("{}/*.fa*", self.dir.display()),
            InputFmt::Nexus => format!("{}/*.nex*", self.dir.display()),
            InputFmt::Phylip => format!("{}/*.phy*", self.dir.display()),
            InputFmt::Loci => format!("{}/*.loci", self.dir.display()),
            InputFmt::Auto => format!("{}/*", self.dir.display()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_find_files() {
        let path = Path::new("tests/files/concat");
        let files = SeqFileFinder::new(path).find(&InputFmt::Nexus);
        assert_eq!(4, files.len());
    }

    #[test]
    fn test_find_recursive() {
        let path = Path::new("tests/files/concat");
        let files = SeqFileFinder::new(path).find_recursive();
        assert_eq!(4, files.len());
    }
}
