//! Helper functions for file access and output naming
use std::path::{Path, PathBuf};
use std::{
    fs::File,
    io::{BufReader, Read},
};

use flate2::read::MultiGzDecoder;

use crate::helper::types::OutputFmt;

/// Decode gzip compressed files.
/// Returns a BufReader of the decoded stream.
pub fn decode_gzip(path: &Path) -> std::io::Result<BufReader<MultiGzDecoder<File>>> {
    let file = File::open(path)?;
    let decoder = MultiGzDecoder::new(file);
    Ok(BufReader::new(decoder))
}

/// Open a file, transparently decoding the gzip layer when the
/// `.gz` extension is present.
pub fn open_file(path: &Path) -> std::io::Result<Box<dyn Read>> {
    if path.extension().is_some_and(|ext| ext == "gz") {
        let decoder = decode_gzip(path)?;
        Ok(Box::new(decoder))
    } else {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Combine the output directory and the input filename.
///
/// # Example
/// ```
/// use std::path::Path;
/// use seqfuse::helper::files;
/// use seqfuse::helper::types::OutputFmt;
///
/// let dir = Path::new("output");
/// let file = Path::new("input.fas");
/// let output = files::create_output_fname(&dir, &file, &OutputFmt::Fasta);
/// assert_eq!(output, Path::new("output/input.fas"));
/// ```
pub fn create_output_fname(dir: &Path, file: &Path, output_fmt: &OutputFmt) -> PathBuf {
    let path = dir.join(
        file.file_name()
            .expect("Failed parsing filename for output file"),
    );
    create_output_fname_from_path(&path, output_fmt)
}

/// Create an output filename from an input filename.
pub fn create_output_fname_from_path(path: &Path, output_fmt: &OutputFmt) -> PathBuf {
    match output_fmt {
        OutputFmt::Fasta | OutputFmt::FastaInt => path.with_extension("fas"),
        OutputFmt::Nexus | OutputFmt::NexusInt => path.with_extension("nex"),
        OutputFmt::Phylip | OutputFmt::PhylipInt => path.with_extension("phy"),
    }
}

/// Basename without the final extension, used as the alignment name.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(String::from)
        .unwrap_or_else(|| path.display().to_string())
}
