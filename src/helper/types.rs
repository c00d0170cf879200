//! Data types shared across parsers, filters, and writers
use indexmap::IndexMap;

/// Input formats for alignment files
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InputFmt {
    /// Infer format from the file content
    Auto,
    /// Fasta format
    Fasta,
    /// Nexus format
    Nexus,
    /// Sequential phylip format
    Phylip,
    /// pyRAD loci format
    Loci,
}

impl std::fmt::Display for InputFmt {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fasta => write!(f, "fasta"),
            Self::Nexus => write!(f, "nexus"),
            Self::Phylip => write!(f, "phylip"),
            Self::Loci => write!(f, "loci"),
        }
    }
}

impl std::str::FromStr for InputFmt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "fasta" => Ok(Self::Fasta),
            "nexus" => Ok(Self::Nexus),
            "phylip" => Ok(Self::Phylip),
            "loci" => Ok(Self::Loci),
            _ => Err(format!("{} is not a valid input format", s)),
        }
    }
}

/// Output formats for alignment files
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OutputFmt {
    /// Fasta format
    Fasta,
    /// Nexus format
    Nexus,
    /// Phylip format
    Phylip,
    /// Interleaved fasta format
    FastaInt,
    /// Interleaved nexus format
    NexusInt,
    /// Interleaved phylip format
    PhylipInt,
}

impl OutputFmt {
    pub fn is_interleave(&self) -> bool {
        matches!(self, Self::FastaInt | Self::NexusInt | Self::PhylipInt)
    }

    pub fn is_nexus(&self) -> bool {
        matches!(self, Self::Nexus | Self::NexusInt)
    }
}

impl std::fmt::Display for OutputFmt {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Fasta => write!(f, "fasta"),
            Self::Nexus => write!(f, "nexus"),
            Self::Phylip => write!(f, "phylip"),
            Self::FastaInt => write!(f, "fasta-int"),
            Self::NexusInt => write!(f, "nexus-int"),
            Self::PhylipInt => write!(f, "phylip-int"),
        }
    }
}

impl std::str::FromStr for OutputFmt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fasta" => Ok(Self::Fasta),
            "nexus" => Ok(Self::Nexus),
            "phylip" => Ok(Self::Phylip),
            "fasta-int" => Ok(Self::FastaInt),
            "nexus-int" => Ok(Self::NexusInt),
            "phylip-int" => Ok(Self::PhylipInt),
            _ => Err(format!("{} is not a valid output format", s)),
        }
    }
}

/// Output formats for alignment partitions
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PartitionFmt {
    /// Charset block embedded in a nexus alignment file
    Charset,
    /// RAxML-style partition sidecar file
    Raxml,
}

/// Sequence data types.
///
/// The missing symbol is `n` for DNA and `x` for amino acid data.
/// The gap symbol is always `-`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DataType {
    /// DNA sequences
    Dna,
    /// Amino acid sequences
    Aa,
}

impl DataType {
    /// Missing data symbol as stored in the matrix (lowercase).
    pub fn missing(&self) -> char {
        match self {
            Self::Dna => 'n',
            Self::Aa => 'x',
        }
    }

    /// Datatype name as written in nexus format blocks.
    pub fn nexus_name(&self) -> &str {
        match self {
            Self::Dna => "dna",
            Self::Aa => "protein",
        }
    }

    /// Default substitution model for partition sidecar files.
    pub fn default_model(&self) -> &str {
        match self {
            Self::Dna => "GTR",
            Self::Aa => "LG",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Dna => write!(f, "dna"),
            Self::Aa => write!(f, "aa"),
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dna" => Ok(Self::Dna),
            "aa" | "protein" => Ok(Self::Aa),
            _ => Err(format!("{} is not a valid data type", s)),
        }
    }
}

/// Gap symbol shared by all alphabets.
pub const GAP: char = '-';

/// Ordered taxon to sequence mapping.
pub type SeqMatrix = IndexMap<String, String>;

/// Options recognized by the sequence writers.
#[derive(Debug, Clone)]
pub struct WriteOpts {
    /// Gap symbol for output headers
    pub gap: char,
    /// Missing symbol for output headers
    pub missing: char,
    /// Truncate phylip taxon names to 10 characters
    pub phylip_truncate_names: bool,
    /// Emit a charset block in nexus output
    pub use_charset: bool,
    /// Taxa written to a nexus outgroup block
    pub outgroup: Option<Vec<String>>,
    /// Emit the partition sidecar file next to phylip output
    pub partition_file: bool,
    /// Substitution model override for the partition sidecar
    pub model: Option<String>,
}

impl WriteOpts {
    pub fn new(datatype: &DataType) -> Self {
        Self {
            gap: GAP,
            missing: datatype.missing(),
            phylip_truncate_names: false,
            use_charset: true,
            outgroup: None,
            partition_file: true,
            model: None,
        }
    }
}

impl Default for WriteOpts {
    fn default() -> Self {
        Self::new(&DataType::Dna)
    }
}
