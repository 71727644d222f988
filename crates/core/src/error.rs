use crate::validation::ValidationReport;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PathwayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read file {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to list directory {path}: {source}", path = path.display())]
    DirList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Decode(String),

    #[error("pathway {name} is invalid:\n{report}")]
    InvalidPathway {
        name: String,
        report: ValidationReport,
    },
    #[error("pathways {names:?} are invalid")]
    InvalidPathways { names: Vec<String> },
    #[error("cannot load pathways from {dir}: no valid pathways", dir = dir.display())]
    NoPathways { dir: PathBuf },
    #[error("cannot load pathways from {dir}: found re-declared pathways: {names:?}", dir = dir.display())]
    RedeclaredPathways { dir: PathBuf, names: Vec<String> },
    #[error("too many pathways: found {0}, expected 1")]
    TooManyPathways(usize),

    #[error("pathway {0} hasn't been initialised")]
    NotInitialised(String),
    #[error("cannot resolve pathway: {0}")]
    Resolution(String),
    #[error("pathway {0} does not exist within the collection")]
    UnknownPathway(String),
    #[error("the order list has no elements")]
    EmptyOrder,
    #[error("all pathways are disabled")]
    AllPathwaysDisabled,
    #[error("failed to compile regex {pattern}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid doctor entry: {0}")]
    InvalidDoctor(String),
    #[error("a consultant with ID {0:?} already exists in the doctors registry")]
    DuplicateDoctor(String),
    #[error("invalid locations: {0}")]
    InvalidLocations(String),
    #[error("unknown location: {0}")]
    UnknownLocation(String),
    #[error("invalid reference range: {0}")]
    InvalidRange(String),
    #[error("cannot generate value: {0}")]
    ValueGeneration(String),

    #[error(transparent)]
    Types(#[from] pathsim_types::TypesError),
}

pub type PathwayResult<T> = std::result::Result<T, PathwayError>;
