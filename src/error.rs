//! Error types for corpus discovery, volume decoding, slicing and rendering.

use crate::slice::Axis;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    /// a modality subdirectory (or the corpus root) does not exist
    #[error("modality directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("invalid file pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to enumerate corpus files: {0}")]
    Glob(#[from] glob::GlobError),

    /// neither modality produced a single file
    #[error("no volumes found for {source_modality} or {target_modality}")]
    EmptyCorpus {
        source_modality: String,
        target_modality: String,
    },

    #[error(
        "file count mismatch: {source_modality} has {n_source}, {target_modality} has {n_target}"
    )]
    CountMismatch {
        source_modality: String,
        target_modality: String,
        n_source: usize,
        n_target: usize,
    },

    #[error("subject {subject:?} has a {found_in} volume but no {missing_in} volume")]
    UnmatchedSubject {
        subject: String,
        found_in: String,
        missing_in: String,
    },

    #[error("subject {subject:?} appears more than once in {modality}")]
    DuplicateSubject { subject: String, modality: String },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: nifti::NiftiError,
    },

    #[error("{} is not a 3-D volume (shape {shape:?})", path.display())]
    NotVolumetric { path: PathBuf, shape: Vec<usize> },

    #[error("slice index {index} out of range for axis {axis} with extent {extent}")]
    SliceOutOfRange {
        axis: Axis,
        index: isize,
        extent: usize,
    },

    #[error("pair index {index} out of range for corpus of {len} entries")]
    PairIndexOutOfRange { index: usize, len: usize },

    #[error("render error: {0}")]
    Render(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CorpusError>;

impl CorpusError {
    /// true for the two corpus-shape violations, empty or unequal
    pub fn is_corpus_mismatch(&self) -> bool {
        matches!(self, Self::EmptyCorpus { .. } | Self::CountMismatch { .. })
    }
}

impl From<image::ImageError> for CorpusError {
    fn from(e: image::ImageError) -> Self {
        Self::Render(e.to_string())
    }
}

impl From<serde_json::Error> for CorpusError {
    fn from(e: serde_json::Error) -> Self {
        Self::Render(e.to_string())
    }
}

impl From<toml::de::Error> for CorpusError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for CorpusError {
    fn from(e: toml::ser::Error) -> Self {
        Self::Config(e.to_string())
    }
}
