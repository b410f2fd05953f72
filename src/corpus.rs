//! Locates paired modality volumes under a corpus root.
//!
//! A corpus root holds one subdirectory per modality (e.g. `t1/` and `t2/`). Each subdirectory
//! is globbed with the same file pattern, the two listings are checked for equal non-zero counts
//! and then paired into [PairEntry]s.

use crate::error::{CorpusError, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const NIFTI_EXTENSIONS: [&str; 2] = [".nii.gz", ".nii"];
const KEY_SEPARATORS: [char; 3] = ['_', '-', '.'];

/// how source and target files are associated with each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pairing {
    /// match by a subject key derived from the file name
    #[default]
    Subject,
    /// match the i-th sorted source file with the i-th sorted target file
    Positional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairEntry {
    pub subject: String,
    pub source: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Corpus {
    source_modality: String,
    target_modality: String,
    entries: Vec<PairEntry>,
}

impl Corpus {
    /// enumerates both modality directories under `root`, validates their counts and pairs them
    pub fn discover(
        root: impl AsRef<Path>,
        source_modality: &str,
        target_modality: &str,
        pattern: &str,
        pairing: Pairing,
    ) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(CorpusError::MissingDirectory(root.to_path_buf()));
        }

        let source = locate(root, source_modality, pattern)?;
        let target = locate(root, target_modality, pattern)?;
        info!(
            "found {} {} volumes, {} {} volumes",
            source.len(),
            source_modality,
            target.len(),
            target_modality
        );

        validate_counts(source_modality, target_modality, source.len(), target.len())?;

        let entries = match pairing {
            Pairing::Subject => {
                pair_by_subject(&source, &target, source_modality, target_modality)?
            }
            Pairing::Positional => pair_positional(source, target, source_modality),
        };
        info!("paired {} entries by {:?}", entries.len(), pairing);

        Ok(Self {
            source_modality: source_modality.to_string(),
            target_modality: target_modality.to_string(),
            entries,
        })
    }

    pub fn source_modality(&self) -> &str {
        &self.source_modality
    }

    pub fn target_modality(&self) -> &str {
        &self.target_modality
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PairEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&PairEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PairEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a PairEntry;
    type IntoIter = std::slice::Iter<'a, PairEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// returns the regular files matching `pattern` in `root/modality`, sorted by path
pub fn locate(root: impl AsRef<Path>, modality: &str, pattern: &str) -> Result<Vec<PathBuf>> {
    let dir = root.as_ref().join(modality);
    if !dir.is_dir() {
        return Err(CorpusError::MissingDirectory(dir));
    }

    // the directory part is matched literally, only the file pattern is interpreted
    let escaped_dir = Pattern::escape(&dir.display().to_string());
    let full_pattern = Path::new(&escaped_dir).join(pattern).display().to_string();

    let matches = glob::glob(&full_pattern).map_err(|source| CorpusError::Pattern {
        pattern: full_pattern.clone(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in matches {
        let path = entry?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    debug!("{}: {} files match {}", dir.display(), paths.len(), pattern);
    Ok(paths)
}

/// both listings must be non-empty and of equal length
pub fn validate_counts(
    source_modality: &str,
    target_modality: &str,
    n_source: usize,
    n_target: usize,
) -> Result<()> {
    if n_source == 0 && n_target == 0 {
        return Err(CorpusError::EmptyCorpus {
            source_modality: source_modality.to_string(),
            target_modality: target_modality.to_string(),
        });
    }
    if n_source != n_target {
        return Err(CorpusError::CountMismatch {
            source_modality: source_modality.to_string(),
            target_modality: target_modality.to_string(),
            n_source,
            n_target,
        });
    }
    Ok(())
}

/// derives a subject key from a volume file name. The neuroimaging extension is removed, then a
/// trailing modality token such as `_t1`, `-T2` or `_T1w` is stripped (case-insensitive).
pub fn subject_key(path: impl AsRef<Path>, modality: &str) -> String {
    let name = path.as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let lower = name.to_ascii_lowercase();
    let stem = NIFTI_EXTENSIONS.iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &name[..name.len() - ext.len()])
        .unwrap_or(name.as_str());

    let lower_stem = stem.to_ascii_lowercase();
    let modality = modality.to_ascii_lowercase();
    let tokens = [format!("{modality}w"), modality];

    for token in &tokens {
        for sep in KEY_SEPARATORS {
            let suffix = format!("{sep}{token}");
            if lower_stem.ends_with(&suffix) && lower_stem.len() > suffix.len() {
                return stem[..stem.len() - suffix.len()].to_string();
            }
        }
    }
    stem.to_string()
}

fn keyed(paths: &[PathBuf], modality: &str) -> Result<BTreeMap<String, PathBuf>> {
    let mut map = BTreeMap::new();
    for p in paths {
        let key = subject_key(p, modality);
        if map.insert(key.clone(), p.clone()).is_some() {
            return Err(CorpusError::DuplicateSubject {
                subject: key,
                modality: modality.to_string(),
            });
        }
    }
    Ok(map)
}

/// pairs files by subject key. Every subject must be present in both modalities exactly once.
pub fn pair_by_subject(
    source: &[PathBuf],
    target: &[PathBuf],
    source_modality: &str,
    target_modality: &str,
) -> Result<Vec<PairEntry>> {
    let source_map = keyed(source, source_modality)?;
    let mut target_map = keyed(target, target_modality)?;

    let mut entries = Vec::with_capacity(source_map.len());
    for (subject, source) in source_map {
        let Some(target) = target_map.remove(&subject) else {
            return Err(CorpusError::UnmatchedSubject {
                subject,
                found_in: source_modality.to_string(),
                missing_in: target_modality.to_string(),
            });
        };
        entries.push(PairEntry { subject, source, target });
    }

    // only reachable with unequal inputs; discover checks the counts first
    if let Some((subject, _)) = target_map.into_iter().next() {
        return Err(CorpusError::UnmatchedSubject {
            subject,
            found_in: target_modality.to_string(),
            missing_in: source_modality.to_string(),
        });
    }

    Ok(entries)
}

/// pairs the i-th source with the i-th target. Inputs are expected to be sorted already.
pub fn pair_positional(
    source: Vec<PathBuf>,
    target: Vec<PathBuf>,
    source_modality: &str,
) -> Vec<PairEntry> {
    source.into_iter().zip(target).map(|(source, target)| {
        PairEntry {
            subject: subject_key(&source, source_modality),
            source,
            target,
        }
    }).collect()
}
