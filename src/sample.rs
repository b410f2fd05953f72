// choosing which corpus entry to inspect

use crate::corpus::{Corpus, PairEntry};
use crate::error::{CorpusError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum Selection {
    /// a fixed position in the (ordered) corpus
    Index { index: usize },
    /// a uniformly random entry, reproducible from the run seed
    Random,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Index { index: 0 }
    }
}

/// picks one entry from the corpus. The seed is only consumed by [Selection::Random].
pub fn select_pair(corpus: &Corpus, selection: Selection, seed: u64) -> Result<&PairEntry> {
    let len = corpus.len();
    let index = match selection {
        Selection::Index { index } => index,
        Selection::Random => {
            if len == 0 {
                return Err(CorpusError::PairIndexOutOfRange { index: 0, len });
            }
            let mut rng = StdRng::seed_from_u64(seed);
            rng.random_range(0..len)
        }
    };

    let entry = corpus.get(index).ok_or(CorpusError::PairIndexOutOfRange { index, len })?;
    info!("selected pair {} of {} (subject {})", index + 1, len, entry.subject);
    Ok(entry)
}
