//! Memoized pairwise kerning

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::font::{FontFace, KerningOffset};

/// Caches `FontFace::kerning` per adjacent pair.
///
/// Kerning is a pure function of the face and its fixed size, so entries
/// are never invalidated. Not persisted.
pub struct KerningResolver {
    face: Arc<dyn FontFace>,
    pairs: Mutex<HashMap<(Option<char>, char), KerningOffset>>,
}

impl std::fmt::Debug for KerningResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KerningResolver")
            .field("pairs", &self.len())
            .finish()
    }
}

impl KerningResolver {
    pub fn new(face: Arc<dyn FontFace>) -> Self {
        Self {
            face,
            pairs: Mutex::new(HashMap::new()),
        }
    }

    /// Kerning between `prev` and `curr`, querying the face once per pair
    pub fn resolve(&self, prev: Option<char>, curr: char) -> KerningOffset {
        let mut pairs = self.pairs.lock().unwrap_or_else(PoisonError::into_inner);
        *pairs
            .entry((prev, curr))
            .or_insert_with(|| self.face.kerning(prev, curr))
    }

    /// Number of memoized pairs
    pub fn len(&self) -> usize {
        self.pairs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The face queries fall through to
    pub fn face(&self) -> &Arc<dyn FontFace> {
        &self.face
    }
}
