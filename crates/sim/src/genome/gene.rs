use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lineage identifier handed out by a [`TagSource`].
pub type Tag = u64;

/// Issues unique lineage tags for genes, hosts and pathogens.
///
/// Owned by the environment and shared by reference with parallel workers.
#[derive(Debug, Default)]
pub struct TagSource {
    next: AtomicU64,
}

impl TagSource {
    /// Create a source whose first tag is `start`.
    pub fn new(start: Tag) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Take the next unused tag.
    #[inline]
    pub fn next_tag(&self) -> Tag {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The tag the next call to `next_tag` will return.
    pub fn peek(&self) -> Tag {
        self.next.load(Ordering::Relaxed)
    }
}

/// One MHC gene: an allele plus the lineage of that allele.
///
/// Equality and hashing look at the allele only, so two genes carrying the
/// same allele compare equal even when they arose independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Gene {
    allele: u64,
    tag: Tag,
    origin: usize,
    parent_tag: Option<Tag>,
}

impl Gene {
    /// Create a gene that arose at generation `origin` without a parent.
    pub fn new(allele: u64, tag: Tag, origin: usize) -> Self {
        Self {
            allele,
            tag,
            origin,
            parent_tag: None,
        }
    }

    /// Gene with no lineage information (tag 0, generation 0).
    pub fn from_allele(allele: u64) -> Self {
        Self::new(allele, 0, 0)
    }

    #[inline]
    pub fn allele(&self) -> u64 {
        self.allele
    }

    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Generation at which this allele arose.
    #[inline]
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Tag of the allele this one mutated from.
    #[inline]
    pub fn parent_tag(&self) -> Option<Tag> {
        self.parent_tag
    }

    /// Descendant allele produced by a mutation at `generation`.
    pub(crate) fn mutated(&self, allele: u64, tag: Tag, generation: usize) -> Self {
        Self {
            allele,
            tag,
            origin: generation,
            parent_tag: Some(self.tag),
        }
    }
}

impl PartialEq for Gene {
    fn eq(&self, other: &Self) -> bool {
        self.allele == other.allele
    }
}

impl Eq for Gene {}

impl Hash for Gene {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.allele.hash(state);
    }
}
