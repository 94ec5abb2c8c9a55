use crate::page::{Bucket, Item};
use indexmap::IndexMap;
use serde::Serialize;

/// Results of a run keyed by page name, in traversal order
pub type Results = IndexMap<String, ResultTree>;

/// One page's contribution to a run's results
///
/// A page without children is a leaf holding its buckets. A page with
/// children is a branch: its own buckets sit under [`own_key`] next to each
/// child's subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultTree {
    Leaf(Vec<Bucket>),
    Branch(Results),
}

/// Key under which a branch stores its page's own result
pub fn own_key(name: &str) -> String {
    format!("__{}__", name)
}

impl ResultTree {
    pub fn as_leaf(&self) -> Option<&[Bucket]> {
        match self {
            Self::Leaf(buckets) => Some(buckets),
            Self::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&Results> {
        match self {
            Self::Leaf(_) => None,
            Self::Branch(results) => Some(results),
        }
    }

    /// Looks up a direct entry of a branch
    pub fn get(&self, key: &str) -> Option<&ResultTree> {
        self.as_branch().and_then(|results| results.get(key))
    }

    /// Counts items across the whole subtree
    pub fn item_count(&self) -> usize {
        match self {
            Self::Leaf(buckets) => buckets.iter().map(Vec::len).sum(),
            Self::Branch(results) => results.values().map(ResultTree::item_count).sum(),
        }
    }

    /// Every item of the subtree, branches flattened in order
    pub fn items(&self) -> Vec<&Item> {
        match self {
            Self::Leaf(buckets) => buckets.iter().flatten().collect(),
            Self::Branch(results) => results.values().flat_map(ResultTree::items).collect(),
        }
    }
}
