//! Leaf arrangement handed to a dendrogram renderer.

use super::Dendrogram;
use crate::error::{Error, Result};
use crate::matrix::IdentityIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Display category of a leaf label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafCategory {
    /// Listed in the case set (conventionally drawn in red).
    Case,
    /// Everyone else.
    Other,
}

impl fmt::Display for LeafCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafCategory::Case => write!(f, "case"),
            LeafCategory::Other => write!(f, "other"),
        }
    }
}

/// One leaf, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    /// Position in the [`IdentityIndex`] (and matrix row).
    pub index: usize,
    /// Identity label.
    pub id: String,
    /// Label category.
    pub category: LeafCategory,
}

/// Ordered leaves plus merge heights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DendrogramLayout {
    leaves: Vec<Leaf>,
    heights: Vec<f64>,
}

impl DendrogramLayout {
    /// Lay out `tree` with labels from `ids`, marking members of `cases`.
    ///
    /// Case ids that do not appear in `ids` are ignored. A tree whose merges
    /// do not address existing clusters fails with `InvalidInput`.
    pub fn assemble(
        tree: &Dendrogram,
        ids: &IdentityIndex,
        cases: Option<&[String]>,
    ) -> Result<Self> {
        if tree.n_items() != ids.len() {
            return Err(Error::invalid(format!(
                "tree has {} leaves but the identity index has {} entries",
                tree.n_items(),
                ids.len()
            )));
        }
        let cases: HashSet<&str> = cases
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
            .collect();

        let leaves = tree
            .leaf_order()?
            .into_iter()
            .map(|index| {
                let id = ids.as_slice()[index].clone();
                let category = if cases.contains(id.as_str()) {
                    LeafCategory::Case
                } else {
                    LeafCategory::Other
                };
                Leaf { index, id, category }
            })
            .collect();

        Ok(Self {
            leaves,
            heights: tree.distances(),
        })
    }

    /// Leaves in display order.
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Labels in display order.
    pub fn labels(&self) -> Vec<&str> {
        self.leaves.iter().map(|l| l.id.as_str()).collect()
    }

    /// Merge heights, one per merge step.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Number of leaves flagged as cases.
    pub fn n_cases(&self) -> usize {
        self.leaves
            .iter()
            .filter(|l| l.category == LeafCategory::Case)
            .count()
    }
}
