//! Dendrogram: the merge tree produced by agglomerative clustering.
//!
//! Addressing follows SciPy/MATLAB: leaves are `0..n`, and merge step `i`
//! creates cluster `n + i`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A dendrogram representing hierarchical cluster merges.
///
/// Each merge combines two clusters into one, recording:
/// - Which clusters were merged
/// - The distance at which they merged
/// - The size of the resulting cluster
///
/// Deserialization runs the same addressing checks as
/// [`Dendrogram::from_merges`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DendrogramParts")]
pub struct Dendrogram {
    merges: Vec<Merge>,
    n_items: usize,
}

#[derive(Deserialize)]
struct DendrogramParts {
    merges: Vec<Merge>,
    n_items: usize,
}

impl TryFrom<DendrogramParts> for Dendrogram {
    type Error = Error;

    fn try_from(parts: DendrogramParts) -> Result<Self> {
        Self::from_merges(parts.n_items, parts.merges)
    }
}

/// A single merge operation in the dendrogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// First cluster being merged (the smaller id).
    pub cluster_a: usize,
    /// Second cluster being merged.
    pub cluster_b: usize,
    /// Distance/dissimilarity at which merge occurred.
    pub distance: f64,
    /// Size of resulting cluster.
    pub size: usize,
}

impl Dendrogram {
    /// Create a new dendrogram for n items.
    pub fn new(n_items: usize) -> Self {
        Self {
            merges: Vec::with_capacity(n_items.saturating_sub(1)),
            n_items,
        }
    }

    /// Rebuild a dendrogram from merge records, checking addressing.
    ///
    /// Each merge must reference two distinct, not-yet-merged clusters that
    /// exist at that step, and report the combined size.
    pub fn from_merges(n_items: usize, merges: Vec<Merge>) -> Result<Self> {
        let tree = Self { merges, n_items };
        tree.validate()?;
        Ok(tree)
    }

    /// Check that every merge references two distinct, not-yet-merged
    /// clusters that exist at that step and reports their combined size.
    ///
    /// [`Dendrogram::add_merge`] records without checking; the traversals
    /// (`leaf_order`, the cuts) call this first.
    pub fn validate(&self) -> Result<()> {
        let (n_items, merges) = (self.n_items, &self.merges);
        if merges.len() >= n_items.max(1) {
            return Err(Error::invalid(format!(
                "{} merges for {n_items} items, at most {} allowed",
                merges.len(),
                n_items.saturating_sub(1)
            )));
        }
        let mut sizes: Vec<usize> = vec![1; n_items];
        let mut used: Vec<bool> = vec![false; n_items];
        for (step, m) in merges.iter().enumerate() {
            let existing = n_items + step;
            for c in [m.cluster_a, m.cluster_b] {
                if c >= existing {
                    return Err(Error::invalid(format!(
                        "merge {step} references cluster {c}, only {existing} exist"
                    )));
                }
                if used[c] {
                    return Err(Error::invalid(format!(
                        "merge {step} reuses cluster {c}, which was already merged"
                    )));
                }
            }
            if m.cluster_a == m.cluster_b {
                return Err(Error::invalid(format!(
                    "merge {step} joins cluster {} with itself",
                    m.cluster_a
                )));
            }
            let size = sizes[m.cluster_a] + sizes[m.cluster_b];
            if size != m.size {
                return Err(Error::invalid(format!(
                    "merge {step} reports size {}, children sum to {size}",
                    m.size
                )));
            }
            used[m.cluster_a] = true;
            used[m.cluster_b] = true;
            sizes.push(size);
            used.push(false);
        }
        Ok(())
    }

    /// Record a merge operation.
    pub fn add_merge(&mut self, cluster_a: usize, cluster_b: usize, distance: f64, size: usize) {
        self.merges.push(Merge {
            cluster_a,
            cluster_b,
            distance,
            size,
        });
    }

    /// True once `n_items - 1` merges joined everything into one root.
    pub fn is_complete(&self) -> bool {
        self.n_items > 0 && self.merges.len() == self.n_items - 1
    }

    /// True if no merge is lower than an earlier one.
    pub fn is_monotonic(&self) -> bool {
        self.merges.windows(2).all(|w| w[1].distance >= w[0].distance)
    }

    /// Get cluster assignments at a given distance threshold.
    ///
    /// All merges with distance > threshold are "cut", producing
    /// separate clusters. Labels are consecutive, in order of each
    /// cluster's first item.
    pub fn cut_at_distance(&self, threshold: f64) -> Result<Vec<usize>> {
        self.validate()?;
        let take = self
            .merges
            .iter()
            .filter(|m| m.distance <= threshold)
            .count();
        Ok(self.assignments_after(take))
    }

    /// Get cluster assignments for k clusters.
    ///
    /// Applies the first `n - k` merges; `k == 0` or `k > n` leaves every
    /// item on its own.
    pub fn cut_to_k(&self, k: usize) -> Result<Vec<usize>> {
        self.validate()?;
        if k == 0 || k > self.n_items {
            return Ok((0..self.n_items).collect());
        }
        let n_merges = self.n_items - k;
        if n_merges > self.merges.len() {
            return Err(Error::invalid(format!(
                "cannot cut to {k} clusters: tree has only {} of {} merges",
                self.merges.len(),
                self.n_items.saturating_sub(1)
            )));
        }
        Ok(self.assignments_after(n_merges))
    }

    /// Union the first `take` merges and label items by their root.
    fn assignments_after(&self, take: usize) -> Vec<usize> {
        let total = self.n_items + self.merges.len();
        // parent[c] = cluster that absorbed c
        let mut parent: Vec<usize> = (0..total).collect();
        for (i, m) in self.merges.iter().take(take).enumerate() {
            let new_id = self.n_items + i;
            parent[m.cluster_a] = new_id;
            parent[m.cluster_b] = new_id;
        }

        let mut root_label: Vec<Option<usize>> = vec![None; total];
        let mut next = 0;
        (0..self.n_items)
            .map(|item| {
                let mut c = item;
                while parent[c] != c {
                    c = parent[c];
                }
                *root_label[c].get_or_insert_with(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect()
    }

    /// Leaves in display order: depth-first from the root, `cluster_a`
    /// before `cluster_b` (SciPy `dendrogram` leaf order).
    ///
    /// Trees with several roots (incomplete merges) list each root's
    /// leaves in order of the root's smallest leaf.
    pub fn leaf_order(&self) -> Result<Vec<usize>> {
        self.validate()?;
        let n = self.n_items;
        let mut is_child = vec![false; n + self.merges.len()];
        for m in &self.merges {
            is_child[m.cluster_a] = true;
            is_child[m.cluster_b] = true;
        }
        // Newest roots first gives the full tree's root for complete trees.
        let mut roots: Vec<usize> = (0..is_child.len()).rev().filter(|&c| !is_child[c]).collect();
        if !self.is_complete() {
            roots.sort_by_key(|&r| self.first_leaf(r));
        }

        let mut order = Vec::with_capacity(n);
        for root in roots {
            let mut stack = vec![root];
            while let Some(c) = stack.pop() {
                if c < n {
                    order.push(c);
                } else {
                    let m = &self.merges[c - n];
                    stack.push(m.cluster_b);
                    stack.push(m.cluster_a);
                }
            }
        }
        Ok(order)
    }

    fn first_leaf(&self, mut c: usize) -> usize {
        while c >= self.n_items {
            c = self.merges[c - self.n_items].cluster_a;
        }
        c
    }

    /// Number of original items.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of merges recorded.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }

    /// Iterate over merges.
    pub fn merges(&self) -> impl Iterator<Item = &Merge> {
        self.merges.iter()
    }

    /// Get the merge distances (for visualization).
    pub fn distances(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance).collect()
    }

    /// Merges as SciPy linkage-matrix rows `[a, b, distance, size]`.
    pub fn to_linkage_rows(&self) -> Vec<[f64; 4]> {
        self.merges
            .iter()
            .map(|m| [m.cluster_a as f64, m.cluster_b as f64, m.distance, m.size as f64])
            .collect()
    }
}
