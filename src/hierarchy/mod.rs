//! Merge trees and their presentation.
//!
//! [`Dendrogram`] records the complete merge history of agglomerative
//! clustering:
//!
//! ```text
//!         6 (height=1.0)
//!        / \
//!       4   5 (height=0.7)
//!      / \ / \
//!     0  1 2  3 (leaves)
//! ```
//!
//! Key property: "cut" at any height to get any number of clusters. For
//! pedigree data a low cut separates close families; the root joins
//! everything.
//!
//! [`DendrogramLayout`] is what a renderer consumes: leaves in tree order,
//! each tagged with a display category, plus merge heights.

mod dendrogram;
mod layout;

pub use dendrogram::{Dendrogram, Merge};
pub use layout::{DendrogramLayout, Leaf, LeafCategory};
