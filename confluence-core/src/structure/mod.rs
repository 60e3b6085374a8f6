//! Market structure: fractal swings and the labeled structural history.
//!
//! Both stages are recomputed from scratch on every call; nothing here keeps
//! state between invocations.

pub mod labeler;
pub mod swings;

pub use labeler::{label_structure, trend_vote, StructureAnalysis};
pub use swings::{filter_significant_swings, find_swings};
