//! Alignment assembly
//!
//! Merges word-aligner and tree-aligner output into a [`Sentence`]. The
//! merging itself is written as `impl Sentence` blocks in the submodules.
//!
//! [`Sentence`]: crate::tree::Sentence

pub mod notation;
pub mod tree;
pub mod word;

pub use notation::Item;
pub use word::Vocabulary;
