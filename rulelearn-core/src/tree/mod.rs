//! Tree model
//!
//! `Lu` is the parsed, owned form of the bracket notation. `Sentence`
//! flattens a source/target pair into one indexed node list that the
//! aligners and the rule extractor work on.

pub mod lu;
pub mod sentence;

pub use lu::{Lu, Reading};
pub use sentence::{Node, Sentence, Subtree};
