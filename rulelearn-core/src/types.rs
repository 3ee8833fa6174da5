use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Position of a node in a sentence's flattened node list.
pub type NodeId = usize;

/// One candidate bracketing: an ordered list of child indices.
pub type Grouping = Vec<NodeId>;

/// Word aligner output for one sentence: source leaf position to the
/// target leaf positions it links to. Positions are 0-based within each
/// side's leaf sequence.
pub type WordAlignment = BTreeMap<usize, Vec<usize>>;

/// Parallel token-id sequences for one sentence, as handed to the word aligner.
pub type TokenPair = (Vec<u32>, Vec<u32>);

/// Placeholder tag for nodes without a label of their own.
pub const WILDCARD: &str = "*";

/// Which tree of the sentence pair a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Source language (printed as `L` in aligner notation)
    Left,
    /// Target language (printed as `R`)
    Right,
}

impl Side {
    pub fn marker(self) -> char {
        match self {
            Side::Left => 'L',
            Side::Right => 'R',
        }
    }

    pub fn from_marker(c: char) -> Option<Self> {
        match c {
            'L' => Some(Side::Left),
            'R' => Some(Side::Right),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "source",
            Side::Right => "target",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
