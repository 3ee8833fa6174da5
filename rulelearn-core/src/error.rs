// Typed errors for the parsing and alignment seams.
//
// Pipeline code wraps these in anyhow::Error; callers that need to branch
// on the failure kind can downcast.

use thiserror::Error;

/// Malformed bracket notation. Always fatal for the corpus being read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeParseError {
    #[error("empty tree string")]
    Empty,

    #[error("expected '^' at offset {offset}")]
    MissingOpen { offset: usize },

    #[error("expected '$' at offset {offset}")]
    MissingClose { offset: usize },

    #[error("unterminated tag starting at offset {offset}")]
    UnterminatedTag { offset: usize },

    #[error("unterminated child block starting at offset {offset}")]
    UnterminatedChildren { offset: usize },

    #[error("dangling escape at end of input")]
    DanglingEscape,

    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("trailing input after tree at offset {offset}")]
    TrailingInput { offset: usize },
}

/// Problems merging aligner output into a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentError {
    #[error("{side} word position {position} out of range ({leaves} leaves)")]
    PositionOutOfRange {
        side: &'static str,
        position: usize,
        leaves: usize,
    },

    #[error("aligner returned {got} sentences, corpus has {expected}")]
    SentenceCountMismatch { expected: usize, got: usize },

    #[error("node {index} does not exist ({nodes} nodes)")]
    UnknownNode { index: usize, nodes: usize },

    #[error("virtual node {found} introduced out of order, expected {expected}")]
    UnexpectedVirtualIndex { expected: usize, found: usize },

    #[error("unrecognised aligner token '{token}'")]
    BadToken { token: String },

    #[error("unbalanced '{open}' in aligner output")]
    Unbalanced { open: char },

    #[error("'{open}' list with no current node")]
    NoContext { open: char },

    #[error("node {node} is a leaf and cannot take children")]
    ChildrenOnLeaf { node: usize },

    #[error("node {child} is on the other side from its parent {node}")]
    CrossSideChild { node: usize, child: usize },

    #[error("node {child} is node {node} or one of its ancestors")]
    CyclicChild { node: usize, child: usize },
}

/// Failures of the external aligner processes.
#[derive(Debug, Error)]
pub enum AlignerError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("could not read {program} output: {reason}")]
    Unreadable { program: String, reason: String },

    #[error("sentence {sentence}: internal nodes {unaligned:?} left unaligned")]
    Incomplete { sentence: usize, unaligned: Vec<usize> },
}
