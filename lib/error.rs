//! Shrike Error types.

use thiserror::Error;

/// Everything that can go wrong in a Shrike analysis.
#[derive(Debug, Error)]
pub enum Error {
    /// An error in an analysis.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// An edge was not found in a graph.
    #[error("The edge with head {0} and tail {1} does not exist in the graph")]
    GraphEdgeNotFound(usize, usize),

    /// A vertex was not found in a graph.
    #[error("The vertex id {0} does not exist in the graph")]
    GraphVertexNotFound(usize),

    /// A vertex with this index already exists in a graph.
    #[error("A vertex with id {0} already exists in the graph")]
    GraphDuplicateVertex(usize),

    /// An edge with these indices already exists in a graph.
    #[error("An edge with head {0} and tail {1} already exists in the graph")]
    GraphDuplicateEdge(usize, usize),

    /// The program handed to an analysis is internally inconsistent.
    /// Analyses treat this as fatal and abort.
    #[error("IR inconsistency: {0}")]
    IrInconsistency(String),

    /// An analysis requires an entry method and the program has none.
    #[error("Program has no entry method")]
    NoEntryMethod,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
