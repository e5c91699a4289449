//! Error types for layout generation
//!
//! Only fatal conditions live here. A strategy that cannot fit a chunk
//! reports `false` and the controller backtracks; a search that runs out of
//! retries at the entrance is a `GenerationOutcome::Exhausted`, not an error.

use thiserror::Error;

use crate::chunk::Direction;
use crate::graph::NodeId;
use crate::grid::{ChunkId, GridPos};

/// Fatal generation errors
#[derive(Debug, Error)]
pub enum GenError {
    #[error("node {neighbor} has no unbound {direction} exit toward adjacent node {node}")]
    NoUnboundExit {
        node: NodeId,
        neighbor: NodeId,
        direction: Direction,
    },

    #[error("loop anchor {neighbor} has {count} unbound {direction} exits, expected exactly one")]
    AmbiguousLoopAnchor {
        neighbor: NodeId,
        direction: Direction,
        count: usize,
    },

    #[error("chunk {0} is not placed on the grid")]
    UnknownChunk(ChunkId),

    #[error("node {0} does not exist in the graph")]
    UnknownNode(NodeId),

    #[error("grid position {0} is already occupied")]
    PositionOccupied(GridPos),

    #[error("graph has no entrance node")]
    MissingEntrance,

    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u32 },

    #[error("invalid chunk '{name}': {reason}")]
    InvalidChunk { name: String, reason: String },

    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenError {
    /// True for errors caused by a corrupted graph or catalogue rather than bad input files
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            GenError::NoUnboundExit { .. }
                | GenError::AmbiguousLoopAnchor { .. }
                | GenError::UnknownChunk(_)
                | GenError::UnknownNode(_)
                | GenError::PositionOccupied(_)
        )
    }
}

/// Convenience type alias for results using [`GenError`]
pub type Result<T> = std::result::Result<T, GenError>;
