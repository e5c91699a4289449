//! cg-core: chunk placement engine
//!
//! Assigns prefab rooms ("chunks") to the nodes of a connectivity graph so
//! that neighboring rooms meet exit to exit, no two rooms overlap, and every
//! cycle in the graph is closed by a chain of corridor pieces. Room decoding,
//! graph construction and rendering happen elsewhere; this crate only does
//! the search.

pub mod chunk;
pub mod config;
pub mod error;
pub mod generator;
pub mod graph;
pub mod grid;
pub mod layout;
pub mod placement;

mod consts;
mod rng;

pub use chunk::{
    Catalog, Chunk, ChunkSpec, Direction, Exit, ExitRef, ExitSpec, LoopRole, TemplateId,
};
pub use config::GeneratorConfig;
pub use consts::*;
pub use error::{GenError, Result};
pub use generator::{GenerationOutcome, Generator, Progress, StepBudget, generate};
pub use graph::{Edge, EdgeId, Graph, GraphSpec, LinkSpec, Node, NodeId, SearchState};
pub use grid::{ChunkGrid, ChunkId, GridPos};
pub use layout::{Bounds, Layout, PlacedRoom, RoomRole};
pub use rng::GenRng;
