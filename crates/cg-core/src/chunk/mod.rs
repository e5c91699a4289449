//! Room/chunk model
//!
//! Prefab room geometry, its exits, and the catalogue of templates that
//! placement copies from.

mod catalog;
mod direction;
mod room;

pub use catalog::{Catalog, ChunkSpec, ExitSpec};
pub use direction::Direction;
pub use room::{Chunk, Exit, ExitRef, LoopRole, TemplateId};
