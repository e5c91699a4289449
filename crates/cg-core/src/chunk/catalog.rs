//! Room catalogue
//!
//! The ingestion side hands over rooms as [`ChunkSpec`] records (cell
//! dimensions plus exit list). The catalogue validates them once and keeps the
//! resulting templates; placement only ever copies from here.

use std::path::Path;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use super::{Chunk, Direction, TemplateId};
use crate::config::GeneratorConfig;
use crate::error::{GenError, Result};

/// One exit as authored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitSpec {
    pub direction: Direction,
    /// Grid-unit offset along the edge; negative counts from the far end
    pub pos: i32,
}

/// A room as produced by the room-ingestion step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpec {
    pub name: String,
    /// Width in cells
    pub width: u32,
    /// Height in cells
    pub height: u32,
    #[serde(default)]
    pub exits: Vec<ExitSpec>,
}

impl ChunkSpec {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            exits: Vec::new(),
        }
    }

    /// Builder-style exit append
    pub fn exit(mut self, direction: Direction, pos: i32) -> Self {
        self.exits.push(ExitSpec { direction, pos });
        self
    }
}

/// Validated chunk templates
#[derive(Debug, Clone)]
pub struct Catalog {
    chunk_size: u32,
    templates: Vec<Chunk>,
}

impl Catalog {
    pub fn new(chunk_size: u32) -> Self {
        Self {
            chunk_size,
            templates: Vec::new(),
        }
    }

    pub fn from_specs(specs: &[ChunkSpec], chunk_size: u32) -> Result<Self> {
        let mut catalog = Self::new(chunk_size);
        for spec in specs {
            catalog.add(spec)?;
        }
        Ok(catalog)
    }

    /// Parse a JSON array of [`ChunkSpec`]
    pub fn from_json_str(json: &str, chunk_size: u32) -> Result<Self> {
        let specs: Vec<ChunkSpec> = serde_json::from_str(json)?;
        Self::from_specs(&specs, chunk_size)
    }

    pub fn from_path(path: impl AsRef<Path>, chunk_size: u32) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text, chunk_size)
    }

    /// Build the catalogue a run with `config` expects, mirrors included if asked
    pub fn for_config(specs: &[ChunkSpec], config: &GeneratorConfig) -> Result<Self> {
        let catalog = Self::from_specs(specs, config.chunk_size)?;
        if config.mirror_rooms {
            Ok(catalog.with_mirrors())
        } else {
            Ok(catalog)
        }
    }

    /// Validate a spec and add it as a new template
    pub fn add(&mut self, spec: &ChunkSpec) -> Result<TemplateId> {
        let invalid = |reason: String| GenError::InvalidChunk {
            name: spec.name.clone(),
            reason,
        };

        if self.chunk_size == 0 {
            return Err(invalid("chunk size is zero".to_string()));
        }

        let id = TemplateId(self.templates.len() as u32);
        let mut chunk = Chunk::new(
            id,
            spec.name.clone(),
            spec.width,
            spec.height,
            self.chunk_size,
        );
        if chunk.c_width() <= 0 || chunk.c_height() <= 0 {
            return Err(invalid(format!(
                "{}x{} cells is smaller than one {}-cell grid unit",
                spec.width, spec.height, self.chunk_size
            )));
        }

        let mut seen = HashSet::new();
        for exit in &spec.exits {
            let extent = chunk.edge_length(exit.direction);
            let pos = if exit.pos < 0 {
                extent + exit.pos
            } else {
                exit.pos
            };
            if !(0..extent).contains(&pos) {
                return Err(invalid(format!(
                    "{} exit at {} is outside an edge of length {}",
                    exit.direction, exit.pos, extent
                )));
            }
            if !seen.insert((exit.direction, pos)) {
                return Err(invalid(format!(
                    "duplicate {} exit at {}",
                    exit.direction, pos
                )));
            }
            chunk.push_exit(exit.direction, pos);
        }

        self.templates.push(chunk);
        Ok(id)
    }

    /// Add a left/right flipped copy of every current template
    pub fn with_mirrors(mut self) -> Self {
        let originals = self.templates.len();
        for i in 0..originals {
            let id = TemplateId(self.templates.len() as u32);
            let flipped = self.templates[i].mirrored(id);
            self.templates.push(flipped);
        }
        self
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn get(&self, id: TemplateId) -> Option<&Chunk> {
        self.templates.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &Chunk)> {
        self.templates.iter().map(|c| (c.template(), c))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
