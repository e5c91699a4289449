//! Single-anchor placement: extend from one placed neighbor

use tracing::debug;

use super::Placer;
use crate::chunk::{ExitRef, TemplateId};
use crate::error::{GenError, Result};
use crate::graph::NodeId;
use crate::grid::ChunkGrid;

impl Placer<'_> {
    /// Attach a chunk for `node` to one free exit of its only placed neighbor
    ///
    /// Candidates are tried in random order and the first one that does not
    /// collide is committed.
    pub(crate) fn place_single_anchor(
        &mut self,
        node: NodeId,
        anchor: NodeId,
        mut candidates: Vec<TemplateId>,
    ) -> Result<bool> {
        let direction = self.graph.direction_to(anchor, node)?;
        let (anchor_chunk, anchor_exit) = self.free_exit_toward(node, anchor, direction)?;
        let anchor_pos = self.grid.position(anchor_chunk)?;

        self.rng.shuffle(&mut candidates);
        for id in candidates {
            let template = self.template(id)?;
            let backs: Vec<ExitRef> = template.exit_refs(direction.opposite()).collect();
            let Some(&back) = self.rng.choose(&backs) else {
                continue;
            };

            let pos = {
                let neighbor = self.grid.chunk(anchor_chunk)?;
                let exits = (neighbor.exit(anchor_exit), template.exit(back));
                let (Some(n_exit), Some(c_exit)) = exits else {
                    return Err(GenError::UnknownChunk(anchor_chunk));
                };
                ChunkGrid::resolve_offset_for_neighbor(
                    direction,
                    anchor_pos,
                    neighbor,
                    n_exit,
                    template,
                    c_exit,
                )
            };
            if self.grid.collides(pos, template) {
                continue;
            }

            let chunk = self.commit(node, pos, id)?;
            self.bind_pair(node, chunk, back, anchor, anchor_chunk, anchor_exit)?;
            return Ok(true);
        }

        debug!(node = %node, anchor = %anchor, "no candidate fits against the anchor");
        Ok(false)
    }
}
