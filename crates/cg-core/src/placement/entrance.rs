//! Entrance placement: the first chunk, at the origin

use tracing::debug;

use super::Placer;
use crate::chunk::TemplateId;
use crate::error::Result;
use crate::graph::NodeId;
use crate::grid::GridPos;

impl Placer<'_> {
    /// Place a chunk for a node with no placed neighbors at the origin
    ///
    /// The chunk must open on at least one of the node's required sides. A node
    /// with no edges at all takes any compatible (exitless) chunk.
    pub(crate) fn place_entrance(
        &mut self,
        node: NodeId,
        candidates: Vec<TemplateId>,
    ) -> Result<bool> {
        let required = self.graph.unplaced_directions(node)?;
        let mut pool = Vec::with_capacity(candidates.len());
        for id in candidates {
            let template = self.template(id)?;
            let opens = required.iter().any(|&dir| template.exit_count(dir) > 0);
            if required.is_empty() || opens {
                pool.push(id);
            }
        }
        self.rng.shuffle(&mut pool);

        for id in pool {
            let template = self.template(id)?;
            if self.grid.collides(GridPos::ORIGIN, template) {
                continue;
            }
            self.commit(node, GridPos::ORIGIN, id)?;
            return Ok(true);
        }
        debug!(node = %node, "origin is blocked for every entrance candidate");
        Ok(false)
    }
}
