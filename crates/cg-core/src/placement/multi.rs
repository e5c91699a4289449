//! Multi-anchor placement: one chunk meeting several placed neighbors

use tracing::debug;

use super::Placer;
use crate::chunk::{Direction, ExitRef, TemplateId};
use crate::error::Result;
use crate::graph::NodeId;
use crate::grid::{ChunkGrid, ChunkId, GridPos};

/// A placed neighbor's free exit, pinned to a world position
#[derive(Debug, Clone, Copy)]
struct Anchor {
    neighbor: NodeId,
    /// Heading from the neighbor toward the node being placed
    direction: Direction,
    chunk: ChunkId,
    exit: ExitRef,
    world: GridPos,
}

impl Placer<'_> {
    /// Find a chunk whose exits land on every placed neighbor's free exit
    ///
    /// Each candidate is aligned against each anchor in turn; the remaining
    /// anchors must then line up exactly at that offset.
    pub(crate) fn place_multi_anchor(
        &mut self,
        node: NodeId,
        neighbors: &[NodeId],
        mut candidates: Vec<TemplateId>,
    ) -> Result<bool> {
        let mut anchors = Vec::with_capacity(neighbors.len());
        for &neighbor in neighbors {
            let direction = self.graph.direction_to(neighbor, node)?;
            let (chunk, exit) = self.free_exit_toward(node, neighbor, direction)?;
            let world = self.grid.exit_world_pos(chunk, exit)?;
            anchors.push(Anchor {
                neighbor,
                direction,
                chunk,
                exit,
                world,
            });
        }

        self.rng.shuffle(&mut candidates);
        for id in candidates {
            let template = self.template(id)?;
            for (first, lead) in anchors.iter().enumerate() {
                let faces: Vec<ExitRef> = template.exit_refs(lead.direction.opposite()).collect();
                let Some(&face) = self.rng.choose(&faces) else {
                    continue;
                };
                let Some(face_exit) = template.exit(face) else {
                    continue;
                };
                let pos = lead.world - ChunkGrid::exit_offset(template, face_exit);
                if self.grid.collides(pos, template) {
                    continue;
                }

                // Matches are per trial; a failed anchor choice leaves nothing behind
                let mut matched = vec![(first, face)];
                let others = anchors.iter().enumerate().filter(|&(i, _)| i != first);
                for (i, other) in others {
                    let facing = other.direction.opposite();
                    match template.confirm_match(pos, other.world, facing) {
                        Some(exit) => matched.push((i, exit)),
                        None => break,
                    }
                }
                if matched.len() != anchors.len() {
                    continue;
                }

                let chunk = self.commit(node, pos, id)?;
                for (i, exit) in matched {
                    let a = anchors[i];
                    self.bind_pair(node, chunk, exit, a.neighbor, a.chunk, a.exit)?;
                }
                return Ok(true);
            }
        }

        debug!(node = %node, anchors = anchors.len(), "no candidate meets every anchor");
        Ok(false)
    }
}
