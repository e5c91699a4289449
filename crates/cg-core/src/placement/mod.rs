//! Chunk placement strategies
//!
//! Which strategy runs depends on how many of the node's graph neighbors
//! already hold a chunk:
//! - 0: entrance, placed at the origin
//! - 1: single anchor, extend from the neighbor's free exit
//! - 2 (on a degree-2 node): close the loop with a chain of corridor pieces
//! - otherwise: one chunk that meets every placed neighbor at once
//!
//! Every strategy returns `Ok(false)` when nothing fits; that is the signal
//! for the controller to backtrack. Errors are reserved for broken
//! invariants and the step ceiling.

mod entrance;
mod loop_close;
mod multi;
mod single;

use tracing::{debug, warn};

use crate::chunk::{Catalog, Chunk, Direction, ExitRef, TemplateId};
use crate::error::{GenError, Result};
use crate::generator::StepBudget;
use crate::graph::{Graph, Node, NodeId};
use crate::grid::{ChunkGrid, ChunkId, GridPos};
use crate::rng::GenRng;

/// Can `chunk` stand in for `node`?
///
/// Total and per-direction exit counts must equal the node's edge counts, and
/// the template must not have been rejected at this node before.
pub fn is_compatible(node: &Node, chunk: &Chunk) -> bool {
    chunk.num_exits() == node.degree()
        && Direction::ALL
            .iter()
            .all(|&dir| chunk.exit_count(dir) == node.edge_count(dir))
        && !node.search.bad_chunks.contains(&chunk.template())
}

/// Mutable view of the search state a single placement works on
pub struct Placer<'a> {
    pub graph: &'a mut Graph,
    pub grid: &'a mut ChunkGrid,
    pub catalog: &'a Catalog,
    pub rng: &'a mut GenRng,
    pub budget: &'a mut StepBudget,
}

impl<'a> Placer<'a> {
    /// Try to give `node` a chunk; `Ok(false)` means no fit was found
    pub fn place(&mut self, node: NodeId) -> Result<bool> {
        let placed = self.graph.placed_neighbors(node)?;
        let candidates = self.candidates(node)?;
        if candidates.is_empty() {
            warn!(node = %node, "no compatible chunk left");
            return Ok(false);
        }

        let degree = self.graph.node(node)?.degree();
        debug!(node = %node, placed = placed.len(), candidates = candidates.len(), "placing");
        match placed.as_slice() {
            [] => self.place_entrance(node, candidates),
            [anchor] => self.place_single_anchor(node, *anchor, candidates),
            [a, b] if degree == 2 => self.close_loop(node, *a, *b, &candidates),
            _ => self.place_multi_anchor(node, &placed, candidates),
        }
    }

    /// Templates that satisfy [`is_compatible`] for `node`, in catalogue order
    pub fn candidates(&self, node: NodeId) -> Result<Vec<TemplateId>> {
        let node = self.graph.node(node)?;
        Ok(self
            .catalog
            .iter()
            .filter(|(_, chunk)| is_compatible(node, chunk))
            .map(|(id, _)| id)
            .collect())
    }

    fn template(&self, id: TemplateId) -> Result<&'a Chunk> {
        let catalog: &'a Catalog = self.catalog;
        catalog.get(id).ok_or_else(|| GenError::InvalidChunk {
            name: id.to_string(),
            reason: "not in catalogue".to_string(),
        })
    }

    /// Chunk of a node the caller knows to be placed
    fn chunk_of(&self, node: NodeId) -> Result<ChunkId> {
        let Some(chunk) = self.graph.node(node)?.chunk else {
            let msg = format!("node {node} was expected to hold a chunk");
            return Err(GenError::InvalidGraph(msg));
        };
        Ok(chunk)
    }

    /// Pick one free exit of `neighbor` facing `direction` toward `node`
    fn free_exit_toward(
        &mut self,
        node: NodeId,
        neighbor: NodeId,
        direction: Direction,
    ) -> Result<(ChunkId, ExitRef)> {
        let chunk = self.chunk_of(neighbor)?;
        let free = self.grid.chunk(chunk)?.unbound_exits(direction);
        match self.rng.choose(&free) {
            Some(&exit) => Ok((chunk, exit)),
            None => Err(GenError::NoUnboundExit {
                node,
                neighbor,
                direction,
            }),
        }
    }

    /// Place a fresh copy of a template for `node`
    fn commit(&mut self, node: NodeId, pos: GridPos, template: TemplateId) -> Result<ChunkId> {
        let chunk = self.template(template)?.instantiate();
        let name = chunk.name().to_string();
        let id = self.grid.place(pos, chunk)?;
        self.graph.node_mut(node)?.chunk = Some(id);
        debug!(node = %node, chunk = %id, room = %name, pos = %pos, "chunk placed");
        Ok(id)
    }

    /// Bind both ends of the `node`/`other` link to their graph edges
    fn bind_pair(
        &mut self,
        node: NodeId,
        node_chunk: ChunkId,
        node_exit: ExitRef,
        other: NodeId,
        other_chunk: ChunkId,
        other_exit: ExitRef,
    ) -> Result<()> {
        let here = self.graph.edge_between(node, other)?;
        let there = self.graph.edge_between(other, node)?;
        self.grid.chunk_mut(node_chunk)?.bind(node_exit, here);
        self.grid.chunk_mut(other_chunk)?.bind(other_exit, there);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkSpec;

    #[test]
    fn test_is_compatible_counts_and_bad_set() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let c = graph.add_node();
        graph.add_adj_both(a, Direction::Right, b).unwrap();
        graph.add_adj_both(a, Direction::Down, c).unwrap();

        let specs = [
            ChunkSpec::new("fits", 8, 8)
                .exit(Direction::Right, 1)
                .exit(Direction::Down, 0),
            ChunkSpec::new("wrong side", 8, 8)
                .exit(Direction::Left, 1)
                .exit(Direction::Down, 0),
            ChunkSpec::new("too many", 8, 8)
                .exit(Direction::Right, 1)
                .exit(Direction::Down, 0)
                .exit(Direction::Up, 0),
        ];
        let catalog = Catalog::from_specs(&specs, 4).unwrap();
        let node = graph.node(a).unwrap();
        let fits: Vec<_> = catalog
            .iter()
            .filter(|(_, c)| is_compatible(node, c))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(fits, vec![TemplateId(0)]);

        let search = &mut graph.node_mut(a).unwrap().search;
        search.bad_chunks.insert(TemplateId(0));
        let node = graph.node(a).unwrap();
        assert!(!catalog.iter().any(|(_, c)| is_compatible(node, c)));
    }
}
