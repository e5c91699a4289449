//! Loop closing: join two placed neighbors through a chain of corridor pieces
//!
//! The chain starts at the first neighbor's free exit and grows one two-exit
//! chunk at a time. A piece whose far exit lands on the second neighbor's free
//! exit (facing it) closes the loop. Otherwise the chain greedily takes any
//! piece that gets closer to the goal, and drops its last piece when none does.
//! The last piece becomes the node's chunk and owns the pieces before it.

use hashbrown::HashSet;
use tracing::{debug, trace};

use super::Placer;
use crate::chunk::{Chunk, Direction, ExitRef, LoopRole, TemplateId};
use crate::error::{GenError, Result};
use crate::graph::NodeId;
use crate::grid::{ChunkGrid, ChunkId, GridPos};

/// One piece of the chain under construction
#[derive(Debug)]
struct Link {
    /// `None` for the already-placed anchor chunk
    template: Option<TemplateId>,
    chunk: Chunk,
    pos: GridPos,
    /// Exit that attaches to the previous link
    back: Option<ExitRef>,
    /// Exit the next link attaches to
    lead: ExitRef,
    /// Templates that dead-ended after this link
    banned: HashSet<TemplateId>,
}

impl Link {
    fn lead_world(&self) -> Option<GridPos> {
        let exit = self.chunk.exit(self.lead)?;
        Some(self.pos + ChunkGrid::exit_offset(&self.chunk, exit))
    }
}

/// A piece that fits after the current chain tail
struct Extension {
    template: TemplateId,
    pos: GridPos,
    back: ExitRef,
    far: ExitRef,
    far_world: GridPos,
}

impl Placer<'_> {
    /// Close the cycle through `node` between placed neighbors `a` and `b`
    ///
    /// `terminals` are the templates allowed as the node's own chunk; interior
    /// pieces may be any two-exit template in the catalogue.
    pub(crate) fn close_loop(
        &mut self,
        node: NodeId,
        a: NodeId,
        b: NodeId,
        terminals: &[TemplateId],
    ) -> Result<bool> {
        let a_dir = self.graph.direction_to(a, node)?;
        let b_dir = self.graph.direction_to(b, node)?;
        let (a_chunk, a_exit) = self.sole_free_exit(node, a, a_dir)?;
        let (b_chunk, b_exit) = self.sole_free_exit(node, b, b_dir)?;

        let start = self.grid.exit_world_pos(a_chunk, a_exit)?;
        let goal = self.grid.exit_world_pos(b_chunk, b_exit)?;
        // Perpendicular exits can share a corner point and still leave a gap
        if start == goal && a_dir == b_dir.opposite() {
            debug!(node = %node, "anchors already meet; nothing to place between them");
            return Ok(false);
        }

        let arrive = b_dir.opposite();
        let terminals: HashSet<TemplateId> = terminals.iter().copied().collect();
        let pieces: Vec<TemplateId> = self
            .catalog
            .iter()
            .filter(|(_, chunk)| chunk.num_exits() == 2)
            .map(|(id, _)| id)
            .collect();

        let mut chain = vec![Link {
            template: None,
            chunk: self.grid.chunk(a_chunk)?.clone(),
            pos: self.grid.position(a_chunk)?,
            back: None,
            lead: a_exit,
            banned: HashSet::new(),
        }];

        loop {
            self.budget.tick()?;
            let Some(tail) = chain.last() else {
                return Ok(false);
            };
            let lead_dir = tail.lead.direction;
            let lead_world = tail.lead_world().ok_or(GenError::UnknownChunk(a_chunk))?;
            let distance = lead_world.manhattan(goal);
            trace!(
                node = %node,
                links = chain.len(),
                at = %lead_world,
                distance,
                "extending chain"
            );

            let extensions = self.extensions(&chain, &pieces, lead_dir, goal)?;

            let closing = extensions.iter().find(|e| {
                e.far_world == goal && e.far.direction == arrive && terminals.contains(&e.template)
            });
            if let Some(ext) = closing {
                chain.push(self.link(ext)?);
                break;
            }

            let closer = extensions
                .iter()
                .find(|e| e.far_world.manhattan(goal) < distance);
            if let Some(ext) = closer {
                chain.push(self.link(ext)?);
                continue;
            }

            // Dead end: drop the tail and remember it was a bad pick for the link before
            let dropped = chain.pop().and_then(|link| link.template);
            match chain.last_mut() {
                Some(tail) => {
                    if let Some(template) = dropped {
                        tail.banned.insert(template);
                    }
                }
                None => {
                    debug!(node = %node, "loop closing exhausted the chain");
                    return Ok(false);
                }
            }
        }

        self.commit_chain(node, chain, (a, a_chunk, a_exit), (b, b_chunk, b_exit))?;
        Ok(true)
    }

    /// The one free exit of `neighbor` toward `node`; anything else is corrupt state
    fn sole_free_exit(
        &self,
        node: NodeId,
        neighbor: NodeId,
        direction: Direction,
    ) -> Result<(ChunkId, ExitRef)> {
        let chunk = self.chunk_of(neighbor)?;
        let free = self.grid.chunk(chunk)?.unbound_exits(direction);
        match free.as_slice() {
            [exit] => Ok((chunk, *exit)),
            [] => Err(GenError::NoUnboundExit {
                node,
                neighbor,
                direction,
            }),
            _ => Err(GenError::AmbiguousLoopAnchor {
                neighbor,
                direction,
                count: free.len(),
            }),
        }
    }

    /// Non-colliding pieces that attach to the chain's lead exit, in random order
    fn extensions(
        &mut self,
        chain: &[Link],
        pieces: &[TemplateId],
        lead_dir: Direction,
        goal: GridPos,
    ) -> Result<Vec<Extension>> {
        let Some(tail) = chain.last() else {
            return Ok(Vec::new());
        };
        let Some(lead_exit) = tail.chunk.exit(tail.lead) else {
            return Ok(Vec::new());
        };
        let back_dir = lead_dir.opposite();

        let mut pool: Vec<TemplateId> = Vec::new();
        for &id in pieces {
            if !tail.banned.contains(&id) && self.template(id)?.exit_count(back_dir) > 0 {
                pool.push(id);
            }
        }
        self.rng.shuffle(&mut pool);

        let mut found = Vec::new();
        for id in pool {
            let template = self.template(id)?;
            let backs = template.unbound_exits(back_dir);
            let Some(&back) = self.rng.choose(&backs) else {
                continue;
            };
            let Some(back_exit) = template.exit(back) else {
                continue;
            };
            let pos = ChunkGrid::resolve_offset_for_neighbor(
                lead_dir,
                tail.pos,
                &tail.chunk,
                lead_exit,
                template,
                back_exit,
            );

            // The anchor is already on the grid; later links are not yet
            let hits_chain = chain[1..]
                .iter()
                .any(|link| template.overlaps(pos, &link.chunk, link.pos));
            if hits_chain || self.grid.collides(pos, template) {
                continue;
            }

            let Some(far) = template.other_exit(back) else {
                continue;
            };
            let Some(far_exit) = template.exit(far) else {
                continue;
            };
            let far_world = pos + ChunkGrid::exit_offset(template, far_exit);
            trace!(
                room = template.name(),
                pos = %pos,
                far = %far_world,
                goal = %goal,
                "candidate piece"
            );
            found.push(Extension {
                template: id,
                pos,
                back,
                far,
                far_world,
            });
        }
        Ok(found)
    }

    fn link(&self, ext: &Extension) -> Result<Link> {
        Ok(Link {
            template: Some(ext.template),
            chunk: self.template(ext.template)?.instantiate(),
            pos: ext.pos,
            back: Some(ext.back),
            lead: ext.far,
            banned: HashSet::new(),
        })
    }

    /// Put the finished chain on the grid and bind the loop's two links
    fn commit_chain(
        &mut self,
        node: NodeId,
        chain: Vec<Link>,
        (a, a_chunk, a_exit): (NodeId, ChunkId, ExitRef),
        (b, b_chunk, b_exit): (NodeId, ChunkId, ExitRef),
    ) -> Result<()> {
        let mut links = chain.into_iter().skip(1).collect::<Vec<_>>();
        let Some(last) = links.pop() else {
            let msg = format!("loop through node {node} closed without a chunk");
            return Err(GenError::InvalidGraph(msg));
        };

        let mut interior = Vec::with_capacity(links.len());
        for link in links {
            let mut chunk = link.chunk;
            chunk.set_role(LoopRole::Interior);
            interior.push(self.grid.place(link.pos, chunk)?);
        }

        let back = last.back.ok_or(GenError::UnknownChunk(a_chunk))?;
        let far = last.lead;
        let mut chunk = last.chunk;
        let name = chunk.name().to_string();
        let pieces = interior.len();
        chunk.set_role(LoopRole::Terminal { interior });
        let terminal = self.grid.place(last.pos, chunk)?;
        self.graph.node_mut(node)?.chunk = Some(terminal);

        self.bind_pair(node, terminal, back, a, a_chunk, a_exit)?;
        self.bind_pair(node, terminal, far, b, b_chunk, b_exit)?;
        debug!(node = %node, chunk = %terminal, room = %name, interior = pieces, "loop closed");
        Ok(())
    }
}
