//! Backtracking controller
//!
//! Places nodes depth-first from the entrance. Every node that gets a chunk
//! pushes its unplaced neighbors onto a LIFO frontier and becomes their parent
//! in the search tree. When a node cannot be placed its parent is retried:
//! the parent's chunk is released (and its template marked bad for it), its
//! whole subtree is reset, and the parent goes back on the frontier. A parent
//! that has used up its local retries passes the retry up to its own parent.
//! The run fails when the entrance itself cannot be placed.

use tracing::{debug, info, trace, warn};

use crate::chunk::{Catalog, LoopRole};
use crate::config::GeneratorConfig;
use crate::error::{GenError, Result};
use crate::graph::{Graph, NodeId};
use crate::grid::ChunkGrid;
use crate::layout::Layout;
use crate::placement::Placer;
use crate::rng::GenRng;

/// Global ceiling on search work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudget {
    limit: u32,
    used: u32,
}

impl StepBudget {
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Spend one step; fails once the limit is passed
    pub fn tick(&mut self) -> Result<()> {
        if self.used >= self.limit {
            return Err(GenError::StepLimitExceeded { limit: self.limit });
        }
        self.used += 1;
        Ok(())
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit - self.used
    }
}

/// Result of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Every node reachable from the entrance holds a chunk
    Complete(Layout),
    /// Backtracking ran out of options at the entrance
    Exhausted { steps: u32 },
}

impl GenerationOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, GenerationOutcome::Complete(_))
    }

    pub fn layout(&self) -> Option<&Layout> {
        match self {
            GenerationOutcome::Complete(layout) => Some(layout),
            GenerationOutcome::Exhausted { .. } => None,
        }
    }
}

/// State after a single controller step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Working,
    Complete,
    Exhausted,
}

/// Drives placement node by node and backtracks on failure
#[derive(Debug)]
pub struct Generator<'c> {
    graph: Graph,
    grid: ChunkGrid,
    catalog: &'c Catalog,
    rng: GenRng,
    config: GeneratorConfig,
    frontier: Vec<NodeId>,
    budget: StepBudget,
}

impl<'c> Generator<'c> {
    /// Set up a run, seeding the RNG from the config
    pub fn new(graph: Graph, catalog: &'c Catalog, config: GeneratorConfig) -> Result<Self> {
        let rng = config.make_rng();
        Self::with_rng(graph, catalog, config, rng)
    }

    pub fn with_rng(
        mut graph: Graph,
        catalog: &'c Catalog,
        config: GeneratorConfig,
        rng: GenRng,
    ) -> Result<Self> {
        config.validate()?;
        if catalog.chunk_size() != config.chunk_size {
            return Err(GenError::InvalidConfig(format!(
                "catalogue uses {}-cell chunks but config asks for {}",
                catalog.chunk_size(),
                config.chunk_size
            )));
        }
        let entrance = graph.entrance().ok_or(GenError::MissingEntrance)?;
        graph.reset_search();

        let budget = StepBudget::new(config.step_limit);
        Ok(Self {
            graph,
            grid: ChunkGrid::new(),
            catalog,
            rng,
            config,
            frontier: vec![entrance],
            budget,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn grid(&self) -> &ChunkGrid {
        &self.grid
    }

    pub fn frontier(&self) -> &[NodeId] {
        &self.frontier
    }

    pub fn steps(&self) -> u32 {
        self.budget.used()
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn into_parts(self) -> (Graph, ChunkGrid) {
        (self.graph, self.grid)
    }

    /// Export view of the current grid
    pub fn layout(&self) -> Layout {
        Layout::from_grid(&self.grid, &self.graph, self.catalog.chunk_size())
    }

    /// Run until the frontier empties or the entrance gives up
    pub fn run(&mut self) -> Result<GenerationOutcome> {
        info!(
            nodes = self.graph.len(),
            templates = self.catalog.len(),
            seed = self.rng.seed(),
            "generation started"
        );
        loop {
            match self.step()? {
                Progress::Working => {}
                Progress::Complete => {
                    info!(
                        steps = self.steps(),
                        chunks = self.grid.len(),
                        "generation complete"
                    );
                    return Ok(GenerationOutcome::Complete(self.layout()));
                }
                Progress::Exhausted => {
                    warn!(
                        steps = self.steps(),
                        "entrance exhausted; no layout for this catalogue"
                    );
                    return Ok(GenerationOutcome::Exhausted {
                        steps: self.steps(),
                    });
                }
            }
        }
    }

    /// Handle one frontier entry
    pub fn step(&mut self) -> Result<Progress> {
        let Some(node) = self.frontier.pop() else {
            return Ok(if self.sweep()? {
                Progress::Working
            } else {
                Progress::Complete
            });
        };
        self.budget.tick()?;

        if self.graph.node(node)?.is_placed() {
            return Ok(Progress::Working);
        }
        let entrance = self.graph.entrance().ok_or(GenError::MissingEntrance)?;
        if node != entrance {
            let placed = self.graph.placed_neighbors(node)?;
            let Some(&first) = placed.first() else {
                // Left behind by a reset; a placed neighbor will enqueue it again
                trace!(node = %node, "skipping orphaned frontier entry");
                return Ok(Progress::Working);
            };
            let parent = self.graph.node(node)?.search.parent;
            if !parent.is_some_and(|p| placed.contains(&p)) {
                self.adopt(first, node)?;
            }
        }

        let placed = Placer {
            graph: &mut self.graph,
            grid: &mut self.grid,
            catalog: self.catalog,
            rng: &mut self.rng,
            budget: &mut self.budget,
        }
        .place(node)?;

        if placed {
            for neighbor in self.graph.neighbors(node)? {
                if !self.graph.node(neighbor)?.is_placed() {
                    self.frontier.push(neighbor);
                    self.adopt(node, neighbor)?;
                }
            }
            return Ok(Progress::Working);
        }

        match self.graph.node(node)?.search.parent {
            Some(parent) => {
                debug!(node = %node, parent = %parent, "placement failed; retrying parent");
                let next = self.retry_node(parent)?;
                self.frontier.push(next);
                Ok(Progress::Working)
            }
            None => Ok(Progress::Exhausted),
        }
    }

    /// Undo `node` for another attempt, escalating once its retries run out
    ///
    /// Returns the node that should go back on the frontier.
    pub fn retry_node(&mut self, node: NodeId) -> Result<NodeId> {
        self.release(node)?;
        let search = &self.graph.node(node)?.search;
        if let Some(parent) = search.parent
            && search.retries >= self.config.retry_limit
        {
            warn!(node = %node, parent = %parent, "retries used up; backtracking to parent");
            let search = &mut self.graph.node_mut(node)?.search;
            search.retries = 0;
            search.bad_chunks.clear();
            return self.retry_node(parent);
        }
        self.graph.node_mut(node)?.search.retries += 1;
        Ok(node)
    }

    /// Undo `node` as part of an ancestor's retry, clearing its retry state
    pub fn reset_node(&mut self, node: NodeId) -> Result<()> {
        self.release(node)?;
        let search = &mut self.graph.node_mut(node)?.search;
        search.retries = 0;
        search.bad_chunks.clear();
        search.parent = None;
        Ok(())
    }

    /// Remove `node`'s chunk, the bindings that point at it, and its subtree
    fn release(&mut self, node: NodeId) -> Result<()> {
        if let Some(id) = self.graph.node_mut(node)?.chunk.take() {
            let chunk = self.grid.unplace(id)?;
            if let LoopRole::Terminal { interior } = chunk.role() {
                for &piece in interior {
                    self.grid.unplace(piece)?;
                }
            }
            if !matches!(chunk.role(), LoopRole::Interior) {
                let search = &mut self.graph.node_mut(node)?.search;
                search.bad_chunks.insert(chunk.template());
            }

            for neighbor in self.graph.neighbors(node)? {
                if let Some(other) = self.graph.node(neighbor)?.chunk {
                    let graph = &self.graph;
                    self.grid
                        .chunk_mut(other)?
                        .clear_bindings(|edge| graph.edge(edge).is_some_and(|e| e.to == node));
                }
            }
            debug!(node = %node, chunk = %id, room = chunk.name(), "chunk released");
        }

        let children = std::mem::take(&mut self.graph.node_mut(node)?.search.children);
        for child in children {
            self.reset_node(child)?;
        }
        Ok(())
    }

    /// Make `parent` the search-tree parent of `child`
    fn adopt(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if parent == child || self.graph.entrance() == Some(child) {
            return Ok(());
        }
        let old = self.graph.node(child)?.search.parent;
        if old == Some(parent) {
            return Ok(());
        }
        if let Some(old) = old {
            self.graph.node_mut(old)?.search.children.remove(&child);
        }
        self.graph.node_mut(child)?.search.parent = Some(parent);
        self.graph.node_mut(parent)?.search.children.insert(child);
        Ok(())
    }

    /// Re-enqueue unplaced nodes bordering placed ones; true if any were found
    fn sweep(&mut self) -> Result<bool> {
        let mut pending = Vec::new();
        for node in self.graph.nodes() {
            if node.is_placed() {
                continue;
            }
            let borders_placed = node
                .neighbors()
                .any(|n| self.graph.node(n).is_ok_and(|n| n.is_placed()));
            if borders_placed {
                pending.push(node.id());
            }
        }
        if !pending.is_empty() {
            debug!(
                count = pending.len(),
                "re-enqueueing nodes stranded by backtracking"
            );
        }
        // Reverse so the lowest id is popped first
        self.frontier.extend(pending.iter().rev());
        Ok(!pending.is_empty())
    }
}

/// Run a complete generation with a fresh search state
pub fn generate(
    graph: Graph,
    catalog: &Catalog,
    config: GeneratorConfig,
) -> Result<GenerationOutcome> {
    Generator::new(graph, catalog, config)?.run()
}
