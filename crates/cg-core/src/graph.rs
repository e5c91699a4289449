//! Abstract connectivity graph
//!
//! Nodes and edges live in arenas addressed by [`NodeId`] / [`EdgeId`].
//! Edges are directed; an undirected link is two edges added by
//! [`Graph::add_adj_both`]. Besides topology each node carries the search
//! state the backtracking controller keeps for it (assigned chunk, search-tree
//! parent and children, rejected templates, retry counter).

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::chunk::{Direction, TemplateId};
use crate::error::{GenError, Result};
use crate::grid::ChunkId;

/// Index of a node in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of an edge in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

/// Directed link: `to` lies in `direction` from `from`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub direction: Direction,
    pub from: NodeId,
    pub to: NodeId,
}

/// Backtracking bookkeeping for one node
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Node that enqueued this one in the search tree
    pub parent: Option<NodeId>,
    /// Nodes this one enqueued
    pub children: BTreeSet<NodeId>,
    /// Templates already rejected at this node
    pub bad_chunks: HashSet<TemplateId>,
    /// Local re-attempts since the last reset
    pub retries: u32,
}

/// Graph vertex
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    /// Neighbor -> edge leading to it
    adj: BTreeMap<NodeId, EdgeId>,
    /// Outgoing edges per direction
    edges: [Vec<EdgeId>; 4],
    /// Chunk currently assigned, present exactly while placed
    pub chunk: Option<ChunkId>,
    pub search: SearchState,
}

impl Node {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            adj: BTreeMap::new(),
            edges: Default::default(),
            chunk: None,
            search: SearchState::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_placed(&self) -> bool {
        self.chunk.is_some()
    }

    /// Neighbors in ascending id order
    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adj.keys().copied()
    }

    pub fn edge_to(&self, node: NodeId) -> Option<EdgeId> {
        self.adj.get(&node).copied()
    }

    pub fn degree(&self) -> usize {
        self.adj.len()
    }

    pub fn edge_count(&self, direction: Direction) -> usize {
        self.edges[direction.index()].len()
    }

    pub fn edges(&self, direction: Direction) -> &[EdgeId] {
        &self.edges[direction.index()]
    }
}

/// Connectivity graph with a designated entrance
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    entrance: Option<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; ids are assigned in insertion order
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(id));
        id
    }

    /// Add the directed edge `from -> to`, heading `direction`
    pub fn add_adj(&mut self, from: NodeId, direction: Direction, to: NodeId) -> Result<EdgeId> {
        self.node(to)?;
        if from == to {
            return Err(GenError::InvalidGraph(format!(
                "node {from} linked to itself"
            )));
        }
        if self.node(from)?.adj.contains_key(&to) {
            return Err(GenError::InvalidGraph(format!(
                "node {from} already links to {to}"
            )));
        }
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            direction,
            from,
            to,
        });
        let node = self.node_mut(from)?;
        node.adj.insert(to, id);
        node.edges[direction.index()].push(id);
        Ok(id)
    }

    /// Add `from -> to` and its reverse
    pub fn add_adj_both(
        &mut self,
        from: NodeId,
        direction: Direction,
        to: NodeId,
    ) -> Result<(EdgeId, EdgeId)> {
        let forward = self.add_adj(from, direction, to)?;
        let back = self.add_adj(to, direction.opposite(), from)?;
        Ok((forward, back))
    }

    /// Drop the edge `from -> to`; the edge record stays in the arena
    pub fn remove_adj(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        let node = self.node_mut(from)?;
        let edge = node.adj.remove(&to).ok_or_else(|| no_link(from, to))?;
        for side in node.edges.iter_mut() {
            side.retain(|&e| e != edge);
        }
        Ok(())
    }

    pub fn remove_adj_both(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        self.remove_adj(a, b)?;
        self.remove_adj(b, a)
    }

    pub fn set_entrance(&mut self, node: NodeId) -> Result<()> {
        self.node(node)?;
        self.entrance = Some(node);
        Ok(())
    }

    pub fn entrance(&self) -> Option<NodeId> {
        self.entrance
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(GenError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(GenError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0 as usize)
    }

    /// Edge from `from` to `to`
    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Result<EdgeId> {
        self.node(from)?
            .edge_to(to)
            .ok_or_else(|| no_link(from, to))
    }

    /// Heading of the edge from `from` to `to`
    pub fn direction_to(&self, from: NodeId, to: NodeId) -> Result<Direction> {
        let edge = self.edge_between(from, to)?;
        let Some(e) = self.edge(edge) else {
            let msg = format!("dangling edge {} from node {from}", edge.0);
            return Err(GenError::InvalidGraph(msg));
        };
        Ok(e.direction)
    }

    pub fn neighbors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.node(id)?.neighbors().collect())
    }

    /// Neighbors that currently hold a chunk
    pub fn placed_neighbors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let node = self.node(id)?;
        Ok(node.neighbors().filter(|&n| self.is_placed(n)).collect())
    }

    fn is_placed(&self, id: NodeId) -> bool {
        self.nodes.get(id.0 as usize).is_some_and(Node::is_placed)
    }

    /// Headings of edges leading to nodes without a chunk
    pub fn unplaced_directions(&self, id: NodeId) -> Result<BTreeSet<Direction>> {
        let node = self.node(id)?;
        let mut dirs = BTreeSet::new();
        for (&other, &edge) in &node.adj {
            if !self.is_placed(other) && let Some(e) = self.edge(edge) {
                dirs.insert(e.direction);
            }
        }
        Ok(dirs)
    }

    /// Forget all placements and search state
    pub fn reset_search(&mut self) {
        for node in &mut self.nodes {
            node.chunk = None;
            node.search = SearchState::default();
        }
    }

    pub fn from_spec(spec: &GraphSpec) -> Result<Self> {
        let mut graph = Graph::new();
        for _ in 0..spec.nodes {
            graph.add_node();
        }
        for link in &spec.links {
            let (from, to) = (NodeId(link.from), NodeId(link.to));
            if spec.undirected {
                graph.add_adj_both(from, link.direction, to)?;
            } else {
                graph.add_adj(from, link.direction, to)?;
            }
        }
        graph.set_entrance(NodeId(spec.entrance))?;
        Ok(graph)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let spec: GraphSpec = serde_json::from_str(json)?;
        Self::from_spec(&spec)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// One authored link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub from: u32,
    pub direction: Direction,
    pub to: u32,
}

/// Graph as delivered by the topology step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub nodes: u32,
    pub entrance: u32,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
    /// Insert the reverse of every link
    #[serde(default = "default_undirected")]
    pub undirected: bool,
}

fn default_undirected() -> bool {
    true
}

fn no_link(from: NodeId, to: NodeId) -> GenError {
    GenError::InvalidGraph(format!("node {from} has no link to {to}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> (Graph, NodeId, NodeId, NodeId) {
        let mut g = Graph::new();
        let a = g.add_node();
        let b = g.add_node();
        let c = g.add_node();
        g.add_adj_both(a, Direction::Right, b).unwrap();
        g.add_adj_both(b, Direction::Down, c).unwrap();
        g.set_entrance(a).unwrap();
        (g, a, b, c)
    }

    #[test]
    fn test_ids_follow_insertion() {
        let (g, a, b, c) = line();
        assert_eq!((a, b, c), (NodeId(0), NodeId(1), NodeId(2)));
        assert_eq!(g.len(), 3);
        assert_eq!(g.entrance(), Some(a));
    }

    #[test]
    fn test_both_inserts_reverse() {
        let (g, a, b, c) = line();
        assert_eq!(g.direction_to(a, b).unwrap(), Direction::Right);
        assert_eq!(g.direction_to(b, a).unwrap(), Direction::Left);
        assert_eq!(g.direction_to(c, b).unwrap(), Direction::Up);
        let node_b = g.node(b).unwrap();
        assert_eq!(node_b.degree(), 2);
        assert_eq!(node_b.edge_count(Direction::Left), 1);
        assert_eq!(node_b.edge_count(Direction::Down), 1);
        assert_eq!(node_b.edge_count(Direction::Up), 0);
    }

    #[test]
    fn test_remove_adj_both() {
        let (mut g, _, b, c) = line();
        g.remove_adj_both(b, c).unwrap();
        assert_eq!(g.node(b).unwrap().degree(), 1);
        assert_eq!(g.node(c).unwrap().degree(), 0);
        assert_eq!(g.node(b).unwrap().edge_count(Direction::Down), 0);
        assert!(g.remove_adj(b, c).is_err());
    }

    #[test]
    fn test_rejects_duplicate_and_self_links() {
        let (mut g, a, b, _) = line();
        assert!(g.add_adj(a, Direction::Up, b).is_err());
        assert!(g.add_adj(a, Direction::Up, a).is_err());
        assert!(matches!(
            g.add_adj(a, Direction::Up, NodeId(99)),
            Err(GenError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_unplaced_directions_track_chunks() {
        let (mut g, a, b, c) = line();
        let dirs = g.unplaced_directions(b).unwrap();
        assert!(dirs.contains(&Direction::Left));
        assert!(dirs.contains(&Direction::Down));

        g.node_mut(a).unwrap().chunk = Some(ChunkId(0));
        let dirs = g.unplaced_directions(b).unwrap();
        assert_eq!(dirs.into_iter().collect::<Vec<_>>(), vec![Direction::Down]);
        assert_eq!(g.placed_neighbors(b).unwrap(), vec![a]);
        assert!(g.placed_neighbors(c).unwrap().is_empty());
    }

    #[test]
    fn test_from_spec_json() {
        let json = r#"{
            "nodes": 2, "entrance": 1,
            "links": [ { "from": 0, "direction": "up", "to": 1 } ]
        }"#;
        let g = Graph::from_json_str(json).unwrap();
        assert_eq!(g.entrance(), Some(NodeId(1)));
        assert_eq!(
            g.direction_to(NodeId(1), NodeId(0)).unwrap(),
            Direction::Down
        );
    }

    #[test]
    fn test_from_spec_rejects_bad_index() {
        let spec = GraphSpec {
            nodes: 1,
            entrance: 3,
            links: vec![],
            undirected: true,
        };
        assert!(Graph::from_spec(&spec).is_err());
    }
}
