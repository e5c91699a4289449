//! Export view of a finished grid
//!
//! Everything a renderer needs to tile room contents onto one surface:
//! which template sits where, how big it is, and which node owns it.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::chunk::{LoopRole, TemplateId};
use crate::error::Result;
use crate::graph::{Graph, NodeId};
use crate::grid::{ChunkGrid, ChunkId, GridPos};

/// How a room came to be placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomRole {
    Standalone,
    LoopInterior,
    LoopTerminal,
}

impl From<&LoopRole> for RoomRole {
    fn from(role: &LoopRole) -> Self {
        match role {
            LoopRole::Standalone => RoomRole::Standalone,
            LoopRole::Interior => RoomRole::LoopInterior,
            LoopRole::Terminal { .. } => RoomRole::LoopTerminal,
        }
    }
}

/// One occupied grid position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedRoom {
    pub chunk: ChunkId,
    pub template: TemplateId,
    pub name: String,
    /// Top-left corner in grid units
    pub position: GridPos,
    /// Size in grid units
    pub c_width: i32,
    pub c_height: i32,
    /// Owning node; loop interior pieces have none
    pub node: Option<NodeId>,
    pub role: RoomRole,
}

/// Smallest grid-unit rectangle covering every room (max is exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: GridPos,
    pub max: GridPos,
}

impl Bounds {
    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }
}

/// All placed rooms of a generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub chunk_size: u32,
    pub rooms: Vec<PlacedRoom>,
}

impl Layout {
    pub fn from_grid(grid: &ChunkGrid, graph: &Graph, chunk_size: u32) -> Self {
        let owners: HashMap<ChunkId, NodeId> = graph
            .nodes()
            .filter_map(|n| n.chunk.map(|c| (c, n.id())))
            .collect();

        let rooms = grid
            .iter()
            .map(|(id, pos, chunk)| PlacedRoom {
                chunk: id,
                template: chunk.template(),
                name: chunk.name().to_string(),
                position: pos,
                c_width: chunk.c_width(),
                c_height: chunk.c_height(),
                node: owners.get(&id).copied(),
                role: RoomRole::from(chunk.role()),
            })
            .collect();

        Self { chunk_size, rooms }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.rooms.first()?;
        let mut bounds = Bounds {
            min: first.position,
            max: first.position + GridPos::new(first.c_width, first.c_height),
        };
        for room in &self.rooms[1..] {
            bounds.min.x = bounds.min.x.min(room.position.x);
            bounds.min.y = bounds.min.y.min(room.position.y);
            bounds.max.x = bounds.max.x.max(room.position.x + room.c_width);
            bounds.max.y = bounds.max.y.max(room.position.y + room.c_height);
        }
        Some(bounds)
    }

    /// Composite surface size in cells
    pub fn cell_size(&self) -> (u32, u32) {
        match self.bounds() {
            Some(b) => (
                b.width() as u32 * self.chunk_size,
                b.height() as u32 * self.chunk_size,
            ),
            None => (0, 0),
        }
    }

    /// Top-left cell of a room on the composite surface
    pub fn cell_origin(&self, room: &PlacedRoom) -> (u32, u32) {
        let min = self.bounds().map_or(GridPos::ORIGIN, |b| b.min);
        let rel = room.position - min;
        (rel.x as u32 * self.chunk_size, rel.y as u32 * self.chunk_size)
    }

    pub fn room_for_node(&self, node: NodeId) -> Option<&PlacedRoom> {
        self.rooms.iter().find(|r| r.node == Some(node))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, Direction};

    fn grid_with_two_rooms() -> (ChunkGrid, Graph) {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        graph.add_adj_both(a, Direction::Right, b).unwrap();

        let mut grid = ChunkGrid::new();
        let wide = Chunk::new(TemplateId(0), "wide", 12, 4, 4);
        let tall = Chunk::new(TemplateId(1), "tall", 4, 8, 4);
        let ca = grid.place(GridPos::new(-1, 0), wide).unwrap();
        let cb = grid.place(GridPos::new(2, -1), tall).unwrap();
        graph.node_mut(a).unwrap().chunk = Some(ca);
        graph.node_mut(b).unwrap().chunk = Some(cb);
        (grid, graph)
    }

    #[test]
    fn test_bounds_and_cell_origin() {
        let (grid, graph) = grid_with_two_rooms();
        let layout = Layout::from_grid(&grid, &graph, 4);
        let bounds = layout.bounds().unwrap();
        assert_eq!(bounds.min, GridPos::new(-1, -1));
        assert_eq!(bounds.max, GridPos::new(3, 1));
        assert_eq!(layout.cell_size(), (16, 8));

        let tall = layout.room_for_node(NodeId(1)).unwrap();
        assert_eq!(layout.cell_origin(tall), (12, 0));
        let wide = layout.room_for_node(NodeId(0)).unwrap();
        assert_eq!(layout.cell_origin(wide), (0, 4));
    }

    #[test]
    fn test_empty_layout() {
        let layout = Layout::from_grid(&ChunkGrid::new(), &Graph::new(), 4);
        assert!(layout.bounds().is_none());
        assert_eq!(layout.cell_size(), (0, 0));
    }

    #[test]
    fn test_json_roundtrip_keeps_roles() {
        let (grid, graph) = grid_with_two_rooms();
        let layout = Layout::from_grid(&grid, &graph, 4);
        let json = layout.to_json().unwrap();
        assert!(json.contains("\"standalone\""));
        let back: Layout = serde_json::from_str(&json).unwrap();
        assert_eq!(back, layout);
    }
}
