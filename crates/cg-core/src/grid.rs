//! Spatial registry of placed chunks
//!
//! Positions are in grid units (one unit = `chunk_size` cells) and name a
//! chunk's top-left corner. The grid owns every placed chunk instance; nodes
//! and loop terminals refer to them by [`ChunkId`].

use core::fmt;
use core::ops::{Add, Sub};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::chunk::{Chunk, Direction, Exit, ExitRef};
use crate::error::{GenError, Result};

/// Handle to a chunk placed on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(pub u32);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Integer point in grid units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const ORIGIN: GridPos = GridPos { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: GridPos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl Add for GridPos {
    type Output = GridPos;

    fn add(self, rhs: GridPos) -> GridPos {
        GridPos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for GridPos {
    type Output = GridPos;

    fn sub(self, rhs: GridPos) -> GridPos {
        GridPos::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Placed chunks, indexed both by handle and by position
#[derive(Debug, Clone, Default)]
pub struct ChunkGrid {
    chunks: HashMap<ChunkId, Chunk>,
    positions: HashMap<ChunkId, GridPos>,
    occupants: HashMap<GridPos, ChunkId>,
    next_id: u32,
}

impl ChunkGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `chunk` with its top-left corner at `pos`
    ///
    /// Callers check [`ChunkGrid::collides`] first; an occupied anchor here means
    /// the search state is corrupt.
    pub fn place(&mut self, pos: GridPos, chunk: Chunk) -> Result<ChunkId> {
        if self.occupants.contains_key(&pos) {
            return Err(GenError::PositionOccupied(pos));
        }
        let id = ChunkId(self.next_id);
        self.next_id += 1;
        self.chunks.insert(id, chunk);
        self.positions.insert(id, pos);
        self.occupants.insert(pos, id);
        Ok(id)
    }

    /// Remove a chunk and hand back the instance
    pub fn unplace(&mut self, id: ChunkId) -> Result<Chunk> {
        let pos = self
            .positions
            .remove(&id)
            .ok_or(GenError::UnknownChunk(id))?;
        self.occupants.remove(&pos);
        self.chunks.remove(&id).ok_or(GenError::UnknownChunk(id))
    }

    /// Would `chunk` at `pos` overlap anything already placed?
    ///
    /// Linear in the number of placed chunks.
    pub fn collides(&self, pos: GridPos, chunk: &Chunk) -> bool {
        self.positions.iter().any(|(id, &other_pos)| {
            self.chunks
                .get(id)
                .is_some_and(|other| chunk.overlaps(pos, other, other_pos))
        })
    }

    pub fn chunk(&self, id: ChunkId) -> Result<&Chunk> {
        self.chunks.get(&id).ok_or(GenError::UnknownChunk(id))
    }

    pub fn chunk_mut(&mut self, id: ChunkId) -> Result<&mut Chunk> {
        self.chunks.get_mut(&id).ok_or(GenError::UnknownChunk(id))
    }

    pub fn position(&self, id: ChunkId) -> Result<GridPos> {
        self.positions
            .get(&id)
            .copied()
            .ok_or(GenError::UnknownChunk(id))
    }

    /// Chunk anchored exactly at `pos`
    pub fn at(&self, pos: GridPos) -> Option<ChunkId> {
        self.occupants.get(&pos).copied()
    }

    pub fn contains(&self, id: ChunkId) -> bool {
        self.chunks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Every placed chunk in placement order
    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, GridPos, &Chunk)> {
        let mut ids: Vec<ChunkId> = self.chunks.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().filter_map(move |id| {
            let chunk = self.chunks.get(&id)?;
            let pos = self.positions.get(&id)?;
            Some((id, *pos, chunk))
        })
    }

    /// Offset of an exit from its chunk's top-left corner
    pub fn exit_offset(chunk: &Chunk, exit: &Exit) -> GridPos {
        match exit.direction {
            Direction::Up => GridPos::new(exit.pos, 0),
            Direction::Down => GridPos::new(exit.pos, chunk.c_height()),
            Direction::Left => GridPos::new(0, exit.pos),
            Direction::Right => GridPos::new(chunk.c_width(), exit.pos),
        }
    }

    /// World position of an exit on a placed chunk
    pub fn exit_world_pos(&self, id: ChunkId, exit: ExitRef) -> Result<GridPos> {
        let chunk = self.chunk(id)?;
        let e = chunk.exit(exit).ok_or(GenError::UnknownChunk(id))?;
        Ok(self.position(id)? + Self::exit_offset(chunk, e))
    }

    /// Anchor for `candidate` so that `candidate_exit` meets `neighbor_exit`
    ///
    /// `direction` is the heading from the neighbor toward the candidate; the
    /// candidate sits flush against that side of the neighbor and the exit
    /// index difference shifts it along the shared wall.
    pub fn resolve_offset_for_neighbor(
        direction: Direction,
        neighbor_pos: GridPos,
        neighbor: &Chunk,
        neighbor_exit: &Exit,
        candidate: &Chunk,
        candidate_exit: &Exit,
    ) -> GridPos {
        let shift = neighbor_exit.pos - candidate_exit.pos;
        let GridPos { x, y } = neighbor_pos;
        match direction {
            Direction::Right => GridPos::new(x + neighbor.c_width(), y + shift),
            Direction::Left => GridPos::new(x - candidate.c_width(), y + shift),
            Direction::Up => GridPos::new(x + shift, y - candidate.c_height()),
            Direction::Down => GridPos::new(x + shift, y + neighbor.c_height()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::TemplateId;

    fn room(w: u32, h: u32, exits: &[(Direction, i32)]) -> Chunk {
        let mut c = Chunk::new(TemplateId(0), "room", w * 4, h * 4, 4);
        for &(dir, pos) in exits {
            c.push_exit(dir, pos);
        }
        c
    }

    #[test]
    fn test_place_and_unplace() {
        let mut grid = ChunkGrid::new();
        let id = grid.place(GridPos::new(2, 3), room(1, 1, &[])).unwrap();
        assert_eq!(grid.position(id).unwrap(), GridPos::new(2, 3));
        assert_eq!(grid.at(GridPos::new(2, 3)), Some(id));

        let back = grid.unplace(id).unwrap();
        assert_eq!(back.name(), "room");
        assert!(grid.is_empty());
        assert_eq!(grid.at(GridPos::new(2, 3)), None);
        assert!(matches!(grid.unplace(id), Err(GenError::UnknownChunk(_))));
    }

    #[test]
    fn test_place_rejects_occupied_anchor() {
        let mut grid = ChunkGrid::new();
        grid.place(GridPos::ORIGIN, room(1, 1, &[])).unwrap();
        let err = grid.place(GridPos::ORIGIN, room(1, 1, &[])).unwrap_err();
        assert!(matches!(err, GenError::PositionOccupied(_)));
    }

    #[test]
    fn test_collides() {
        let mut grid = ChunkGrid::new();
        grid.place(GridPos::ORIGIN, room(2, 2, &[])).unwrap();
        let small = room(1, 1, &[]);
        assert!(grid.collides(GridPos::new(1, 1), &small));
        assert!(!grid.collides(GridPos::new(2, 0), &small));
        assert!(!grid.collides(GridPos::new(-1, 0), &small));
        assert!(grid.collides(GridPos::new(-1, -1), &room(2, 2, &[])));
    }

    #[test]
    fn test_exit_offsets() {
        let exits = [
            (Direction::Up, 1),
            (Direction::Down, 2),
            (Direction::Left, 0),
            (Direction::Right, 1),
        ];
        let c = room(3, 2, &exits);
        let offset = |dir| ChunkGrid::exit_offset(&c, &c.exits(dir)[0]);
        assert_eq!(offset(Direction::Up), GridPos::new(1, 0));
        assert_eq!(offset(Direction::Down), GridPos::new(2, 2));
        assert_eq!(offset(Direction::Left), GridPos::new(0, 0));
        assert_eq!(offset(Direction::Right), GridPos::new(3, 1));
    }

    /// Whatever the heading, the resolved anchor makes both exits coincide
    #[test]
    fn test_resolved_exits_coincide() {
        let neighbor_exits = [
            (Direction::Up, 1),
            (Direction::Down, 0),
            (Direction::Left, 2),
            (Direction::Right, 1),
        ];
        let candidate_exits = [
            (Direction::Up, 2),
            (Direction::Down, 1),
            (Direction::Left, 1),
            (Direction::Right, 0),
        ];
        let neighbor = room(2, 3, &neighbor_exits);
        let candidate = room(3, 2, &candidate_exits);
        let neighbor_pos = GridPos::new(5, -4);

        for dir in Direction::ALL {
            let n_exit = &neighbor.exits(dir)[0];
            let c_exit = &candidate.exits(dir.opposite())[0];
            let pos = ChunkGrid::resolve_offset_for_neighbor(
                dir,
                neighbor_pos,
                &neighbor,
                n_exit,
                &candidate,
                c_exit,
            );
            let n_world = neighbor_pos + ChunkGrid::exit_offset(&neighbor, n_exit);
            let c_world = pos + ChunkGrid::exit_offset(&candidate, c_exit);
            assert_eq!(n_world, c_world, "heading {dir}");
            assert!(
                !candidate.overlaps(pos, &neighbor, neighbor_pos),
                "heading {dir}"
            );
        }
    }

    #[test]
    fn test_resolve_right_shifts_by_exit_difference() {
        let neighbor = room(2, 3, &[(Direction::Right, 2)]);
        let candidate = room(1, 2, &[(Direction::Left, 1)]);
        let pos = ChunkGrid::resolve_offset_for_neighbor(
            Direction::Right,
            GridPos::ORIGIN,
            &neighbor,
            &neighbor.exits(Direction::Right)[0],
            &candidate,
            &candidate.exits(Direction::Left)[0],
        );
        assert_eq!(pos, GridPos::new(2, 1));
    }

    #[test]
    fn test_iter_in_placement_order() {
        let mut grid = ChunkGrid::new();
        let a = grid.place(GridPos::new(4, 0), room(1, 1, &[])).unwrap();
        let b = grid.place(GridPos::new(0, 0), room(1, 1, &[])).unwrap();
        let ids: Vec<_> = grid.iter().map(|(id, _, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
    }
}
