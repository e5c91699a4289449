//! Chunk geometry and exits
//!
//! A `Chunk` is a rectangular prefab room measured in grid units. Each side
//! carries zero or more exits, and each exit may be bound to the graph edge it
//! currently realizes. Catalogue templates are never bound; placement always
//! works on an [`Chunk::instantiate`] copy.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::Direction;
use crate::graph::EdgeId;
use crate::grid::{ChunkId, GridPos};

/// Identity of a catalogue template (shared by every copy made from it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(pub u32);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// A connection point on a chunk's border
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub direction: Direction,
    /// Grid-unit offset along the edge, from the top or left corner
    pub pos: i32,
    /// Graph edge this exit currently realizes
    pub edge: Option<EdgeId>,
}

impl Exit {
    pub fn new(direction: Direction, pos: i32) -> Self {
        Self {
            direction,
            pos,
            edge: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.edge.is_some()
    }
}

/// Handle to one exit of a chunk: its side plus index within that side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitRef {
    pub direction: Direction,
    pub index: usize,
}

impl ExitRef {
    pub const fn new(direction: Direction, index: usize) -> Self {
        Self { direction, index }
    }
}

/// How a placed chunk relates to a loop closure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopRole {
    /// Ordinary placement owned by a single node
    #[default]
    Standalone,
    /// Pass-through piece inside a closed loop; owned by the terminal
    Interior,
    /// Last piece of a closed loop, holding the interior pieces in chain order
    Terminal { interior: Vec<ChunkId> },
}

/// A placeable room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    template: TemplateId,
    name: String,
    /// Width in cells
    width: u32,
    /// Height in cells
    height: u32,
    /// Width in grid units
    c_width: i32,
    /// Height in grid units
    c_height: i32,
    /// Exits indexed by `Direction::index`
    exits: [Vec<Exit>; 4],
    role: LoopRole,
}

impl Chunk {
    /// Create a chunk with no exits
    pub fn new(
        template: TemplateId,
        name: impl Into<String>,
        width: u32,
        height: u32,
        chunk_size: u32,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            template,
            name: name.into(),
            width,
            height,
            c_width: (width / chunk_size) as i32,
            c_height: (height / chunk_size) as i32,
            exits: Default::default(),
            role: LoopRole::Standalone,
        }
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in cells
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width in grid units
    pub fn c_width(&self) -> i32 {
        self.c_width
    }

    /// Height in grid units
    pub fn c_height(&self) -> i32 {
        self.c_height
    }

    pub fn role(&self) -> &LoopRole {
        &self.role
    }

    pub fn set_role(&mut self, role: LoopRole) {
        self.role = role;
    }

    /// True for interior and terminal pieces of a loop closure
    pub fn is_loop_piece(&self) -> bool {
        !matches!(self.role, LoopRole::Standalone)
    }

    /// Length of the edge exits on `direction` are measured along
    pub fn edge_length(&self, direction: Direction) -> i32 {
        if direction.is_horizontal() {
            self.c_height
        } else {
            self.c_width
        }
    }

    /// Append an exit; the position must already be normalized
    pub fn push_exit(&mut self, direction: Direction, pos: i32) -> ExitRef {
        let side = &mut self.exits[direction.index()];
        side.push(Exit::new(direction, pos));
        ExitRef::new(direction, side.len() - 1)
    }

    pub fn exits(&self, direction: Direction) -> &[Exit] {
        &self.exits[direction.index()]
    }

    pub fn exit(&self, exit: ExitRef) -> Option<&Exit> {
        self.exits[exit.direction.index()].get(exit.index)
    }

    /// References to every exit on one side
    pub fn exit_refs(&self, direction: Direction) -> impl Iterator<Item = ExitRef> + '_ {
        let count = self.exit_count(direction);
        (0..count).map(move |i| ExitRef::new(direction, i))
    }

    pub fn num_exits(&self) -> usize {
        self.exits.iter().map(Vec::len).sum()
    }

    pub fn exit_count(&self, direction: Direction) -> usize {
        self.exits(direction).len()
    }

    /// Find the exit at `pos` on one side; negative positions count from the far end
    pub fn get_exit(&self, direction: Direction, pos: i32) -> Option<ExitRef> {
        let pos = if pos < 0 {
            self.edge_length(direction) + pos
        } else {
            pos
        };
        self.exits(direction)
            .iter()
            .position(|e| e.pos == pos)
            .map(|i| ExitRef::new(direction, i))
    }

    /// Exits on one side not yet bound to a graph edge
    pub fn unbound_exits(&self, direction: Direction) -> Vec<ExitRef> {
        self.exits(direction)
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_bound())
            .map(|(i, _)| ExitRef::new(direction, i))
            .collect()
    }

    /// If this chunk sat at `offset`, would it have a `direction` exit at world point `target`?
    pub fn confirm_match(
        &self,
        offset: GridPos,
        target: GridPos,
        direction: Direction,
    ) -> Option<ExitRef> {
        let (edge_ok, along) = match direction {
            Direction::Left => (offset.x == target.x, target.y - offset.y),
            Direction::Right => (offset.x + self.c_width == target.x, target.y - offset.y),
            Direction::Up => (offset.y == target.y, target.x - offset.x),
            Direction::Down => (offset.y + self.c_height == target.y, target.x - offset.x),
        };
        if !edge_ok {
            return None;
        }
        self.exits(direction)
            .iter()
            .position(|e| e.pos == along)
            .map(|i| ExitRef::new(direction, i))
    }

    /// For a two-exit chunk, the exit that is not `exit`
    pub fn other_exit(&self, exit: ExitRef) -> Option<ExitRef> {
        if self.num_exits() != 2 {
            return None;
        }
        Direction::ALL
            .iter()
            .flat_map(|&dir| self.exit_refs(dir))
            .find(|&r| r != exit)
    }

    pub fn bind(&mut self, exit: ExitRef, edge: EdgeId) {
        if let Some(e) = self.exits[exit.direction.index()].get_mut(exit.index) {
            e.edge = Some(edge);
        }
    }

    /// Clear every binding for which `pred` holds
    pub fn clear_bindings(&mut self, mut pred: impl FnMut(EdgeId) -> bool) {
        for e in self.exits.iter_mut().flatten() {
            if e.edge.is_some_and(&mut pred) {
                e.edge = None;
            }
        }
    }

    pub fn reset_all_exits(&mut self) {
        self.clear_bindings(|_| true);
    }

    /// Bound exits with their handles
    pub fn bound_exits(&self) -> impl Iterator<Item = (ExitRef, EdgeId)> + '_ {
        Direction::ALL.iter().flat_map(move |&dir| {
            self.exits(dir)
                .iter()
                .enumerate()
                .filter_map(move |(i, e)| Some((ExitRef::new(dir, i), e.edge?)))
        })
    }

    /// Fresh copy for placement: no bindings, standalone role
    pub fn instantiate(&self) -> Chunk {
        let mut copy = self.clone();
        copy.reset_all_exits();
        copy.role = LoopRole::Standalone;
        copy
    }

    /// Left/right flipped copy under a new template identity
    pub fn mirrored(&self, template: TemplateId) -> Chunk {
        let mut flipped = Chunk {
            template,
            name: format!("{} (mirrored)", self.name),
            width: self.width,
            height: self.height,
            c_width: self.c_width,
            c_height: self.c_height,
            exits: Default::default(),
            role: LoopRole::Standalone,
        };
        for dir in Direction::ALL {
            for e in self.exits(dir) {
                match dir {
                    Direction::Left | Direction::Right => {
                        flipped.push_exit(dir.opposite(), e.pos);
                    }
                    Direction::Up | Direction::Down => {
                        flipped.push_exit(dir, self.c_width - 1 - e.pos);
                    }
                }
            }
        }
        flipped
    }

    /// Axis-aligned overlap test in grid units; touching edges do not overlap
    pub fn overlaps(&self, pos: GridPos, other: &Chunk, other_pos: GridPos) -> bool {
        pos.x < other_pos.x + other.c_width
            && pos.x + self.c_width > other_pos.x
            && pos.y < other_pos.y + other.c_height
            && pos.y + self.c_height > other_pos.y
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
