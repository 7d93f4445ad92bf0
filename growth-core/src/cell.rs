use crate::{
    appearance::{Color, Texture},
    types::{AgentId, CellId},
};
use glam::DVec3;
use std::collections::{BTreeMap, VecDeque};

/// Cells within a bounded hop distance of some start cell, keyed by id,
/// with their hop distance. The start cell is present at distance `0`.
pub type Region = BTreeMap<CellId, u32>;

/// One vertex of the growing surface.
///
/// Adjacency, region and agent residency are only written by
/// [`crate::mesh::Mesh`], which keeps them consistent across cells.
/// Position and the cosmetic attributes are free for callers to edit.
#[derive(Clone, Debug)]
pub struct Cell {
    pub pos: DVec3,
    pub color: Color,
    pub texture: Texture,
    pub(crate) index: CellId,
    pub(crate) neighbors: Vec<CellId>,
    pub(crate) region: Region,
    pub(crate) agent: Option<AgentId>,
    pub(crate) radius: f64,
}

impl Cell {
    pub(crate) fn new(index: CellId, pos: DVec3, radius: f64) -> Self {
        Self {
            pos,
            color: Color::default(),
            texture: Texture::default(),
            index,
            neighbors: Vec::with_capacity(8),
            region: Region::new(),
            agent: None,
            radius,
        }
    }

    /// Birth-order index of this cell in its mesh.
    pub fn index(&self) -> CellId {
        self.index
    }

    /// Neighbors in counter-clockwise order around this cell.
    pub fn neighbors(&self) -> &[CellId] {
        &self.neighbors
    }

    /// Number of neighbors.
    pub fn valence(&self) -> usize {
        self.neighbors.len()
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn agent(&self) -> Option<AgentId> {
        self.agent
    }

    pub fn has_agent(&self) -> bool {
        self.agent.is_some()
    }

    /// Ideal size of this cell, used as half the spring rest length.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Position of `v` in this cell's neighbor list.
    pub fn slot_of(&self, v: CellId) -> Option<usize> {
        self.neighbors.iter().position(|&u| u == v)
    }

    /// Neighbor following `v` in cyclic order.
    pub fn next(&self, v: CellId) -> Option<CellId> {
        let n = self.valence();
        self.slot_of(v).map(|i| self.neighbors[(i + 1) % n])
    }

    /// Neighbor preceding `v` in cyclic order.
    pub fn prev(&self, v: CellId) -> Option<CellId> {
        let n = self.valence();
        self.slot_of(v).map(|i| self.neighbors[(i + n - 1) % n])
    }

    /// Neighbor half-way around the cycle from `v`.
    pub fn opp(&self, v: CellId) -> Option<CellId> {
        let n = self.valence();
        self.slot_of(v).map(|i| self.neighbors[(i + n / 2) % n])
    }
}

/// Breadth-first search over the adjacency graph from `start`.
///
/// Expands at most `max_depth - 1` levels, so every cell within
/// `max_depth` hops is recorded with its exact hop distance.
///
/// ### Parameters
/// - `cells` - The whole cell arena; neighbor ids index into it.
/// - `start` - Cell the distances are measured from.
/// - `max_depth` - Largest hop distance to record.
///
/// ### Returns
/// The [`Region`] of `start`, including `start` itself at distance `0`.
pub fn calc_region(cells: &[Cell], start: CellId, max_depth: u32) -> Region {
    let mut region = Region::new();
    region.insert(start, 0);
    if max_depth == 0 {
        return region;
    }

    let mut queue = VecDeque::from([start]);
    while let Some(v) = queue.pop_front() {
        let d = region[&v];
        for &u in &cells[v].neighbors {
            if region.contains_key(&u) {
                continue;
            }
            region.insert(u, d + 1);
            if d + 1 < max_depth {
                queue.push_back(u);
            }
        }
    }
    region
}
