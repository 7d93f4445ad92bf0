use crate::types::{CellId, GroupId, StructureId};
use glam::DVec3;

/// A growth cursor living in one cell of a [`crate::mesh::Mesh`].
///
/// The host cell is owned by the mesh's bookkeeping: it can be read here
/// but only changes through [`crate::mesh::Mesh::move_agent`] and
/// [`crate::mesh::Mesh::remove_agent`].
#[derive(Clone, Debug)]
pub struct Agent {
    /// Growth has stopped for good.
    pub frozen: bool,
    /// Scheduled growth is skipped while set.
    pub sleep_mode: bool,
    /// Selects cells anywhere on the mesh instead of near the host.
    pub general_mode: bool,
    /// How many hops from the host a local division may happen.
    pub fatness: u32,
    /// Push divided cells inwards, carving a dent instead of a bump.
    pub inward: bool,
    /// Steering direction; steering is active while this is set.
    pub heading: Option<DVec3>,
    /// Freeze instead of growing into a cell outside the local region.
    pub collision_check: bool,
    /// Script program counter.
    pub step: i32,
    /// Divisions left in the current script line.
    pub act_count: u32,
    pub line: Option<StructureId>,
    pub ring: Option<StructureId>,
    pub trail: Option<StructureId>,
    pub(crate) group: GroupId,
    pub(crate) cell: Option<CellId>,
    pub(crate) target: Option<CellId>,
}

impl Agent {
    pub(crate) fn new(group: GroupId, cell: CellId, step_start: i32, fatness: u32) -> Self {
        Self {
            frozen: false,
            sleep_mode: false,
            general_mode: false,
            fatness,
            inward: false,
            heading: None,
            collision_check: true,
            step: step_start,
            act_count: 0,
            line: None,
            ring: None,
            trail: None,
            group,
            cell: Some(cell),
            target: None,
        }
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Host cell, or `None` once the agent has been removed.
    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }

    /// Cell chosen for the next division, if any.
    pub fn target(&self) -> Option<CellId> {
        self.target
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    pub fn towards(&mut self, heading: DVec3) {
        self.heading = Some(heading);
    }

    pub fn inwards(&mut self) {
        self.inward = true;
    }

    pub fn outwards(&mut self) {
        self.inward = false;
    }
}

/// Which branch of target selection produced a [`TargetSelection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionRule {
    /// Highest-valence neighbor of a cell with fewer than five neighbors.
    LowValence,
    /// A cell with eight or more neighbors.
    Overcrowded,
    /// A random cell with seven neighbors.
    Crowded,
    /// First neighbor of a random cell with five neighbors.
    NearLowValence,
    /// Any cell; the mesh is locally regular.
    Random,
    /// A cell within the agent's fatness radius.
    Local,
}

/// The cell an agent chose to divide next, and why.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetSelection {
    pub cell: CellId,
    pub rule: SelectionRule,
}
