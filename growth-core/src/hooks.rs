//! Strategy seams for collaborators that live outside the mesh core.
//!
//! - [`NearestAgent`] measures how close a cell is to the nearest agent of
//!   a group; agent creation uses it to enforce inhibition.
//! - [`StructureHooks`] keeps lines, rings and trails of agents connected
//!   when one of their cells divides.

use crate::{
    error::GrowthError,
    mesh::Mesh,
    types::{CellId, GroupId, StructureId},
};
use std::fmt;

/// Hop distance from a cell to the nearest attached agent of a group.
pub trait NearestAgent: fmt::Debug {
    /// Returns the distance in hops, or `u32::MAX` if the group has no
    /// attached agent other than one hosted by `cell` itself.
    fn nearest(&self, mesh: &Mesh, cell: CellId, group: GroupId) -> u32;
}

/// Looks distances up in the region cache, falling back to a breadth-first
/// search when no agent of the group lies inside `cell`'s region.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegionHops;

impl NearestAgent for RegionHops {
    fn nearest(&self, mesh: &Mesh, cell: CellId, group: GroupId) -> u32 {
        let Some(g) = mesh.group(group) else {
            return u32::MAX;
        };
        let in_region = g
            .members()
            .iter()
            .filter_map(|&a| mesh.agent(a).cell())
            .filter(|&c| c != cell)
            .map(|c| mesh.dist(cell, c))
            .min()
            .unwrap_or(u32::MAX);
        if in_region <= mesh.region_radius() {
            return in_region;
        }
        mesh.nearest_agent_hops(cell, group, None).unwrap_or(u32::MAX)
    }
}

/// Exact distances by an unbounded breadth-first search over the mesh.
#[derive(Clone, Copy, Debug, Default)]
pub struct BreadthFirstHops;

impl NearestAgent for BreadthFirstHops {
    fn nearest(&self, mesh: &Mesh, cell: CellId, group: GroupId) -> u32 {
        mesh.nearest_agent_hops(cell, group, None).unwrap_or(u32::MAX)
    }
}

/// Callbacks run after a division whose divided cell hosts an agent that
/// belongs to a line, ring or trail.
///
/// Every method defaults to doing nothing.
pub trait StructureHooks {
    /// The divided cell's agent is part of `line`; `new` is the sibling.
    fn maintain_line(
        &mut self,
        _mesh: &mut Mesh,
        _line: StructureId,
        _old: CellId,
        _new: CellId,
    ) -> Result<(), GrowthError> {
        Ok(())
    }

    /// The dividing agent leads `trail`; `new` is the sibling of its cell.
    fn trailee_split(
        &mut self,
        _mesh: &mut Mesh,
        _trail: StructureId,
        _new: CellId,
    ) -> Result<(), GrowthError> {
        Ok(())
    }

    /// The divided cell's agent is part of `ring`; `new` is the sibling.
    fn maintain_ring(
        &mut self,
        _mesh: &mut Mesh,
        _ring: StructureId,
        _old: CellId,
        _new: CellId,
    ) -> Result<(), GrowthError> {
        Ok(())
    }
}

/// No lines, rings or trails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStructures;

impl StructureHooks for NoStructures {}
