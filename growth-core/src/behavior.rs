//! Script-level actions an agent can take on itself and its surroundings.
//!
//! Every action addresses the agent by id and fails with
//! [`AgentError::Detached`] once the agent no longer has a host cell.

use crate::{
    error::AgentError,
    growth::relax_random,
    mesh::Mesh,
    types::{AgentId, CellId, GroupId},
};
use glam::DVec3;
use rand::Rng;
use tracing::debug;

/// Number of neighbor hops tried by one call to [`repel`].
const REPEL_MOVES: usize = 3;

fn host(mesh: &Mesh, agent: AgentId) -> Result<CellId, AgentError> {
    mesh.agent(agent).cell().ok_or(AgentError::Detached(agent))
}

/// Sets the host cell's radius, clamped to the configured bounds, and
/// blends it into the neighbors.
pub fn set_size(mesh: &mut Mesh, agent: AgentId, size: f64) -> Result<(), AgentError> {
    let cell = host(mesh, agent)?;
    let radius = mesh.config().clamp_radius(size);
    mesh.set_radius(cell, radius);
    Ok(())
}

/// Grows (or, for negative `delta`, shrinks) the host cell.
pub fn larger(mesh: &mut Mesh, agent: AgentId, delta: f64) -> Result<(), AgentError> {
    let radius = mesh.cell(host(mesh, agent)?).radius();
    set_size(mesh, agent, radius + delta)
}

/// Creates an agent of `group` in every empty neighbor of the host.
///
/// ### Returns
/// The agents created; inhibited neighbors are skipped.
pub fn fill(mesh: &mut Mesh, agent: AgentId, group: GroupId) -> Result<Vec<AgentId>, AgentError> {
    let cell = host(mesh, agent)?;
    let neighbors = mesh.cell(cell).neighbors().to_vec();

    let mut created = Vec::new();
    for u in neighbors {
        if mesh.cell(u).has_agent() {
            continue;
        }
        if let Some(id) = mesh.create_agent(group, u)? {
            created.push(id);
        }
    }
    Ok(created)
}

/// Creates one agent of `group` in the first empty neighbor of the host.
///
/// ### Returns
/// The new agent, or `None` if every neighbor is occupied or creation is
/// inhibited.
pub fn spawn(
    mesh: &mut Mesh,
    agent: AgentId,
    group: GroupId,
) -> Result<Option<AgentId>, AgentError> {
    let cell = host(mesh, agent)?;
    let Some(free) = mesh
        .cell(cell)
        .neighbors()
        .iter()
        .copied()
        .find(|&u| !mesh.cell(u).has_agent())
    else {
        return Ok(None);
    };
    mesh.create_agent(group, free)
}

/// Replaces the agent with a fresh agent of `group` in the same cell.
///
/// The old agent is detached. The new one starts at the new group's first
/// script step with default settings.
///
/// ### Returns
/// The replacement, or `None` if the new group's inhibition forbids it, in
/// which case the cell is left empty.
pub fn become_group(
    mesh: &mut Mesh,
    agent: AgentId,
    group: GroupId,
) -> Result<Option<AgentId>, AgentError> {
    let cell = host(mesh, agent)?;
    if mesh.group(group).is_none() {
        return Err(AgentError::UnknownGroup(group));
    }

    mesh.remove_agent(mesh.agent(agent).group(), cell)?;
    let replacement = mesh.create_agent(group, cell)?;
    debug!(agent, ?replacement, group, cell, "agent changed group");
    Ok(replacement)
}

/// Detaches the agent from its cell and group for good.
pub fn die(mesh: &mut Mesh, agent: AgentId) -> Result<(), AgentError> {
    let cell = host(mesh, agent)?;
    mesh.remove_agent(mesh.agent(agent).group(), cell)?;
    debug!(agent, cell, "agent died");
    Ok(())
}

/// Kills the agent unless its cell's normal points along `direction`.
///
/// ### Returns
/// `true` if the agent died.
pub fn must_face(mesh: &mut Mesh, agent: AgentId, direction: DVec3) -> Result<bool, AgentError> {
    let cell = host(mesh, agent)?;
    if mesh.normal(cell).dot(direction) > 0.0 {
        return Ok(false);
    }
    die(mesh, agent)?;
    Ok(true)
}

/// Moves the agent away from other agents of `group`.
///
/// Up to three times, hops to the empty neighbor that is at least as far
/// from the nearest agent of `group` as the current cell; ties go to the
/// last such neighbor.
pub fn repel(mesh: &mut Mesh, agent: AgentId, group: GroupId) -> Result<(), AgentError> {
    for _ in 0..REPEL_MOVES {
        let old = host(mesh, agent)?;
        let mut best_dist = mesh.nearest_agent_hops(old, group, None).unwrap_or(u32::MAX);
        let mut best = None;
        for &u in mesh.cell(old).neighbors() {
            if mesh.cell(u).has_agent() {
                continue;
            }
            let dist = mesh.nearest_agent_hops(u, group, Some(old)).unwrap_or(u32::MAX);
            if dist >= best_dist {
                best_dist = dist;
                best = Some(u);
            }
        }
        if let Some(to) = best {
            mesh.move_agent(old, to)?;
        }
    }
    Ok(())
}

/// Seeds `n` agents of `group` into the first empty cells, then spreads
/// them out.
///
/// Each of `rounds` rounds repels every member of `group` once, following
/// each move with a sweep of `Config::blob_relax_sweep` random
/// relaxations.
///
/// ### Returns
/// The number of agents created. Inhibited cells still use up one of the
/// `n` attempts.
pub fn disperse(
    mesh: &mut Mesh,
    group: GroupId,
    n: usize,
    rounds: usize,
    rng: &mut impl Rng,
) -> Result<usize, AgentError> {
    let empty: Vec<CellId> = mesh
        .cells()
        .iter()
        .filter(|c| !c.has_agent())
        .map(|c| c.index())
        .take(n)
        .collect();

    let mut created = 0;
    for cell in empty {
        if mesh.create_agent(group, cell)?.is_some() {
            created += 1;
        }
    }

    let sweep = mesh.config().blob_relax_sweep as usize;
    for _ in 0..rounds {
        let members = mesh
            .group(group)
            .ok_or(AgentError::UnknownGroup(group))?
            .members()
            .to_vec();
        for agent in members {
            repel(mesh, agent, group)?;
            relax_random(mesh, sweep, rng);
        }
    }
    Ok(created)
}
