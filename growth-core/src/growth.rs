//! Growth phases: choosing what to divide and carrying the division out.
//!
//! A typical step looks like:
//! 1. [`choose_next_agent`] picks a live agent, weighted by group size,
//!    and lets it select a target cell.
//! 2. [`divide_target`] splits that cell, places both halves and relaxes
//!    their neighborhood.
//!
//! [`grow_step`] runs both; [`make_blob`] repeats general growth for one
//! agent.

use crate::{
    agent::{SelectionRule, TargetSelection},
    error::{AgentError, GrowthError},
    hooks::StructureHooks,
    mesh::Mesh,
    types::{AgentId, CellId, GroupId},
};
use rand::{Rng, seq::IndexedRandom};
use tracing::{trace, warn};

/// The two cells left by one division.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Division {
    pub divided: CellId,
    pub sibling: CellId,
}

/// What a call to [`grow_step`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// No live agent, or the chosen agent found nothing to divide.
    Idle,
    /// The chosen agent is asleep; its selection was dropped.
    Slept { agent: AgentId },
    Divided {
        agent: AgentId,
        selection: TargetSelection,
        division: Division,
    },
}

/// Picks a cell to divide anywhere on the mesh, favoring irregular
/// valences.
///
/// Rules, in priority order:
/// 1. The first cell with fewer than five neighbors; its highest-valence
///    neighbor is the target.
/// 2. The first cell with eight or more neighbors, otherwise a random cell
///    with seven.
/// 3. The first neighbor of a random cell with five or fewer neighbors.
/// 4. Any random cell.
///
/// ### Returns
/// The selection, or `None` when rule 1 hits a cell without neighbors or
/// the mesh is empty.
pub fn general_target(mesh: &Mesh, rng: &mut impl Rng) -> Option<TargetSelection> {
    let cells = mesh.cells();

    if let Some(low) = cells.iter().find(|c| c.valence() < 5) {
        let mut best_n = 0;
        let mut best = None;
        for &u in low.neighbors() {
            let n = mesh.cell(u).valence();
            if n > best_n {
                best_n = n;
                best = Some(u);
            }
        }
        return best.map(|cell| TargetSelection {
            cell,
            rule: SelectionRule::LowValence,
        });
    }

    let mut sevens = Vec::new();
    for c in cells {
        if c.valence() >= 8 {
            return Some(TargetSelection {
                cell: c.index(),
                rule: SelectionRule::Overcrowded,
            });
        }
        if c.valence() == 7 {
            sevens.push(c.index());
        }
    }
    if let Some(&cell) = sevens.choose(rng) {
        return Some(TargetSelection {
            cell,
            rule: SelectionRule::Crowded,
        });
    }

    let fives: Vec<CellId> = cells
        .iter()
        .filter(|c| c.valence() <= 5)
        .map(|c| c.index())
        .collect();
    if let Some(&five) = fives.choose(rng) {
        return mesh.cell(five).neighbors().first().map(|&cell| TargetSelection {
            cell,
            rule: SelectionRule::NearLowValence,
        });
    }

    if cells.is_empty() {
        return None;
    }
    Some(TargetSelection {
        cell: rng.random_range(0..cells.len()),
        rule: SelectionRule::Random,
    })
}

/// Lets an agent choose its next target with [`general_target`] and
/// remembers the choice on the agent.
///
/// Detached agents choose nothing.
pub fn select_target(
    mesh: &mut Mesh,
    agent: AgentId,
    rng: &mut impl Rng,
) -> Option<TargetSelection> {
    let selection = if mesh.agent(agent).cell().is_some() {
        general_target(mesh, rng)
    } else {
        None
    };
    record(mesh, agent, selection)
}

/// Lets an agent choose a target near its own cell.
///
/// Walks `fatness` random hops from the host, then half of the time trades
/// up to the walk's highest-valence neighbor. Cells hosting a ring agent
/// are never chosen. With collision checking on, a target too close to a
/// cell outside its region freezes the agent instead.
pub fn select_local_target(
    mesh: &mut Mesh,
    agent: AgentId,
    rng: &mut impl Rng,
) -> Option<TargetSelection> {
    let a = mesh.agent(agent);
    let (Some(host), false) = (a.cell(), a.frozen) else {
        return record(mesh, agent, None);
    };
    let (fatness, collision_check) = (a.fatness, a.collision_check);

    let Some(mut target) = mesh.random_neighbor(host, fatness, rng) else {
        return record(mesh, agent, None);
    };
    if rng.random_bool(0.5) {
        for &c in mesh.cell(target).neighbors() {
            if mesh.cell(c).valence() > mesh.cell(target).valence() {
                target = c;
            }
        }
    }

    if let Some(resident) = mesh.cell(target).agent()
        && mesh.agent(resident).ring.is_some()
    {
        return record(mesh, agent, None);
    }

    if collision_check
        && let Some(hit) = mesh.collision(target, mesh.config().collision_distance)
    {
        trace!(agent, target, hit, "collision course, freezing agent");
        mesh.agent_mut(agent).frozen = true;
        return record(mesh, agent, None);
    }

    record(
        mesh,
        agent,
        Some(TargetSelection {
            cell: target,
            rule: SelectionRule::Local,
        }),
    )
}

/// Selects with [`select_target`] in general mode and with
/// [`select_local_target`] otherwise.
pub fn choose_target(
    mesh: &mut Mesh,
    agent: AgentId,
    rng: &mut impl Rng,
) -> Option<TargetSelection> {
    if mesh.agent(agent).general_mode {
        select_target(mesh, agent, rng)
    } else {
        select_local_target(mesh, agent, rng)
    }
}

fn record(
    mesh: &mut Mesh,
    agent: AgentId,
    selection: Option<TargetSelection>,
) -> Option<TargetSelection> {
    if let Some(sel) = selection {
        trace!(agent, cell = sel.cell, rule = ?sel.rule, "selected target");
    }
    mesh.agent_mut(agent).target = selection.map(|s| s.cell);
    selection
}

/// Divides the cell an agent selected and shapes the result.
///
/// 1. Records the target's outward normal, then divides it.
/// 2. Gives both halves the host cell's radius, and the host's color and
///    texture unless the divided cell hosts an agent itself.
/// 3. Places both halves at their neighborhood average, offset by the host
///    radius along the normal (against it for inward agents).
/// 4. Relaxes the neighbors of both halves `Config::relax_passes` times.
/// 5. If the agent lives in the divided cell and steers, follows whichever
///    half faces the heading better.
/// 6. Runs the line, trail and ring hooks, then clears the target.
///
/// ### Returns
/// - `Ok(None)` if the agent has no target.
/// - `Ok(Some(division))` otherwise.
/// - `Err` if the agent is detached or the division hits corrupted
///   adjacency. Singular relaxation steps are logged and skipped.
pub fn divide_target<H>(
    mesh: &mut Mesh,
    agent: AgentId,
    hooks: &mut H,
) -> Result<Option<Division>, GrowthError>
where
    H: StructureHooks + ?Sized,
{
    let Some(old) = mesh.agent(agent).target() else {
        return Ok(None);
    };
    let host = mesh.agent(agent).cell().ok_or(AgentError::Detached(agent))?;

    let out_dir = mesh.normal(old);
    let new = mesh.divide(old)?;

    let radius = mesh.cell(host).radius();
    mesh.set_radius_local(old, radius);
    mesh.set_radius_local(new, radius);

    let (color, texture) = if mesh.cell(old).has_agent() {
        (mesh.cell(old).color, mesh.cell(old).texture)
    } else {
        (mesh.cell(host).color, mesh.cell(host).texture)
    };
    for id in [old, new] {
        let cell = mesh.cell_mut(id);
        cell.color = color;
        cell.texture = texture;
    }

    let a = mesh.agent(agent);
    let offset = out_dir * if a.inward { -radius } else { radius };
    let old_pos = mesh.avg_neighbors(old) + offset;
    let new_pos = mesh.avg_neighbors(new) + offset;
    mesh.cell_mut(old).pos = old_pos;
    mesh.cell_mut(new).pos = new_pos;

    let neighborhood: Vec<CellId> = mesh
        .cell(old)
        .neighbors()
        .iter()
        .chain(mesh.cell(new).neighbors())
        .copied()
        .collect();
    for _ in 0..mesh.config().relax_passes {
        for &u in &neighborhood {
            relax_or_skip(mesh, u);
        }
    }

    let a = mesh.agent(agent);
    if mesh.cell(old).agent() == Some(agent)
        && a.line.is_none()
        && let Some(heading) = a.heading
        && mesh.normal(new).dot(heading) > mesh.normal(old).dot(heading)
    {
        mesh.move_agent(old, new)?;
    }

    if let Some(resident) = mesh.cell(old).agent()
        && let Some(line) = mesh.agent(resident).line
    {
        hooks.maintain_line(mesh, line, old, new)?;
    }
    if mesh.cell(old).agent() == Some(agent)
        && let Some(trail) = mesh.agent(agent).trail
    {
        hooks.trailee_split(mesh, trail, new)?;
    }
    if let Some(resident) = mesh.cell(old).agent()
        && let Some(ring) = mesh.agent(resident).ring
    {
        hooks.maintain_ring(mesh, ring, old, new)?;
    }

    mesh.agent_mut(agent).clear_target();
    Ok(Some(Division {
        divided: old,
        sibling: new,
    }))
}

/// One relaxation step that logs and skips a singular system.
pub fn relax_or_skip(mesh: &mut Mesh, cell: CellId) {
    if let Err(err) = mesh.relax(cell) {
        warn!(%err, cell, "relaxation skipped");
    }
}

/// Relaxes `count` randomly chosen cells, one step each.
pub fn relax_random(mesh: &mut Mesh, count: usize, rng: &mut impl Rng) {
    if mesh.is_empty() {
        return;
    }
    for _ in 0..count {
        let cell = rng.random_range(0..mesh.len());
        relax_or_skip(mesh, cell);
    }
}

/// Picks a random live agent of `group` and lets it choose a target.
///
/// ### Returns
/// The agent and its selection, or `Ok(None)` if the group has no live
/// agent or the chosen agent found nothing to divide.
pub fn choose_next_to_divide(
    mesh: &mut Mesh,
    group: GroupId,
    rng: &mut impl Rng,
) -> Result<Option<(AgentId, TargetSelection)>, AgentError> {
    let g = mesh.group(group).ok_or(AgentError::UnknownGroup(group))?;
    if g.count_live(mesh) == 0 {
        return Ok(None);
    }

    let agent = loop {
        let Some(&a) = g.members().choose(rng) else {
            return Ok(None);
        };
        if !mesh.agent(a).frozen {
            break a;
        }
    };

    Ok(choose_target(mesh, agent, rng).map(|sel| (agent, sel)))
}

/// Picks a group with probability proportional to its number of live
/// agents, then delegates to [`choose_next_to_divide`].
pub fn choose_next_agent(
    mesh: &mut Mesh,
    rng: &mut impl Rng,
) -> Result<Option<(AgentId, TargetSelection)>, AgentError> {
    let live: Vec<usize> = mesh.groups().iter().map(|g| g.count_live(mesh)).collect();
    let total: usize = live.iter().sum();
    if total == 0 {
        return Ok(None);
    }

    let mut k = rng.random_range(0..total);
    for (group, &n) in live.iter().enumerate() {
        if k < n {
            return choose_next_to_divide(mesh, group, rng);
        }
        k -= n;
    }
    Ok(None)
}

/// One growth step across all groups: choose an agent and a target, then
/// divide unless the agent sleeps.
pub fn grow_step<H>(
    mesh: &mut Mesh,
    rng: &mut impl Rng,
    hooks: &mut H,
) -> Result<StepOutcome, GrowthError>
where
    H: StructureHooks + ?Sized,
{
    let Some((agent, selection)) = choose_next_agent(mesh, rng)? else {
        return Ok(StepOutcome::Idle);
    };
    if mesh.agent(agent).sleep_mode {
        mesh.agent_mut(agent).clear_target();
        return Ok(StepOutcome::Slept { agent });
    }

    Ok(match divide_target(mesh, agent, hooks)? {
        Some(division) => StepOutcome::Divided {
            agent,
            selection,
            division,
        },
        None => StepOutcome::Idle,
    })
}

/// General growth for one agent: select anywhere, divide.
pub fn grow_once<H>(
    mesh: &mut Mesh,
    agent: AgentId,
    rng: &mut impl Rng,
    hooks: &mut H,
) -> Result<Option<Division>, GrowthError>
where
    H: StructureHooks + ?Sized,
{
    select_target(mesh, agent, rng);
    divide_target(mesh, agent, hooks)
}

/// Grows an initial blob: `steps` rounds of general growth, each followed
/// by a sweep of `Config::blob_relax_sweep` random relaxations.
///
/// ### Returns
/// The number of divisions performed.
pub fn make_blob<H>(
    mesh: &mut Mesh,
    agent: AgentId,
    steps: usize,
    rng: &mut impl Rng,
    hooks: &mut H,
) -> Result<usize, GrowthError>
where
    H: StructureHooks + ?Sized,
{
    let sweep = mesh.config().blob_relax_sweep as usize;
    let mut divisions = 0;
    for _ in 0..steps {
        if grow_once(mesh, agent, rng, hooks)?.is_some() {
            divisions += 1;
        }
        relax_random(mesh, sweep, rng);
    }
    Ok(divisions)
}
