//! The growing surface: cell arena, agent arena and the topology and
//! relaxation operators that act on them.

use crate::{
    agent::Agent,
    cell::{Cell, calc_region},
    config::Config,
    error::{AgentError, MeshError, RelaxError, TopologyError},
    group::AgentGroup,
    hooks::{NearestAgent, RegionHops},
    spring::SpringSystem,
    types::{AgentId, CellId, GroupId},
};
use glam::DVec3;
use rand::Rng;
use std::collections::VecDeque;
use tracing::{debug, info, trace};

/// Hop count standing in for "unreachable" in the initial hop table.
const UNREACHABLE: u32 = u32::MAX / 2;

/// A closed triangulated surface grown one division at a time.
///
/// Cells are stored in birth order and never removed, so a [`CellId`] is
/// both an index into [`Mesh::cells`] and the number of cells that existed
/// before it. Agents live in a parallel arena; the mesh is the only writer
/// of the cell↔agent links, which therefore always agree.
#[derive(Debug)]
pub struct Mesh {
    cells: Vec<Cell>,
    agents: Vec<Agent>,
    groups: Vec<AgentGroup>,
    cfg: Config,
    initial_hops: Vec<Vec<u32>>,
    nearest: Box<dyn NearestAgent>,
}

impl Mesh {
    /// Builds a mesh from an indexed topology.
    ///
    /// Entry `i` of `adjacency` lists cell `i`'s neighbors in
    /// counter-clockwise order. The lists are trusted to be symmetric and
    /// cyclically consistent; only their shape is checked. Every region is
    /// filled from an all-pairs hop table computed over the input.
    ///
    /// ### Parameters
    /// - `vertices` - Initial cell positions.
    /// - `adjacency` - Per-cell neighbor lists, indices into `vertices`.
    /// - `cfg` - Region radius, default cell radius and solver settings.
    ///
    /// ### Returns
    /// The mesh, or a [`MeshError`] if the two lists disagree in length or
    /// a neighbor index is out of range.
    pub fn new(
        vertices: &[[f64; 3]],
        adjacency: &[Vec<usize>],
        cfg: Config,
    ) -> Result<Self, MeshError> {
        if vertices.len() != adjacency.len() {
            return Err(MeshError::LengthMismatch {
                vertices: vertices.len(),
                adjacency: adjacency.len(),
            });
        }

        let len = vertices.len();
        let mut cells: Vec<Cell> = vertices
            .iter()
            .enumerate()
            .map(|(i, &v)| Cell::new(i, DVec3::from_array(v), cfg.cell_radius))
            .collect();

        for (i, adj) in adjacency.iter().enumerate() {
            if let Some(&neighbor) = adj.iter().find(|&&j| j >= len) {
                return Err(MeshError::NeighborOutOfRange {
                    cell: i,
                    neighbor,
                    len,
                });
            }
            cells[i].neighbors.extend_from_slice(adj);
        }

        let initial_hops = count_hops(&cells);
        for (i, row) in initial_hops.iter().enumerate() {
            for (j, &hops) in row.iter().enumerate() {
                if hops <= cfg.region_radius {
                    cells[i].region.insert(j, hops);
                }
            }
        }

        info!(
            cells = len,
            region_radius = cfg.region_radius,
            "built mesh from topology"
        );

        Ok(Self {
            cells,
            agents: Vec::new(),
            groups: Vec::new(),
            cfg,
            initial_hops,
            nearest: Box::new(RegionHops),
        })
    }

    /// Replaces the distance query used to enforce inhibition.
    pub fn with_nearest_agent(mut self, nearest: Box<dyn NearestAgent>) -> Self {
        self.nearest = nearest;
        self
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn region_radius(&self) -> u32 {
        self.cfg.region_radius
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// ### Panics
    /// Panics if `id` is not a cell of this mesh.
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id]
    }

    /// ### Panics
    /// Panics if `id` is not a cell of this mesh.
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All-pairs hop distances of the topology the mesh was built from.
    ///
    /// This table describes the initial topology only and is not updated
    /// as the mesh grows; use [`Mesh::dist`] for current distances.
    pub fn initial_hops(&self) -> &[Vec<u32>] {
        &self.initial_hops
    }

    /// Hop distance between two cells as recorded in `a`'s region.
    ///
    /// Cells outside the region report `region_radius + 1`.
    pub fn dist(&self, a: CellId, b: CellId) -> u32 {
        self.cells[a]
            .region
            .get(&b)
            .copied()
            .unwrap_or(self.cfg.region_radius + 1)
    }

    /// Splits a cell in two (vertex split).
    ///
    /// The neighbor with the lowest valence and the one (roughly) opposite
    /// it become the two boundary neighbors, adjacent to both halves. The
    /// cell keeps the arc from the first boundary to the second, the new
    /// sibling takes the complementary arc, and the two are joined by an
    /// edge. Regions of every cell that was in the divided cell's region
    /// are rebuilt, as is the sibling's.
    ///
    /// The sibling starts at the divided cell's position with its radius,
    /// color and texture, and without an agent.
    ///
    /// ### Parameters
    /// - `id` - Cell to divide; must have at least one neighbor.
    ///
    /// ### Returns
    /// The sibling's id. On error nothing has been modified.
    pub fn divide(&mut self, id: CellId) -> Result<CellId, TopologyError> {
        let cell = self.cells.get(id).ok_or(TopologyError::UnknownCell(id))?;
        let old = cell.neighbors.clone();
        let n = old.len();
        if n == 0 {
            return Err(TopologyError::Isolated(id));
        }
        let valence = |c: CellId| self.cells[c].valence();

        let mut min_i = 0;
        let mut min_count = usize::MAX;
        for (i, &c) in old.iter().enumerate() {
            if valence(c) < min_count {
                min_count = valence(c);
                min_i = i;
            }
        }

        let mut opp_i = (min_i + n / 2) % n;
        if n % 2 == 1 {
            let next = (opp_i + 1) % n;
            if valence(old[next]) < valence(old[opp_i]) {
                opp_i = next;
            }
        }

        // Locate every back-reference before touching anything.
        let back_ref = |neighbor: CellId| {
            self.cells[neighbor]
                .slot_of(id)
                .ok_or(TopologyError::MissingBackReference { cell: id, neighbor })
        };
        let opp_slot = back_ref(old[opp_i])?;
        let min_slot = back_ref(old[min_i])?;
        let mut handed_over = Vec::with_capacity(n);
        let mut i = (opp_i + 1) % n;
        while i != min_i {
            handed_over.push((old[i], back_ref(old[i])?));
            i = (i + 1) % n;
        }

        let region_before: Vec<CellId> = cell.region.keys().copied().collect();
        let sib = self.cells.len();
        let mut sibling = Cell::new(sib, cell.pos, cell.radius);
        sibling.color = cell.color;
        sibling.texture = cell.texture;

        let mut keep: Vec<CellId> = (0..=(n + opp_i - min_i) % n)
            .map(|i| old[(min_i + i) % n])
            .collect();
        keep.push(sib);
        sibling.neighbors = (0..=(n + min_i - opp_i) % n)
            .map(|i| old[(opp_i + i) % n])
            .collect();
        sibling.neighbors.push(id);

        self.cells.push(sibling);
        self.cells[id].neighbors = keep;

        // The sibling sits before us around the opposite boundary and
        // after us around the low-valence one.
        self.cells[old[opp_i]].neighbors.insert(opp_slot, sib);
        if min_i != opp_i {
            self.cells[old[min_i]].neighbors.insert(min_slot + 1, sib);
        }
        for (neighbor, slot) in handed_over {
            self.cells[neighbor].neighbors[slot] = sib;
        }

        let depth = self.cfg.region_radius;
        for u in region_before {
            self.cells[u].region = calc_region(&self.cells, u, depth);
        }
        self.cells[sib].region = calc_region(&self.cells, sib, depth);

        debug!(cell = id, sibling = sib, valence = n, "divided cell");
        Ok(sib)
    }

    /// Moves a cell one Newton step toward the minimum of its local spring
    /// energy.
    ///
    /// Every other cell `u` of the region pulls with a spring of rest length
    /// `dist(cell, u) * (r_cell + r_u)` and stiffness the inverse of that.
    /// Each component of the step is clamped to `±Config::max_step`.
    ///
    /// ### Returns
    /// The applied displacement, or [`RelaxError::Singular`] if the
    /// system has no unique solution; the cell is not moved in that case.
    ///
    /// ### Panics
    /// Panics if `id` is not a cell of this mesh.
    pub fn relax(&mut self, id: CellId) -> Result<DVec3, RelaxError> {
        let cell = &self.cells[id];
        let mut sys = SpringSystem::default();
        for (&u, &hops) in &cell.region {
            if u == id {
                continue;
            }
            let other = &self.cells[u];
            let rest = f64::from(hops) * (cell.radius + other.radius);
            sys.add_spring(cell.pos - other.pos, rest);
        }

        let max = DVec3::splat(self.cfg.max_step);
        let step = sys
            .newton_step()
            .ok_or(RelaxError::Singular(id))?
            .clamp(-max, max);

        self.cells[id].pos += step;
        Ok(step)
    }

    /// Outward unit normal: the normalized sum of the cross products of
    /// consecutive edge vectors around the cell.
    ///
    /// Returns `DVec3::ZERO` for a cell without neighbors.
    pub fn normal(&self, id: CellId) -> DVec3 {
        let cell = &self.cells[id];
        let Some(&last) = cell.neighbors.last() else {
            return DVec3::ZERO;
        };

        let mut sum = DVec3::ZERO;
        let mut prev = self.cells[last].pos - cell.pos;
        for &v in &cell.neighbors {
            let edge = self.cells[v].pos - cell.pos;
            sum += prev.cross(edge);
            prev = edge;
        }
        sum.normalize_or_zero()
    }

    /// Mean position of a cell and its neighbors.
    pub fn avg_neighbors(&self, id: CellId) -> DVec3 {
        let cell = &self.cells[id];
        let sum = cell
            .neighbors
            .iter()
            .fold(cell.pos, |acc, &v| acc + self.cells[v].pos);
        sum / (cell.neighbors.len() + 1) as f64
    }

    /// Random walk of `k` hops from `id`.
    ///
    /// Returns `id` itself for `k == 0`, and `None` if the walk reaches a
    /// cell without neighbors.
    pub fn random_neighbor(&self, id: CellId, k: u32, rng: &mut impl Rng) -> Option<CellId> {
        let mut at = id;
        for _ in 0..k {
            let adj = &self.cells[at].neighbors;
            if adj.is_empty() {
                return None;
            }
            at = adj[rng.random_range(0..adj.len())];
        }
        Some(at)
    }

    /// Sets a cell's radius and blends it into its neighbors, each of which
    /// moves to the average of its own radius and the new one.
    pub fn set_radius(&mut self, id: CellId, radius: f64) {
        self.cells[id].radius = radius;
        for i in 0..self.cells[id].neighbors.len() {
            let v = self.cells[id].neighbors[i];
            let blended = 0.5 * (radius + self.cells[v].radius);
            self.cells[v].radius = blended;
        }
    }

    /// Sets a cell's radius without touching its neighbors.
    pub fn set_radius_local(&mut self, id: CellId, radius: f64) {
        self.cells[id].radius = radius;
    }

    /// First cell closer than `tol` to `id` that is not in `id`'s region.
    pub fn collision(&self, id: CellId, tol: f64) -> Option<CellId> {
        let cell = &self.cells[id];
        let tol2 = tol * tol;
        self.cells
            .iter()
            .find(|v| {
                (cell.pos - v.pos).length_squared() < tol2 && !cell.region.contains_key(&v.index)
            })
            .map(|v| v.index)
    }

    /// Unbounded breadth-first search for the nearest cell hosting an agent
    /// of `group`.
    ///
    /// `id` itself never counts, and `exclude` is neither counted nor
    /// walked through.
    ///
    /// ### Returns
    /// Hop distance to the closest such cell, or `None` if there is none.
    pub fn nearest_agent_hops(
        &self,
        id: CellId,
        group: GroupId,
        exclude: Option<CellId>,
    ) -> Option<u32> {
        let mut seen = vec![false; self.cells.len()];
        seen[id] = true;
        let mut queue = VecDeque::from([(id, 0u32)]);

        while let Some((c, d)) = queue.pop_front() {
            for &u in &self.cells[c].neighbors {
                if seen[u] || Some(u) == exclude {
                    continue;
                }
                if self.cells[u]
                    .agent
                    .is_some_and(|a| self.agents[a].group == group)
                {
                    return Some(d + 1);
                }
                seen[u] = true;
                queue.push_back((u, d + 1));
            }
        }
        None
    }

    pub fn count_vertices(&self) -> usize {
        self.cells.len()
    }

    pub fn count_edges(&self) -> usize {
        self.cells.iter().map(Cell::valence).sum::<usize>() / 2
    }

    /// Face count from Euler's formula for a closed genus-0 surface,
    /// `V - E + F = 2`. Vertex splits never change the genus.
    pub fn count_faces(&self) -> usize {
        (self.count_edges() + 2).saturating_sub(self.count_vertices())
    }

    /// Translates the mesh so the mean cell position is the origin.
    pub fn center(&mut self) {
        if self.cells.is_empty() {
            return;
        }
        let sum: DVec3 = self.cells.iter().map(|c| c.pos).sum();
        let shift = -sum / self.cells.len() as f64;
        for c in &mut self.cells {
            c.pos += shift;
        }
    }

    /// Centers the mesh, then projects every cell onto a sphere sized so
    /// edges come out near unit length.
    pub fn sphericalize(&mut self) {
        let radius = (self.cells.len() as f64 / 12.0).sqrt();
        self.center();
        for c in &mut self.cells {
            c.pos = c.pos.normalize_or_zero() * radius;
        }
    }

    /// Cell positions after `rounds` of averaging each cell with its
    /// neighbors. The mesh itself is left unchanged.
    pub fn smoothed_positions(&self, rounds: usize) -> Vec<DVec3> {
        let mut current: Vec<DVec3> = self.cells.iter().map(|c| c.pos).collect();
        for _ in 0..rounds {
            current = self
                .cells
                .iter()
                .map(|c| {
                    let sum = c.neighbors.iter().fold(current[c.index], |acc, &v| acc + current[v]);
                    sum / (c.neighbors.len() + 1) as f64
                })
                .collect();
        }
        current
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// ### Panics
    /// Panics if `id` is not an agent of this mesh.
    pub fn agent(&self, id: AgentId) -> &Agent {
        &self.agents[id]
    }

    /// ### Panics
    /// Panics if `id` is not an agent of this mesh.
    pub fn agent_mut(&mut self, id: AgentId) -> &mut Agent {
        &mut self.agents[id]
    }

    pub fn groups(&self) -> &[AgentGroup] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&AgentGroup> {
        self.groups.get(id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut AgentGroup> {
        self.groups.get_mut(id)
    }

    /// Registers a group and returns its id.
    pub fn add_group(&mut self, group: AgentGroup) -> GroupId {
        self.groups.push(group);
        self.groups.len() - 1
    }

    /// Finds a group by case-insensitive name.
    pub fn find_group(&self, name: &str) -> Option<GroupId> {
        self.groups.iter().position(|g| g.match_name(name))
    }

    /// Distance from `cell` to the nearest other agent of `group`, as
    /// measured by the configured [`NearestAgent`] strategy.
    pub fn nearest_agent(&self, cell: CellId, group: GroupId) -> u32 {
        self.nearest.nearest(self, cell, group)
    }

    /// Creates an agent of `group` in `cell`.
    ///
    /// ### Returns
    /// - `Ok(Some(id))` for the new agent.
    /// - `Ok(None)` if the group's inhibition distance forbids an agent
    ///   this close to an existing one.
    /// - `Err(AgentError::Occupied)` if the cell already hosts an agent.
    ///
    /// ### Panics
    /// Panics if `cell` is not a cell of this mesh.
    pub fn create_agent(
        &mut self,
        group: GroupId,
        cell: CellId,
    ) -> Result<Option<AgentId>, AgentError> {
        let g = self.groups.get(group).ok_or(AgentError::UnknownGroup(group))?;
        let (inhibit, step_start) = (g.inhibit_distance(), g.step_start);
        if self.cells[cell].agent.is_some() {
            return Err(AgentError::Occupied(cell));
        }
        if inhibit > 0 && self.nearest_agent(cell, group) < inhibit {
            trace!(cell, group, inhibit, "agent creation inhibited");
            return Ok(None);
        }

        let id = self.agents.len();
        self.agents
            .push(Agent::new(group, cell, step_start, self.cfg.default_fatness));
        self.cells[cell].agent = Some(id);
        self.groups[group].members.push(id);
        Ok(Some(id))
    }

    /// Detaches the agent hosted by `cell` from the mesh and from `group`.
    ///
    /// The agent's slot remains, with no host cell.
    ///
    /// ### Panics
    /// Panics if `cell` is not a cell of this mesh.
    pub fn remove_agent(&mut self, group: GroupId, cell: CellId) -> Result<AgentId, AgentError> {
        let agent = self.cells[cell].agent.ok_or(AgentError::NoAgent(cell))?;
        let g = self
            .groups
            .get_mut(group)
            .ok_or(AgentError::UnknownGroup(group))?;
        if !g.remove_member(agent) {
            return Err(AgentError::NotMember { cell, group });
        }

        self.cells[cell].agent = None;
        self.agents[agent].cell = None;
        Ok(agent)
    }

    /// Transplants the agent in `from` into the empty cell `to`.
    ///
    /// ### Panics
    /// Panics if `from` or `to` is not a cell of this mesh.
    pub fn move_agent(&mut self, from: CellId, to: CellId) -> Result<(), AgentError> {
        let agent = self.cells[from].agent.ok_or(AgentError::NoAgent(from))?;
        if self.cells[to].agent.is_some() {
            return Err(AgentError::Occupied(to));
        }

        self.cells[from].agent = None;
        self.cells[to].agent = Some(agent);
        self.agents[agent].cell = Some(to);
        Ok(())
    }
}

/// All-pairs shortest hop counts by Floyd–Warshall.
fn count_hops(cells: &[Cell]) -> Vec<Vec<u32>> {
    let n = cells.len();
    let mut hops = vec![vec![UNREACHABLE; n]; n];
    for (i, row) in hops.iter_mut().enumerate() {
        row[i] = 0;
    }
    for c in cells {
        for &v in &c.neighbors {
            hops[c.index][v] = hops[c.index][v].min(1);
        }
    }

    for k in 0..n {
        for i in 0..n {
            let ik = hops[i][k];
            if ik == UNREACHABLE {
                continue;
            }
            for j in 0..n {
                let through = ik + hops[k][j];
                if through < hops[i][j] {
                    hops[i][j] = through;
                }
            }
        }
    }
    hops
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    pub(crate) fn tetrahedron() -> Mesh {
        let verts = [
            [1.0, 1.0, 1.0],
            [-1.0, -1.0, 1.0],
            [-1.0, 1.0, -1.0],
            [1.0, -1.0, -1.0],
        ];
        let adj = vec![vec![1, 2, 3], vec![0, 3, 2], vec![0, 1, 3], vec![0, 2, 1]];
        Mesh::new(&verts, &adj, Config::default()).expect("valid tetrahedron")
    }

    pub(crate) fn octahedron() -> Mesh {
        octahedron_with(Config::default())
    }

    /// Unit octahedron with counter-clockwise fans seen from outside.
    pub(crate) fn octahedron_with(cfg: Config) -> Mesh {
        let verts = [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ];
        let adj = vec![
            vec![2, 4, 3, 5],
            vec![2, 5, 3, 4],
            vec![4, 0, 5, 1],
            vec![4, 1, 5, 0],
            vec![0, 2, 1, 3],
            vec![0, 3, 1, 2],
        ];
        Mesh::new(&verts, &adj, cfg).expect("valid octahedron")
    }

    pub(crate) fn assert_symmetric(mesh: &Mesh) {
        for c in mesh.cells() {
            for &u in c.neighbors() {
                let back = mesh.cell(u).neighbors().iter().filter(|&&v| v == c.index()).count();
                assert_eq!(back, 1, "cell {} appears {back} times around {u}", c.index());
            }
        }
    }

    #[test]
    fn new_rejects_mismatched_lengths() {
        let err = Mesh::new(&[[0.0; 3]; 2], &[vec![1]], Config::default()).unwrap_err();
        assert_eq!(
            err,
            MeshError::LengthMismatch {
                vertices: 2,
                adjacency: 1
            }
        );
    }

    #[test]
    fn new_rejects_out_of_range_neighbor() {
        let err = Mesh::new(&[[0.0; 3]; 2], &[vec![1], vec![2]], Config::default()).unwrap_err();
        assert_eq!(
            err,
            MeshError::NeighborOutOfRange {
                cell: 1,
                neighbor: 2,
                len: 2
            }
        );
    }

    #[test]
    fn new_fills_regions_from_hop_table() {
        let mesh = octahedron();

        assert_eq!(mesh.initial_hops()[0][1], 2);
        assert_eq!(mesh.initial_hops()[0][4], 1);
        assert_eq!(mesh.dist(0, 0), 0);
        assert_eq!(mesh.dist(0, 2), 1);
        assert_eq!(mesh.dist(0, 1), 2);
        assert_eq!(mesh.cell(0).region().len(), 6);
        for c in mesh.cells() {
            assert_eq!(c.radius(), 1.0);
        }
    }

    #[test]
    fn dist_saturates_outside_region() {
        let mut cfg = Config::default();
        cfg.region_radius = 1;
        let mesh = Mesh::new(
            &[[0.0; 3]; 4],
            &[vec![1], vec![0, 2], vec![1, 3], vec![2]],
            cfg,
        )
        .expect("valid path");

        assert_eq!(mesh.dist(0, 1), 1);
        assert_eq!(mesh.dist(0, 2), 2);
        assert_eq!(mesh.dist(0, 3), 2);
        assert_eq!(mesh.initial_hops()[0][3], 3);
    }

    #[test]
    fn divide_tetrahedron_vertex() {
        let mut mesh = tetrahedron();

        let sib = mesh.divide(0).expect("divide succeeds");

        assert_eq!(sib, 4);
        assert_eq!(mesh.len(), 5);
        assert_eq!(mesh.cell(0).neighbors(), &[1, 2, 4]);
        assert_eq!(mesh.cell(4).neighbors(), &[2, 3, 1, 0]);
        assert_eq!(mesh.cell(0).valence() + mesh.cell(4).valence(), 3 + 4);
        // Boundary cells gained the sibling next to the divided cell.
        assert_eq!(mesh.cell(1).neighbors(), &[0, 4, 3, 2]);
        assert_eq!(mesh.cell(2).neighbors(), &[4, 0, 1, 3]);
        // The handed-over cell now points at the sibling instead.
        assert_eq!(mesh.cell(3).neighbors(), &[4, 2, 1]);
        assert_symmetric(&mesh);
    }

    #[test]
    fn divide_even_valence_splits_evenly() {
        let mut mesh = octahedron();

        let sib = mesh.divide(4).expect("divide succeeds");

        // All neighbors have valence 4: boundaries are slots 0 and 2.
        assert_eq!(mesh.cell(4).neighbors(), &[0, 2, 1, sib]);
        assert_eq!(mesh.cell(sib).neighbors(), &[1, 3, 0, 4]);
        assert_eq!(mesh.cell(0).valence(), 5);
        assert_eq!(mesh.cell(1).valence(), 5);
        assert_eq!(mesh.cell(2).valence(), 4);
        assert_eq!(mesh.cell(3).valence(), 4);
        assert_eq!(mesh.cell(3).neighbors(), &[sib, 1, 5, 0]);
        assert_symmetric(&mesh);
    }

    #[test]
    fn divide_rebuilds_regions() {
        let mut mesh = octahedron();
        let sib = mesh.divide(4).expect("divide succeeds");

        for c in mesh.cells() {
            let fresh = calc_region(mesh.cells(), c.index(), mesh.region_radius());
            assert_eq!(c.region(), &fresh, "stale region for cell {}", c.index());
        }
        assert_eq!(mesh.dist(sib, 4), 1);
        assert_eq!(mesh.dist(sib, 2), 2);
    }

    #[test]
    fn divide_copies_appearance_and_position() {
        let mut mesh = octahedron();
        mesh.set_radius_local(4, 0.7);
        mesh.cell_mut(4).color = crate::appearance::Color::rgb(1, 2, 3);

        let sib = mesh.divide(4).expect("divide succeeds");

        assert_eq!(mesh.cell(sib).pos, mesh.cell(4).pos);
        assert_eq!(mesh.cell(sib).radius(), 0.7);
        assert_eq!(mesh.cell(sib).color, mesh.cell(4).color);
        assert!(!mesh.cell(sib).has_agent());
    }

    #[test]
    fn divide_isolated_cell_fails() {
        let mut mesh = Mesh::new(&[[0.0; 3]], &[vec![]], Config::default()).expect("valid");
        assert_eq!(mesh.divide(0), Err(TopologyError::Isolated(0)));
        assert_eq!(mesh.divide(7), Err(TopologyError::UnknownCell(7)));
    }

    #[test]
    fn divide_with_broken_back_reference_leaves_mesh_untouched() {
        // Cell 3 does not list cell 0 although cell 0 lists cell 3.
        let verts = [[0.0; 3]; 4];
        let adj = vec![vec![1, 2, 3], vec![0, 3, 2], vec![0, 1, 3], vec![2, 1]];
        let mut mesh = Mesh::new(&verts, &adj, Config::default()).expect("shape is valid");
        let before: Vec<Vec<CellId>> = mesh
            .cells()
            .iter()
            .map(|c| c.neighbors().to_vec())
            .collect();

        let err = mesh.divide(0).unwrap_err();

        assert_eq!(
            err,
            TopologyError::MissingBackReference {
                cell: 0,
                neighbor: 3
            }
        );
        assert_eq!(mesh.len(), 4);
        let after: Vec<Vec<CellId>> = mesh.cells().iter().map(|c| c.neighbors().to_vec()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn normal_points_outward() {
        let mesh = octahedron();

        assert!(mesh.normal(4).abs_diff_eq(DVec3::Z, 1e-12));
        assert!(mesh.normal(5).abs_diff_eq(DVec3::NEG_Z, 1e-12));
        assert!(mesh.normal(0).abs_diff_eq(DVec3::X, 1e-12));
        assert!(mesh.normal(3).abs_diff_eq(DVec3::NEG_Y, 1e-12));
    }

    #[test]
    fn normal_of_isolated_cell_is_zero() {
        let mesh = Mesh::new(&[[1.0, 2.0, 3.0]], &[vec![]], Config::default()).expect("valid");
        assert_eq!(mesh.normal(0), DVec3::ZERO);
    }

    #[test]
    fn avg_neighbors_includes_self() {
        let mesh = octahedron();
        let avg = mesh.avg_neighbors(4);
        assert!(avg.abs_diff_eq(DVec3::new(0.0, 0.0, 0.2), 1e-12));
    }

    #[test]
    fn relax_moves_toward_rest_lengths() {
        let mut mesh = octahedron();
        let before = mesh.cell(4).pos;

        let step = mesh.relax(4).expect("octahedron apex is regular");

        // Every spring is compressed, so the apex is pushed straight out.
        assert_abs_diff_eq!(step.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(step.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(step.z, 0.5, epsilon = 1e-12);
        assert_eq!(mesh.cell(4).pos, before + step);
    }

    #[test]
    fn relax_without_region_is_singular() {
        let mut cfg = Config::default();
        cfg.region_radius = 0;
        let mut mesh = Mesh::new(&[[0.0; 3], [1.0, 0.0, 0.0]], &[vec![1], vec![0]], cfg)
            .expect("valid");

        assert_eq!(mesh.relax(0), Err(RelaxError::Singular(0)));
        assert_eq!(mesh.cell(0).pos, DVec3::ZERO);
    }

    #[test]
    fn set_radius_diffuses_to_neighbors() {
        let mut mesh = octahedron();

        mesh.set_radius(4, 0.5);

        assert_eq!(mesh.cell(4).radius(), 0.5);
        for &v in mesh.cell(4).neighbors() {
            assert_eq!(mesh.cell(v).radius(), 0.75);
        }
        assert_eq!(mesh.cell(5).radius(), 1.0);
    }

    #[test]
    fn collision_ignores_region_members() {
        let mut cfg = Config::default();
        cfg.region_radius = 1;
        let verts = [[0.0; 3], [5.0, 0.0, 0.0], [10.0, 0.0, 0.0], [0.5, 0.0, 0.0]];
        let adj = vec![vec![1], vec![0, 2], vec![1, 3], vec![2]];
        let mesh = Mesh::new(&verts, &adj, cfg).expect("valid path");

        assert_eq!(mesh.collision(0, 1.0), Some(3));
        assert_eq!(mesh.collision(1, 1.0), None);
    }

    #[test]
    fn euler_counts_on_octahedron() {
        let mesh = octahedron();
        assert_eq!(mesh.count_vertices(), 6);
        assert_eq!(mesh.count_edges(), 12);
        assert_eq!(mesh.count_faces(), 8);
    }

    #[test]
    fn center_and_sphericalize() {
        let mut mesh = octahedron();
        for c in 0..mesh.len() {
            mesh.cell_mut(c).pos += DVec3::new(3.0, -1.0, 2.0);
        }

        mesh.center();
        let mean: DVec3 = mesh.cells().iter().map(|c| c.pos).sum::<DVec3>() / 6.0;
        assert!(mean.abs_diff_eq(DVec3::ZERO, 1e-12));

        mesh.sphericalize();
        let r = (6.0f64 / 12.0).sqrt();
        for c in mesh.cells() {
            assert_abs_diff_eq!(c.pos.length(), r, epsilon = 1e-12);
        }
    }

    #[test]
    fn smoothed_positions_do_not_write_back() {
        let mesh = octahedron();

        let smooth = mesh.smoothed_positions(1);

        assert!(smooth[4].abs_diff_eq(DVec3::new(0.0, 0.0, 0.2), 1e-12));
        assert_eq!(mesh.cell(4).pos, DVec3::Z);
        assert_eq!(mesh.smoothed_positions(0)[4], DVec3::Z);
    }

    #[test]
    fn random_neighbor_walks_k_hops() {
        use rand::SeedableRng;
        let mesh = octahedron();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);

        assert_eq!(mesh.random_neighbor(4, 0, &mut rng), Some(4));
        let one = mesh.random_neighbor(4, 1, &mut rng).expect("has neighbors");
        assert_eq!(mesh.dist(4, one), 1);
        let two = mesh.random_neighbor(4, 2, &mut rng).expect("has neighbors");
        assert!(mesh.dist(4, two) <= 2);
    }

    #[test]
    fn agent_links_stay_in_sync() {
        let mut mesh = octahedron();
        let g = mesh.add_group(AgentGroup::new("A"));

        let a = mesh.create_agent(g, 0).expect("empty cell").expect("not inhibited");
        assert_eq!(mesh.cell(0).agent(), Some(a));
        assert_eq!(mesh.agent(a).cell(), Some(0));
        assert_eq!(mesh.create_agent(g, 0), Err(AgentError::Occupied(0)));

        mesh.move_agent(0, 2).expect("target is empty");
        assert_eq!(mesh.cell(0).agent(), None);
        assert_eq!(mesh.cell(2).agent(), Some(a));
        assert_eq!(mesh.agent(a).cell(), Some(2));

        let b = mesh.create_agent(g, 0).expect("empty again").expect("not inhibited");
        assert_eq!(mesh.move_agent(0, 2), Err(AgentError::Occupied(2)));
        assert_eq!(mesh.move_agent(1, 3), Err(AgentError::NoAgent(1)));

        assert_eq!(mesh.remove_agent(g, 2), Ok(a));
        assert_eq!(mesh.agent(a).cell(), None);
        assert_eq!(mesh.cell(2).agent(), None);
        assert_eq!(mesh.group(g).expect("group").members(), &[b]);
    }

    #[test]
    fn remove_agent_checks_membership() {
        let mut mesh = octahedron();
        let a = mesh.add_group(AgentGroup::new("A"));
        let b = mesh.add_group(AgentGroup::new("B"));
        mesh.create_agent(a, 0).expect("empty cell");

        assert_eq!(mesh.remove_agent(b, 0), Err(AgentError::NotMember { cell: 0, group: b }));
        assert_eq!(mesh.remove_agent(a, 1), Err(AgentError::NoAgent(1)));
        assert_eq!(mesh.remove_agent(9, 0), Err(AgentError::UnknownGroup(9)));
        assert!(mesh.cell(0).has_agent());
    }

    #[test]
    fn inhibition_declines_close_agents() {
        let mut mesh = octahedron();
        let g = mesh.add_group(AgentGroup::new("A2"));

        assert!(mesh.create_agent(g, 4).expect("empty").is_some());
        // Cell 0 is one hop from 4, closer than the inhibition distance.
        assert_eq!(mesh.create_agent(g, 0), Ok(None));
        assert!(!mesh.cell(0).has_agent());
        // Cell 5 is two hops away.
        assert!(mesh.create_agent(g, 5).expect("empty").is_some());
    }

    #[test]
    fn odd_valence_split_moves_to_lower_valence_opposite() {
        let mut mesh = octahedron();
        assert_eq!(mesh.divide(0), Ok(6));
        assert_eq!(mesh.divide(0), Ok(7));
        assert_eq!(mesh.cell(3).neighbors(), &[4, 1, 5, 6, 0]);
        let valences: Vec<usize> = [4, 1, 5, 6, 0]
            .iter()
            .map(|&c| mesh.cell(c).valence())
            .collect();
        assert_eq!(valences, vec![5, 4, 4, 5, 4]);

        // Lowest valence is cell 1; half-way round sits cell 6 (valence 5),
        // but its successor, cell 0, has valence 4 and becomes the boundary.
        let sib = mesh.divide(3).expect("valid mesh");

        assert_eq!(sib, 8);
        assert_eq!(mesh.cell(3).neighbors(), &[1, 5, 6, 0, 8]);
        assert_eq!(mesh.cell(8).neighbors(), &[0, 4, 1, 3]);
        assert_eq!(mesh.cell(1).valence(), 5);
        assert_eq!(mesh.cell(0).valence(), 5);
        assert_eq!(mesh.cell(6).valence(), 5);
        assert_eq!(mesh.cell(4).neighbors(), &[0, 7, 2, 1, 8]);
        assert_symmetric(&mesh);
    }

    #[test]
    #[should_panic]
    fn relax_of_unknown_cell_panics() {
        let mut mesh = octahedron();
        let _ = mesh.relax(6);
    }

    #[test]
    #[should_panic]
    fn create_agent_in_unknown_cell_panics() {
        let mut mesh = octahedron();
        let g = mesh.add_group(AgentGroup::new("A"));
        let _ = mesh.create_agent(g, 6);
    }

    #[test]
    fn nearest_agent_hops_searches_whole_mesh() {
        let mut mesh = octahedron();
        let a = mesh.add_group(AgentGroup::new("A"));
        let b = mesh.add_group(AgentGroup::new("B"));
        mesh.create_agent(a, 5).expect("empty cell");
        mesh.create_agent(b, 0).expect("empty cell");

        assert_eq!(mesh.nearest_agent_hops(4, a, None), Some(2));
        assert_eq!(mesh.nearest_agent_hops(0, a, None), Some(1));
        assert_eq!(mesh.nearest_agent_hops(4, b, None), Some(1));
        assert_eq!(mesh.nearest_agent_hops(4, b, Some(0)), None);
        assert_eq!(mesh.nearest_agent_hops(5, a, None), None);
    }
}
