use crate::{mesh::Mesh, types::AgentId};

/// A named set of agents sharing inhibition and script parameters.
///
/// A name ending in a digit `1..=9` sets the inhibition distance: no new
/// agent of the group may be created closer than that many hops to an
/// existing one.
#[derive(Clone, Debug)]
pub struct AgentGroup {
    name: String,
    pub(crate) members: Vec<AgentId>,
    inhibit_distance: u32,
    /// First script step of this group, `-1` when unscripted.
    pub step_start: i32,
    /// First script step after this group's part, `-1` when unscripted.
    pub step_end: i32,
}

impl AgentGroup {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let inhibit_distance = name
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .unwrap_or(0);

        Self {
            name,
            members: Vec::new(),
            inhibit_distance,
            step_start: -1,
            step_end: -1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attached agents of this group, in creation order.
    pub fn members(&self) -> &[AgentId] {
        &self.members
    }

    pub fn inhibit_distance(&self) -> u32 {
        self.inhibit_distance
    }

    /// Case-insensitive name comparison.
    pub fn match_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Number of members that are not frozen.
    pub fn count_live(&self, mesh: &Mesh) -> usize {
        self.members
            .iter()
            .filter(|&&a| !mesh.agent(a).frozen)
            .count()
    }

    pub(crate) fn remove_member(&mut self, agent: AgentId) -> bool {
        match self.members.iter().position(|&a| a == agent) {
            Some(i) => {
                self.members.remove(i);
                true
            }
            None => false,
        }
    }
}
