//! Error types for mesh construction, topology surgery, relaxation and
//! agent bookkeeping.
//!
//! Policy declines (an inhibited agent, an agent with nothing to divide)
//! are not errors; they come back as `Option`/`bool` results.

use crate::types::{AgentId, CellId, GroupId};
use thiserror::Error;

/// Invalid input handed to [`crate::mesh::Mesh::new`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("{vertices} vertices but {adjacency} adjacency lists")]
    LengthMismatch { vertices: usize, adjacency: usize },
    #[error("cell {cell} lists neighbor {neighbor}, but only {len} cells exist")]
    NeighborOutOfRange {
        cell: CellId,
        neighbor: usize,
        len: usize,
    },
}

/// Structural invariant violations. The operation that hits one is
/// aborted before anything is written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("cell {0} has no neighbors and cannot divide")]
    Isolated(CellId),
    #[error("cell {cell} is missing from the adjacency of its neighbor {neighbor}")]
    MissingBackReference { cell: CellId, neighbor: CellId },
    #[error("no cell with index {0}")]
    UnknownCell(CellId),
}

/// Numerical failure of a single relaxation step.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelaxError {
    #[error("spring system for cell {0} is singular")]
    Singular(CellId),
}

/// Misuse of the agent bookkeeping API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("cell {0} already hosts an agent")]
    Occupied(CellId),
    #[error("cell {0} hosts no agent")]
    NoAgent(CellId),
    #[error("agent in cell {cell} does not belong to group {group}")]
    NotMember { cell: CellId, group: GroupId },
    #[error("no agent group with index {0}")]
    UnknownGroup(GroupId),
    #[error("agent {0} has been removed from the mesh")]
    Detached(AgentId),
}

/// Anything that can abort a growth step.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrowthError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Agent(#[from] AgentError),
}
