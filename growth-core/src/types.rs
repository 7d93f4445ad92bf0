/// Identifier for a cell in a [`crate::mesh::Mesh`].
///
/// This is an index into the mesh's cell arena. It is assigned once, when
/// the cell is created, and is never reused: cells are never removed.
pub type CellId = usize;

/// Identifier for an agent in a [`crate::mesh::Mesh`].
///
/// Agents that are removed keep their slot, so an `AgentId` stays valid
/// for the lifetime of the mesh.
pub type AgentId = usize;

/// Identifier for an agent group registered with a [`crate::mesh::Mesh`].
pub type GroupId = usize;

/// Opaque handle to a line, ring or trail structure maintained by a
/// [`crate::hooks::StructureHooks`] implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StructureId(pub u32);
