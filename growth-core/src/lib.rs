//! Core library for growing triangulated surfaces by cell division.
//!
//! Main components:
//! - [`mesh`]: the cell arena, vertex-split division and spring relaxation.
//! - [`cell`]: cells, cyclic neighbor navigation and hop-bounded regions.
//! - [`spring`]: gradient and Hessian accumulation for one relaxation step.
//! - [`agent`] and [`group`]: growth agents and the groups they belong to.
//! - [`growth`]: target selection, division and the growth step.
//! - [`behavior`]: script-level agent actions.
//! - [`hooks`]: seams for inhibition distances and line/ring/trail upkeep.
//! - [`appearance`]: cosmetic cell color and texture.
//! - [`config`]: tunables for the mesh and the solver.
//! - [`error`]: error types.
//! - [`types`]: shared id aliases.

pub mod agent;
pub mod appearance;
pub mod behavior;
pub mod cell;
pub mod config;
pub mod error;
pub mod group;
pub mod growth;
pub mod hooks;
pub mod mesh;
pub mod spring;
pub mod types;
