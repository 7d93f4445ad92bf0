use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hop cutoff for every cell's cached region.
    pub region_radius: u32,
    /// Target radius given to cells built from the input topology.
    pub cell_radius: f64,
    /// Per-component bound on a single relaxation step.
    pub max_step: f64,
    /// Euclidean distance under which a non-region cell counts as a collision.
    pub collision_distance: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    /// Hop radius around an agent inside which local growth may divide.
    pub default_fatness: u32,
    /// Relaxation sweeps over the two split cells' neighbors after a division.
    pub relax_passes: u32,
    /// Random single-cell relaxations after each division of an initial blob.
    pub blob_relax_sweep: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region_radius: 2,
            cell_radius: 1.0,
            max_step: 0.5,
            collision_distance: 1.5,
            min_radius: 0.2,
            max_radius: 1.8,
            default_fatness: 1,
            relax_passes: 2,
            blob_relax_sweep: 50,
        }
    }
}

impl Config {
    /// Clamps a requested cell radius into `[min_radius, max_radius]`.
    pub fn clamp_radius(&self, radius: f64) -> f64 {
        radius.clamp(self.min_radius, self.max_radius)
    }
}
