use glam::{DMat3, DVec3};

/// Accumulates the gradient and Hessian of a sum of spring energies,
/// all measured with respect to one free position.
///
/// Each spring contributes `K/2 * (d - L)^2`, where `d` is the current
/// length, `L` the rest length and `K = 1/L`. After every spring has been
/// added, [`SpringSystem::newton_step`] yields the displacement that
/// zeroes the gradient of the quadratic model.
#[derive(Clone, Copy, Debug)]
pub struct SpringSystem {
    grad: DVec3,
    hess: DMat3,
}

impl Default for SpringSystem {
    fn default() -> Self {
        Self {
            grad: DVec3::ZERO,
            hess: DMat3::ZERO,
        }
    }
}

impl SpringSystem {
    /// Adds one spring.
    ///
    /// ### Parameters
    /// - `delta` - Free position minus the anchored end of the spring.
    /// - `rest` - Rest length `L`; must be positive.
    pub fn add_spring(&mut self, delta: DVec3, rest: f64) {
        let k = 1.0 / rest;
        let d2 = delta.length_squared();

        // Coincident ends: no direction to push along, only stiffness.
        if d2 == 0.0 {
            self.hess += DMat3::from_diagonal(DVec3::splat(k));
            return;
        }

        let d = d2.sqrt();
        self.grad += delta * (k * (1.0 - rest / d));

        let sq = delta * delta;
        let c = rest / (d2 * d);
        let kc = k * c;
        let xy = kc * delta.x * delta.y;
        let xz = kc * delta.x * delta.z;
        let yz = kc * delta.y * delta.z;
        self.hess += DMat3::from_cols(
            DVec3::new(k * (1.0 - c * (sq.y + sq.z)), xy, xz),
            DVec3::new(xy, k * (1.0 - c * (sq.x + sq.z)), yz),
            DVec3::new(xz, yz, k * (1.0 - c * (sq.x + sq.y))),
        );
    }

    pub fn gradient(&self) -> DVec3 {
        self.grad
    }

    pub fn hessian(&self) -> DMat3 {
        self.hess
    }

    /// Solves `H * step = -grad`.
    ///
    /// Returns `None` when the Hessian is singular.
    pub fn newton_step(&self) -> Option<DVec3> {
        solve_symmetric3(&self.hess, -self.grad)
    }
}

/// Solves a symmetric 3x3 linear system by closed-form elimination.
///
/// With the matrix laid out as
///
/// ```text
/// [a b c] [x]   [g]
/// [b d e] [y] = [h]
/// [c e f] [z]   [i]
/// ```
///
/// `z` is found first, then `y`, then `x`. Only the upper triangle of `m`
/// is read.
///
/// ### Returns
/// `None` if any pivot is zero or the solution is not finite.
pub fn solve_symmetric3(m: &DMat3, rhs: DVec3) -> Option<DVec3> {
    let (a, b, c) = (m.x_axis.x, m.y_axis.x, m.z_axis.x);
    let (d, e, f) = (m.y_axis.y, m.z_axis.y, m.z_axis.z);
    let (g, h, i) = (rhs.x, rhs.y, rhs.z);

    let bb_ad = b * b - a * d;
    let bc_ae = b * c - a * e;
    let bg_ah = b * g - a * h;
    let cc_af = c * c - a * f;
    let cg_ai = c * g - a * i;

    let denom = bc_ae * bc_ae - bb_ad * cc_af;
    if denom == 0.0 || bb_ad == 0.0 || a == 0.0 {
        return None;
    }

    let z = (bg_ah * bc_ae - bb_ad * cg_ai) / denom;
    let y = (bg_ah - bc_ae * z) / bb_ad;
    let x = (g - b * y - c * z) / a;

    let solution = DVec3::new(x, y, z);
    solution.is_finite().then_some(solution)
}
