//! Cosmetic per-cell attributes carried through divisions.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::YELLOW
    }
}

/// Bump shape drawn on a cell: `alpha` is bump height, `beta` the radius
/// and `gamma` the height at that radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Texture {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Texture {
    pub const FLAT: Texture = Texture::new(0.0, 0.10, 0.0);
    pub const BUMP: Texture = Texture::new(0.10, 0.17, 0.20);
    pub const SPIKE: Texture = Texture::new(1.0, 0.60, 0.20);
    pub const WEB: Texture = Texture::new(-0.30, 0.30, -0.30);
    pub const HAIRY: Texture = Texture::new(1.0, 0.90, 0.0);

    pub const fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self { alpha, beta, gamma }
    }

    /// Builds a texture from percentages as written in growth scripts.
    ///
    /// `alpha` and `gamma` map to `[-1, 1]`, `beta` to `[0.01, 0.99]`.
    pub fn from_percent(alpha: i32, beta: i32, gamma: i32) -> Self {
        Self {
            alpha: (f64::from(alpha) / 100.0).clamp(-1.0, 1.0),
            beta: (f64::from(beta) / 100.0).clamp(0.01, 0.99),
            gamma: (f64::from(gamma) / 100.0).clamp(-1.0, 1.0),
        }
    }
}

impl Default for Texture {
    fn default() -> Self {
        Self::BUMP
    }
}
