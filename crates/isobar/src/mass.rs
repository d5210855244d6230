use serde::{Deserialize, Serialize};

pub const PROTON: f64 = 1.007276;

/// Smallest modification mass delta consistent with a TMT reagent tag
pub const REAGENT_TAG_MASS: f64 = 229.1629;

pub const PHOSPHO_MASS: f64 = 79.9663;

/// Observations with a precursor mass difference inside this window (Da)
/// are counted as unmodified
pub const UNMODIFIED_WINDOW: f64 = 0.99;

#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Tolerance {
    Ppm(f64, f64),
    Da(f64, f64),
}

impl Tolerance {
    /// Compute the (`lower`, `upper`) window (in m/z or Da) for a center
    /// value and a given tolerance
    pub fn bounds(&self, center: f64) -> (f64, f64) {
        match self {
            Tolerance::Ppm(lo, hi) => {
                let delta_lo = center * lo / 1_000_000.0;
                let delta_hi = center * hi / 1_000_000.0;
                (center + delta_lo, center + delta_hi)
            }
            Tolerance::Da(lo, hi) => (center + lo, center + hi),
        }
    }
}

/// Round `value` half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Truncate `value` toward zero to `places` decimals
pub fn truncate_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).trunc() / scale
}

/// m/z of a neutral mass at charge `z`
pub fn mz(neutral_mass: f64, z: u8) -> f64 {
    let z = z.max(1) as f64;
    (neutral_mass + z * PROTON) / z
}
