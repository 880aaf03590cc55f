//! Physical relations used by the geometry solver.
//!
//! Units follow the interferometer design convention: energies in keV,
//! wavelengths and pitches in µm, distances in mm.

use std::f64::consts::PI;

/// Planck constant times the speed of light (eV·µm).
pub const H_C: f64 = 1.239_841_93;

/// Convert a photon energy (keV) to its wavelength (µm).
///
/// $\lambda = hc / E$
pub fn energy_to_wavelength(energy_kev: f64) -> f64 {
    H_C / (energy_kev * 1e3)
}

/// Harmonic factor $\nu$ of the G1 phase shift.
///
/// $\nu = \mathrm{round}(2\varphi / \pi)$: a π-shifting G1 gives $\nu = 2$,
/// a π/2-shifting G1 gives $\nu = 1$.
pub fn harmonic_factor(phase_shift_rad: f64) -> f64 {
    (phase_shift_rad * 2.0 / PI).round()
}

/// Talbot length of a pitch (mm): $n p^2 / (2\lambda)$.
///
/// # Arguments
/// * `talbot_order` - Fractional Talbot order $n$.
/// * `pitch_um` - Grating pitch (µm).
/// * `wavelength_um` - Design wavelength (µm).
pub fn talbot_length(talbot_order: f64, pitch_um: f64, wavelength_um: f64) -> f64 {
    talbot_order * pitch_um * pitch_um / (2.0 * wavelength_um) * 1e-3
}

/// Fractional Talbot distance $D_n = n (p_1/\nu)^2 / (2\lambda)$ (mm).
///
/// This is the G1-G2 spacing of a parallel-beam setup and the unmagnified
/// self-imaging distance of a cone-beam setup.
pub fn fractional_talbot_distance(
    talbot_order: f64,
    pitch_g1_um: f64,
    nu: f64,
    wavelength_um: f64,
) -> f64 {
    talbot_length(talbot_order, pitch_g1_um / nu, wavelength_um)
}

/// Cone-beam G1-G2 distance for a source-to-G1 distance `to_g1` (mm):
/// $d = l D_n / (l - D_n)$.
pub fn magnified_talbot_distance(to_g1: f64, talbot_distance: f64) -> f64 {
    to_g1 * talbot_distance / (to_g1 - talbot_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_energy_to_wavelength() {
        // 35 keV is about 0.354 Å.
        assert_relative_eq!(
            energy_to_wavelength(35.0),
            3.542_405_514_285_714e-5,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_harmonic_factor() {
        assert_eq!(harmonic_factor(PI), 2.0);
        assert_eq!(harmonic_factor(PI / 2.0), 1.0);
        // Small deviations from the nominal shift still round to the same factor.
        assert_eq!(harmonic_factor(0.97 * PI), 2.0);
    }

    #[test]
    fn test_fractional_talbot_distance_units() {
        // p1 = 4 µm, nu = 2 -> effective period 2 µm; lambda = 0.5 Å.
        let d = fractional_talbot_distance(1.0, 4.0, 2.0, 5e-5);
        assert_relative_eq!(d, 40.0, max_relative = 1e-12);
        assert_relative_eq!(talbot_length(3.0, 2.0, 5e-5), 120.0, max_relative = 1e-12);
    }

    #[test]
    fn test_magnified_distance_exceeds_plain_distance() {
        let dn = 40.0;
        let d = magnified_talbot_distance(1000.0, dn);
        assert!(d > dn);
        assert_relative_eq!(d, 1000.0 * 40.0 / 960.0, max_relative = 1e-12);
    }
}
