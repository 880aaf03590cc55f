//! Integration tests: every topology solved end to end through `solve`.

use std::f64::consts::PI;

use approx::assert_relative_eq;
use talbot_core::distances::Span;
use talbot_core::optics::{energy_to_wavelength, fractional_talbot_distance, talbot_length};
use talbot_core::solver::{solve, GeometryError, SolveError};
use talbot_core::types::{
    BeamGeometry, Component, FixedDistance, GeometryParameters, GratingParams, Grating, Topology,
};

const ENERGY_KEV: f64 = 25.0;

fn setup(components: &[Component], topology: Topology, beam: BeamGeometry) -> GeometryParameters {
    let mut params = GeometryParameters::new(components.to_vec(), topology, beam);
    params.design_energy = Some(ENERGY_KEV);
    params.talbot_order = Some(1.0);
    params.phase_shift_g1 = Some(PI);
    params
        .distances
        .set(Component::G2, Component::Detector, 100.0);
    params
}

fn two_gratings() -> Vec<Component> {
    vec![
        Component::Source,
        Component::G1,
        Component::G2,
        Component::Detector,
    ]
}

fn three_gratings() -> Vec<Component> {
    vec![
        Component::Source,
        Component::G0,
        Component::G1,
        Component::G2,
        Component::Detector,
    ]
}

/// $D_n$ for a 4 µm π-shifting G1 at the design energy.
fn talbot_distance_4um() -> f64 {
    fractional_talbot_distance(1.0, 4.0, 2.0, energy_to_wavelength(ENERGY_KEV))
}

fn distance(params: &GeometryParameters, from: Component, to: Component) -> f64 {
    params
        .distances
        .get(Span::new(from, to))
        .unwrap_or_else(|| panic!("missing {}", Span::new(from, to)))
}

#[test]
fn test_symmetrical_g1_fixed() {
    let mut params = setup(
        &two_gratings(),
        Topology::Symmetrical {
            fixed_grating: Grating::G1,
        },
        BeamGeometry::Cone,
    );
    params.gratings.g1 = GratingParams::with_pitch(4.0, 0.5);

    let solution = solve(&params).unwrap();
    let out = &solution.parameters;
    let dn = talbot_distance_4um();

    assert_relative_eq!(out.gratings.g2.pitch.unwrap(), 4.0, max_relative = 1e-12);
    assert_eq!(out.gratings.g2.duty_cycle, Some(0.5));
    assert_relative_eq!(distance(out, Component::G1, Component::G2), 2.0 * dn, max_relative = 1e-12);
    assert_relative_eq!(
        distance(out, Component::Source, Component::G2),
        2.0 * distance(out, Component::Source, Component::G1),
        max_relative = 1e-12
    );
    assert_relative_eq!(
        distance(out, Component::Source, Component::Detector),
        4.0 * dn + 100.0,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        out.design_wavelength.unwrap(),
        energy_to_wavelength(ENERGY_KEV),
        max_relative = 1e-15
    );
}

#[test]
fn test_symmetrical_with_g0_fixed() {
    let mut params = setup(
        &three_gratings(),
        Topology::Symmetrical {
            fixed_grating: Grating::G0,
        },
        BeamGeometry::Cone,
    );
    params.gratings.g0 = GratingParams::with_pitch(8.0, 0.4);
    params.distances.set(Component::Source, Component::G0, 20.0);

    let out = solve(&params).unwrap().parameters;

    // p1 = nu p0 / 2, p2 = p0
    assert_relative_eq!(out.gratings.g1.pitch.unwrap(), 8.0, max_relative = 1e-12);
    assert_relative_eq!(out.gratings.g2.pitch.unwrap(), 8.0, max_relative = 1e-12);
    assert_eq!(out.gratings.g1.duty_cycle, Some(0.4));
    assert_relative_eq!(
        distance(&out, Component::G0, Component::G2),
        2.0 * distance(&out, Component::G0, Component::G1),
        max_relative = 1e-12
    );
    assert_relative_eq!(
        distance(&out, Component::Source, Component::G1),
        20.0 + distance(&out, Component::G0, Component::G1),
        max_relative = 1e-12
    );
}

#[test]
fn test_conventional_parallel() {
    let mut params = setup(
        &two_gratings(),
        Topology::Conventional {
            fixed_grating: Grating::G1,
            fixed_distance: None,
        },
        BeamGeometry::Parallel,
    );
    params.gratings.g1 = GratingParams::with_pitch(4.0, 0.5);
    params.distances.set(Component::Source, Component::G1, 1000.0);

    let out = solve(&params).unwrap().parameters;

    assert_relative_eq!(out.gratings.g2.pitch.unwrap(), 2.0, max_relative = 1e-12);
    assert_relative_eq!(
        distance(&out, Component::G1, Component::G2),
        talbot_distance_4um(),
        max_relative = 1e-12
    );
}

#[test]
fn test_conventional_cone_g1_fixed_with_g0() {
    let fixed_distance = Some(FixedDistance::G0G1);
    let mut params = setup(
        &three_gratings(),
        Topology::Conventional {
            fixed_grating: Grating::G1,
            fixed_distance,
        },
        BeamGeometry::Cone,
    );
    params.gratings.g1 = GratingParams::with_pitch(4.0, 0.5);
    params.distances.set(Component::Source, Component::G0, 10.0);
    params.distances.set(Component::G0, Component::G1, 1000.0);

    let out = solve(&params).unwrap().parameters;
    let l = 1000.0;
    let d = distance(&out, Component::G1, Component::G2);
    let magnification = (l + d) / l;

    assert!(d < l);
    assert_relative_eq!(
        out.gratings.g2.pitch.unwrap(),
        magnification * 4.0 / 2.0,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        out.gratings.g0.pitch.unwrap(),
        l / d * out.gratings.g2.pitch.unwrap(),
        max_relative = 1e-12
    );
    assert_eq!(out.gratings.g0.duty_cycle, Some(0.5));
    assert_relative_eq!(
        distance(&out, Component::Source, Component::G2),
        10.0 + l + d,
        max_relative = 1e-12
    );
}

#[test]
fn test_conventional_cone_g2_fixed() {
    let fixed_distance = Some(FixedDistance::SourceG1);
    let mut params = setup(
        &two_gratings(),
        Topology::Conventional {
            fixed_grating: Grating::G2,
            fixed_distance,
        },
        BeamGeometry::Cone,
    );
    params.gratings.g2 = GratingParams::with_pitch(4.0, 0.5);
    params.distances.set(Component::Source, Component::G1, 1000.0);

    let out = solve(&params).unwrap().parameters;
    let k = talbot_length(1.0, 4.0, energy_to_wavelength(ENERGY_KEV));
    let d = distance(&out, Component::G1, Component::G2);

    assert_relative_eq!(d * d + 1000.0 * d, k * 1000.0, max_relative = 1e-9);
    assert_relative_eq!(
        out.gratings.g1.pitch.unwrap(),
        2.0 * 4.0 * 1000.0 / (1000.0 + d),
        max_relative = 1e-12
    );
}

#[test]
fn test_conventional_cone_g0_fixed() {
    let fixed_distance = Some(FixedDistance::G0G2);
    let mut params = setup(
        &three_gratings(),
        Topology::Conventional {
            fixed_grating: Grating::G0,
            fixed_distance,
        },
        BeamGeometry::Cone,
    );
    params.gratings.g0 = GratingParams::with_pitch(20.0, 0.5);
    params.distances.set(Component::Source, Component::G0, 10.0);
    params.distances.set(Component::G0, Component::G2, 1500.0);

    let out = solve(&params).unwrap().parameters;
    let l = distance(&out, Component::G0, Component::G1);
    let d = distance(&out, Component::G1, Component::G2);

    assert_relative_eq!(l + d, 1500.0, max_relative = 1e-12);
    assert!(l > d);
    // G0 pitch projects onto G2 through G1
    assert_relative_eq!(
        out.gratings.g2.pitch.unwrap(),
        20.0 * d / l,
        max_relative = 1e-12
    );
}

#[test]
fn test_conventional_dual_phase() {
    let fixed_distance = Some(FixedDistance::SourceG1);
    let mut params = setup(
        &two_gratings(),
        Topology::Conventional {
            fixed_grating: Grating::G1,
            fixed_distance,
        },
        BeamGeometry::Cone,
    );
    params.dual_phase = true;
    params.gratings.g1 = GratingParams::with_pitch(1.0, 0.5);
    params.distances.set(Component::Source, Component::G1, 100.0);
    params.distances.set(Component::G1, Component::G2, 20.0);
    params.distances.set(Component::G2, Component::Detector, 880.0);

    let solution = solve(&params).unwrap();
    let out = &solution.parameters;

    assert_relative_eq!(distance(out, Component::Source, Component::G2), 120.0);
    assert_relative_eq!(distance(out, Component::Source, Component::Detector), 1000.0);
    assert_relative_eq!(out.gratings.g2.pitch.unwrap(), 1.2, max_relative = 1e-12);

    let fringe = solution.results.gratings.fringe.unwrap();
    assert_relative_eq!(fringe.pitch, 50.0, max_relative = 1e-12);
    assert_eq!(fringe.duty_cycle, Some(0.5));
}

#[test]
fn test_inverse_g1_fixed() {
    let fixed_distance = FixedDistance::SourceG1;
    let mut params = setup(
        &two_gratings(),
        Topology::Inverse {
            fixed_grating: Grating::G1,
            fixed_distance,
        },
        BeamGeometry::Cone,
    );
    params.gratings.g1 = GratingParams::with_pitch(4.0, 0.5);
    params.distances.set(Component::Source, Component::G1, 60.0);

    let out = solve(&params).unwrap().parameters;
    let dn = talbot_distance_4um();
    let d = distance(&out, Component::G1, Component::G2);

    assert!(d > 60.0);
    assert_relative_eq!(d, 60.0 * dn / (60.0 - dn), max_relative = 1e-12);
}

#[test]
fn test_inverse_g2_and_g0_fixed() {
    let mut params = setup(
        &two_gratings(),
        Topology::Inverse {
            fixed_grating: Grating::G2,
            fixed_distance: FixedDistance::SourceG1,
        },
        BeamGeometry::Cone,
    );
    params.gratings.g2 = GratingParams::with_pitch(4.0, 0.5);
    params.distances.set(Component::Source, Component::G1, 50.0);
    let out = solve(&params).unwrap().parameters;
    assert!(distance(&out, Component::G1, Component::G2) > 50.0);

    let mut params = setup(
        &three_gratings(),
        Topology::Inverse {
            fixed_grating: Grating::G0,
            fixed_distance: FixedDistance::G0G1,
        },
        BeamGeometry::Cone,
    );
    params.gratings.g0 = GratingParams::with_pitch(20.0, 0.5);
    params.distances.set(Component::Source, Component::G0, 10.0);
    params.distances.set(Component::G0, Component::G1, 3000.0);
    let out = solve(&params).unwrap().parameters;
    let d = distance(&out, Component::G1, Component::G2);
    assert!(d > 3000.0);
    assert_relative_eq!(out.gratings.g2.pitch.unwrap(), 20.0 * d / 3000.0, max_relative = 1e-12);
}

#[test]
fn test_free_geometry_uses_entered_distances() {
    let mut params = setup(&two_gratings(), Topology::Free, BeamGeometry::Cone);
    params.design_energy = None;
    params.phase_shift_g1 = None;
    params.distances.set(Component::Source, Component::G1, 700.0);
    params.distances.set(Component::G1, Component::G2, 300.0);

    let out = solve(&params).unwrap().parameters;
    assert_relative_eq!(distance(&out, Component::Source, Component::G2), 1000.0);
    assert_relative_eq!(distance(&out, Component::Source, Component::Detector), 1100.0);
    assert!(out.gratings.g1.pitch.is_none());
}

#[test]
fn test_conventional_distance_too_small() {
    let fixed_distance = Some(FixedDistance::SourceG1);
    let mut params = setup(
        &two_gratings(),
        Topology::Conventional {
            fixed_grating: Grating::G1,
            fixed_distance,
        },
        BeamGeometry::Cone,
    );
    params.gratings.g1 = GratingParams::with_pitch(4.0, 0.5);
    params.distances.set(Component::Source, Component::G1, 30.0);

    let err = solve(&params).unwrap_err();
    assert!(err.is_recoverable());
    assert!(err
        .to_string()
        .contains("too small for chosen talbot order, energy and pitch of G1"));
    match err {
        SolveError::Geometry(GeometryError::DistanceTooSmall { minimum, .. }) => {
            assert_relative_eq!(minimum, 2.0 * talbot_distance_4um(), max_relative = 1e-12);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_total_length_below_four_talbot_distances() {
    let mut params = setup(
        &two_gratings(),
        Topology::Conventional {
            fixed_grating: Grating::G1,
            fixed_distance: Some(FixedDistance::SourceG2),
        },
        BeamGeometry::Cone,
    );
    params.gratings.g1 = GratingParams::with_pitch(4.0, 0.5);
    params.distances.set(Component::Source, Component::G2, 100.0);

    let err = solve(&params).unwrap_err();
    assert_eq!(
        err,
        SolveError::Geometry(GeometryError::DistanceTooSmall {
            distance: FixedDistance::SourceG2,
            grating: Grating::G1,
            minimum: 4.0 * talbot_distance_4um(),
        })
    );
}

#[test]
fn test_inverse_distance_too_large() {
    let mut params = setup(
        &two_gratings(),
        Topology::Inverse {
            fixed_grating: Grating::G1,
            fixed_distance: FixedDistance::SourceG1,
        },
        BeamGeometry::Cone,
    );
    params.gratings.g1 = GratingParams::with_pitch(4.0, 0.5);
    params.distances.set(Component::Source, Component::G1, 1000.0);

    let err = solve(&params).unwrap_err();
    assert!(matches!(
        err,
        SolveError::Geometry(GeometryError::DistanceTooLarge { .. })
    ));
}
