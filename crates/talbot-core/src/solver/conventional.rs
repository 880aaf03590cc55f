//! Conventional setups: source (or G0) far from G1, G2 close behind it.
//!
//! ## Parallel beam
//!
//! No magnification; $p_2 = p_1 / \nu$ and $d = D_n$.
//!
//! ## Cone beam
//!
//! Solved by [`cone`](super::cone) with the root $l > d$.
//!
//! ## Dual phase
//!
//! Two phase gratings in a cone beam. All distances are given; only the G2
//! pitch and the Moiré fringe at the detector are derived.

use log::{debug, info, warn};

use super::cone::{self, Regime};
use super::{propagate_duty_cycle, require_distance, require_pitch};
use super::{Design, GeometryError, SolveError};
use crate::distances::Span;
use crate::types::{BeamGeometry, Component, FixedDistance, Fringe, GeometryParameters, Grating};

pub(crate) fn calculate(
    params: &mut GeometryParameters,
    design: &Design,
    fixed_grating: Grating,
    fixed_distance: Option<FixedDistance>,
) -> Result<(), SolveError> {
    info!("Calculating conventional setup...");
    match (params.beam_geometry, params.dual_phase) {
        (BeamGeometry::Parallel, false) => parallel(params, design, fixed_grating)?,
        (BeamGeometry::Parallel, true) => {
            warn!("Dual phase with a parallel beam is not supported, nothing calculated.");
        }
        (BeamGeometry::Cone, false) => {
            cone::calculate(params, design, Regime::Conventional, fixed_grating, fixed_distance)?
        }
        (BeamGeometry::Cone, true) => dual_phase(params, fixed_distance)?,
    }
    info!("... done.");
    Ok(())
}

fn parallel(
    params: &mut GeometryParameters,
    design: &Design,
    fixed_grating: Grating,
) -> Result<(), SolveError> {
    let pitch_g1 = match fixed_grating {
        Grating::G1 => {
            let p1 = require_pitch(params, Grating::G1)?;
            params.gratings.g2.pitch = Some(p1 / design.nu);
            p1
        }
        Grating::G2 => {
            let p1 = require_pitch(params, Grating::G2)? * design.nu;
            params.gratings.g1.pitch = Some(p1);
            p1
        }
        Grating::G0 => {
            return Err(SolveError::InvalidInput(
                "G0 cannot be the fixed grating with a parallel beam".into(),
            ));
        }
    };
    propagate_duty_cycle(params, fixed_grating);

    let talbot_distance = design.talbot_distance(pitch_g1);
    debug!("Fractional Talbot distance: {:.4} mm", talbot_distance);
    params
        .distances
        .set(Component::G1, Component::G2, talbot_distance);
    Ok(())
}

fn dual_phase(
    params: &mut GeometryParameters,
    fixed_distance: Option<FixedDistance>,
) -> Result<(), SolveError> {
    if params.has_g0() {
        return Err(SolveError::InvalidInput(
            "dual phase setups do not support G0".into(),
        ));
    }
    let g1_g2 = require_distance(params, Span::new(Component::G1, Component::G2))?;

    let source_g1 = match fixed_distance {
        Some(FixedDistance::SourceG2) => {
            let source_g2 = require_distance(params, Span::from_source(Component::G2))?;
            let source_g1 = source_g2 - g1_g2;
            if source_g1 <= 0.0 {
                return Err(GeometryError::NonPositiveDistance {
                    span: Span::from_source(Component::G1),
                    value: source_g1,
                }
                .into());
            }
            params.distances.set(Component::Source, Component::G1, source_g1);
            source_g1
        }
        _ => {
            let source_g1 = require_distance(params, Span::from_source(Component::G1))?;
            params
                .distances
                .set(Component::Source, Component::G2, source_g1 + g1_g2);
            source_g1
        }
    };
    let g2_detector = require_distance(params, Span::new(Component::G2, Component::Detector))?;

    let p1 = require_pitch(params, Grating::G1)?;
    let to_g2 = source_g1 + g1_g2;
    params.gratings.g2.pitch = Some(p1 * to_g2 / source_g1);
    propagate_duty_cycle(params, Grating::G1);

    // Beat between the magnified G1 image and G2, projected onto the detector
    let pitch = (to_g2 + g2_detector) / to_g2 / (1.0 / p1 - source_g1 / (p1 * to_g2));
    debug!("Fringe pitch at detector: {:.4} um", pitch);
    params.fringe = Some(Fringe {
        pitch,
        duty_cycle: params.gratings.g1.duty_cycle,
    });
    Ok(())
}
