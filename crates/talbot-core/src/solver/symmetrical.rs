//! Symmetrical cone-beam setups.
//!
//! Source (or G0) to G1 equals G1 to G2, so the magnification is fixed at
//! $M = 2$:
//!
//! - G1 to G2: $d = M D_n = 2 D_n$
//! - Source/G0 to G1: $l = d$
//! - Source/G0 to G2: $s = 2d$
//! - Pitches: $p_2 = 2 p_1 / \nu$, $p_0 = p_2$

use log::info;

use super::{origin, propagate_duty_cycle, require_pitch, Design, SolveError};
use crate::types::{Component, GeometryParameters, Grating};

pub(crate) fn calculate(
    params: &mut GeometryParameters,
    design: &Design,
    fixed_grating: Grating,
) -> Result<(), SolveError> {
    info!("Calculating symmetrical setup...");
    let has_g0 = params.has_g0();

    let pitch_g1 = match fixed_grating {
        Grating::G1 => {
            let p1 = require_pitch(params, Grating::G1)?;
            let p2 = 2.0 * p1 / design.nu;
            params.gratings.g2.pitch = Some(p2);
            if has_g0 {
                params.gratings.g0.pitch = Some(p2);
            }
            p1
        }
        Grating::G2 => {
            let p2 = require_pitch(params, Grating::G2)?;
            let p1 = design.nu * p2 / 2.0;
            params.gratings.g1.pitch = Some(p1);
            if has_g0 {
                params.gratings.g0.pitch = Some(p2);
            }
            p1
        }
        Grating::G0 => {
            let p0 = require_pitch(params, Grating::G0)?;
            let p1 = design.nu * p0 / 2.0;
            params.gratings.g1.pitch = Some(p1);
            params.gratings.g2.pitch = Some(p0);
            p1
        }
    };
    propagate_duty_cycle(params, fixed_grating);

    // Same for every fixed grating, based on p1
    let g1_g2 = 2.0 * design.talbot_distance(pitch_g1);
    let start = origin(params);
    params.distances.set(Component::G1, Component::G2, g1_g2);
    params.distances.set(start, Component::G1, g1_g2);
    params.distances.set(start, Component::G2, 2.0 * g1_g2);

    info!("... done.");
    Ok(())
}
