//! Cone-beam layouts shared by the conventional and inverse topologies.
//!
//! With $l$ the distance from the source (or G0) to G1, $d$ the G1-G2
//! distance and $s = l + d$, a cone beam magnifies the G1 self-image by
//! $M = s / l$ and the Talbot condition becomes
//!
//! $$d = \frac{l D_n}{l - D_n}$$
//!
//! Holding one pitch and one distance fixed leaves a quadratic with two
//! roots. The conventional regime takes the root with $l > d$, the inverse
//! regime the one with $l < d$. Each branch checks the fixed distance
//! against the bound at which the two regimes meet ($l = d$) before solving.

use log::{debug, error, info};

use super::{missing, origin, propagate_duty_cycle, require_distance, require_pitch};
use super::{Design, GeometryError, SolveError};
use crate::optics::magnified_talbot_distance;
use crate::types::{Component, FixedDistance, GeometryParameters, Grating};

/// Which root of the cone-beam quadratic is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Regime {
    /// Source/G0 farther from G1 than G2 is ($l > d$).
    Conventional,
    /// Source/G0 closer to G1 than G2 is ($l < d$).
    Inverse,
}

/// Solved lengths measured from the source or G0 (mm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ConeLayout {
    pub to_g1: f64,
    pub g1_g2: f64,
}

impl ConeLayout {
    pub fn total_length(&self) -> f64 {
        self.to_g1 + self.g1_g2
    }

    pub fn magnification(&self) -> f64 {
        self.total_length() / self.to_g1
    }
}

/// Solve a cone-beam setup and write pitches, duty cycles and distances.
pub(crate) fn calculate(
    params: &mut GeometryParameters,
    design: &Design,
    regime: Regime,
    fixed_grating: Grating,
    fixed_distance: Option<FixedDistance>,
) -> Result<(), SolveError> {
    let fixed_distance = fixed_distance.ok_or_else(|| missing("fixed_distance"))?;
    let value = require_distance(params, fixed_distance.into())?;
    let has_g0 = params.has_g0();

    let layout = match fixed_grating {
        Grating::G1 => {
            let p1 = require_pitch(params, Grating::G1)?;
            let talbot_distance = design.talbot_distance(p1);
            debug!("Fractional Talbot distance: {:.4} mm", talbot_distance);
            let layout = logged(fixed_g1(regime, talbot_distance, fixed_distance, value))?;

            let p2 = layout.magnification() * p1 / design.nu;
            params.gratings.g2.pitch = Some(p2);
            if has_g0 {
                params.gratings.g0.pitch = Some(layout.to_g1 / layout.g1_g2 * p2);
            }
            layout
        }
        Grating::G2 => {
            let p2 = require_pitch(params, Grating::G2)?;
            let k = design.talbot_length(p2);
            let layout = logged(fixed_g2(regime, k, fixed_distance, value))?;

            params.gratings.g1.pitch = Some(design.nu * p2 / layout.magnification());
            if has_g0 {
                params.gratings.g0.pitch = Some(layout.to_g1 / layout.g1_g2 * p2);
            }
            layout
        }
        Grating::G0 => {
            let p0 = require_pitch(params, Grating::G0)?;
            let k = design.talbot_length(p0);
            let layout = logged(fixed_g0(regime, k, fixed_distance, value))?;

            let p2 = layout.g1_g2 / layout.to_g1 * p0;
            params.gratings.g2.pitch = Some(p2);
            params.gratings.g1.pitch = Some(design.nu * p2 / layout.magnification());
            layout
        }
    };
    propagate_duty_cycle(params, fixed_grating);

    let start = origin(params);
    params.distances.set(start, Component::G1, layout.to_g1);
    params.distances.set(Component::G1, Component::G2, layout.g1_g2);
    params.distances.set(start, Component::G2, layout.total_length());
    info!(
        "{:?} cone layout: l = {:.3} mm, d = {:.3} mm, M = {:.4}",
        regime,
        layout.to_g1,
        layout.g1_g2,
        layout.magnification()
    );
    Ok(())
}

fn logged(result: Result<ConeLayout, GeometryError>) -> Result<ConeLayout, GeometryError> {
    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

/// G1 pitch fixed; `talbot_distance` is $D_n$ of that pitch.
fn fixed_g1(
    regime: Regime,
    talbot_distance: f64,
    fixed: FixedDistance,
    value: f64,
) -> Result<ConeLayout, GeometryError> {
    let dn = talbot_distance;
    match fixed.target() {
        Grating::G1 => {
            let l = value;
            // d > 0 needs l > Dn, and d = l at l = 2 Dn
            match regime {
                Regime::Conventional if l <= 2.0 * dn => {
                    return Err(too_small(fixed, Grating::G1, 2.0 * dn));
                }
                Regime::Inverse if l <= dn => {
                    return Err(too_small(fixed, Grating::G1, dn));
                }
                Regime::Inverse if l >= 2.0 * dn => {
                    return Err(too_large(fixed, Grating::G1, 2.0 * dn));
                }
                _ => {}
            }
            Ok(ConeLayout {
                to_g1: l,
                g1_g2: magnified_talbot_distance(l, dn),
            })
        }
        _ => {
            let s = value;
            // l^2 - s l + s Dn = 0 has real roots only for s > 4 Dn
            if s <= 4.0 * dn {
                return Err(too_small(fixed, Grating::G1, 4.0 * dn));
            }
            let root = (s * s / 4.0 - s * dn).sqrt();
            let l = match regime {
                Regime::Conventional => s / 2.0 + root,
                Regime::Inverse => s / 2.0 - root,
            };
            Ok(ConeLayout {
                to_g1: l,
                g1_g2: magnified_talbot_distance(l, dn),
            })
        }
    }
}

/// G2 pitch fixed; `k` is $n p_2^2 / (2\lambda)$.
///
/// The Talbot condition reduces to $d^2 + l d - k l = 0$.
fn fixed_g2(
    regime: Regime,
    k: f64,
    fixed: FixedDistance,
    value: f64,
) -> Result<ConeLayout, GeometryError> {
    match fixed.target() {
        Grating::G1 => {
            let l = value;
            // d = l at l = k / 2
            let bound = k / 2.0;
            match regime {
                Regime::Conventional if l <= bound => {
                    return Err(too_small(fixed, Grating::G2, bound));
                }
                Regime::Inverse if l >= bound => {
                    return Err(too_large(fixed, Grating::G2, bound));
                }
                _ => {}
            }
            let g1_g2 = -0.5 * l + (0.25 * l * l + k * l).sqrt();
            Ok(ConeLayout { to_g1: l, g1_g2 })
        }
        _ => {
            let s = value;
            // d = s k / (s + k), equal to l at s = k
            match regime {
                Regime::Conventional if s <= k => {
                    return Err(too_small(fixed, Grating::G2, k));
                }
                Regime::Inverse if s >= k => {
                    return Err(too_large(fixed, Grating::G2, k));
                }
                _ => {}
            }
            let g1_g2 = s / (s / k + 1.0);
            Ok(ConeLayout {
                to_g1: s - g1_g2,
                g1_g2,
            })
        }
    }
}

/// G0 pitch fixed; `k` is $n p_0^2 / (2\lambda)$.
///
/// With $p_0 / p_2 = l / d$ the Talbot condition reduces to
/// $d (k - l) = l^2$.
fn fixed_g0(
    regime: Regime,
    k: f64,
    fixed: FixedDistance,
    value: f64,
) -> Result<ConeLayout, GeometryError> {
    match fixed.target() {
        Grating::G1 => {
            let l = value;
            // d > 0 needs l < k, and d = l at l = k / 2
            match regime {
                Regime::Conventional if l >= k / 2.0 => {
                    return Err(too_large(fixed, Grating::G0, k / 2.0));
                }
                Regime::Inverse if l >= k => {
                    return Err(too_large(fixed, Grating::G0, k));
                }
                Regime::Inverse if l <= k / 2.0 => {
                    return Err(too_small(fixed, Grating::G0, k / 2.0));
                }
                _ => {}
            }
            let g1_g2 = l / (k / l - 1.0);
            Ok(ConeLayout { to_g1: l, g1_g2 })
        }
        _ => {
            let s = value;
            // d = s^2 / (k + s), equal to l at s = k
            match regime {
                Regime::Conventional if s >= k => {
                    return Err(too_large(fixed, Grating::G0, k));
                }
                Regime::Inverse if s <= k => {
                    return Err(too_small(fixed, Grating::G0, k));
                }
                _ => {}
            }
            let g1_g2 = s / (k / s + 1.0);
            Ok(ConeLayout {
                to_g1: s - g1_g2,
                g1_g2,
            })
        }
    }
}

fn too_small(distance: FixedDistance, grating: Grating, minimum: f64) -> GeometryError {
    GeometryError::DistanceTooSmall {
        distance,
        grating,
        minimum,
    }
}

fn too_large(distance: FixedDistance, grating: Grating, maximum: f64) -> GeometryError {
    GeometryError::DistanceTooLarge {
        distance,
        grating,
        maximum,
    }
}
