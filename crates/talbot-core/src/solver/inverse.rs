//! Inverse setups: source (or G0) close to G1, G2 far behind it.
//!
//! Only cone beams are possible. The layout is the second root of the
//! conventional quadratic, so the fixed distance is bounded from the other
//! side: with G1 fixed, $D_n < l < 2 D_n$.

use log::info;

use super::cone::{self, Regime};
use super::{Design, SolveError};
use crate::types::{FixedDistance, GeometryParameters, Grating};

pub(crate) fn calculate(
    params: &mut GeometryParameters,
    design: &Design,
    fixed_grating: Grating,
    fixed_distance: Option<FixedDistance>,
) -> Result<(), SolveError> {
    info!("Calculating inverse setup...");
    cone::calculate(params, design, Regime::Inverse, fixed_grating, fixed_distance)?;
    info!("... done.");
    Ok(())
}
