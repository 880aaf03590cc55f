//! Source-relative distances and bending radii.
//!
//! The topology algorithms only fix the distances between neighbouring
//! gratings and from the origin to G1/G2. This stage chains them outward
//! from the source so that every grating and the detector has a
//! `distance_source_*` entry, then resolves the radius of every bent
//! grating.

use log::{debug, error};

use super::{require_distance, GeometryError, SolveError};
use crate::distances::Span;
use crate::types::{Bending, Component, GeometryParameters};

pub(crate) fn update_distances(params: &mut GeometryParameters) -> Result<(), SolveError> {
    let gratings = params.gratings_in_path();
    let first_grating = *gratings
        .first()
        .ok_or_else(|| SolveError::InvalidInput("setup contains no gratings".into()))?;
    let first = first_grating.component();

    // A manually set radius on the first grating stands in for its source distance
    let first_span = Span::from_source(first);
    if let Bending::Radius(radius) = params.gratings.get(first_grating).bending {
        if !params.distances.contains(first_span) {
            params.distances.insert(first_span, radius);
        }
    }

    let mut to_previous = require_distance(params, first_span)?;
    if to_previous < 0.0 {
        let err = GeometryError::NonPositiveDistance {
            span: first_span,
            value: to_previous,
        };
        error!("{}", err);
        return Err(err.into());
    }
    let mut previous = first;
    for grating in gratings.iter().skip(1) {
        let current = grating.component();
        let step_span = Span::new(previous, current);
        let step = require_distance(params, step_span)?;
        to_previous = chain(step_span, to_previous, step)?;
        params.distances.insert(Span::from_source(current), to_previous);
        previous = current;
    }

    let span = Span::new(previous, Component::Detector);
    let to_detector = require_distance(params, span)?;
    let source_detector = chain(span, to_previous, to_detector)?;
    params
        .distances
        .insert(Span::from_source(Component::Detector), source_detector);
    debug!("Source to detector: {:.3} mm", source_detector);

    for grating in gratings {
        let component = grating.component();
        let bending = params.gratings.get(grating).bending;
        if !bending.is_bent() {
            params.gratings.get_mut(grating).radius = None;
            continue;
        }
        let to_source = params
            .distances
            .get(Span::from_source(component))
            .unwrap_or(0.0);
        if to_source <= 0.0 {
            let err = GeometryError::ZeroRadius { grating };
            error!("{}", err);
            return Err(err.into());
        }
        let radius = match bending {
            Bending::Radius(radius) => radius,
            _ => to_source,
        };
        params.gratings.get_mut(grating).radius = Some(radius);
    }
    Ok(())
}

/// Add a positive step to a non-negative source distance.
fn chain(step: Span, from_source: f64, value: f64) -> Result<f64, GeometryError> {
    if value <= 0.0 {
        let err = GeometryError::NonPositiveDistance { span: step, value };
        error!("{}", err);
        return Err(err);
    }
    Ok(from_source + value)
}
