//! Sample placement.
//!
//! The sample is positioned relative to one neighbour (`a<ref>` = after,
//! `b<ref>` = before) and must fit into the gap to the other neighbour.

use log::{debug, error};

use super::{require_distance, GeometryError, Neighbour, SolveError};
use crate::distances::Span;
use crate::types::{Component, GeometryParameters, SampleSide};

/// Record the source-to-sample-center distance and check the sample fits.
pub(crate) fn check_sample_position(params: &mut GeometryParameters) -> Result<(), SolveError> {
    let sample = params
        .sample
        .clone()
        .ok_or_else(|| SolveError::InvalidInput("sample attributes are missing".into()))?;

    let components = &params.component_list;
    let index = components
        .iter()
        .position(|c| *c == Component::Sample)
        .ok_or_else(|| SolveError::InvalidInput("sample is not in the component list".into()))?;
    let neighbours = (
        index.checked_sub(1).and_then(|i| components.get(i)),
        components.get(index + 1),
    );
    let (previous, next) = match neighbours {
        (Some(previous), Some(next)) => (*previous, *next),
        _ => {
            return Err(SolveError::InvalidInput(
                "sample must sit between two components".into(),
            ))
        }
    };

    let expected = match sample.position.side {
        SampleSide::After => previous,
        SampleSide::Before => next,
    };
    if sample.position.reference != expected {
        return Err(SolveError::InvalidInput(format!(
            "sample position '{}' does not match its neighbours {} and {}",
            sample.position, previous, next
        )));
    }

    let to_previous = from_source(params, previous)?;
    let to_next = from_source(params, next)?;
    let offset = sample.distance + sample.diameter / 2.0;

    let (center, gap, neighbour) = match sample.position.side {
        SampleSide::After => {
            let center = to_previous + offset;
            (center, to_next - center, Neighbour::Next)
        }
        SampleSide::Before => {
            let center = to_next - offset;
            (center, center - to_previous, Neighbour::Previous)
        }
    };
    debug!("Source to sample center: {:.3} mm", center);

    if sample.diameter > gap {
        let err = GeometryError::SampleDoesNotFit {
            neighbour,
            diameter: sample.diameter,
            gap,
        };
        error!("{}", err);
        return Err(err.into());
    }

    params
        .distances
        .set(Component::Source, Component::Sample, center);
    Ok(())
}

fn from_source(params: &GeometryParameters, component: Component) -> Result<f64, SolveError> {
    match component {
        Component::Source => Ok(0.0),
        other => require_distance(params, Span::from_source(other)),
    }
}
