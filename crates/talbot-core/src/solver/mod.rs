//! Geometry solver for Talbot-Lau interferometers.
//!
//! [`solve`] takes a partially specified setup and derives every missing
//! pitch, distance and bending radius so that the gratings satisfy the
//! fractional Talbot condition. The work is split by topology:
//!
//! - [`symmetrical`] — cone beam with magnification 2.
//! - [`conventional`] — parallel beam, cone beam and dual-phase setups.
//! - [`inverse`] — cone beam with the source close to G1.
//! - [`cone`] — the quadratic branches shared by conventional and inverse
//!   cone-beam setups.
//!
//! After the topology step, [`completion`] chains the distances from the
//! source to every component and resolves the radii of bent gratings, and
//! [`sample`] checks that a sample fits between its neighbours.

mod completion;
mod cone;
mod conventional;
mod inverse;
mod sample;
mod symmetrical;

use std::fmt;

use log::{debug, error, info};
use thiserror::Error;

use crate::distances::Span;
use crate::optics;
use crate::results::GeometryResults;
use crate::types::{
    BeamGeometry, Component, FixedDistance, GeometryParameters, Grating, Topology,
};

/// Neighbour of the sample that bounds its available space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbour {
    Previous,
    Next,
}

impl fmt::Display for Neighbour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Neighbour::Previous => f.write_str("previous"),
            Neighbour::Next => f.write_str("next"),
        }
    }
}

/// A physically impossible layout. The input is well formed but describes a
/// setup that cannot be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{distance} too small for chosen talbot order, energy and pitch of {grating}. Must be larger than: {minimum:.3} mm")]
    DistanceTooSmall {
        distance: FixedDistance,
        grating: Grating,
        minimum: f64,
    },

    #[error("{distance} too large for chosen talbot order, energy and pitch of {grating}. Must be smaller than: {maximum:.3} mm")]
    DistanceTooLarge {
        distance: FixedDistance,
        grating: Grating,
        maximum: f64,
    },

    #[error("{span} must be positive, got {value:.3} mm")]
    NonPositiveDistance { span: Span, value: f64 },

    #[error("Pitch of {grating} must be positive, got {value:.3} um")]
    NonPositivePitch { grating: Grating, value: f64 },

    #[error("Radius of {grating} is 0. Either set radius manually or choose larger distance from source.")]
    ZeroRadius { grating: Grating },

    #[error("Sample diameter larger than distance from sample to {neighbour} component ({diameter:.3} mm > {gap:.3} mm).")]
    SampleDoesNotFit {
        neighbour: Neighbour,
        diameter: f64,
        gap: f64,
    },
}

/// Errors returned by [`solve`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// A value required by the chosen topology was not supplied.
    #[error("Missing required parameter '{0}'")]
    MissingParameter(String),

    /// The parameter set is inconsistent (component order, topology choices).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl SolveError {
    /// Geometry errors are configuration problems the user can fix; missing or
    /// inconsistent input is a precondition violation of the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SolveError::Geometry(_))
    }
}

/// A solved setup: the completed parameters and their grouped results view.
#[derive(Debug, Clone)]
pub struct Solution {
    pub parameters: GeometryParameters,
    pub results: GeometryResults,
}

/// Solve the geometry of `parameters`.
///
/// The input is never modified; the completed parameter set is returned in
/// the [`Solution`].
pub fn solve(parameters: &GeometryParameters) -> Result<Solution, SolveError> {
    GeometrySolver::new(parameters)?.run()
}

/// Design constants shared by all topology algorithms.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Design {
    /// Harmonic factor of the G1 phase shift (1 or 2).
    pub nu: f64,
    /// Design wavelength (µm).
    pub wavelength: f64,
    pub talbot_order: f64,
}

impl Design {
    /// Fractional Talbot distance $D_n$ for a G1 pitch (mm).
    pub fn talbot_distance(&self, pitch_g1: f64) -> f64 {
        optics::fractional_talbot_distance(self.talbot_order, pitch_g1, self.nu, self.wavelength)
    }

    /// $n p^2 / (2\lambda)$ for an arbitrary pitch (mm).
    pub fn talbot_length(&self, pitch: f64) -> f64 {
        optics::talbot_length(self.talbot_order, pitch, self.wavelength)
    }
}

/// Owns the working copy of the parameters for one solve.
pub struct GeometrySolver {
    params: GeometryParameters,
}

impl GeometrySolver {
    /// Copy and validate the caller's parameters.
    pub fn new(parameters: &GeometryParameters) -> Result<Self, SolveError> {
        let params = parameters.clone();
        validate_components(&params)?;
        validate_topology(&params)?;
        validate_gratings(&params)?;
        Ok(Self { params })
    }

    /// Run all solver stages and assemble the results.
    pub fn run(mut self) -> Result<Solution, SolveError> {
        match self.params.topology {
            Topology::Free => {
                info!("Free geometry, using distances as entered.");
            }
            Topology::Symmetrical { fixed_grating } => {
                let design = self.design()?;
                symmetrical::calculate(&mut self.params, &design, fixed_grating)?;
            }
            Topology::Conventional {
                fixed_grating,
                fixed_distance,
            } => {
                let design = self.design()?;
                conventional::calculate(&mut self.params, &design, fixed_grating, fixed_distance)?;
            }
            Topology::Inverse {
                fixed_grating,
                fixed_distance,
            } => {
                let design = self.design()?;
                inverse::calculate(&mut self.params, &design, fixed_grating, Some(fixed_distance))?;
            }
        }
        check_pitches(&self.params)?;

        completion::update_distances(&mut self.params)?;

        if self.params.contains(Component::Sample) {
            sample::check_sample_position(&mut self.params)?;
        }

        let results = GeometryResults::from_parameters(&self.params);
        Ok(Solution {
            parameters: self.params,
            results,
        })
    }

    /// Derive the design constants and record the design wavelength.
    fn design(&mut self) -> Result<Design, SolveError> {
        let energy = self
            .params
            .design_energy
            .ok_or_else(|| missing("design_energy"))?;
        if energy <= 0.0 {
            return Err(SolveError::InvalidInput(format!(
                "design energy must be > 0, got {} keV",
                energy
            )));
        }
        let phase_shift = self
            .params
            .phase_shift_g1
            .ok_or_else(|| missing("phase_shift_g1"))?;
        let talbot_order = self
            .params
            .talbot_order
            .ok_or_else(|| missing("talbot_order"))?;
        if talbot_order <= 0.0 {
            return Err(SolveError::InvalidInput(format!(
                "talbot order must be > 0, got {}",
                talbot_order
            )));
        }

        // nu = 2 for a pi shift, nu = 1 for a pi/2 shift
        let nu = optics::harmonic_factor(phase_shift);
        debug!("nu: {}", nu);
        if nu != 1.0 && nu != 2.0 {
            return Err(SolveError::InvalidInput(format!(
                "phase shift of G1 ({:.4} rad) must be pi or pi/2",
                phase_shift
            )));
        }

        let wavelength = optics::energy_to_wavelength(energy);
        debug!("Design wavelength: {:.6e} um", wavelength);
        self.params.design_wavelength = Some(wavelength);

        Ok(Design {
            nu,
            wavelength,
            talbot_order,
        })
    }
}

fn validate_components(params: &GeometryParameters) -> Result<(), SolveError> {
    let components = &params.component_list;
    if components.first() != Some(&Component::Source) {
        return Err(SolveError::InvalidInput(
            "component list must start with the source".into(),
        ));
    }
    if components.last() != Some(&Component::Detector) {
        return Err(SolveError::InvalidInput(
            "component list must end with the detector".into(),
        ));
    }
    for (i, component) in components.iter().enumerate() {
        if components[..i].contains(component) {
            return Err(SolveError::InvalidInput(format!(
                "{} appears more than once in the component list",
                component
            )));
        }
    }
    for grating in [Component::G1, Component::G2] {
        if !components.contains(&grating) {
            return Err(SolveError::InvalidInput(format!(
                "component list must contain {}",
                grating
            )));
        }
    }

    let gratings = params.gratings_in_path();
    if gratings.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(SolveError::InvalidInput(format!(
            "gratings must be ordered G0, G1, G2 along the beam, got {:?}",
            gratings
        )));
    }
    if components.contains(&Component::Sample) != params.sample.is_some() {
        return Err(SolveError::InvalidInput(
            "sample attributes must be given exactly when the sample is in the component list"
                .into(),
        ));
    }
    Ok(())
}

fn validate_topology(params: &GeometryParameters) -> Result<(), SolveError> {
    let topology = params.topology;
    if matches!(
        topology,
        Topology::Symmetrical { .. } | Topology::Inverse { .. }
    ) && params.beam_geometry != BeamGeometry::Cone
    {
        return Err(SolveError::InvalidInput(format!(
            "'{}' geometry requires a cone beam",
            topology.gi_geometry()
        )));
    }

    if let Some(fixed_grating) = topology.fixed_grating() {
        if !params.contains(fixed_grating.component()) {
            return Err(SolveError::InvalidInput(format!(
                "fixed grating {} is not part of the setup",
                fixed_grating
            )));
        }
    }

    if matches!(topology, Topology::Conventional { .. })
        && params.beam_geometry == BeamGeometry::Parallel
    {
        if params.has_g0() {
            return Err(SolveError::InvalidInput(
                "G0 is not supported with a parallel beam".into(),
            ));
        }
        return Ok(());
    }

    if let Some(fixed_distance) = topology.fixed_distance() {
        let expected = if params.has_g0() {
            Component::G0
        } else {
            Component::Source
        };
        if fixed_distance.origin() != expected {
            return Err(SolveError::InvalidInput(format!(
                "fixed distance {} must be measured from {}",
                fixed_distance, expected
            )));
        }
    }
    Ok(())
}

fn validate_gratings(params: &GeometryParameters) -> Result<(), SolveError> {
    for grating in params.gratings_in_path() {
        let attributes = params.gratings.get(grating);
        if let Some(pitch) = attributes.pitch {
            if pitch <= 0.0 {
                return Err(SolveError::InvalidInput(format!(
                    "pitch of {} must be > 0, got {} um",
                    grating, pitch
                )));
            }
        }
        if let Some(duty_cycle) = attributes.duty_cycle {
            if duty_cycle <= 0.0 || duty_cycle >= 1.0 {
                return Err(SolveError::InvalidInput(format!(
                    "duty cycle of {} must be between 0 and 1, got {}",
                    grating, duty_cycle
                )));
            }
        }
    }
    Ok(())
}

/// Every pitch known after the topology step must be positive.
fn check_pitches(params: &GeometryParameters) -> Result<(), GeometryError> {
    for grating in params.gratings_in_path() {
        if let Some(value) = params.gratings.get(grating).pitch {
            if value <= 0.0 {
                let err = GeometryError::NonPositivePitch { grating, value };
                error!("{}", err);
                return Err(err);
            }
        }
    }
    Ok(())
}

pub(crate) fn missing(name: impl Into<String>) -> SolveError {
    SolveError::MissingParameter(name.into())
}

pub(crate) fn require_pitch(
    params: &GeometryParameters,
    grating: Grating,
) -> Result<f64, SolveError> {
    params
        .gratings
        .get(grating)
        .pitch
        .ok_or_else(|| missing(format!("pitch_{}", grating.component().short_name())))
}

pub(crate) fn require_distance(params: &GeometryParameters, span: Span) -> Result<f64, SolveError> {
    params
        .distances
        .get(span)
        .ok_or_else(|| missing(span.to_string()))
}

/// Copy the duty cycle of `from` to every other grating in the setup.
pub(crate) fn propagate_duty_cycle(params: &mut GeometryParameters, from: Grating) {
    let duty_cycle = params.gratings.get(from).duty_cycle;
    for grating in params.gratings_in_path() {
        if grating != from {
            params.gratings.get_mut(grating).duty_cycle = duty_cycle;
        }
    }
}

/// Component the design distances are measured from.
pub(crate) fn origin(params: &GeometryParameters) -> Component {
    if params.has_g0() {
        Component::G0
    } else {
        Component::Source
    }
}
