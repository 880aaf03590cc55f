//! Grouped, read-only view of a solved setup.
//!
//! Groups mirror the result files written by the CLI: `setup`, `distances`,
//! `gratings`, `sample` (only with a sample) and `detector`.

use serde::Serialize;

use crate::distances::{DistanceTable, Span};
use crate::types::{
    BeamGeometry, Component, Fringe, GeometryParameters, GiGeometry, Grating, SamplePosition,
};

/// Complete results of one geometry calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryResults {
    pub setup: SetupSummary,
    pub distances: DistanceTable,
    pub gratings: GratingTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<SampleResult>,
    pub detector: DetectorResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupSummary {
    pub component_list: Vec<Component>,
    pub gi_geometry: GiGeometry,
    pub beam_geometry: BeamGeometry,
    pub dual_phase: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GratingTable {
    pub gratings: Vec<GratingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fringe: Option<Fringe>,
}

impl GratingTable {
    pub fn get(&self, grating: Grating) -> Option<&GratingResult> {
        self.gratings.iter().find(|g| g.grating == grating)
    }
}

/// Pitch (µm), duty cycle and radius (mm) of one grating.
///
/// `radius` is `None` for a straight grating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GratingResult {
    pub grating: Grating,
    pub pitch: Option<f64>,
    pub duty_cycle: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleResult {
    pub position: SamplePosition,
    pub distance: f64,
    pub diameter: f64,
    pub shape: String,
    /// Source to sample center (mm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_from_source: Option<f64>,
}

/// Detector geometry. Lengths in mm, angles in rad.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorResult {
    pub curved: bool,
    /// Source-to-detector distance when curved.
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cone_angle: Option<f64>,
}

impl GeometryResults {
    /// Assemble the results view from a completed parameter set.
    pub fn from_parameters(params: &GeometryParameters) -> Self {
        let source_detector = params
            .distances
            .get(Span::from_source(Component::Detector));

        let setup = SetupSummary {
            component_list: params.component_list.clone(),
            gi_geometry: params.gi_geometry(),
            beam_geometry: params.beam_geometry,
            dual_phase: params.dual_phase,
        };

        let gratings = GratingTable {
            gratings: params
                .gratings_in_path()
                .into_iter()
                .map(|grating| {
                    let g = params.gratings.get(grating);
                    GratingResult {
                        grating,
                        pitch: g.pitch,
                        duty_cycle: g.duty_cycle,
                        radius: g.radius,
                    }
                })
                .collect(),
            fringe: params.fringe,
        };

        let sample = params.sample.as_ref().map(|s| SampleResult {
            position: s.position,
            distance: s.distance,
            diameter: s.diameter,
            shape: s.shape.clone(),
            distance_from_source: params.distances.get(Span::from_source(Component::Sample)),
        });

        Self {
            setup,
            distances: params.distances.clone(),
            gratings,
            sample,
            detector: detector_result(params, source_detector),
        }
    }
}

fn detector_result(params: &GeometryParameters, source_detector: Option<f64>) -> DetectorResult {
    let detector = &params.detector;
    let radius = if detector.curved { source_detector } else { None };

    let size = match (detector.field_of_view, detector.pixel_size) {
        (Some([nx, ny]), Some(pixel_size)) => {
            // pixel size in µm
            Some((nx as f64 * pixel_size * 1e-3, ny as f64 * pixel_size * 1e-3))
        }
        _ => None,
    };
    let angle = |extent: f64| source_detector.map(|d| 2.0 * (extent / (2.0 * d)).atan());

    DetectorResult {
        curved: detector.curved,
        radius,
        width: size.map(|(w, _)| w),
        height: size.map(|(_, h)| h),
        fan_angle: size.and_then(|(w, _)| angle(w)),
        cone_angle: size.and_then(|(_, h)| angle(h)),
    }
}
