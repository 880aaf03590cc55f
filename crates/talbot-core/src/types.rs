//! Core types shared across the Talbot framework.
//!
//! This module defines the data model of an interferometer layout: which
//! components sit in the beam, how the topology is selected, and the
//! per-grating, sample, and detector attributes that the solver reads and
//! completes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::distances::DistanceTable;

/// Error raised when a configuration token cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} '{token}'")]
pub struct ParseTokenError {
    pub kind: &'static str,
    pub token: String,
}

impl ParseTokenError {
    fn new(kind: &'static str, token: &str) -> Self {
        Self {
            kind,
            token: token.to_string(),
        }
    }
}

/// An element placed along the beam path.
///
/// The declaration order is the physical order along the beam, so sorting a
/// list of components yields beam-path order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Component {
    Source,
    G0,
    G1,
    G2,
    Sample,
    Detector,
}

impl Component {
    /// Lower-case name used in distance keys (`distance_source_g1`).
    pub fn short_name(self) -> &'static str {
        match self {
            Component::Source => "source",
            Component::G0 => "g0",
            Component::G1 => "g1",
            Component::G2 => "g2",
            Component::Sample => "sample",
            Component::Detector => "detector",
        }
    }

    /// The grating this component represents, if any.
    pub fn as_grating(self) -> Option<Grating> {
        match self {
            Component::G0 => Some(Grating::G0),
            Component::G1 => Some(Grating::G1),
            Component::G2 => Some(Grating::G2),
            _ => None,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Source => "Source",
            Component::G0 => "G0",
            Component::G1 => "G1",
            Component::G2 => "G2",
            Component::Sample => "Sample",
            Component::Detector => "Detector",
        };
        f.write_str(name)
    }
}

impl FromStr for Component {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" => Ok(Component::Source),
            "g0" => Ok(Component::G0),
            "g1" => Ok(Component::G1),
            "g2" => Ok(Component::G2),
            "sample" => Ok(Component::Sample),
            "detector" => Ok(Component::Detector),
            _ => Err(ParseTokenError::new("component", s)),
        }
    }
}

/// One of the (up to) three gratings of a Talbot-Lau interferometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grating {
    /// Source grating, turns an extended source into an array of line sources.
    G0,
    /// Phase grating producing the self-image.
    G1,
    /// Analyser grating in front of the detector.
    G2,
}

impl Grating {
    pub fn component(self) -> Component {
        match self {
            Grating::G0 => Component::G0,
            Grating::G1 => Component::G1,
            Grating::G2 => Component::G2,
        }
    }
}

impl fmt::Display for Grating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.component().fmt(f)
    }
}

impl FromStr for Grating {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Component::from_str(s)
            .ok()
            .and_then(Component::as_grating)
            .ok_or_else(|| ParseTokenError::new("grating", s))
    }
}

/// Interferometer design family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GiGeometry {
    #[serde(rename = "sym")]
    Symmetrical,
    #[serde(rename = "conv")]
    Conventional,
    #[serde(rename = "inv")]
    Inverse,
    /// All distances are entered by hand; no Talbot relation is enforced.
    #[serde(rename = "free")]
    Free,
}

impl GiGeometry {
    pub fn token(self) -> &'static str {
        match self {
            GiGeometry::Symmetrical => "sym",
            GiGeometry::Conventional => "conv",
            GiGeometry::Inverse => "inv",
            GiGeometry::Free => "free",
        }
    }
}

impl fmt::Display for GiGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for GiGeometry {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sym" => Ok(GiGeometry::Symmetrical),
            "conv" => Ok(GiGeometry::Conventional),
            "inv" => Ok(GiGeometry::Inverse),
            "free" => Ok(GiGeometry::Free),
            _ => Err(ParseTokenError::new("geometry", s)),
        }
    }
}

/// Shape of the illuminating x-ray beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeamGeometry {
    Parallel,
    Cone,
}

impl fmt::Display for BeamGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeamGeometry::Parallel => f.write_str("parallel"),
            BeamGeometry::Cone => f.write_str("cone"),
        }
    }
}

impl FromStr for BeamGeometry {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parallel" => Ok(BeamGeometry::Parallel),
            "cone" => Ok(BeamGeometry::Cone),
            _ => Err(ParseTokenError::new("beam geometry", s)),
        }
    }
}

/// The one distance held fixed in a cone-beam design.
///
/// Distances are measured from G0 when G0 is part of the setup, and from the
/// source otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixedDistance {
    #[serde(rename = "distance_source_g1")]
    SourceG1,
    #[serde(rename = "distance_source_g2")]
    SourceG2,
    #[serde(rename = "distance_g0_g1")]
    G0G1,
    #[serde(rename = "distance_g0_g2")]
    G0G2,
}

impl FixedDistance {
    /// Component the distance is measured from.
    pub fn origin(self) -> Component {
        match self {
            FixedDistance::SourceG1 | FixedDistance::SourceG2 => Component::Source,
            FixedDistance::G0G1 | FixedDistance::G0G2 => Component::G0,
        }
    }

    /// Grating the distance is measured to.
    pub fn target(self) -> Grating {
        match self {
            FixedDistance::SourceG1 | FixedDistance::G0G1 => Grating::G1,
            FixedDistance::SourceG2 | FixedDistance::G0G2 => Grating::G2,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            FixedDistance::SourceG1 => "distance_source_g1",
            FixedDistance::SourceG2 => "distance_source_g2",
            FixedDistance::G0G1 => "distance_g0_g1",
            FixedDistance::G0G2 => "distance_g0_g2",
        }
    }
}

impl fmt::Display for FixedDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for FixedDistance {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distance_source_g1" => Ok(FixedDistance::SourceG1),
            "distance_source_g2" => Ok(FixedDistance::SourceG2),
            "distance_g0_g1" => Ok(FixedDistance::G0G1),
            "distance_g0_g2" => Ok(FixedDistance::G0G2),
            _ => Err(ParseTokenError::new("fixed distance", s)),
        }
    }
}

/// Topology selection, carrying only the choices each family needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Cone beam with magnification 2; every distance follows from the pitch.
    Symmetrical { fixed_grating: Grating },
    /// Source farther from G1 than the G1-G2 gap. The fixed distance is only
    /// read for cone beams.
    Conventional {
        fixed_grating: Grating,
        fixed_distance: Option<FixedDistance>,
    },
    /// Source closer to G1 than the G1-G2 gap (cone beam only).
    Inverse {
        fixed_grating: Grating,
        fixed_distance: FixedDistance,
    },
    Free,
}

impl Topology {
    pub fn gi_geometry(&self) -> GiGeometry {
        match self {
            Topology::Symmetrical { .. } => GiGeometry::Symmetrical,
            Topology::Conventional { .. } => GiGeometry::Conventional,
            Topology::Inverse { .. } => GiGeometry::Inverse,
            Topology::Free => GiGeometry::Free,
        }
    }

    pub fn fixed_grating(&self) -> Option<Grating> {
        match *self {
            Topology::Symmetrical { fixed_grating }
            | Topology::Conventional { fixed_grating, .. }
            | Topology::Inverse { fixed_grating, .. } => Some(fixed_grating),
            Topology::Free => None,
        }
    }

    pub fn fixed_distance(&self) -> Option<FixedDistance> {
        match *self {
            Topology::Conventional { fixed_distance, .. } => fixed_distance,
            Topology::Inverse { fixed_distance, .. } => Some(fixed_distance),
            _ => None,
        }
    }
}

/// How a grating is bent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Bending {
    #[default]
    Straight,
    /// Radius equals the distance from the source, so the beam hits every
    /// point of the grating at normal incidence.
    Matching,
    /// User-supplied radius (mm).
    Radius(f64),
}

impl Bending {
    pub fn is_bent(&self) -> bool {
        !matches!(self, Bending::Straight)
    }
}

/// Attributes of a single grating.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GratingParams {
    /// Pitch (µm).
    pub pitch: Option<f64>,
    /// Fraction of one period covered by grating lines, in (0, 1).
    pub duty_cycle: Option<f64>,
    pub bending: Bending,
    /// Resolved bending radius (mm). Filled in by the solver; `None` for a
    /// straight grating.
    pub radius: Option<f64>,
}

impl GratingParams {
    pub fn with_pitch(pitch: f64, duty_cycle: f64) -> Self {
        Self {
            pitch: Some(pitch),
            duty_cycle: Some(duty_cycle),
            ..Default::default()
        }
    }
}

/// Attribute slots for G0, G1 and G2. Slots of gratings missing from the
/// component list are ignored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GratingSet {
    pub g0: GratingParams,
    pub g1: GratingParams,
    pub g2: GratingParams,
}

impl GratingSet {
    pub fn get(&self, grating: Grating) -> &GratingParams {
        match grating {
            Grating::G0 => &self.g0,
            Grating::G1 => &self.g1,
            Grating::G2 => &self.g2,
        }
    }

    pub fn get_mut(&mut self, grating: Grating) -> &mut GratingParams {
        match grating {
            Grating::G0 => &mut self.g0,
            Grating::G1 => &mut self.g1,
            Grating::G2 => &mut self.g2,
        }
    }
}

/// Whether the sample is placed before or after its reference component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleSide {
    Before,
    After,
}

/// Sample placement token such as `ag1` (after G1) or `bd` (before detector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SamplePosition {
    pub side: SampleSide,
    pub reference: Component,
}

impl SamplePosition {
    pub fn after(reference: Component) -> Self {
        Self {
            side: SampleSide::After,
            reference,
        }
    }

    pub fn before(reference: Component) -> Self {
        Self {
            side: SampleSide::Before,
            reference,
        }
    }
}

impl fmt::Display for SamplePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            SampleSide::Before => 'b',
            SampleSide::After => 'a',
        };
        let reference = match self.reference {
            Component::Detector => "d",
            other => other.short_name(),
        };
        write!(f, "{}{}", side, reference)
    }
}

impl FromStr for SamplePosition {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.to_ascii_lowercase();
        let side = match token.chars().next() {
            Some('a') => SampleSide::After,
            Some('b') => SampleSide::Before,
            _ => return Err(ParseTokenError::new("sample position", s)),
        };
        let reference = match &token[1..] {
            "g0" => Component::G0,
            "g1" => Component::G1,
            "g2" => Component::G2,
            "d" => Component::Detector,
            _ => return Err(ParseTokenError::new("sample position", s)),
        };
        Ok(Self { side, reference })
    }
}

impl From<SamplePosition> for String {
    fn from(position: SamplePosition) -> Self {
        position.to_string()
    }
}

impl TryFrom<String> for SamplePosition {
    type Error = ParseTokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A sample placed between two neighbouring components.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub position: SamplePosition,
    /// Gap between the reference component and the sample edge (mm).
    pub distance: f64,
    /// Sample extent along the beam (mm).
    pub diameter: f64,
    pub shape: String,
}

/// Detector attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detector {
    /// Whether the detector is curved around the source.
    pub curved: bool,
    /// Number of pixels along x and y.
    pub field_of_view: Option<[u32; 2]>,
    /// Edge length of a square pixel (µm).
    pub pixel_size: Option<f64>,
}

/// Moiré fringe seen by the detector in a dual-phase setup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fringe {
    /// Fringe period at the detector (µm).
    pub pitch: f64,
    pub duty_cycle: Option<f64>,
}

/// Working parameter set of one geometry calculation.
///
/// Values the caller does not know are left as `None` (or absent from the
/// distance table) and are filled in by [`crate::solver::solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryParameters {
    /// Components in beam-path order.
    pub component_list: Vec<Component>,
    pub topology: Topology,
    pub beam_geometry: BeamGeometry,
    pub dual_phase: bool,
    /// Design energy (keV).
    pub design_energy: Option<f64>,
    /// Design wavelength (µm), derived from the design energy.
    pub design_wavelength: Option<f64>,
    pub talbot_order: Option<f64>,
    /// Phase shift imposed by G1 at the design energy (rad).
    pub phase_shift_g1: Option<f64>,
    pub gratings: GratingSet,
    pub distances: DistanceTable,
    pub sample: Option<Sample>,
    pub detector: Detector,
    /// Filled in for dual-phase setups.
    pub fringe: Option<Fringe>,
}

impl GeometryParameters {
    pub fn new(
        component_list: Vec<Component>,
        topology: Topology,
        beam_geometry: BeamGeometry,
    ) -> Self {
        Self {
            component_list,
            topology,
            beam_geometry,
            dual_phase: false,
            design_energy: None,
            design_wavelength: None,
            talbot_order: None,
            phase_shift_g1: None,
            gratings: GratingSet::default(),
            distances: DistanceTable::new(),
            sample: None,
            detector: Detector::default(),
            fringe: None,
        }
    }

    pub fn gi_geometry(&self) -> GiGeometry {
        self.topology.gi_geometry()
    }

    pub fn contains(&self, component: Component) -> bool {
        self.component_list.contains(&component)
    }

    pub fn has_g0(&self) -> bool {
        self.contains(Component::G0)
    }

    /// Gratings present in the setup, in beam-path order.
    pub fn gratings_in_path(&self) -> Vec<Grating> {
        self.component_list
            .iter()
            .filter_map(|c| c.as_grating())
            .collect()
    }
}
