//! TOML configuration deserialisation for geometry jobs.

use std::collections::BTreeMap;

use serde::Deserialize;

use talbot_core::types::{BeamGeometry, FixedDistance, GiGeometry, Grating, SamplePosition};

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub setup: SetupConfig,
    #[serde(default)]
    pub gratings: GratingsConfig,
    /// Distances keyed by name, e.g. `distance_g2_detector = 100.0` [mm].
    #[serde(default)]
    pub distances: BTreeMap<String, f64>,
    pub sample: Option<SampleConfig>,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Interferometer topology and design parameters.
#[derive(Debug, Deserialize)]
pub struct SetupConfig {
    /// "sym", "conv", "inv" or "free".
    pub geometry: GiGeometry,
    #[serde(default = "default_beam")]
    pub beam: BeamGeometry,
    #[serde(default)]
    pub dual_phase: bool,
    /// Grating whose pitch is given. Default: g1.
    #[serde(default = "default_fixed_grating")]
    pub fixed_grating: Grating,
    /// Distance held fixed in cone-beam designs. Inferred from
    /// `[distances]` when omitted.
    pub fixed_distance: Option<FixedDistance>,
    /// Design energy [keV].
    pub design_energy: Option<f64>,
    #[serde(default = "default_talbot_order")]
    pub talbot_order: f64,
}

fn default_beam() -> BeamGeometry {
    BeamGeometry::Cone
}
fn default_fixed_grating() -> Grating {
    Grating::G1
}
fn default_talbot_order() -> f64 {
    1.0
}

/// Grating sections. A missing `[gratings.g0]` means the setup has no G0.
#[derive(Debug, Default, Deserialize)]
pub struct GratingsConfig {
    pub g0: Option<GratingConfig>,
    #[serde(default)]
    pub g1: GratingConfig,
    #[serde(default)]
    pub g2: GratingConfig,
}

impl GratingsConfig {
    pub fn get(&self, grating: Grating) -> Option<&GratingConfig> {
        match grating {
            Grating::G0 => self.g0.as_ref(),
            Grating::G1 => Some(&self.g1),
            Grating::G2 => Some(&self.g2),
        }
    }
}

/// A single grating.
#[derive(Debug, Default, Deserialize)]
pub struct GratingConfig {
    /// Pitch [µm].
    pub pitch: Option<f64>,
    pub duty_cycle: Option<f64>,
    /// Phase shift at the design energy [rad]. Only read for G1, default π.
    pub phase_shift: Option<f64>,
    #[serde(default)]
    pub bent: bool,
    /// Bend to the distance from the source.
    #[serde(default)]
    pub matching: bool,
    /// Bending radius [mm], required if bent and not matching.
    pub radius: Option<f64>,
}

/// Sample placement.
#[derive(Debug, Deserialize)]
pub struct SampleConfig {
    /// Two-letter token such as "ag1" (after G1) or "bd" (before detector).
    pub position: SamplePosition,
    /// Gap to the reference component [mm].
    #[serde(default)]
    pub distance: f64,
    /// Extent along the beam [mm].
    pub diameter: f64,
    #[serde(default = "default_shape")]
    pub shape: String,
}

fn default_shape() -> String {
    "circular".into()
}

/// Detector attributes.
#[derive(Debug, Default, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub curved: bool,
    /// Pixels along x and y.
    pub field_of_view: Option<[u32; 2]>,
    /// Pixel size [µm].
    pub pixel_size: Option<f64>,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save the result groups as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse a TOML job configuration from a string.
pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    Ok(config)
}
