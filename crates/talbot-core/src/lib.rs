//! # Talbot Core
//!
//! Geometry solver for x-ray Talbot-Lau grating interferometers. Given a
//! partial description of a setup (component order, topology, one fixed
//! pitch and one fixed distance), it derives the remaining pitches and
//! distances so that G2 sits at a fractional Talbot distance behind G1.
//!
//! ## Architecture
//!
//! [`solver::solve`] validates the input, dispatches on the
//! [`types::Topology`], completes the source-relative distances and bending
//! radii, checks the sample placement and returns the completed
//! [`types::GeometryParameters`] together with a [`results::GeometryResults`]
//! view. The computation is closed-form and holds no global state.
//!
//! ## Modules
//!
//! - [`types`] — Components, topology selectors, grating/sample/detector attributes.
//! - [`distances`] — Distance table keyed by component pairs.
//! - [`optics`] — Wavelength, harmonic factor and Talbot distances.
//! - [`solver`] — Topology algorithms and error types.
//! - [`results`] — Grouped results view for display and serialisation.

pub mod distances;
pub mod optics;
pub mod results;
pub mod solver;
pub mod types;
