//! Geometry runner: turns a job configuration into solver input, solves it
//! and persists the results.

use std::f64::consts::PI;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::Serialize;

use talbot_core::distances::{DistanceTable, Span};
use talbot_core::results::GeometryResults;
use talbot_core::solver::{solve, GeometrySolver, Solution};
use talbot_core::types::{
    BeamGeometry, Bending, Component, Detector, FixedDistance, GeometryParameters, GiGeometry,
    Grating, GratingParams, Sample, SamplePosition, SampleSide, Topology,
};

use crate::config::{GratingConfig, JobConfig, SampleConfig};

/// Solve the geometry described by a job configuration.
pub fn run_geometry(job: &JobConfig) -> Result<Solution> {
    let params = build_parameters(job)?;
    solve(&params).context("Geometry calculation failed")
}

/// Check a job configuration without solving it.
pub fn validate_job(job: &JobConfig) -> Result<()> {
    let params = build_parameters(job)?;
    GeometrySolver::new(&params).context("Invalid geometry input")?;
    Ok(())
}

/// Assemble solver input from a job configuration.
pub fn build_parameters(job: &JobConfig) -> Result<GeometryParameters> {
    let setup = &job.setup;
    if matches!(setup.geometry, GiGeometry::Symmetrical | GiGeometry::Inverse)
        && setup.beam != BeamGeometry::Cone
    {
        anyhow::bail!("'{}' geometry requires a cone beam", setup.geometry);
    }
    let mut has_g0 = job.gratings.g0.is_some();
    if has_g0 && setup.beam == BeamGeometry::Parallel {
        warn!("G0 is defined, but will be ignored with a parallel beam.");
        has_g0 = false;
    }
    if setup.geometry != GiGeometry::Free && setup.fixed_grating == Grating::G0 && !has_g0 {
        anyhow::bail!("G0 is not part of the setup, choose G1 or G2 as fixed grating");
    }

    let mut component_list = vec![Component::Source];
    if has_g0 {
        component_list.push(Component::G0);
    }
    component_list.extend([Component::G1, Component::G2, Component::Detector]);

    let sample = match &job.sample {
        Some(sample) => {
            check_sample_rule(setup.geometry, setup.beam, sample.position)?;
            insert_sample(&mut component_list, sample.position)?;
            Some(build_sample(sample))
        }
        None => None,
    };

    let mut distances = job
        .distances
        .iter()
        .map(|(name, value)| {
            let span: Span = name
                .parse()
                .with_context(|| format!("Unknown distance '{}'", name))?;
            Ok((span, *value))
        })
        .collect::<Result<DistanceTable>>()?;

    let needs_fixed_distance = setup.beam == BeamGeometry::Cone
        && matches!(setup.geometry, GiGeometry::Conventional | GiGeometry::Inverse);
    let fixed_distance = if needs_fixed_distance {
        let fixed = match setup.fixed_distance {
            Some(fixed) => fixed,
            None => infer_fixed_distance(&mut distances, has_g0)?,
        };
        Some(fixed)
    } else {
        None
    };

    let topology = match setup.geometry {
        GiGeometry::Symmetrical => Topology::Symmetrical {
            fixed_grating: setup.fixed_grating,
        },
        GiGeometry::Conventional => Topology::Conventional {
            fixed_grating: setup.fixed_grating,
            fixed_distance,
        },
        GiGeometry::Inverse => Topology::Inverse {
            fixed_grating: setup.fixed_grating,
            fixed_distance: fixed_distance
                .context("Inverse geometry requires a fixed distance")?,
        },
        GiGeometry::Free => Topology::Free,
    };

    let mut params = GeometryParameters::new(component_list, topology, setup.beam);
    params.dual_phase = setup.dual_phase;
    params.design_energy = setup.design_energy;
    params.talbot_order = Some(setup.talbot_order);
    params.phase_shift_g1 = Some(job.gratings.g1.phase_shift.unwrap_or(PI));
    params.distances = distances;
    params.sample = sample;
    params.detector = Detector {
        curved: job.detector.curved,
        field_of_view: job.detector.field_of_view,
        pixel_size: job.detector.pixel_size,
    };

    for grating in params.gratings_in_path() {
        if let Some(config) = job.gratings.get(grating) {
            *params.gratings.get_mut(grating) = build_grating(grating, config)?;
        }
    }
    Ok(params)
}

/// Pick the fixed distance from the distances present.
///
/// With both the short and the total length given, the total length wins and
/// the other entry is dropped.
fn infer_fixed_distance(
    distances: &mut DistanceTable,
    has_g0: bool,
) -> Result<FixedDistance> {
    let (to_g1, to_g2) = if has_g0 {
        (FixedDistance::G0G1, FixedDistance::G0G2)
    } else {
        (FixedDistance::SourceG1, FixedDistance::SourceG2)
    };
    match (
        distances.contains(to_g1.into()),
        distances.contains(to_g2.into()),
    ) {
        (true, true) => {
            warn!(
                "Both {} and {} are defined, choosing {} (total GI length).",
                to_g1, to_g2, to_g2
            );
            distances.remove(to_g1.into());
            Ok(to_g2)
        }
        (true, false) => Ok(to_g1),
        (false, true) => Ok(to_g2),
        (false, false) => anyhow::bail!("Either {} or {} must be defined", to_g1, to_g2),
    }
}

/// Sample positions each topology allows.
fn check_sample_rule(
    geometry: GiGeometry,
    beam: BeamGeometry,
    position: SamplePosition,
) -> Result<()> {
    let allowed: &[&str] = match (geometry, beam) {
        (GiGeometry::Free, _) => return Ok(()),
        (GiGeometry::Conventional, BeamGeometry::Parallel) => &["bg1", "ag1"],
        (GiGeometry::Conventional, BeamGeometry::Cone) => &["bg1"],
        (GiGeometry::Symmetrical, _) => &["bg1", "ag1"],
        (GiGeometry::Inverse, _) => &["ag1"],
    };
    let token = position.to_string();
    if !allowed.contains(&token.as_str()) {
        anyhow::bail!(
            "Sample position '{}' not allowed for '{}' geometry, use one of: {}",
            token,
            geometry,
            allowed.join(", ")
        );
    }
    Ok(())
}

fn insert_sample(components: &mut Vec<Component>, position: SamplePosition) -> Result<()> {
    let index = components
        .iter()
        .position(|c| *c == position.reference)
        .with_context(|| format!("Sample reference {} is not in the setup", position.reference))?;
    let index = match position.side {
        SampleSide::After => index + 1,
        SampleSide::Before => index,
    };
    components.insert(index, Component::Sample);
    Ok(())
}

fn build_sample(config: &SampleConfig) -> Sample {
    Sample {
        position: config.position,
        distance: config.distance,
        diameter: config.diameter,
        shape: config.shape.clone(),
    }
}

fn build_grating(grating: Grating, config: &GratingConfig) -> Result<GratingParams> {
    let bending = match (config.bent, config.matching, config.radius) {
        (false, _, _) => Bending::Straight,
        (true, true, _) => Bending::Matching,
        (true, false, Some(radius)) => Bending::Radius(radius),
        (true, false, None) => anyhow::bail!(
            "{} is bent but neither matching nor given a radius",
            grating
        ),
    };
    Ok(GratingParams {
        pitch: config.pitch,
        duty_cycle: config.duty_cycle,
        bending,
        radius: None,
    })
}

/// Write one pretty-printed JSON file per results group.
pub fn write_results_json(results: &GeometryResults, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    write_json(&results.setup, &dir.join("setup.json"))?;
    write_json(&results.distances, &dir.join("distances.json"))?;
    write_json(&results.gratings, &dir.join("gratings.json"))?;
    if let Some(sample) = &results.sample {
        write_json(sample, &dir.join("sample.json"))?;
    }
    write_json(&results.detector, &dir.join("detector.json"))?;

    println!("Results (JSON) written to: {}", dir.display());
    Ok(())
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json).with_context(|| format!("Writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use approx::assert_relative_eq;

    const CONE: &str = r#"
        [setup]
        geometry = "conv"
        design_energy = 25.0

        [gratings.g1]
        pitch = 4.0
        duty_cycle = 0.5

        [distances]
        distance_source_g1 = 1000.0
        distance_g2_detector = 100.0

        [sample]
        position = "bg1"
        distance = 10.0
        diameter = 20.0
    "#;

    #[test]
    fn test_build_parameters_infers_fixed_distance() {
        let job = parse_config(CONE).unwrap();
        let params = build_parameters(&job).unwrap();

        assert_eq!(
            params.component_list,
            vec![
                Component::Source,
                Component::Sample,
                Component::G1,
                Component::G2,
                Component::Detector
            ]
        );
        assert_eq!(
            params.topology,
            Topology::Conventional {
                fixed_grating: Grating::G1,
                fixed_distance: Some(FixedDistance::SourceG1),
            }
        );
        assert_relative_eq!(params.phase_shift_g1.unwrap(), PI);
    }

    #[test]
    fn test_total_length_wins_over_source_g1() {
        let job = parse_config(&CONE.replace(
            "distance_source_g1 = 1000.0",
            "distance_source_g1 = 1000.0\n        distance_source_g2 = 1100.0",
        ))
        .unwrap();
        let params = build_parameters(&job).unwrap();
        assert_eq!(
            params.topology.fixed_distance(),
            Some(FixedDistance::SourceG2)
        );
        assert!(!params.distances.contains(Span::from_source(Component::G1)));
    }

    #[test]
    fn test_sample_rule_per_topology() {
        let job = parse_config(&CONE.replace("\"bg1\"", "\"ag1\"")).unwrap();
        let err = build_parameters(&job).unwrap_err();
        assert!(err.to_string().contains("not allowed"));

        assert!(check_sample_rule(
            GiGeometry::Free,
            BeamGeometry::Cone,
            SamplePosition::before(Component::Detector)
        )
        .is_ok());
        assert!(check_sample_rule(
            GiGeometry::Inverse,
            BeamGeometry::Cone,
            SamplePosition::after(Component::G1)
        )
        .is_ok());
    }

    #[test]
    fn test_parallel_beam_drops_g0() {
        let job = parse_config(
            r#"
            [setup]
            geometry = "conv"
            beam = "parallel"
            design_energy = 25.0

            [gratings.g0]
            pitch = 10.0

            [gratings.g1]
            pitch = 4.0
            "#,
        )
        .unwrap();
        let params = build_parameters(&job).unwrap();
        assert!(!params.has_g0());
        assert_eq!(params.topology.fixed_distance(), None);
    }

    #[test]
    fn test_inverse_parallel_beam_names_the_beam() {
        let job = parse_config(
            r#"
            [setup]
            geometry = "inv"
            beam = "parallel"
            design_energy = 25.0

            [gratings.g1]
            pitch = 4.0
            "#,
        )
        .unwrap();
        let err = build_parameters(&job).unwrap_err();
        assert_eq!(err.to_string(), "'inv' geometry requires a cone beam");
    }

    #[test]
    fn test_bent_grating_needs_radius_or_matching() {
        let config = GratingConfig {
            bent: true,
            ..Default::default()
        };
        assert!(build_grating(Grating::G2, &config).is_err());

        let config = GratingConfig {
            bent: true,
            radius: Some(300.0),
            ..Default::default()
        };
        assert_eq!(
            build_grating(Grating::G2, &config).unwrap().bending,
            Bending::Radius(300.0)
        );
    }

    #[test]
    fn test_run_and_write_results() {
        let job = parse_config(CONE).unwrap();
        let solution = run_geometry(&job).unwrap();
        assert!(solution.results.sample.is_some());

        let dir = std::env::temp_dir().join(format!("talbot-cli-test-{}", std::process::id()));
        write_results_json(&solution.results, &dir).unwrap();
        for name in ["setup", "distances", "gratings", "sample", "detector"] {
            assert!(dir.join(format!("{}.json", name)).exists(), "{}", name);
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_distance_name() {
        let job = parse_config(&CONE.replace("distance_g2_detector", "distance_g2_screen")).unwrap();
        assert!(build_parameters(&job).is_err());
    }
}
