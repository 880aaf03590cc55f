//! Console tables for a solved geometry.

use std::fmt;

use talbot_core::distances::Span;
use talbot_core::results::GeometryResults;
use talbot_core::types::{Component, GiGeometry};

const RULE_WIDTH: usize = 43;

/// Print the setup, distance and grating tables.
pub fn print_report(results: &GeometryResults) {
    print!("{}", Report(results));
}

/// Render the report as text.
pub fn format_report(results: &GeometryResults) -> String {
    Report(results).to_string()
}

struct Report<'a>(&'a GeometryResults);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_report(f, self.0)
    }
}

fn write_report(out: &mut fmt::Formatter<'_>, results: &GeometryResults) -> fmt::Result {
    let setup = &results.setup;
    writeln!(out, "Setup")?;
    writeln!(
        out,
        "{} beam and {} setup{}",
        setup.beam_geometry,
        setup.gi_geometry,
        if setup.dual_phase { " (dual phase)" } else { "" }
    )?;
    writeln!(out)?;

    let separator = "-".repeat(RULE_WIDTH);
    writeln!(out, "Distances")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "{:<30}{:>13}", "Distance", "[mm]")?;
    writeln!(out, "{}", separator)?;

    let mut remaining: Vec<(Span, f64)> = results.distances.iter().collect();
    let mut take = |span: Span| -> Option<f64> {
        let index = remaining.iter().position(|(s, _)| *s == span)?;
        Some(remaining.remove(index).1)
    };

    // l, d and s first
    if setup.gi_geometry != GiGeometry::Free {
        let start = if setup.component_list.contains(&Component::G0) {
            Component::G0
        } else {
            Component::Source
        };
        for span in [
            Span::new(start, Component::G1),
            Span::new(Component::G1, Component::G2),
            Span::new(start, Component::G2),
        ] {
            if let Some(value) = take(span) {
                write_row(out, span, value)?;
            }
        }
    }
    for to in [Component::Detector, Component::Sample] {
        let span = Span::from_source(to);
        if let Some(value) = take(span) {
            write_row(out, span, value)?;
        }
    }
    writeln!(out, "{}", separator)?;
    for (span, value) in remaining {
        write_row(out, span, value)?;
    }
    if let Some(sample) = &results.sample {
        writeln!(out, "{}", separator)?;
        writeln!(
            out,
            "{:<30}{:>13.3}",
            format!("{} to Sample", sample.position.reference),
            sample.distance
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Gratings")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(
        out,
        "{:<17}{:>9}{:>7}{:>10}",
        "Grating", "[um]", "DC", "r [mm]"
    )?;
    writeln!(out, "{}", separator)?;
    for grating in &results.gratings.gratings {
        writeln!(
            out,
            "{:<17}{:>9}{:>7}{:>10}",
            grating.grating.to_string(),
            cell(grating.pitch, 3),
            cell(grating.duty_cycle, 2),
            cell(grating.radius, 1),
        )?;
    }
    if let Some(fringe) = &results.gratings.fringe {
        writeln!(
            out,
            "{:<17}{:>9}{:>7}{:>10}",
            "Detector fringe",
            cell(Some(fringe.pitch), 3),
            cell(fringe.duty_cycle, 2),
            "-"
        )?;
    }

    let detector = &results.detector;
    if detector.width.is_some() || detector.curved {
        writeln!(out)?;
        writeln!(out, "Detector")?;
        writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(out, "{:<30}{:>13}", "Curved", detector.curved)?;
        if let Some(radius) = detector.radius {
            writeln!(out, "{:<30}{:>13.3}", "Radius [mm]", radius)?;
        }
        if let (Some(width), Some(height)) = (detector.width, detector.height) {
            writeln!(out, "{:<30}{:>13}", "Size [mm]", format!("{:.1} x {:.1}", width, height))?;
        }
        if let (Some(fan), Some(cone)) = (detector.fan_angle, detector.cone_angle) {
            writeln!(out, "{:<30}{:>13.2}", "Fan angle [deg]", fan.to_degrees())?;
            writeln!(out, "{:<30}{:>13.2}", "Cone angle [deg]", cone.to_degrees())?;
        }
    }
    Ok(())
}

fn write_row(out: &mut fmt::Formatter<'_>, span: Span, value: f64) -> fmt::Result {
    writeln!(out, "{:<30}{:>13.3}", format!("{} to {}", span.from, span.to), value)
}

fn cell(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::runner::run_geometry;

    #[test]
    fn test_report_lists_design_distances_first() {
        let job = parse_config(
            r#"
            [setup]
            geometry = "sym"
            design_energy = 25.0

            [gratings.g1]
            pitch = 4.0
            duty_cycle = 0.5

            [gratings.g2]
            bent = true
            matching = true

            [distances]
            distance_g2_detector = 100.0
            "#,
        )
        .unwrap();
        let solution = run_geometry(&job).unwrap();
        let report = format_report(&solution.results);

        let first_row = report
            .lines()
            .skip_while(|line| !line.starts_with("Distance "))
            .nth(2)
            .unwrap();
        assert!(first_row.starts_with("Source to G1"), "{}", first_row);
        assert!(report.contains("cone beam and sym setup"));

        let gratings: Vec<&str> = report.lines().skip_while(|l| *l != "Gratings").collect();
        let g1_row = gratings.iter().find(|l| l.starts_with("G1 ")).unwrap();
        assert!(g1_row.trim_end().ends_with('-'));
        let g2_row = gratings.iter().find(|l| l.starts_with("G2 ")).unwrap();
        assert!(!g2_row.trim_end().ends_with('-'));
        assert!(!report.contains("Detector fringe"));
    }
}
