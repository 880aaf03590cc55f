//! Distances between components along the beam.
//!
//! Every distance is keyed by an ordered pair of components ([`Span`]) and
//! stored in millimetres. Spans print as `distance_<from>_<to>`, the same
//! names used in job files and result files.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::{Component, FixedDistance, ParseTokenError};

/// An ordered pair of components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub from: Component,
    pub to: Component,
}

impl Span {
    pub const fn new(from: Component, to: Component) -> Self {
        Self { from, to }
    }

    /// Distance of `to` from the source.
    pub const fn from_source(to: Component) -> Self {
        Self::new(Component::Source, to)
    }
}

impl From<FixedDistance> for Span {
    fn from(fixed: FixedDistance) -> Self {
        Self::new(fixed.origin(), fixed.target().component())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "distance_{}_{}",
            self.from.short_name(),
            self.to.short_name()
        )
    }
}

impl FromStr for Span {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseTokenError {
            kind: "distance",
            token: s.to_string(),
        };
        let rest = s.strip_prefix("distance_").ok_or_else(invalid)?;
        let (from, to) = rest.split_once('_').ok_or_else(invalid)?;
        let from: Component = from.parse().map_err(|_| invalid())?;
        let to: Component = to.parse().map_err(|_| invalid())?;
        if from >= to {
            return Err(invalid());
        }
        Ok(Self { from, to })
    }
}

/// Table of known distances (mm).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceTable {
    entries: BTreeMap<Span, f64>,
}

impl DistanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, span: Span) -> Option<f64> {
        self.entries.get(&span).copied()
    }

    /// Insert or overwrite a distance, returning the previous value.
    pub fn insert(&mut self, span: Span, value_mm: f64) -> Option<f64> {
        self.entries.insert(span, value_mm)
    }

    /// Convenience wrapper around [`insert`](Self::insert).
    pub fn set(&mut self, from: Component, to: Component, value_mm: f64) {
        self.entries.insert(Span::new(from, to), value_mm);
    }

    pub fn remove(&mut self, span: Span) -> Option<f64> {
        self.entries.remove(&span)
    }

    pub fn contains(&self, span: Span) -> bool {
        self.entries.contains_key(&span)
    }

    /// Iterate in beam order of the `from` component, then the `to` component.
    pub fn iter(&self) -> impl Iterator<Item = (Span, f64)> + '_ {
        self.entries.iter().map(|(span, value)| (*span, *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Span, f64)> for DistanceTable {
    fn from_iter<I: IntoIterator<Item = (Span, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for DistanceTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (span, value) in &self.entries {
            map.serialize_entry(&span.to_string(), value)?;
        }
        map.end()
    }
}
