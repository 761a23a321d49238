//! Designer-authored planet blueprints and the weighted registry.
//!
//! A blueprint is a named template: a planet kind, a relative probability
//! weight, a set of per-property randomization sub-ranges, and a ring
//! probability. The registry is an explicit value passed by reference — there
//! is no ambient singleton — and all of its operations are pure reads, so
//! designer tooling can swap the registered set between resolutions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BlueprintError;
use crate::property::Range;

/// The closed set of planet families. Resolved through explicit dispatch, not
/// runtime type lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanetKind {
    Solid,
    Gas,
}

/// One named template constraining a planet's property ranges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Unique within the registry (see
    /// [`BlueprintRegistry::validate_unique_names`]).
    pub name: String,
    pub kind: PlanetKind,
    /// Relative probability mass; must be `>= 0`.
    pub weight: f32,
    /// Chance in `[0, 1]` that an instantiated planet carries a ring.
    pub ring_probability: f32,
    /// Authored randomization sub-ranges, keyed by property key. Properties
    /// absent here keep their schema-declared default range.
    pub float_ranges: BTreeMap<String, Range>,
}

impl Blueprint {
    pub fn new(name: impl Into<String>, kind: PlanetKind, weight: f32) -> Self {
        Self {
            name: name.into(),
            kind,
            weight,
            ring_probability: 0.0,
            float_ranges: BTreeMap::new(),
        }
    }

    pub fn with_ring_probability(mut self, p: f32) -> Self {
        self.ring_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn with_range(mut self, key: impl Into<String>, min: f32, max: f32) -> Self {
        self.float_ranges.insert(key.into(), Range::new(min, max));
        self
    }
}

/// Insertion-ordered collection of blueprints with weighted resolution.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlueprintRegistry {
    blueprints: Vec<Blueprint>,
}

impl BlueprintRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, blueprint: Blueprint) {
        self.blueprints.push(blueprint);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blueprint> {
        self.blueprints.iter()
    }

    /// Resolve a blueprint from a draw in `[0, 1)` by walking the registered
    /// set in insertion order and accumulating normalized weight mass.
    ///
    /// A draw exactly on a cumulative boundary belongs to the *next*
    /// blueprint, never both. A degenerate `draw >= 1.0` resolves to the last
    /// blueprint so the pick is total whenever total weight is positive.
    pub fn resolve_by_weight(&self, draw: f32) -> Result<&Blueprint, BlueprintError> {
        let total: f32 = self.blueprints.iter().map(|b| b.weight).sum();
        if total <= 0.0 {
            return Err(BlueprintError::NoViableBlueprint);
        }
        let mut cumulative = 0.0;
        for blueprint in &self.blueprints {
            cumulative += blueprint.weight / total;
            if draw < cumulative {
                return Ok(blueprint);
            }
        }
        // Floating point shortfall or draw >= 1: the last blueprint wins.
        Ok(self
            .blueprints
            .iter()
            .rev()
            .find(|b| b.weight > 0.0)
            .unwrap_or_else(|| unreachable!("total weight > 0 implies a weighted blueprint")))
    }

    /// Exact name lookup.
    pub fn resolve_by_name(&self, name: &str) -> Result<&Blueprint, BlueprintError> {
        self.blueprints
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| BlueprintError::NotFound { name: name.to_owned() })
    }

    /// Integrity check: report every name used more than once.
    ///
    /// Advisory — the caller decides whether duplicates are fatal. The
    /// registry stays usable either way, but [`Self::resolve_by_name`] is
    /// ambiguous for the offending names (it returns the first match).
    pub fn validate_unique_names(&self) -> Result<(), BlueprintError> {
        let mut seen = BTreeMap::new();
        for blueprint in &self.blueprints {
            *seen.entry(blueprint.name.as_str()).or_insert(0u32) += 1;
        }
        let duplicates: Vec<String> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_owned())
            .collect();
        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(BlueprintError::DuplicateNames(duplicates))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_1_1_2() -> BlueprintRegistry {
        let mut registry = BlueprintRegistry::new();
        registry.register(Blueprint::new("first", PlanetKind::Solid, 1.0));
        registry.register(Blueprint::new("second", PlanetKind::Solid, 1.0));
        registry.register(Blueprint::new("third", PlanetKind::Gas, 2.0));
        registry
    }

    #[test]
    fn weighted_resolution_matches_cumulative_mass() {
        let registry = registry_1_1_2();
        // Weights [1,1,2], total 4 -> boundaries at 0.25 and 0.5.
        assert_eq!(registry.resolve_by_weight(0.0).unwrap().name, "first");
        assert_eq!(registry.resolve_by_weight(0.24).unwrap().name, "first");
        assert_eq!(registry.resolve_by_weight(0.26).unwrap().name, "second");
        assert_eq!(registry.resolve_by_weight(0.76).unwrap().name, "third");
    }

    #[test]
    fn boundary_draw_belongs_to_the_next_blueprint() {
        let registry = registry_1_1_2();
        assert_eq!(registry.resolve_by_weight(0.25).unwrap().name, "second");
        assert_eq!(registry.resolve_by_weight(0.5).unwrap().name, "third");
    }

    #[test]
    fn unit_draw_is_a_defined_outcome() {
        let registry = registry_1_1_2();
        assert_eq!(registry.resolve_by_weight(1.0).unwrap().name, "third");
    }

    #[test]
    fn zero_weight_blueprints_are_never_picked() {
        let mut registry = BlueprintRegistry::new();
        registry.register(Blueprint::new("common", PlanetKind::Solid, 1.0));
        registry.register(Blueprint::new("disabled", PlanetKind::Solid, 0.0));
        for draw in [0.0, 0.5, 0.999, 1.0] {
            assert_eq!(registry.resolve_by_weight(draw).unwrap().name, "common");
        }
    }

    #[test]
    fn zero_total_weight_is_no_viable_blueprint() {
        let mut registry = BlueprintRegistry::new();
        registry.register(Blueprint::new("a", PlanetKind::Solid, 0.0));
        assert_eq!(
            registry.resolve_by_weight(0.5),
            Err(BlueprintError::NoViableBlueprint)
        );
        assert_eq!(
            BlueprintRegistry::new().resolve_by_weight(0.5),
            Err(BlueprintError::NoViableBlueprint)
        );
    }

    #[test]
    fn name_lookup_misses_are_typed() {
        let registry = registry_1_1_2();
        assert_eq!(registry.resolve_by_name("second").unwrap().kind, PlanetKind::Solid);
        assert_eq!(
            registry.resolve_by_name("fourth"),
            Err(BlueprintError::NotFound { name: "fourth".into() })
        );
    }

    #[test]
    fn duplicate_names_are_reported_not_repaired() {
        let mut registry = registry_1_1_2();
        assert!(registry.validate_unique_names().is_ok());
        registry.register(Blueprint::new("second", PlanetKind::Gas, 1.0));
        assert_eq!(
            registry.validate_unique_names(),
            Err(BlueprintError::DuplicateNames(vec!["second".into()]))
        );
        // Still usable afterwards.
        assert!(registry.resolve_by_weight(0.1).is_ok());
    }
}
