//! One live planet: seed, blueprint, properties, ring, and artifact state.
//!
//! A [`PlanetInstance`] is pure state plus bookkeeping — it owns no threads
//! and talks to no resources. Changing a property marks artifact slots dirty;
//! the manager drains the dirty set into build requests and routes finished
//! artifacts back through [`PlanetInstance::on_artifact_ready`].
//!
//! Creation is all-or-nothing: any resolution failure aborts before state
//! exists, so there is never a half-initialized planet to clean up.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactData, ArtifactTag};
use crate::blueprint::{Blueprint, BlueprintRegistry, PlanetKind};
use crate::error::{BuildError, PlanetError};
use crate::property::{PropertySet, PropertyValue};
use crate::rng::{SeedPair, seeded_float};
use crate::scheduler::PlanetId;
use crate::schema::{SCHEMA_VERSION, artifacts_for, properties_for, ring_properties};
use crate::texture::ParameterSnapshot;

/// A planetary ring attached to an instance. Randomized from the variation
/// seed lane so ring parameters never shift the planet's own defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct RingInstance {
    pub properties: PropertySet,
}

impl RingInstance {
    fn from_seed(variation: u32) -> Self {
        let mut properties = ring_properties();
        properties.randomize_unlocked(variation);
        Self { properties }
    }
}

/// A planet in the world: identity, seeds, resolved blueprint, property set,
/// optional ring, and per-artifact build state.
#[derive(Debug)]
pub struct PlanetInstance {
    id: PlanetId,
    seed: SeedPair,
    blueprint_name: String,
    kind: PlanetKind,
    properties: PropertySet,
    ring: Option<RingInstance>,
    dirty: BTreeSet<ArtifactTag>,
    ready: BTreeMap<ArtifactTag, ArtifactData>,
    last_build_error: Option<(ArtifactTag, BuildError)>,
}

impl PlanetInstance {
    /// Create a planet from a seed pair.
    ///
    /// The blueprint comes from a weighted draw over the registry, or from an
    /// exact name when `blueprint_name` is given (the editor's "make me this
    /// kind" path). Every non-overridden property is randomized inside the
    /// blueprint's authored sub-ranges, and every artifact the planet needs
    /// starts dirty.
    pub fn instantiate(
        id: PlanetId,
        seed: SeedPair,
        registry: &BlueprintRegistry,
        blueprint_name: Option<&str>,
    ) -> Result<Self, PlanetError> {
        let blueprint = match blueprint_name {
            Some(name) => registry.resolve_by_name(name)?,
            None => {
                let draw = seeded_float(seed.primary, "blueprint");
                registry.resolve_by_weight(draw)?
            }
        };
        Ok(Self::from_blueprint(id, seed, blueprint))
    }

    fn from_blueprint(id: PlanetId, seed: SeedPair, blueprint: &Blueprint) -> Self {
        let mut properties = properties_for(blueprint.kind);
        for (key, range) in &blueprint.float_ranges {
            if let Some(p) = properties.floats_mut().find(|p| p.key == key.as_str()) {
                p.apply_blueprint_range(*range);
            }
        }
        properties.randomize_unlocked(seed.primary);

        // Ring presence draws from the variation lane: re-rolling the primary
        // seed changes the surface, not whether the ring exists.
        let ring_draw = seeded_float(seed.variation, "ring");
        let ring = (ring_draw < blueprint.ring_probability)
            .then(|| RingInstance::from_seed(seed.variation));

        let mut planet = Self {
            id,
            seed,
            blueprint_name: blueprint.name.clone(),
            kind: blueprint.kind,
            properties,
            ring,
            dirty: BTreeSet::new(),
            ready: BTreeMap::new(),
            last_build_error: None,
        };
        planet.mark_all_dirty();
        planet
    }

    #[must_use]
    pub fn id(&self) -> PlanetId {
        self.id
    }

    #[must_use]
    pub fn seed(&self) -> SeedPair {
        self.seed
    }

    #[must_use]
    pub fn kind(&self) -> PlanetKind {
        self.kind
    }

    #[must_use]
    pub fn blueprint_name(&self) -> &str {
        &self.blueprint_name
    }

    #[must_use]
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    #[must_use]
    pub fn ring(&self) -> Option<&RingInstance> {
        self.ring.as_ref()
    }

    #[must_use]
    pub fn has_ring(&self) -> bool {
        self.ring.is_some()
    }

    /// Every artifact slot this instance renders with.
    pub fn artifact_tags(&self) -> impl Iterator<Item = ArtifactTag> + '_ {
        artifacts_for(self.kind)
            .iter()
            .copied()
            .chain(self.ring.iter().map(|_| ArtifactTag::Ring))
    }

    /// Install an explicit value on one property and dirty the artifacts it
    /// invalidates. Keys missing from the planet's own schema fall through to
    /// the ring's, when a ring exists.
    pub fn set_property(&mut self, key: &str, value: PropertyValue) -> Result<(), PlanetError> {
        let tags = match self.properties.set_override(key, value) {
            Err(PlanetError::PropertyNotFound { .. }) if self.ring.is_some() => {
                let ring = self
                    .ring
                    .as_mut()
                    .unwrap_or_else(|| unreachable!("guarded by is_some"));
                ring.properties.set_override(key, value)?
            }
            other => other?,
        };
        self.mark_dirty(tags);
        Ok(())
    }

    /// Drop an override, re-deriving the property from the current seed, and
    /// dirty the artifacts it invalidates.
    pub fn reset_property(&mut self, key: &str) -> Result<(), PlanetError> {
        let tags = match self.properties.clear_override(key, self.seed.primary) {
            Err(PlanetError::PropertyNotFound { .. }) if self.ring.is_some() => {
                let ring = self
                    .ring
                    .as_mut()
                    .unwrap_or_else(|| unreachable!("guarded by is_some"));
                ring.properties.clear_override(key, self.seed.variation)?
            }
            other => other?,
        };
        self.mark_dirty(tags);
        Ok(())
    }

    /// Re-roll the primary seed: every non-overridden property re-derives and
    /// every artifact rebuilds. With `preserve_overrides` the explicit values
    /// stay put; without it the whole planet re-derives from the new seed.
    /// Ring presence is pinned to the variation lane and does not change.
    pub fn reseed(&mut self, new_primary: u32, preserve_overrides: bool) {
        self.seed.primary = new_primary;
        if !preserve_overrides {
            for p in self.properties.floats_mut() {
                p.overridden = false;
            }
            for p in self.properties.colors_mut() {
                p.overridden = false;
            }
            for p in self.properties.materials_mut() {
                p.overridden = false;
            }
        }
        self.properties.randomize_unlocked(new_primary);
        self.mark_all_dirty();
    }

    /// Generator parameters for one artifact: every float that feeds the
    /// resource and invalidates `tag`, resolved to its real magnitude.
    #[must_use]
    pub fn parameter_snapshot(&self, tag: ArtifactTag) -> ParameterSnapshot {
        let source = match (tag, &self.ring) {
            (ArtifactTag::Ring, Some(ring)) => &ring.properties,
            _ => &self.properties,
        };
        source
            .floats()
            .filter(|p| p.invalidates.contains(&tag))
            .filter_map(|p| p.shader_param.map(|name| (name.to_owned(), p.resolved())))
            .collect()
    }

    /// Artifact tags awaiting a rebuild, drained for enqueueing.
    pub fn take_dirty(&mut self) -> Vec<ArtifactTag> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Route a finished build into this instance. Failures are recorded and
    /// inspectable; the slot keeps its previous artifact, if any.
    pub fn on_artifact_ready(&mut self, tag: ArtifactTag, result: Result<ArtifactData, BuildError>) {
        match result {
            Ok(data) => {
                self.ready.insert(tag, data);
            }
            Err(error) => {
                self.last_build_error = Some((tag, error));
            }
        }
    }

    /// The most recent artifact built for `tag`, if any build has finished.
    #[must_use]
    pub fn artifact(&self, tag: ArtifactTag) -> Option<&ArtifactData> {
        self.ready.get(&tag)
    }

    /// Artifacts built and not yet superseded, in tag order.
    pub fn artifacts(&self) -> impl Iterator<Item = (ArtifactTag, &ArtifactData)> {
        self.ready.iter().map(|(tag, data)| (*tag, data))
    }

    /// The most recent failed build, if any. Sticky: a later success on a
    /// different slot does not clear it.
    #[must_use]
    pub fn last_build_error(&self) -> Option<&(ArtifactTag, BuildError)> {
        self.last_build_error.as_ref()
    }

    fn mark_dirty(&mut self, tags: &[ArtifactTag]) {
        for tag in tags {
            // A ring slot only exists on ringed planets.
            if *tag == ArtifactTag::Ring && self.ring.is_none() {
                continue;
            }
            self.dirty.insert(*tag);
        }
    }

    fn mark_all_dirty(&mut self) {
        let tags: Vec<ArtifactTag> = self.artifact_tags().collect();
        self.dirty.extend(tags);
    }

    /// Snapshot everything needed to reproduce this planet elsewhere: seeds,
    /// blueprint name, ring presence, and explicit overrides. Randomized
    /// values are *not* stored — they re-derive from the seeds on import.
    #[must_use]
    pub fn export_state(&self) -> PlanetState {
        fn overrides(set: &PropertySet) -> Overrides {
            Overrides {
                floats: set
                    .floats()
                    .filter(|p| p.overridden)
                    .map(|p| (p.key.to_owned(), p.value))
                    .collect(),
                colors: set
                    .colors()
                    .filter(|p| p.overridden)
                    .map(|p| (p.key.to_owned(), p.value))
                    .collect(),
                materials: set
                    .materials()
                    .filter(|p| p.overridden)
                    .map(|p| (p.key.to_owned(), p.index))
                    .collect(),
            }
        }
        PlanetState {
            schema_version: SCHEMA_VERSION,
            seed: self.seed,
            blueprint: self.blueprint_name.clone(),
            has_ring: self.ring.is_some(),
            overrides: overrides(&self.properties),
            ring_overrides: self.ring.as_ref().map(|r| overrides(&r.properties)),
        }
    }

    /// Rebuild a planet from an exported document.
    ///
    /// The blueprint is resolved by its stored name, defaults re-derive from
    /// the stored seeds, then the stored overrides are replayed. Ring
    /// presence comes from the document, not from a fresh probability draw,
    /// so an imported planet matches its export even after the blueprint's
    /// ring odds were re-authored.
    pub fn from_state(
        id: PlanetId,
        state: &PlanetState,
        registry: &BlueprintRegistry,
    ) -> Result<Self, PlanetError> {
        if state.schema_version != SCHEMA_VERSION {
            return Err(PlanetError::StateVersion {
                found: state.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        let blueprint = registry.resolve_by_name(&state.blueprint)?;
        let mut planet = Self::from_blueprint(id, state.seed, blueprint);

        planet.ring = state
            .has_ring
            .then(|| RingInstance::from_seed(state.seed.variation));
        planet.dirty.remove(&ArtifactTag::Ring);
        planet.mark_all_dirty();

        replay(&mut planet.properties, &state.overrides)?;
        if let (Some(ring), Some(saved)) = (planet.ring.as_mut(), state.ring_overrides.as_ref()) {
            replay(&mut ring.properties, saved)?;
        }
        Ok(planet)
    }
}

fn replay(set: &mut PropertySet, saved: &Overrides) -> Result<(), PlanetError> {
    for (key, value) in &saved.floats {
        set.set_override(key, PropertyValue::Float(*value))?;
    }
    for (key, value) in &saved.colors {
        set.set_override(key, PropertyValue::Color(*value))?;
    }
    for (key, value) in &saved.materials {
        set.set_override(key, PropertyValue::Material(*value))?;
    }
    Ok(())
}

/// Explicit override values captured by [`PlanetInstance::export_state`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    pub floats: BTreeMap<String, f32>,
    #[serde(default)]
    pub colors: BTreeMap<String, [f32; 3]>,
    #[serde(default)]
    pub materials: BTreeMap<String, usize>,
}

/// Serializable planet document: seed pair, blueprint name, ring presence,
/// and overrides. Everything else re-derives deterministically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanetState {
    pub schema_version: u32,
    pub seed: SeedPair,
    pub blueprint: String,
    pub has_ring: bool,
    #[serde(default)]
    pub overrides: Overrides,
    #[serde(default)]
    pub ring_overrides: Option<Overrides>,
}
