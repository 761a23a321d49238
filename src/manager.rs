//! The planet factory: owns every instance, the blueprint registry, the
//! resolution settings, and the build queue.
//!
//! [`PlanetManager::tick`] is the whole runtime loop, called once per frame:
//! dirty artifact slots become build requests, the scheduler advances by one
//! step, and at most one finished artifact is routed back to its planet. The
//! manager is engine-agnostic; the bevy plugin at the crate root is a thin
//! driver around it.

use std::collections::BTreeMap;

use bevy::log::{error, info, warn};

use crate::blueprint::BlueprintRegistry;
use crate::error::PlanetError;
use crate::planet::{PlanetInstance, PlanetState};
use crate::rng::SeedPair;
use crate::scheduler::{BuildScheduler, PlanetId, ResolutionSettings};
use crate::synth::GenerationResource;

/// Owns and drives every live planet.
pub struct PlanetManager {
    registry: BlueprintRegistry,
    scheduler: BuildScheduler,
    resolution: ResolutionSettings,
    planets: BTreeMap<PlanetId, PlanetInstance>,
    next_id: u64,
}

/// One artifact routed to its planet this tick. The payload stays on the
/// instance; this is the notification to go fetch it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinishedArtifact {
    pub planet: PlanetId,
    pub tag: crate::artifact::ArtifactTag,
}

impl PlanetManager {
    /// Build a manager over a registry. Duplicate blueprint names are
    /// tolerated but logged — name lookups resolve to the first match.
    #[must_use]
    pub fn new(registry: BlueprintRegistry) -> Self {
        if let Err(e) = registry.validate_unique_names() {
            warn!("blueprint registry: {e}");
        }
        Self {
            registry,
            scheduler: BuildScheduler::new(),
            resolution: ResolutionSettings::default(),
            planets: BTreeMap::new(),
            next_id: 0,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &BlueprintRegistry {
        &self.registry
    }

    /// Replace the registered blueprint set. Existing planets keep the
    /// blueprint data they were instantiated from.
    pub fn set_registry(&mut self, registry: BlueprintRegistry) {
        if let Err(e) = registry.validate_unique_names() {
            warn!("blueprint registry: {e}");
        }
        self.registry = registry;
    }

    #[must_use]
    pub fn resolution(&self) -> &ResolutionSettings {
        &self.resolution
    }

    /// Change output resolutions. Applies to every build that has not yet
    /// started, queued ones included.
    pub fn set_resolution(&mut self, resolution: ResolutionSettings) {
        self.resolution = resolution;
    }

    /// Create a planet from a seed pair, optionally pinning the blueprint by
    /// name. All of its artifacts are queued on the next tick.
    pub fn create_planet(
        &mut self,
        seed: SeedPair,
        blueprint_name: Option<&str>,
    ) -> Result<PlanetId, PlanetError> {
        let id = self.claim_id();
        let planet = PlanetInstance::instantiate(id, seed, &self.registry, blueprint_name)?;
        info!(
            "created planet {id:?} from blueprint {:?} (seed {}/{})",
            planet.blueprint_name(),
            seed.primary,
            seed.variation
        );
        self.planets.insert(id, planet);
        Ok(id)
    }

    /// Recreate a planet from an exported document.
    pub fn create_planet_from_state(&mut self, state: &PlanetState) -> Result<PlanetId, PlanetError> {
        let id = self.claim_id();
        let planet = PlanetInstance::from_state(id, state, &self.registry)?;
        info!("imported planet {id:?} from blueprint {:?}", planet.blueprint_name());
        self.planets.insert(id, planet);
        Ok(id)
    }

    /// Remove a planet. Queued builds for it are swept on the next tick and
    /// an in-flight build, if any, completes and is discarded.
    pub fn destroy_planet(&mut self, id: PlanetId) -> bool {
        self.planets.remove(&id).is_some()
    }

    #[must_use]
    pub fn planet(&self, id: PlanetId) -> Option<&PlanetInstance> {
        self.planets.get(&id)
    }

    pub fn planet_mut(&mut self, id: PlanetId) -> Option<&mut PlanetInstance> {
        self.planets.get_mut(&id)
    }

    pub fn planets(&self) -> impl Iterator<Item = &PlanetInstance> {
        self.planets.values()
    }

    #[must_use]
    pub fn planet_count(&self) -> usize {
        self.planets.len()
    }

    /// Whether `id` still has texture work outstanding (dirty slots, queued
    /// requests, or an in-flight build).
    #[must_use]
    pub fn is_building(&self, id: PlanetId) -> bool {
        self.planets.get(&id).is_some_and(PlanetInstance::is_dirty)
            || self.scheduler.is_build_pending_for(id)
    }

    /// Advance the world by one frame.
    ///
    /// Flushes dirty slots into the queue, steps the scheduler, and routes
    /// the completion (if one arrived) back to its planet. Returns the
    /// notification for a successfully built artifact; build failures are
    /// recorded on the instance and logged, not returned.
    pub fn tick<R: GenerationResource>(&mut self, resource: &mut R) -> Option<FinishedArtifact> {
        for (id, planet) in &mut self.planets {
            for tag in planet.take_dirty() {
                let params = planet.parameter_snapshot(tag);
                self.scheduler.enqueue(*id, tag, params);
            }
        }

        let planets = &self.planets;
        let completion =
            self.scheduler
                .tick(resource, &self.resolution, |id| planets.contains_key(&id))?;

        let planet = self.planets.get_mut(&completion.requester)?;
        let succeeded = completion.result.is_ok();
        if let Err(e) = &completion.result {
            error!(
                "{} build failed for planet {:?}: {e}",
                completion.tag, completion.requester
            );
        }
        planet.on_artifact_ready(completion.tag, completion.result);
        succeeded.then_some(FinishedArtifact {
            planet: completion.requester,
            tag: completion.tag,
        })
    }

    fn claim_id(&mut self) -> PlanetId {
        let id = PlanetId(self.next_id);
        self.next_id += 1;
        id
    }
}
