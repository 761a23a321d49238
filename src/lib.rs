//! `bevy_procedural_planets` — seeded procedural planet surfaces for Bevy.
//!
//! # Architecture
//! A [`PlanetManager`] owns every live planet: its seed pair, resolved
//! blueprint, property set, and generated artifacts. Property changes dirty
//! exactly the artifact slots they declare, and all texture production runs
//! through a single-flight FIFO [`scheduler`](crate::scheduler) over a
//! [`GenerationResource`]. The shipping resource, [`NoiseSynth`], renders on
//! a private worker thread; [`drive_planet_builds`] polls it once per frame
//! and uploads finished artifacts into [`bevy::asset::Assets<Image>`].
//!
//! Determinism is the core contract: the same [`SeedPair`] against the same
//! blueprint registry reproduces the same planet, texel for texel. Seam-free
//! surfaces come from the [`tiling`] samplers, which wrap noise around a
//! cylinder (planet maps) or a 4-D torus (detail surfaces).

pub mod artifact;
pub mod blueprint;
pub mod error;
pub mod manager;
pub mod planet;
pub mod property;
pub mod rng;
pub mod scheduler;
pub mod schema;
pub mod synth;
pub mod texture;
pub mod tiling;
pub mod upload;

pub use artifact::{ArtifactData, ArtifactTag};
pub use blueprint::{Blueprint, BlueprintRegistry, PlanetKind};
pub use error::{BlueprintError, BuildError, PlanetError};
pub use manager::{FinishedArtifact, PlanetManager};
pub use planet::{PlanetInstance, PlanetState};
pub use property::{PropertyValue, Range};
pub use rng::SeedPair;
pub use scheduler::{PlanetId, ResolutionSettings};
pub use synth::{GenerationResource, NoiseSynth};
pub use upload::artifact_to_image;

use std::collections::BTreeMap;

use bevy::prelude::*;

/// ECS-facing wrapper: the manager, its generation resource, and the image
/// handles uploaded so far.
#[derive(Resource)]
pub struct Planets {
    pub manager: PlanetManager,
    synth: NoiseSynth,
    handles: BTreeMap<(PlanetId, ArtifactTag), Handle<Image>>,
}

impl Planets {
    #[must_use]
    pub fn new(blueprints: BlueprintRegistry) -> Self {
        Self {
            manager: PlanetManager::new(blueprints),
            synth: NoiseSynth::new(),
            handles: BTreeMap::new(),
        }
    }

    /// The uploaded image for one planet's artifact slot, once built.
    #[must_use]
    pub fn texture(&self, planet: PlanetId, tag: ArtifactTag) -> Option<&Handle<Image>> {
        self.handles.get(&(planet, tag))
    }
}

/// Bevy system — steps the build queue once and uploads the finished
/// artifact, if one arrived this frame.
pub fn drive_planet_builds(mut planets: ResMut<Planets>, mut images: ResMut<Assets<Image>>) {
    let Planets { manager, synth, handles } = &mut *planets;
    let Some(finished) = manager.tick(synth) else {
        return;
    };
    let Some(data) = manager
        .planet(finished.planet)
        .and_then(|p| p.artifact(finished.tag))
    else {
        return;
    };
    let image = upload::artifact_to_image(finished.tag, data.clone());
    handles.insert((finished.planet, finished.tag), images.add(image));
}

/// Bevy plugin — inserts the [`Planets`] resource and registers the per-frame
/// build driver.
#[derive(Default)]
pub struct ProceduralPlanetsPlugin {
    /// Blueprint set available at startup; swappable later through
    /// [`PlanetManager::set_registry`].
    pub blueprints: BlueprintRegistry,
}

impl Plugin for ProceduralPlanetsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Planets::new(self.blueprints.clone()))
            .add_systems(Update, drive_planet_builds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planets_resource_drives_builds_end_to_end() {
        let mut registry = BlueprintRegistry::new();
        registry.register(Blueprint::new("jovian", PlanetKind::Gas, 1.0));
        let mut planets = Planets::new(registry);
        planets.manager.set_resolution(ResolutionSettings {
            maps_exponent: 4,
            clouds_exponent: 4,
            ..ResolutionSettings::default()
        });

        let id = planets
            .manager
            .create_planet(SeedPair::new(8, 2), None)
            .unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(30);
        let mut finished = Vec::new();
        while planets.manager.is_building(id) {
            assert!(std::time::Instant::now() < deadline, "builds never drained");
            let Planets { manager, synth, .. } = &mut planets;
            if let Some(f) = manager.tick(synth) {
                finished.push(f.tag);
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        assert_eq!(finished, vec![ArtifactTag::Maps, ArtifactTag::Clouds]);
        let planet = planets.manager.planet(id).unwrap();
        assert_eq!(planet.artifact(ArtifactTag::Maps).unwrap().width, 16);
    }
}
