//! Single-flight build scheduling.
//!
//! All texture production funnels through one FIFO queue with exactly one
//! request in flight at a time, matching the serial generation resource
//! behind it. The scheduler never blocks: [`BuildScheduler::tick`] is called
//! once per frame, polls the in-flight build, and starts the next one when
//! the resource is free.
//!
//! Rules, in order of application each tick:
//! 1. An in-flight build is polled; on completion it is handed back to the
//!    caller (or discarded with a warning if its requester is gone).
//! 2. Waiting requests from dead requesters are swept out.
//! 3. If nothing is in flight, the oldest waiting request starts: its
//!    parameters are staged, the output size is read from the *current*
//!    resolution settings, and the resource fires.
//!
//! Enqueueing the same `(requester, tag)` pair while its earlier request is
//! still waiting replaces that request's parameters in place — the planet
//! only cares about its latest state, and the queue keeps one slot per pair.
//! In-flight builds are never coalesced or cancelled; a change racing a
//! running build simply queues a fresh request behind it.

use std::collections::VecDeque;

use bevy::log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactData, ArtifactTag};
use crate::error::BuildError;
use crate::synth::GenerationResource;
use crate::texture::ParameterSnapshot;

/// Opaque identity of a build requester (a planet instance).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlanetId(pub u64);

/// Per-tag output resolutions, stored as power-of-two exponents.
///
/// Exponents are clamped to `4..=11` (16 to 2048 texels). Planet-wrapping
/// maps come out 2:1 equirectangular; tileable detail surfaces are square.
/// Settings are read when a build *starts*, not when it is enqueued, so a
/// settings change applies to every build still in the queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSettings {
    pub maps_exponent: u32,
    pub biome_exponent: u32,
    pub clouds_exponent: u32,
    pub cities_exponent: u32,
    pub lava_exponent: u32,
    pub polar_ice_exponent: u32,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            maps_exponent: 11,
            biome_exponent: 10,
            clouds_exponent: 11,
            cities_exponent: 10,
            lava_exponent: 10,
            polar_ice_exponent: 10,
        }
    }
}

impl ResolutionSettings {
    const EXPONENT_RANGE: std::ops::RangeInclusive<u32> = 4..=11;

    fn side(exponent: u32) -> u32 {
        1 << exponent.clamp(
            *Self::EXPONENT_RANGE.start(),
            *Self::EXPONENT_RANGE.end(),
        )
    }

    /// Output size in texels for one artifact slot.
    #[must_use]
    pub fn size_for(&self, tag: ArtifactTag) -> (u32, u32) {
        match tag {
            ArtifactTag::Maps => {
                let side = Self::side(self.maps_exponent);
                (side, side / 2)
            }
            ArtifactTag::Clouds => {
                let side = Self::side(self.clouds_exponent);
                (side, side / 2)
            }
            ArtifactTag::Cities => {
                let side = Self::side(self.cities_exponent);
                (side, side / 2)
            }
            ArtifactTag::Biome1 | ArtifactTag::Biome2 => {
                let side = Self::side(self.biome_exponent);
                (side, side)
            }
            ArtifactTag::Lava => {
                let side = Self::side(self.lava_exponent);
                (side, side)
            }
            ArtifactTag::PolarIce => {
                let side = Self::side(self.polar_ice_exponent);
                (side, side)
            }
            // Shader ramps are sampled 1-D; three fixed rows, one per ramp.
            ArtifactTag::Lookups => (256, 3),
            // Radial profile swept around the ring plane.
            ArtifactTag::Ring => (512, 32),
        }
    }
}

/// Lifecycle of a queued build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildState {
    Waiting,
    Processing,
    Finished,
}

#[derive(Debug)]
struct BuildRequest {
    requester: PlanetId,
    tag: ArtifactTag,
    params: ParameterSnapshot,
    state: BuildState,
}

/// A finished build, ready to route back to its requester.
#[derive(Debug)]
pub struct BuildCompletion {
    pub requester: PlanetId,
    pub tag: ArtifactTag,
    pub result: Result<ArtifactData, BuildError>,
}

/// FIFO queue of build requests with at most one in flight.
#[derive(Debug, Default)]
pub struct BuildScheduler {
    queue: VecDeque<BuildRequest>,
}

impl BuildScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a build, coalescing with an existing *waiting* request for the
    /// same `(requester, tag)` pair by replacing its parameters in place.
    pub fn enqueue(&mut self, requester: PlanetId, tag: ArtifactTag, params: ParameterSnapshot) {
        if let Some(existing) = self.queue.iter_mut().find(|r| {
            r.requester == requester && r.tag == tag && r.state == BuildState::Waiting
        }) {
            existing.params = params;
            return;
        }
        self.queue.push_back(BuildRequest {
            requester,
            tag,
            params,
            state: BuildState::Waiting,
        });
    }

    /// Whether any build (waiting or in flight) belongs to `requester`.
    #[must_use]
    pub fn is_build_pending_for(&self, requester: PlanetId) -> bool {
        self.queue.iter().any(|r| r.requester == requester)
    }

    /// Total queued requests, including the in-flight one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Advance the queue by one frame.
    ///
    /// Polls the in-flight build, sweeps requests from dead requesters, and
    /// starts the next waiting build if the resource is idle. Returns at most
    /// one completion per call; completions whose requester no longer passes
    /// `is_alive` are dropped with a warning.
    pub fn tick<R: GenerationResource>(
        &mut self,
        resource: &mut R,
        resolution: &ResolutionSettings,
        mut is_alive: impl FnMut(PlanetId) -> bool,
    ) -> Option<BuildCompletion> {
        let completion = self.poll_in_flight(resource);

        // Sweep waiting requests whose planet went away before their turn.
        self.queue.retain(|r| {
            let keep = r.state != BuildState::Waiting || is_alive(r.requester);
            if !keep {
                warn!(
                    "discarding queued {} build for stale planet {:?}",
                    r.tag, r.requester
                );
            }
            keep
        });

        if !resource.is_building() {
            self.start_next(resource, resolution);
        }

        match completion {
            Some(c) if !is_alive(c.requester) => {
                warn!(
                    "discarding finished {} build for stale planet {:?}",
                    c.tag, c.requester
                );
                None
            }
            other => other,
        }
    }

    fn poll_in_flight<R: GenerationResource>(&mut self, resource: &mut R) -> Option<BuildCompletion> {
        let index = self
            .queue
            .iter()
            .position(|r| r.state == BuildState::Processing)?;
        let result = resource.take_result()?;
        // The request leaves the queue the same tick it finishes.
        self.queue[index].state = BuildState::Finished;
        let request = self
            .queue
            .remove(index)
            .unwrap_or_else(|| unreachable!("index came from position()"));
        debug!("finished {} build for {:?}", request.tag, request.requester);
        Some(BuildCompletion {
            requester: request.requester,
            tag: request.tag,
            result,
        })
    }

    fn start_next<R: GenerationResource>(
        &mut self,
        resource: &mut R,
        resolution: &ResolutionSettings,
    ) {
        let Some(next) = self.queue.iter_mut().find(|r| r.state == BuildState::Waiting) else {
            return;
        };
        next.state = BuildState::Processing;
        for (name, value) in &next.params {
            resource.set_parameter(name, *value);
        }
        let (width, height) = resolution.size_for(next.tag);
        resource.set_output_size(width, height);
        debug!(
            "starting {} build for {:?} at {width}x{height}",
            next.tag, next.requester
        );
        resource.begin_build(next.tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synchronous in-memory resource: a begun build completes on the next
    /// poll, and every staged input is recorded for assertions.
    #[derive(Default)]
    struct FakeResource {
        staged: ParameterSnapshot,
        size: (u32, u32),
        building: Option<ArtifactTag>,
        began: Vec<(ArtifactTag, ParameterSnapshot, (u32, u32))>,
    }

    impl GenerationResource for FakeResource {
        fn set_parameter(&mut self, name: &str, value: f32) {
            self.staged.insert(name.to_owned(), value);
        }

        fn set_output_size(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }

        fn begin_build(&mut self, tag: ArtifactTag) {
            assert!(self.building.is_none(), "overlapping builds");
            self.began.push((tag, self.staged.clone(), self.size));
            self.building = Some(tag);
        }

        fn is_building(&self) -> bool {
            self.building.is_some()
        }

        fn take_result(&mut self) -> Option<Result<ArtifactData, BuildError>> {
            self.building.take().map(|_| {
                let (w, h) = self.size;
                Ok(ArtifactData::blank(w, h))
            })
        }
    }

    fn params(seed: f32) -> ParameterSnapshot {
        [("$randomseed".to_owned(), seed)].into_iter().collect()
    }

    const ALIVE: fn(PlanetId) -> bool = |_| true;

    #[test]
    fn builds_run_one_at_a_time_in_fifo_order() {
        let mut scheduler = BuildScheduler::new();
        let mut resource = FakeResource::default();
        let settings = ResolutionSettings::default();
        let planet = PlanetId(1);

        scheduler.enqueue(planet, ArtifactTag::Maps, params(1.0));
        scheduler.enqueue(planet, ArtifactTag::Clouds, params(2.0));
        scheduler.enqueue(planet, ArtifactTag::Lava, params(3.0));

        // Tick 1 starts the head; completions arrive on the following ticks.
        assert!(scheduler.tick(&mut resource, &settings, ALIVE).is_none());
        let first = scheduler.tick(&mut resource, &settings, ALIVE).unwrap();
        assert_eq!(first.tag, ArtifactTag::Maps);
        let second = scheduler.tick(&mut resource, &settings, ALIVE).unwrap();
        assert_eq!(second.tag, ArtifactTag::Clouds);
        let third = scheduler.tick(&mut resource, &settings, ALIVE).unwrap();
        assert_eq!(third.tag, ArtifactTag::Lava);

        assert!(scheduler.is_empty());
        let order: Vec<ArtifactTag> = resource.began.iter().map(|(t, _, _)| *t).collect();
        assert_eq!(order, [ArtifactTag::Maps, ArtifactTag::Clouds, ArtifactTag::Lava]);
    }

    #[test]
    fn waiting_requests_coalesce_by_requester_and_tag() {
        let mut scheduler = BuildScheduler::new();
        let planet = PlanetId(1);

        scheduler.enqueue(planet, ArtifactTag::Clouds, params(1.0));
        scheduler.enqueue(planet, ArtifactTag::Maps, params(2.0));
        scheduler.enqueue(planet, ArtifactTag::Clouds, params(9.0));
        assert_eq!(scheduler.len(), 2, "same pair must share one slot");

        // The coalesced request carries the latest parameters and keeps its
        // original queue position.
        let mut resource = FakeResource::default();
        let settings = ResolutionSettings::default();
        scheduler.tick(&mut resource, &settings, ALIVE);
        let (tag, staged, _) = &resource.began[0];
        assert_eq!(*tag, ArtifactTag::Clouds);
        assert_eq!(staged.get("$randomseed"), Some(&9.0));
    }

    #[test]
    fn in_flight_builds_are_not_coalesced() {
        let mut scheduler = BuildScheduler::new();
        let mut resource = FakeResource::default();
        let settings = ResolutionSettings::default();
        let planet = PlanetId(1);

        scheduler.enqueue(planet, ArtifactTag::Clouds, params(1.0));
        scheduler.tick(&mut resource, &settings, ALIVE); // now processing

        scheduler.enqueue(planet, ArtifactTag::Clouds, params(2.0));
        assert_eq!(scheduler.len(), 2, "a running build gets a fresh slot");

        let stale = scheduler.tick(&mut resource, &settings, ALIVE).unwrap();
        assert_eq!(stale.tag, ArtifactTag::Clouds);
        let fresh = scheduler.tick(&mut resource, &settings, ALIVE).unwrap();
        assert_eq!(fresh.tag, ArtifactTag::Clouds);
        assert_eq!(resource.began[1].1.get("$randomseed"), Some(&2.0));
    }

    #[test]
    fn requests_from_different_planets_never_coalesce() {
        let mut scheduler = BuildScheduler::new();
        scheduler.enqueue(PlanetId(1), ArtifactTag::Maps, params(1.0));
        scheduler.enqueue(PlanetId(2), ArtifactTag::Maps, params(2.0));
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn stale_waiting_requests_are_swept() {
        let mut scheduler = BuildScheduler::new();
        let mut resource = FakeResource::default();
        let settings = ResolutionSettings::default();

        scheduler.enqueue(PlanetId(1), ArtifactTag::Maps, params(1.0));
        scheduler.enqueue(PlanetId(2), ArtifactTag::Clouds, params(2.0));

        // Planet 1 is gone before its build starts; planet 2 runs instead.
        scheduler.tick(&mut resource, &settings, |id| id == PlanetId(2));
        assert_eq!(resource.began[0].0, ArtifactTag::Clouds);
        assert!(!scheduler.is_build_pending_for(PlanetId(1)));
    }

    #[test]
    fn completions_for_dead_requesters_are_dropped() {
        let mut scheduler = BuildScheduler::new();
        let mut resource = FakeResource::default();
        let settings = ResolutionSettings::default();

        scheduler.enqueue(PlanetId(1), ArtifactTag::Maps, params(1.0));
        scheduler.tick(&mut resource, &settings, ALIVE); // starts
        // The planet dies while its build runs; the result is discarded.
        assert!(scheduler.tick(&mut resource, &settings, |_| false).is_none());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn resolution_is_read_when_the_build_starts() {
        let mut scheduler = BuildScheduler::new();
        let mut resource = FakeResource::default();
        let planet = PlanetId(1);

        scheduler.enqueue(planet, ArtifactTag::Biome1, params(1.0));

        // Settings changed after enqueue but before the build starts.
        let settings = ResolutionSettings {
            biome_exponent: 5,
            ..ResolutionSettings::default()
        };
        scheduler.tick(&mut resource, &settings, ALIVE);
        assert_eq!(resource.began[0].2, (32, 32));
    }

    #[test]
    fn exponents_clamp_to_the_supported_range() {
        let settings = ResolutionSettings {
            maps_exponent: 30,
            biome_exponent: 1,
            ..ResolutionSettings::default()
        };
        assert_eq!(settings.size_for(ArtifactTag::Maps), (2048, 1024));
        assert_eq!(settings.size_for(ArtifactTag::Biome1), (16, 16));
        assert_eq!(settings.size_for(ArtifactTag::Lookups), (256, 3));
    }

    #[test]
    fn pending_covers_waiting_and_processing() {
        let mut scheduler = BuildScheduler::new();
        let mut resource = FakeResource::default();
        let settings = ResolutionSettings::default();
        let planet = PlanetId(7);

        assert!(!scheduler.is_build_pending_for(planet));
        scheduler.enqueue(planet, ArtifactTag::Maps, params(1.0));
        assert!(scheduler.is_build_pending_for(planet));

        scheduler.tick(&mut resource, &settings, ALIVE); // processing
        assert!(scheduler.is_build_pending_for(planet));

        scheduler.tick(&mut resource, &settings, ALIVE).unwrap();
        assert!(!scheduler.is_build_pending_for(planet));
    }
}
