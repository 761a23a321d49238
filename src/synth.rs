//! The generation resource boundary.
//!
//! The scheduler drives texture production through [`GenerationResource`]: a
//! stage-then-fire protocol (set parameters, set output size, begin) with
//! non-blocking completion polls. The trait exists so tests can substitute a
//! synchronous fake and so a GPU-backed producer could slot in later without
//! touching scheduling logic.
//!
//! [`NoiseSynth`] is the shipping implementation: the renderers from
//! [`crate::texture`] running on a private single-thread [`rayon`] pool, with
//! completion signalled over a bounded [`mpsc`] channel and observed via
//! [`mpsc::Receiver::try_recv`]. One worker thread is the whole point — the
//! resource itself can only ever run one build, which is the physical
//! constraint the scheduler's single-flight rule mirrors.

use std::sync::{OnceLock, mpsc};

use bevy::platform::cell::SyncCell;

use crate::artifact::{ArtifactData, ArtifactTag};
use crate::error::BuildError;
use crate::texture::{ParameterSnapshot, render_artifact};

/// A texture producer the build scheduler can drive.
///
/// Protocol: stage inputs with [`set_parameter`](Self::set_parameter) and
/// [`set_output_size`](Self::set_output_size), then call
/// [`begin_build`](Self::begin_build) exactly once, then poll
/// [`take_result`](Self::take_result) until it yields. Staged parameters
/// persist across builds; callers overwrite the ones that changed.
pub trait GenerationResource {
    /// Stage one named generator parameter for the next build.
    fn set_parameter(&mut self, name: &str, value: f32);

    /// Stage the output resolution for the next build.
    fn set_output_size(&mut self, width: u32, height: u32);

    /// Start producing the artifact for `tag` from the staged inputs.
    ///
    /// Callers must not begin a build while one is in flight; the scheduler's
    /// single-flight rule guarantees this.
    fn begin_build(&mut self, tag: ArtifactTag);

    /// `true` between [`begin_build`](Self::begin_build) and the poll of
    /// [`take_result`](Self::take_result) that yields its outcome.
    fn is_building(&self) -> bool;

    /// Non-blocking completion poll. `None` while the build is still running;
    /// yields exactly once per build.
    fn take_result(&mut self) -> Option<Result<ArtifactData, BuildError>>;
}

/// The library-private worker pool. A single thread: the resource is serial
/// by construction, and a bounded pool keeps planet work from contending with
/// the application's global rayon pool.
fn synth_pool() -> &'static rayon::ThreadPool {
    static POOL: OnceLock<rayon::ThreadPool> = OnceLock::new();
    POOL.get_or_init(|| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .thread_name(|i| format!("planet-synth-{i}"))
            .build()
            .expect("failed to build planet synth thread pool")
    })
}

/// CPU noise-based implementation of [`GenerationResource`].
#[derive(Default)]
pub struct NoiseSynth {
    params: ParameterSnapshot,
    width: u32,
    height: u32,
    pending: Option<SyncCell<mpsc::Receiver<Result<ArtifactData, BuildError>>>>,
}

impl NoiseSynth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl GenerationResource for NoiseSynth {
    fn set_parameter(&mut self, name: &str, value: f32) {
        self.params.insert(name.to_owned(), value);
    }

    fn set_output_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn begin_build(&mut self, tag: ArtifactTag) {
        let params = self.params.clone();
        let (width, height) = (self.width, self.height);
        let (tx, rx) = mpsc::sync_channel(1);
        synth_pool().spawn(move || {
            tx.send(render_artifact(tag, &params, width, height)).ok();
        });
        self.pending = Some(SyncCell::new(rx));
    }

    fn is_building(&self) -> bool {
        self.pending.is_some()
    }

    fn take_result(&mut self) -> Option<Result<ArtifactData, BuildError>> {
        let rx = self.pending.as_mut()?.get();
        match rx.try_recv() {
            Ok(result) => {
                self.pending = None;
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.pending = None;
                Some(Err(BuildError::ResourceFailure(
                    "synth worker disconnected before sending a result".to_owned(),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for(synth: &mut NoiseSynth) -> Result<ArtifactData, BuildError> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = synth.take_result() {
                return result;
            }
            assert!(Instant::now() < deadline, "synth never completed");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn builds_complete_through_polling() {
        let mut synth = NoiseSynth::new();
        synth.set_parameter("$randomseed", 11.0);
        synth.set_parameter("Coverage", 0.6);
        synth.set_output_size(32, 16);
        assert!(!synth.is_building());

        synth.begin_build(ArtifactTag::Clouds);
        assert!(synth.is_building());

        let data = wait_for(&mut synth).unwrap();
        assert_eq!((data.width, data.height), (32, 16));
        assert_eq!(data.pixels.len(), 32 * 16 * 4);
        assert!(!synth.is_building());
        assert!(synth.take_result().is_none(), "result must yield once");
    }

    #[test]
    fn staged_parameters_persist_across_builds() {
        let mut synth = NoiseSynth::new();
        synth.set_parameter("$randomseed", 3.0);
        synth.set_parameter("Coverage", 0.8);
        synth.set_output_size(16, 8);

        synth.begin_build(ArtifactTag::Clouds);
        let first = wait_for(&mut synth).unwrap();

        // Re-fire without restaging; output must be identical.
        synth.begin_build(ArtifactTag::Clouds);
        let second = wait_for(&mut synth).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn renderer_errors_surface_through_the_channel() {
        let mut synth = NoiseSynth::new();
        synth.set_output_size(0, 16);
        synth.begin_build(ArtifactTag::Maps);
        assert!(matches!(
            wait_for(&mut synth),
            Err(BuildError::ZeroResolution { width: 0, height: 16 })
        ));
        assert!(!synth.is_building());
    }
}
