//! Error taxonomy for blueprint resolution, planet creation, and texture builds.
//!
//! Construction-time errors abort the single operation that hit them and are
//! returned to the caller. Build errors travel the same completion channel as
//! successful builds, so requesters handle both outcomes in one place. A
//! completed build whose requester no longer exists is a logged warning, not
//! an error.

use thiserror::Error;

/// Errors raised while resolving a blueprint from the registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlueprintError {
    /// A weighted pick was requested but the total weight of all registered
    /// blueprints is zero.
    #[error("no viable blueprint: total weight of registered blueprints is zero")]
    NoViableBlueprint,

    /// Name lookup found no blueprint.
    #[error("blueprint not found: {name:?}")]
    NotFound { name: String },

    /// Registry integrity check found blueprints sharing a name. Advisory:
    /// the registry stays usable, but name lookup is ambiguous for the
    /// offending entries.
    #[error("duplicate blueprint names: {0:?}")]
    DuplicateNames(Vec<String>),
}

/// Errors raised by planet instantiation and property access.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanetError {
    /// Instantiation aborted; no partial planet is left alive.
    #[error("planet creation failed")]
    CreationFailed(#[from] BlueprintError),

    /// The property key is not part of this planet's schema.
    #[error("no property named {key:?} on this planet")]
    PropertyNotFound { key: String },

    /// The property exists but holds a different value type than the one
    /// supplied (e.g. a color pushed into a float slot).
    #[error("property {key:?} holds a different value kind")]
    WrongPropertyKind { key: String },

    /// A serialized planet document was written by an incompatible schema.
    #[error("unsupported planet state version {found} (this build reads {supported})")]
    StateVersion { found: u32, supported: u32 },
}

/// Errors reported by the texture generation resource.
///
/// Delivered asynchronously through the scheduler's completion path; the
/// scheduler itself never retries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The generation resource reported a failure while producing the
    /// artifact.
    #[error("generation resource failed: {0}")]
    ResourceFailure(String),

    /// The configured output resolution collapsed to zero texels.
    #[error("output resolution is zero ({width}x{height})")]
    ZeroResolution { width: u32, height: u32 },
}
