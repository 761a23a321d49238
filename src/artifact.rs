//! Artifact tags and raw build payloads.
//!
//! An *artifact* is one named generated output — a texture slot on the planet
//! material. Properties declare statically which artifacts they invalidate;
//! the scheduler rebuilds exactly those. Tags form a closed set rather than
//! free-form strings so the dispatch from tag to renderer is a total `match`.

use serde::{Deserialize, Serialize};

/// Logical texture slot produced by a build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArtifactTag {
    /// Combined height + composition control map.
    Maps,
    /// Primary biome surface (diffuse + detail).
    Biome1,
    /// Secondary biome surface.
    Biome2,
    /// Cloud layer coverage.
    Clouds,
    /// Night-side city lights.
    Cities,
    /// Lava flow surface.
    Lava,
    /// Polar ice caps.
    PolarIce,
    /// CPU-side shader lookup ramps (liquid level, polar transition, lava
    /// glow). Cheap, but rebuilt through the same queue as everything else so
    /// single-flight stays the only scheduling rule.
    Lookups,
    /// Planetary ring band.
    Ring,
}

impl ArtifactTag {
    /// Every tag, in the order a fresh planet builds them.
    pub const ALL: [ArtifactTag; 9] = [
        ArtifactTag::Maps,
        ArtifactTag::Biome1,
        ArtifactTag::Biome2,
        ArtifactTag::Clouds,
        ArtifactTag::Cities,
        ArtifactTag::Lava,
        ArtifactTag::PolarIce,
        ArtifactTag::Lookups,
        ArtifactTag::Ring,
    ];

    /// The material slot name handed to the render boundary.
    #[must_use]
    pub const fn slot_name(self) -> &'static str {
        match self {
            ArtifactTag::Maps => "Maps",
            ArtifactTag::Biome1 => "Biome1",
            ArtifactTag::Biome2 => "Biome2",
            ArtifactTag::Clouds => "Clouds",
            ArtifactTag::Cities => "Cities",
            ArtifactTag::Lava => "Lava",
            ArtifactTag::PolarIce => "PolarIce",
            ArtifactTag::Lookups => "Lookups",
            ArtifactTag::Ring => "Ring",
        }
    }

    /// Whether the uploaded image should carry a mipmap chain.
    ///
    /// The control map and the lookup ramps are sampled point-exact by the
    /// shader and must not be averaged across levels.
    #[must_use]
    pub const fn has_mipmaps(self) -> bool {
        !matches!(self, ArtifactTag::Maps | ArtifactTag::Lookups)
    }

    /// Whether the payload is linear data (`true`) or sRGB color (`false`).
    #[must_use]
    pub const fn is_linear(self) -> bool {
        // Clouds and cities are straight color; everything else is data or
        // gets color-graded in the shader.
        !matches!(self, ArtifactTag::Clouds | ArtifactTag::Cities)
    }
}

impl std::fmt::Display for ArtifactTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slot_name())
    }
}

/// Raw RGBA8 pixels produced by the generation resource, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ArtifactData {
    /// Allocate a zeroed buffer of `width x height` RGBA8 texels.
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_sampled_slots_skip_mipmaps() {
        assert!(!ArtifactTag::Maps.has_mipmaps());
        assert!(!ArtifactTag::Lookups.has_mipmaps());
        assert!(ArtifactTag::Biome1.has_mipmaps());
        assert!(ArtifactTag::Clouds.has_mipmaps());
    }

    #[test]
    fn slot_names_are_unique() {
        let mut names: Vec<_> = ArtifactTag::ALL.iter().map(|t| t.slot_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ArtifactTag::ALL.len());
    }
}
