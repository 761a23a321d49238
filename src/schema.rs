//! Fixed, versioned property schemas per planet kind.
//!
//! The schema is data, not behavior: every planet of a kind declares exactly
//! this property set, in this order, with these randomization ranges, shader
//! parameter names, and artifact invalidation lists. Serialized planet state
//! carries [`SCHEMA_VERSION`] so stale documents are detectable.
//!
//! Keys marked with a generator parameter rebuild one or more textures when
//! they change; the rest feed the surface material directly and dirty nothing.

use crate::artifact::ArtifactTag;
use crate::blueprint::PlanetKind;
use crate::property::{ColorProperty, FloatProperty, MaterialChoiceProperty, PropertySet};

/// Bumped whenever a key is added, removed, or changes meaning.
pub const SCHEMA_VERSION: u32 = 1;

use ArtifactTag::{Biome1, Biome2, Cities, Clouds, Lava, Lookups, Maps, PolarIce, Ring};

/// Artifacts a fresh planet of this kind must build once (the ring artifact
/// joins only when the instance actually carries a ring).
#[must_use]
pub const fn artifacts_for(kind: PlanetKind) -> &'static [ArtifactTag] {
    match kind {
        PlanetKind::Solid => &[
            Maps, Biome1, Biome2, Clouds, Cities, Lava, PolarIce, Lookups,
        ],
        PlanetKind::Gas => &[Maps, Clouds],
    }
}

/// The full property table for one planet kind.
#[must_use]
pub fn properties_for(kind: PlanetKind) -> PropertySet {
    match kind {
        PlanetKind::Solid => solid_properties(),
        PlanetKind::Gas => gas_properties(),
    }
}

fn variants(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_owned()).collect()
}

fn solid_properties() -> PropertySet {
    let mut set = PropertySet::default();

    // Material variant picks.
    set.add_material(
        MaterialChoiceProperty::new(
            "composition",
            "Composition",
            variants(&["Terrestrial", "Arid", "Barren", "Volcanic"]),
        )
        .invalidating(&[Maps]),
    );
    set.add_material(
        MaterialChoiceProperty::new(
            "biome1Type",
            "Biome 1 Type",
            variants(&["Forest", "Desert", "Tundra", "Cratered"]),
        )
        .invalidating(&[Biome1]),
    );
    set.add_material(
        MaterialChoiceProperty::new(
            "biome2Type",
            "Biome 2 Type",
            variants(&["Forest", "Desert", "Tundra", "Cratered"]),
        )
        .invalidating(&[Biome2]),
    );
    set.add_material(
        MaterialChoiceProperty::new("clouds", "Clouds", variants(&["Wispy", "Banded", "Stormy"]))
            .invalidating(&[Clouds]),
    );
    set.add_material(
        MaterialChoiceProperty::new("polarIce", "Polar Ice", variants(&["Smooth", "Cracked"]))
            .invalidating(&[PolarIce]),
    );
    set.add_material(
        MaterialChoiceProperty::new("lava", "Lava", variants(&["Flowing", "Crusted"]))
            .invalidating(&[Lava]),
    );
    set.add_material(
        MaterialChoiceProperty::new("cities", "Cities", variants(&["Sparse", "Sprawling"]))
            .invalidating(&[Cities]),
    );

    // Continent and composition control map.
    set.add_float(
        FloatProperty::direct("continentSeed", "Continent Seed", 0.0, 255.0)
            .integer()
            .shader("MapHeight_Random_Seed")
            .invalidating(&[Maps]),
    );
    set.add_float(
        FloatProperty::knob("continentComplexity", "Continent Complexity", 0.0, 20.0)
            .shader("MapHeight_Warp")
            .invalidating(&[Maps]),
    );
    set.add_float(
        FloatProperty::direct("compositionSeed", "Composition Seed", 0.0, 255.0)
            .integer()
            .shader("MapBiome_Random_Seed")
            .invalidating(&[Maps]),
    );
    set.add_float(
        FloatProperty::knob("compositionChaos", "Composition Chaos", 1.0, 10.0)
            .shader("MapBiome_Warp")
            .invalidating(&[Maps]),
    );
    set.add_float(
        FloatProperty::knob("compositionBalance", "Composition Balance", 0.0, 1.0)
            .shader("MapBiome_Balance")
            .invalidating(&[Maps]),
    );
    set.add_float(
        FloatProperty::knob("compositionContrast", "Composition Contrast", 0.0, 1.0)
            .shader("MapBiome_Contrast")
            .invalidating(&[Maps]),
    );

    // Liquid, polar and lava coverage feed the CPU lookup ramps.
    set.add_float(
        FloatProperty::knob("liquidLevel", "Liquid Level", 0.0, 1.0)
            .shader("Liquid_Level")
            .invalidating(&[Lookups]),
    );
    set.add_float(
        FloatProperty::knob("liquidShallow", "Shallow Distance", 0.0, 1.0)
            .shader("Liquid_Shallow")
            .invalidating(&[Lookups]),
    );
    set.add_float(
        FloatProperty::knob("polarCapAmount", "Polar Caps", 1.0, 0.2)
            .shader("Polar_Amount")
            .invalidating(&[Lookups]),
    );
    set.add_float(
        FloatProperty::knob("lavaAmount", "Lava Amount", 0.0, 1.0)
            .shader("Lava_Amount")
            .invalidating(&[Lookups]),
    );
    set.add_float(
        FloatProperty::knob("lavaGlowAmount", "Glow Amount", 0.0, 0.05)
            .shader("Lava_Glow")
            .invalidating(&[Lookups]),
    );
    set.add_float(
        FloatProperty::knob("lavaComplexity", "Lava Complexity", 10.0, 20.0)
            .shader("MapLava_Warp")
            .invalidating(&[Maps]),
    );
    set.add_float(
        FloatProperty::direct("lavaSeed", "Lava Seed", 0.0, 255.0)
            .integer()
            .shader("$randomseed")
            .invalidating(&[Lava]),
    );
    set.add_float(
        FloatProperty::knob("lavaColorVariation", "Color Variation", 0.48, 0.6)
            .shader("Lava_Hue")
            .invalidating(&[Lava]),
    );

    // Polar caps.
    set.add_float(
        FloatProperty::direct("polarIceSeed", "Polar Seed", 0.0, 255.0)
            .integer()
            .shader("$randomseed")
            .invalidating(&[PolarIce]),
    );
    set.add_float(
        FloatProperty::knob("polarCapCracks", "Crack Density", 0.0, 1.0)
            .shader("Cracks")
            .invalidating(&[PolarIce]),
    );

    // Cloud layer.
    set.add_float(
        FloatProperty::direct("cloudsSeed", "Clouds Seed", 0.0, 255.0)
            .integer()
            .shader("$randomseed")
            .invalidating(&[Clouds]),
    );
    set.add_float(
        FloatProperty::knob("cloudsCoverage", "Clouds Coverage", 1.0, 0.2)
            .shader("Coverage")
            .invalidating(&[Clouds]),
    );
    set.add_float(
        FloatProperty::knob("cloudsSharpness", "Clouds Sharpness", 0.0, 1.0)
            .shader("Sharpness")
            .invalidating(&[Clouds]),
    );
    set.add_float(
        FloatProperty::knob("cloudsRoughness", "Clouds Roughness", 0.0, 1.0)
            .shader("Roughness")
            .invalidating(&[Clouds]),
    );
    set.add_float(
        FloatProperty::knob("cloudsLayer1", "Clouds Layer 1", 0.0, 1.0)
            .shader("Layer1_Opacity")
            .invalidating(&[Clouds]),
    );
    set.add_float(
        FloatProperty::knob("cloudsLayer2", "Clouds Layer 2", 0.0, 1.0)
            .shader("Layer2_Opacity")
            .invalidating(&[Clouds]),
    );

    // Biome surfaces. Alienization spans both biome textures — the canonical
    // multi-artifact invalidation.
    set.add_float(
        FloatProperty::knob("alienization", "Alienization", 0.0, 1.0)
            .shader("Biome_Alienization")
            .invalidating(&[Biome1, Biome2]),
    );
    set.add_float(
        FloatProperty::direct("biome1Seed", "Biome 1 Seed", 0.0, 255.0)
            .integer()
            .shader("$randomseed")
            .invalidating(&[Biome1]),
    );
    set.add_float(
        FloatProperty::knob("biome1Chaos", "Chaos", 0.0, 10.0)
            .shader("Biome_Coverage_Warp")
            .invalidating(&[Biome1]),
    );
    set.add_float(
        FloatProperty::knob("biome1Balance", "Balance", 0.0, 1.0)
            .shader("Biome_Coverage_Balance")
            .invalidating(&[Biome1]),
    );
    set.add_float(
        FloatProperty::knob("biome1ColorVariation", "Color Variation", 0.0, 1.0)
            .shader("Biome_Hue")
            .invalidating(&[Biome1]),
    );
    set.add_float(
        FloatProperty::knob("biome1Brightness", "Brightness", 0.3, 0.7)
            .shader("Biome_Brightness")
            .invalidating(&[Biome1]),
    );
    set.add_float(
        FloatProperty::direct("biome2Seed", "Biome 2 Seed", 0.0, 255.0)
            .integer()
            .shader("$randomseed")
            .invalidating(&[Biome2]),
    );
    set.add_float(
        FloatProperty::knob("biome2Chaos", "Chaos", 0.0, 10.0)
            .shader("Biome_Coverage_Warp")
            .invalidating(&[Biome2]),
    );
    set.add_float(
        FloatProperty::knob("biome2ColorVariation", "Color Variation", 0.0, 1.0)
            .shader("Biome_Hue")
            .invalidating(&[Biome2]),
    );

    // City lights.
    set.add_float(
        FloatProperty::direct("citiesSeed", "Random Seed", 0.0, 255.0)
            .integer()
            .shader("$randomseed")
            .invalidating(&[Cities]),
    );
    set.add_float(
        FloatProperty::knob("citiesPopulation", "Population", 0.0, 0.25)
            .shader("Population")
            .invalidating(&[Cities]),
    );
    set.add_float(
        FloatProperty::knob("citiesAdvancement", "Advancement", 0.0, 1.0)
            .shader("Advancement")
            .invalidating(&[Cities]),
    );
    set.add_float(
        FloatProperty::knob("citiesGlow", "Glow", 0.0, 1.0)
            .shader("Glow")
            .invalidating(&[Cities]),
    );

    // Material-facing parameters: no texture rebuilds, shader binding only.
    set.add_color(ColorProperty::new(
        "liquidColor",
        "Liquid Color",
        [0.0, 0.0, 0.3],
        0.02,
        0.3,
        0.3,
    ));
    set.add_color(ColorProperty::new("iceColor", "Ice Color", [1.0, 1.0, 1.0], 0.1, 0.1, 0.1));
    set.add_color(ColorProperty::new(
        "atmosphereColor",
        "Atmosphere Color",
        [0.2, 0.75, 1.0],
        0.2,
        0.2,
        0.2,
    ));
    set.add_color(ColorProperty::new(
        "twilightColor",
        "Twilight Color",
        [0.25, 0.2, 0.05],
        0.05,
        0.2,
        0.2,
    ));
    set.add_color(ColorProperty::new(
        "cloudsColor",
        "Clouds Color",
        [1.0, 1.0, 1.0],
        0.1,
        0.1,
        0.1,
    ));
    set.add_color(ColorProperty::new(
        "lavaGlowColor",
        "Glow Color",
        [1.0, 0.4, 0.0],
        0.2,
        0.2,
        0.4,
    ));
    set.add_color(ColorProperty::new(
        "citiesColor",
        "Night Light Color",
        [1.0, 1.0, 0.95],
        0.05,
        0.05,
        0.05,
    ));

    set
}

fn gas_properties() -> PropertySet {
    let mut set = PropertySet::default();

    set.add_material(
        MaterialChoiceProperty::new(
            "palette",
            "Palette",
            variants(&["Jovian", "Methane", "Sulfur"]),
        )
        .invalidating(&[Maps]),
    );

    set.add_float(
        FloatProperty::direct("gasSeed", "Gas Seed", 0.0, 255.0)
            .integer()
            .shader("$randomseed")
            .invalidating(&[Maps]),
    );
    set.add_float(
        FloatProperty::knob("banding", "Banding", 2.0, 14.0)
            .shader("Banding")
            .invalidating(&[Maps]),
    );
    set.add_float(
        FloatProperty::knob("turbulence", "Turbulence", 0.0, 12.0)
            .shader("Turbulence")
            .invalidating(&[Maps]),
    );
    set.add_float(
        FloatProperty::knob("storms", "Storms", 0.0, 1.0)
            .shader("Storms")
            .invalidating(&[Maps]),
    );
    set.add_float(
        FloatProperty::direct("cloudsSeed", "Clouds Seed", 0.0, 255.0)
            .integer()
            .shader("$randomseed")
            .invalidating(&[Clouds]),
    );
    set.add_float(
        FloatProperty::knob("cloudsCoverage", "Clouds Coverage", 1.0, 0.2)
            .shader("Coverage")
            .invalidating(&[Clouds]),
    );
    set.add_float(
        FloatProperty::knob("cloudsSharpness", "Clouds Sharpness", 0.0, 1.0)
            .shader("Sharpness")
            .invalidating(&[Clouds]),
    );

    set.add_color(ColorProperty::new(
        "atmosphereColor",
        "Atmosphere Color",
        [0.8, 0.7, 0.5],
        0.3,
        0.3,
        0.2,
    ));
    set.add_color(ColorProperty::new(
        "twilightColor",
        "Twilight Color",
        [0.3, 0.15, 0.05],
        0.1,
        0.2,
        0.2,
    ));

    set
}

/// Property table for a planetary ring instance.
#[must_use]
pub fn ring_properties() -> PropertySet {
    let mut set = PropertySet::default();
    set.add_float(
        FloatProperty::direct("ringSeed", "Ring Seed", 0.0, 255.0)
            .integer()
            .shader("$randomseed")
            .invalidating(&[Ring]),
    );
    set.add_float(
        FloatProperty::knob("ringDensity", "Density", 0.2, 1.0)
            .shader("Density")
            .invalidating(&[Ring]),
    );
    set.add_float(
        FloatProperty::knob("ringGap", "Gap Width", 0.0, 0.5)
            .shader("Gap_Width")
            .invalidating(&[Ring]),
    );
    set.add_color(ColorProperty::new(
        "ringColor",
        "Ring Color",
        [0.8, 0.75, 0.65],
        0.05,
        0.15,
        0.2,
    ));
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_generator_parameter_invalidates_something() {
        // A declared generator parameter with an empty dirty set would never
        // reach a build.
        for kind in [PlanetKind::Solid, PlanetKind::Gas] {
            for p in properties_for(kind).floats() {
                assert!(
                    p.shader_param.is_none() || !p.invalidates.is_empty(),
                    "{} declares a generator param but dirties nothing",
                    p.key
                );
            }
        }
    }

    #[test]
    fn solid_schema_covers_all_solid_artifacts() {
        let set = properties_for(PlanetKind::Solid);
        for tag in artifacts_for(PlanetKind::Solid) {
            let covered = set.floats().any(|p| p.invalidates.contains(tag))
                || set.materials().any(|p| p.invalidates.contains(tag));
            assert!(covered, "no property invalidates {tag}");
        }
    }

    #[test]
    fn schemas_are_reproducible() {
        // The table is static data: building it twice yields identical sets.
        assert_eq!(properties_for(PlanetKind::Solid), properties_for(PlanetKind::Solid));
        assert_eq!(properties_for(PlanetKind::Gas), properties_for(PlanetKind::Gas));
        assert_eq!(ring_properties(), ring_properties());
    }

    #[test]
    fn alienization_spans_both_biomes() {
        let set = properties_for(PlanetKind::Solid);
        let p = set.float("alienization").unwrap();
        assert_eq!(p.invalidates, &[ArtifactTag::Biome1, ArtifactTag::Biome2]);
    }
}
