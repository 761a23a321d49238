//! Typed, named planet parameters: seeded defaults with designer overrides.
//!
//! Three property kinds share one contract: a randomized default derived from
//! `(seed, key)`, an optional explicit override, and a static list of artifact
//! tags the property invalidates when it changes. The `invalidates` set is
//! fixed at declaration time, never computed — that is what lets the build
//! scheduler know in O(1) which textures a single change dirties.
//!
//! # Float storage semantics
//! A float property resolves for the generator in one of two fixed ways:
//! - [`ResolveMethod::Lerp`]: the stored value is a normalized 0..1 control
//!   knob; the resolved magnitude is `lerp(min_value, max_value, value)`.
//!   The mapping range may be reversed (e.g. polar caps map 1.0 → 0.2).
//! - [`ResolveMethod::Value`]: the stored value *is* the magnitude (e.g. a
//!   generator seed in 0..255); integer-flagged properties round before use.
//!
//! The method is part of each key's declaration, never combined freely at
//! runtime: two properties storing the same number can legitimately resolve
//! to different magnitudes.

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactTag;
use crate::error::PlanetError;
use crate::rng::{seeded_float, seeded_index};

/// How a float property turns its stored value into the magnitude handed to
/// the generation resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveMethod {
    /// Stored value is the real magnitude.
    Value,
    /// Stored value is a normalized knob over `[min_value, max_value]`.
    Lerp,
}

/// An inclusive sub-range a blueprint may constrain randomization to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// A value accepted by the generic override entry points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyValue {
    Float(f32),
    Color([f32; 3]),
    Material(usize),
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// --- FloatProperty ----------------------------------------------------------

/// A single named float parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatProperty {
    pub key: &'static str,
    pub label: &'static str,
    pub value: f32,
    /// Resolution mapping range (Lerp) or declared storage range (Value).
    pub min_value: f32,
    pub max_value: f32,
    /// Current randomization sub-range; starts as the declared default and is
    /// narrowed by the blueprint.
    random_range: Range,
    /// Interpretation only — storage stays floating point.
    pub clamp01: bool,
    /// Discrete parameter: randomize draws whole numbers and `resolved`
    /// rounds before downstream use.
    pub display_as_integer: bool,
    pub overridden: bool,
    pub method: ResolveMethod,
    /// Parameter name on the generation resource, if this float feeds one.
    pub shader_param: Option<&'static str>,
    pub invalidates: &'static [ArtifactTag],
}

impl FloatProperty {
    /// Declare a normalized-knob property mapping onto `min..max`.
    pub fn knob(key: &'static str, label: &'static str, min: f32, max: f32) -> Self {
        Self {
            key,
            label,
            value: 0.0,
            min_value: min,
            max_value: max,
            random_range: Range::new(0.0, 1.0),
            clamp01: true,
            display_as_integer: false,
            overridden: false,
            method: ResolveMethod::Lerp,
            shader_param: None,
            invalidates: &[],
        }
    }

    /// Declare a direct-magnitude property stored in `min..max`.
    pub fn direct(key: &'static str, label: &'static str, min: f32, max: f32) -> Self {
        Self {
            key,
            label,
            value: min,
            min_value: min,
            max_value: max,
            random_range: Range::new(min, max),
            clamp01: false,
            display_as_integer: false,
            overridden: false,
            method: ResolveMethod::Value,
            shader_param: None,
            invalidates: &[],
        }
    }

    pub fn integer(mut self) -> Self {
        self.display_as_integer = true;
        self
    }

    pub fn shader(mut self, param: &'static str) -> Self {
        self.shader_param = Some(param);
        self
    }

    pub fn invalidating(mut self, tags: &'static [ArtifactTag]) -> Self {
        self.invalidates = tags;
        self
    }

    /// Recompute `value` from `(seed, key)`. Never touches `overridden`.
    pub fn randomize(&mut self, seed: u32) {
        let Range { min, max } = self.random_range;
        self.value = if self.display_as_integer {
            let count = (max - min).round() as i64 + 1;
            debug_assert!(count > 0, "degenerate integer range on {}", self.key);
            min.round() + seeded_index(seed, self.key, count as usize) as f32
        } else {
            lerp(min, max, seeded_float(seed, self.key))
        };
    }

    /// Narrow the randomization range to a blueprint-authored sub-range.
    pub fn apply_blueprint_range(&mut self, range: Range) {
        self.random_range = range;
    }

    /// Install an explicit value; returns the artifacts this dirties.
    pub fn set_override(&mut self, value: f32) -> &'static [ArtifactTag] {
        self.value = if self.clamp01 { value.clamp(0.0, 1.0) } else { value };
        self.overridden = true;
        self.invalidates
    }

    /// Drop the override and re-derive from the seed; returns the artifacts
    /// this dirties.
    pub fn clear_override(&mut self, seed: u32) -> &'static [ArtifactTag] {
        self.randomize(seed);
        self.overridden = false;
        self.invalidates
    }

    /// The magnitude handed to the generation resource or material.
    #[must_use]
    pub fn resolved(&self) -> f32 {
        match self.method {
            ResolveMethod::Lerp => lerp(self.min_value, self.max_value, self.value.clamp(0.0, 1.0)),
            ResolveMethod::Value => {
                if self.display_as_integer {
                    self.value.round()
                } else {
                    self.value
                }
            }
        }
    }
}

// --- ColorProperty ----------------------------------------------------------

/// A named color parameter: a base color jittered per-channel in HSV space.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorProperty {
    pub key: &'static str,
    pub label: &'static str,
    pub value: [f32; 3],
    pub base: [f32; 3],
    pub hue_range: f32,
    pub saturation_range: f32,
    pub brightness_range: f32,
    pub overridden: bool,
    pub shader_param: Option<&'static str>,
    pub invalidates: &'static [ArtifactTag],
}

impl ColorProperty {
    pub fn new(
        key: &'static str,
        label: &'static str,
        base: [f32; 3],
        hue_range: f32,
        saturation_range: f32,
        brightness_range: f32,
    ) -> Self {
        Self {
            key,
            label,
            value: base,
            base,
            hue_range,
            saturation_range,
            brightness_range,
            overridden: false,
            shader_param: None,
            invalidates: &[],
        }
    }

    pub fn shader(mut self, param: &'static str) -> Self {
        self.shader_param = Some(param);
        self
    }

    pub fn invalidating(mut self, tags: &'static [ArtifactTag]) -> Self {
        self.invalidates = tags;
        self
    }

    /// Jitter each HSV channel independently with its own derived draw, so a
    /// wider hue range never shifts the saturation or brightness draws.
    pub fn randomize(&mut self, seed: u32) {
        let [h, s, v] = rgb_to_hsv(self.base);
        let jitter = |suffix: &str, range: f32| {
            let child = format!("{}.{suffix}", self.key);
            (seeded_float(seed, &child) - 0.5) * 2.0 * range
        };
        let h = (h + jitter("hue", self.hue_range)).rem_euclid(1.0);
        let s = (s + jitter("saturation", self.saturation_range)).clamp(0.0, 1.0);
        let v = (v + jitter("brightness", self.brightness_range)).clamp(0.0, 1.0);
        self.value = hsv_to_rgb([h, s, v]);
    }

    pub fn set_override(&mut self, value: [f32; 3]) -> &'static [ArtifactTag] {
        self.value = value.map(|c| c.clamp(0.0, 1.0));
        self.overridden = true;
        self.invalidates
    }

    pub fn clear_override(&mut self, seed: u32) -> &'static [ArtifactTag] {
        self.randomize(seed);
        self.overridden = false;
        self.invalidates
    }
}

/// RGB [0,1] to HSV with hue in [0,1).
fn rgb_to_hsv([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let h = if delta < f32::EPSILON {
        0.0
    } else if (max - r).abs() < f32::EPSILON {
        (((g - b) / delta).rem_euclid(6.0)) / 6.0
    } else if (max - g).abs() < f32::EPSILON {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let s = if max < f32::EPSILON { 0.0 } else { delta / max };
    [h, s, max]
}

/// HSV with hue in [0,1) back to RGB [0,1].
fn hsv_to_rgb([h, s, v]: [f32; 3]) -> [f32; 3] {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let c = v * s;
    let x = c * (1.0 - (h6.rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h6 as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

// --- MaterialChoiceProperty -------------------------------------------------

/// A named pick among registered material variants (biome styles, cloud
/// styles, ...). The stored value is an index into `options`.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialChoiceProperty {
    pub key: &'static str,
    pub label: &'static str,
    pub index: usize,
    pub options: Vec<String>,
    pub overridden: bool,
    pub invalidates: &'static [ArtifactTag],
}

impl MaterialChoiceProperty {
    pub fn new(key: &'static str, label: &'static str, options: Vec<String>) -> Self {
        debug_assert!(!options.is_empty(), "material choice {key} needs options");
        Self {
            key,
            label,
            index: 0,
            options,
            overridden: false,
            invalidates: &[],
        }
    }

    pub fn invalidating(mut self, tags: &'static [ArtifactTag]) -> Self {
        self.invalidates = tags;
        self
    }

    pub fn randomize(&mut self, seed: u32) {
        self.index = seeded_index(seed, self.key, self.options.len());
    }

    pub fn set_override(&mut self, index: usize) -> &'static [ArtifactTag] {
        self.index = index.min(self.options.len() - 1);
        self.overridden = true;
        self.invalidates
    }

    pub fn clear_override(&mut self, seed: u32) -> &'static [ArtifactTag] {
        self.randomize(seed);
        self.overridden = false;
        self.invalidates
    }

    /// Name of the currently selected variant.
    #[must_use]
    pub fn selected(&self) -> &str {
        &self.options[self.index]
    }
}

// --- PropertySet ------------------------------------------------------------

/// One planet's full property map, keyed by schema key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertySet {
    floats: std::collections::BTreeMap<&'static str, FloatProperty>,
    colors: std::collections::BTreeMap<&'static str, ColorProperty>,
    materials: std::collections::BTreeMap<&'static str, MaterialChoiceProperty>,
}

impl PropertySet {
    pub fn add_float(&mut self, p: FloatProperty) {
        debug_assert!(!self.floats.contains_key(p.key), "duplicate key {}", p.key);
        self.floats.insert(p.key, p);
    }

    pub fn add_color(&mut self, p: ColorProperty) {
        debug_assert!(!self.colors.contains_key(p.key), "duplicate key {}", p.key);
        self.colors.insert(p.key, p);
    }

    pub fn add_material(&mut self, p: MaterialChoiceProperty) {
        debug_assert!(!self.materials.contains_key(p.key), "duplicate key {}", p.key);
        self.materials.insert(p.key, p);
    }

    pub fn float(&self, key: &str) -> Option<&FloatProperty> {
        self.floats.get(key)
    }

    pub fn color(&self, key: &str) -> Option<&ColorProperty> {
        self.colors.get(key)
    }

    pub fn material(&self, key: &str) -> Option<&MaterialChoiceProperty> {
        self.materials.get(key)
    }

    pub fn floats(&self) -> impl Iterator<Item = &FloatProperty> {
        self.floats.values()
    }

    pub fn colors(&self) -> impl Iterator<Item = &ColorProperty> {
        self.colors.values()
    }

    pub fn materials(&self) -> impl Iterator<Item = &MaterialChoiceProperty> {
        self.materials.values()
    }

    pub fn floats_mut(&mut self) -> impl Iterator<Item = &mut FloatProperty> {
        self.floats.values_mut()
    }

    pub fn colors_mut(&mut self) -> impl Iterator<Item = &mut ColorProperty> {
        self.colors.values_mut()
    }

    pub fn materials_mut(&mut self) -> impl Iterator<Item = &mut MaterialChoiceProperty> {
        self.materials.values_mut()
    }

    /// Re-derive every non-overridden property from the seed.
    pub fn randomize_unlocked(&mut self, seed: u32) {
        for p in self.floats.values_mut().filter(|p| !p.overridden) {
            p.randomize(seed);
        }
        for p in self.colors.values_mut().filter(|p| !p.overridden) {
            p.randomize(seed);
        }
        for p in self.materials.values_mut().filter(|p| !p.overridden) {
            p.randomize(seed);
        }
    }

    /// Install an explicit value on one key; returns the artifacts dirtied.
    pub fn set_override(
        &mut self,
        key: &str,
        value: PropertyValue,
    ) -> Result<&'static [ArtifactTag], PlanetError> {
        match value {
            PropertyValue::Float(v) => match self.floats.get_mut(key) {
                Some(p) => Ok(p.set_override(v)),
                None => Err(self.wrong_kind_or_missing(key)),
            },
            PropertyValue::Color(v) => match self.colors.get_mut(key) {
                Some(p) => Ok(p.set_override(v)),
                None => Err(self.wrong_kind_or_missing(key)),
            },
            PropertyValue::Material(v) => match self.materials.get_mut(key) {
                Some(p) => Ok(p.set_override(v)),
                None => Err(self.wrong_kind_or_missing(key)),
            },
        }
    }

    /// Drop an override on one key, re-deriving from `seed`; returns the
    /// artifacts dirtied.
    pub fn clear_override(
        &mut self,
        key: &str,
        seed: u32,
    ) -> Result<&'static [ArtifactTag], PlanetError> {
        if let Some(p) = self.floats.get_mut(key) {
            Ok(p.clear_override(seed))
        } else if let Some(p) = self.colors.get_mut(key) {
            Ok(p.clear_override(seed))
        } else if let Some(p) = self.materials.get_mut(key) {
            Ok(p.clear_override(seed))
        } else {
            Err(PlanetError::PropertyNotFound { key: key.to_owned() })
        }
    }

    fn wrong_kind_or_missing(&self, key: &str) -> PlanetError {
        let exists = self.floats.contains_key(key)
            || self.colors.contains_key(key)
            || self.materials.contains_key(key);
        if exists {
            PlanetError::WrongPropertyKind { key: key.to_owned() }
        } else {
            PlanetError::PropertyNotFound { key: key.to_owned() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage() -> FloatProperty {
        FloatProperty::knob("cloudsCoverage", "Clouds Coverage", 1.0, 0.2)
            .shader("Coverage")
            .invalidating(&[ArtifactTag::Clouds])
    }

    #[test]
    fn randomize_is_deterministic_per_seed_and_key() {
        let mut a = coverage();
        let mut b = coverage();
        a.randomize(77);
        b.randomize(77);
        assert_eq!(a.value, b.value);
        b.randomize(78);
        assert_ne!(a.value, b.value);
    }

    #[test]
    fn knob_resolves_through_reversed_mapping_range() {
        let mut p = coverage();
        p.set_override(0.0);
        assert_eq!(p.resolved(), 1.0);
        p.set_override(1.0);
        assert!((p.resolved() - 0.2).abs() < 1e-6);
        // Same stored number on a Value property resolves differently.
        let mut seedy = FloatProperty::direct("cloudsSeed", "Clouds Seed", 0.0, 255.0).integer();
        seedy.set_override(1.0);
        assert_eq!(seedy.resolved(), 1.0);
    }

    #[test]
    fn integer_property_draws_whole_numbers() {
        let mut p = FloatProperty::direct("continentSeed", "Continent Seed", 0.0, 255.0).integer();
        for seed in 0..32 {
            p.randomize(seed);
            assert_eq!(p.value, p.value.round());
            assert!((0.0..=255.0).contains(&p.value));
        }
    }

    #[test]
    fn blueprint_range_narrows_randomization_only() {
        let mut p = coverage();
        p.apply_blueprint_range(Range::new(0.4, 0.6));
        for seed in 0..32 {
            p.randomize(seed);
            assert!((0.4..=0.6).contains(&p.value), "value {} escaped", p.value);
        }
        // The resolution mapping range is untouched.
        assert_eq!(p.min_value, 1.0);
        assert_eq!(p.max_value, 0.2);
    }

    #[test]
    fn override_survives_randomize_unlocked() {
        let mut set = PropertySet::default();
        set.add_float(coverage());
        set.add_float(
            FloatProperty::knob("cloudsSharpness", "Clouds Sharpness", 0.0, 1.0)
                .invalidating(&[ArtifactTag::Clouds]),
        );
        let tags = set
            .set_override("cloudsCoverage", PropertyValue::Float(0.25))
            .unwrap();
        assert_eq!(tags, &[ArtifactTag::Clouds]);
        set.randomize_unlocked(5);
        assert_eq!(set.float("cloudsCoverage").unwrap().value, 0.25);
        assert!(set.float("cloudsCoverage").unwrap().overridden);
        assert!(!set.float("cloudsSharpness").unwrap().overridden);
    }

    #[test]
    fn clear_override_rederives_from_current_seed() {
        let mut p = coverage();
        p.randomize(9);
        let fresh = p.value;
        p.set_override(0.99);
        let tags = p.clear_override(9);
        assert_eq!(tags, &[ArtifactTag::Clouds]);
        assert_eq!(p.value, fresh);
        assert!(!p.overridden);
    }

    #[test]
    fn color_jitter_stays_in_gamut_and_is_deterministic() {
        let mut a = ColorProperty::new(
            "atmosphereColor",
            "Atmosphere Color",
            [0.2, 0.75, 1.0],
            0.2,
            0.2,
            0.2,
        );
        let mut b = a.clone();
        a.randomize(3);
        b.randomize(3);
        assert_eq!(a.value, b.value);
        for c in a.value {
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn hsv_round_trips_primaries() {
        for rgb in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.25, 0.5, 0.75]] {
            let back = hsv_to_rgb(rgb_to_hsv(rgb));
            for (x, y) in rgb.iter().zip(back.iter()) {
                assert!((x - y).abs() < 1e-5, "{rgb:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn material_choice_picks_within_options() {
        let mut p = MaterialChoiceProperty::new(
            "composition",
            "Composition",
            vec!["Terrestrial".into(), "Arid".into(), "Barren".into()],
        );
        for seed in 0..32 {
            p.randomize(seed);
            assert!(p.index < 3);
        }
        p.set_override(99);
        assert_eq!(p.index, 2); // clamped to the last option
    }

    #[test]
    fn unknown_and_wrong_kind_overrides_are_typed_errors() {
        let mut set = PropertySet::default();
        set.add_float(coverage());
        assert!(matches!(
            set.set_override("nope", PropertyValue::Float(0.5)),
            Err(PlanetError::PropertyNotFound { .. })
        ));
        assert!(matches!(
            set.set_override("cloudsCoverage", PropertyValue::Color([1.0, 0.0, 0.0])),
            Err(PlanetError::WrongPropertyKind { .. })
        ));
    }
}
