//! CPU renderers for every artifact slot.
//!
//! Each renderer consumes a parameter snapshot — the generator-facing
//! key/value pairs captured when a build leaves the queue — and produces raw
//! RGBA8 [`ArtifactData`]. Planet-wrapping maps sample through
//! [`CylindricalNoise`] so the equirectangular seam closes; detail surfaces
//! (biomes, lava, ice) tile in both directions through [`ToroidalNoise`].
//!
//! Renderers are pure functions of `(snapshot, width, height)`: the same
//! inputs always produce the same texels, which is what makes a planet
//! reproducible from its seed alone.

use std::collections::BTreeMap;

use noise::{Fbm, MultiFractal, NoiseFn, Perlin, RidgedMulti};

use crate::artifact::{ArtifactData, ArtifactTag};
use crate::error::BuildError;
use crate::tiling::{CylindricalNoise, ToroidalNoise, normalize};

/// Generator parameters captured at enqueue time, keyed by parameter name.
pub type ParameterSnapshot = BTreeMap<String, f32>;

/// Render the artifact for `tag` from a parameter snapshot.
///
/// Missing parameters fall back to neutral defaults rather than failing: a
/// snapshot is always taken from a schema-complete property set, so absence
/// only happens in hand-built test snapshots.
pub fn render_artifact(
    tag: ArtifactTag,
    params: &ParameterSnapshot,
    width: u32,
    height: u32,
) -> Result<ArtifactData, BuildError> {
    if width == 0 || height == 0 {
        return Err(BuildError::ZeroResolution { width, height });
    }
    let out = match tag {
        ArtifactTag::Maps => {
            if params.contains_key("Banding") {
                render_gas_maps(params, width, height)
            } else {
                render_solid_maps(params, width, height)
            }
        }
        ArtifactTag::Biome1 | ArtifactTag::Biome2 => render_biome(params, width, height),
        ArtifactTag::Clouds => render_clouds(params, width, height),
        ArtifactTag::Cities => render_cities(params, width, height),
        ArtifactTag::Lava => render_lava(params, width, height),
        ArtifactTag::PolarIce => render_polar_ice(params, width, height),
        ArtifactTag::Lookups => render_lookups(params, width, height),
        ArtifactTag::Ring => render_ring(params, width, height),
    };
    Ok(out)
}

fn param(params: &ParameterSnapshot, name: &str, default: f32) -> f32 {
    params.get(name).copied().unwrap_or(default)
}

fn seed_param(params: &ParameterSnapshot, name: &str) -> u32 {
    param(params, name, 0.0).max(0.0) as u32
}

/// Solid-planet control map. R = terrain height, G = composition (biome 1 vs
/// biome 2 blend mask), B = lava flow mask, A opaque. Consumed as data by the
/// surface shader, never displayed directly.
fn render_solid_maps(params: &ParameterSnapshot, width: u32, height: u32) -> ArtifactData {
    let height_seed = seed_param(params, "MapHeight_Random_Seed");
    let biome_seed = seed_param(params, "MapBiome_Random_Seed");
    let height_warp = param(params, "MapHeight_Warp", 8.0) as f64;
    let biome_warp = param(params, "MapBiome_Warp", 4.0) as f64;
    let balance = param(params, "MapBiome_Balance", 0.5);
    let contrast = param(params, "MapBiome_Contrast", 0.5);
    let lava_warp = param(params, "MapLava_Warp", 12.0) as f64;

    let terrain: Fbm<Perlin> = Fbm::new(height_seed).set_octaves(6);
    let terrain = CylindricalNoise::new(terrain, 1.0 + height_warp * 0.25);
    let biome: Fbm<Perlin> = Fbm::new(biome_seed).set_octaves(4);
    let biome = CylindricalNoise::new(biome, 1.0 + biome_warp * 0.5);
    let lava: RidgedMulti<Perlin> = RidgedMulti::new(height_seed.wrapping_add(97)).set_octaves(4);
    let lava = CylindricalNoise::new(lava, lava_warp * 0.25);

    let mut out = ArtifactData::blank(width, height);
    for_each_texel(&mut out, |u, v, texel| {
        let h = normalize(terrain.get(u, v)) as f32;
        // Balance shifts the blend midpoint; contrast steepens it.
        let raw = normalize(biome.get(u, v)) as f32;
        let mask = contrast_curve(raw + (balance - 0.5), contrast);
        let flow = normalize(lava.get(u, v)) as f32;

        texel[0] = quantize(h);
        texel[1] = quantize(mask);
        texel[2] = quantize(flow * flow);
        texel[3] = 255;
    });
    out
}

/// Gas-giant band map. Latitudinal bands distorted by turbulence, with storm
/// cells punched in where the storm field exceeds its threshold.
fn render_gas_maps(params: &ParameterSnapshot, width: u32, height: u32) -> ArtifactData {
    let seed = seed_param(params, "$randomseed");
    let banding = param(params, "Banding", 6.0);
    let turbulence = param(params, "Turbulence", 4.0) as f64;
    let storms = param(params, "Storms", 0.3);

    let warp: Fbm<Perlin> = Fbm::new(seed).set_octaves(5);
    let warp = CylindricalNoise::new(warp, 2.0 + turbulence * 0.5);
    let storm_field: Fbm<Perlin> = Fbm::new(seed.wrapping_add(31)).set_octaves(4);
    let storm_field = CylindricalNoise::new(storm_field, 5.0);

    let mut out = ArtifactData::blank(width, height);
    for_each_texel(&mut out, |u, v, texel| {
        // Bands run along latitude; the warp field bends them.
        let offset = warp.get(u, v) * turbulence * 0.02;
        let band = ((v + offset) * f64::from(banding) * std::f64::consts::PI).sin();
        let band = (band * 0.5 + 0.5) as f32;

        let cell = normalize(storm_field.get(u, v)) as f32;
        let storm = smoothstep(1.0 - storms * 0.4, 1.0, cell);

        texel[0] = quantize(band);
        texel[1] = quantize(storm);
        texel[2] = 0;
        texel[3] = 255;
    });
    out
}

/// Tileable biome surface: coverage mask in alpha, hue-shifted two-tone
/// albedo in RGB. Alienization pushes the palette off its natural hue.
fn render_biome(params: &ParameterSnapshot, width: u32, height: u32) -> ArtifactData {
    let seed = seed_param(params, "$randomseed");
    let chaos = param(params, "Biome_Coverage_Warp", 4.0) as f64;
    let balance = param(params, "Biome_Coverage_Balance", 0.5);
    let hue = param(params, "Biome_Hue", 0.3);
    let brightness = param(params, "Biome_Brightness", 0.5);
    let alienization = param(params, "Biome_Alienization", 0.0);

    let coverage: Fbm<Perlin> = Fbm::new(seed).set_octaves(5);
    let coverage = ToroidalNoise::new(coverage, 2.0 + chaos * 0.5);
    let detail: Fbm<Perlin> = Fbm::new(seed.wrapping_add(50)).set_octaves(6);
    let detail = ToroidalNoise::new(detail, 9.0);

    // An alien world rotates the whole palette by up to half the hue wheel.
    let hue = (hue + alienization * 0.5).fract();
    let light = hsv_to_rgb_f32(hue, 0.45, (brightness + 0.25).min(1.0));
    let dark = hsv_to_rgb_f32(hue, 0.6, brightness * 0.5);

    let mut out = ArtifactData::blank(width, height);
    for_each_texel(&mut out, |u, v, texel| {
        let t = normalize(detail.get(u, v)) as f32;
        let cover = normalize(coverage.get(u, v)) as f32;
        let mask = smoothstep(0.5 - balance * 0.35, 0.5 + balance * 0.35, cover);

        texel[0] = quantize(lerp(dark[0], light[0], t));
        texel[1] = quantize(lerp(dark[1], light[1], t));
        texel[2] = quantize(lerp(dark[2], light[2], t));
        texel[3] = quantize(mask);
    });
    out
}

/// Cloud layer: two FBM sheets at different scales, thresholded by coverage.
/// Output is white with coverage in alpha; tinting happens in the material.
fn render_clouds(params: &ParameterSnapshot, width: u32, height: u32) -> ArtifactData {
    let seed = seed_param(params, "$randomseed");
    let coverage = param(params, "Coverage", 0.5);
    let sharpness = param(params, "Sharpness", 0.5);
    let roughness = param(params, "Roughness", 0.5);
    let layer1 = param(params, "Layer1_Opacity", 1.0);
    let layer2 = param(params, "Layer2_Opacity", 0.5);

    let sheet1: Fbm<Perlin> = Fbm::new(seed).set_octaves(5);
    let sheet1 = CylindricalNoise::new(sheet1, 3.0 + roughness as f64 * 3.0);
    let sheet2: Fbm<Perlin> = Fbm::new(seed.wrapping_add(50)).set_octaves(6);
    let sheet2 = CylindricalNoise::new(sheet2, 7.0 + roughness as f64 * 4.0);

    // Sharpness narrows the density ramp around the coverage threshold.
    let threshold = 1.0 - coverage;
    let width_half = lerp(0.35, 0.04, sharpness);

    let mut out = ArtifactData::blank(width, height);
    for_each_texel(&mut out, |u, v, texel| {
        let a = normalize(sheet1.get(u, v)) as f32 * layer1;
        let b = normalize(sheet2.get(u, v)) as f32 * layer2;
        let density = (a + b) / (layer1 + layer2).max(1e-3);
        let alpha = smoothstep(threshold - width_half, threshold + width_half, density);

        texel[0] = 255;
        texel[1] = 255;
        texel[2] = 255;
        texel[3] = quantize(alpha);
    });
    out
}

/// Night-side city lights: high-frequency speckle gated by population, with a
/// soft halo from a lower-frequency pass scaled by glow.
fn render_cities(params: &ParameterSnapshot, width: u32, height: u32) -> ArtifactData {
    let seed = seed_param(params, "$randomseed");
    let population = param(params, "Population", 0.1);
    let advancement = param(params, "Advancement", 0.5);
    let glow = param(params, "Glow", 0.5);

    let speckle: Fbm<Perlin> = Fbm::new(seed).set_octaves(7);
    let speckle = CylindricalNoise::new(speckle, 24.0);
    let halo: Fbm<Perlin> = Fbm::new(seed).set_octaves(3);
    let halo = CylindricalNoise::new(halo, 6.0);

    // Advancement warms the light color from sodium orange toward white LED.
    let color = [
        1.0,
        lerp(0.6, 0.95, advancement),
        lerp(0.25, 0.9, advancement),
    ];

    let mut out = ArtifactData::blank(width, height);
    for_each_texel(&mut out, |u, v, texel| {
        let s = normalize(speckle.get(u, v)) as f32;
        let lit = smoothstep(1.0 - population, 1.0, s);
        let ambient = normalize(halo.get(u, v)) as f32 * glow * 0.25 * population;
        let intensity = (lit + ambient).min(1.0);

        texel[0] = quantize(color[0] * intensity);
        texel[1] = quantize(color[1] * intensity);
        texel[2] = quantize(color[2] * intensity);
        texel[3] = quantize(intensity);
    });
    out
}

/// Tileable lava surface: ridged crust brightness in R, heat (crack glow
/// weight) in G. Hue variation nudges the crack sharpness.
fn render_lava(params: &ParameterSnapshot, width: u32, height: u32) -> ArtifactData {
    let seed = seed_param(params, "$randomseed");
    let hue = param(params, "Lava_Hue", 0.54) as f64;

    let crust: RidgedMulti<Perlin> = RidgedMulti::new(seed)
        .set_octaves(6)
        .set_attenuation(1.5 + hue);
    let crust = ToroidalNoise::new(crust, 4.0);

    let mut out = ArtifactData::blank(width, height);
    for_each_texel(&mut out, |u, v, texel| {
        let t = normalize(crust.get(u, v)) as f32;
        // Ridge crests are the glowing cracks; the floor is cooled crust.
        let heat = smoothstep(0.65, 0.95, t);

        texel[0] = quantize(t);
        texel[1] = quantize(heat);
        texel[2] = 0;
        texel[3] = 255;
    });
    out
}

/// Tileable polar ice: bright sheet with darker fracture lines carved where
/// the ridged field peaks.
fn render_polar_ice(params: &ParameterSnapshot, width: u32, height: u32) -> ArtifactData {
    let seed = seed_param(params, "$randomseed");
    let cracks = param(params, "Cracks", 0.5);

    let sheet: Fbm<Perlin> = Fbm::new(seed).set_octaves(4);
    let sheet = ToroidalNoise::new(sheet, 3.0);
    let fracture: RidgedMulti<Perlin> = RidgedMulti::new(seed.wrapping_add(17)).set_octaves(5);
    let fracture = ToroidalNoise::new(fracture, 6.0);

    let mut out = ArtifactData::blank(width, height);
    for_each_texel(&mut out, |u, v, texel| {
        let body = 0.8 + normalize(sheet.get(u, v)) as f32 * 0.2;
        let ridge = normalize(fracture.get(u, v)) as f32;
        let line = smoothstep(0.97 - cracks * 0.12, 1.0, ridge);
        let value = body * (1.0 - line * 0.6);

        texel[0] = quantize(value);
        texel[1] = quantize(value);
        texel[2] = quantize((value + 0.05).min(1.0));
        texel[3] = 255;
    });
    out
}

/// Shader lookup ramps, one per row, indexed by normalized surface height.
/// Row 0: liquid mask (shore softened by shallow distance). Row 1: polar
/// transition. Row 2: lava mask with glow falloff in G.
fn render_lookups(params: &ParameterSnapshot, width: u32, height: u32) -> ArtifactData {
    let liquid = param(params, "Liquid_Level", 0.5);
    let shallow = param(params, "Liquid_Shallow", 0.1).max(1e-3);
    let polar = param(params, "Polar_Amount", 0.5);
    let lava = param(params, "Lava_Amount", 0.0);
    let lava_glow = param(params, "Lava_Glow", 0.0);

    let mut out = ArtifactData::blank(width, height);
    let w = width as usize;
    for x in 0..w {
        let t = x as f32 / (w - 1).max(1) as f32;

        // Liquid covers terrain below the level; the shallow band fades out.
        let liquid_mask = 1.0 - smoothstep(liquid - shallow * 0.25, liquid, t);
        // Caps claim the top of the latitude ramp.
        let polar_mask = smoothstep(1.0 - polar * 0.5, 1.0 - polar * 0.35, t);
        // Lava fills from the bottom of its own flow-mask ramp.
        let lava_mask = smoothstep(1.0 - lava, (1.0 - lava + 0.1).min(1.0), t);
        let glow = lava_mask * smoothstep(1.0 - lava_glow * 8.0, 1.0, t);

        for y in 0..height as usize {
            let i = (y * w + x) * 4;
            let (r, g) = match y % 3 {
                0 => (liquid_mask, shallow_depth(liquid, shallow, t)),
                1 => (polar_mask, 0.0),
                _ => (lava_mask, glow),
            };
            out.pixels[i] = quantize(r);
            out.pixels[i + 1] = quantize(g);
            out.pixels[i + 2] = 0;
            out.pixels[i + 3] = 255;
        }
    }
    out
}

/// Normalized depth below the liquid level, for shore color grading.
fn shallow_depth(level: f32, shallow: f32, t: f32) -> f32 {
    if t >= level {
        0.0
    } else {
        ((level - t) / shallow).min(1.0)
    }
}

/// Ring band: a 1-D radial density profile swept across the texture width.
/// Gaps are carved where a low-frequency profile dips below the gap width.
fn render_ring(params: &ParameterSnapshot, width: u32, height: u32) -> ArtifactData {
    let seed = seed_param(params, "$randomseed");
    let density = param(params, "Density", 0.6);
    let gap = param(params, "Gap_Width", 0.2);

    let profile: Fbm<Perlin> = Fbm::new(seed).set_octaves(6);
    let grain: Fbm<Perlin> = Fbm::new(seed.wrapping_add(50)).set_octaves(3);

    let mut out = ArtifactData::blank(width, height);
    let w = width as usize;
    for x in 0..w {
        let r = x as f32 / (w - 1).max(1) as f32;
        // Radius is the only coordinate; the band is rotationally uniform.
        let body = normalize(profile.get([f64::from(r) * 14.0, 0.5, 0.0])) as f32;
        let fine = normalize(grain.get([f64::from(r) * 60.0, 1.5, 0.0])) as f32;
        let carved = smoothstep(gap * 0.8, gap * 0.8 + 0.1, body);
        let alpha = carved * density * (0.6 + fine * 0.4);
        // Fade both edges of the band so it doesn't end in a hard rim.
        let edge = smoothstep(0.0, 0.08, r) * (1.0 - smoothstep(0.92, 1.0, r));
        let alpha = alpha * edge;

        for y in 0..height as usize {
            let i = (y * w + x) * 4;
            out.pixels[i] = 255;
            out.pixels[i + 1] = 250;
            out.pixels[i + 2] = 235;
            out.pixels[i + 3] = quantize(alpha);
        }
    }
    out
}

/// Visit every texel with its normalized UV.
fn for_each_texel(out: &mut ArtifactData, mut f: impl FnMut(f64, f64, &mut [u8])) {
    let w = out.width as usize;
    let h = out.height as usize;
    for y in 0..h {
        let v = y as f64 / h as f64;
        for x in 0..w {
            let u = x as f64 / w as f64;
            let i = (y * w + x) * 4;
            f(u, v, &mut out.pixels[i..i + 4]);
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Sigmoid-ish contrast around 0.5; `amount = 0` is identity-like, `1` is a
/// near-threshold.
fn contrast_curve(x: f32, amount: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    let k = 1.0 + amount * 11.0;
    let centered = x - 0.5;
    (centered * k).tanh() / (0.5f32 * k).tanh() * 0.5 + 0.5
}

#[inline]
fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn hsv_to_rgb_f32(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h = (h.rem_euclid(1.0)) * 6.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i as u32 % 6 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, f32)]) -> ParameterSnapshot {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    #[test]
    fn renders_are_deterministic() {
        let params = snapshot(&[
            ("MapHeight_Random_Seed", 42.0),
            ("MapHeight_Warp", 10.0),
            ("MapBiome_Random_Seed", 7.0),
        ]);
        let a = render_artifact(ArtifactTag::Maps, &params, 32, 16).unwrap();
        let b = render_artifact(ArtifactTag::Maps, &params, 32, 16).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seed_changes_the_output() {
        let base = snapshot(&[("$randomseed", 1.0), ("Coverage", 0.7)]);
        let other = snapshot(&[("$randomseed", 2.0), ("Coverage", 0.7)]);
        let a = render_artifact(ArtifactTag::Clouds, &base, 32, 16).unwrap();
        let b = render_artifact(ArtifactTag::Clouds, &other, 32, 16).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let params = ParameterSnapshot::new();
        assert!(matches!(
            render_artifact(ArtifactTag::Maps, &params, 0, 16),
            Err(BuildError::ZeroResolution { width: 0, height: 16 })
        ));
        assert!(matches!(
            render_artifact(ArtifactTag::Lookups, &params, 256, 0),
            Err(BuildError::ZeroResolution { .. })
        ));
    }

    #[test]
    fn composition_balance_shifts_the_blend_mask() {
        let base = &[("MapHeight_Random_Seed", 9.0), ("MapBiome_Random_Seed", 4.0)];
        let mut low = snapshot(base);
        low.insert("MapBiome_Balance".into(), 0.1);
        let mut high = snapshot(base);
        high.insert("MapBiome_Balance".into(), 0.9);

        let g_sum = |d: &ArtifactData| -> u64 {
            d.pixels.chunks_exact(4).map(|t| u64::from(t[1])).sum()
        };
        let a = render_artifact(ArtifactTag::Maps, &low, 64, 32).unwrap();
        let b = render_artifact(ArtifactTag::Maps, &high, 64, 32).unwrap();
        assert!(g_sum(&b) > g_sum(&a), "balance did not push the mask");
    }

    #[test]
    fn cloud_coverage_scales_opacity() {
        let sparse = snapshot(&[("$randomseed", 5.0), ("Coverage", 0.15)]);
        let dense = snapshot(&[("$randomseed", 5.0), ("Coverage", 0.9)]);
        let a = render_artifact(ArtifactTag::Clouds, &sparse, 64, 32).unwrap();
        let b = render_artifact(ArtifactTag::Clouds, &dense, 64, 32).unwrap();
        let alpha_sum = |d: &ArtifactData| -> u64 {
            d.pixels.chunks_exact(4).map(|t| u64::from(t[3])).sum()
        };
        assert!(alpha_sum(&b) > alpha_sum(&a));
    }

    #[test]
    fn lookup_liquid_ramp_is_monotonic_falling() {
        let params = snapshot(&[("Liquid_Level", 0.5), ("Liquid_Shallow", 0.2)]);
        let ramp = render_artifact(ArtifactTag::Lookups, &params, 256, 3).unwrap();
        let mut prev = u8::MAX;
        for x in 0..256usize {
            let r = ramp.pixels[x * 4];
            assert!(r <= prev, "liquid mask rose at x={x}");
            prev = r;
        }
        // Low terrain is submerged, high terrain is dry.
        assert_eq!(ramp.pixels[0], 255);
        assert_eq!(ramp.pixels[255 * 4], 0);
    }

    #[test]
    fn gas_maps_band_with_latitude() {
        let params = snapshot(&[
            ("$randomseed", 3.0),
            ("Banding", 8.0),
            ("Turbulence", 0.0),
            ("Storms", 0.0),
        ]);
        let map = render_artifact(ArtifactTag::Maps, &params, 16, 128).unwrap();
        // With no turbulence the band channel varies down a column.
        let column: Vec<u8> = (0..128).map(|y| map.pixels[y * 16 * 4]).collect();
        let min = column.iter().min().copied().unwrap_or(0);
        let max = column.iter().max().copied().unwrap_or(0);
        assert!(max - min > 100, "bands are flat: {min}..{max}");
    }
}
