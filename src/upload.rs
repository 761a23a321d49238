//! Hand-off from raw artifact pixels to bevy [`Image`] assets.
//!
//! Each artifact slot declares its own upload policy ([`ArtifactTag`]):
//! color slots upload as sRGB, data slots as linear, and point-sampled slots
//! (the control map, the lookup ramps) skip the mipmap chain entirely so the
//! shader reads exact texel values. Everything samples with repeat wrapping —
//! planet maps tile around the seam and detail surfaces tile everywhere.

use std::sync::OnceLock;

use bevy::asset::RenderAssetUsages;
use bevy::image::{Image, ImageAddressMode, ImageSampler, ImageSamplerDescriptor};
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use crate::artifact::{ArtifactData, ArtifactTag};

/// Controls how mipmap averages are computed.
///
/// Averaging sRGB-encoded channels directly makes mip levels artificially
/// dark; color data must round-trip through linear light.
#[derive(Clone, Copy)]
enum MipmapMode {
    Srgb,
    Linear,
}

/// Build the [`Image`] for one finished artifact.
///
/// Takes the pixels by value so the buffer moves into the asset without a
/// copy. Callers add the result to `Assets<Image>` and bind the handle to
/// the slot named by [`ArtifactTag::slot_name`].
#[must_use]
pub fn artifact_to_image(tag: ArtifactTag, data: ArtifactData) -> Image {
    let format = if tag.is_linear() {
        TextureFormat::Rgba8Unorm
    } else {
        TextureFormat::Rgba8UnormSrgb
    };
    let mut image = Image::new(
        Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data.pixels,
        format,
        RenderAssetUsages::default(),
    );

    if tag.has_mipmaps() {
        let mode = if tag.is_linear() { MipmapMode::Linear } else { MipmapMode::Srgb };
        if let Some(base) = image.data.take() {
            let (mip_data, mip_level_count) =
                generate_mipmaps(base, data.width, data.height, mode);
            image.texture_descriptor.mip_level_count = mip_level_count;
            image.data = Some(mip_data);
        }
    }

    image.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
        address_mode_u: ImageAddressMode::Repeat,
        address_mode_v: ImageAddressMode::Repeat,
        // wgpu requires all filter modes to be Linear when anisotropy_clamp > 1.
        mag_filter: bevy::image::ImageFilterMode::Linear,
        min_filter: bevy::image::ImageFilterMode::Linear,
        mipmap_filter: bevy::image::ImageFilterMode::Linear,
        anisotropy_clamp: 16,
        ..Default::default()
    });
    image
}

/// Decode an sRGB u8 value to linear-light f32.
fn srgb_to_linear(v: u8) -> f32 {
    static LUT: OnceLock<[f32; 256]> = OnceLock::new();
    LUT.get_or_init(|| {
        std::array::from_fn(|i| {
            let c = i as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        })
    })[v as usize]
}

fn linear_to_srgb(linear: f32) -> u8 {
    let c = linear.clamp(0.0, 1.0);
    let encoded = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round() as u8
}

/// Average a 2x2 block of RGBA8 pixels according to `mode`. Alpha is always
/// linear and averages directly.
fn average_block(pixels: &[[u8; 4]], mode: MipmapMode) -> [u8; 4] {
    match mode {
        MipmapMode::Linear => {
            let mut rgba = [0u32; 4];
            for p in pixels {
                for (acc, c) in rgba.iter_mut().zip(p.iter()) {
                    *acc += u32::from(*c);
                }
            }
            let count = pixels.len() as u32;
            rgba.map(|c| (c / count) as u8)
        }
        MipmapMode::Srgb => {
            let n = pixels.len() as f32;
            let mut rgb = [0.0f32; 3];
            let mut a = 0u32;
            for p in pixels {
                for (acc, c) in rgb.iter_mut().zip(p.iter()) {
                    *acc += srgb_to_linear(*c);
                }
                a += u32::from(p[3]);
            }
            [
                linear_to_srgb(rgb[0] / n),
                linear_to_srgb(rgb[1] / n),
                linear_to_srgb(rgb[2] / n),
                (a / pixels.len() as u32) as u8,
            ]
        }
    }
}

/// Append every successive mip level (half width, half height) onto `data`
/// with a 2x2 box filter. Non-power-of-two dimensions clamp the source block
/// to the image boundary. Returns the expanded buffer and the total level
/// count, level 0 included.
fn generate_mipmaps(
    mut data: Vec<u8>,
    base_width: u32,
    base_height: u32,
    mode: MipmapMode,
) -> (Vec<u8>, u32) {
    let mut mip_level_count = 1u32;
    let mut current_width = base_width as usize;
    let mut current_height = base_height as usize;
    let mut prev_offset = 0usize;

    while current_width > 1 || current_height > 1 {
        let next_width = current_width.max(2) / 2;
        let next_height = current_height.max(2) / 2;
        let next_offset = data.len();

        data.resize(next_offset + next_width * next_height * 4, 0);

        for y in 0..next_height {
            for x in 0..next_width {
                let dst_idx = next_offset + (y * next_width + x) * 4;
                let sx = x * 2;
                let sy = y * 2;

                let mut pixels = [[0u8; 4]; 4];
                let mut count = 0usize;
                for dy in 0..2usize {
                    if sy + dy >= current_height {
                        continue;
                    }
                    for dx in 0..2usize {
                        if sx + dx >= current_width {
                            continue;
                        }
                        let src_idx = prev_offset + ((sy + dy) * current_width + (sx + dx)) * 4;
                        pixels[count] = [
                            data[src_idx],
                            data[src_idx + 1],
                            data[src_idx + 2],
                            data[src_idx + 3],
                        ];
                        count += 1;
                    }
                }

                let avg = average_block(&pixels[..count], mode);
                data[dst_idx..dst_idx + 4].copy_from_slice(&avg);
            }
        }

        prev_offset = next_offset;
        current_width = next_width;
        current_height = next_height;
        mip_level_count += 1;
    }

    (data, mip_level_count)
}
