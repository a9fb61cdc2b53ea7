use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use half::f16;
use image::imageops::{self, FilterType};
use image::Rgba;
pub use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

/// Name of the optional image each lesson samples from.
pub const SAMPLE_IMAGE: &str = "sample.png";
const PATTERN_SIZE: (u32, u32) = (640, 480);

/// How an RGBA8 source texel is stored for a given texture format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TexelEncoding {
    Unorm8,
    Srgb8,
    Unorm16,
    Snorm8,
    Snorm16,
    Float16,
    Float32,
    Sint8,
    Sint16,
    Sint32,
    Uint8,
    Uint16,
    Uint32,
    Rgb10a2Unorm,
    Rgb10a2Uint,
    Rg11b10Float,
}

impl TexelEncoding {
    pub fn format(self) -> wgpu::TextureFormat {
        use wgpu::TextureFormat as F;
        match self {
            Self::Unorm8 => F::Rgba8Unorm,
            Self::Srgb8 => F::Rgba8UnormSrgb,
            Self::Unorm16 => F::Rgba16Unorm,
            Self::Snorm8 => F::Rgba8Snorm,
            Self::Snorm16 => F::Rgba16Snorm,
            Self::Float16 => F::Rgba16Float,
            Self::Float32 => F::Rgba32Float,
            Self::Sint8 => F::Rgba8Sint,
            Self::Sint16 => F::Rgba16Sint,
            Self::Sint32 => F::Rgba32Sint,
            Self::Uint8 => F::Rgba8Uint,
            Self::Uint16 => F::Rgba16Uint,
            Self::Uint32 => F::Rgba32Uint,
            Self::Rgb10a2Unorm => F::Rgb10a2Unorm,
            Self::Rgb10a2Uint => F::Rgb10a2Uint,
            Self::Rg11b10Float => F::Rg11b10Ufloat,
        }
    }

    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Self::Unorm8
            | Self::Srgb8
            | Self::Snorm8
            | Self::Sint8
            | Self::Uint8
            | Self::Rgb10a2Unorm
            | Self::Rgb10a2Uint
            | Self::Rg11b10Float => 4,
            Self::Unorm16 | Self::Snorm16 | Self::Float16 | Self::Sint16 | Self::Uint16 => 8,
            Self::Float32 | Self::Sint32 | Self::Uint32 => 16,
        }
    }

    /// Divisor that brings stored integer texels back to `[0, 1]`.
    pub fn integer_scale(self) -> f32 {
        match self {
            Self::Sint8 => 127.0,
            _ => 255.0,
        }
    }

    /// Converts tightly packed RGBA8 texels into this encoding.
    pub fn encode(self, rgba: &[u8]) -> Vec<u8> {
        let texels = rgba.chunks_exact(4);
        let mut out = Vec::with_capacity(texels.len() * self.bytes_per_texel() as usize);
        for texel in texels {
            let [r, g, b, a] = [texel[0], texel[1], texel[2], texel[3]];
            match self {
                Self::Unorm8 | Self::Srgb8 | Self::Uint8 => out.extend_from_slice(texel),
                Self::Unorm16 => {
                    for &c in texel {
                        out.extend_from_slice(&(u16::from(c) * 257).to_le_bytes());
                    }
                }
                Self::Snorm8 => {
                    for &c in texel {
                        out.push(scale_channel(c, 127.0) as i8 as u8);
                    }
                }
                Self::Snorm16 => {
                    for &c in texel {
                        out.extend_from_slice(&(scale_channel(c, 32767.0) as i16).to_le_bytes());
                    }
                }
                Self::Float16 => {
                    for &c in texel {
                        out.extend_from_slice(&f16::from_f32(unit(c)).to_le_bytes());
                    }
                }
                Self::Float32 => {
                    for &c in texel {
                        out.extend_from_slice(&unit(c).to_le_bytes());
                    }
                }
                Self::Sint8 => {
                    for &c in texel {
                        out.push(c >> 1);
                    }
                }
                Self::Sint16 => {
                    for &c in texel {
                        out.extend_from_slice(&i16::from(c).to_le_bytes());
                    }
                }
                Self::Sint32 => {
                    for &c in texel {
                        out.extend_from_slice(&i32::from(c).to_le_bytes());
                    }
                }
                Self::Uint16 => {
                    for &c in texel {
                        out.extend_from_slice(&u16::from(c).to_le_bytes());
                    }
                }
                Self::Uint32 => {
                    for &c in texel {
                        out.extend_from_slice(&u32::from(c).to_le_bytes());
                    }
                }
                Self::Rgb10a2Unorm => {
                    let packed = pack_rgb10a2(
                        scale_channel(r, 1023.0) as u32,
                        scale_channel(g, 1023.0) as u32,
                        scale_channel(b, 1023.0) as u32,
                        scale_channel(a, 3.0) as u32,
                    );
                    out.extend_from_slice(&packed.to_le_bytes());
                }
                Self::Rgb10a2Uint => {
                    let packed =
                        pack_rgb10a2(u32::from(r), u32::from(g), u32::from(b), u32::from(a >> 6));
                    out.extend_from_slice(&packed.to_le_bytes());
                }
                Self::Rg11b10Float => {
                    let packed = u32::from(to_uf11(unit(r)))
                        | u32::from(to_uf11(unit(g))) << 11
                        | u32::from(to_uf10(unit(b))) << 22;
                    out.extend_from_slice(&packed.to_le_bytes());
                }
            }
        }
        out
    }
}

fn unit(channel: u8) -> f32 {
    f32::from(channel) / 255.0
}

fn scale_channel(channel: u8, max: f32) -> f32 {
    (unit(channel) * max).round()
}

fn pack_rgb10a2(r: u32, g: u32, b: u32, a: u32) -> u32 {
    (r & 0x3ff) | (g & 0x3ff) << 10 | (b & 0x3ff) << 20 | (a & 0x3) << 30
}

/// Unsigned 11-bit float: 5 exponent bits, 6 mantissa bits. Shares the
/// exponent bias of binary16, so it is a truncated half.
fn to_uf11(value: f32) -> u16 {
    (f16::from_f32(value.max(0.0)).to_bits() >> 4) & 0x7ff
}

fn to_uf10(value: f32) -> u16 {
    (f16::from_f32(value.max(0.0)).to_bits() >> 5) & 0x3ff
}

/// Number of mip levels down to 1x1 for a `width` x `height` image.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Box-filtered mip chain of `base`, including `base` itself.
pub fn build_mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let count = mip_level_count(base.width(), base.height());
    let mut levels = Vec::with_capacity(count as usize);
    levels.push(base);
    for _ in 1..count {
        let Some(previous) = levels.last() else {
            break;
        };
        let width = (previous.width() / 2).max(1);
        let height = (previous.height() / 2).max(1);
        let next = imageops::resize(previous, width, height, FilterType::Triangle);
        levels.push(next);
    }
    levels
}

/// Rescales `image` to a square of `size` texels.
pub fn resize_square(image: &RgbaImage, size: u32) -> RgbaImage {
    imageops::resize(image, size, size, FilterType::Triangle)
}

/// Places where the sample image is looked up, most specific first.
pub fn sample_image_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join(SAMPLE_IMAGE));
    }
    candidates.push(PathBuf::from(SAMPLE_IMAGE));
    candidates
}

/// Loads `sample.png` when present, otherwise a generated test pattern.
pub fn load_sample_image() -> RgbaImage {
    for path in sample_image_candidates() {
        if !path.is_file() {
            continue;
        }
        match load_image(&path) {
            Ok(image) => {
                tracing::debug!(path = %path.display(), width = image.width(), height = image.height(), "loaded sample image");
                return image;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to load sample image");
            }
        }
    }
    tracing::info!("no {SAMPLE_IMAGE} found; using a generated test pattern");
    test_pattern(PATTERN_SIZE.0, PATTERN_SIZE.1)
}

fn load_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(image.to_rgba8())
}

/// Colour gradient with a checker overlay; enough detail to make filtering
/// and format precision visible.
pub fn test_pattern(width: u32, height: u32) -> RgbaImage {
    let width = width.max(1);
    let height = height.max(1);
    RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width) as u8;
        let g = (y * 255 / height) as u8;
        let checker = ((x / 32) + (y / 32)) % 2 == 0;
        let b = if checker { 224 } else { 32 };
        Rgba([r, g, b, 255])
    })
}

/// Uploads every level of `levels` into one RGBA8 texture.
pub fn create_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    levels: &[RgbaImage],
    extra_usage: wgpu::TextureUsages,
) -> Result<wgpu::Texture> {
    let base = levels
        .first()
        .with_context(|| format!("texture `{label}` has no image data"))?;
    let mut data = Vec::new();
    for level in levels {
        data.extend_from_slice(level.as_raw());
    }
    Ok(device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: base.width(),
                height: base.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST | extra_usage,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &data,
    ))
}

/// Uploads `image` converted to `encoding`.
pub fn create_encoded_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    image: &RgbaImage,
    encoding: TexelEncoding,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width: image.width(),
        height: image.height(),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: encoding.format(),
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let data = encoding.encode(image.as_raw());
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(image.width() * encoding.bytes_per_texel()),
            rows_per_image: Some(image.height()),
        },
        size,
    );
    texture
}

/// Nearest-filtered sampler with repeat addressing.
pub fn nearest_repeat_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TexelEncoding; 16] = [
        TexelEncoding::Unorm8,
        TexelEncoding::Srgb8,
        TexelEncoding::Unorm16,
        TexelEncoding::Snorm8,
        TexelEncoding::Snorm16,
        TexelEncoding::Float16,
        TexelEncoding::Float32,
        TexelEncoding::Sint8,
        TexelEncoding::Sint16,
        TexelEncoding::Sint32,
        TexelEncoding::Uint8,
        TexelEncoding::Uint16,
        TexelEncoding::Uint32,
        TexelEncoding::Rgb10a2Unorm,
        TexelEncoding::Rgb10a2Uint,
        TexelEncoding::Rg11b10Float,
    ];

    #[test]
    fn encoded_size_matches_texel_size() {
        let source = [10u8, 20, 30, 40, 250, 251, 252, 253];
        for encoding in ALL {
            let encoded = encoding.encode(&source);
            assert_eq!(
                encoded.len(),
                2 * encoding.bytes_per_texel() as usize,
                "{encoding:?}"
            );
            assert_eq!(
                encoding.format().block_copy_size(None),
                Some(encoding.bytes_per_texel()),
                "{encoding:?}"
            );
        }
    }

    #[test]
    fn normalized_encodings_hit_full_scale() {
        let white = [255u8, 255, 255, 255];
        assert_eq!(TexelEncoding::Unorm16.encode(&white)[0..2], [0xff, 0xff]);
        assert_eq!(TexelEncoding::Snorm8.encode(&white), vec![127; 4]);
        assert_eq!(
            TexelEncoding::Snorm16.encode(&white)[0..2],
            32767i16.to_le_bytes()
        );
        assert_eq!(
            TexelEncoding::Rgb10a2Unorm.encode(&white),
            u32::MAX.to_le_bytes().to_vec()
        );
    }

    #[test]
    fn float_encodings_store_unit_values() {
        let texel = [255u8, 0, 51, 255];
        let encoded = TexelEncoding::Float32.encode(&texel);
        let red = f32::from_le_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]);
        let blue = f32::from_le_bytes([encoded[8], encoded[9], encoded[10], encoded[11]]);
        assert_eq!(red, 1.0);
        assert!((blue - 0.2).abs() < 1e-6);

        let half = TexelEncoding::Float16.encode(&texel);
        assert_eq!(f16::from_le_bytes([half[0], half[1]]), f16::ONE);
    }

    #[test]
    fn integer_encodings_keep_raw_values() {
        let texel = [200u8, 1, 2, 3];
        let encoded = TexelEncoding::Uint32.encode(&texel);
        assert_eq!(&encoded[0..4], &200u32.to_le_bytes());
        assert_eq!(TexelEncoding::Sint8.encode(&texel)[0], 100);
        assert_eq!(TexelEncoding::Sint8.integer_scale(), 127.0);
        assert_eq!(TexelEncoding::Uint8.integer_scale(), 255.0);
    }

    #[test]
    fn packed_small_float_encodes_one() {
        let packed = TexelEncoding::Rg11b10Float.encode(&[255, 255, 255, 255]);
        let value = u32::from_le_bytes([packed[0], packed[1], packed[2], packed[3]]);
        // 1.0 is exponent 15 with an empty mantissa in both layouts.
        assert_eq!(value & 0x7ff, 15 << 6);
        assert_eq!((value >> 11) & 0x7ff, 15 << 6);
        assert_eq!(value >> 22, 15 << 5);
    }

    #[test]
    fn rgb10a2_uint_keeps_channels_and_quantizes_alpha() {
        let packed = TexelEncoding::Rgb10a2Uint.encode(&[7, 8, 9, 255]);
        let value = u32::from_le_bytes([packed[0], packed[1], packed[2], packed[3]]);
        assert_eq!(value & 0x3ff, 7);
        assert_eq!((value >> 10) & 0x3ff, 8);
        assert_eq!((value >> 20) & 0x3ff, 9);
        assert_eq!(value >> 30, 3);
    }

    #[test]
    fn mip_counts() {
        assert_eq!(mip_level_count(4096, 4096), 13);
        assert_eq!(mip_level_count(640, 480), 10);
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn mip_chain_halves_down_to_one_texel() {
        let chain = build_mip_chain(test_pattern(64, 64));
        assert_eq!(chain.len(), 7);
        let sizes: Vec<_> = chain.iter().map(|level| level.width()).collect();
        assert_eq!(sizes, vec![64, 32, 16, 8, 4, 2, 1]);
    }

    #[test]
    fn test_pattern_is_opaque() {
        let pattern = test_pattern(64, 48);
        assert_eq!(pattern.dimensions(), (64, 48));
        assert!(pattern.pixels().all(|pixel| pixel.0[3] == 255));
    }
}
