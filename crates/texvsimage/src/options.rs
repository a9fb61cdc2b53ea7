use phasebench::Configuration;

/// Level count of the minification chain is `MINIFY_TOP_LEVEL + 1`.
pub const MINIFY_TOP_LEVEL: u32 = 12;
pub const MINIFY_SIZE: u32 = 1 << MINIFY_TOP_LEVEL;
/// Level of the minification chain copied into the magnification texture.
pub const MAGNIFY_SOURCE_LEVEL: u32 = 7;
pub const MAGNIFY_SIZE: u32 = MINIFY_SIZE >> MAGNIFY_SOURCE_LEVEL;

pub const IMAGE_PASS: usize = 1;
pub const PASSES: [&str; 2] = ["texture()", "image"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceTexture {
    /// 32x32, smaller than the window.
    Magnify,
    /// 4096x4096 with a full mip chain.
    Minify,
}

impl SourceTexture {
    fn label(self) -> &'static str {
        match self {
            Self::Magnify => "magnification texture",
            Self::Minify => "minification texture",
        }
    }
}

/// Sampler state for the `texture()` pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerOption {
    pub source: SourceTexture,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    /// `None` restricts sampling to the base level.
    pub mipmap_filter: Option<wgpu::FilterMode>,
}

impl SamplerOption {
    const fn new(
        source: SourceTexture,
        mag_filter: wgpu::FilterMode,
        min_filter: wgpu::FilterMode,
        mipmap_filter: Option<wgpu::FilterMode>,
    ) -> Self {
        Self {
            source,
            mag_filter,
            min_filter,
            mipmap_filter,
        }
    }

    pub fn sampler_descriptor(&self) -> wgpu::SamplerDescriptor<'static> {
        wgpu::SamplerDescriptor {
            label: Some("texvsimage sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: self.mag_filter,
            min_filter: self.min_filter,
            mipmap_filter: self.mipmap_filter.unwrap_or(wgpu::FilterMode::Nearest),
            ..Default::default()
        }
    }

    /// Mip levels visible to the sampled view.
    pub fn sampled_levels(&self) -> Option<u32> {
        match self.mipmap_filter {
            Some(_) => None,
            None => Some(1),
        }
    }

    /// Level read by the `image` pass for a `width` x `height` window.
    pub fn image_level(&self, width: u32, height: u32) -> u32 {
        match self.source {
            SourceTexture::Magnify => MAGNIFY_SOURCE_LEVEL,
            SourceTexture::Minify => window_image_level(width, height),
        }
    }

    pub fn name(&self) -> String {
        let min = match self.mipmap_filter {
            Some(mip) => format!("{}_MIPMAP_{}", filter_name(self.min_filter), filter_name(mip)),
            None => filter_name(self.min_filter).to_owned(),
        };
        let levels = match self.sampled_levels() {
            Some(_) => "base level only".to_owned(),
            None => format!("levels 0-{MINIFY_TOP_LEVEL}"),
        };
        format!(
            "{}, mag {}, min {}, {}",
            self.source.label(),
            filter_name(self.mag_filter),
            min,
            levels
        )
    }
}

fn filter_name(filter: wgpu::FilterMode) -> &'static str {
    match filter {
        wgpu::FilterMode::Nearest => "NEAREST",
        wgpu::FilterMode::Linear => "LINEAR",
    }
}

/// Bit width of `value`, counting a zero as one bit.
fn bit_width(value: u32) -> u32 {
    (32 - value.leading_zeros()).max(1)
}

/// Minification level whose size is closest to the window from below the
/// next power of two: 640x480 reads level 3 (512x512).
pub fn window_image_level(width: u32, height: u32) -> u32 {
    let span = bit_width(width).max(bit_width(height));
    (MINIFY_TOP_LEVEL + 1).saturating_sub(span).min(MINIFY_TOP_LEVEL)
}

pub fn sampler_configurations() -> Vec<Configuration<SamplerOption>> {
    use wgpu::FilterMode::{Linear, Nearest};
    use SourceTexture::{Magnify, Minify};

    [
        SamplerOption::new(Magnify, Nearest, Nearest, None),
        SamplerOption::new(Magnify, Linear, Nearest, None),
        SamplerOption::new(Minify, Nearest, Nearest, None),
        SamplerOption::new(Minify, Nearest, Linear, None),
        SamplerOption::new(Minify, Nearest, Nearest, Some(Nearest)),
        SamplerOption::new(Minify, Nearest, Nearest, Some(Linear)),
        SamplerOption::new(Minify, Nearest, Linear, Some(Nearest)),
        SamplerOption::new(Minify, Nearest, Linear, Some(Linear)),
    ]
    .into_iter()
    .map(|option| Configuration::new(option.name(), option).with_passes(PASSES))
    .collect()
}
