use phasebench::Configuration;
use renderer::gpu::texture::TexelEncoding;

/// Which fragment stage can read a format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleKind {
    /// Normalized and float formats, read through a sampler.
    Float,
    Sint,
    Uint,
}

impl SampleKind {
    pub fn of(encoding: TexelEncoding) -> Self {
        use TexelEncoding as E;
        match encoding {
            E::Sint8 | E::Sint16 | E::Sint32 => Self::Sint,
            E::Uint8 | E::Uint16 | E::Uint32 | E::Rgb10a2Uint => Self::Uint,
            _ => Self::Float,
        }
    }

    pub fn texture_sample_type(self) -> wgpu::TextureSampleType {
        match self {
            // Rgba32Float is not filterable without an extra feature.
            Self::Float => wgpu::TextureSampleType::Float { filterable: false },
            Self::Sint => wgpu::TextureSampleType::Sint,
            Self::Uint => wgpu::TextureSampleType::Uint,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FormatParams {
    pub encoding: TexelEncoding,
    pub kind: SampleKind,
}

impl FormatParams {
    fn new(encoding: TexelEncoding) -> Self {
        Self {
            encoding,
            kind: SampleKind::of(encoding),
        }
    }

    /// Device features needed before a texture of this format can be created.
    pub fn required_features(&self) -> wgpu::Features {
        match self.encoding {
            TexelEncoding::Unorm16 | TexelEncoding::Snorm16 => {
                wgpu::Features::TEXTURE_FORMAT_16BIT_NORM
            }
            _ => wgpu::Features::empty(),
        }
    }

    /// Value the integer stages divide by; 1 for formats the sampler
    /// already normalizes.
    pub fn read_scale(&self) -> f32 {
        match self.kind {
            SampleKind::Float => 1.0,
            SampleKind::Sint | SampleKind::Uint => self.encoding.integer_scale(),
        }
    }
}

pub fn format_configurations() -> Vec<Configuration<FormatParams>> {
    use TexelEncoding as E;
    [
        ("RGBA8", E::Unorm8),
        ("RGBA16", E::Unorm16),
        ("RGBA8_SNORM", E::Snorm8),
        ("RGBA16_SNORM", E::Snorm16),
        ("SRGB8_ALPHA8", E::Srgb8),
        ("RGB10_A2", E::Rgb10a2Unorm),
        ("RGB10_A2UI", E::Rgb10a2Uint),
        ("R11F_G11F_B10F", E::Rg11b10Float),
        ("RGBA16F", E::Float16),
        ("RGBA32F", E::Float32),
        ("RGBA8I", E::Sint8),
        ("RGBA16I", E::Sint16),
        ("RGBA32I", E::Sint32),
        ("RGBA8UI", E::Uint8),
        ("RGBA16UI", E::Uint16),
        ("RGBA32UI", E::Uint32),
    ]
    .into_iter()
    .map(|(name, encoding)| Configuration::new(name, FormatParams::new(encoding)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sixteen_distinct_formats() {
        let configurations = format_configurations();
        assert_eq!(configurations.len(), 16);

        let names: HashSet<_> = configurations.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), 16);
        let formats: HashSet<_> = configurations
            .iter()
            .map(|c| c.params().encoding.format())
            .collect();
        assert_eq!(formats.len(), 16);
    }

    #[test]
    fn integer_formats_use_integer_stages() {
        for configuration in format_configurations() {
            let params = configuration.params();
            let expected = match params.encoding.format().sample_type(None, None) {
                Some(wgpu::TextureSampleType::Sint) => SampleKind::Sint,
                Some(wgpu::TextureSampleType::Uint) => SampleKind::Uint,
                _ => SampleKind::Float,
            };
            assert_eq!(params.kind, expected, "{}", configuration.name());
        }
    }

    #[test]
    fn only_sixteen_bit_norm_formats_need_a_feature() {
        let gated: Vec<_> = format_configurations()
            .into_iter()
            .filter(|c| !c.params().required_features().is_empty())
            .map(|c| c.name().to_owned())
            .collect();
        assert_eq!(gated, vec!["RGBA16", "RGBA16_SNORM"]);
    }

    #[test]
    fn integer_reads_are_rescaled() {
        let configurations = format_configurations();
        let scale_of = |name: &str| {
            configurations
                .iter()
                .find(|c| c.name() == name)
                .map(|c| c.params().read_scale())
                .unwrap()
        };
        assert_eq!(scale_of("RGBA8"), 1.0);
        assert_eq!(scale_of("RGBA8I"), 127.0);
        assert_eq!(scale_of("RGBA32UI"), 255.0);
    }
}
