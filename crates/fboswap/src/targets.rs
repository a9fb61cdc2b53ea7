use phasebench::Configuration;

/// Offscreen targets keep the original window size regardless of resizes.
pub const TARGET_WIDTH: u32 = 640;
pub const TARGET_HEIGHT: u32 = 480;
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const TARGET_COUNT: usize = 2;

/// How the frame's render target is switched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchMode {
    /// Each target is a complete framebuffer built once; frames alternate
    /// between them.
    PrebuiltTargets,
    /// A single framebuffer whose colour attachment is re-pointed at the
    /// other texture every frame.
    Reattach,
}

pub fn switch_configurations() -> Vec<Configuration<SwitchMode>> {
    vec![
        Configuration::new("FBO", SwitchMode::PrebuiltTargets),
        Configuration::new("SURFACE", SwitchMode::Reattach),
    ]
}

/// Target drawn into on `frame`.
pub fn target_slot(frame: u64) -> usize {
    (frame % TARGET_COUNT as u64) as usize
}

pub fn target_extent() -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: TARGET_WIDTH,
        height: TARGET_HEIGHT,
        depth_or_array_layers: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configurations_in_switch_order() {
        let configurations = switch_configurations();
        assert_eq!(configurations.len(), 2);
        assert_eq!(configurations[0].name(), "FBO");
        assert_eq!(*configurations[1].params(), SwitchMode::Reattach);
    }

    #[test]
    fn consecutive_frames_alternate_targets() {
        let slots: Vec<_> = (1..=5).map(target_slot).collect();
        assert_eq!(slots, vec![1, 0, 1, 0, 1]);
    }

    #[test]
    fn targets_match_the_default_window() {
        assert_eq!(
            (TARGET_WIDTH, TARGET_HEIGHT),
            renderer::Lesson::WINDOW_SIZE
        );
        assert_eq!(target_extent().depth_or_array_layers, 1);
    }
}
