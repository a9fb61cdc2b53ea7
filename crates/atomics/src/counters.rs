use phasebench::Configuration;

/// Counters incremented by every fragment.
pub const COUNTERS: usize = 128;
const COUNTER_BYTES: u64 = std::mem::size_of::<u32>() as u64;

/// Where the per-fragment counters live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterStorage {
    /// A buffer holding only the counter array.
    CounterBuffer,
    /// Counters at the head of a general storage block, followed by a
    /// payload the shader also reads.
    StorageBlock,
}

impl CounterStorage {
    /// Size of the buffer bound at binding 3.
    pub fn buffer_size(self) -> u64 {
        match self {
            Self::CounterBuffer => COUNTERS as u64 * COUNTER_BYTES,
            Self::StorageBlock => 2 * COUNTERS as u64 * COUNTER_BYTES,
        }
    }

    /// Zeroed contents used to clear the buffer at startup.
    pub fn initial_contents(self) -> Vec<u32> {
        vec![0; (self.buffer_size() / COUNTER_BYTES) as usize]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::CounterBuffer => "atomics counter buffer",
            Self::StorageBlock => "atomics storage block",
        }
    }
}

pub fn counter_configurations() -> Vec<Configuration<CounterStorage>> {
    vec![
        Configuration::new("Atomic Counter Buffer", CounterStorage::CounterBuffer),
        Configuration::new("Shader Storage Buffer Object", CounterStorage::StorageBlock),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER_SHADER: &str = include_str!("shaders/counter_buffer.wgsl");
    const BLOCK_SHADER: &str = include_str!("shaders/storage_block.wgsl");

    #[test]
    fn two_storage_strategies() {
        let names: Vec<_> = counter_configurations()
            .iter()
            .map(|c| c.name().to_owned())
            .collect();
        assert_eq!(names, vec!["Atomic Counter Buffer", "Shader Storage Buffer Object"]);
    }

    #[test]
    fn buffer_sizes_cover_the_shader_layouts() {
        assert_eq!(CounterStorage::CounterBuffer.buffer_size(), 512);
        assert_eq!(CounterStorage::StorageBlock.buffer_size(), 1024);
        assert_eq!(CounterStorage::StorageBlock.initial_contents().len(), 2 * COUNTERS);
        assert!(CounterStorage::CounterBuffer
            .initial_contents()
            .iter()
            .all(|&value| value == 0));
    }

    #[test]
    fn shaders_agree_on_counter_count() {
        let declaration = format!("const COUNTERS: u32 = {COUNTERS}u;");
        assert!(COUNTER_SHADER.contains(&declaration));
        assert!(BLOCK_SHADER.contains(&declaration));
    }
}
