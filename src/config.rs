/// This structure contains the configuration settings for a [`crate::Heap`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GcConfig {
    /// The number of bytes that may be allocated since the previous
    /// collection before the next allocation triggers a collection. The
    /// allocation that crosses this threshold is not itself counted.
    pub collect_threshold: usize,
}

pub const GC_CONFIG_DEFAULT_COLLECT_THRESHOLD: usize = 8 * 1024 * 1024;

impl GcConfig {
    /// Creates a default GcConfig. Good for most use cases.
    pub const fn new() -> Self {
        GcConfig {
            collect_threshold: GC_CONFIG_DEFAULT_COLLECT_THRESHOLD,
        }
    }

    pub const fn with_collect_threshold(mut self, bytes: usize) -> Self {
        self.collect_threshold = bytes;
        self
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self::new()
    }
}
