//! Decoder limits and buffering policy.

use serde::Deserialize;

/// Default maximum buffered size of one part (10MB).
pub const DEFAULT_MAX_PART_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum buffered size of one request (50MB).
pub const DEFAULT_MAX_TOTAL_SIZE: usize = 50 * 1024 * 1024;

/// Default maximum number of leaf fields.
pub const DEFAULT_MAX_FIELDS: usize = 1000;

/// Default maximum multipart nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Default threshold for spooling part bodies to a temporary file (1MB).
pub const DEFAULT_SPOOL_THRESHOLD: usize = 1024 * 1024;

/// Configuration for form decoding.
///
/// Hosts can embed this in their own configuration files; every key is
/// optional and falls back to its default.
///
/// ```
/// use formstore_core::FormConfig;
///
/// let config = FormConfig::new().max_part_size(1024).max_fields(10);
/// assert_eq!(config.get_max_part_size(), 1024);
/// assert_eq!(config.get_max_fields(), 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormConfig {
    /// Maximum buffered size of one leaf part in bytes.
    max_part_size: usize,
    /// Maximum buffered size of the whole request in bytes.
    max_total_size: usize,
    /// Maximum number of leaf fields (parts and query pairs).
    max_fields: usize,
    /// Maximum multipart nesting depth.
    max_depth: usize,
    /// Size above which the default buffer provider spools to disk.
    spool_threshold: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            max_part_size: DEFAULT_MAX_PART_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            max_fields: DEFAULT_MAX_FIELDS,
            max_depth: DEFAULT_MAX_DEPTH,
            spool_threshold: DEFAULT_SPOOL_THRESHOLD,
        }
    }
}

impl FormConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum part size.
    #[must_use]
    pub fn max_part_size(mut self, size: usize) -> Self {
        self.max_part_size = size;
        self
    }

    /// Set the maximum total size.
    #[must_use]
    pub fn max_total_size(mut self, size: usize) -> Self {
        self.max_total_size = size;
        self
    }

    /// Set the maximum number of fields.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }

    /// Set the maximum nesting depth.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the threshold above which part bodies are spooled to a temporary file.
    #[must_use]
    pub fn spool_threshold(mut self, size: usize) -> Self {
        self.spool_threshold = size;
        self
    }

    /// Get the maximum part size.
    #[must_use]
    pub fn get_max_part_size(&self) -> usize {
        self.max_part_size
    }

    /// Get the maximum total size.
    #[must_use]
    pub fn get_max_total_size(&self) -> usize {
        self.max_total_size
    }

    /// Get the maximum number of fields.
    #[must_use]
    pub fn get_max_fields(&self) -> usize {
        self.max_fields
    }

    /// Get the maximum nesting depth.
    #[must_use]
    pub fn get_max_depth(&self) -> usize {
        self.max_depth
    }

    /// Get the spool-to-disk threshold.
    #[must_use]
    pub fn get_spool_threshold(&self) -> usize {
        self.spool_threshold
    }
}
