//! Codec limits
//!
//! Limits are passed explicitly to encoders and decoders instead of living in
//! global state, so two codecs in the same firmware image can run with
//! different bounds.

/// Default maximum number of entries in one descriptor
pub const DEFAULT_MAX_PARAMS: usize = 255;

/// Default maximum depth of nested sub-messages
pub const DEFAULT_MAX_NESTING: usize = 8;

/// Default fixed width of an address field in bytes
pub const DEFAULT_MAX_ADDRESS_LENGTH: usize = 16;

/// Default maximum payload size of a generic object field (64 KiB)
pub const DEFAULT_MAX_OBJECT_SIZE: usize = 64 * 1024;

/// Limits shared by [`Encoder`](crate::Encoder) and [`Decoder`](crate::Decoder)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Maximum descriptor entries per message. Default: 255.
    pub max_params: usize,
    /// Maximum nesting depth of BSC sub-messages. Default: 8.
    pub max_nesting: usize,
    /// Width of an ADR field when the descriptor does not give one. Default: 16.
    pub max_address_length: usize,
    /// Upper bound on OBJ payloads regardless of descriptor. Default: 64 KiB.
    pub max_object_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_params: DEFAULT_MAX_PARAMS,
            max_nesting: DEFAULT_MAX_NESTING,
            max_address_length: DEFAULT_MAX_ADDRESS_LENGTH,
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
        }
    }
}

impl CodecConfig {
    /// Set the descriptor entry limit
    pub fn with_max_params(mut self, max_params: usize) -> Self {
        self.max_params = max_params;
        self
    }

    /// Set the nesting depth limit
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// Set the default address width
    pub fn with_max_address_length(mut self, max_address_length: usize) -> Self {
        self.max_address_length = max_address_length;
        self
    }

    /// Set the object payload limit
    pub fn with_max_object_size(mut self, max_object_size: usize) -> Self {
        self.max_object_size = max_object_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert_eq!(config.max_params, 255);
        assert_eq!(config.max_nesting, 8);
        assert_eq!(config.max_address_length, 16);
        assert_eq!(config.max_object_size, 64 * 1024);
    }

    #[test]
    fn test_builder_overrides() {
        let config = CodecConfig::default()
            .with_max_params(4)
            .with_max_nesting(1)
            .with_max_address_length(8)
            .with_max_object_size(32);
        assert_eq!(config.max_params, 4);
        assert_eq!(config.max_nesting, 1);
        assert_eq!(config.max_address_length, 8);
        assert_eq!(config.max_object_size, 32);
    }
}
