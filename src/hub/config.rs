//! Hub configuration

use crate::error::ConfigError;

/// Environment variable holding the per-direction byte quota
pub const BYTE_LIMIT_VAR: &str = "BYTE_LIMIT";

/// Default per-direction byte quota
pub const DEFAULT_BYTE_QUOTA: u64 = 100;

/// What a broadcast does when a recipient's delivery queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Wait until the recipient accepts the payload. One slow recipient
    /// stalls the control loop for everyone.
    #[default]
    Block,
    /// Evict the recipient from the registry instead of waiting
    Disconnect,
}

/// Hub and endpoint configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Cumulative bytes allowed per direction (upload and download) for
    /// every endpoint. Reaching it ends that direction with a notice.
    pub byte_quota: u64,

    /// Size of the buffer each inbound loop reads into
    pub read_buffer_size: usize,

    /// Capacity of each endpoint's delivery queue
    pub delivery_capacity: usize,

    /// Capacity of the hub's lifecycle and relay channels
    pub control_capacity: usize,

    /// Behavior when a delivery queue is full
    pub overflow_policy: OverflowPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            byte_quota: DEFAULT_BYTE_QUOTA,
            read_buffer_size: 1024,
            delivery_capacity: 16,
            control_capacity: 64,
            overflow_policy: OverflowPolicy::Block,
        }
    }
}

impl HubConfig {
    /// Create a config with the given byte quota
    pub fn with_quota(byte_quota: u64) -> Self {
        Self {
            byte_quota,
            ..Default::default()
        }
    }

    /// Load from the process environment (`BYTE_LIMIT`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    ///
    /// Absent values use the default. Invalid values are logged and also
    /// fall back to the default.
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(BYTE_LIMIT_VAR) {
            match parse_quota(BYTE_LIMIT_VAR, &value) {
                Ok(quota) => config.byte_quota = quota,
                Err(e) => {
                    tracing::warn!(error = %e, default = DEFAULT_BYTE_QUOTA, "Using default byte quota");
                }
            }
        }

        config
    }

    /// Set the byte quota
    pub fn byte_quota(mut self, quota: u64) -> Self {
        self.byte_quota = quota;
        self
    }

    /// Set the read buffer size (minimum 1)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Set the delivery queue capacity (minimum 1)
    pub fn delivery_capacity(mut self, capacity: usize) -> Self {
        self.delivery_capacity = capacity.max(1);
        self
    }

    /// Set the control channel capacity (minimum 1)
    pub fn control_capacity(mut self, capacity: usize) -> Self {
        self.control_capacity = capacity.max(1);
        self
    }

    /// Set the overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }
}

pub(crate) fn parse_quota(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidQuota {
            var,
            value: value.to_string(),
        })
}
