use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration, deserializable from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VazaoConfig {
    pub throttler: ThrottlerConfig,
    pub service: ServiceConfig,
}

/// Throttler parameters: the overall emission budget, the per-source
/// minimum-rate floor, and the buffer capacity applied to sources
/// registered from then on.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThrottlerConfig {
    /// Target aggregate emission rate, messages per time unit.
    pub overall_rate: f64,
    /// Guaranteed floor for every source, carved out of the overall rate
    /// before weights are applied.
    pub min_rate: f64,
    /// FIFO capacity for sources registered after this value takes effect.
    /// Already-registered sources keep their original capacity.
    pub buffer_capacity: usize,
}

/// Service configuration (command channel sizing).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub command_channel_capacity: usize,
}

impl Default for ThrottlerConfig {
    fn default() -> Self {
        Self {
            overall_rate: 10.0,
            min_rate: 0.0,
            buffer_capacity: 10,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            command_channel_capacity: 10_000,
        }
    }
}

impl ThrottlerConfig {
    /// Check every field before anything is applied. A failed validation
    /// leaves the caller's state untouched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.overall_rate < 0.0 {
            return Err(ConfigError::NegativeOverallRate(self.overall_rate));
        }
        if self.min_rate < 0.0 {
            return Err(ConfigError::NegativeMinRate(self.min_rate));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroBufferCapacity);
        }
        Ok(())
    }
}
