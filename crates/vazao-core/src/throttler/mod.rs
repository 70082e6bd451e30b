mod allocator;
mod source;
mod stats;

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::config::ThrottlerConfig;
use crate::error::{BufferError, ConfigError, RegisterError, WeightError};

use source::SourceState;

pub use stats::{SourceStats, ThrottlerStats};

/// Weighted multi-source throttler. Producers buffer messages per source
/// key; each `poll` emits at most one message so that the aggregate rate
/// approaches the configured budget while every source keeps a weighted,
/// minimum-guaranteed share of it.
///
/// Runs single-threaded with no internal synchronization — intended to be
/// owned by one thread (see `ThrottleService` for the concurrent front end).
pub struct Throttler<M> {
    config: ThrottlerConfig,
    /// Ordered so the poll scan and the tie-break candidate list are
    /// deterministic for a given seed.
    registry: BTreeMap<String, SourceState<M>>,
    rng: StdRng,
}

impl<M> Throttler<M> {
    /// Create a throttler with an OS-seeded tie-break RNG.
    pub fn new(config: ThrottlerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: BTreeMap::new(),
            rng: StdRng::from_os_rng(),
        })
    }

    /// Create a throttler with an injected RNG seed, so tie-break choices
    /// replay identically across runs.
    pub fn with_seed(config: ThrottlerConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: BTreeMap::new(),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &ThrottlerConfig {
        &self.config
    }

    /// Replace the full configuration. All fields are validated before any
    /// of them is applied; allocations are recomputed afterwards.
    ///
    /// Changing the buffer capacity never resizes already-registered
    /// sources — the new value applies to subsequent registrations only.
    pub fn configure(&mut self, config: ThrottlerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config.buffer_capacity != self.config.buffer_capacity && !self.registry.is_empty() {
            warn!(
                new_capacity = config.buffer_capacity,
                sources = self.registry.len(),
                "buffer capacity change does not resize existing source buffers"
            );
        }
        self.config = config;
        self.recompute_rates();
        Ok(())
    }

    pub fn set_overall_rate(&mut self, rate: f64) -> Result<(), ConfigError> {
        if rate < 0.0 {
            return Err(ConfigError::NegativeOverallRate(rate));
        }
        self.config.overall_rate = rate;
        self.recompute_rates();
        Ok(())
    }

    pub fn set_min_rate(&mut self, rate: f64) -> Result<(), ConfigError> {
        if rate < 0.0 {
            return Err(ConfigError::NegativeMinRate(rate));
        }
        self.config.min_rate = rate;
        self.recompute_rates();
        Ok(())
    }

    /// Set the buffer capacity for sources registered from now on.
    /// Allocations are unaffected, so no recompute happens here.
    pub fn set_buffer_capacity(&mut self, capacity: usize) -> Result<(), ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroBufferCapacity);
        }
        if capacity != self.config.buffer_capacity && !self.registry.is_empty() {
            warn!(
                new_capacity = capacity,
                sources = self.registry.len(),
                "buffer capacity change does not resize existing source buffers"
            );
        }
        self.config.buffer_capacity = capacity;
        Ok(())
    }

    /// Register a source under the current buffer capacity, with zero
    /// weight. Sources are never unregistered.
    pub fn register_source(&mut self, key: impl Into<String>) -> Result<(), RegisterError> {
        let key = key.into();
        if self.registry.contains_key(&key) {
            return Err(RegisterError::DuplicateKey(key));
        }
        self.registry
            .insert(key, SourceState::new(self.config.buffer_capacity));
        self.recompute_rates();
        Ok(())
    }

    pub fn set_weight(&mut self, key: &str, weight: f64) -> Result<(), WeightError> {
        let source = self
            .registry
            .get_mut(key)
            .ok_or_else(|| WeightError::UnknownKey(key.to_string()))?;
        if weight < 0.0 {
            return Err(WeightError::NegativeWeight(key.to_string(), weight));
        }
        source.set_weight(weight);
        self.recompute_rates();
        Ok(())
    }

    /// Buffer a message for `key`. At capacity the source's oldest message
    /// is dropped to make room.
    pub fn buffer(&mut self, key: &str, message: M) -> Result<(), BufferError> {
        let source = self
            .registry
            .get_mut(key)
            .ok_or_else(|| BufferError::UnknownKey(key.to_string()))?;
        source.push(message);
        Ok(())
    }

    /// Emit at most one message at time `now`.
    ///
    /// Every source is scored with its eligible count; the highest score
    /// wins, with ties broken uniformly at random. Returns `None` when no
    /// source has both backlog and elapsed-time credit — a normal outcome,
    /// not an error.
    pub fn poll(&mut self, now: f64) -> Option<(String, M)> {
        if self.registry.is_empty() {
            return None;
        }

        let mut max_score = 0u64;
        let mut tied: Vec<String> = Vec::new();
        for (key, source) in &self.registry {
            let score = source.eligible(now);
            if score == 0 || score < max_score {
                continue;
            }
            if score > max_score {
                max_score = score;
                tied.clear();
            }
            tied.push(key.clone());
        }
        if max_score == 0 {
            return None;
        }

        let idx = if tied.len() == 1 {
            0
        } else {
            self.rng.random_range(0..tied.len())
        };
        let winner = tied.swap_remove(idx);
        let message = self.registry.get_mut(&winner)?.pop_oldest(now)?;
        Some((winner, message))
    }

    /// Snapshot of the current configuration and per-source state,
    /// in registry order.
    pub fn stats(&self) -> ThrottlerStats {
        ThrottlerStats {
            overall_rate: self.config.overall_rate,
            min_rate: self.config.min_rate,
            source_count: self.registry.len(),
            per_source: self
                .registry
                .iter()
                .map(|(key, source)| SourceStats {
                    key: key.clone(),
                    weight: source.weight(),
                    allocated_rate: source.allocated_rate(),
                    backlog: source.backlog(),
                    last_emit: source.last_emit(),
                })
                .collect(),
        }
    }

    pub fn source_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Full recompute of every source's allocation from the current
    /// weights and budget. Registries are small and parameter changes
    /// infrequent, so nothing incremental is attempted.
    fn recompute_rates(&mut self) {
        if self.registry.is_empty() {
            return;
        }
        let plan = allocator::plan(
            self.config.overall_rate,
            self.config.min_rate,
            self.registry.len(),
        );
        if plan.overconstrained {
            warn!(
                min_rate = self.config.min_rate,
                sources = self.registry.len(),
                overall_rate = self.config.overall_rate,
                "min-rate floor exceeds the overall budget, degrading to equal shares"
            );
        }
        let mut weight_sum: f64 = self.registry.values().map(|s| s.weight()).sum();
        if weight_sum == 0.0 {
            weight_sum = 1.0;
        }
        for source in self.registry.values_mut() {
            let rate = allocator::share(plan, source.weight(), weight_sum);
            source.set_allocated_rate(rate);
        }
    }
}
