//! Demo settings: CLI arguments turned into validated run configurations

use crate::cli::{ChannelArgs, ValueTaskArgs, WhenAllArgs};
use conduit_async::PipelineConfig;
use conduit_common::{err, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

impl ChannelArgs {
    /// Build the pipeline configuration for this run
    ///
    /// # Errors
    ///
    /// Returns a validation error if the capacity is zero or does not fit
    /// in memory addressing on this platform.
    pub fn into_config(self) -> Result<PipelineConfig> {
        let capacity = usize::try_from(self.capacity)
            .map_err(|_| err!(validation, "capacity {} is too large", self.capacity))?;
        let config = PipelineConfig {
            capacity,
            items: self.items,
            producer_delay_ms: self.producer_delay_ms,
            consumer_delay_ms: self.consumer_delay_ms,
            fail_on: self.fail_on,
        };
        config.validate()?;
        Ok(config)
    }
}

fn default_iterations() -> u64 {
    5
}

fn default_delay_ms() -> u64 {
    150
}

/// Knobs for one `when-all` run
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhenAllConfig {
    /// Number of concurrent tasks
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    /// Each task sleeps this long before and after its failure point
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Task number that fails
    #[serde(default)]
    pub fail_on: Option<u64>,
    /// Cancel all tasks after this many milliseconds
    #[serde(default)]
    pub cancel_after_ms: Option<u64>,
}

impl Default for WhenAllConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            delay_ms: default_delay_ms(),
            fail_on: None,
            cancel_after_ms: None,
        }
    }
}

impl WhenAllConfig {
    /// Per-step task delay as a [`Duration`]
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Scheduled cancellation, if any
    #[must_use]
    pub fn cancel_after(&self) -> Option<Duration> {
        self.cancel_after_ms.map(Duration::from_millis)
    }
}

impl From<WhenAllArgs> for WhenAllConfig {
    fn from(args: WhenAllArgs) -> Self {
        Self {
            iterations: args.iterations,
            delay_ms: args.delay_ms,
            fail_on: (args.fail_on > 0).then_some(args.fail_on),
            cancel_after_ms: (args.cancel_after_ms > 0).then_some(args.cancel_after_ms),
        }
    }
}

fn default_hit_rate() -> u8 {
    80
}

fn default_seed() -> u64 {
    42
}

/// Knobs for one `valuetask` run
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValueTaskConfig {
    /// Number of lookups
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    /// Latency of a cache miss
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Percentage of lookups that hit the cache, 0..=100
    #[serde(default = "default_hit_rate")]
    pub hit_rate: u8,
    /// Seed for the hit/miss sequence
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ValueTaskConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            delay_ms: default_delay_ms(),
            hit_rate: default_hit_rate(),
            seed: default_seed(),
        }
    }
}

impl ValueTaskConfig {
    /// Check the configuration before a run
    ///
    /// # Errors
    ///
    /// Returns a validation error if `hit_rate` is above 100.
    pub fn validate(&self) -> Result<()> {
        if self.hit_rate > 100 {
            return Err(err!(validation, "hit rate {}% is above 100%", self.hit_rate));
        }
        Ok(())
    }

    /// Cache miss latency as a [`Duration`]
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl From<ValueTaskArgs> for ValueTaskConfig {
    fn from(args: ValueTaskArgs) -> Self {
        Self {
            iterations: args.iterations,
            delay_ms: args.delay_ms,
            hit_rate: args.hit_rate,
            seed: args.seed,
        }
    }
}
