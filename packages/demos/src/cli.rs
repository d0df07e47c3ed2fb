//! CLI command definitions

use crate::settings::{ValueTaskConfig, WhenAllConfig};
use clap::{Args, Parser, Subcommand};
use conduit_async::PipelineConfig;
use log::LevelFilter;

/// Top-level arguments shared by every demo
#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(about = "Bounded producer/consumer and task aggregation demos")]
#[command(version)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level implied by the flags
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Available demos
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// List available demos
    List,

    /// Show where a task suspends and which worker thread resumes it
    ///
    /// Example usage:
    ///   conduit await-basics --iterations 3 --delay-ms 100
    AwaitBasics(AwaitBasicsArgs),

    /// Producer/consumer over a bounded queue with backpressure and cancellation
    ///
    /// The producer generates items 1..=N and waits whenever the queue is
    /// full; the consumer drains it until the producer closes the queue.
    ///
    /// Example usage:
    ///   conduit channel --capacity 2 --items 10
    ///   conduit channel --fail-on 7
    Channel(ChannelArgs),

    /// Run tasks concurrently, aggregating faults and honoring cancellation
    ///
    /// Example usage:
    ///   conduit when-all --iterations 5 --fail-on 3
    ///   conduit when-all --cancel-after-ms 200
    #[command(alias = "task-whenall")]
    WhenAll(WhenAllArgs),

    /// Count futures that were ready on first poll versus ones that waited
    ///
    /// A seeded generator decides which lookups hit the cache, so a given
    /// seed always gives the same split.
    ///
    /// Example usage:
    ///   conduit valuetask --iterations 20 --hit-rate 50 --seed 7
    #[command(name = "valuetask")]
    ValueTask(ValueTaskArgs),
}

/// Knobs for the `channel` demo
#[derive(Clone, Debug, Args)]
pub struct ChannelArgs {
    /// Queue capacity
    #[arg(long, default_value_t = PipelineConfig::default().capacity as u64,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub capacity: u64,

    /// Number of items to produce
    #[arg(long, default_value_t = PipelineConfig::default().items)]
    pub items: u64,

    /// Delay before producing each item
    #[arg(long, value_name = "MS", default_value_t = PipelineConfig::default().producer_delay_ms)]
    pub producer_delay_ms: u64,

    /// Delay after consuming each item
    #[arg(long, value_name = "MS", default_value_t = PipelineConfig::default().consumer_delay_ms)]
    pub consumer_delay_ms: u64,

    /// Make the producer fail at this item
    #[arg(long, value_name = "N")]
    pub fail_on: Option<u64>,
}

/// Knobs for the `when-all` demo
#[derive(Clone, Debug, Args)]
pub struct WhenAllArgs {
    /// Number of tasks to run
    #[arg(long, default_value_t = WhenAllConfig::default().iterations)]
    pub iterations: u64,

    /// Delay each task waits, twice
    #[arg(long, value_name = "MS", default_value_t = WhenAllConfig::default().delay_ms)]
    pub delay_ms: u64,

    /// Task number that fails (0 = none)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub fail_on: u64,

    /// Cancel all tasks after this long (0 = never)
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub cancel_after_ms: u64,
}

/// Knobs for the `await-basics` demo
#[derive(Clone, Debug, Args)]
pub struct AwaitBasicsArgs {
    /// Number of suspension points
    #[arg(long, default_value_t = 5)]
    pub iterations: u64,

    /// Sleep at each suspension point
    #[arg(long, value_name = "MS", default_value_t = 150)]
    pub delay_ms: u64,
}

/// Knobs for the `valuetask` demo
#[derive(Clone, Debug, Args)]
pub struct ValueTaskArgs {
    /// Number of lookups
    #[arg(long, default_value_t = ValueTaskConfig::default().iterations)]
    pub iterations: u64,

    /// Latency of a cache miss
    #[arg(long, value_name = "MS", default_value_t = ValueTaskConfig::default().delay_ms)]
    pub delay_ms: u64,

    /// Percentage of lookups served from the cache
    #[arg(long, value_name = "PERCENT", default_value_t = ValueTaskConfig::default().hit_rate,
          value_parser = clap::value_parser!(u8).range(0..=100))]
    pub hit_rate: u8,

    /// Seed for the hit/miss sequence
    #[arg(long, value_name = "N", default_value_t = ValueTaskConfig::default().seed)]
    pub seed: u64,
}
