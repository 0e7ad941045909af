//! # probcopa-core
//!
//! Turns raw ProbCOPA result files (human annotations and model answers to
//! probabilistic reasoning items) into the single `data.json` artifact the
//! interactive demo loads.
//!
//! ## Quick Start
//!
//! ```no_run
//! use probcopa_core::{BuildOptions, DataLayout, ExperimentConfig, build_dataset, write_dataset};
//!
//! let layout = DataLayout::new("./data");
//! let cfg = ExperimentConfig::default();
//! let dataset = build_dataset(&layout, &cfg, BuildOptions::default())?;
//! write_dataset(&dataset, "data.json".as_ref(), false)?;
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## Architecture
//!
//! records → aggregate (entropy + divergence per item) → output → canary → sanitize
//!
//! Every condition, whether a model default run, an ablation cell or the human
//! validation sample, goes through [`aggregate_condition`] against the same
//! human reference samples.

pub mod aggregate;
pub mod canary;
pub mod coerce;
pub mod config;
pub mod divergence;
pub mod entropy;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod sanitize;
pub mod stats;

pub use aggregate::{
    AggregateOptions, ConditionAggregate, ConditionSummary, HumanAggregate, ItemAggregate,
    ItemEstimates, aggregate_condition, summarize,
};
pub use canary::{
    Canary, CanaryConfig, CanaryTag, Watermarked, extract_canary_hex, insert_into_keyed,
    insert_into_sequence,
};
pub use coerce::coerce_f64;
pub use config::{ExperimentConfig, Level, load_config_from_path};
pub use divergence::wasserstein_distance;
pub use entropy::{EntropyConfig, EntropyMethod, estimate_differential_entropy};
pub use layout::{AblationCell, AblationCondition, DataLayout};
pub use output::{AblationResult, Dataset, Metadata, ValidationRecord, write_dataset};
pub use pipeline::{BuildOptions, HumanReference, build_dataset};
pub use records::{Item, ResponseField, ResponseRecord, Uid, read_jsonl};
pub use sanitize::{Sanitize, sanitize};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
