//! Per-condition aggregation.
//!
//! One pure function, [`aggregate_condition`], turns the response records of a
//! single (respondent, condition) pair into per-item estimates and a
//! condition-level roll-up. Every ablation axis, every model default run and
//! the human validation sample go through it unchanged; only the input records
//! and the label attached by the caller differ.
//!
//! Estimates are kept unrounded internally; rounding happens when converting
//! to the output records ([`ItemAggregate`], [`ConditionSummary`]).

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::divergence::wasserstein_distance;
use crate::entropy::{EntropyConfig, estimate_differential_entropy};
use crate::records::{HumanAnnotation, ResponseRecord, Uid};
use crate::sanitize::Sanitize;
use crate::stats::{self, PointEstimates, round_opt};

/// Per-UID response samples.
pub type SampleMap = BTreeMap<Uid, Vec<f64>>;

/// Decimal places used in the output.
pub mod precision {
    pub const MEAN: i32 = 2;
    pub const STD: i32 = 2;
    pub const ENTROPY: i32 = 4;
    pub const WASSERSTEIN: i32 = 2;
    pub const TOKENS: i32 = 1;
    pub const RESPONSE: i32 = 1;
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Unrounded estimates for one item under one condition.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ItemEstimates {
    /// Size of the response sample.
    pub n: usize,
    pub point: PointEstimates,
    pub diff_entropy: Option<f64>,
    /// Distance to the human default-condition sample.
    pub wasserstein: Option<f64>,
    pub mean_reasoning_tokens: Option<f64>,
}

/// Output record for one item under one condition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ItemAggregate {
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub diff_entropy: Option<f64>,
    pub wasserstein: Option<f64>,
    pub mean_reasoning_tokens: Option<f64>,
}

impl From<&ItemEstimates> for ItemAggregate {
    fn from(e: &ItemEstimates) -> Self {
        Self {
            median: e.point.median,
            mean: round_opt(e.point.mean, precision::MEAN),
            std: round_opt(e.point.std, precision::STD),
            diff_entropy: round_opt(e.diff_entropy, precision::ENTROPY),
            wasserstein: round_opt(e.wasserstein, precision::WASSERSTEIN),
            mean_reasoning_tokens: round_opt(e.mean_reasoning_tokens, precision::TOKENS),
        }
    }
}

impl Sanitize for ItemAggregate {
    fn sanitize(&mut self) {
        self.median.sanitize();
        self.mean.sanitize();
        self.std.sanitize();
        self.diff_entropy.sanitize();
        self.wasserstein.sanitize();
        self.mean_reasoning_tokens.sanitize();
    }
}

/// Condition-level roll-up across the item universe.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ConditionSummary {
    pub mean_entropy: Option<f64>,
    pub median_entropy: Option<f64>,
    pub mean_wasserstein: Option<f64>,
    pub median_wasserstein: Option<f64>,
    /// Items with a present entropy estimate.
    pub n_items: usize,
}

impl Sanitize for ConditionSummary {
    fn sanitize(&mut self) {
        self.mean_entropy.sanitize();
        self.median_entropy.sanitize();
        self.mean_wasserstein.sanitize();
        self.median_wasserstein.sanitize();
    }
}

/// Everything computed for one (respondent, condition) pair.
#[derive(Debug, Clone, Default)]
pub struct ConditionAggregate {
    /// One entry per universe UID, including UIDs with no data.
    pub estimates: BTreeMap<Uid, ItemEstimates>,
    /// Coerced samples per universe UID (empty when unobserved).
    pub samples: SampleMap,
    pub summary: ConditionSummary,
}

impl ConditionAggregate {
    /// Rounded output records keyed by UID string.
    pub fn item_aggregates(&self) -> BTreeMap<String, ItemAggregate> {
        self.estimates
            .iter()
            .map(|(uid, e)| (uid.key(), ItemAggregate::from(e)))
            .collect()
    }

    /// Response arrays rounded for display, keyed by UID string.
    pub fn response_arrays(&self) -> BTreeMap<String, Vec<Option<f64>>> {
        display_responses(&self.samples)
    }
}

/// Knobs for [`aggregate_condition`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AggregateOptions {
    pub entropy: EntropyConfig,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Group coerced values (and reasoning-token counts) by UID, restricted to the
/// universe. Absent values are dropped.
pub fn group_samples(records: &[ResponseRecord], universe: &[Uid]) -> (SampleMap, SampleMap) {
    let mut values: SampleMap = universe.iter().map(|u| (u.clone(), Vec::new())).collect();
    let mut tokens: SampleMap = SampleMap::new();
    let mut outside = 0usize;
    for rec in records {
        let Some(sample) = values.get_mut(&rec.uid) else {
            outside += 1;
            continue;
        };
        if let Some(v) = rec.value {
            sample.push(v);
        }
        if let Some(t) = rec.reasoning_tokens {
            tokens.entry(rec.uid.clone()).or_default().push(t);
        }
    }
    if outside > 0 {
        debug!("ignored {outside} record(s) with a UID outside the catalog");
    }
    (values, tokens)
}

/// Estimates for a single sample.
pub fn estimate_item(
    sample: &[f64],
    human: Option<&[f64]>,
    tokens: Option<&[f64]>,
    options: &AggregateOptions,
) -> ItemEstimates {
    ItemEstimates {
        n: sample.len(),
        point: stats::point_estimates(sample),
        diff_entropy: estimate_differential_entropy(sample, &options.entropy),
        wasserstein: human.and_then(|h| wasserstein_distance(sample, h)),
        mean_reasoning_tokens: tokens.and_then(stats::mean),
    }
}

/// Aggregate one condition's records over the full item universe.
///
/// `human` holds the human default-condition samples used as the divergence
/// reference; it is only read.
pub fn aggregate_condition(
    records: &[ResponseRecord],
    universe: &[Uid],
    human: &SampleMap,
    options: &AggregateOptions,
) -> ConditionAggregate {
    let (samples, tokens) = group_samples(records, universe);
    let estimates: BTreeMap<Uid, ItemEstimates> = samples
        .iter()
        .map(|(uid, sample)| {
            let est = estimate_item(
                sample,
                human.get(uid).map(Vec::as_slice),
                tokens.get(uid).map(Vec::as_slice),
                options,
            );
            (uid.clone(), est)
        })
        .collect();
    let summary = summarize(estimates.values());
    ConditionAggregate {
        estimates,
        samples,
        summary,
    }
}

/// Roll item estimates up into a condition summary.
///
/// Only present estimates contribute; items without data are skipped, never
/// counted as zero.
pub fn summarize<'a>(estimates: impl IntoIterator<Item = &'a ItemEstimates>) -> ConditionSummary {
    let mut entropies = Vec::new();
    let mut distances = Vec::new();
    for e in estimates {
        entropies.extend(e.diff_entropy);
        distances.extend(e.wasserstein);
    }
    ConditionSummary {
        mean_entropy: round_opt(stats::mean(&entropies), precision::ENTROPY),
        median_entropy: round_opt(stats::median(&entropies), precision::ENTROPY),
        mean_wasserstein: round_opt(stats::mean(&distances), precision::WASSERSTEIN),
        median_wasserstein: round_opt(stats::median(&distances), precision::WASSERSTEIN),
        n_items: entropies.len(),
    }
}

/// Round every response for display.
pub fn display_responses(samples: &SampleMap) -> BTreeMap<String, Vec<Option<f64>>> {
    samples
        .iter()
        .map(|(uid, vals)| {
            let rounded = vals
                .iter()
                .map(|&v| Some(stats::round_to(v, precision::RESPONSE)))
                .collect();
            (uid.key(), rounded)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Human aggregates
// ---------------------------------------------------------------------------

/// Human per-item statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HumanAggregate {
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub diff_entropy: Option<f64>,
}

impl Sanitize for HumanAggregate {
    fn sanitize(&mut self) {
        self.median.sanitize();
        self.mean.sanitize();
        self.std.sanitize();
        self.diff_entropy.sanitize();
    }
}

/// Human aggregates for every universe UID.
///
/// The published human file carries per-item statistics on each record; the
/// first record of a UID supplies them. Any statistic missing there is
/// computed from the sample instead.
pub fn human_aggregates(
    records: &[ResponseRecord],
    universe: &[Uid],
    samples: &SampleMap,
    options: &AggregateOptions,
) -> BTreeMap<Uid, HumanAggregate> {
    let mut annotations: BTreeMap<&Uid, HumanAnnotation> = BTreeMap::new();
    for rec in records {
        annotations.entry(&rec.uid).or_insert(rec.annotation);
    }

    universe
        .iter()
        .map(|uid| {
            let ann = annotations.get(uid).copied().unwrap_or_default();
            let sample = samples.get(uid).map(Vec::as_slice).unwrap_or(&[]);
            let point = stats::point_estimates(sample);
            let agg = HumanAggregate {
                median: ann.median.or(point.median),
                mean: round_opt(ann.mean.or(point.mean), precision::MEAN),
                std: round_opt(ann.std.or(point.std), precision::STD),
                diff_entropy: round_opt(
                    ann.diff_entropy
                        .or_else(|| estimate_differential_entropy(sample, &options.entropy)),
                    precision::ENTROPY,
                ),
            };
            (uid.clone(), agg)
        })
        .collect()
}
