//! End-to-end assembly of the artifact from a results directory.
//!
//! ```text
//! catalog + human file ─┐
//! model default files ──┼─→ aggregate_condition (per model / cell) ─→ Dataset
//! ablation manifests ───┘                                              │
//!                                        watermark → sanitize ←────────┘
//! ```
//!
//! The catalog and the human results file are required; every other input is
//! optional and skipped when absent.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use log::{info, warn};
use serde_json::Value;

use crate::aggregate::{
    AggregateOptions, ConditionAggregate, HumanAggregate, SampleMap, aggregate_condition,
    display_responses, group_samples, human_aggregates, precision, summarize,
};
use crate::canary::{
    CanaryTag, Watermarked, extract_canary_hex, insert_into_keyed, insert_into_sequence,
    wrap_keyed,
};
use crate::config::ExperimentConfig;
use crate::layout::{AblationCell, DataLayout};
use crate::output::{AblationResult, Dataset, Metadata, ValidationRecord};
use crate::records::{Item, ResponseField, Uid, parse_responses, read_items, read_jsonl};
use crate::sanitize::Sanitize;
use crate::stats::round_opt;

/// Run-level switches that are not part of the experiment topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Insert canaries when the human file carries a tag.
    pub watermark: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { watermark: true }
    }
}

/// Read-only human reference shared by every condition.
#[derive(Debug, Clone)]
pub struct HumanReference {
    /// Catalog UIDs in catalog order.
    pub universe: Vec<Uid>,
    pub samples: SampleMap,
    pub aggregates: BTreeMap<Uid, HumanAggregate>,
    pub canary: Option<CanaryTag>,
}

impl HumanReference {
    /// Build the reference from the raw human file lines.
    pub fn from_values(values: &[Value], items: &[Item], options: &AggregateOptions) -> Self {
        let universe = catalog_universe(items);
        let canary = extract_canary_hex(values);
        let records = parse_responses(values, ResponseField::Response);
        let (samples, _) = group_samples(&records, &universe);
        let aggregates = human_aggregates(&records, &universe, &samples, options);
        Self {
            universe,
            samples,
            aggregates,
            canary,
        }
    }

    /// Aggregate a set of raw lines against this reference.
    pub fn aggregate(
        &self,
        values: &[Value],
        field: ResponseField,
        options: &AggregateOptions,
    ) -> ConditionAggregate {
        let records = parse_responses(values, field);
        aggregate_condition(&records, &self.universe, &self.samples, options)
    }
}

/// Distinct catalog UIDs, first occurrence wins.
pub fn catalog_universe(items: &[Item]) -> Vec<Uid> {
    let mut seen = std::collections::BTreeSet::new();
    items
        .iter()
        .filter(|it| seen.insert(it.uid.clone()))
        .map(|it| it.uid.clone())
        .collect()
}

/// Read an optional input. Missing files and read failures are logged and
/// reported as `None`.
fn read_optional(path: &Path) -> Option<Vec<Value>> {
    match read_jsonl(path) {
        Ok(values) => Some(values),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("  SKIP {} (file not found)", path.display());
            None
        }
        Err(e) => {
            warn!("  SKIP {} ({e})", path.display());
            None
        }
    }
}

fn read_required(path: &Path, what: &str) -> io::Result<Vec<Value>> {
    read_jsonl(path).map_err(|e| {
        io::Error::new(e.kind(), format!("cannot read {what} {}: {e}", path.display()))
    })
}

/// Aggregate every existing cell of an ablation axis, in manifest order.
pub fn run_ablation(
    cells: &[AblationCell],
    human: &HumanReference,
    options: &AggregateOptions,
) -> Vec<AblationResult> {
    cells
        .iter()
        .filter_map(|cell| {
            let values = read_optional(&cell.path)?;
            let agg = human.aggregate(&values, ResponseField::Answer, options);
            Some(AblationResult::new(&cell.model, &cell.condition, agg.summary))
        })
        .collect()
}

/// Compare the hold-out human sample to the main human sample.
pub fn human_validation(
    agg: &ConditionAggregate,
    human: &HumanReference,
) -> BTreeMap<String, ValidationRecord> {
    agg.estimates
        .iter()
        .map(|(uid, e)| {
            let reference = human.aggregates.get(uid).copied().unwrap_or_default();
            let record = ValidationRecord {
                diff_entropy: round_opt(e.diff_entropy, precision::ENTROPY),
                wasserstein: round_opt(e.wasserstein, precision::WASSERSTEIN),
                median: e.point.median,
                human_median: reference.median,
                human_diff_entropy: reference.diff_entropy,
            };
            (uid.key(), record)
        })
        .collect()
}

/// Build the full artifact from a data directory.
pub fn build_dataset(
    layout: &DataLayout,
    cfg: &ExperimentConfig,
    opts: BuildOptions,
) -> io::Result<Dataset> {
    let agg_opts = AggregateOptions {
        entropy: cfg.entropy,
    };

    info!("Reading items...");
    let items = read_items(&layout.items())
        .map_err(|e| io::Error::new(e.kind(), format!("cannot read item catalog: {e}")))?;
    info!("  {} items", items.len());

    info!("Reading human data...");
    let human_raw = read_required(&layout.human_results(), "human results")?;
    let human = HumanReference::from_values(&human_raw, &items, &agg_opts);
    match &human.canary {
        Some(tag) => info!("  Canary hex: {tag}"),
        None => info!("  No canary marker found"),
    }
    let observed = human.samples.values().filter(|s| !s.is_empty()).count();
    let total: usize = human.samples.values().map(Vec::len).sum();
    info!("  {observed} UIDs, {total} total responses");

    info!("Reading model data...");
    let mut model_responses = BTreeMap::new();
    let mut model_aggregates = BTreeMap::new();
    let mut main_model_summary = BTreeMap::new();
    for model in &cfg.models {
        let Some(values) = read_optional(&layout.model_default(model)) else {
            continue;
        };
        let agg = human.aggregate(&values, ResponseField::Answer, &agg_opts);
        let observed = agg.samples.values().filter(|s| !s.is_empty()).count();
        info!("  {model}: {observed} UIDs");
        model_responses.insert(model.clone(), agg.response_arrays());
        model_aggregates.insert(model.clone(), agg.item_aggregates());
        main_model_summary.insert(model.clone(), summarize(agg.estimates.values()));
    }

    info!("Reading temperature ablation data...");
    let temperature_ablation = run_ablation(&layout.temperature_cells(cfg), &human, &agg_opts);
    info!("  {} temperature conditions", temperature_ablation.len());

    info!("Reading reasoning effort ablation data...");
    let reasoning_effort_ablation = run_ablation(&layout.effort_cells(cfg), &human, &agg_opts);
    info!(
        "  {} reasoning effort/budget conditions",
        reasoning_effort_ablation.len()
    );

    info!("Reading human validation baseline...");
    let (validation, validation_summary) = match read_optional(&layout.human_validation()) {
        Some(values) => {
            let agg = human.aggregate(&values, ResponseField::Response, &agg_opts);
            info!("  {} items with an entropy estimate", agg.summary.n_items);
            (human_validation(&agg, &human), agg.summary)
        }
        None => Default::default(),
    };

    info!("Reading persona prompt ablation data...");
    let persona_ablation = run_ablation(&layout.persona_cells(cfg), &human, &agg_opts);
    info!("  {} persona conditions", persona_ablation.len());

    info!("Assembling output...");
    let human_responses = wrap_keyed(display_responses(&human.samples));
    let human_aggregates = human
        .aggregates
        .iter()
        .map(|(uid, a)| (uid.key(), *a))
        .collect();
    let n_items = items.len();

    let (items, human_responses) = match (&human.canary, opts.watermark) {
        (Some(tag), true) => {
            info!("Inserting canary strings (hex: {tag})");
            watermark(items, human_responses, tag, cfg)
        }
        _ => (
            items.into_iter().map(Watermarked::Real).collect(),
            human_responses,
        ),
    };

    let mut dataset = Dataset {
        metadata: Metadata {
            n_items,
            models: cfg.models.clone(),
            model_display_names: cfg.model_display_names.clone(),
            description: cfg.description.clone(),
        },
        items,
        human_responses,
        human_aggregates,
        model_responses,
        model_aggregates,
        human_validation: validation,
        human_validation_summary: validation_summary,
        temperature_ablation,
        reasoning_effort_ablation,
        persona_ablation,
        main_model_summary,
    };
    dataset.sanitize();
    Ok(dataset)
}

type WatermarkedResponses = BTreeMap<String, Vec<Watermarked<Option<f64>>>>;

/// Splice canaries into the item list and the human response arrays.
pub fn watermark(
    items: Vec<Item>,
    mut human_responses: WatermarkedResponses,
    tag: &CanaryTag,
    cfg: &ExperimentConfig,
) -> (Vec<Watermarked<Item>>, WatermarkedResponses) {
    let c = cfg.canary;
    let items = insert_into_sequence(items, tag, c.item_count, c.item_seed);
    insert_into_keyed(&mut human_responses, tag, c.response_count, c.response_seed);
    (items, human_responses)
}
