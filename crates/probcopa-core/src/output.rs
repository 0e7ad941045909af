//! The published artifact (`data.json`) and its writer.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::aggregate::{ConditionSummary, HumanAggregate, ItemAggregate};
use crate::canary::Watermarked;
use crate::layout::AblationCondition;
use crate::records::Item;
use crate::sanitize::Sanitize;

/// Response arrays keyed by UID string.
pub type ResponseArrays = BTreeMap<String, Vec<Option<f64>>>;

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub n_items: usize,
    pub models: Vec<String>,
    pub model_display_names: BTreeMap<String, String>,
    pub description: String,
}

/// Hold-out human sample compared to the main human sample, per item.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ValidationRecord {
    pub diff_entropy: Option<f64>,
    pub wasserstein: Option<f64>,
    pub median: Option<f64>,
    pub human_median: Option<f64>,
    pub human_diff_entropy: Option<f64>,
}

impl Sanitize for ValidationRecord {
    fn sanitize(&mut self) {
        self.diff_entropy.sanitize();
        self.wasserstein.sanitize();
        self.median.sanitize();
        self.human_median.sanitize();
        self.human_diff_entropy.sanitize();
    }
}

/// One row of an ablation table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AblationResult {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_type: Option<String>,
    #[serde(flatten)]
    pub summary: ConditionSummary,
}

impl AblationResult {
    pub fn new(model: &str, condition: &AblationCondition, summary: ConditionSummary) -> Self {
        let mut row = Self {
            model: model.to_string(),
            temperature: None,
            condition: None,
            persona_type: None,
            summary,
        };
        match condition {
            AblationCondition::Temperature(t) => row.temperature = Some(*t),
            AblationCondition::Effort(label) => row.condition = Some(label.clone()),
            AblationCondition::Persona(p) => row.persona_type = Some(p.clone()),
        }
        row
    }
}

impl Sanitize for AblationResult {
    fn sanitize(&mut self) {
        self.temperature.sanitize();
        self.summary.sanitize();
    }
}

/// The whole output document.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub metadata: Metadata,
    pub items: Vec<Watermarked<Item>>,
    pub human_responses: BTreeMap<String, Vec<Watermarked<Option<f64>>>>,
    pub human_aggregates: BTreeMap<String, HumanAggregate>,
    pub model_responses: BTreeMap<String, ResponseArrays>,
    pub model_aggregates: BTreeMap<String, BTreeMap<String, ItemAggregate>>,
    pub human_validation: BTreeMap<String, ValidationRecord>,
    pub human_validation_summary: ConditionSummary,
    pub temperature_ablation: Vec<AblationResult>,
    pub reasoning_effort_ablation: Vec<AblationResult>,
    pub persona_ablation: Vec<AblationResult>,
    pub main_model_summary: BTreeMap<String, ConditionSummary>,
}

impl Sanitize for Dataset {
    fn sanitize(&mut self) {
        self.items.sanitize();
        self.human_responses.sanitize();
        self.human_aggregates.sanitize();
        self.model_responses.sanitize();
        self.model_aggregates.sanitize();
        self.human_validation.sanitize();
        self.human_validation_summary.sanitize();
        self.temperature_ablation.sanitize();
        self.reasoning_effort_ablation.sanitize();
        self.persona_ablation.sanitize();
        self.main_model_summary.sanitize();
    }
}

/// Serialize `dataset` to `path` and return the written size in bytes.
///
/// Output is compact unless `pretty` is set.
pub fn write_dataset(dataset: &Dataset, path: &Path, pretty: bool) -> io::Result<u64> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let result = if pretty {
        serde_json::to_writer_pretty(&mut writer, dataset)
    } else {
        serde_json::to_writer(&mut writer, dataset)
    };
    result.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    writer.flush()?;
    Ok(fs::metadata(path)?.len())
}
