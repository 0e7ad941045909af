//! Results-directory layout and the per-axis file manifests.
//!
//! ```text
//! <data-dir>/
//!   datasets/probcopa_items.jsonl
//!   results/probcopa_human_results_annotated_CANARY.jsonl
//!   results/probcopa_random_sample_validation_round_human_results_CANARY.jsonl
//!   results/probcopa_<model>.jsonl
//!   results/temperature_experiments/<model>_temperature_<t>.jsonl
//!   results/reasoning_effort_experiments/<model>_reasoning_effort_<level>.jsonl
//!   results/reasoning_effort_experiments/<model>_thinking_budget_<budget>.jsonl
//!   results/persona_prompt_experiments/<model>_structured_personas_<type>.jsonl
//! ```

use std::path::{Path, PathBuf};

use crate::config::ExperimentConfig;

/// Condition attached to an ablation cell.
#[derive(Debug, Clone, PartialEq)]
pub enum AblationCondition {
    Temperature(f64),
    /// Label such as `effort_high` or `budget_2048`.
    Effort(String),
    Persona(String),
}

/// One (model, condition) cell of an ablation axis and the file that holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct AblationCell {
    pub model: String,
    pub condition: AblationCondition,
    pub path: PathBuf,
}

/// Paths under a data directory.
#[derive(Debug, Clone)]
pub struct DataLayout {
    results: PathBuf,
    datasets: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let root = data_dir.as_ref();
        Self {
            results: root.join("results"),
            datasets: root.join("datasets"),
        }
    }

    pub fn items(&self) -> PathBuf {
        self.datasets.join("probcopa_items.jsonl")
    }

    pub fn human_results(&self) -> PathBuf {
        self.results.join("probcopa_human_results_annotated_CANARY.jsonl")
    }

    pub fn human_validation(&self) -> PathBuf {
        self.results
            .join("probcopa_random_sample_validation_round_human_results_CANARY.jsonl")
    }

    pub fn model_default(&self, model: &str) -> PathBuf {
        self.results.join(format!("probcopa_{model}.jsonl"))
    }

    fn temperature_dir(&self) -> PathBuf {
        self.results.join("temperature_experiments")
    }

    fn effort_dir(&self) -> PathBuf {
        self.results.join("reasoning_effort_experiments")
    }

    fn persona_dir(&self) -> PathBuf {
        self.results.join("persona_prompt_experiments")
    }

    /// Every (temperature model, temperature) cell, models outermost.
    pub fn temperature_cells(&self, cfg: &ExperimentConfig) -> Vec<AblationCell> {
        let dir = self.temperature_dir();
        cfg.temperature_models
            .iter()
            .flat_map(|model| {
                let dir = &dir;
                cfg.temperatures.iter().map(move |&t| AblationCell {
                    model: model.clone(),
                    condition: AblationCondition::Temperature(t),
                    path: dir.join(format!("{model}_temperature_{t:.1}.jsonl")),
                })
            })
            .collect()
    }

    /// Reasoning-effort cells followed by thinking-budget cells.
    pub fn effort_cells(&self, cfg: &ExperimentConfig) -> Vec<AblationCell> {
        let dir = self.effort_dir();
        let effort = cfg.reasoning_effort.iter().flat_map(|(model, levels)| {
            let dir = &dir;
            levels.iter().map(move |level| AblationCell {
                model: model.clone(),
                condition: AblationCondition::Effort(format!("effort_{level}")),
                path: dir.join(format!("{model}_reasoning_effort_{level}.jsonl")),
            })
        });
        let budget = cfg.thinking_budget.iter().flat_map(|(model, budgets)| {
            let dir = &dir;
            budgets.iter().map(move |budget| AblationCell {
                model: model.clone(),
                condition: AblationCondition::Effort(format!("budget_{budget}")),
                path: dir.join(format!("{model}_thinking_budget_{budget}.jsonl")),
            })
        });
        effort.chain(budget).collect()
    }

    /// Every (model, persona type) cell over the baseline models.
    pub fn persona_cells(&self, cfg: &ExperimentConfig) -> Vec<AblationCell> {
        let dir = self.persona_dir();
        cfg.models
            .iter()
            .flat_map(|model| {
                let dir = &dir;
                cfg.persona_types.iter().map(move |ptype| AblationCell {
                    model: model.clone(),
                    condition: AblationCondition::Persona(ptype.clone()),
                    path: dir.join(format!("{model}_structured_personas_{ptype}.jsonl")),
                })
            })
            .collect()
    }
}
