//! Experiment topology: which models ran under which conditions.
//!
//! The defaults describe the published ProbCOPA runs. A JSON file can override
//! any subset of fields; unspecified fields keep their defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canary::CanaryConfig;
use crate::entropy::EntropyConfig;

/// A reasoning-effort level or thinking budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Level {
    Tokens(u64),
    Named(String),
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Tokens(t) => write!(f, "{t}"),
            Level::Named(s) => f.write_str(s),
        }
    }
}

/// Full run configuration passed into the pipeline at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Baseline models, in display order.
    pub models: Vec<String>,
    pub model_display_names: BTreeMap<String, String>,
    pub temperatures: Vec<f64>,
    /// Models run under every temperature.
    pub temperature_models: Vec<String>,
    /// Model → reasoning-effort levels. Ordered as listed.
    pub reasoning_effort: Vec<(String, Vec<Level>)>,
    /// Model → thinking-token budgets. Ordered as listed.
    pub thinking_budget: Vec<(String, Vec<Level>)>,
    pub persona_types: Vec<String>,
    pub description: String,
    pub entropy: EntropyConfig,
    pub canary: CanaryConfig,
}

fn strings(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
}

fn named(xs: &[&str]) -> Vec<Level> {
    xs.iter().map(|s| Level::Named(s.to_string())).collect()
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let models = strings(&[
            "gpt-5",
            "claude-sonnet-4.5",
            "DeepSeek-R1",
            "gemini-3-pro-preview",
            "Kimi-K2-Thinking",
            "Qwen3-235B-Thinking",
            "GLM-4.6",
            "grok-4.1-fast",
        ]);
        let model_display_names = [
            ("gpt-5", "GPT-5"),
            ("claude-sonnet-4.5", "Claude Sonnet 4.5"),
            ("DeepSeek-R1", "DeepSeek-R1"),
            ("gemini-3-pro-preview", "Gemini-3"),
            ("Kimi-K2-Thinking", "Kimi-K2"),
            ("Qwen3-235B-Thinking", "Qwen3-235B"),
            ("GLM-4.6", "GLM-4.6"),
            ("grok-4.1-fast", "Grok-4.1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let effort = named(&["low", "medium", "high"]);
        let reasoning_effort = [
            "DeepSeek-R1",
            "GLM-4.6",
            "Kimi-K2-Thinking",
            "Qwen3-235B-Thinking",
            "claude-opus-4.6",
            "gpt-5",
        ]
        .into_iter()
        .map(|m| (m.to_string(), effort.clone()))
        .collect();

        let budgets = vec![Level::Tokens(512), Level::Tokens(2048), Level::Tokens(4096)];
        let thinking_budget = ["claude-sonnet-4.5", "gemini-3-pro-preview"]
            .into_iter()
            .map(|m| (m.to_string(), budgets.clone()))
            .collect();

        Self {
            models,
            model_display_names,
            temperatures: vec![0.4, 0.8, 1.2, 1.6, 2.0],
            temperature_models: strings(&[
                "DeepSeek-R1",
                "GLM-4.6",
                "Kimi-K2-Thinking",
                "Qwen3-235B-Thinking",
                "gemini-3-pro-preview",
                "grok-4.1-fast",
            ]),
            reasoning_effort,
            thinking_budget,
            persona_types: strings(&["demographic", "psychological"]),
            description: "ProbCOPA: Probabilistic Inferences in Humans and LLMs".to_string(),
            entropy: EntropyConfig::default(),
            canary: CanaryConfig::default(),
        }
    }
}

/// Load a config override from a JSON file.
pub fn load_config_from_path(path: &Path) -> std::io::Result<ExperimentConfig> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str::<ExperimentConfig>(&raw).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("failed to parse config JSON: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::EntropyMethod;

    #[test]
    fn default_topology() {
        let cfg = ExperimentConfig::default();
        assert_eq!(cfg.models.len(), 8);
        assert_eq!(cfg.model_display_names.len(), 8);
        assert!(cfg.models.iter().all(|m| cfg.model_display_names.contains_key(m)));
        assert_eq!(cfg.temperatures.len(), 5);
        assert_eq!(cfg.temperature_models.len(), 6);
        assert_eq!(cfg.reasoning_effort.len(), 6);
        assert_eq!(cfg.thinking_budget[0].1, vec![Level::Tokens(512), Level::Tokens(2048), Level::Tokens(4096)]);
        assert_eq!(cfg.persona_types, vec!["demographic", "psychological"]);
        assert_eq!(cfg.entropy.seed, 3535);
        assert_eq!(cfg.canary.item_seed, 42);
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(
            &path,
            r#"{"models": ["m1"], "entropy": {"method": "vasicek"}, "thinking_budget": [["m1", [1024]]]}"#,
        )
        .unwrap();
        let cfg = load_config_from_path(&path).unwrap();
        assert_eq!(cfg.models, vec!["m1"]);
        assert_eq!(cfg.entropy.method, EntropyMethod::Vasicek);
        assert_eq!(cfg.entropy.sigma, 0.1);
        assert_eq!(cfg.thinking_budget, vec![("m1".to_string(), vec![Level::Tokens(1024)])]);
        assert_eq!(cfg.persona_types.len(), 2);
    }

    #[test]
    fn bad_json_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, "{models: ").unwrap();
        let err = load_config_from_path(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn level_display() {
        assert_eq!(Level::Tokens(2048).to_string(), "2048");
        assert_eq!(Level::Named("high".into()).to_string(), "high");
    }
}
