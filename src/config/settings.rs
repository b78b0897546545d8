use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::env::{
    EnvConfig, DEFAULT_LANGUAGE_ENV, ENGINE_NAME_ENV, EVENTS_ENABLED_ENV, MAX_STEPS_ENV,
};
use crate::error::Result;
use crate::script::EXPR_LANGUAGE;
use crate::utils::validation::ConfigValidator;

/// 引擎设置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    pub engine_name: String,
    /// Language used for sequence-flow conditions.
    pub default_script_language: String,
    /// Upper bound on automatic steps (start, script tasks, flows) per transition.
    pub max_steps: u32,
    pub event_dispatcher_enabled: bool,
    /// Definition files deployed when the engine is built.
    pub definition_files: Vec<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            engine_name: "default".to_string(),
            default_script_language: EXPR_LANGUAGE.to_string(),
            max_steps: 256,
            event_dispatcher_enabled: true,
            definition_files: Vec::new(),
        }
    }
}

impl EngineSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json).context("invalid engine settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a JSON file; relative definition paths resolve against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read engine settings from {}", path.display()))?;
        let mut settings = Self::from_json(&content)?;
        if let Some(base) = path.parent() {
            for file in &mut settings.definition_files {
                if file.is_relative() {
                    *file = base.join(&*file);
                }
            }
        }
        Ok(settings)
    }

    /// Applies `PROCESSFLOW_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(name) = EnvConfig::get_env_optional(ENGINE_NAME_ENV) {
            self.engine_name = name;
        }
        if let Some(language) = EnvConfig::get_env_optional(DEFAULT_LANGUAGE_ENV) {
            self.default_script_language = language;
        }
        if let Some(max_steps) = EnvConfig::parse_optional::<u32>(MAX_STEPS_ENV)? {
            self.max_steps = max_steps;
        }
        if let Some(enabled) = EnvConfig::parse_optional::<bool>(EVENTS_ENABLED_ENV)? {
            self.event_dispatcher_enabled = enabled;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_identifier("engine name", &self.engine_name)?;
        ConfigValidator::validate_language_id(&self.default_script_language)?;
        ConfigValidator::validate_max_steps(self.max_steps)?;
        Ok(())
    }
}
