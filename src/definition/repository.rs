use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::info;

use crate::definition::types::ProcessDefinition;
use crate::error::{EngineError, Result};

/// 已部署的流程定义
#[derive(Default)]
pub struct DefinitionRepository {
    definitions: RwLock<HashMap<String, Arc<ProcessDefinition>>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionDocument {
    Many(Vec<ProcessDefinition>),
    One(Box<ProcessDefinition>),
}

impl DefinitionRepository {
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
        }
    }

    /// Validates and deploys `definition`, replacing any definition with the same id.
    pub fn deploy(&self, definition: ProcessDefinition) -> Result<Arc<ProcessDefinition>> {
        definition.validate()?;
        let definition = Arc::new(definition);
        info!(
            definition = %definition.id,
            key = %definition.key,
            version = definition.version,
            "process definition deployed"
        );
        self.definitions
            .write()
            .insert(definition.id.clone(), Arc::clone(&definition));
        Ok(definition)
    }

    /// Deploys a JSON document holding one definition or an array of them.
    pub fn deploy_json(&self, json: &str) -> Result<Vec<Arc<ProcessDefinition>>> {
        let document: DefinitionDocument = serde_json::from_str(json)
            .map_err(|err| EngineError::invalid(format!("invalid process definition json: {err}")))?;
        let definitions = match document {
            DefinitionDocument::Many(definitions) => definitions,
            DefinitionDocument::One(definition) => vec![*definition],
        };
        // 全部校验通过后再部署
        for definition in &definitions {
            definition.validate()?;
        }
        definitions
            .into_iter()
            .map(|definition| self.deploy(definition))
            .collect()
    }

    pub fn deploy_file(&self, path: impl AsRef<Path>) -> Result<Vec<Arc<ProcessDefinition>>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read process definitions from {}", path.display()))?;
        self.deploy_json(&content)
    }

    pub fn get(&self, id: &str) -> Option<Arc<ProcessDefinition>> {
        self.definitions.read().get(id).map(Arc::clone)
    }

    pub fn require(&self, id: &str) -> Result<Arc<ProcessDefinition>> {
        self.get(id)
            .ok_or_else(|| EngineError::not_found("process definition", id))
    }

    /// Highest deployed version for `key`.
    pub fn latest_by_key(&self, key: &str) -> Option<Arc<ProcessDefinition>> {
        self.definitions
            .read()
            .values()
            .filter(|definition| definition.key == key)
            .max_by_key(|definition| definition.version)
            .map(Arc::clone)
    }

    pub fn list(&self) -> Vec<Arc<ProcessDefinition>> {
        let mut definitions: Vec<_> = self.definitions.read().values().map(Arc::clone).collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        definitions
    }
}
