use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::settings::EngineSettings;
use crate::definition::{DefinitionRepository, ProcessDefinition};
use crate::error::{EngineError, Result};
use crate::event::{EngineEventType, EventDispatcher, EventListener};
use crate::identity::{MemoryUserInfoStore, UserInfoStore};
use crate::runtime::{EngineParts, MemoryRuntimeStore, ProcessEngine, RuntimeStore, TaskListener};
use crate::script::{ScriptEvaluator, ScriptingEngines};

struct ConfiguredListener {
    listener: Arc<dyn EventListener>,
    types: Option<Vec<EngineEventType>>,
}

/// 流程引擎配置
///
/// Collects everything the engine needs at start; `build` consumes it.
pub struct ProcessEngineConfiguration {
    settings: EngineSettings,
    event_listeners: Vec<ConfiguredListener>,
    scripting: ScriptingEngines,
    task_listeners: HashMap<String, Arc<dyn TaskListener>>,
    runtime_store: Option<Arc<dyn RuntimeStore>>,
    user_info_store: Option<Arc<dyn UserInfoStore>>,
    clock: Option<Arc<dyn Clock>>,
    definitions: Vec<ProcessDefinition>,
}

impl Default for ProcessEngineConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessEngineConfiguration {
    pub fn new() -> Self {
        Self::from_settings(EngineSettings::default())
    }

    pub fn from_settings(settings: EngineSettings) -> Self {
        Self {
            settings,
            event_listeners: Vec::new(),
            scripting: ScriptingEngines::with_defaults(),
            task_listeners: HashMap::new(),
            runtime_store: None,
            user_info_store: None,
            clock: None,
            definitions: Vec::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn with_engine_name(mut self, name: impl Into<String>) -> Self {
        self.settings.engine_name = name.into();
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.settings.max_steps = max_steps;
        self
    }

    pub fn with_default_script_language(mut self, language: impl Into<String>) -> Self {
        self.settings.default_script_language = language.into();
        self
    }

    pub fn with_event_dispatcher_enabled(mut self, enabled: bool) -> Self {
        self.settings.event_dispatcher_enabled = enabled;
        self
    }

    /// Listener notified of every event, including ENGINE_CREATED.
    pub fn with_event_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.event_listeners.push(ConfiguredListener {
            listener,
            types: None,
        });
        self
    }

    pub fn with_typed_event_listener(
        mut self,
        listener: Arc<dyn EventListener>,
        types: impl IntoIterator<Item = EngineEventType>,
    ) -> Self {
        self.event_listeners.push(ConfiguredListener {
            listener,
            types: Some(types.into_iter().collect()),
        });
        self
    }

    pub fn with_script_evaluator(mut self, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        self.scripting.register(evaluator);
        self
    }

    /// Task listener referenced by name from process definitions.
    pub fn with_task_listener(
        mut self,
        name: impl Into<String>,
        listener: Arc<dyn TaskListener>,
    ) -> Self {
        self.task_listeners.insert(name.into(), listener);
        self
    }

    pub fn with_runtime_store(mut self, store: Arc<dyn RuntimeStore>) -> Self {
        self.runtime_store = Some(store);
        self
    }

    pub fn with_user_info_store(mut self, store: Arc<dyn UserInfoStore>) -> Self {
        self.user_info_store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_definition(mut self, definition: ProcessDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Validates the configuration, deploys definitions and dispatches ENGINE_CREATED.
    pub fn build(self) -> Result<ProcessEngine> {
        self.settings.validate()?;
        let language = &self.settings.default_script_language;
        if self.scripting.get(language).is_none() {
            return Err(EngineError::configuration(format!(
                "default script language `{language}` has no registered evaluator"
            )));
        }

        let definitions = DefinitionRepository::new();
        for definition in self.definitions {
            definitions.deploy(definition)?;
        }
        for file in &self.settings.definition_files {
            definitions.deploy_file(file)?;
        }

        let events = EventDispatcher::new();
        for configured in self.event_listeners {
            match configured.types {
                Some(types) => events.register_for_types(configured.listener, types),
                None => events.register(configured.listener),
            };
        }
        debug!(
            listeners = events.listener_count(),
            languages = ?self.scripting.languages(),
            "engine configuration assembled"
        );

        let engine = ProcessEngine::from_parts(EngineParts {
            settings: self.settings,
            definitions,
            runtime: self
                .runtime_store
                .unwrap_or_else(|| Arc::new(MemoryRuntimeStore::new())),
            user_info: self
                .user_info_store
                .unwrap_or_else(|| Arc::new(MemoryUserInfoStore::new())),
            events,
            scripting: self.scripting,
            task_listeners: self.task_listeners,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        });
        engine.announce_created()?;
        Ok(engine)
    }
}
