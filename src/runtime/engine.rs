use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::execution::{ExecutionContext, Transition, TransitionOutcome};
use super::instance::{ProcessInstance, TaskInstance, TaskStatus};
use super::listener::TaskListener;
use super::locks::InstanceLocks;
use super::store::RuntimeStore;
use crate::config::{Clock, EngineSettings};
use crate::definition::{DefinitionRepository, ProcessDefinition};
use crate::error::{EngineError, Result};
use crate::event::{EngineEvent, EngineEventType, EventDispatcher};
use crate::form::FormService;
use crate::identity::{IdentityService, UserInfoStore};
use crate::script::ScriptingEngines;
use crate::variables::Variables;

/// 流程引擎
///
/// Cheap to clone; clones share stores, listeners and the per-instance lock table.
#[derive(Clone)]
pub struct ProcessEngine {
    settings: Arc<EngineSettings>,
    definitions: Arc<DefinitionRepository>,
    runtime: Arc<dyn RuntimeStore>,
    user_info: Arc<dyn UserInfoStore>,
    events: Arc<EventDispatcher>,
    scripting: Arc<ScriptingEngines>,
    task_listeners: Arc<HashMap<String, Arc<dyn TaskListener>>>,
    clock: Arc<dyn Clock>,
    locks: Arc<InstanceLocks>,
}

pub(crate) struct EngineParts {
    pub settings: EngineSettings,
    pub definitions: DefinitionRepository,
    pub runtime: Arc<dyn RuntimeStore>,
    pub user_info: Arc<dyn UserInfoStore>,
    pub events: EventDispatcher,
    pub scripting: ScriptingEngines,
    pub task_listeners: HashMap<String, Arc<dyn TaskListener>>,
    pub clock: Arc<dyn Clock>,
}

impl ProcessEngine {
    pub(crate) fn from_parts(parts: EngineParts) -> Self {
        parts
            .events
            .set_enabled(parts.settings.event_dispatcher_enabled);
        Self {
            settings: Arc::new(parts.settings),
            definitions: Arc::new(parts.definitions),
            runtime: parts.runtime,
            user_info: parts.user_info,
            events: Arc::new(parts.events),
            scripting: Arc::new(parts.scripting),
            task_listeners: Arc::new(parts.task_listeners),
            clock: parts.clock,
            locks: Arc::new(InstanceLocks::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.engine_name
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn definitions(&self) -> &DefinitionRepository {
        &self.definitions
    }

    pub fn deploy(&self, definition: ProcessDefinition) -> Result<Arc<ProcessDefinition>> {
        self.definitions.deploy(definition)
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn scripting(&self) -> &ScriptingEngines {
        &self.scripting
    }

    pub fn form_service(&self) -> FormService {
        FormService::new(self.clone())
    }

    pub fn identity_service(&self) -> IdentityService {
        IdentityService::new(Arc::clone(&self.user_info))
    }

    /// Starts an instance of `process_definition_id` and runs it to its first wait state.
    pub async fn start_process(
        &self,
        process_definition_id: &str,
        business_key: Option<String>,
        variables: Variables,
    ) -> Result<ProcessInstance> {
        let definition = self.definitions.require(process_definition_id)?;
        let transition = Transition::start(
            self.execution_context(),
            &definition,
            business_key,
            variables,
        )
        .map_err(|err| {
            warn!(process_definition_id, error = %err, "process start failed");
            err
        })?;

        // 新实例在提交前对外不可见，仍然加锁以串行化随后的迁移
        let _guard = self.locks.acquire(&transition.instance().id).await;
        let instance = self.commit(transition.finish()).await?;
        info!(
            process_instance_id = %instance.id,
            process_definition_id,
            status = ?instance.status,
            "process instance started"
        );
        Ok(instance)
    }

    /// Completes an open task with `variables` and resumes its process instance.
    pub async fn complete_task(&self, task_id: &str, variables: Variables) -> Result<()> {
        let task = self.require_task(task_id).await?;
        let _guard = self.locks.acquire(&task.process_instance_id).await;

        // 持锁后重新读取，并发完成只有一个成功
        let task = self.require_task(task_id).await?;
        if !task.is_open() {
            return Err(EngineError::not_found("task", task_id));
        }
        let instance = self.require_active_instance(&task.process_instance_id).await?;
        let definition = self.definitions.require(&instance.process_definition_id)?;

        let mut transition = Transition::new(self.execution_context(), &definition, instance);
        transition
            .complete_task(task, variables)
            .map_err(|err| {
                warn!(task_id, error = %err, "task completion failed");
                err
            })?;
        let instance = self.commit(transition.finish()).await?;
        debug!(task_id, process_instance_id = %instance.id, status = ?instance.status, "task completion committed");
        Ok(())
    }

    /// Moves a CREATED task to ACTIVE.
    pub async fn claim_task(&self, task_id: &str) -> Result<TaskInstance> {
        let task = self.require_task(task_id).await?;
        let _guard = self.locks.acquire(&task.process_instance_id).await;

        let mut task = self.require_task(task_id).await?;
        match task.status {
            TaskStatus::Created => {}
            TaskStatus::Active => {
                return Err(EngineError::Conflict(format!(
                    "task `{task_id}` is already active"
                )))
            }
            TaskStatus::Completed | TaskStatus::Terminated => {
                return Err(EngineError::not_found("task", task_id))
            }
        }
        task.status = TaskStatus::Active;
        self.runtime.save_task(&task).await?;
        debug!(task_id, "task claimed");
        Ok(task)
    }

    /// Terminates an active instance and all of its open tasks.
    pub async fn terminate_process(
        &self,
        process_instance_id: &str,
        reason: Option<String>,
    ) -> Result<ProcessInstance> {
        let _guard = self.locks.acquire(process_instance_id).await;
        let instance = self.require_active_instance(process_instance_id).await?;
        let definition = self.definitions.require(&instance.process_definition_id)?;
        let open_tasks: Vec<TaskInstance> = self
            .runtime
            .tasks_for_process(process_instance_id)
            .await?
            .into_iter()
            .filter(TaskInstance::is_open)
            .collect();

        let mut transition = Transition::new(self.execution_context(), &definition, instance);
        transition.terminate(open_tasks, reason);
        let instance = self.commit(transition.finish()).await?;
        info!(process_instance_id, "process instance terminated");
        Ok(instance)
    }

    pub async fn process_instance(&self, id: &str) -> Result<Option<ProcessInstance>> {
        self.runtime.load_instance(id).await
    }

    pub async fn task(&self, id: &str) -> Result<Option<TaskInstance>> {
        self.runtime.load_task(id).await
    }

    pub async fn tasks_for_process(&self, process_instance_id: &str) -> Result<Vec<TaskInstance>> {
        self.runtime.tasks_for_process(process_instance_id).await
    }

    /// Open tasks across all instances.
    pub async fn active_tasks(&self) -> Result<Vec<TaskInstance>> {
        Ok(self
            .runtime
            .list_tasks()
            .await?
            .into_iter()
            .filter(TaskInstance::is_open)
            .collect())
    }

    pub async fn process_instances(&self) -> Result<Vec<ProcessInstance>> {
        self.runtime.list_instances().await
    }

    /// Dispatches ENGINE_CLOSED to the registered listeners.
    pub fn close(&self) -> Result<()> {
        info!(engine = %self.settings.engine_name, "process engine closed");
        self.events
            .dispatch(&EngineEvent::new(EngineEventType::EngineClosed))
    }

    pub(crate) fn announce_created(&self) -> Result<()> {
        info!(engine = %self.settings.engine_name, "process engine created");
        self.events
            .dispatch(&EngineEvent::new(EngineEventType::EngineCreated))
    }

    fn execution_context(&self) -> ExecutionContext<'_> {
        ExecutionContext {
            scripting: &self.scripting,
            task_listeners: &self.task_listeners,
            clock: self.clock.as_ref(),
            condition_language: &self.settings.default_script_language,
            max_steps: self.settings.max_steps,
        }
    }

    async fn require_task(&self, task_id: &str) -> Result<TaskInstance> {
        self.runtime
            .load_task(task_id)
            .await?
            .ok_or_else(|| EngineError::not_found("task", task_id))
    }

    async fn require_active_instance(&self, id: &str) -> Result<ProcessInstance> {
        match self.runtime.load_instance(id).await? {
            Some(instance) if instance.is_active() => Ok(instance),
            _ => Err(EngineError::not_found("process instance", id)),
        }
    }

    /// Persists a finished transition, then publishes its events in order.
    async fn commit(&self, outcome: TransitionOutcome) -> Result<ProcessInstance> {
        self.runtime
            .commit(&outcome.instance, &outcome.tasks)
            .await?;

        let mut failure = None;
        for event in &outcome.events {
            if let Err(err) = self.events.dispatch(event) {
                failure.get_or_insert(err);
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(outcome.instance),
        }
    }
}
