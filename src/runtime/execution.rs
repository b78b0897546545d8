use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::instance::{ProcessInstance, ProcessInstanceStatus, TaskInstance, TaskStatus};
use super::listener::{DelegateTask, TaskListener};
use crate::config::Clock;
use crate::definition::{
    FlowNodeKind, ListenerImplementation, ProcessDefinition, ScriptTaskDef, TaskListenerDef,
    TaskListenerEvent,
};
use crate::error::{EngineError, Result};
use crate::event::{EngineEvent, EngineEventType};
use crate::script::{ScriptTaskListener, ScriptingEngines};
use crate::variables::Variables;

/// Collaborators a transition reads but never mutates.
pub(crate) struct ExecutionContext<'a> {
    pub scripting: &'a ScriptingEngines,
    pub task_listeners: &'a HashMap<String, Arc<dyn TaskListener>>,
    pub clock: &'a dyn Clock,
    pub condition_language: &'a str,
    pub max_steps: u32,
}

/// 一次状态迁移的工作副本
///
/// Everything a transition changes lives here until the engine commits it.
/// Dropping a transition discards its effects.
pub(crate) struct Transition<'a> {
    ctx: ExecutionContext<'a>,
    definition: &'a ProcessDefinition,
    instance: ProcessInstance,
    tasks: Vec<TaskInstance>,
    events: Vec<EngineEvent>,
    steps: u32,
}

pub(crate) struct TransitionOutcome {
    pub instance: ProcessInstance,
    pub tasks: Vec<TaskInstance>,
    pub events: Vec<EngineEvent>,
}

impl<'a> Transition<'a> {
    pub fn new(
        ctx: ExecutionContext<'a>,
        definition: &'a ProcessDefinition,
        instance: ProcessInstance,
    ) -> Self {
        Self {
            ctx,
            definition,
            instance,
            tasks: Vec::new(),
            events: Vec::new(),
            steps: 0,
        }
    }

    /// Creates the instance and runs it to its first wait state.
    pub fn start(
        ctx: ExecutionContext<'a>,
        definition: &'a ProcessDefinition,
        business_key: Option<String>,
        variables: Variables,
    ) -> Result<Self> {
        let mut merged = definition.variables.clone();
        merged.extend(variables);
        let instance =
            ProcessInstance::new(&definition.id, business_key, merged, ctx.clock.now());

        let mut transition = Self::new(ctx, definition, instance);
        let payload = match &transition.instance.business_key {
            Some(key) => json!({ "businessKey": key }),
            None => Value::Null,
        };
        transition.emit(EngineEventType::ProcessStarted, None, payload);

        let start = definition.start_node().ok_or_else(|| {
            EngineError::configuration(format!(
                "process definition `{}` has no start event",
                definition.id
            ))
        })?;
        transition.enter(&start.id)?;
        Ok(transition)
    }

    pub fn instance(&self) -> &ProcessInstance {
        &self.instance
    }

    /// Merges `variables`, runs complete listeners, closes the task and resumes execution.
    pub fn complete_task(&mut self, mut task: TaskInstance, variables: Variables) -> Result<()> {
        for (name, value) in variables {
            task.variables.insert(name.clone(), value.clone());
            self.instance.variables.insert(name, value);
        }

        let listeners = self.listeners_of(&task.task_definition_key);
        self.notify_task_listeners(listeners, TaskListenerEvent::Complete, &mut task)?;

        task.status = TaskStatus::Completed;
        task.end_time = Some(self.ctx.clock.now());
        self.instance.leave_activity(&task.task_definition_key);
        self.emit(EngineEventType::TaskCompleted, Some(&task.id), Value::Null);

        let node_id = task.task_definition_key.clone();
        debug!(task_id = %task.id, process_instance_id = %self.instance.id, "task completed");
        self.tasks.push(task);

        let next = self.take_flow(&node_id)?;
        self.enter(&next)
    }

    /// Ends the instance and every open task.
    pub fn terminate(&mut self, open_tasks: Vec<TaskInstance>, reason: Option<String>) {
        let now = self.ctx.clock.now();
        for mut task in open_tasks {
            task.status = TaskStatus::Terminated;
            task.end_time = Some(now);
            self.tasks.push(task);
        }
        self.instance.status = ProcessInstanceStatus::Terminated;
        self.instance.end_time = Some(now);
        self.instance.current_activities.clear();
        let payload = match &reason {
            Some(reason) => json!({ "reason": reason }),
            None => Value::Null,
        };
        self.instance.termination_reason = reason;
        self.emit(EngineEventType::ProcessTerminated, None, payload);
    }

    pub fn finish(self) -> TransitionOutcome {
        TransitionOutcome {
            instance: self.instance,
            tasks: self.tasks,
            events: self.events,
        }
    }

    fn enter(&mut self, node_id: &str) -> Result<()> {
        let mut next = Some(node_id.to_string());

        while let Some(node_id) = next.take() {
            self.steps += 1;
            if self.steps > self.ctx.max_steps {
                return Err(EngineError::configuration(format!(
                    "process instance `{}` exceeded {} automatic steps",
                    self.instance.id, self.ctx.max_steps
                )));
            }

            let definition = self.definition;
            let node = definition.node(&node_id).ok_or_else(|| {
                EngineError::configuration(format!(
                    "node `{node_id}` is not part of process definition `{}`",
                    definition.id
                ))
            })?;
            debug!(
                process_instance_id = %self.instance.id,
                node = %node.id,
                kind = node.kind.as_str(),
                "entering node"
            );

            match &node.kind {
                FlowNodeKind::Start => next = Some(self.take_flow(&node.id)?),
                FlowNodeKind::ScriptTask(script) => {
                    self.run_script_task(&node.id, script)?;
                    next = Some(self.take_flow(&node.id)?);
                }
                FlowNodeKind::UserTask(user_task) => {
                    let mut task = TaskInstance::new(
                        &self.instance,
                        &node.id,
                        node.name.clone(),
                        self.ctx.clock.now(),
                    );
                    self.instance.current_activities.push(node.id.clone());
                    self.notify_task_listeners(
                        &user_task.listeners,
                        TaskListenerEvent::Create,
                        &mut task,
                    )?;
                    self.emit(EngineEventType::TaskCreated, Some(&task.id), Value::Null);
                    self.tasks.push(task);
                }
                FlowNodeKind::End => {
                    if self.instance.current_activities.is_empty() {
                        self.instance.status = ProcessInstanceStatus::Completed;
                        self.instance.end_time = Some(self.ctx.clock.now());
                        self.emit(EngineEventType::ProcessCompleted, None, Value::Null);
                    }
                }
            }
        }
        Ok(())
    }

    fn run_script_task(&mut self, node_id: &str, script: &ScriptTaskDef) -> Result<()> {
        let value = self
            .ctx
            .scripting
            .evaluate(
                &script.script,
                &script.language,
                &mut self.instance.variables,
                script.auto_store_variables,
            )
            .map_err(|err| {
                warn!(node = node_id, process_instance_id = %self.instance.id, error = %err, "script task failed");
                err
            })?;
        if let Some(name) = &script.result_variable {
            self.instance.variables.insert(name.clone(), value);
        }
        Ok(())
    }

    /// First outgoing flow whose condition holds, or that has none.
    fn take_flow(&mut self, node_id: &str) -> Result<String> {
        let definition: &'a ProcessDefinition = self.definition;
        for flow in definition.outgoing(node_id) {
            let Some(condition) = &flow.condition else {
                return Ok(flow.to.clone());
            };
            let value = self.ctx.scripting.evaluate(
                condition,
                self.ctx.condition_language,
                &mut self.instance.variables,
                false,
            )?;
            match value {
                Value::Bool(true) => return Ok(flow.to.clone()),
                Value::Bool(false) => continue,
                other => {
                    return Err(EngineError::ScriptEvaluation {
                        language: self.ctx.condition_language.to_string(),
                        message: format!(
                            "condition `{condition}` on flow `{}` -> `{}` returned {other}, expected a boolean",
                            flow.from, flow.to
                        ),
                    })
                }
            }
        }
        Err(EngineError::configuration(format!(
            "no outgoing sequence flow from node `{node_id}` could be taken"
        )))
    }

    fn listeners_of(&self, node_id: &str) -> &'a [TaskListenerDef] {
        let definition: &'a ProcessDefinition = self.definition;
        definition
            .user_task(node_id)
            .map_or(&[], |task| task.listeners.as_slice())
    }

    fn notify_task_listeners(
        &mut self,
        listeners: &[TaskListenerDef],
        event: TaskListenerEvent,
        task: &mut TaskInstance,
    ) -> Result<()> {
        for def in listeners.iter().filter(|def| def.event == event) {
            let mut delegate = DelegateTask::new(task, &mut self.instance, self.ctx.scripting, event);
            let outcome = match &def.implementation {
                ListenerImplementation::Script(script) => {
                    ScriptTaskListener::from(script).notify(&mut delegate)
                }
                ListenerImplementation::Named(named) => {
                    let listener = self.ctx.task_listeners.get(&named.name).ok_or_else(|| {
                        EngineError::configuration(format!(
                            "no task listener registered under `{}`",
                            named.name
                        ))
                    })?;
                    listener.notify(&mut delegate)
                }
            };
            if let Err(err) = outcome {
                warn!(
                    task_id = %task.id,
                    event = event.as_str(),
                    error = %err,
                    "task listener failed"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    fn emit(&mut self, event_type: EngineEventType, task_id: Option<&str>, payload: Value) {
        let mut event = EngineEvent::new(event_type)
            .with_process(&self.instance.process_definition_id, &self.instance.id)
            .with_payload(payload);
        if let Some(task_id) = task_id {
            event = event.with_task(task_id);
        }
        self.events.push(event);
    }
}
