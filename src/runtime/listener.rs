use std::sync::Arc;

use serde_json::Value;

use super::instance::{ProcessInstance, TaskInstance};
use crate::definition::TaskListenerEvent;
use crate::error::Result;
use crate::script::ScriptingEngines;
use crate::variables::{VariableScope, Variables};

/// 任务监听器，在任务创建或完成的事务内同步执行
pub trait TaskListener: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// An error aborts the surrounding transition.
    fn notify(&self, task: &mut DelegateTask<'_>) -> Result<()>;
}

/// 监听器看到的任务视图
///
/// Reads fall back from task-local variables to the process instance;
/// writes go to both, so later steps of the same transition see them.
pub struct DelegateTask<'a> {
    task: &'a mut TaskInstance,
    process: &'a mut ProcessInstance,
    scripting: &'a ScriptingEngines,
    event: TaskListenerEvent,
}

impl<'a> DelegateTask<'a> {
    pub(crate) fn new(
        task: &'a mut TaskInstance,
        process: &'a mut ProcessInstance,
        scripting: &'a ScriptingEngines,
        event: TaskListenerEvent,
    ) -> Self {
        Self {
            task,
            process,
            scripting,
            event,
        }
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    pub fn name(&self) -> Option<&str> {
        self.task.name.as_deref()
    }

    pub fn task_definition_key(&self) -> &str {
        &self.task.task_definition_key
    }

    pub fn process_instance_id(&self) -> &str {
        &self.process.id
    }

    pub fn process_definition_id(&self) -> &str {
        &self.process.process_definition_id
    }

    pub fn event(&self) -> TaskListenerEvent {
        self.event
    }

    pub fn scripting(&self) -> &'a ScriptingEngines {
        self.scripting
    }

    pub fn local_variables(&self) -> &Variables {
        &self.task.variables
    }

    pub fn set_variable_local(&mut self, name: &str, value: Value) {
        self.task.variables.insert(name.to_string(), value);
    }

    pub fn process_variables(&self) -> &Variables {
        &self.process.variables
    }
}

impl VariableScope for DelegateTask<'_> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.task
            .variables
            .get(name)
            .or_else(|| self.process.variables.get(name))
            .cloned()
    }

    fn set_variable(&mut self, name: &str, value: Value) {
        self.task.variables.insert(name.to_string(), value.clone());
        self.process.variables.insert(name.to_string(), value);
    }

    fn snapshot(&self) -> Variables {
        let mut visible = self.process.variables.clone();
        visible.extend(self.task.variables.clone());
        visible
    }
}

struct FnTaskListener<F> {
    name: String,
    func: F,
}

impl<F> TaskListener for FnTaskListener<F>
where
    F: Fn(&mut DelegateTask<'_>) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn notify(&self, task: &mut DelegateTask<'_>) -> Result<()> {
        (self.func)(task)
    }
}

/// 从函数创建任务监听器
pub fn task_listener_from_fn<F>(name: impl Into<String>, func: F) -> Arc<dyn TaskListener>
where
    F: Fn(&mut DelegateTask<'_>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnTaskListener {
        name: name.into(),
        func,
    })
}
