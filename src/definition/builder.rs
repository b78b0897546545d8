use serde_json::Value;

use crate::definition::types::{
    FlowNode, FlowNodeKind, ListenerImplementation, NamedListenerDef, ProcessDefinition,
    ScriptListenerDef, ScriptTaskDef, SequenceFlow, TaskListenerDef, TaskListenerEvent,
    UserTaskDef,
};
use crate::error::{EngineError, Result};
use crate::form::FormProperty;
use crate::script::EXPR_LANGUAGE;
use crate::variables::Variables;

/// 流程定义构建器
pub struct ProcessDefinitionBuilder {
    id: String,
    key: String,
    name: Option<String>,
    version: u32,
    variables: Variables,
    start_form: Option<Vec<FormProperty>>,
    nodes: Vec<FlowNode>,
    flows: Vec<SequenceFlow>,
}

impl ProcessDefinitionBuilder {
    pub fn new<I: Into<String>, K: Into<String>>(id: I, key: K) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            name: None,
            version: 1,
            variables: Variables::new(),
            start_form: None,
            nodes: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn set_version(&mut self, version: u32) -> &mut Self {
        self.version = version;
        self
    }

    pub fn set_variable(&mut self, name: &str, value: Value) -> &mut Self {
        self.variables.insert(name.to_string(), value);
        self
    }

    pub fn set_start_form(&mut self, properties: Vec<FormProperty>) -> &mut Self {
        self.start_form = Some(properties);
        self
    }

    pub fn add_start_event(&mut self, id: &str) -> &mut Self {
        self.push_node(id, None, FlowNodeKind::Start)
    }

    pub fn add_end_event(&mut self, id: &str) -> &mut Self {
        self.push_node(id, None, FlowNodeKind::End)
    }

    pub fn add_user_task(&mut self, id: &str, name: &str) -> &mut Self {
        self.push_node(id, Some(name), FlowNodeKind::UserTask(UserTaskDef::default()))
    }

    pub fn add_user_task_with_form(
        &mut self,
        id: &str,
        name: &str,
        form: Vec<FormProperty>,
    ) -> &mut Self {
        self.push_node(
            id,
            Some(name),
            FlowNodeKind::UserTask(UserTaskDef {
                form: Some(form),
                listeners: Vec::new(),
            }),
        )
    }

    pub fn add_script_task(&mut self, id: &str, script: &str) -> &mut Self {
        self.add_script_task_with(
            id,
            ScriptTaskDef {
                script: script.to_string(),
                language: EXPR_LANGUAGE.to_string(),
                result_variable: None,
                auto_store_variables: true,
            },
        )
    }

    pub fn add_script_task_with(&mut self, id: &str, task: ScriptTaskDef) -> &mut Self {
        self.push_node(id, None, FlowNodeKind::ScriptTask(task))
    }

    /// Attaches a listener to a user task added earlier; ignored for other nodes.
    pub fn add_task_listener(&mut self, task_id: &str, listener: TaskListenerDef) -> &mut Self {
        if let Some(FlowNode {
            kind: FlowNodeKind::UserTask(task),
            ..
        }) = self.nodes.iter_mut().find(|node| node.id == task_id)
        {
            task.listeners.push(listener);
        }
        self
    }

    pub fn add_script_listener(
        &mut self,
        task_id: &str,
        event: TaskListenerEvent,
        listener: ScriptListenerDef,
    ) -> &mut Self {
        self.add_task_listener(
            task_id,
            TaskListenerDef {
                event,
                implementation: ListenerImplementation::Script(listener),
            },
        )
    }

    pub fn add_named_listener(
        &mut self,
        task_id: &str,
        event: TaskListenerEvent,
        name: &str,
    ) -> &mut Self {
        self.add_task_listener(
            task_id,
            TaskListenerDef {
                event,
                implementation: ListenerImplementation::Named(NamedListenerDef {
                    name: name.to_string(),
                }),
            },
        )
    }

    pub fn connect(&mut self, from: &str, to: &str) -> &mut Self {
        self.flows.push(SequenceFlow {
            from: from.to_string(),
            to: to.to_string(),
            condition: None,
        });
        self
    }

    pub fn connect_when(&mut self, from: &str, to: &str, condition: &str) -> &mut Self {
        self.flows.push(SequenceFlow {
            from: from.to_string(),
            to: to.to_string(),
            condition: Some(condition.to_string()),
        });
        self
    }

    pub fn build(&self) -> Result<ProcessDefinition> {
        if self.nodes.is_empty() {
            return Err(EngineError::invalid(format!(
                "process definition `{}` has no nodes",
                self.id
            )));
        }
        let definition = ProcessDefinition {
            id: self.id.clone(),
            key: self.key.clone(),
            name: self.name.clone(),
            version: self.version,
            variables: self.variables.clone(),
            start_form: self.start_form.clone(),
            nodes: self.nodes.clone(),
            flows: self.flows.clone(),
        };
        definition.validate()?;
        Ok(definition)
    }

    fn push_node(&mut self, id: &str, name: Option<&str>, kind: FlowNodeKind) -> &mut Self {
        self.nodes.push(FlowNode {
            id: id.to_string(),
            name: name.map(str::to_string),
            kind,
        });
        self
    }
}
