use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{EngineError, Result};
use crate::form::FormProperty;
use crate::script::EXPR_LANGUAGE;
use crate::utils::validation::ConfigValidator;
use crate::variables::Variables;

/// 流程定义
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    pub id: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_version")]
    pub version: u32,
    /// Defaults merged under the variables a new instance starts with.
    #[serde(default)]
    pub variables: Variables,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_form: Option<Vec<FormProperty>>,
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub flows: Vec<SequenceFlow>,
}

fn default_version() -> u32 {
    1
}

impl ProcessDefinition {
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn start_node(&self) -> Option<&FlowNode> {
        self.nodes
            .iter()
            .find(|node| matches!(node.kind, FlowNodeKind::Start))
    }

    pub fn outgoing(&self, node_id: &str) -> impl Iterator<Item = &SequenceFlow> {
        let node_id = node_id.to_string();
        self.flows.iter().filter(move |flow| flow.from == node_id)
    }

    pub fn user_task(&self, node_id: &str) -> Option<&UserTaskDef> {
        match self.node(node_id).map(|node| &node.kind) {
            Some(FlowNodeKind::UserTask(task)) => Some(task),
            _ => None,
        }
    }

    /// Structural checks run on deploy.
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_identifier("process definition id", &self.id)?;
        ConfigValidator::validate_identifier("process definition key", &self.key)?;

        let mut ids = HashSet::new();
        for node in &self.nodes {
            ConfigValidator::validate_node_id(&node.id)?;
            if !ids.insert(node.id.as_str()) {
                return Err(EngineError::invalid(format!(
                    "duplicate node `{}` in process definition `{}`",
                    node.id, self.id
                )));
            }
        }

        let starts = self
            .nodes
            .iter()
            .filter(|node| matches!(node.kind, FlowNodeKind::Start))
            .count();
        if starts != 1 {
            return Err(EngineError::invalid(format!(
                "process definition `{}` must have exactly one start event, found {starts}",
                self.id
            )));
        }

        for flow in &self.flows {
            for end in [&flow.from, &flow.to] {
                if !ids.contains(end.as_str()) {
                    return Err(EngineError::invalid(format!(
                        "sequence flow `{}` -> `{}` references unknown node `{end}`",
                        flow.from, flow.to
                    )));
                }
            }
        }

        for node in &self.nodes {
            let has_outgoing = self.outgoing(&node.id).next().is_some();
            match &node.kind {
                FlowNodeKind::End => {
                    if has_outgoing {
                        return Err(EngineError::invalid(format!(
                            "end event `{}` cannot have outgoing flows",
                            node.id
                        )));
                    }
                }
                FlowNodeKind::UserTask(task) => {
                    if let Some(form) = &task.form {
                        validate_form(&node.id, form)?;
                    }
                    if !has_outgoing {
                        return Err(missing_outgoing(&node.id));
                    }
                }
                _ => {
                    if !has_outgoing {
                        return Err(missing_outgoing(&node.id));
                    }
                }
            }
        }

        if let Some(form) = &self.start_form {
            validate_form(&self.id, form)?;
        }
        Ok(())
    }
}

fn missing_outgoing(node_id: &str) -> EngineError {
    EngineError::invalid(format!("node `{node_id}` has no outgoing sequence flow"))
}

fn validate_form(owner: &str, properties: &[FormProperty]) -> Result<()> {
    let mut seen = HashSet::new();
    for property in properties {
        if !seen.insert(property.id.as_str()) {
            return Err(EngineError::invalid(format!(
                "duplicate form property `{}` on `{owner}`",
                property.id
            )));
        }
    }
    Ok(())
}

/// 流程节点
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: FlowNodeKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowNodeKind {
    Start,
    UserTask(UserTaskDef),
    ScriptTask(ScriptTaskDef),
    End,
}

impl FlowNodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowNodeKind::Start => "start",
            FlowNodeKind::UserTask(_) => "userTask",
            FlowNodeKind::ScriptTask(_) => "scriptTask",
            FlowNodeKind::End => "end",
        }
    }
}

/// 用户任务
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTaskDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<Vec<FormProperty>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<TaskListenerDef>,
}

/// 脚本任务，在流程推进时同步执行
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptTaskDef {
    pub script: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_variable: Option<String>,
    #[serde(default)]
    pub auto_store_variables: bool,
}

fn default_language() -> String {
    EXPR_LANGUAGE.to_string()
}

/// 任务监听器触发点
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskListenerEvent {
    Create,
    Complete,
}

impl TaskListenerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskListenerEvent::Create => "create",
            TaskListenerEvent::Complete => "complete",
        }
    }
}

/// 任务监听器配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListenerDef {
    pub event: TaskListenerEvent,
    pub implementation: ListenerImplementation,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ListenerImplementation {
    /// Script run through the configured scripting engines.
    Script(ScriptListenerDef),
    /// Listener registered on the engine configuration under `name`.
    Named(NamedListenerDef),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptListenerDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_variable: Option<String>,
    #[serde(default)]
    pub auto_store_variables: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamedListenerDef {
    pub name: String,
}

/// 顺序流
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceFlow {
    pub from: String,
    pub to: String,
    /// Expression in the engine's default script language; taken when it yields `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}
