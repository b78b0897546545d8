use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::variables::Variables;

/// 流程实例状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessInstanceStatus {
    Active,
    Completed,
    Terminated,
}

impl ProcessInstanceStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessInstanceStatus::Active)
    }
}

/// 流程实例
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstance {
    pub id: String,
    pub process_definition_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_key: Option<String>,
    #[serde(default)]
    pub variables: Variables,
    pub status: ProcessInstanceStatus,
    /// Node ids execution is currently waiting in.
    #[serde(default)]
    pub current_activities: Vec<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
}

impl ProcessInstance {
    pub(crate) fn new(
        process_definition_id: &str,
        business_key: Option<String>,
        variables: Variables,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            process_definition_id: process_definition_id.to_string(),
            business_key,
            variables,
            status: ProcessInstanceStatus::Active,
            current_activities: Vec::new(),
            start_time: now,
            end_time: None,
            termination_reason: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ProcessInstanceStatus::Active
    }

    pub fn is_ended(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn leave_activity(&mut self, node_id: &str) {
        if let Some(pos) = self.current_activities.iter().position(|id| id == node_id) {
            self.current_activities.remove(pos);
        }
    }
}

/// 任务状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Created,
    Active,
    Completed,
    Terminated,
}

impl TaskStatus {
    /// CREATED and ACTIVE tasks can still be completed.
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Created | TaskStatus::Active)
    }
}

/// 用户任务实例
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInstance {
    pub id: String,
    pub process_instance_id: String,
    pub process_definition_id: String,
    /// Id of the user-task node this task was created for.
    pub task_definition_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub variables: Variables,
    pub status: TaskStatus,
    pub create_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl TaskInstance {
    pub(crate) fn new(
        process: &ProcessInstance,
        task_definition_key: &str,
        name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            process_instance_id: process.id.clone(),
            process_definition_id: process.process_definition_id.clone(),
            task_definition_key: task_definition_key.to_string(),
            name,
            variables: Variables::new(),
            status: TaskStatus::Created,
            create_time: now,
            end_time: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
