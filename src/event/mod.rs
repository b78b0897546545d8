// 引擎事件

mod dispatcher;

pub use dispatcher::{listener_from_fn, EventDispatcher, EventListener, ListenerId};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 事件类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEventType {
    Custom,
    EngineCreated,
    EngineClosed,
    ProcessStarted,
    ProcessCompleted,
    ProcessTerminated,
    TaskCreated,
    TaskCompleted,
}

impl EngineEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineEventType::Custom => "CUSTOM",
            EngineEventType::EngineCreated => "ENGINE_CREATED",
            EngineEventType::EngineClosed => "ENGINE_CLOSED",
            EngineEventType::ProcessStarted => "PROCESS_STARTED",
            EngineEventType::ProcessCompleted => "PROCESS_COMPLETED",
            EngineEventType::ProcessTerminated => "PROCESS_TERMINATED",
            EngineEventType::TaskCreated => "TASK_CREATED",
            EngineEventType::TaskCompleted => "TASK_COMPLETED",
        }
    }
}

/// 引擎事件，构造后不可变
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineEvent {
    #[serde(rename = "type")]
    event_type: EngineEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    process_definition_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    process_instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
    #[serde(default)]
    payload: Value,
}

impl EngineEvent {
    pub fn new(event_type: EngineEventType) -> Self {
        Self {
            event_type,
            process_definition_id: None,
            process_instance_id: None,
            task_id: None,
            payload: Value::Null,
        }
    }

    pub fn custom(payload: Value) -> Self {
        Self::new(EngineEventType::Custom).with_payload(payload)
    }

    pub fn with_process(
        mut self,
        process_definition_id: impl Into<String>,
        process_instance_id: impl Into<String>,
    ) -> Self {
        self.process_definition_id = Some(process_definition_id.into());
        self.process_instance_id = Some(process_instance_id.into());
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn event_type(&self) -> EngineEventType {
        self.event_type
    }

    pub fn process_definition_id(&self) -> Option<&str> {
        self.process_definition_id.as_deref()
    }

    pub fn process_instance_id(&self) -> Option<&str> {
        self.process_instance_id.as_deref()
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}
