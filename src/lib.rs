pub mod api;
pub mod config;
pub mod definition;
pub mod error;
pub mod event;
pub mod form;
pub mod identity;
pub mod runtime;
pub mod script;
pub mod utils;
pub mod variables;

pub use config::{EngineSettings, ProcessEngineConfiguration};
pub use definition::{
    DefinitionRepository, FlowNode, FlowNodeKind, ProcessDefinition, ProcessDefinitionBuilder,
    SequenceFlow, TaskListenerEvent,
};
pub use error::{EngineError, Result};
pub use event::{listener_from_fn, EngineEvent, EngineEventType, EventDispatcher, EventListener};
pub use form::{
    FormDefinition, FormProperty, FormPropertyType, FormService, FormSubmission, SubmitOutcome,
    SubmittedFormData,
};
pub use identity::{IdentityService, MemoryUserInfoStore, UserInfoStore};
pub use runtime::{
    task_listener_from_fn, DelegateTask, MemoryRuntimeStore, ProcessEngine, ProcessInstance,
    ProcessInstanceStatus, RuntimeStore, TaskInstance, TaskListener, TaskStatus,
};
pub use script::{Expression, ScriptEvaluator, ScriptResult, ScriptTaskListener, ScriptingEngines};
pub use utils::{logging, validation};
pub use variables::{VariableScope, Variables};
