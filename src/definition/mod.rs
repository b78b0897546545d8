// 流程定义模块

mod builder;
mod repository;
mod types;

pub use builder::ProcessDefinitionBuilder;
pub use repository::DefinitionRepository;
pub use types::{
    FlowNode, FlowNodeKind, ListenerImplementation, NamedListenerDef, ProcessDefinition,
    ScriptListenerDef, ScriptTaskDef, SequenceFlow, TaskListenerDef, TaskListenerEvent,
    UserTaskDef,
};
