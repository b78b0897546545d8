mod engine;
mod execution;
mod instance;
mod listener;
mod locks;
mod store;

pub use engine::ProcessEngine;
pub(crate) use engine::EngineParts;
pub use instance::{ProcessInstance, ProcessInstanceStatus, TaskInstance, TaskStatus};
pub use listener::{task_listener_from_fn, DelegateTask, TaskListener};
pub use locks::{InstanceGuard, InstanceLocks};
pub use store::{MemoryRuntimeStore, RuntimeStore};
