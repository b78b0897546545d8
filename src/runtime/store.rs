use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::instance::{ProcessInstance, TaskInstance};
use crate::error::Result;

/// 运行时存储 trait
#[async_trait]
pub trait RuntimeStore: Send + Sync {
    async fn load_instance(&self, id: &str) -> Result<Option<ProcessInstance>>;
    async fn save_instance(&self, instance: &ProcessInstance) -> Result<()>;
    async fn delete_instance(&self, id: &str) -> Result<()>;

    async fn load_task(&self, id: &str) -> Result<Option<TaskInstance>>;
    async fn save_task(&self, task: &TaskInstance) -> Result<()>;
    async fn delete_task(&self, id: &str) -> Result<()>;

    /// Tasks of a process instance in creation order.
    async fn tasks_for_process(&self, process_instance_id: &str) -> Result<Vec<TaskInstance>>;
    async fn list_tasks(&self) -> Result<Vec<TaskInstance>>;
    async fn list_instances(&self) -> Result<Vec<ProcessInstance>>;

    /// Writes one transition's results. Implementations without transactions
    /// save the instance last so readers never see tasks of an uncommitted step.
    async fn commit(&self, instance: &ProcessInstance, tasks: &[TaskInstance]) -> Result<()> {
        for task in tasks {
            self.save_task(task).await?;
        }
        self.save_instance(instance).await
    }
}

/// 内存运行时存储
#[derive(Default)]
pub struct MemoryRuntimeStore {
    instances: RwLock<HashMap<String, ProcessInstance>>,
    tasks: RwLock<HashMap<String, TaskInstance>>,
}

impl MemoryRuntimeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_creation(mut tasks: Vec<TaskInstance>) -> Vec<TaskInstance> {
    tasks.sort_by(|a, b| a.create_time.cmp(&b.create_time).then_with(|| a.id.cmp(&b.id)));
    tasks
}

#[async_trait]
impl RuntimeStore for MemoryRuntimeStore {
    async fn load_instance(&self, id: &str) -> Result<Option<ProcessInstance>> {
        Ok(self.instances.read().get(id).cloned())
    }

    async fn save_instance(&self, instance: &ProcessInstance) -> Result<()> {
        self.instances
            .write()
            .insert(instance.id.clone(), instance.clone());
        Ok(())
    }

    async fn delete_instance(&self, id: &str) -> Result<()> {
        self.instances.write().remove(id);
        Ok(())
    }

    async fn load_task(&self, id: &str) -> Result<Option<TaskInstance>> {
        Ok(self.tasks.read().get(id).cloned())
    }

    async fn save_task(&self, task: &TaskInstance) -> Result<()> {
        self.tasks.write().insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.tasks.write().remove(id);
        Ok(())
    }

    async fn tasks_for_process(&self, process_instance_id: &str) -> Result<Vec<TaskInstance>> {
        let tasks = self
            .tasks
            .read()
            .values()
            .filter(|task| task.process_instance_id == process_instance_id)
            .cloned()
            .collect();
        Ok(by_creation(tasks))
    }

    async fn list_tasks(&self) -> Result<Vec<TaskInstance>> {
        Ok(by_creation(self.tasks.read().values().cloned().collect()))
    }

    async fn list_instances(&self) -> Result<Vec<ProcessInstance>> {
        let mut instances: Vec<ProcessInstance> =
            self.instances.read().values().cloned().collect();
        instances.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        Ok(instances)
    }

    async fn commit(&self, instance: &ProcessInstance, tasks: &[TaskInstance]) -> Result<()> {
        // 两张表同时加写锁，读者看不到半提交状态
        let mut instances = self.instances.write();
        let mut stored = self.tasks.write();
        for task in tasks {
            stored.insert(task.id.clone(), task.clone());
        }
        instances.insert(instance.id.clone(), instance.clone());
        Ok(())
    }
}
