use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error};

use super::{EngineEvent, EngineEventType};
use crate::error::{EngineError, Result};

/// 事件监听器
pub trait EventListener: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn on_event(&self, event: &EngineEvent) -> Result<()>;

    /// When true, a failure of this listener is reported back to the dispatcher's caller.
    fn is_fail_on_exception(&self) -> bool {
        false
    }
}

pub type ListenerId = u64;

#[derive(Clone)]
struct ListenerEntry {
    id: ListenerId,
    listener: Arc<dyn EventListener>,
    types: Option<HashSet<EngineEventType>>,
}

impl ListenerEntry {
    fn accepts(&self, event_type: EngineEventType) -> bool {
        self.types
            .as_ref()
            .map_or(true, |types| types.contains(&event_type))
    }
}

/// 事件分发器
pub struct EventDispatcher {
    entries: RwLock<Vec<ListenerEntry>>,
    enabled: AtomicBool,
    next_id: AtomicU64,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            enabled: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        self.insert(listener, None)
    }

    pub fn register_for_types(
        &self,
        listener: Arc<dyn EventListener>,
        types: impl IntoIterator<Item = EngineEventType>,
    ) -> ListenerId {
        self.insert(listener, Some(types.into_iter().collect()))
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Delivers `event` to every matching listener in registration order.
    ///
    /// A failing or panicking listener is logged and skipped. The first failure of a
    /// listener that opted into `is_fail_on_exception` is returned once every listener
    /// has been notified.
    pub fn dispatch(&self, event: &EngineEvent) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        // 快照: 监听器内部可以注册新的监听器
        let entries: Vec<ListenerEntry> = self.entries.read().clone();
        let mut failure: Option<EngineError> = None;

        for entry in entries
            .iter()
            .filter(|entry| entry.accepts(event.event_type()))
        {
            let outcome = catch_unwind(AssertUnwindSafe(|| entry.listener.on_event(event)));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };

            error!(
                listener = entry.listener.name(),
                event = event.event_type().as_str(),
                error = %message,
                "event listener failed"
            );
            if entry.listener.is_fail_on_exception() && failure.is_none() {
                failure = Some(EngineError::Listener {
                    listener: entry.listener.name().to_string(),
                    message,
                });
            }
        }

        debug!(event = event.event_type().as_str(), "event dispatched");
        failure.map_or(Ok(()), Err)
    }

    fn insert(
        &self,
        listener: Arc<dyn EventListener>,
        types: Option<HashSet<EngineEventType>>,
    ) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(listener = listener.name(), id, "event listener registered");
        self.entries.write().push(ListenerEntry {
            id,
            listener,
            types,
        });
        id
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "listener panicked".to_string()
    }
}

struct FnListener<F> {
    name: String,
    func: F,
}

impl<F> EventListener for FnListener<F>
where
    F: Fn(&EngineEvent) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: &EngineEvent) -> Result<()> {
        (self.func)(event)
    }
}

/// 从函数创建监听器
pub fn listener_from_fn<F>(name: impl Into<String>, func: F) -> Arc<dyn EventListener>
where
    F: Fn(&EngineEvent) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnListener {
        name: name.into(),
        func,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(log: Arc<Mutex<Vec<String>>>, tag: &'static str) -> Arc<dyn EventListener> {
        listener_from_fn(tag, move |event| {
            log.lock().push(format!("{tag}:{}", event.event_type().as_str()));
            Ok(())
        })
    }

    #[test]
    fn removed_listener_no_longer_receives_events() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = dispatcher.register(recorder(Arc::clone(&log), "a"));
        dispatcher.register(recorder(Arc::clone(&log), "b"));

        assert!(dispatcher.remove(first));
        assert!(!dispatcher.remove(first));
        dispatcher
            .dispatch(&EngineEvent::new(EngineEventType::Custom))
            .unwrap();

        assert_eq!(*log.lock(), vec!["b:CUSTOM".to_string()]);
    }

    #[test]
    fn panic_message_reads_string_payloads() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
