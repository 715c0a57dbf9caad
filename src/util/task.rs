use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Keyed background tasks. Scheduling a task under an occupied key aborts
/// the previous one.
#[derive(Default)]
pub struct TaskManager {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    pub fn spawn(&mut self, key: &str, task: JoinHandle<()>) {
        if let Some(handle) = self.tasks.insert(key.to_string(), task) {
            handle.abort();
        }
    }

    /// Hands the pending task out so the caller can await it.
    pub fn take(&mut self, key: &str) -> Option<JoinHandle<()>> {
        self.tasks.remove(key)
    }

    pub fn abort_all(&mut self) {
        for handle in self.tasks.values() {
            handle.abort();
        }
        self.tasks.clear();
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}
