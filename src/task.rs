//! In-memory task registry.
//!
//! One record per submitted job, keyed by a short random id. The pipeline
//! driving a task is the only writer of its record; status queries read
//! cloned snapshots. Records live for the process lifetime.

use rand::Rng;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Processing,
    Success,
    Failed,
}

/// A produced subtitle file, surfaced to status queries.
#[derive(Debug, Clone)]
pub struct SubtitleFile {
    pub path: PathBuf,
    pub language: String,
    pub name: String,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub source: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub fail_reason: Option<String>,
    pub subtitles: Vec<SubtitleFile>,
    pub speech_path: Option<PathBuf>,
    pub speech_url: Option<String>,
}

impl Task {
    fn new(id: String, source: String) -> Self {
        Self {
            id,
            source,
            status: TaskStatus::Processing,
            progress: 0,
            fail_reason: None,
            subtitles: Vec::new(),
            speech_path: None,
            speech_url: None,
        }
    }
}

/// Registry of all tasks, shared between the pipeline and status readers.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Processing task and return its id.
    pub fn create(&self, source: &str) -> String {
        let id = generate_task_id(8);
        let task = Task::new(id.clone(), source.to_string());
        self.tasks
            .write()
            .expect("task registry lock poisoned")
            .insert(id.clone(), task);
        id
    }

    /// Snapshot of a task record.
    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks
            .read()
            .expect("task registry lock poisoned")
            .get(id)
            .cloned()
    }

    /// Apply a mutation to a task record, if it exists.
    pub fn update<F: FnOnce(&mut Task)>(&self, id: &str, f: F) {
        if let Some(task) = self
            .tasks
            .write()
            .expect("task registry lock poisoned")
            .get_mut(id)
        {
            f(task);
        }
    }

    /// Raise the progress value. Lower values are ignored so readers always
    /// observe a non-decreasing sequence.
    pub fn set_progress(&self, id: &str, progress: u8) {
        self.update(id, |task| {
            if progress > task.progress {
                task.progress = progress.min(100);
            }
        });
    }

    /// Move a task to the terminal Failed state.
    pub fn fail(&self, id: &str, reason: &str) {
        self.update(id, |task| {
            task.status = TaskStatus::Failed;
            task.fail_reason = Some(reason.to_string());
        });
    }

    /// Move a task to the terminal Success state.
    pub fn succeed(&self, id: &str) {
        self.update(id, |task| {
            task.status = TaskStatus::Success;
            task.progress = 100;
        });
    }
}

const ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ123456789";

/// Short random id built from upper/lower-case letters and digits.
pub fn generate_task_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_CHARS[rng.gen_range(0..ID_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get() {
        let registry = TaskRegistry::new();
        let id = registry.create("local:/tmp/video.mp4");
        let task = registry.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.progress, 0);
        assert_eq!(task.source, "local:/tmp/video.mp4");
    }

    #[test]
    fn progress_is_monotonic() {
        let registry = TaskRegistry::new();
        let id = registry.create("local:x");
        registry.set_progress(&id, 20);
        registry.set_progress(&id, 10);
        assert_eq!(registry.get(&id).unwrap().progress, 20);
        registry.set_progress(&id, 90);
        assert_eq!(registry.get(&id).unwrap().progress, 90);
    }

    #[test]
    fn failed_carries_reason() {
        let registry = TaskRegistry::new();
        let id = registry.create("local:x");
        registry.fail(&id, "subprocess failed: boom");
        let task = registry.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.fail_reason.as_deref(), Some("subprocess failed: boom"));
    }

    #[test]
    fn success_pins_progress_to_100() {
        let registry = TaskRegistry::new();
        let id = registry.create("local:x");
        registry.succeed(&id);
        let task = registry.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Success);
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn ids_are_unique_enough() {
        let a = generate_task_id(8);
        let b = generate_task_id(8);
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }
}
