//! Saved prompt presets ("tasks"), one YAML file per task.
//!
//! A task's id is derived from its title, so saving a task with an existing
//! title replaces the earlier file. Lookups accept a full id or a unique id
//! prefix; ambiguous prefixes resolve to nothing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::types::ReasoningEffort;

/// Hex characters kept from the title digest.
pub const TASK_ID_LEN: usize = 8;
const DIGEST_BYTES: usize = 16;
const EXTENSION: &str = "yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    pub prompt: String,
    pub model: String,
    #[serde(default)]
    pub reasoning_effort: ReasoningEffort,
}

impl Task {
    pub fn new(
        title: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
        reasoning_effort: ReasoningEffort,
    ) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            model: model.into(),
            reasoning_effort,
        }
    }

    pub fn id(&self) -> String {
        compute_task_id(&self.title)
    }
}

/// Short deterministic id: the first 8 hex characters of a 128-bit
/// truncation of the title's SHA-256 digest.
pub fn compute_task_id(title: &str) -> String {
    let digest = Sha256::digest(title.as_bytes());
    digest[..DIGEST_BYTES]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>()
        .chars()
        .take(TASK_ID_LEN)
        .collect()
}

/// Directory-backed task store.
#[derive(Debug, Clone)]
pub struct TaskStore {
    dir: PathBuf,
}

impl TaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(err) = fs::create_dir_all(&dir) {
            error!(path = %dir.display(), error = %err, "could not create tasks directory");
        }
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn task_path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}.{EXTENSION}"))
    }

    /// Write `task` to `<id>.yaml`, replacing any task with the same title.
    pub fn save(&self, task: &Task) -> Result<String> {
        let task_id = task.id();
        fs::create_dir_all(&self.dir)?;
        let serialized = serde_yaml::to_string(task)?;
        fs::write(self.task_path(&task_id), serialized)?;
        debug!(task_id = %task_id, title = %task.title, "saved task");
        Ok(task_id)
    }

    /// Load a task; missing or unparsable files yield `None`.
    pub fn load(&self, task_id: &str) -> Option<Task> {
        match self.try_load(task_id) {
            Ok(task) => task,
            Err(err) => {
                warn!(task_id, error = %err, "error loading task");
                None
            }
        }
    }

    pub fn try_load(&self, task_id: &str) -> Result<Option<Task>> {
        let raw = match fs::read_to_string(self.task_path(task_id)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_yaml::from_str(&raw)?))
    }

    /// `true` iff a task file existed and was removed.
    pub fn delete(&self, task_id: &str) -> bool {
        match fs::remove_file(self.task_path(task_id)) {
            Ok(()) => {
                debug!(task_id, "deleted task");
                true
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => {
                error!(task_id, error = %err, "error deleting task");
                false
            }
        }
    }

    /// All loadable tasks, sorted case-insensitively by title.
    pub fn list(&self) -> Vec<(String, Task)> {
        let mut tasks: Vec<_> = self
            .task_ids()
            .into_iter()
            .filter_map(|id| self.load(&id).map(|task| (id, task)))
            .collect();
        tasks.sort_by(|(a_id, a), (b_id, b)| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a_id.cmp(b_id))
        });
        tasks
    }

    /// The single task whose id starts with `prefix`.
    ///
    /// Zero matches and ambiguous prefixes both return `None`; in the
    /// ambiguous case every candidate is logged.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<(String, Task)> {
        let prefix = prefix.trim();
        let mut matches: Vec<_> = self
            .task_ids()
            .into_iter()
            .filter(|id| id.starts_with(prefix))
            .filter_map(|id| self.load(&id).map(|task| (id, task)))
            .collect();

        match matches.len() {
            0 => None,
            1 => matches.pop(),
            _ => {
                warn!(prefix, "ambiguous task id prefix");
                for (task_id, task) in &matches {
                    warn!(task_id = %task_id, title = %task.title, "candidate task");
                }
                None
            }
        }
    }

    fn task_ids(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    error!(path = %self.dir.display(), error = %err, "error reading tasks directory");
                }
                return Vec::new();
            }
        };
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, TaskStore) {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks"));
        (dir, store)
    }

    #[test]
    fn ids_are_deterministic_hex() {
        let id = compute_task_id("Deploy");
        assert_eq!(id, compute_task_id("Deploy"));
        assert_eq!(id.len(), TASK_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, compute_task_id("deploy "));
    }

    #[test]
    fn save_writes_named_yaml_file() {
        let (_dir, store) = temp_store();
        let task = Task::new("Check disk", "df -h", "gpt-oss:20b", ReasoningEffort::Low);
        let id = store.save(&task).unwrap();
        let raw = fs::read_to_string(store.dir().join(format!("{id}.yaml"))).unwrap();
        assert!(raw.contains("title: Check disk"));
        assert!(raw.contains("reasoning_effort: low"));
    }

    #[test]
    fn invalid_effort_is_normalized_on_load() {
        let (_dir, store) = temp_store();
        fs::write(
            store.dir().join("abcd1234.yaml"),
            "title: t\nprompt: p\nmodel: m\nreasoning_effort: turbo\n",
        )
        .unwrap();
        let task = store.load("abcd1234").unwrap();
        assert_eq!(task.reasoning_effort, ReasoningEffort::Medium);
    }

    #[test]
    fn unparsable_files_load_as_none() {
        let (_dir, store) = temp_store();
        fs::write(store.dir().join("deadbeef.yaml"), "title: [unclosed").unwrap();
        assert_eq!(store.load("deadbeef"), None);
        assert!(store.list().is_empty());
    }

    #[test]
    fn delete_reports_existence() {
        let (_dir, store) = temp_store();
        let id = store
            .save(&Task::new("t", "p", "m", ReasoningEffort::High))
            .unwrap();
        assert!(store.delete(&id));
        assert!(!store.delete(&id));
    }
}
