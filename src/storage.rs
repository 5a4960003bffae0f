use crate::model::{Task, TaskBook, TaskDraft, TaskId};
use crate::optimizer;
use crate::service::TaskService;
use anyhow::{Context, Result};
use chrono::Utc;
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const STORE_DIR: &str = ".taskgrid";
const STORE_FILE: &str = "tasks.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub scope: StoreScope,
}

pub fn init_project_store(name: Option<String>) -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(STORE_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {} directory", STORE_DIR))?;
    let location = StoreLocation {
        path: dir.join(STORE_FILE),
        scope: StoreScope::Project,
    };
    if !location.path.exists() {
        let book_name = name.unwrap_or_else(|| {
            cwd.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("project")
                .to_string()
        });
        save_book(&location, &TaskBook::named(book_name))?;
    }
    Ok(location)
}

pub fn locate_store(start: &Path) -> Result<StoreLocation> {
    if let Some(project_path) = find_project_store(start) {
        return Ok(StoreLocation {
            path: project_path,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        path: global_store_path()?,
        scope: StoreScope::Global,
    })
}

pub fn load_book(location: &StoreLocation) -> Result<TaskBook> {
    if location.path.exists() {
        let data = fs::read_to_string(&location.path)
            .with_context(|| format!("reading {:?}", location.path))?;
        let book: TaskBook = serde_yaml::from_str(&data).context("parsing task file")?;
        tracing::debug!(path = %location.path.display(), tasks = book.tasks.len(), "loaded tasks");
        Ok(book)
    } else {
        let fallback_name = match location.scope {
            StoreScope::Project => location
                .path
                .parent()
                .and_then(|p| p.parent())
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .unwrap_or("project")
                .to_string(),
            StoreScope::Global => "default".to_string(),
        };
        let book = TaskBook::named(fallback_name);
        save_book(location, &book)?;
        Ok(book)
    }
}

pub fn save_book(location: &StoreLocation, book: &TaskBook) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(book).context("serializing tasks")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    tracing::debug!(path = %location.path.display(), tasks = book.tasks.len(), "saved tasks");
    Ok(())
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(STORE_DIR).join(STORE_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_store_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "taskgrid").context("locating data directory")?;
    Ok(dirs.data_dir().join(STORE_FILE))
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// YAML-file backed task service. Writes through on every mutation and
/// re-reads the file when another process changed it.
pub struct FileStore {
    location: StoreLocation,
    book: TaskBook,
    seen_modified: Option<SystemTime>,
}

impl FileStore {
    pub fn open(location: StoreLocation) -> Result<Self> {
        let book = load_book(&location)?;
        let seen_modified = modified_at(&location.path);
        Ok(FileStore {
            location,
            book,
            seen_modified,
        })
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn book(&self) -> &TaskBook {
        &self.book
    }

    fn reload_if_changed(&mut self) -> Result<()> {
        let current = modified_at(&self.location.path);
        if current.is_some() && current != self.seen_modified {
            tracing::info!(path = %self.location.path.display(), "task file changed on disk, reloading");
            self.book = load_book(&self.location)?;
            self.seen_modified = current;
        }
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        save_book(&self.location, &self.book)?;
        self.seen_modified = modified_at(&self.location.path);
        Ok(())
    }
}

impl TaskService for FileStore {
    fn list_tasks(&mut self) -> Result<Vec<Task>> {
        self.reload_if_changed()?;
        Ok(self.book.tasks.clone())
    }

    fn create_task(&mut self, draft: TaskDraft) -> Result<Task> {
        self.reload_if_changed()?;
        let task = self.book.add(draft, Utc::now());
        self.persist()?;
        tracing::info!(task = task.id, title = %task.title, "created task");
        Ok(task)
    }

    fn update_task(&mut self, task: Task) -> Result<()> {
        self.reload_if_changed()?;
        let id = task.id;
        self.book
            .replace(task)
            .with_context(|| format!("updating task {}", id))?;
        self.persist()?;
        tracing::info!(task = id, "updated task");
        Ok(())
    }

    fn delete_task(&mut self, id: TaskId) -> Result<()> {
        self.reload_if_changed()?;
        self.book
            .remove(id)
            .with_context(|| format!("deleting task {}", id))?;
        self.persist()?;
        tracing::info!(task = id, "deleted task");
        Ok(())
    }

    fn set_completion(&mut self, id: TaskId, completed: bool) -> Result<()> {
        self.reload_if_changed()?;
        self.book
            .set_completed(id, completed)
            .with_context(|| format!("updating completion of task {}", id))?;
        self.persist()?;
        tracing::info!(task = id, completed, "set completion");
        Ok(())
    }

    fn optimize_schedule(&mut self) -> Result<Vec<Task>> {
        self.reload_if_changed()?;
        let optimized = optimizer::optimize_schedule(self.book.tasks.clone(), Utc::now());
        for task in &mut self.book.tasks {
            if let Some(updated) = optimized.iter().find(|t| t.id == task.id) {
                task.scheduled_start = updated.scheduled_start;
            }
        }
        self.persist()?;
        tracing::info!(tasks = self.book.tasks.len(), "optimized schedule");
        Ok(self.book.tasks.clone())
    }
}
