use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type TaskId = u32;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_PRIORITY: u8 = 3;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TaskBook {
    pub name: String,
    pub next_id: TaskId,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// 1 (lowest) to 5 (highest).
    pub priority: u8,
    pub deadline: NaiveDate,
    /// Estimated duration in minutes.
    pub estimated_time: u32,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Set by the optimizer; wins over `start_date` when both exist.
    #[serde(default)]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw form payload, one string per input field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    pub title: String,
    pub priority: String,
    pub deadline: String,
    pub estimated_hours: String,
    pub estimated_minutes: String,
    pub start_date: String,
    pub category: String,
}

/// A validated form, ready to become (or update) a task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub priority: u8,
    pub deadline: NaiveDate,
    pub estimated_time: u32,
    pub start_date: Option<NaiveDate>,
    pub category: Option<String>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TaskError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("title is required")]
    MissingTitle,
    #[error("deadline is required")]
    MissingDeadline,
    #[error("invalid date (use YYYY-MM-DD): {0}")]
    InvalidDate(String),
    #[error("priority must be between 1 and 5: {0}")]
    InvalidPriority(String),
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
}

impl TaskBook {
    pub fn named(name: impl Into<String>) -> Self {
        TaskBook {
            name: name.into(),
            next_id: 1,
            tasks: Vec::new(),
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn position(&self, id: TaskId) -> Result<usize, TaskError> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskError::TaskNotFound(id))
    }

    pub fn add(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Task {
        let id = self.allocate_id();
        let task = Task::from_draft(id, draft, now);
        self.tasks.push(task.clone());
        task
    }

    pub fn replace(&mut self, task: Task) -> Result<(), TaskError> {
        let idx = self.position(task.id)?;
        self.tasks[idx] = task;
        Ok(())
    }

    pub fn remove(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let idx = self.position(id)?;
        Ok(self.tasks.remove(idx))
    }

    pub fn set_completed(&mut self, id: TaskId, completed: bool) -> Result<(), TaskError> {
        let idx = self.position(id)?;
        self.tasks[idx].completed = completed;
        Ok(())
    }

    fn allocate_id(&mut self) -> TaskId {
        let max_existing = self.tasks.iter().map(|t| t.id).max().unwrap_or(0);
        let id = self.next_id.max(max_existing + 1);
        self.next_id = id + 1;
        id
    }
}

impl Task {
    pub fn from_draft(id: TaskId, draft: TaskDraft, created_at: DateTime<Utc>) -> Self {
        Task {
            id,
            title: draft.title,
            priority: draft.priority,
            deadline: draft.deadline,
            estimated_time: draft.estimated_time,
            start_date: draft.start_date,
            scheduled_start: None,
            completed: false,
            locked: false,
            category: draft.category,
            created_at,
        }
    }

    /// Overwrites the user-editable fields, keeping identity, completion and
    /// the optimizer's schedule.
    pub fn apply(&mut self, draft: TaskDraft) {
        self.title = draft.title;
        self.priority = draft.priority;
        self.deadline = draft.deadline;
        self.estimated_time = draft.estimated_time;
        self.start_date = draft.start_date;
        self.category = draft.category;
    }
}

impl TaskForm {
    /// A blank form with the same defaults as a fresh "new task" dialog.
    pub fn blank() -> Self {
        TaskForm {
            priority: DEFAULT_PRIORITY.to_string(),
            estimated_hours: "0".into(),
            estimated_minutes: "30".into(),
            ..TaskForm::default()
        }
    }

    pub fn from_task(task: &Task) -> Self {
        TaskForm {
            title: task.title.clone(),
            priority: task.priority.to_string(),
            deadline: format_date(task.deadline),
            estimated_hours: (task.estimated_time / 60).to_string(),
            estimated_minutes: (task.estimated_time % 60).to_string(),
            start_date: task.start_date.map(format_date).unwrap_or_default(),
            category: task.category.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<TaskDraft, TaskError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TaskError::MissingTitle);
        }
        let deadline = parse_date(&self.deadline)?.ok_or(TaskError::MissingDeadline)?;
        let priority = parse_priority(&self.priority)?;
        let hours = parse_minutes_field(&self.estimated_hours)?;
        let minutes = parse_minutes_field(&self.estimated_minutes)?;
        let estimated_time = hours
            .checked_mul(60)
            .and_then(|h| h.checked_add(minutes))
            .ok_or_else(|| {
                TaskError::InvalidDuration(format!("{}h {}m", hours, minutes))
            })?;
        let category = self.category.trim();
        Ok(TaskDraft {
            title: title.to_string(),
            priority,
            deadline,
            estimated_time,
            start_date: parse_date(&self.start_date)?,
            category: if category.is_empty() {
                None
            } else {
                Some(category.to_string())
            },
        })
    }
}

pub fn parse_date(input: &str) -> Result<Option<NaiveDate>, TaskError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(Some)
        .map_err(|_| TaskError::InvalidDate(trimmed.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_priority(input: &str) -> Result<u8, TaskError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_PRIORITY);
    }
    match trimmed.parse::<u8>() {
        Ok(p) if (1..=5).contains(&p) => Ok(p),
        _ => Err(TaskError::InvalidPriority(trimmed.to_string())),
    }
}

fn parse_minutes_field(input: &str) -> Result<u32, TaskError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| TaskError::InvalidDuration(trimmed.to_string()))
}
