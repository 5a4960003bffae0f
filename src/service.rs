use crate::model::{Task, TaskDraft, TaskId};
use anyhow::Result;

/// Task operations the calendar views delegate to. Every call that changes
/// data is followed by a `list_tasks` refresh on the caller's side; whichever
/// response arrives last becomes the snapshot.
pub trait TaskService {
    fn list_tasks(&mut self) -> Result<Vec<Task>>;
    fn create_task(&mut self, draft: TaskDraft) -> Result<Task>;
    fn update_task(&mut self, task: Task) -> Result<()>;
    fn delete_task(&mut self, id: TaskId) -> Result<()>;
    fn set_completion(&mut self, id: TaskId, completed: bool) -> Result<()>;
    /// Runs the schedule optimizer and returns the full replacement snapshot.
    fn optimize_schedule(&mut self) -> Result<Vec<Task>>;
}
