use crate::model::Task;
use chrono::{Days, NaiveDate};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Inclusive range of calendar days a task is considered in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancySpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl OccupancySpan {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

/// Scheduled start, then the user's start date, then the deadline.
pub fn span_start(task: &Task) -> NaiveDate {
    task.scheduled_start
        .map(|s| s.date_naive())
        .or(task.start_date)
        .unwrap_or(task.deadline)
}

/// Whole days needed for `estimated_time` minutes, never less than one.
pub fn duration_days(estimated_time: u32) -> u32 {
    estimated_time.div_ceil(MINUTES_PER_DAY).max(1)
}

pub fn occupancy_span(task: &Task) -> OccupancySpan {
    let start = span_start(task);
    let extra = u64::from(duration_days(task.estimated_time) - 1);
    let end = start
        .checked_add_days(Days::new(extra))
        .unwrap_or(NaiveDate::MAX);
    OccupancySpan { start, end }
}

pub fn occupies_date(task: &Task, date: NaiveDate) -> bool {
    occupancy_span(task).contains(date)
}
