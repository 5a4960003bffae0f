use super::span::occupies_date;
use super::Granularity;
use crate::model::Task;
use chrono::{Datelike, Days, Local, NaiveDate};

/// Source of "today" for highlighting; swapped for a fixed date in tests.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct CalendarCell<'a> {
    pub date: NaiveDate,
    pub in_focused_period: bool,
    pub is_today: bool,
    /// Occupying tasks in snapshot order.
    pub tasks: Vec<&'a Task>,
}

/// Builds the chronologically ordered cells for the period around `focused`.
pub fn generate_grid<'a>(
    focused: NaiveDate,
    granularity: Granularity,
    tasks: &'a [Task],
    clock: &dyn Clock,
) -> Vec<CalendarCell<'a>> {
    let today = clock.today();
    let (start, len) = grid_range(focused, granularity);
    start
        .iter_days()
        .take(len)
        .map(|date| CalendarCell {
            date,
            in_focused_period: match granularity {
                Granularity::Month => {
                    date.year() == focused.year() && date.month() == focused.month()
                }
                Granularity::Week | Granularity::Day => true,
            },
            is_today: date == today,
            tasks: tasks.iter().filter(|t| occupies_date(t, date)).collect(),
        })
        .collect()
}

/// First date and cell count of the grid.
pub fn grid_range(focused: NaiveDate, granularity: Granularity) -> (NaiveDate, usize) {
    match granularity {
        Granularity::Month => {
            let first = first_of_month(focused);
            let leading = first.weekday().num_days_from_sunday();
            let start = first
                .checked_sub_days(Days::new(u64::from(leading)))
                .unwrap_or(first);
            let used = (first - start).num_days() as usize
                + days_in_month(focused.year(), focused.month()) as usize;
            (start, used.div_ceil(7) * 7)
        }
        Granularity::Week => (week_start(focused), 7),
        Granularity::Day => (focused, 1),
    }
}

/// Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_sunday();
    date.checked_sub_days(Days::new(u64::from(back)))
        .unwrap_or(date)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}
