use super::grid::{days_in_month, first_of_month, generate_grid, week_start, CalendarCell, Clock};
use super::span::occupies_date;
use super::Granularity;
use crate::model::Task;
use chrono::{Datelike, Days, Months, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Prev,
    Next,
}

/// Focused date, zoom level and the independently selected day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    focused_date: NaiveDate,
    granularity: Granularity,
    selected_date: Option<NaiveDate>,
    /// Day-of-month month steps aim for; survives clamping into short months.
    anchor_day: u32,
}

impl NavigationState {
    pub fn new(focused_date: NaiveDate, granularity: Granularity) -> Self {
        NavigationState {
            focused_date,
            granularity,
            selected_date: None,
            anchor_day: focused_date.day(),
        }
    }

    pub fn focused_date(&self) -> NaiveDate {
        self.focused_date
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn step(&mut self, step: Step) {
        match self.granularity {
            Granularity::Month => self.step_month(step),
            Granularity::Week => self.step_days(step, 7),
            Granularity::Day => self.step_days(step, 1),
        }
    }

    pub fn jump_to_today(&mut self, clock: &dyn Clock) {
        self.move_to(clock.today());
    }

    pub fn set_granularity(&mut self, granularity: Granularity) {
        self.granularity = granularity;
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = Some(date);
    }

    pub fn clear_selection(&mut self) {
        self.selected_date = None;
    }

    /// Moves the selected day by `days`, starting from the focused date when
    /// nothing is selected. Leaving the visible period refocuses on the new day.
    pub fn move_selection(&mut self, days: i64) {
        let from = self.selected_date.unwrap_or(self.focused_date);
        let moved = if days >= 0 {
            from.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            from.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        let Some(date) = moved else {
            return;
        };
        self.selected_date = Some(date);
        if !self.period_contains(date) {
            self.move_to(date);
        }
    }

    pub fn period_contains(&self, date: NaiveDate) -> bool {
        let focused = self.focused_date;
        match self.granularity {
            Granularity::Month => date.year() == focused.year() && date.month() == focused.month(),
            Granularity::Week => week_start(date) == week_start(focused),
            Granularity::Day => date == focused,
        }
    }

    pub fn grid<'a>(&self, tasks: &'a [Task], clock: &dyn Clock) -> Vec<CalendarCell<'a>> {
        generate_grid(self.focused_date, self.granularity, tasks, clock)
    }

    /// Tasks for the detail panel, empty when nothing is selected.
    pub fn selected_tasks<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        match self.selected_date {
            Some(date) => tasks.iter().filter(|t| occupies_date(t, date)).collect(),
            None => Vec::new(),
        }
    }

    pub fn period_title(&self) -> String {
        let date = self.focused_date;
        match self.granularity {
            Granularity::Month => date.format("%B %Y").to_string(),
            Granularity::Week => format!("Week of {}", date.format("%b %-d, %Y")),
            Granularity::Day => date.format("%A, %B %-d, %Y").to_string(),
        }
    }

    fn step_month(&mut self, step: Step) {
        let first = first_of_month(self.focused_date);
        let target = match step {
            Step::Next => first.checked_add_months(Months::new(1)),
            Step::Prev => first.checked_sub_months(Months::new(1)),
        };
        if let Some(target) = target {
            let day = self
                .anchor_day
                .min(days_in_month(target.year(), target.month()));
            self.focused_date = target.with_day(day).unwrap_or(target);
        }
    }

    fn step_days(&mut self, step: Step, days: u64) {
        let moved = match step {
            Step::Next => self.focused_date.checked_add_days(Days::new(days)),
            Step::Prev => self.focused_date.checked_sub_days(Days::new(days)),
        };
        if let Some(date) = moved {
            self.move_to(date);
        }
    }

    fn move_to(&mut self, date: NaiveDate) {
        self.focused_date = date;
        self.anchor_day = date.day();
    }
}
