use super::grid::CalendarCell;
use super::span::occupancy_span;
use crate::config::CalendarConfig;
use crate::model::Task;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Indexed by priority - 1.
pub const PRIORITY_COLORS: [Rgb; 5] = [
    Rgb(0xef, 0x44, 0x44),
    Rgb(0xf9, 0x73, 0x16),
    Rgb(0xea, 0xb3, 0x08),
    Rgb(0x22, 0xc5, 0x5e),
    Rgb(0x06, 0xb6, 0xd4),
];
pub const FALLBACK_COLOR: Rgb = Rgb(0x6b, 0x72, 0x80);

pub fn priority_color(priority: u8) -> Rgb {
    usize::from(priority)
        .checked_sub(1)
        .and_then(|idx| PRIORITY_COLORS.get(idx))
        .copied()
        .unwrap_or(FALLBACK_COLOR)
}

/// One horizontal occupancy bar inside a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineBar<'a> {
    pub task: &'a Task,
    pub width_percent: f64,
    pub left_percent: f64,
    /// Vertical offset in pixels.
    pub stack_top: u32,
    pub is_span_start: bool,
    pub is_span_end: bool,
    pub color: Rgb,
    pub opacity: f32,
}

/// The "+N" marker for tasks that did not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    pub hidden: usize,
    pub stack_top: u32,
}

impl Overflow {
    pub fn label(&self) -> String {
        format!("+{}", self.hidden)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellLayout<'a> {
    pub bars: Vec<TimelineBar<'a>>,
    pub overflow: Option<Overflow>,
}

/// Horizontal extent of a task's bar on `date`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarExtent {
    pub width_percent: f64,
    pub left_percent: f64,
    pub is_span_start: bool,
    pub is_span_end: bool,
}

pub fn bar_extent(task: &Task, date: NaiveDate, config: &CalendarConfig) -> BarExtent {
    let span = occupancy_span(task);
    if span.is_single_day() {
        let reference = f64::from(config.reference_day_minutes.max(1));
        let width = f64::from(task.estimated_time) / reference * 100.0;
        return BarExtent {
            width_percent: width.max(min_bar_percent(config)).min(100.0),
            left_percent: 0.0,
            is_span_start: true,
            is_span_end: true,
        };
    }
    BarExtent {
        width_percent: 100.0,
        left_percent: 0.0,
        is_span_start: date == span.start,
        is_span_end: date == span.end,
    }
}

/// The configured minimum, forced into [0, 100] so any file value lays out.
fn min_bar_percent(config: &CalendarConfig) -> f64 {
    if config.min_bar_percent.is_finite() {
        config.min_bar_percent.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Stacks the cell's tasks into fixed slots, at most `max_visible_bars` of them.
pub fn layout_cell<'a>(cell: &CalendarCell<'a>, config: &CalendarConfig) -> CellLayout<'a> {
    let slot_top = |index: usize| {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        config
            .bar_base_offset
            .saturating_add(index.saturating_mul(config.bar_height))
    };
    let bars = cell
        .tasks
        .iter()
        .take(config.max_visible_bars)
        .enumerate()
        .map(|(index, &task)| {
            let extent = bar_extent(task, cell.date, config);
            TimelineBar {
                task,
                width_percent: extent.width_percent,
                left_percent: extent.left_percent,
                stack_top: slot_top(index),
                is_span_start: extent.is_span_start,
                is_span_end: extent.is_span_end,
                color: priority_color(task.priority),
                opacity: if task.completed {
                    config.completed_opacity
                } else {
                    config.pending_opacity
                },
            }
        })
        .collect::<Vec<_>>();
    let overflow = (cell.tasks.len() > config.max_visible_bars).then(|| Overflow {
        hidden: cell.tasks.len() - config.max_visible_bars,
        stack_top: slot_top(config.max_visible_bars),
    });
    CellLayout { bars, overflow }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::grid::{generate_grid, FixedClock};
    use crate::calendar::Granularity;
    use crate::model::tests::{date, task};

    fn cell_for<'a>(tasks: &'a [Task], day: NaiveDate) -> CalendarCell<'a> {
        generate_grid(day, Granularity::Day, tasks, &FixedClock(day))
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn single_day_width_is_proportional_and_clamped() {
        let config = CalendarConfig::default();
        let day = date(2024, 3, 10);
        let width = |minutes| bar_extent(&task(1, day, minutes), day, &config).width_percent;
        assert_eq!(width(360), 50.0);
        assert_eq!(width(720), 100.0);
        assert_eq!(width(1000), 100.0);
        assert_eq!(width(30), 20.0);
        assert_eq!(width(0), 20.0);
        let extent = bar_extent(&task(1, day, 90), day, &config);
        assert!(extent.is_span_start && extent.is_span_end);
        assert_eq!(extent.left_percent, 0.0);
    }

    #[test]
    fn multi_day_span_is_full_width_with_edge_flags() {
        let config = CalendarConfig::default();
        let mut t = task(1, date(2024, 3, 20), 2900);
        t.start_date = Some(date(2024, 3, 1));
        let flags: Vec<_> = (1..=3)
            .map(|d| {
                let extent = bar_extent(&t, date(2024, 3, d), &config);
                assert_eq!(extent.width_percent, 100.0);
                (extent.is_span_start, extent.is_span_end)
            })
            .collect();
        assert_eq!(flags, vec![(true, false), (false, false), (false, true)]);
    }

    #[test]
    fn out_of_range_minimum_width_is_tamed() {
        let day = date(2024, 3, 10);
        let t = task(1, day, 60);
        let prefs: crate::config::Preferences =
            serde_yaml::from_str("calendar:\n  min_bar_percent: 150\n").unwrap();
        assert_eq!(bar_extent(&t, day, &prefs.calendar).width_percent, 100.0);

        let negative = CalendarConfig {
            min_bar_percent: -5.0,
            ..CalendarConfig::default()
        };
        let width = bar_extent(&t, day, &negative).width_percent;
        assert!((width - 60.0 / 720.0 * 100.0).abs() < 1e-9);

        let nan = CalendarConfig {
            min_bar_percent: f64::NAN,
            ..CalendarConfig::default()
        };
        assert!(bar_extent(&task(1, day, 0), day, &nan).width_percent == 0.0);
    }

    #[test]
    fn huge_slot_geometry_saturates() {
        let config = CalendarConfig {
            bar_base_offset: u32::MAX - 10,
            bar_height: u32::MAX / 2,
            max_visible_bars: 2,
            ..CalendarConfig::default()
        };
        let day = date(2024, 3, 10);
        let tasks: Vec<Task> = (1..=3).map(|id| task(id, day, 60)).collect();
        let layout = layout_cell(&cell_for(&tasks, day), &config);
        assert_eq!(layout.bars[0].stack_top, u32::MAX - 10);
        assert_eq!(layout.bars[1].stack_top, u32::MAX);
        assert_eq!(layout.overflow.unwrap().stack_top, u32::MAX);
    }

    #[test]
    fn three_day_task_across_the_march_grid() {
        let config = CalendarConfig::default();
        let mut t = task(7, date(2024, 3, 20), 2900);
        t.start_date = Some(date(2024, 3, 1));
        let tasks = vec![t];
        let cells = generate_grid(
            date(2024, 3, 14),
            Granularity::Month,
            &tasks,
            &FixedClock(date(2024, 3, 14)),
        );
        let mut occupied = Vec::new();
        for cell in &cells {
            let layout = layout_cell(cell, &config);
            for bar in &layout.bars {
                assert_eq!(bar.task.id, 7);
                assert_eq!(bar.width_percent, 100.0);
                occupied.push((cell.date, bar.is_span_start, bar.is_span_end));
            }
        }
        assert_eq!(
            occupied,
            vec![
                (date(2024, 3, 1), true, false),
                (date(2024, 3, 2), false, false),
                (date(2024, 3, 3), false, true),
            ]
        );
        let holds = |d: NaiveDate| cells.iter().any(|c| c.date == d && !c.tasks.is_empty());
        assert!(!holds(date(2024, 2, 29)));
        assert!(!holds(date(2024, 3, 4)));
    }

    #[test]
    fn overflow_beyond_visible_bars() {
        let config = CalendarConfig::default();
        let day = date(2024, 3, 10);
        let tasks: Vec<Task> = (1..=6).map(|id| task(id, day, 60)).collect();
        let layout = layout_cell(&cell_for(&tasks, day), &config);
        assert_eq!(layout.bars.len(), 4);
        let ids: Vec<_> = layout.bars.iter().map(|b| b.task.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        let tops: Vec<_> = layout.bars.iter().map(|b| b.stack_top).collect();
        assert_eq!(tops, vec![20, 36, 52, 68]);
        let overflow = layout.overflow.unwrap();
        assert_eq!(overflow.label(), "+2");
        assert_eq!(overflow.stack_top, 84);
    }

    #[test]
    fn no_overflow_at_exactly_max_bars() {
        let config = CalendarConfig {
            max_visible_bars: 2,
            ..CalendarConfig::default()
        };
        let day = date(2024, 3, 10);
        let tasks: Vec<Task> = (1..=2).map(|id| task(id, day, 60)).collect();
        let layout = layout_cell(&cell_for(&tasks, day), &config);
        assert_eq!(layout.bars.len(), 2);
        assert!(layout.overflow.is_none());
    }

    #[test]
    fn colour_and_opacity() {
        let config = CalendarConfig::default();
        let day = date(2024, 3, 10);
        let mut done = task(1, day, 60);
        done.completed = true;
        done.priority = 5;
        let mut odd = task(2, day, 60);
        odd.priority = 9;
        let tasks = vec![done, odd];
        let layout = layout_cell(&cell_for(&tasks, day), &config);
        assert_eq!(layout.bars[0].color, Rgb(0x06, 0xb6, 0xd4));
        assert_eq!(layout.bars[0].opacity, 0.6);
        assert_eq!(layout.bars[1].color, FALLBACK_COLOR);
        assert_eq!(layout.bars[1].opacity, 0.9);
    }

    #[test]
    fn priority_lookup() {
        assert_eq!(priority_color(1), Rgb(0xef, 0x44, 0x44));
        assert_eq!(priority_color(3), Rgb(0xea, 0xb3, 0x08));
        assert_eq!(priority_color(0), FALLBACK_COLOR);
        assert_eq!(priority_color(6), FALLBACK_COLOR);
        assert_eq!(FALLBACK_COLOR, Rgb(0x6b, 0x72, 0x80));
    }
}
