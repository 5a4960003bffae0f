use crate::model::Task;
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Hours of slack reserved ahead of the deadline, by priority.
fn buffer_hours(priority: u8) -> i64 {
    match priority {
        5 => 24,
        4 => 48,
        3 => 72,
        _ => 96,
    }
}

/// Assigns `scheduled_start` to every open, unlocked task.
///
/// Tasks are visited highest priority first, earliest deadline next. Urgent
/// tasks (priority 3 and up) are pulled toward `now`, the rest are pushed back
/// from the deadline by their duration plus buffer. Nothing is ever scheduled
/// in the past; such tasks start an hour from now instead.
pub fn optimize_schedule(tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<Task> {
    let mut tasks = tasks;
    tasks.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.deadline.cmp(&b.deadline))
    });
    for task in tasks.iter_mut() {
        if task.completed || task.locked {
            continue;
        }
        let deadline = task
            .deadline
            .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
            .and_utc();
        let required = Duration::minutes(
            i64::from(task.estimated_time) + buffer_hours(task.priority) * 60,
        );
        let ideal = if task.priority >= 3 {
            now + required / i32::from(task.priority)
        } else {
            deadline - required
        };
        let start = if ideal < now {
            now + Duration::hours(1)
        } else {
            ideal
        };
        tracing::debug!(task = task.id, start = %start, "scheduled task");
        task.scheduled_start = Some(start);
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{date, task};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn orders_by_priority_then_deadline() {
        let mut a = task(1, date(2024, 3, 20), 60);
        a.priority = 2;
        let mut b = task(2, date(2024, 3, 15), 60);
        b.priority = 5;
        let mut c = task(3, date(2024, 3, 10), 60);
        c.priority = 5;
        let ids: Vec<_> = optimize_schedule(vec![a, b, c], now())
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn urgent_tasks_start_soon() {
        let mut t = task(1, date(2024, 3, 20), 120);
        t.priority = 4;
        let out = optimize_schedule(vec![t], now());
        // (120 + 48 * 60) minutes / 4 = 750 minutes.
        assert_eq!(out[0].scheduled_start, Some(now() + Duration::minutes(750)));
    }

    #[test]
    fn low_priority_tasks_back_off_from_deadline() {
        let mut t = task(1, date(2024, 3, 20), 60);
        t.priority = 1;
        let out = optimize_schedule(vec![t], now());
        let expected = Utc.with_ymd_and_hms(2024, 3, 20, 23, 59, 59).unwrap()
            - Duration::minutes(60 + 96 * 60);
        assert_eq!(out[0].scheduled_start, Some(expected));
    }

    #[test]
    fn past_starts_move_to_next_hour() {
        let mut t = task(1, date(2024, 3, 2), 60);
        t.priority = 2;
        let out = optimize_schedule(vec![t], now());
        assert_eq!(out[0].scheduled_start, Some(now() + Duration::hours(1)));
    }

    #[test]
    fn completed_and_locked_tasks_are_untouched() {
        let mut done = task(1, date(2024, 3, 20), 60);
        done.completed = true;
        let mut locked = task(2, date(2024, 3, 20), 60);
        locked.locked = true;
        let out = optimize_schedule(vec![done, locked], now());
        assert!(out.iter().all(|t| t.scheduled_start.is_none()));
    }
}
